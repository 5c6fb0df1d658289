//! Order reconciliation scheduler.
//!
//! Local order records are reconciled against vendor truth by polling: one
//! supervised task per open order, owned by this scheduler, with lifecycle
//! tied to the service (no module-level state). Each task checks immediately
//! on registration and then on a fixed interval; a failed or timed-out poll
//! is logged and retried on the next tick without touching stored state. The
//! task deregisters itself once the order reaches a terminal state.
//!
//! Single-flight per order is structural: the task map holds at most one
//! entry per order id, so two polls for the same order never run
//! concurrently.
//!
//! Task state is in-memory only; [`ReconciliationScheduler::recover`] must
//! run at startup to re-register every stored non-terminal order, otherwise
//! a restart would silently orphan them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::application::ports::{AdapterFactory, ConnectionStore, OrderStore};
use crate::config::ReconciliationConfig;
use crate::error::GatewayError;

struct SchedulerInner {
    config: ReconciliationConfig,
    orders: Arc<dyn OrderStore>,
    connections: Arc<dyn ConnectionStore>,
    factory: Arc<dyn AdapterFactory>,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

/// Supervises one polling task per open order.
#[derive(Clone)]
pub struct ReconciliationScheduler {
    inner: Arc<SchedulerInner>,
}

impl ReconciliationScheduler {
    /// Create a scheduler. No tasks run until orders are watched.
    pub fn new(
        config: ReconciliationConfig,
        orders: Arc<dyn OrderStore>,
        connections: Arc<dyn ConnectionStore>,
        factory: Arc<dyn AdapterFactory>,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                config,
                orders,
                connections,
                factory,
                tasks: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Start polling an order. A second watch for the same id is a no-op.
    pub fn watch(&self, order_id: &str) {
        let mut tasks = match self.inner.tasks.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };
        if tasks.contains_key(order_id) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let id = order_id.to_string();
        let handle = tokio::spawn(poll_loop(inner, id.clone()));
        tasks.insert(id, handle);
        tracing::debug!(order_id, "reconciliation registered");
    }

    /// Stop polling an order (cancel, or nothing left to reconcile).
    pub fn unwatch(&self, order_id: &str) {
        let handle = {
            let mut tasks = match self.inner.tasks.lock() {
                Ok(tasks) => tasks,
                Err(poisoned) => poisoned.into_inner(),
            };
            tasks.remove(order_id)
        };
        if let Some(handle) = handle {
            handle.abort();
            tracing::debug!(order_id, "reconciliation deregistered");
        }
    }

    /// Re-register every stored non-terminal order.
    ///
    /// Run once at startup to close the crash gap; returns how many orders
    /// were picked up.
    pub async fn recover(&self) -> Result<usize, GatewayError> {
        let open = self.inner.orders.list_open().await?;
        let count = open.len();
        for order in open {
            self.watch(&order.id);
        }
        if count > 0 {
            tracing::info!(count, "recovered open orders into reconciliation");
        }
        Ok(count)
    }

    /// Number of orders currently under reconciliation.
    #[must_use]
    pub fn watched(&self) -> usize {
        self.inner
            .tasks
            .lock()
            .map(|tasks| tasks.len())
            .unwrap_or(0)
    }

    /// Whether an order is currently under reconciliation.
    #[must_use]
    pub fn is_watched(&self, order_id: &str) -> bool {
        self.inner
            .tasks
            .lock()
            .map(|tasks| tasks.contains_key(order_id))
            .unwrap_or(false)
    }

    /// Abort every polling task.
    pub fn shutdown(&self) {
        let mut tasks = match self.inner.tasks.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }
}

/// Poll one order until it reaches a terminal state.
async fn poll_loop(inner: Arc<SchedulerInner>, order_id: String) {
    let mut ticker = tokio::time::interval(inner.config.interval());
    // First tick completes immediately: check-then-interval, so the first
    // status lands without waiting a full period.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match poll_once(&inner, &order_id).await {
            Ok(done) => {
                if done {
                    break;
                }
            }
            Err(err) if err.is_retryable() => {
                tracing::warn!(order_id, error = %err, "status poll failed; retrying next tick");
            }
            Err(err) => {
                // Non-transport errors (bad credentials, decode failures)
                // will not heal on their own either, but dropping the order
                // from reconciliation would orphan it. Keep trying.
                tracing::warn!(order_id, error = %err, "status poll errored; retrying next tick");
            }
        }
    }

    let mut tasks = match inner.tasks.lock() {
        Ok(tasks) => tasks,
        Err(poisoned) => poisoned.into_inner(),
    };
    tasks.remove(&order_id);
}

/// One reconciliation pass. Returns true when polling should stop.
async fn poll_once(inner: &SchedulerInner, order_id: &str) -> Result<bool, GatewayError> {
    let Some(order) = inner.orders.get(order_id).await? else {
        tracing::warn!(order_id, "order vanished from store; dropping reconciliation");
        return Ok(true);
    };
    if order.status.is_terminal() {
        return Ok(true);
    }

    let Some(connection) = inner.connections.get(&order.connection_id).await? else {
        tracing::warn!(
            order_id,
            connection_id = %order.connection_id,
            "connection vanished from store; dropping reconciliation"
        );
        return Ok(true);
    };

    let adapter = inner
        .factory
        .create_adapter(connection.vendor, &connection.credentials);

    // The adapter's own client timeout bounds each call, but a hung vendor
    // must not occupy the slot past the configured ceiling either.
    let update = tokio::time::timeout(
        inner.config.request_timeout(),
        adapter.get_order_status(&order.vendor_order_id),
    )
    .await
    .map_err(|_| GatewayError::Transport("status poll timed out".to_string()))??;

    let updated = inner.orders.apply_update(order_id, &update).await?;

    tracing::debug!(
        order_id,
        status = %updated.status,
        "reconciliation pass applied"
    );

    Ok(updated.status.is_terminal())
}
