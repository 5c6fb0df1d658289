//! Startup recovery configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the startup recovery sweep.
///
/// Reconciliation bookkeeping is in-memory, so after a restart every stored
/// order not yet in a terminal state must be re-registered for polling or it
/// would be silently orphaned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Whether to run the sweep on startup.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
        }
    }
}

const fn default_enabled() -> bool {
    true
}
