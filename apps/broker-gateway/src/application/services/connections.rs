//! Connection establishment and lifecycle.

use std::sync::Arc;

use crate::application::ports::{AdapterFactory, ConnectionStore};
use crate::domain::broker::{AssetClass, BrokerConnection, Credentials, Vendor};
use crate::error::GatewayError;

/// A request to link a vendor account.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    /// Target vendor.
    pub vendor: Vendor,
    /// Opaque credential blob (API keys or an OAuth token bundle).
    pub credentials: Credentials,
    /// Pin the connection to one asset class. When absent, one connection is
    /// created per asset class the vendor supports, since a single credential
    /// set from some vendors covers several.
    pub asset_class: Option<AssetClass>,
    /// Whether this is a demo/paper account.
    pub is_demo: bool,
}

/// Manages broker connections: validate-then-persist, listing, disconnect.
pub struct ConnectionService {
    factory: Arc<dyn AdapterFactory>,
    connections: Arc<dyn ConnectionStore>,
}

impl ConnectionService {
    /// Create the service.
    pub fn new(factory: Arc<dyn AdapterFactory>, connections: Arc<dyn ConnectionStore>) -> Self {
        Self {
            factory,
            connections,
        }
    }

    /// Link a vendor account for an owner.
    ///
    /// Credentials are validated against the vendor before anything is
    /// persisted; a rejection surfaces as `InvalidCredentials` and a network
    /// failure as a retryable `Transport` error. On success the vendor's
    /// account snapshot is captured and any previously active connection for
    /// the same (vendor, asset class) is deactivated.
    pub async fn connect(
        &self,
        owner_id: &str,
        request: ConnectRequest,
    ) -> Result<Vec<BrokerConnection>, GatewayError> {
        let classes: Vec<AssetClass> = match request.asset_class {
            Some(class) if !request.vendor.supports(class) => {
                return Err(GatewayError::AssetClassNotSupported {
                    vendor: request.vendor,
                    asset_class: class,
                });
            }
            Some(class) => vec![class],
            None => request.vendor.supported_asset_classes().to_vec(),
        };

        let adapter = self.factory.create_adapter(request.vendor, &request.credentials);

        if !adapter.validate_credentials().await? {
            tracing::info!(vendor = %request.vendor, "credential validation rejected");
            return Err(GatewayError::InvalidCredentials);
        }

        let snapshot = adapter.get_account_info().await?;

        let mut created = Vec::with_capacity(classes.len());
        for class in classes {
            self.connections
                .deactivate_matching(owner_id, request.vendor, class)
                .await?;

            let connection = BrokerConnection::new(
                owner_id,
                request.vendor,
                class,
                request.credentials.clone(),
                request.is_demo,
                Some(snapshot.clone()),
            );
            self.connections.insert(connection.clone()).await?;

            tracing::info!(
                vendor = %request.vendor,
                asset_class = %class,
                connection_id = %connection.id,
                "broker connected"
            );
            created.push(connection);
        }

        Ok(created)
    }

    /// All connections for an owner.
    pub async fn list(&self, owner_id: &str) -> Result<Vec<BrokerConnection>, GatewayError> {
        Ok(self.connections.list_by_owner(owner_id).await?)
    }

    /// Connections for an owner, restricted to one asset class.
    pub async fn list_by_asset_class(
        &self,
        owner_id: &str,
        asset_class: AssetClass,
    ) -> Result<Vec<BrokerConnection>, GatewayError> {
        Ok(self
            .connections
            .list_by_owner(owner_id)
            .await?
            .into_iter()
            .filter(|c| c.asset_class == asset_class)
            .collect())
    }

    /// Deactivate a connection the owner holds.
    pub async fn disconnect(
        &self,
        owner_id: &str,
        connection_id: &str,
    ) -> Result<BrokerConnection, GatewayError> {
        let connection = self
            .connections
            .get(connection_id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("connection {connection_id}")))?;

        if connection.owner_id != owner_id {
            return Err(GatewayError::Forbidden);
        }

        Ok(self.connections.deactivate(connection_id).await?)
    }
}
