use std::sync::Arc;

use connectors::{Connector, ConnectorRegistry};

use crate::error::WorklogError;
use crate::types::ProviderConnection;

/// Looks up the stored provider accounts
pub trait CredentialSource: Send + Sync {
    /// # Errors
    /// `NotFound` if no connection has the given id
    fn connection(&self, id: i64) -> Result<ProviderConnection, WorklogError>;

    fn connections(&self) -> Vec<ProviderConnection>;
}

/// Builds the adapter for a connection. Tests substitute their own.
pub trait ConnectorFactory: Send + Sync {
    /// # Errors
    /// `UnknownProvider` or whatever the adapter reports about the settings
    fn create(&self, connection: &ProviderConnection) -> Result<Arc<dyn Connector>, WorklogError>;
}

pub struct RegistryConnectorFactory;

impl ConnectorFactory for RegistryConnectorFactory {
    fn create(&self, connection: &ProviderConnection) -> Result<Arc<dyn Connector>, WorklogError> {
        let connector = ConnectorRegistry::create(&connection.provider, &connection.fields())?;
        Ok(Arc::from(connector))
    }
}
