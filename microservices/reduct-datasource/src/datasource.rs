//! Data source instance and store connectors

use reduct_client::{ClientOptions, MemoryStore, RecordStore, ReductClient};
use reduct_ds_core::{DatasourceError, PluginSettings, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::metrics::DatasourceMetrics;

/// Builds a store handle from instance settings
pub trait StoreConnector: Send + Sync {
    fn connect(&self, settings: &PluginSettings) -> Result<Arc<dyn RecordStore>>;
}

/// Connects to a ReductStore server over HTTP
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new(ClientOptions::default().timeout)
    }
}

impl StoreConnector for HttpConnector {
    fn connect(&self, settings: &PluginSettings) -> Result<Arc<dyn RecordStore>> {
        let client = ReductClient::new(
            &settings.server_url,
            ClientOptions {
                api_token: settings.api_token().map(str::to_string),
                verify_ssl: settings.verify_ssl,
                timeout: self.timeout,
            },
        )?;
        Ok(Arc::new(client))
    }
}

/// Every connection resolves to the same in-memory store
impl StoreConnector for MemoryStore {
    fn connect(&self, _settings: &PluginSettings) -> Result<Arc<dyn RecordStore>> {
        Ok(Arc::new(self.clone()))
    }
}

/// A configured data source bound to one store
#[derive(Clone)]
pub struct ReductDatasource {
    store: Arc<dyn RecordStore>,
    connector: Arc<dyn StoreConnector>,
    metrics: DatasourceMetrics,
}

impl ReductDatasource {
    /// Connect with `settings` and verify the store is live
    pub async fn new(settings: &PluginSettings, connector: Arc<dyn StoreConnector>) -> Result<Self> {
        if settings.server_url.is_empty() {
            error!("Server URL is missing");
            return Err(DatasourceError::Config("server URL is missing".to_string()));
        }

        let store = connector.connect(settings)?;
        if let Err(e) = store.is_live().await {
            error!(error = %e, "Check health failed");
            return Err(DatasourceError::Unavailable(format!("check health failed: {}", e)));
        }

        info!(server_url = %settings.server_url, "Data source connected");
        Ok(Self::with_store(store, connector))
    }

    /// Wrap an existing store handle without probing it
    pub fn with_store(store: Arc<dyn RecordStore>, connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            store,
            connector,
            metrics: DatasourceMetrics::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn connector(&self) -> &Arc<dyn StoreConnector> {
        &self.connector
    }

    pub fn metrics(&self) -> &DatasourceMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(url: &str) -> PluginSettings {
        PluginSettings {
            server_url: url.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_new_requires_url() {
        let err = ReductDatasource::new(&settings(""), Arc::new(MemoryStore::new()))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DatasourceError::Config(_)));
    }

    #[tokio::test]
    async fn test_new_checks_liveness() {
        let store = MemoryStore::new();
        store.fail_liveness("connection refused");

        let err = ReductDatasource::new(&settings("http://store"), Arc::new(store))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status_code(), 503);
        assert!(err.message().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_new_connects() {
        let datasource = ReductDatasource::new(&settings("http://store"), Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        assert!(datasource.store().list_buckets().await.unwrap().is_empty());
    }

    #[test]
    fn test_http_connector_rejects_empty_url() {
        let err = HttpConnector::default().connect(&settings("")).err().unwrap();
        assert!(matches!(err, DatasourceError::Config(_)));
    }
}
