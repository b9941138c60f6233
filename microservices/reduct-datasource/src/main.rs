//! ReductStore data source service
//!
//! Standalone HTTP process exposing the host calls of the data source.

use async_trait::async_trait;
use reduct_datasource::{create_router, AppState, HttpConnector, ReductDatasource};
use reduct_ds_core::{
    DatasourceError, DependencyStatus, HealthStatus, PluginService, ReadinessStatus, Result,
    ServiceConfig, ServiceRuntime,
};
use reduct_ds_telemetry::TelemetryConfig;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env()?;

    let telemetry = TelemetryConfig::new(config.service_name.clone())
        .with_log_level(config.log_level.clone())
        .with_json_logs(config.json_logs);
    let _guard = reduct_ds_telemetry::init(&telemetry)?;

    info!(reduct_url = %config.reduct_url, "Starting ReductStore data source");

    let service = Arc::new(DatasourceService::new(config).await?);
    ServiceRuntime::run(service).await?;
    Ok(())
}

/// Data source service state
pub struct DatasourceService {
    config: ServiceConfig,
    datasource: ReductDatasource,
    start_time: Instant,
}

impl DatasourceService {
    pub async fn new(config: ServiceConfig) -> Result<Self> {
        let connector = Arc::new(HttpConnector::new(config.timeout));
        let datasource = ReductDatasource::new(&config.plugin_settings(), connector).await?;

        Ok(Self {
            config,
            datasource,
            start_time: Instant::now(),
        })
    }
}

#[async_trait]
impl PluginService for DatasourceService {
    fn service_id(&self) -> &'static str {
        "reduct-datasource"
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus {
            healthy: true,
            service_id: self.service_id().to_string(),
            version: self.version().to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    async fn ready(&self) -> ReadinessStatus {
        let started = Instant::now();
        let available = match self.datasource.store().is_live().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Store is not reachable");
                false
            }
        };

        ReadinessStatus {
            ready: available,
            dependencies: vec![DependencyStatus {
                name: "reductstore".to_string(),
                available,
                latency_ms: Some(started.elapsed().as_millis() as u64),
            }],
        }
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down ReductStore data source");
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        info!(http = %self.config.http_bind, "Starting HTTP server");

        let state = AppState::new(self.datasource.clone(), self.config.instance_settings());
        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind(&self.config.http_bind).await?;
        axum::serve(listener, app)
            .await
            .map_err(|e| DatasourceError::Internal(format!("HTTP server failed: {}", e)))?;

        Ok(())
    }
}
