//! Handler traits and service infrastructure

use async_trait::async_trait;
use reduct_frames::QueryDataResponse;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tracing::{error, info, warn};

use crate::error::{DatasourceError, Result};
use crate::protocol::{
    CallResourceRequest, CallResourceResponse, CheckHealthRequest, CheckHealthResult,
    QueryDataRequest,
};

/// Executes a batch of queries
#[async_trait]
pub trait QueryDataHandler: Send + Sync {
    async fn query_data(&self, request: QueryDataRequest) -> Result<QueryDataResponse>;
}

/// Serves resource calls from the query editor
#[async_trait]
pub trait CallResourceHandler: Send + Sync {
    async fn call_resource(&self, request: CallResourceRequest) -> Result<CallResourceResponse>;
}

/// Answers the host's "test data source" check
#[async_trait]
pub trait CheckHealthHandler: Send + Sync {
    async fn check_health(&self, request: CheckHealthRequest) -> Result<CheckHealthResult>;
}

/// Health status for the liveness endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub service_id: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Readiness status for the readiness endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessStatus {
    pub ready: bool,
    pub dependencies: Vec<DependencyStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyStatus {
    pub name: String,
    pub available: bool,
    pub latency_ms: Option<u64>,
}

/// Lifecycle of the standalone data source process
#[async_trait]
pub trait PluginService: Send + Sync + 'static {
    fn service_id(&self) -> &'static str;

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Liveness of the process itself
    async fn health(&self) -> HealthStatus;

    /// Whether the record store answers
    async fn ready(&self) -> ReadinessStatus;

    async fn shutdown(&self) -> Result<()>;

    /// Serve until the listener fails; the runtime aborts it on shutdown
    async fn start(&self) -> Result<()>;
}

/// Drives a [`PluginService`] until a signal arrives or it stops on its own
pub struct ServiceRuntime {
    started: Instant,
}

impl ServiceRuntime {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Run `service` until ctrl-c/SIGTERM or until `start` returns.
    ///
    /// A failed `start` is returned to the caller after shutdown.
    pub async fn run<S: PluginService>(service: Arc<S>) -> Result<()> {
        let runtime = Self::new();
        info!(
            service = service.service_id(),
            version = service.version(),
            "Service starting"
        );

        let mut server = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.start().await })
        };

        let outcome = tokio::select! {
            joined = &mut server => match joined {
                Ok(Ok(())) => {
                    warn!("Service stopped without a signal");
                    Ok(())
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Service failed");
                    Err(e)
                }
                Err(e) => Err(DatasourceError::Internal(format!("service task failed: {}", e))),
            },
            _ = Self::wait_for_shutdown() => {
                info!("Shutdown signal received");
                Ok(())
            }
        };

        if let Err(e) = service.shutdown().await {
            warn!(error = %e, "Shutdown failed");
        }
        server.abort();

        info!(uptime_seconds = runtime.uptime().as_secs(), "Service stopped");
        outcome
    }

    async fn wait_for_shutdown() {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    warn!("Failed to listen for SIGTERM: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }
}

impl Default for ServiceRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::HealthCheckStatus;

    struct StaticHealth;

    #[async_trait]
    impl CheckHealthHandler for StaticHealth {
        async fn check_health(&self, _request: CheckHealthRequest) -> Result<CheckHealthResult> {
            Ok(CheckHealthResult::ok("fine"))
        }
    }

    #[test]
    fn test_handlers_are_object_safe() {
        let handler: Arc<dyn CheckHealthHandler> = Arc::new(StaticHealth);
        let result = tokio_test::block_on(handler.check_health(CheckHealthRequest::default())).unwrap();
        assert_eq!(result.status, HealthCheckStatus::Ok);
    }

    struct FailingService {
        stopped: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl PluginService for FailingService {
        fn service_id(&self) -> &'static str {
            "failing"
        }

        async fn health(&self) -> HealthStatus {
            HealthStatus {
                healthy: false,
                service_id: self.service_id().to_string(),
                version: self.version().to_string(),
                uptime_seconds: 0,
            }
        }

        async fn ready(&self) -> ReadinessStatus {
            ReadinessStatus {
                ready: false,
                dependencies: Vec::new(),
            }
        }

        async fn shutdown(&self) -> Result<()> {
            self.stopped.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }

        async fn start(&self) -> Result<()> {
            Err(DatasourceError::Config("address in use".to_string()))
        }
    }

    #[tokio::test]
    async fn test_runtime_returns_start_failure() {
        let service = Arc::new(FailingService {
            stopped: std::sync::atomic::AtomicBool::new(false),
        });

        let err = ServiceRuntime::run(service.clone()).await.unwrap_err();
        assert!(matches!(err, DatasourceError::Config(_)));
        assert!(service.stopped.load(std::sync::atomic::Ordering::SeqCst));
    }
}
