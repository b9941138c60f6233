//! Reduct DS Core - Shared host protocol and service infrastructure
//!
//! This crate provides:
//! - Host protocol types (queries, resource calls, health checks)
//! - Handler traits the data source implements
//! - Standard service trait and runtime for the standalone binary
//! - Error handling and configuration

pub mod config;
pub mod error;
pub mod protocol;
pub mod service;

pub use config::{PluginSettings, SecretPluginSettings, ServiceConfig};
pub use error::{DatasourceError, Result};
pub use protocol::*;
pub use service::{
    CallResourceHandler, CheckHealthHandler, DependencyStatus, HealthStatus, PluginService,
    QueryDataHandler, ReadinessStatus, ServiceRuntime,
};
