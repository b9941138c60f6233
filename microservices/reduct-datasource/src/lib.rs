//! ReductStore data source
//!
//! Serves the visualization host's three calls against a ReductStore server:
//! - QueryData: run panel queries and turn records into time-series frames
//! - CallResource: bucket/entry listing, condition validation, server info
//! - CheckHealth: verify settings, connectivity and credentials

pub mod datasource;
pub mod error;
pub mod health;
pub mod metrics;
pub mod query;
pub mod resources;
pub mod routes;

pub use datasource::{HttpConnector, ReductDatasource, StoreConnector};
pub use error::ApiError;
pub use health::check_settings;
pub use metrics::{DatasourceMetrics, InFlightGuard, MetricsSnapshot};
pub use query::{ReductOptions, ReductQuery};
pub use resources::{parse_and_normalize_condition, replace_interval_macros};
pub use routes::{create_router, AppState};
