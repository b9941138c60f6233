//! Router configuration for the data source HTTP surface

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use reduct_ds_core::{
    CallResourceHandler, CallResourceRequest, CallResourceResponse, CheckHealthHandler,
    CheckHealthRequest, CheckHealthResult, DataSourceInstanceSettings, HealthCheckStatus,
    PluginContext, QueryDataHandler, QueryDataRequest,
};
use reduct_frames::QueryDataResponse;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

use crate::datasource::ReductDatasource;
use crate::error::ApiError;
use crate::metrics::MetricsSnapshot;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub datasource: ReductDatasource,
    /// Instance settings used when a request carries none
    pub instance: Arc<DataSourceInstanceSettings>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(datasource: ReductDatasource, instance: DataSourceInstanceSettings) -> Self {
        Self {
            datasource,
            instance: Arc::new(instance),
            start_time: Instant::now(),
        }
    }

    fn plugin_context(&self) -> PluginContext {
        PluginContext {
            data_source_instance_settings: Some(self.instance.as_ref().clone()),
            ..Default::default()
        }
    }
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Host handlers
        .route("/query", post(query_data))
        .route("/resources/{path}", get(call_resource).post(call_resource))
        .route("/health", get(check_health).post(check_health_with))
        // Liveness, readiness & metrics
        .route("/live", get(live))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn query_data(
    State(state): State<AppState>,
    Json(mut request): Json<QueryDataRequest>,
) -> Result<Json<QueryDataResponse>, ApiError> {
    if request.plugin_context.data_source_instance_settings.is_none() {
        request.plugin_context = state.plugin_context();
    }
    Ok(Json(state.datasource.query_data(request).await?))
}

async fn call_resource(
    State(state): State<AppState>,
    Path(path): Path<String>,
    method: Method,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request = CallResourceRequest {
        plugin_context: state.plugin_context(),
        path,
        method: method.to_string(),
        body: body.to_vec(),
    };
    let response = state.datasource.call_resource(request).await?;
    Ok(resource_response(response))
}

fn resource_response(resource: CallResourceResponse) -> Response {
    let status = StatusCode::from_u16(resource.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, resource.body).into_response();
    for (name, value) in resource.headers {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            response.headers_mut().insert(name, value);
        }
    }
    response
}

/// Check the configured instance settings
async fn check_health(State(state): State<AppState>) -> Result<Response, ApiError> {
    let request = CheckHealthRequest {
        plugin_context: state.plugin_context(),
    };
    let result = state.datasource.check_health(request).await?;
    Ok(health_response(result))
}

/// Check the settings sent by the host
async fn check_health_with(
    State(state): State<AppState>,
    Json(request): Json<CheckHealthRequest>,
) -> Result<Response, ApiError> {
    let result = state.datasource.check_health(request).await?;
    Ok(health_response(result))
}

fn health_response(result: CheckHealthResult) -> Response {
    let status = match result.status {
        HealthCheckStatus::Ok => StatusCode::OK,
        _ => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(result)).into_response()
}

async fn live(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "alive",
        "service": "reduct-datasource",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}

async fn ready(State(state): State<AppState>) -> Response {
    match state.datasource.store().is_live().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "ready": true }))).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ready": false, "error": e.message() })),
        )
            .into_response(),
    }
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.datasource.metrics().snapshot())
}
