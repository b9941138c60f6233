//! Host health check ("Save & test")

use async_trait::async_trait;
use reduct_ds_core::{
    CheckHealthHandler, CheckHealthRequest, CheckHealthResult, PluginSettings, Result,
};
use tracing::{debug, warn};

use crate::datasource::{ReductDatasource, StoreConnector};

pub const MSG_SETTINGS: &str = "Unable to load settings";
pub const MSG_MISSING_URL: &str = "Server URL is missing";
pub const MSG_UNREACHABLE: &str = "Unable to connect to server";
pub const MSG_AUTH: &str = "Authentication failed or server error";
pub const MSG_OK: &str = "Data source is working";

/// Check the settings carried by `request`, connecting through `connector`.
///
/// Outcomes are reported in the result, never as an error.
pub async fn check_settings(
    connector: &dyn StoreConnector,
    request: &CheckHealthRequest,
) -> CheckHealthResult {
    let settings = match request
        .plugin_context
        .data_source_instance_settings
        .as_ref()
        .map(PluginSettings::load)
    {
        Some(Ok(settings)) => settings,
        Some(Err(e)) => {
            warn!(error = %e, "Failed to load settings");
            return CheckHealthResult::error(MSG_SETTINGS);
        }
        None => return CheckHealthResult::error(MSG_SETTINGS),
    };

    if settings.server_url.is_empty() {
        return CheckHealthResult::error(MSG_MISSING_URL);
    }

    let store = match connector.connect(&settings) {
        Ok(store) => store,
        Err(e) => {
            warn!(error = %e, "Failed to build client");
            return CheckHealthResult::error(MSG_UNREACHABLE);
        }
    };

    if let Err(e) = store.is_live().await {
        warn!(server_url = %settings.server_url, error = %e, "Server is not live");
        return CheckHealthResult::error(MSG_UNREACHABLE);
    }

    if let Err(e) = store.server_info().await {
        warn!(server_url = %settings.server_url, error = %e, "Server info failed");
        return CheckHealthResult::error(MSG_AUTH);
    }

    debug!(server_url = %settings.server_url, "Health check passed");
    CheckHealthResult::ok(MSG_OK)
}

#[async_trait]
impl CheckHealthHandler for ReductDatasource {
    async fn check_health(&self, request: CheckHealthRequest) -> Result<CheckHealthResult> {
        Ok(check_settings(self.connector().as_ref(), &request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reduct_client::MemoryStore;
    use reduct_ds_core::{DataSourceInstanceSettings, HealthCheckStatus, PluginContext};
    use serde_json::json;

    fn request(json_data: serde_json::Value) -> CheckHealthRequest {
        CheckHealthRequest {
            plugin_context: PluginContext {
                data_source_instance_settings: Some(DataSourceInstanceSettings {
                    json_data,
                    ..Default::default()
                }),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_health_outcomes_in_order() {
        let store = MemoryStore::new();

        let result = check_settings(&store, &request(json!("{invalid"))).await;
        assert_eq!(result.status, HealthCheckStatus::Error);
        assert_eq!(result.message, MSG_SETTINGS);

        let result = check_settings(&store, &CheckHealthRequest::default()).await;
        assert_eq!(result.message, MSG_SETTINGS);

        let result = check_settings(&store, &request(json!({}))).await;
        assert_eq!(result.message, MSG_MISSING_URL);

        let result = check_settings(&store, &request(json!({"serverURL": "http://x"}))).await;
        assert_eq!(result.status, HealthCheckStatus::Ok);
        assert_eq!(result.message, MSG_OK);

        store.fail_info("invalid token");
        let result = check_settings(&store, &request(json!({"serverURL": "http://x"}))).await;
        assert_eq!(result.message, MSG_AUTH);

        store.fail_liveness("boom");
        let result = check_settings(&store, &request(json!({"serverURL": "http://x"}))).await;
        assert_eq!(result.message, MSG_UNREACHABLE);
    }
}
