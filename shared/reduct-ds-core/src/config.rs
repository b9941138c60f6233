//! Configuration management for the data source

use crate::error::{DatasourceError, Result};
use crate::protocol::DataSourceInstanceSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Settings of one data source instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSettings {
    pub path: String,
    #[serde(rename = "serverURL")]
    pub server_url: String,
    #[serde(rename = "verifySSL")]
    pub verify_ssl: bool,
    #[serde(skip)]
    pub secrets: SecretPluginSettings,
}

/// Decrypted secure settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretPluginSettings {
    #[serde(rename = "serverToken")]
    pub server_token: String,
}

impl PluginSettings {
    /// Load from the instance JSON plus the decrypted secure map.
    ///
    /// The instance JSON may also arrive as a string holding the document.
    pub fn load(source: &DataSourceInstanceSettings) -> Result<Self> {
        let parsed: serde_json::Result<PluginSettings> = match &source.json_data {
            serde_json::Value::String(raw) => serde_json::from_str(raw),
            other => serde_json::from_value(other.clone()),
        };
        let mut settings: PluginSettings = parsed.map_err(|e| {
            DatasourceError::Config(format!("could not unmarshal PluginSettings json: {}", e))
        })?;

        settings.secrets = SecretPluginSettings {
            server_token: source
                .decrypted_secure_json_data
                .get("serverToken")
                .cloned()
                .unwrap_or_default(),
        };

        Ok(settings)
    }

    /// Load from a flat string map (`serverURL`, `verifySSL`, `serverToken`)
    pub fn from_map(source: &HashMap<String, String>) -> Self {
        let get = |key: &str| source.get(key).cloned().unwrap_or_default();
        Self {
            path: String::new(),
            server_url: get("serverURL"),
            verify_ssl: source.get("verifySSL").map_or(false, |v| v == "true"),
            secrets: SecretPluginSettings {
                server_token: get("serverToken"),
            },
        }
    }

    /// Token to send, if any
    pub fn api_token(&self) -> Option<&str> {
        Some(self.secrets.server_token.as_str()).filter(|t| !t.is_empty())
    }
}

/// Process configuration of the standalone service
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
    pub http_bind: String,
    pub reduct_url: String,
    pub reduct_api_token: Option<String>,
    pub verify_ssl: bool,
    pub timeout: Duration,
    pub log_level: String,
    pub json_logs: bool,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` uses the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            service_name: var("SERVICE_NAME", "reduct-datasource"),
            http_bind: var("HTTP_BIND", "0.0.0.0:8080"),
            reduct_url: var("REDUCT_URL", "http://127.0.0.1:8383"),
            reduct_api_token: lookup("REDUCT_API_TOKEN").filter(|t| !t.is_empty()),
            verify_ssl: var("REDUCT_VERIFY_SSL", "true")
                .parse()
                .map_err(|e| DatasourceError::Config(format!("Invalid REDUCT_VERIFY_SSL: {}", e)))?,
            timeout: Duration::from_secs(
                var("REDUCT_TIMEOUT_SECS", "30")
                    .parse()
                    .map_err(|e| DatasourceError::Config(format!("Invalid REDUCT_TIMEOUT_SECS: {}", e)))?,
            ),
            log_level: var("LOG_LEVEL", "info"),
            json_logs: var("JSON_LOGS", "false").parse().unwrap_or(false),
        })
    }

    /// Instance settings equivalent to this configuration
    pub fn plugin_settings(&self) -> PluginSettings {
        PluginSettings {
            path: String::new(),
            server_url: self.reduct_url.clone(),
            verify_ssl: self.verify_ssl,
            secrets: SecretPluginSettings {
                server_token: self.reduct_api_token.clone().unwrap_or_default(),
            },
        }
    }

    /// Instance settings the host would send for this configuration
    pub fn instance_settings(&self) -> DataSourceInstanceSettings {
        let mut secure = HashMap::new();
        if let Some(token) = &self.reduct_api_token {
            secure.insert("serverToken".to_string(), token.clone());
        }
        DataSourceInstanceSettings {
            name: self.service_name.clone(),
            url: self.reduct_url.clone(),
            json_data: serde_json::json!({
                "serverURL": self.reduct_url,
                "verifySSL": self.verify_ssl,
            }),
            decrypted_secure_json_data: secure,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_plugin_settings() {
        let source = DataSourceInstanceSettings {
            json_data: json!({"serverURL": "http://localhost:8383", "verifySSL": true}),
            decrypted_secure_json_data: HashMap::from([(
                "serverToken".to_string(),
                "secret".to_string(),
            )]),
            ..Default::default()
        };

        let settings = PluginSettings::load(&source).unwrap();
        assert_eq!(settings.server_url, "http://localhost:8383");
        assert!(settings.verify_ssl);
        assert_eq!(settings.api_token(), Some("secret"));
    }

    #[test]
    fn test_load_plugin_settings_rejects_missing_json() {
        let err = PluginSettings::load(&DataSourceInstanceSettings::default()).unwrap_err();
        assert!(matches!(err, DatasourceError::Config(_)));
    }

    #[test]
    fn test_load_plugin_settings_from_raw_json() {
        let mut source = DataSourceInstanceSettings {
            json_data: json!(r#"{"serverURL": "http://x"}"#),
            ..Default::default()
        };
        assert_eq!(PluginSettings::load(&source).unwrap().server_url, "http://x");

        source.json_data = json!("{invalid");
        assert!(PluginSettings::load(&source).is_err());
    }

    #[test]
    fn test_settings_from_map() {
        let source = HashMap::from([
            ("serverURL".to_string(), "http://store".to_string()),
            ("verifySSL".to_string(), "true".to_string()),
        ]);
        let settings = PluginSettings::from_map(&source);
        assert_eq!(settings.server_url, "http://store");
        assert!(settings.verify_ssl);
        assert_eq!(settings.api_token(), None);
    }

    #[test]
    fn test_service_config_defaults() {
        let config = ServiceConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.service_name, "reduct-datasource");
        assert_eq!(config.reduct_url, "http://127.0.0.1:8383");
        assert!(config.verify_ssl);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!config.json_logs);
    }

    #[test]
    fn test_service_config_overrides_and_errors() {
        let vars = HashMap::from([
            ("REDUCT_URL", "https://store:8383"),
            ("REDUCT_API_TOKEN", "token"),
            ("JSON_LOGS", "true"),
        ]);
        let config = ServiceConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.plugin_settings().server_url, "https://store:8383");
        assert_eq!(config.plugin_settings().api_token(), Some("token"));
        assert!(config.json_logs);

        let reloaded = PluginSettings::load(&config.instance_settings()).unwrap();
        assert_eq!(reloaded, config.plugin_settings());

        let err = ServiceConfig::from_lookup(|k| (k == "REDUCT_TIMEOUT_SECS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("REDUCT_TIMEOUT_SECS"));
    }
}
