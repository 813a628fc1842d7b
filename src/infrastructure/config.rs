use serde::Deserialize;

use crate::application::alert_engine::AlertRules;
use crate::domain::alert::DEFAULT_ALERT_CAPACITY;
use crate::domain::anomaly::DEFAULT_ANOMALY_CAPACITY;
use crate::domain::liveness::DEFAULT_LIVENESS_TIMEOUT_MS;
use crate::domain::window::DEFAULT_WINDOW_CAPACITY;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub store: StoreSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    pub base_url: String,
    #[serde(default = "default_root_path")]
    pub root_path: String,
    #[serde(default = "default_live_child")]
    pub live_child: String,
    #[serde(default = "default_history_child")]
    pub history_child: String,
    pub auth_token: Option<String>,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineSettings {
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
    #[serde(default = "default_anomaly_capacity")]
    pub anomaly_capacity: usize,
    #[serde(default = "default_alert_capacity")]
    pub alert_capacity: usize,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_liveness_timeout_ms")]
    pub liveness_timeout_ms: i64,
    #[serde(default = "default_liveness_check_interval_ms")]
    pub liveness_check_interval_ms: u64,
    #[serde(default = "default_drift_interval_ms")]
    pub drift_interval_ms: u64,
    pub noise_seed: Option<u64>,
    #[serde(default)]
    pub alerts: AlertRules,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            anomaly_capacity: default_anomaly_capacity(),
            alert_capacity: default_alert_capacity(),
            history_limit: default_history_limit(),
            liveness_timeout_ms: default_liveness_timeout_ms(),
            liveness_check_interval_ms: default_liveness_check_interval_ms(),
            drift_interval_ms: default_drift_interval_ms(),
            noise_seed: None,
            alerts: AlertRules::default(),
        }
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_root_path() -> String {
    "2_AC_Power_Facter".to_string()
}

fn default_live_child() -> String {
    "1_AC_Power_Choke".to_string()
}

fn default_history_child() -> String {
    "history".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    3_000
}

fn default_window_capacity() -> usize {
    DEFAULT_WINDOW_CAPACITY
}

fn default_anomaly_capacity() -> usize {
    DEFAULT_ANOMALY_CAPACITY
}

fn default_alert_capacity() -> usize {
    DEFAULT_ALERT_CAPACITY
}

fn default_history_limit() -> usize {
    5
}

fn default_liveness_timeout_ms() -> i64 {
    DEFAULT_LIVENESS_TIMEOUT_MS
}

fn default_liveness_check_interval_ms() -> u64 {
    1_000
}

fn default_drift_interval_ms() -> u64 {
    2_000
}

/// Reads `config/pipeline.toml` (optional) and `POWERMON__*` overrides,
/// e.g. `POWERMON__STORE__BASE_URL`.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/pipeline").required(false))
        .add_source(config::Environment::with_prefix("POWERMON").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    fn parse(toml: &str) -> AppConfig {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = parse(
            r#"
            [store]
            base_url = "https://example-rtdb.firebaseio.com"
            "#,
        );

        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.store.live_child, "1_AC_Power_Choke");
        assert_eq!(config.store.auth_token, None);
        assert_eq!(config.pipeline.window_capacity, 20);
        assert_eq!(config.pipeline.anomaly_capacity, 50);
        assert_eq!(config.pipeline.alert_capacity, 10);
        assert_eq!(config.pipeline.liveness_timeout_ms, 5_000);
        assert_eq!(config.pipeline.alerts.overload_power, 0.005);
    }

    #[test]
    fn test_pipeline_overrides() {
        let config = parse(
            r#"
            [store]
            base_url = "http://localhost:9000"
            auth_token = "secret"

            [pipeline]
            drift_interval_ms = 500
            noise_seed = 42

            [pipeline.alerts]
            overload_power = 150.0
            "#,
        );

        assert_eq!(config.store.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.pipeline.drift_interval_ms, 500);
        assert_eq!(config.pipeline.noise_seed, Some(42));
        assert_eq!(config.pipeline.alerts.overload_power, 150.0);
        assert_eq!(config.pipeline.alerts.unbalance_tolerance, 0.1);
    }
}
