use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub opentsdb: OpenTsdbSettings,
    #[serde(default)]
    pub server: ServerSettings,
    /// Dashboard template variables
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenTsdbSettings {
    #[serde(default = "default_name")]
    pub name: String,
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_alert_capacity")]
    pub alert_capacity: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            alert_capacity: default_alert_capacity(),
        }
    }
}

fn default_name() -> String {
    "opentsdb".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_alert_capacity() -> usize {
    100
}

/// `config/opentsdb.toml`, overridden by `TSDB__SECTION__KEY` environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/opentsdb").required(false))
        .add_source(config::Environment::with_prefix("TSDB").separator("__"))
        .build()
        .context("Failed to read configuration")?;

    settings
        .try_deserialize()
        .context("Invalid configuration")
}
