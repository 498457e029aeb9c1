//! Layered shell settings: built-in defaults, then `fleet.toml`, then `FLEET_*`
//! environment variables. Command-line flags are applied on top by `main`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use fleet_shared::config::{ApiConfig, DEFAULT_API_BASE_URL};

const DEFAULT_REQUEST_TIMEOUT_SECS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

impl Settings {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path),
            None => config::File::with_name("fleet").required(false),
        };
        let settings = defaults()?
            .add_source(file)
            .add_source(config::Environment::with_prefix("FLEET").try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    #[must_use]
    pub fn api_config(&self, base_url_override: Option<&str>) -> ApiConfig {
        ApiConfig::new(base_url_override.unwrap_or(&self.api_base_url))
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    config::Config::builder()
        .set_default("api_base_url", DEFAULT_API_BASE_URL)?
        .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS)
}
