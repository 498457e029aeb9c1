use serde::{Deserialize, Serialize};

use crate::capabilities::{UrlError, ValidatedUrl};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5500/api";

/// Where the fleet REST API lives. Shells decide how this gets populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn validate(&self) -> Result<ValidatedUrl, UrlError> {
        ValidatedUrl::new(self.base_url.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_local_api() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url, "http://localhost:5500/api");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_field_deserializes_to_default() {
        let config: ApiConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ApiConfig::default());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(ApiConfig::new("ftp://fleet.example.com").validate().is_err());
        assert!(ApiConfig::new("not a url").validate().is_err());
    }
}
