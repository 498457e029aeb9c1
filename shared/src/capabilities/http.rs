use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Outcome of a request sent with `expect_json`.
pub type JsonResult = crux_http::Result<crux_http::Response<Value>>;

/// Outcome of a request whose body may be empty.
pub type HttpResult = crux_http::Result<crux_http::Response<Vec<u8>>>;

pub const MAX_URL_LENGTH: usize = 2048;

/// An absolute `http`/`https` URL with a host and no embedded credentials.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedUrl {
    url: Url,
}

impl ValidatedUrl {
    pub fn new(url: impl AsRef<str>) -> Result<Self, UrlError> {
        let url = Self::validate(url.as_ref())?;
        Ok(Self { url })
    }

    /// Validates an already-built [`Url`], e.g. one assembled from path segments.
    pub fn from_url(url: &Url) -> Result<Self, UrlError> {
        Self::new(url.as_str())
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn into_url(self) -> Url {
        self.url
    }

    fn validate(url: &str) -> Result<Url, UrlError> {
        if url.trim().is_empty() {
            return Err(UrlError::Invalid {
                url: url.to_string(),
                reason: "URL cannot be empty".to_string(),
            });
        }

        if url.len() > MAX_URL_LENGTH {
            return Err(UrlError::Invalid {
                url: Self::truncate_url(url),
                reason: format!("URL exceeds maximum length of {MAX_URL_LENGTH} bytes"),
            });
        }

        let parsed = Url::parse(url).map_err(|e| UrlError::Invalid {
            url: Self::truncate_url(url),
            reason: e.to_string(),
        })?;

        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(UrlError::Invalid {
                url: Self::truncate_url(url),
                reason: format!("invalid scheme '{scheme}', only 'http' and 'https' are allowed"),
            });
        }

        if parsed.host_str().is_none() {
            return Err(UrlError::Invalid {
                url: Self::truncate_url(url),
                reason: "URL must have a host".to_string(),
            });
        }

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(UrlError::Invalid {
                url: Self::truncate_url(url),
                reason: "credentials in URL are not allowed".to_string(),
            });
        }

        Ok(parsed)
    }

    fn truncate_url(url: &str) -> String {
        if url.len() <= 100 {
            url.to_string()
        } else {
            let cut = (0..=100).rev().find(|i| url.is_char_boundary(*i)).unwrap_or(0);
            format!("{}...", &url[..cut])
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("invalid URL '{url}': {reason}")]
    Invalid { url: String, reason: String },
}
