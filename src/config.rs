//! Configuration types for catalog-dl

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Remote catalog endpoint configuration
///
/// Describes where the paginated index lives and how to reach per-item
/// detail records. The defaults target a PokéAPI-shaped service; any API
/// with the same `{ count, results: [{ name, url }] }` index shape works.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the remote service (e.g., "https://pokeapi.co/api/v2")
    pub base_url: String,

    /// Path of the paginated index endpoint, relative to `base_url`
    /// (default: "pokemon")
    #[serde(default = "default_list_path")]
    pub list_path: String,

    /// Path of the per-item detail endpoint, relative to `base_url`;
    /// the item identifier is appended as a final path segment
    /// (default: "pokemon")
    #[serde(default = "default_detail_path")]
    pub detail_path: String,

    /// Number of items requested per index page (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Maximum concurrent in-flight detail requests within one batch
    /// (default: 100)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Cap on the total number of items to harvest; `None` trusts the
    /// collection size reported by the index endpoint
    #[serde(default)]
    pub max_items: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            list_path: default_list_path(),
            detail_path: default_detail_path(),
            page_size: default_page_size(),
            concurrency: default_concurrency(),
            max_items: None,
        }
    }
}

/// HTTP client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Retry configuration for the resilient fetcher
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempt budget per fetch call, including the first attempt
    /// (default: 3; zero is treated as one)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 500 milliseconds)
    #[serde(default = "default_initial_delay", with = "duration_millis_serde")]
    pub initial_delay: Duration,

    /// Cap on the delay between retries (default: 10 seconds)
    #[serde(default = "default_max_delay", with = "duration_millis_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for [`CatalogHarvester`](crate::CatalogHarvester)
///
/// Only `api.base_url` is required; every other field has a sensible
/// default.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote catalog endpoints and paging behavior
    pub api: ApiConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Retry behavior of the resilient fetcher
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Convenience constructor for the common case: harvest the default
    /// endpoints of the service at `base_url`.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: base_url.into(),
                ..ApiConfig::default()
            },
            ..Self::default()
        }
    }

    /// Validate the configuration, rejecting values the pipeline cannot
    /// operate with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.api.base_url.trim().is_empty() {
            return Err(Error::Config {
                message: "base_url must not be empty".to_string(),
                key: Some("api.base_url".to_string()),
            });
        }
        if url::Url::parse(&self.api.base_url).is_err() {
            return Err(Error::Config {
                message: format!("base_url is not a valid URL: {}", self.api.base_url),
                key: Some("api.base_url".to_string()),
            });
        }
        if self.api.page_size == 0 {
            return Err(Error::Config {
                message: "page_size must be greater than zero".to_string(),
                key: Some("api.page_size".to_string()),
            });
        }
        if self.api.concurrency == 0 {
            return Err(Error::Config {
                message: "concurrency must be greater than zero".to_string(),
                key: Some("api.concurrency".to_string()),
            });
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::Config {
                message: "backoff_multiplier must be at least 1.0".to_string(),
                key: Some("retry.backoff_multiplier".to_string()),
            });
        }
        Ok(())
    }
}

fn default_list_path() -> String {
    "pokemon".to_string()
}

fn default_detail_path() -> String {
    "pokemon".to_string()
}

fn default_page_size() -> u64 {
    100
}

fn default_concurrency() -> usize {
    100
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("catalog-dl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole milliseconds)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::for_base_url("http://api.test/v2");
        assert_eq!(config.api.page_size, 100);
        assert_eq!(config.api.concurrency, 100);
        assert_eq!(config.api.max_items, None);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(500));
        assert_eq!(config.retry.max_delay, Duration::from_secs(10));
        assert!(config.retry.jitter);
        assert_eq!(config.http.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn validate_accepts_defaults_with_base_url() {
        let config = Config::for_base_url("http://api.test/v2");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_base_url() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config { key: Some(ref k), .. } if k == "api.base_url"));
    }

    #[test]
    fn validate_rejects_unparseable_base_url() {
        let config = Config::for_base_url("not a url");
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut config = Config::for_base_url("http://api.test/v2");
        config.api.page_size = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config { key: Some(ref k), .. } if k == "api.page_size"));
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::for_base_url("http://api.test/v2");
        config.api.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_sub_one_backoff_multiplier() {
        let mut config = Config::for_base_url("http://api.test/v2");
        config.retry.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_json_roundtrip_with_partial_input() {
        // Only base_url given; everything else should take defaults
        let json = r#"{ "api": { "base_url": "http://api.test/v2" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.api.base_url, "http://api.test/v2");
        assert_eq!(config.api.page_size, 100);
        assert_eq!(config.retry.max_attempts, 3);

        let serialized = serde_json::to_string(&config).unwrap();
        let reparsed: Config = serde_json::from_str(&serialized).unwrap();
        assert_eq!(reparsed.api.page_size, config.api.page_size);
        assert_eq!(reparsed.retry.initial_delay, config.retry.initial_delay);
    }
}
