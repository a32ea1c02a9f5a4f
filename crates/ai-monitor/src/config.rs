//! Configuration for the metric sources and aggregation

use monitor_core::{MonitorError, Result};
use monitor_utils::AppConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const ENV_PREFIX: &str = "AI_MONITOR";

/// Upper bound for `max_retries`
pub const MAX_RETRIES: u32 = 10;

/// Where one upstream endpoint lives and how to authenticate against it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEndpoint {
    /// Endpoint queried with the requested range
    pub url: Url,
    /// Bearer token, if the provider requires one
    pub api_key: Option<String>,
}

impl SourceEndpoint {
    /// Endpoint from a URL string
    pub fn parse(url: &str) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| MonitorError::ConfigError(format!("invalid endpoint URL '{url}': {e}")))?;
        Ok(Self { url, api_key: None })
    }

    /// Attach a bearer token
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    fn default_for(url: &str) -> Self {
        Self {
            url: Url::parse(url).expect("built-in endpoint URL is valid"),
            api_key: None,
        }
    }
}

/// Upstream endpoints, one per adapter (NVIDIA has two sub-fetches)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub venture: SourceEndpoint,
    pub azure: SourceEndpoint,
    pub gcp: SourceEndpoint,
    pub aws: SourceEndpoint,
    pub nvidia_filings: SourceEndpoint,
    pub nvidia_news: SourceEndpoint,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            venture: SourceEndpoint::default_for("https://api.cbinsights.com/v2/deals"),
            azure: SourceEndpoint::default_for("https://management.azure.com/metrics"),
            gcp: SourceEndpoint::default_for(
                "https://monitoring.googleapis.com/v3/projects/-/timeSeries",
            ),
            aws: SourceEndpoint::default_for(
                "https://monitoring.us-east-1.amazonaws.com/metric-data",
            ),
            nvidia_filings: SourceEndpoint::default_for(
                "https://data.sec.gov/api/nvidia/quarterly",
            ),
            nvidia_news: SourceEndpoint::default_for("https://finnhub.io/api/v1/nvidia/orders"),
        }
    }
}

impl Endpoints {
    fn iter_mut(&mut self) -> impl Iterator<Item = (&'static str, &mut SourceEndpoint)> {
        [
            ("VENTURE", &mut self.venture),
            ("AZURE", &mut self.azure),
            ("GCP", &mut self.gcp),
            ("AWS", &mut self.aws),
            ("NVIDIA_FILINGS", &mut self.nvidia_filings),
            ("NVIDIA_NEWS", &mut self.nvidia_news),
        ]
        .into_iter()
    }

    fn iter(&self) -> impl Iterator<Item = &SourceEndpoint> {
        [
            &self.venture,
            &self.azure,
            &self.gcp,
            &self.aws,
            &self.nvidia_filings,
            &self.nvidia_news,
        ]
        .into_iter()
    }
}

/// Configuration for the monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Application identity
    pub app: AppConfig,

    /// Upstream endpoints
    pub endpoints: Endpoints,

    /// Per-request upstream timeout; exceeding it is reported as unavailable
    pub request_timeout: Duration,

    /// Requests per minute allowed against each provider
    pub rate_limit_per_minute: u32,

    /// Number of deals kept in `top_deals`
    pub top_deals_limit: usize,

    /// Maximum attempts for callers that opt into retries
    pub max_retries: u32,

    /// Initial backoff duration for retries
    pub retry_backoff_base: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            endpoints: Endpoints::default(),
            request_timeout: Duration::from_secs(30),
            rate_limit_per_minute: 60,
            top_deals_limit: 10,
            max_retries: 3,
            retry_backoff_base: Duration::from_secs(1),
        }
    }
}

impl MonitorConfig {
    /// Create a new configuration builder
    pub fn builder() -> MonitorConfigBuilder {
        MonitorConfigBuilder::default()
    }

    /// Defaults overridden by `AI_MONITOR_*` environment variables
    ///
    /// Recognized: `AI_MONITOR_<SOURCE>_URL`, `AI_MONITOR_<SOURCE>_API_KEY`
    /// for `VENTURE`, `AZURE`, `GCP`, `AWS`, `NVIDIA_FILINGS`, `NVIDIA_NEWS`,
    /// plus `AI_MONITOR_TIMEOUT_SECS` and `AI_MONITOR_RATE_LIMIT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an injectable variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        for (name, endpoint) in config.endpoints.iter_mut() {
            if let Some(url) = lookup(&format!("{ENV_PREFIX}_{name}_URL")) {
                endpoint.url = SourceEndpoint::parse(&url)?.url;
            }
            if let Some(key) = lookup(&format!("{ENV_PREFIX}_{name}_API_KEY")) {
                endpoint.api_key = Some(key);
            }
        }

        if let Some(secs) = lookup(&format!("{ENV_PREFIX}_TIMEOUT_SECS")) {
            let secs = secs.parse::<u64>().map_err(|e| {
                MonitorError::ConfigError(format!("{ENV_PREFIX}_TIMEOUT_SECS: {e}"))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(limit) = lookup(&format!("{ENV_PREFIX}_RATE_LIMIT")) {
            config.rate_limit_per_minute = limit.parse::<u32>().map_err(|e| {
                MonitorError::ConfigError(format!("{ENV_PREFIX}_RATE_LIMIT: {e}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(MonitorError::ConfigError(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_per_minute == 0 {
            return Err(MonitorError::ConfigError(
                "rate_limit_per_minute must be greater than 0".to_string(),
            ));
        }

        if self.top_deals_limit == 0 {
            return Err(MonitorError::ConfigError(
                "top_deals_limit must be greater than 0".to_string(),
            ));
        }

        if self.max_retries == 0 || self.max_retries > MAX_RETRIES {
            return Err(MonitorError::ConfigError(format!(
                "max_retries must be between 1 and {MAX_RETRIES}"
            )));
        }

        if let Some(endpoint) = self
            .endpoints
            .iter()
            .find(|e| !matches!(e.url.scheme(), "http" | "https"))
        {
            return Err(MonitorError::ConfigError(format!(
                "endpoint {} must use http or https",
                endpoint.url
            )));
        }

        Ok(())
    }

    /// Get retry backoff duration for attempt number
    ///
    /// Saturates at `Duration::MAX` instead of overflowing.
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        2_u32
            .checked_pow(attempt)
            .and_then(|factor| self.retry_backoff_base.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }
}

/// Builder for MonitorConfig
#[derive(Debug, Default)]
pub struct MonitorConfigBuilder {
    app: Option<AppConfig>,
    endpoints: Option<Endpoints>,
    request_timeout: Option<Duration>,
    rate_limit_per_minute: Option<u32>,
    top_deals_limit: Option<usize>,
    max_retries: Option<u32>,
    retry_backoff_base: Option<Duration>,
}

impl MonitorConfigBuilder {
    /// Set application identity
    pub fn app(mut self, app: AppConfig) -> Self {
        self.app = Some(app);
        self
    }

    /// Set all upstream endpoints
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the per-provider rate limit
    pub fn rate_limit_per_minute(mut self, limit: u32) -> Self {
        self.rate_limit_per_minute = Some(limit);
        self
    }

    /// Set how many top deals to keep
    pub fn top_deals_limit(mut self, limit: usize) -> Self {
        self.top_deals_limit = Some(limit);
        self
    }

    /// Set maximum retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set retry backoff base duration
    pub fn retry_backoff_base(mut self, duration: Duration) -> Self {
        self.retry_backoff_base = Some(duration);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<MonitorConfig> {
        let defaults = MonitorConfig::default();

        let config = MonitorConfig {
            app: self.app.unwrap_or(defaults.app),
            endpoints: self.endpoints.unwrap_or(defaults.endpoints),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            rate_limit_per_minute: self
                .rate_limit_per_minute
                .unwrap_or(defaults.rate_limit_per_minute),
            top_deals_limit: self.top_deals_limit.unwrap_or(defaults.top_deals_limit),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.top_deals_limit, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = MonitorConfig::builder()
            .request_timeout(Duration::from_secs(5))
            .top_deals_limit(3)
            .build()
            .unwrap();

        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.top_deals_limit, 3);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_validation_zero_timeout() {
        let result = MonitorConfig::builder()
            .request_timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(MonitorError::ConfigError(_))));
    }

    #[test]
    fn test_validation_rejects_non_http_endpoint() {
        let mut config = MonitorConfig::default();
        config.endpoints.aws = SourceEndpoint::parse("ftp://example.com/metrics").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("AI_MONITOR_GCP_URL", "http://127.0.0.1:9000/gcp"),
            ("AI_MONITOR_GCP_API_KEY", "secret"),
            ("AI_MONITOR_TIMEOUT_SECS", "7"),
        ]);

        let config =
            MonitorConfig::from_lookup(|key| vars.get(key).map(ToString::to_string)).unwrap();

        assert_eq!(config.endpoints.gcp.url.as_str(), "http://127.0.0.1:9000/gcp");
        assert_eq!(config.endpoints.gcp.api_key.as_deref(), Some("secret"));
        assert_eq!(config.endpoints.azure, Endpoints::default().azure);
        assert_eq!(config.request_timeout, Duration::from_secs(7));
    }

    #[test]
    fn test_from_lookup_bad_values() {
        let bad_url = MonitorConfig::from_lookup(|key| {
            (key == "AI_MONITOR_AWS_URL").then(|| "not a url".to_string())
        });
        assert!(bad_url.is_err());

        let bad_timeout = MonitorConfig::from_lookup(|key| {
            (key == "AI_MONITOR_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(bad_timeout.is_err());
    }

    #[test]
    fn test_retry_backoff() {
        let config = MonitorConfig::default();
        assert_eq!(config.retry_backoff(0), Duration::from_secs(1));
        assert_eq!(config.retry_backoff(1), Duration::from_secs(2));
        assert_eq!(config.retry_backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_retry_backoff_saturates() {
        let config = MonitorConfig::default();
        assert_eq!(config.retry_backoff(40), Duration::MAX);
        assert_eq!(config.retry_backoff(u32::MAX), Duration::MAX);
    }

    #[test]
    fn test_validation_bounds_max_retries() {
        assert!(MonitorConfig::builder().max_retries(MAX_RETRIES).build().is_ok());

        let result = MonitorConfig::builder().max_retries(40).build();
        assert!(matches!(result, Err(MonitorError::ConfigError(_))));

        let result = MonitorConfig::builder().max_retries(0).build();
        assert!(matches!(result, Err(MonitorError::ConfigError(_))));
    }
}
