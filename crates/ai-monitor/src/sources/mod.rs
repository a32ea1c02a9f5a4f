//! Metric source adapters, one per upstream provider

pub mod cloud;
pub mod http;
pub mod nvidia;
pub mod retry;
pub mod venture;

pub use cloud::{AwsMetricsSource, AzureMetricsSource, GcpMetricsSource};
pub use http::HttpEndpoint;
pub use nvidia::NvidiaMetricsSource;
pub use retry::{RetryPolicy, RetryingSource};
pub use venture::VentureDataSource;

use crate::config::MonitorConfig;
use chrono::{DateTime, NaiveDate, Utc};
use monitor_core::{MetricSource, SourceError};
use std::sync::Arc;

/// The five adapters an aggregator fans out to
#[derive(Clone)]
pub struct Sources {
    pub venture: Arc<dyn MetricSource>,
    pub azure: Arc<dyn MetricSource>,
    pub gcp: Arc<dyn MetricSource>,
    pub aws: Arc<dyn MetricSource>,
    pub nvidia: Arc<dyn MetricSource>,
}

impl Sources {
    /// HTTP-backed adapters for every provider in `config`
    pub fn from_config(config: &MonitorConfig) -> monitor_core::Result<Self> {
        Ok(Self {
            venture: Arc::new(VentureDataSource::new(config)?),
            azure: Arc::new(AzureMetricsSource::new(config)?),
            gcp: Arc::new(GcpMetricsSource::new(config)?),
            aws: Arc::new(AwsMetricsSource::new(config)?),
            nvidia: Arc::new(NvidiaMetricsSource::new(config)?),
        })
    }

    /// Wrap every adapter in a [`RetryingSource`]
    pub fn with_retries(self, policy: &RetryPolicy) -> Self {
        let wrap = |source: Arc<dyn MetricSource>| -> Arc<dyn MetricSource> {
            Arc::new(RetryingSource::new(source, policy.clone()))
        };

        Self {
            venture: wrap(self.venture),
            azure: wrap(self.azure),
            gcp: wrap(self.gcp),
            aws: wrap(self.aws),
            nvidia: wrap(self.nvidia),
        }
    }
}

/// Parse an upstream timestamp: RFC 3339 or a bare `YYYY-MM-DD` date
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, SourceError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| SourceError::invalid(format!("malformed date '{raw}'")))
}

/// Reject NaN, infinite and negative amounts
pub(crate) fn non_negative(value: f64, field: &str) -> Result<f64, SourceError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(SourceError::invalid(format!("{field} must be a non-negative number, got {value}")))
    }
}
