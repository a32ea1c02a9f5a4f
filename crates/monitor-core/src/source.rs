//! The adapter contract between upstream providers and the aggregator

use crate::error::SourceError;
use crate::range::TimeRange;
use crate::snapshot::{CloudMetrics, CloudProvider, NvidiaMetrics, VentureInvestment};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one of the five upstream adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    VentureData,
    AzureMetrics,
    GcpMetrics,
    AwsMetrics,
    NvidiaMetrics,
}

impl SourceId {
    /// Every adapter, in the order failures are reported
    pub const ALL: [SourceId; 5] = [
        Self::VentureData,
        Self::AzureMetrics,
        Self::GcpMetrics,
        Self::AwsMetrics,
        Self::NvidiaMetrics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VentureData => "venture_data",
            Self::AzureMetrics => "azure_metrics",
            Self::GcpMetrics => "gcp_metrics",
            Self::AwsMetrics => "aws_metrics",
            Self::NvidiaMetrics => "nvidia_metrics",
        }
    }

    /// Upstream service the adapter talks to
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::VentureData => "CB Insights API",
            Self::AzureMetrics => "Azure Monitor API",
            Self::GcpMetrics => "Google Cloud Monitoring API",
            Self::AwsMetrics => "AWS CloudWatch API",
            Self::NvidiaMetrics => "SEC Filings + Financial Reports",
        }
    }

    /// How often the upstream publishes new data
    pub fn frequency(&self) -> &'static str {
        match self {
            Self::VentureData | Self::NvidiaMetrics => "quarterly",
            Self::AzureMetrics | Self::GcpMetrics | Self::AwsMetrics => "continuous",
        }
    }

    /// Adapter responsible for a cloud provider's subsection
    pub fn for_cloud(provider: CloudProvider) -> Self {
        match provider {
            CloudProvider::Azure => Self::AzureMetrics,
            CloudProvider::Gcp => Self::GcpMetrics,
            CloudProvider::Aws => Self::AwsMetrics,
        }
    }

    /// The cloud provider this adapter covers, if any
    pub fn cloud_provider(&self) -> Option<CloudProvider> {
        match self {
            Self::AzureMetrics => Some(CloudProvider::Azure),
            Self::GcpMetrics => Some(CloudProvider::Gcp),
            Self::AwsMetrics => Some(CloudProvider::Aws),
            Self::VentureData | Self::NvidiaMetrics => None,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adapter-normalized result of one provider fetch
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderRecord {
    Venture(VentureInvestment),
    Cloud {
        provider: CloudProvider,
        metrics: CloudMetrics,
    },
    Nvidia(NvidiaMetrics),
}

impl ProviderRecord {
    /// The adapter expected to produce this kind of record
    pub fn source_id(&self) -> SourceId {
        match self {
            Self::Venture(_) => SourceId::VentureData,
            Self::Cloud { provider, .. } => SourceId::for_cloud(*provider),
            Self::Nvidia(_) => SourceId::NvidiaMetrics,
        }
    }
}

/// An upstream data provider
///
/// Implementations must not fail on legitimately empty results: zero deals or
/// zero usage is a successful record with zero-valued fields.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Which adapter this is
    fn id(&self) -> SourceId;

    /// Fetch the provider's record for `range`
    async fn fetch(&self, range: &TimeRange) -> Result<ProviderRecord, SourceError>;
}

/// Kind of a reported source failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    SourceUnavailable,
    SourceDataInvalid,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceUnavailable => f.write_str("SourceUnavailable"),
            Self::SourceDataInvalid => f.write_str("SourceDataInvalid"),
        }
    }
}

/// One adapter that failed during an aggregation, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub adapter: SourceId,
    pub kind: FailureKind,
    pub message: String,
}

impl SourceFailure {
    pub fn new(adapter: SourceId, error: &SourceError) -> Self {
        let kind = match error {
            SourceError::Unavailable(_) => FailureKind::SourceUnavailable,
            SourceError::DataInvalid(_) => FailureKind::SourceDataInvalid,
        };
        Self {
            adapter,
            kind,
            message: error.reason().to_string(),
        }
    }
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.adapter, self.kind, self.message)
    }
}
