//! The unified metrics snapshot produced by one aggregation cycle
//!
//! Every leaf has a zero default (`0`, empty vec, map of zeros), so chart
//! mapping only needs to care whether a snapshot exists at all, never whether
//! a key inside it does.

use crate::range::TimeRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Joined, provider-agnostic metrics for one time range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    /// Range the snapshot was aggregated for
    pub range: TimeRange,
    pub venture_investment: VentureInvestment,
    pub cloud_workloads: CloudWorkloads,
    pub nvidia_metrics: NvidiaMetrics,
}

impl MetricSnapshot {
    /// A snapshot where every section holds its zero default
    pub fn zeroed(range: TimeRange) -> Self {
        Self {
            range,
            venture_investment: VentureInvestment::default(),
            cloud_workloads: CloudWorkloads::default(),
            nvidia_metrics: NvidiaMetrics::default(),
        }
    }

    /// Whether every metric equals its zero default
    pub fn is_zeroed(&self) -> bool {
        self.venture_investment == VentureInvestment::default()
            && self.cloud_workloads == CloudWorkloads::default()
            && self.nvidia_metrics == NvidiaMetrics::default()
    }
}

// ---------------------------------------------------------------------------
// Venture investment
// ---------------------------------------------------------------------------

/// Venture capital flowing into AI companies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VentureInvestment {
    /// Sum of all deal amounts in the range (USD)
    pub total_investment: f64,
    /// Number of deals in the range
    pub deal_count: u64,
    /// Largest deals, ordered by amount descending
    pub top_deals: Vec<Deal>,
}

/// One funding round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub name: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Cloud workloads
// ---------------------------------------------------------------------------

/// Cloud provider tracked for AI workloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudProvider {
    Azure,
    Gcp,
    Aws,
}

impl CloudProvider {
    pub const ALL: [CloudProvider; 3] = [Self::Azure, Self::Gcp, Self::Aws];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Azure => "azure",
            Self::Gcp => "gcp",
            Self::Aws => "aws",
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AI workload metrics of one cloud provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudMetrics {
    /// Average GPU utilization over the range, 0-100
    pub gpu_utilization: f64,
    /// Total AI service usage over the range (provider units)
    pub ai_service_usage: f64,
}

/// Per-provider cloud metrics; always holds every [`CloudProvider`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CloudWorkloads(BTreeMap<CloudProvider, CloudMetrics>);

impl Default for CloudWorkloads {
    fn default() -> Self {
        Self(
            CloudProvider::ALL
                .into_iter()
                .map(|p| (p, CloudMetrics::default()))
                .collect(),
        )
    }
}

impl CloudWorkloads {
    pub fn get(&self, provider: CloudProvider) -> CloudMetrics {
        self.0.get(&provider).copied().unwrap_or_default()
    }

    pub fn set(&mut self, provider: CloudProvider, metrics: CloudMetrics) {
        self.0.insert(provider, metrics);
    }

    /// Providers and their metrics in `azure, gcp, aws` order
    pub fn iter(&self) -> impl Iterator<Item = (CloudProvider, CloudMetrics)> + '_ {
        self.0.iter().map(|(p, m)| (*p, *m))
    }
}

// ---------------------------------------------------------------------------
// NVIDIA
// ---------------------------------------------------------------------------

/// Magnificent-7 companies tracked in the NVIDIA order breakdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Company {
    Meta,
    Apple,
    Amazon,
    Microsoft,
    Alphabet,
    Nvidia,
    Tesla,
}

impl Company {
    pub const ALL: [Company; 7] = [
        Self::Meta,
        Self::Apple,
        Self::Amazon,
        Self::Microsoft,
        Self::Alphabet,
        Self::Nvidia,
        Self::Tesla,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meta => "meta",
            Self::Apple => "apple",
            Self::Amazon => "amazon",
            Self::Microsoft => "microsoft",
            Self::Alphabet => "alphabet",
            Self::Nvidia => "nvidia",
            Self::Tesla => "tesla",
        }
    }

    /// Case-insensitive lookup that also accepts common aliases and tickers
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "meta" | "facebook" | "meta platforms" => Some(Self::Meta),
            "apple" | "aapl" => Some(Self::Apple),
            "amazon" | "amzn" | "aws" => Some(Self::Amazon),
            "microsoft" | "msft" => Some(Self::Microsoft),
            "alphabet" | "google" | "googl" | "goog" => Some(Self::Alphabet),
            "nvidia" | "nvda" => Some(Self::Nvidia),
            "tesla" | "tsla" => Some(Self::Tesla),
            _ => None,
        }
    }
}

impl fmt::Display for Company {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// NVIDIA order estimates and reported financials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NvidiaMetrics {
    /// Estimated total orders in the range (USD)
    pub total_orders: f64,
    /// Share of total orders placed by the Magnificent 7, 0-100
    pub mag7_percentage: f64,
    /// Orders per company; always holds every [`Company`], sums to `<= total_orders`
    pub breakdown: BTreeMap<Company, f64>,
    /// Latest reported quarters, newest first
    pub quarterly_financials: Vec<QuarterlyFinancials>,
}

impl Default for NvidiaMetrics {
    fn default() -> Self {
        Self {
            total_orders: 0.0,
            mag7_percentage: 0.0,
            breakdown: Company::ALL.into_iter().map(|c| (c, 0.0)).collect(),
            quarterly_financials: Vec::new(),
        }
    }
}

impl NvidiaMetrics {
    /// Sum of the per-company breakdown
    pub fn breakdown_total(&self) -> f64 {
        self.breakdown.values().sum()
    }
}

/// One reported fiscal quarter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterlyFinancials {
    /// Calendar quarter label, e.g. `2024Q2`
    pub quarter: String,
    pub revenue: f64,
    pub net_income: f64,
    /// Gross profit as a percentage of revenue
    pub gross_margin: f64,
}
