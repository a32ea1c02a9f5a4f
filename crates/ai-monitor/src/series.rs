//! Chart-ready series derived from a snapshot
//!
//! Every derivation is a pure function of an optional snapshot. With no
//! snapshot (before the first aggregation completes) each returns an empty
//! vec, so the renderer always gets a well-typed input.

use monitor_core::range::quarter_label;
use monitor_core::{Company, MetricSnapshot};
use serde::Serialize;
use std::collections::BTreeMap;

/// One labeled value on a line chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Quarter label, e.g. `2024Q1`
    pub label: String,
    pub value: f64,
}

impl SeriesPoint {
    fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// One named line on a line chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

/// One slice of a pie chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    /// Share of the whole, in `[0, 1]`
    pub proportion: f64,
}

/// Everything the dashboard draws
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSet {
    pub venture: Vec<SeriesPoint>,
    pub cloud: Vec<LineSeries>,
    pub nvidia: Vec<LineSeries>,
    pub mag7: Vec<PieSlice>,
}

impl ChartSet {
    pub fn derive(snapshot: Option<&MetricSnapshot>) -> Self {
        Self {
            venture: venture_series(snapshot),
            cloud: cloud_series(snapshot),
            nvidia: nvidia_series(snapshot),
            mag7: mag7_breakdown(snapshot),
        }
    }

    /// True when every chart has no data
    pub fn is_empty(&self) -> bool {
        self.venture.is_empty()
            && self.cloud.is_empty()
            && self.nvidia.is_empty()
            && self.mag7.is_empty()
    }
}

/// Venture investment per quarter, from the top deals
///
/// Amounts of the kept `top_deals` are summed per calendar quarter,
/// ascending. Deals past the configured limit are not in the snapshot, so the
/// points can add up to less than `total_investment`. Without deals the
/// series is a single `total_investment` point at the range's quarter.
pub fn venture_series(snapshot: Option<&MetricSnapshot>) -> Vec<SeriesPoint> {
    let Some(snapshot) = snapshot else {
        return Vec::new();
    };
    let venture = &snapshot.venture_investment;

    if venture.top_deals.is_empty() {
        return vec![SeriesPoint::new(
            snapshot.range.quarter_label(),
            venture.total_investment,
        )];
    }

    let mut per_quarter: BTreeMap<String, f64> = BTreeMap::new();
    for deal in &venture.top_deals {
        *per_quarter.entry(quarter_label(deal.date)).or_default() += deal.amount;
    }

    per_quarter
        .into_iter()
        .map(|(label, value)| SeriesPoint::new(label, value))
        .collect()
}

/// GPU utilization, one line per cloud provider
pub fn cloud_series(snapshot: Option<&MetricSnapshot>) -> Vec<LineSeries> {
    let Some(snapshot) = snapshot else {
        return Vec::new();
    };
    let label = snapshot.range.quarter_label();

    snapshot
        .cloud_workloads
        .iter()
        .map(|(provider, metrics)| LineSeries {
            name: provider.to_string(),
            points: vec![SeriesPoint::new(label.clone(), metrics.gpu_utilization)],
        })
        .collect()
}

/// NVIDIA revenue history and the range's total orders
pub fn nvidia_series(snapshot: Option<&MetricSnapshot>) -> Vec<LineSeries> {
    let Some(snapshot) = snapshot else {
        return Vec::new();
    };
    let nvidia = &snapshot.nvidia_metrics;

    // Financials are stored newest first.
    let revenue = nvidia
        .quarterly_financials
        .iter()
        .rev()
        .map(|q| SeriesPoint::new(q.quarter.clone(), q.revenue))
        .collect();

    vec![
        LineSeries {
            name: "revenue".to_string(),
            points: revenue,
        },
        LineSeries {
            name: "total_orders".to_string(),
            points: vec![SeriesPoint::new(
                snapshot.range.quarter_label(),
                nvidia.total_orders,
            )],
        },
    ]
}

/// Share of NVIDIA orders per Magnificent-7 company
///
/// Proportions are taken against `max(total_orders, Σ breakdown)`, so no
/// slice exceeds 1 and the slices never sum past 1 even if upstream data
/// breaks the breakdown invariant. A zero denominator gives all-zero slices.
pub fn mag7_breakdown(snapshot: Option<&MetricSnapshot>) -> Vec<PieSlice> {
    let Some(snapshot) = snapshot else {
        return Vec::new();
    };
    let nvidia = &snapshot.nvidia_metrics;
    let denominator = nvidia.total_orders.max(nvidia.breakdown_total());

    Company::ALL
        .into_iter()
        .map(|company| {
            let value = nvidia.breakdown.get(&company).copied().unwrap_or_default().max(0.0);
            let proportion = if denominator > 0.0 {
                (value / denominator).clamp(0.0, 1.0)
            } else {
                0.0
            };
            PieSlice {
                label: company.to_string(),
                value,
                proportion,
            }
        })
        .collect()
}
