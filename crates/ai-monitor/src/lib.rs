//! AI market monitor
//!
//! Fetches quarterly AI-market metrics from five upstream providers and turns
//! them into dashboard chart series:
//!
//! - venture investment in AI companies (VC database)
//! - GPU utilization and AI service usage on Azure, GCP and AWS
//! - NVIDIA order estimates and reported financials (SEC filings + news)
//!
//! # Architecture
//!
//! - [`sources`]: one [`MetricSource`](monitor_core::MetricSource) adapter per provider
//! - [`Aggregator`]: concurrent fan-out to all adapters, joined into a
//!   [`MetricSnapshot`](monitor_core::MetricSnapshot) that tolerates partial failure
//! - [`DashboardView`]: holds the range and latest snapshot, re-aggregates on
//!   range changes, and derives a [`ChartSet`] for a [`ChartRenderer`]
//!
//! # Example
//!
//! ```rust,ignore
//! use ai_monitor::{Aggregator, DashboardView, MonitorConfig, TableRenderer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = MonitorConfig::from_env()?;
//!     let aggregator = Arc::new(Aggregator::from_config(&config)?);
//!
//!     let view = DashboardView::with_default_range(aggregator);
//!     view.mount().await?;
//!     view.render(&TableRenderer::new())?;
//!
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod config;
pub mod render;
pub mod series;
pub mod sources;
pub mod view;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types for convenience
pub use aggregator::{AggregateReport, Aggregator};
pub use config::{Endpoints, MonitorConfig, SourceEndpoint};
pub use render::{ChartRenderer, TableRenderer};
pub use series::{ChartSet, LineSeries, PieSlice, SeriesPoint};
pub use sources::{RetryPolicy, RetryingSource, Sources};
pub use view::{DashboardView, ViewState};

pub use monitor_core::{
    MetricSnapshot, MonitorError, Result, SourceError, SourceFailure, SourceId, TimeRange,
};
