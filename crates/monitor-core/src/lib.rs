//! Core abstractions for the AI market monitor
//!
//! This crate defines the value types shared by every part of the monitor:
//! the [`TimeRange`] a dashboard asks for, the [`MetricSnapshot`] produced by
//! one aggregation cycle, and the [`MetricSource`] trait each upstream
//! provider adapter implements.

pub mod error;
pub mod range;
pub mod snapshot;
pub mod source;

pub use error::{MonitorError, Result, SourceError};
pub use range::TimeRange;
pub use snapshot::{
    CloudMetrics, CloudProvider, CloudWorkloads, Company, Deal, MetricSnapshot, NvidiaMetrics,
    QuarterlyFinancials, VentureInvestment,
};
pub use source::{FailureKind, MetricSource, ProviderRecord, SourceFailure, SourceId};
