//! Dashboard view state and the refresh flow
//!
//! The view owns the current [`TimeRange`] and the latest snapshot. Changing
//! the range spawns one aggregation; in-flight aggregations are never
//! cancelled, and results are applied in completion order. A slow response
//! for an old range that lands after a newer range's response replaces it.
//! [`DashboardView::is_stale`] exposes that case.

use crate::aggregator::Aggregator;
use crate::render::ChartRenderer;
use crate::series::ChartSet;
use monitor_core::{MetricSnapshot, Result, SourceFailure, TimeRange};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Everything the view holds at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    /// Range the user last selected
    pub range: TimeRange,
    /// Latest applied snapshot; `None` until the first aggregation completes
    pub snapshot: Option<Arc<MetricSnapshot>>,
    /// Failures reported alongside `snapshot`
    pub failures: Vec<SourceFailure>,
    /// Aggregations started
    pub requested: u64,
    /// Aggregations applied
    pub completed: u64,
}

impl ViewState {
    fn new(range: TimeRange) -> Self {
        Self {
            range,
            snapshot: None,
            failures: Vec::new(),
            requested: 0,
            completed: 0,
        }
    }

    /// The held snapshot was aggregated for a different range than the current one
    pub fn is_stale(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|snapshot| snapshot.range != self.range)
    }

    /// Aggregations started but not yet applied
    pub fn in_flight(&self) -> u64 {
        self.requested - self.completed
    }
}

/// Holds the dashboard's range and snapshot and drives re-aggregation
///
/// Aggregations run as spawned Tokio tasks, so the refresh methods must be
/// called from within a runtime.
pub struct DashboardView {
    aggregator: Arc<Aggregator>,
    state: Arc<watch::Sender<ViewState>>,
}

impl DashboardView {
    pub fn new(aggregator: Arc<Aggregator>, range: TimeRange) -> Self {
        let (state, _) = watch::channel(ViewState::new(range));
        Self {
            aggregator,
            state: Arc::new(state),
        }
    }

    /// A view opened on [`TimeRange::dashboard_default`]
    pub fn with_default_range(aggregator: Arc<Aggregator>) -> Self {
        Self::new(aggregator, TimeRange::dashboard_default())
    }

    /// Initial load for the current range
    pub fn mount(&self) -> JoinHandle<()> {
        self.spawn_aggregation(self.range())
    }

    /// Re-aggregate the current range
    pub fn refresh(&self) -> JoinHandle<()> {
        self.spawn_aggregation(self.range())
    }

    /// Replace the range and aggregate it
    ///
    /// Returns `None` without aggregating when `range` equals the current one.
    pub fn set_range(&self, range: TimeRange) -> Option<JoinHandle<()>> {
        let changed = self.state.send_if_modified(|state| {
            if state.range == range {
                false
            } else {
                state.range = range;
                true
            }
        });

        if !changed {
            debug!(%range, "range unchanged, skipping aggregation");
            return None;
        }

        Some(self.spawn_aggregation(range))
    }

    fn spawn_aggregation(&self, range: TimeRange) -> JoinHandle<()> {
        self.state.send_modify(|state| state.requested += 1);

        let aggregator = Arc::clone(&self.aggregator);
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            let report = aggregator.aggregate(&range).await;

            // Whichever aggregation finishes last wins, regardless of request order.
            state.send_modify(|state| {
                state.snapshot = Some(Arc::new(report.snapshot));
                state.failures = report.failures;
                state.completed += 1;
            });

            let (current, stale, failures) = {
                let current = state.borrow();
                (current.range, current.is_stale(), current.failures.len())
            };
            info!(applied = %range, %current, stale, failures, "snapshot applied");
        })
    }

    pub fn range(&self) -> TimeRange {
        self.state.borrow().range
    }

    pub fn snapshot(&self) -> Option<Arc<MetricSnapshot>> {
        self.state.borrow().snapshot.clone()
    }

    pub fn failures(&self) -> Vec<SourceFailure> {
        self.state.borrow().failures.clone()
    }

    /// A copy of the full view state
    pub fn state(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn is_stale(&self) -> bool {
        self.state.borrow().is_stale()
    }

    /// Watch the view state; the receiver sees every applied snapshot and range change
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    /// Chart series for the held snapshot
    pub fn charts(&self) -> ChartSet {
        ChartSet::derive(self.snapshot().as_deref())
    }

    /// Hand the current charts and failures to `renderer`
    pub fn render(&self, renderer: &dyn ChartRenderer) -> Result<()> {
        renderer.render(&self.charts(), &self.failures())
    }
}
