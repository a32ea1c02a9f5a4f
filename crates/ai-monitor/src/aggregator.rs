//! Fan-out/join over the five metric sources
//!
//! [`Aggregator::aggregate`] never fails as a whole. Whatever subset of
//! sources fails, the caller gets a complete snapshot (failed sections at
//! their zero default) and a list naming each failed adapter.

use crate::config::MonitorConfig;
use crate::sources::Sources;
use monitor_core::{
    MetricSnapshot, MetricSource, ProviderRecord, SourceError, SourceFailure, SourceId, TimeRange,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Result of one aggregation cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    pub snapshot: MetricSnapshot,
    /// Failed adapters in `venture, azure, gcp, aws, nvidia` order
    pub failures: Vec<SourceFailure>,
}

impl AggregateReport {
    /// Every source succeeded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Every source failed
    pub fn is_total_outage(&self) -> bool {
        self.failures.len() == SourceId::ALL.len()
    }
}

/// Issues all source fetches concurrently and joins the results
pub struct Aggregator {
    sources: Sources,
    source_timeout: Option<Duration>,
}

impl Aggregator {
    pub fn new(sources: Sources) -> Self {
        Self {
            sources,
            source_timeout: None,
        }
    }

    /// HTTP-backed aggregator for the endpoints in `config`
    pub fn from_config(config: &MonitorConfig) -> monitor_core::Result<Self> {
        Ok(Self::new(Sources::from_config(config)?))
    }

    /// Report a source as unavailable if its fetch takes longer than `timeout`
    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = Some(timeout);
        self
    }

    /// Fetch from every source for `range` and join the results
    ///
    /// Waits for all five fetches to settle. Each source is called exactly
    /// once; retries, if wanted, belong in the sources themselves.
    pub async fn aggregate(&self, range: &TimeRange) -> AggregateReport {
        info!(%range, "starting aggregation");

        let (venture, azure, gcp, aws, nvidia) = tokio::join!(
            self.fetch(&self.sources.venture, range),
            self.fetch(&self.sources.azure, range),
            self.fetch(&self.sources.gcp, range),
            self.fetch(&self.sources.aws, range),
            self.fetch(&self.sources.nvidia, range),
        );

        let mut snapshot = MetricSnapshot::zeroed(*range);
        let mut failures = Vec::new();

        let results = [
            (SourceId::VentureData, venture),
            (SourceId::AzureMetrics, azure),
            (SourceId::GcpMetrics, gcp),
            (SourceId::AwsMetrics, aws),
            (SourceId::NvidiaMetrics, nvidia),
        ];

        for (slot, result) in results {
            match result.and_then(|record| check_slot(slot, record)) {
                Ok(record) => apply(&mut snapshot, record),
                Err(e) => {
                    warn!(
                        adapter = %slot,
                        provider = slot.provider_name(),
                        error = %e,
                        "source failed"
                    );
                    failures.push(SourceFailure::new(slot, &e));
                }
            }
        }

        info!(
            %range,
            failed = failures.len(),
            succeeded = SourceId::ALL.len() - failures.len(),
            "aggregation complete"
        );

        AggregateReport { snapshot, failures }
    }

    async fn fetch(
        &self,
        source: &Arc<dyn MetricSource>,
        range: &TimeRange,
    ) -> Result<ProviderRecord, SourceError> {
        match self.source_timeout {
            Some(limit) => tokio::time::timeout(limit, source.fetch(range))
                .await
                .unwrap_or_else(|_| {
                    Err(SourceError::unavailable(format!("no response within {limit:?}")))
                }),
            None => source.fetch(range).await,
        }
    }
}

/// A record must belong to the slot it was fetched for
fn check_slot(slot: SourceId, record: ProviderRecord) -> Result<ProviderRecord, SourceError> {
    if record.source_id() == slot {
        Ok(record)
    } else {
        Err(SourceError::invalid(format!(
            "expected a {slot} record, got {}",
            record.source_id()
        )))
    }
}

fn apply(snapshot: &mut MetricSnapshot, record: ProviderRecord) {
    match record {
        ProviderRecord::Venture(venture) => snapshot.venture_investment = venture,
        ProviderRecord::Cloud { provider, metrics } => {
            snapshot.cloud_workloads.set(provider, metrics);
        }
        ProviderRecord::Nvidia(nvidia) => snapshot.nvidia_metrics = nvidia,
    }
}
