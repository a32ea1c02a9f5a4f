//! Canned sources and records shared by the unit tests

use crate::sources::Sources;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mockall::mock;
use monitor_core::{
    CloudMetrics, CloudProvider, Company, Deal, MetricSource, NvidiaMetrics, ProviderRecord,
    QuarterlyFinancials, SourceError, SourceId, TimeRange, VentureInvestment,
};
use std::sync::Arc;
use tokio::sync::Notify;

mock! {
    pub Source {}

    #[async_trait]
    impl MetricSource for Source {
        fn id(&self) -> SourceId;
        async fn fetch(&self, range: &TimeRange) -> Result<ProviderRecord, SourceError>;
    }
}

pub fn q1_2024() -> TimeRange {
    TimeRange::parse("2024-01-01", "2024-03-31").unwrap()
}

pub fn q2_2024() -> TimeRange {
    TimeRange::parse("2024-04-01", "2024-06-30").unwrap()
}

pub fn sample_venture() -> VentureInvestment {
    VentureInvestment {
        total_investment: 2.5e9,
        deal_count: 2,
        top_deals: vec![
            Deal {
                name: "Frontier Labs".to_string(),
                amount: 2.0e9,
                date: Utc.with_ymd_and_hms(2024, 2, 14, 0, 0, 0).unwrap(),
            },
            Deal {
                name: "Vector DB Inc".to_string(),
                amount: 5.0e8,
                date: Utc.with_ymd_and_hms(2023, 11, 2, 0, 0, 0).unwrap(),
            },
        ],
    }
}

pub fn sample_cloud(provider: CloudProvider) -> CloudMetrics {
    match provider {
        CloudProvider::Azure => CloudMetrics {
            gpu_utilization: 72.0,
            ai_service_usage: 1.2e6,
        },
        CloudProvider::Gcp => CloudMetrics {
            gpu_utilization: 64.5,
            ai_service_usage: 8.0e5,
        },
        CloudProvider::Aws => CloudMetrics {
            gpu_utilization: 81.0,
            ai_service_usage: 2.1e6,
        },
    }
}

pub fn sample_nvidia() -> NvidiaMetrics {
    let mut metrics = NvidiaMetrics {
        total_orders: 20.0,
        mag7_percentage: 75.0,
        quarterly_financials: vec![
            QuarterlyFinancials {
                quarter: "2024Q1".to_string(),
                revenue: 22103.0,
                net_income: 12285.0,
                gross_margin: 76.0,
            },
            QuarterlyFinancials {
                quarter: "2023Q4".to_string(),
                revenue: 18120.0,
                net_income: 9243.0,
                gross_margin: 74.0,
            },
        ],
        ..NvidiaMetrics::default()
    };
    metrics.breakdown.insert(Company::Meta, 10.0);
    metrics.breakdown.insert(Company::Apple, 5.0);
    metrics
}

pub fn record_for(id: SourceId) -> ProviderRecord {
    match id {
        SourceId::VentureData => ProviderRecord::Venture(sample_venture()),
        SourceId::NvidiaMetrics => ProviderRecord::Nvidia(sample_nvidia()),
        cloud => {
            let provider = cloud.cloud_provider().unwrap();
            ProviderRecord::Cloud {
                provider,
                metrics: sample_cloud(provider),
            }
        }
    }
}

/// A source that always returns `record`
pub fn ok_source(id: SourceId, record: ProviderRecord) -> Arc<dyn MetricSource> {
    let mut source = MockSource::new();
    source.expect_id().return_const(id);
    source.expect_fetch().returning(move |_| Ok(record.clone()));
    Arc::new(source)
}

/// A source that always fails with `error`
pub fn failing_source(id: SourceId, error: SourceError) -> Arc<dyn MetricSource> {
    let mut source = MockSource::new();
    source.expect_id().return_const(id);
    source.expect_fetch().returning(move |_| Err(error.clone()));
    Arc::new(source)
}

pub fn sources_all_ok() -> Sources {
    Sources {
        venture: ok_source(SourceId::VentureData, record_for(SourceId::VentureData)),
        azure: ok_source(SourceId::AzureMetrics, record_for(SourceId::AzureMetrics)),
        gcp: ok_source(SourceId::GcpMetrics, record_for(SourceId::GcpMetrics)),
        aws: ok_source(SourceId::AwsMetrics, record_for(SourceId::AwsMetrics)),
        nvidia: ok_source(SourceId::NvidiaMetrics, record_for(SourceId::NvidiaMetrics)),
    }
}

/// A source whose fetch never completes
pub fn hanging_source(id: SourceId) -> Arc<dyn MetricSource> {
    Arc::new(GatedSource {
        id,
        gated_range: None,
        gate: Arc::new(Notify::new()),
    })
}

/// Succeeds immediately, except for `gated_range` (or every range when
/// `None`), which waits until `gate` is notified
pub struct GatedSource {
    pub id: SourceId,
    pub gated_range: Option<TimeRange>,
    pub gate: Arc<Notify>,
}

#[async_trait]
impl MetricSource for GatedSource {
    fn id(&self) -> SourceId {
        self.id
    }

    async fn fetch(&self, range: &TimeRange) -> Result<ProviderRecord, SourceError> {
        if self.gated_range.is_none_or(|gated| gated == *range) {
            self.gate.notified().await;
        }
        Ok(record_for(self.id))
    }
}
