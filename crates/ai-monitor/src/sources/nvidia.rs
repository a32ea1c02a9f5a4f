//! NVIDIA order estimates from filings and financial news
//!
//! Two upstream calls make up one record:
//!
//! - filings: estimated total orders for the range plus reported quarterly
//!   financials (revenue, net income, gross profit);
//! - news: order announcements attributed to individual buyers, summed into
//!   the Magnificent-7 breakdown.
//!
//! If either call fails, the whole adapter fails.

use super::http::HttpEndpoint;
use super::{non_negative, parse_timestamp};
use crate::config::MonitorConfig;
use async_trait::async_trait;
use monitor_core::range::quarter_label;
use monitor_core::{
    Company, MetricSource, NvidiaMetrics, ProviderRecord, QuarterlyFinancials, SourceError,
    SourceId, TimeRange,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, error};

/// Number of reported quarters kept, newest first
const MAX_QUARTERS: usize = 8;

/// Relative slack allowed when the Magnificent-7 sum is compared with the total
const BREAKDOWN_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FilingsResponse {
    total_orders: f64,
    #[serde(default)]
    quarters: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuarter {
    period_end: String,
    revenue: f64,
    net_income: f64,
    gross_profit: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NewsResponse {
    orders: Vec<RawOrder>,
}

#[derive(Debug, Deserialize)]
struct RawOrder {
    company: String,
    amount: f64,
    date: String,
}

/// Adapter joining SEC filings and order news for NVIDIA
pub struct NvidiaMetricsSource {
    filings: HttpEndpoint,
    news: HttpEndpoint,
}

impl NvidiaMetricsSource {
    pub fn new(config: &MonitorConfig) -> monitor_core::Result<Self> {
        Ok(Self {
            filings: HttpEndpoint::new(
                "nvidia_filings",
                config.endpoints.nvidia_filings.clone(),
                config,
            )?,
            news: HttpEndpoint::new("nvidia_news", config.endpoints.nvidia_news.clone(), config)?,
        })
    }

    /// Quarterly rows inside `range`, newest first, at most [`MAX_QUARTERS`]
    ///
    /// A row that fails to parse is logged and skipped rather than failing
    /// the whole fetch.
    fn quarterly_financials(
        rows: Vec<serde_json::Value>,
        range: &TimeRange,
    ) -> Vec<QuarterlyFinancials> {
        let mut parsed: Vec<_> = rows
            .into_iter()
            .filter_map(|row| match Self::parse_quarter(row) {
                Ok(q) => Some(q),
                Err(e) => {
                    error!("Error processing NVIDIA quarter: {e}");
                    None
                }
            })
            .filter(|(period_end, _)| range.contains(*period_end))
            .collect();

        parsed.sort_by(|a, b| b.0.cmp(&a.0));
        parsed.truncate(MAX_QUARTERS);
        parsed.into_iter().map(|(_, q)| q).collect()
    }

    fn parse_quarter(
        row: serde_json::Value,
    ) -> Result<(chrono::DateTime<chrono::Utc>, QuarterlyFinancials), SourceError> {
        let raw: RawQuarter = serde_json::from_value(row)?;
        let period_end = parse_timestamp(&raw.period_end)?;

        if raw.revenue <= 0.0 || !raw.revenue.is_finite() {
            return Err(SourceError::invalid(format!(
                "quarter ending {} has no revenue",
                raw.period_end
            )));
        }

        let gross_margin = raw.gross_profit / raw.revenue * 100.0;
        if !gross_margin.is_finite() || !raw.net_income.is_finite() {
            return Err(SourceError::invalid(format!(
                "quarter ending {} has out-of-range figures",
                raw.period_end
            )));
        }

        Ok((
            period_end,
            QuarterlyFinancials {
                quarter: quarter_label(period_end),
                revenue: raw.revenue,
                net_income: raw.net_income,
                gross_margin,
            },
        ))
    }

    fn combine(
        filings: FilingsResponse,
        news: NewsResponse,
        range: &TimeRange,
    ) -> Result<NvidiaMetrics, SourceError> {
        let total_orders = non_negative(filings.total_orders, "totalOrders")?;

        let mut breakdown: BTreeMap<Company, f64> =
            Company::ALL.into_iter().map(|c| (c, 0.0)).collect();
        for order in news.orders {
            if !range.contains(parse_timestamp(&order.date)?) {
                continue;
            }
            let amount = non_negative(order.amount, "order amount")?;
            // Buyers outside the Magnificent 7 count toward the total only.
            if let Some(company) = Company::from_name(&order.company) {
                *breakdown.entry(company).or_default() += amount;
            }
        }

        let mag7_total: f64 = breakdown.values().sum();
        if !mag7_total.is_finite() {
            return Err(SourceError::invalid("Magnificent-7 orders overflow"));
        }
        // Summed amounts carry rounding error; only a real excess is invalid.
        if mag7_total > total_orders * (1.0 + BREAKDOWN_TOLERANCE) {
            return Err(SourceError::invalid(format!(
                "Magnificent-7 orders ({mag7_total}) exceed total orders ({total_orders})"
            )));
        }

        let mag7_percentage = if total_orders > 0.0 {
            (mag7_total / total_orders * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        Ok(NvidiaMetrics {
            total_orders,
            mag7_percentage,
            breakdown,
            quarterly_financials: Self::quarterly_financials(filings.quarters, range),
        })
    }
}

#[async_trait]
impl MetricSource for NvidiaMetricsSource {
    fn id(&self) -> SourceId {
        SourceId::NvidiaMetrics
    }

    async fn fetch(&self, range: &TimeRange) -> Result<ProviderRecord, SourceError> {
        let query = [
            ("from", range.start().format("%Y-%m-%d").to_string()),
            ("to", range.end().format("%Y-%m-%d").to_string()),
            ("symbol", "NVDA".to_string()),
        ];

        let (filings, news) = futures::future::try_join(
            self.filings.get_json::<FilingsResponse>(&query),
            self.news.get_json::<NewsResponse>(&query),
        )
        .await?;

        let metrics = Self::combine(filings, news, range)?;

        debug!(
            total_orders = metrics.total_orders,
            mag7_percentage = metrics.mag7_percentage,
            quarters = metrics.quarterly_financials.len(),
            "nvidia metrics fetched"
        );

        Ok(ProviderRecord::Nvidia(metrics))
    }
}
