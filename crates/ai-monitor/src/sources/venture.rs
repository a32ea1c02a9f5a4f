//! Venture capital deals in AI companies
//!
//! The VC database reports individual funding rounds with roughly a month of
//! lag. The adapter asks for the requested dates, drops rounds the provider
//! returns outside them, and reduces the rest to totals plus the largest deals.

use super::http::HttpEndpoint;
use super::{non_negative, parse_timestamp};
use crate::config::MonitorConfig;
use async_trait::async_trait;
use monitor_core::{
    Deal, MetricSource, ProviderRecord, SourceError, SourceId, TimeRange, VentureInvestment,
};
use serde::Deserialize;
use std::cmp::Ordering;
use tracing::debug;

/// Upstream response: a page of funding rounds
#[derive(Debug, Deserialize)]
pub(crate) struct DealsResponse {
    deals: Vec<RawDeal>,
}

#[derive(Debug, Deserialize)]
struct RawDeal {
    company: String,
    amount: f64,
    date: String,
}

/// Adapter for the venture capital database
pub struct VentureDataSource {
    endpoint: HttpEndpoint,
    top_deals_limit: usize,
}

impl VentureDataSource {
    pub fn new(config: &MonitorConfig) -> monitor_core::Result<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new("venture", config.endpoints.venture.clone(), config)?,
            top_deals_limit: config.top_deals_limit,
        })
    }

    fn normalize(
        response: DealsResponse,
        range: &TimeRange,
        limit: usize,
    ) -> Result<VentureInvestment, SourceError> {
        let mut deals = Vec::with_capacity(response.deals.len());
        for raw in response.deals {
            let date = parse_timestamp(&raw.date)?;
            if !range.contains(date) {
                continue;
            }
            deals.push(Deal {
                name: raw.company,
                amount: non_negative(raw.amount, "deal amount")?,
                date,
            });
        }

        let total_investment: f64 = deals.iter().map(|d| d.amount).sum();
        if !total_investment.is_finite() {
            return Err(SourceError::invalid("total investment overflows"));
        }
        let deal_count = deals.len() as u64;

        deals.sort_by(|a, b| {
            b.amount
                .partial_cmp(&a.amount)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.date.cmp(&b.date))
        });
        deals.truncate(limit);

        Ok(VentureInvestment {
            total_investment,
            deal_count,
            top_deals: deals,
        })
    }
}

#[async_trait]
impl MetricSource for VentureDataSource {
    fn id(&self) -> SourceId {
        SourceId::VentureData
    }

    async fn fetch(&self, range: &TimeRange) -> Result<ProviderRecord, SourceError> {
        let query = [
            ("from", range.start().format("%Y-%m-%d").to_string()),
            ("to", range.end().format("%Y-%m-%d").to_string()),
            ("sector", "artificial-intelligence".to_string()),
        ];

        let response: DealsResponse = self.endpoint.get_json(&query).await?;
        let investment = Self::normalize(response, range, self.top_deals_limit)?;

        debug!(
            deals = investment.deal_count,
            total = investment.total_investment,
            "venture data fetched"
        );

        Ok(ProviderRecord::Venture(investment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn q1_2024() -> TimeRange {
        TimeRange::parse("2024-01-01", "2024-03-31").unwrap()
    }

    fn response(value: serde_json::Value) -> DealsResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_totals_and_top_deals() {
        let resp = response(json!({
            "deals": [
                {"company": "Small AI", "amount": 5.0e6, "date": "2024-01-10"},
                {"company": "Big Model Co", "amount": 2.0e9, "date": "2024-02-01"},
                {"company": "Mid Labs", "amount": 3.0e8, "date": "2024-03-15T12:00:00Z"},
            ]
        }));

        let investment = VentureDataSource::normalize(resp, &q1_2024(), 2).unwrap();

        assert_eq!(investment.deal_count, 3);
        assert_eq!(investment.total_investment, 5.0e6 + 2.0e9 + 3.0e8);
        let names: Vec<_> = investment.top_deals.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Big Model Co", "Mid Labs"]);
    }

    #[test]
    fn test_normalize_drops_out_of_range_deals() {
        let resp = response(json!({
            "deals": [
                {"company": "Last Year", "amount": 1.0e9, "date": "2023-12-31"},
                {"company": "This Quarter", "amount": 1.0e6, "date": "2024-02-01"},
            ]
        }));

        let investment = VentureDataSource::normalize(resp, &q1_2024(), 10).unwrap();
        assert_eq!(investment.deal_count, 1);
        assert_eq!(investment.top_deals[0].name, "This Quarter");
    }

    #[test]
    fn test_empty_result_is_zero_not_error() {
        let investment =
            VentureDataSource::normalize(response(json!({"deals": []})), &q1_2024(), 10).unwrap();
        assert_eq!(investment, VentureInvestment::default());
    }

    #[test]
    fn test_malformed_date_is_invalid() {
        let resp = response(json!({
            "deals": [{"company": "X", "amount": 1.0, "date": "Q1 2024"}]
        }));
        let err = VentureDataSource::normalize(resp, &q1_2024(), 10).unwrap_err();
        assert!(matches!(err, SourceError::DataInvalid(_)));
    }

    #[test]
    fn test_negative_amount_is_invalid() {
        let resp = response(json!({
            "deals": [{"company": "X", "amount": -1.0, "date": "2024-01-02"}]
        }));
        assert!(VentureDataSource::normalize(resp, &q1_2024(), 10).is_err());
    }

    #[test]
    fn test_missing_amount_fails_to_decode() {
        let decoded = serde_json::from_value::<DealsResponse>(json!({
            "deals": [{"company": "X", "date": "2024-01-02"}]
        }));
        assert!(decoded.is_err());
    }

    #[test]
    fn test_total_investment_overflow_is_invalid() {
        let resp = response(json!({
            "deals": [
                {"company": "A", "amount": 1.0e308, "date": "2024-01-02"},
                {"company": "B", "amount": 1.0e308, "date": "2024-01-03"},
            ]
        }));
        let err = VentureDataSource::normalize(resp, &q1_2024(), 10).unwrap_err();
        assert!(matches!(err, SourceError::DataInvalid(_)));
    }
}
