//! Cloud AI workload adapters: Azure Monitor, Google Cloud Monitoring, CloudWatch
//!
//! Each provider reports at its own granularity and in its own shape. The
//! adapters keep only samples inside the requested range, then average GPU
//! utilization (clamped to 0-100) and sum AI service usage.

use super::http::HttpEndpoint;
use super::{non_negative, parse_timestamp};
use crate::config::MonitorConfig;
use async_trait::async_trait;
use chrono::SecondsFormat;
use monitor_core::{
    CloudMetrics, CloudProvider, MetricSource, ProviderRecord, SourceError, SourceId, TimeRange,
};
use serde::Deserialize;
use tracing::debug;

/// In-range samples of the two tracked metrics
#[derive(Debug, Default)]
struct Samples {
    gpu: Vec<f64>,
    usage: f64,
}

impl Samples {
    fn push_gpu(&mut self, percent: f64) -> Result<(), SourceError> {
        self.gpu.push(non_negative(percent, "gpu utilization")?);
        Ok(())
    }

    fn push_usage(&mut self, amount: f64) -> Result<(), SourceError> {
        let total = self.usage + non_negative(amount, "ai service usage")?;
        if !total.is_finite() {
            return Err(SourceError::invalid("ai service usage total overflows"));
        }
        self.usage = total;
        Ok(())
    }

    fn into_metrics(self) -> CloudMetrics {
        let gpu_utilization = if self.gpu.is_empty() {
            0.0
        } else {
            (self.gpu.iter().sum::<f64>() / self.gpu.len() as f64).clamp(0.0, 100.0)
        };

        CloudMetrics {
            gpu_utilization,
            ai_service_usage: self.usage,
        }
    }
}

fn rfc3339(range: &TimeRange) -> (String, String) {
    (
        range.start().to_rfc3339_opts(SecondsFormat::Secs, true),
        range.end().to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

fn cloud_record(provider: CloudProvider, metrics: CloudMetrics) -> ProviderRecord {
    debug!(
        %provider,
        gpu = metrics.gpu_utilization,
        usage = metrics.ai_service_usage,
        "cloud metrics fetched"
    );
    ProviderRecord::Cloud { provider, metrics }
}

// ---------------------------------------------------------------------------
// Azure Monitor
// ---------------------------------------------------------------------------

const AZURE_GPU_METRIC: &str = "GpuUtilizationPercentage";
const AZURE_USAGE_METRIC: &str = "AiServiceRequests";

#[derive(Debug, Deserialize)]
pub(crate) struct AzureResponse {
    value: Vec<AzureMetric>,
}

#[derive(Debug, Deserialize)]
struct AzureMetric {
    name: AzureName,
    #[serde(default)]
    timeseries: Vec<AzureTimeseries>,
}

#[derive(Debug, Deserialize)]
struct AzureName {
    value: String,
}

#[derive(Debug, Deserialize)]
struct AzureTimeseries {
    #[serde(default)]
    data: Vec<AzureDataPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureDataPoint {
    time_stamp: String,
    average: Option<f64>,
    total: Option<f64>,
}

/// Adapter for the Azure Monitor metrics API
pub struct AzureMetricsSource {
    endpoint: HttpEndpoint,
}

impl AzureMetricsSource {
    pub fn new(config: &MonitorConfig) -> monitor_core::Result<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new("azure", config.endpoints.azure.clone(), config)?,
        })
    }

    fn normalize(response: AzureResponse, range: &TimeRange) -> Result<CloudMetrics, SourceError> {
        let mut samples = Samples::default();

        for metric in response.value {
            let is_gpu = metric.name.value == AZURE_GPU_METRIC;
            if !is_gpu && metric.name.value != AZURE_USAGE_METRIC {
                continue;
            }

            // Azure emits a point per interval even when nothing was recorded;
            // those carry no aggregate and are skipped.
            for point in metric.timeseries.into_iter().flat_map(|ts| ts.data) {
                if !range.contains(parse_timestamp(&point.time_stamp)?) {
                    continue;
                }
                match (is_gpu, point.average, point.total) {
                    (true, Some(avg), _) => samples.push_gpu(avg)?,
                    (false, _, Some(total)) => samples.push_usage(total)?,
                    _ => {}
                }
            }
        }

        Ok(samples.into_metrics())
    }
}

#[async_trait]
impl MetricSource for AzureMetricsSource {
    fn id(&self) -> SourceId {
        SourceId::AzureMetrics
    }

    async fn fetch(&self, range: &TimeRange) -> Result<ProviderRecord, SourceError> {
        let (start, end) = rfc3339(range);
        let query = [
            ("timespan", format!("{start}/{end}")),
            ("metricnames", format!("{AZURE_GPU_METRIC},{AZURE_USAGE_METRIC}")),
            ("aggregation", "Average,Total".to_string()),
            ("interval", "P1D".to_string()),
            ("api-version", "2023-10-01".to_string()),
        ];

        let response: AzureResponse = self.endpoint.get_json(&query).await?;
        Ok(cloud_record(CloudProvider::Azure, Self::normalize(response, range)?))
    }
}

// ---------------------------------------------------------------------------
// Google Cloud Monitoring
// ---------------------------------------------------------------------------

const GCP_GPU_METRIC: &str = "compute.googleapis.com/instance/gpu/utilization";
const GCP_USAGE_METRIC: &str = "aiplatform.googleapis.com/prediction/online/prediction_count";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GcpResponse {
    // The API omits the field entirely when no series match.
    #[serde(default)]
    time_series: Vec<GcpTimeSeries>,
}

#[derive(Debug, Deserialize)]
struct GcpTimeSeries {
    metric: GcpMetricDescriptor,
    #[serde(default)]
    points: Vec<GcpPoint>,
}

#[derive(Debug, Deserialize)]
struct GcpMetricDescriptor {
    #[serde(rename = "type")]
    metric_type: String,
}

#[derive(Debug, Deserialize)]
struct GcpPoint {
    interval: GcpInterval,
    value: GcpValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GcpInterval {
    end_time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GcpValue {
    double_value: Option<f64>,
    // int64 values are JSON strings in this API.
    int64_value: Option<String>,
}

impl GcpValue {
    fn as_f64(&self) -> Result<f64, SourceError> {
        if let Some(v) = self.double_value {
            return Ok(v);
        }
        match &self.int64_value {
            Some(raw) => raw
                .parse::<i64>()
                .map(|v| v as f64)
                .map_err(|_| SourceError::invalid(format!("int64Value '{raw}' is not a number"))),
            None => Err(SourceError::invalid("point has no numeric value")),
        }
    }
}

/// Adapter for the Google Cloud Monitoring API
pub struct GcpMetricsSource {
    endpoint: HttpEndpoint,
}

impl GcpMetricsSource {
    pub fn new(config: &MonitorConfig) -> monitor_core::Result<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new("gcp", config.endpoints.gcp.clone(), config)?,
        })
    }

    fn normalize(response: GcpResponse, range: &TimeRange) -> Result<CloudMetrics, SourceError> {
        let mut samples = Samples::default();

        for series in response.time_series {
            let is_gpu = series.metric.metric_type == GCP_GPU_METRIC;
            if !is_gpu && series.metric.metric_type != GCP_USAGE_METRIC {
                continue;
            }

            for point in series.points {
                if !range.contains(parse_timestamp(&point.interval.end_time)?) {
                    continue;
                }
                let value = point.value.as_f64()?;
                if is_gpu {
                    // Reported as a 0-1 ratio.
                    samples.push_gpu(value * 100.0)?;
                } else {
                    samples.push_usage(value)?;
                }
            }
        }

        Ok(samples.into_metrics())
    }
}

#[async_trait]
impl MetricSource for GcpMetricsSource {
    fn id(&self) -> SourceId {
        SourceId::GcpMetrics
    }

    async fn fetch(&self, range: &TimeRange) -> Result<ProviderRecord, SourceError> {
        let (start, end) = rfc3339(range);
        let query = [
            ("interval.startTime", start),
            ("interval.endTime", end),
            (
                "filter",
                format!("metric.type = one_of(\"{GCP_GPU_METRIC}\", \"{GCP_USAGE_METRIC}\")"),
            ),
        ];

        let response: GcpResponse = self.endpoint.get_json(&query).await?;
        Ok(cloud_record(CloudProvider::Gcp, Self::normalize(response, range)?))
    }
}

// ---------------------------------------------------------------------------
// AWS CloudWatch
// ---------------------------------------------------------------------------

const AWS_GPU_ID: &str = "gpu";
const AWS_USAGE_ID: &str = "usage";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AwsResponse {
    metric_data_results: Vec<AwsMetricDataResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwsMetricDataResult {
    id: String,
    #[serde(default)]
    timestamps: Vec<String>,
    #[serde(default)]
    values: Vec<f64>,
}

/// Adapter for the CloudWatch GetMetricData API
pub struct AwsMetricsSource {
    endpoint: HttpEndpoint,
}

impl AwsMetricsSource {
    pub fn new(config: &MonitorConfig) -> monitor_core::Result<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new("aws", config.endpoints.aws.clone(), config)?,
        })
    }

    fn normalize(response: AwsResponse, range: &TimeRange) -> Result<CloudMetrics, SourceError> {
        let mut samples = Samples::default();

        for result in response.metric_data_results {
            if result.timestamps.len() != result.values.len() {
                return Err(SourceError::invalid(format!(
                    "metric '{}' has {} timestamps but {} values",
                    result.id,
                    result.timestamps.len(),
                    result.values.len()
                )));
            }

            for (ts, value) in result.timestamps.iter().zip(result.values) {
                if !range.contains(parse_timestamp(ts)?) {
                    continue;
                }
                match result.id.as_str() {
                    AWS_GPU_ID => samples.push_gpu(value)?,
                    AWS_USAGE_ID => samples.push_usage(value)?,
                    _ => {}
                }
            }
        }

        Ok(samples.into_metrics())
    }
}

#[async_trait]
impl MetricSource for AwsMetricsSource {
    fn id(&self) -> SourceId {
        SourceId::AwsMetrics
    }

    async fn fetch(&self, range: &TimeRange) -> Result<ProviderRecord, SourceError> {
        let (start, end) = rfc3339(range);
        let query = [
            ("StartTime", start),
            ("EndTime", end),
            ("MetricIds", format!("{AWS_GPU_ID},{AWS_USAGE_ID}")),
            ("Period", "86400".to_string()),
        ];

        let response: AwsResponse = self.endpoint.get_json(&query).await?;
        Ok(cloud_record(CloudProvider::Aws, Self::normalize(response, range)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn january() -> TimeRange {
        TimeRange::parse("2024-01-01", "2024-01-31").unwrap()
    }

    #[test]
    fn test_azure_normalize() {
        let response: AzureResponse = serde_json::from_value(json!({
            "value": [
                {
                    "name": {"value": "GpuUtilizationPercentage"},
                    "timeseries": [{"data": [
                        {"timeStamp": "2024-01-02T00:00:00Z", "average": 40.0},
                        {"timeStamp": "2024-01-03T00:00:00Z", "average": 60.0},
                        {"timeStamp": "2024-01-04T00:00:00Z"},
                        {"timeStamp": "2024-02-10T00:00:00Z", "average": 99.0}
                    ]}]
                },
                {
                    "name": {"value": "AiServiceRequests"},
                    "timeseries": [{"data": [
                        {"timeStamp": "2024-01-02T00:00:00Z", "total": 1000.0},
                        {"timeStamp": "2024-01-03T00:00:00Z", "total": 500.0}
                    ]}]
                }
            ]
        }))
        .unwrap();

        let metrics = AzureMetricsSource::normalize(response, &january()).unwrap();
        assert_eq!(metrics.gpu_utilization, 50.0);
        assert_eq!(metrics.ai_service_usage, 1500.0);
    }

    #[test]
    fn test_azure_missing_value_is_invalid() {
        assert!(serde_json::from_value::<AzureResponse>(json!({"cost": 0})).is_err());
    }

    #[test]
    fn test_gcp_empty_response_is_zero() {
        let response: GcpResponse = serde_json::from_value(json!({})).unwrap();
        let metrics = GcpMetricsSource::normalize(response, &january()).unwrap();
        assert_eq!(metrics, CloudMetrics::default());
    }

    #[test]
    fn test_gcp_ratio_and_int64_strings() {
        let response: GcpResponse = serde_json::from_value(json!({
            "timeSeries": [
                {
                    "metric": {"type": GCP_GPU_METRIC},
                    "points": [
                        {"interval": {"endTime": "2024-01-05T00:00:00Z"}, "value": {"doubleValue": 0.8}},
                        {"interval": {"endTime": "2024-01-06T00:00:00Z"}, "value": {"doubleValue": 0.6}}
                    ]
                },
                {
                    "metric": {"type": GCP_USAGE_METRIC},
                    "points": [
                        {"interval": {"endTime": "2024-01-05T00:00:00Z"}, "value": {"int64Value": "250"}}
                    ]
                }
            ]
        }))
        .unwrap();

        let metrics = GcpMetricsSource::normalize(response, &january()).unwrap();
        assert!((metrics.gpu_utilization - 70.0).abs() < 1e-9);
        assert_eq!(metrics.ai_service_usage, 250.0);
    }

    #[test]
    fn test_gcp_bad_int64_is_invalid() {
        let response: GcpResponse = serde_json::from_value(json!({
            "timeSeries": [{
                "metric": {"type": GCP_USAGE_METRIC},
                "points": [{"interval": {"endTime": "2024-01-05T00:00:00Z"}, "value": {"int64Value": "lots"}}]
            }]
        }))
        .unwrap();

        let err = GcpMetricsSource::normalize(response, &january()).unwrap_err();
        assert!(matches!(err, SourceError::DataInvalid(_)));
    }

    #[test]
    fn test_aws_normalize_and_clamp() {
        let response: AwsResponse = serde_json::from_value(json!({
            "MetricDataResults": [
                {"Id": "gpu", "Timestamps": ["2024-01-10T00:00:00Z", "2024-01-11T00:00:00Z"], "Values": [120.0, 100.0]},
                {"Id": "usage", "Timestamps": ["2024-01-10T00:00:00Z"], "Values": [42.0]}
            ]
        }))
        .unwrap();

        let metrics = AwsMetricsSource::normalize(response, &january()).unwrap();
        assert_eq!(metrics.gpu_utilization, 100.0);
        assert_eq!(metrics.ai_service_usage, 42.0);
    }

    #[test]
    fn test_aws_length_mismatch_is_invalid() {
        let response: AwsResponse = serde_json::from_value(json!({
            "MetricDataResults": [
                {"Id": "gpu", "Timestamps": ["2024-01-10T00:00:00Z"], "Values": []}
            ]
        }))
        .unwrap();

        assert!(AwsMetricsSource::normalize(response, &january()).is_err());
    }

    #[test]
    fn test_aws_usage_overflow_is_invalid() {
        let response: AwsResponse = serde_json::from_value(json!({
            "MetricDataResults": [
                {"Id": "usage", "Timestamps": ["2024-01-10T00:00:00Z", "2024-01-11T00:00:00Z"], "Values": [1.0e308, 1.0e308]}
            ]
        }))
        .unwrap();

        let err = AwsMetricsSource::normalize(response, &january()).unwrap_err();
        assert!(matches!(err, SourceError::DataInvalid(_)));
    }
}
