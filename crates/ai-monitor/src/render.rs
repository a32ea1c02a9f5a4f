//! Rendering collaborators
//!
//! The dashboard hands a [`ChartSet`] and the failures from the latest
//! aggregation to a [`ChartRenderer`]. Drawing is entirely the renderer's job.

use crate::series::{ChartSet, LineSeries};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use monitor_core::{Result, SourceFailure};
use std::io::Write;

/// Something that can draw the dashboard's charts
pub trait ChartRenderer {
    fn render(&self, charts: &ChartSet, failures: &[SourceFailure]) -> Result<()>;
}

/// Renders every chart as a terminal table on stdout
#[derive(Debug, Default)]
pub struct TableRenderer;

impl TableRenderer {
    pub fn new() -> Self {
        Self
    }

    /// The full dashboard as text
    pub fn format(&self, charts: &ChartSet, failures: &[SourceFailure]) -> String {
        if charts.is_empty() {
            return "No data loaded yet.\n".to_string();
        }

        let mut out = String::new();

        out.push_str("Venture Investment in AI\n");
        let mut venture = new_table(vec!["Quarter", "Top deals (USD)"]);
        for point in &charts.venture {
            venture.add_row(vec![Cell::new(&point.label), Cell::new(format_amount(point.value))]);
        }
        out.push_str(&format!("{venture}\n\n"));

        out.push_str("Cloud AI Workloads (GPU utilization %)\n");
        out.push_str(&format!("{}\n\n", lines_table(&charts.cloud, |v| format!("{v:.1}"))));

        out.push_str("NVIDIA Orders\n");
        out.push_str(&format!("{}\n\n", lines_table(&charts.nvidia, format_amount)));

        out.push_str("Magnificent 7 Breakdown\n");
        let mut mag7 = new_table(vec!["Company", "Orders", "Share"]);
        for slice in &charts.mag7 {
            mag7.add_row(vec![
                Cell::new(&slice.label),
                Cell::new(format_amount(slice.value)),
                Cell::new(format!("{:.1}%", slice.proportion * 100.0)),
            ]);
        }
        out.push_str(&format!("{mag7}\n"));

        if !failures.is_empty() {
            out.push_str("\nUnavailable sources\n");
            let mut table = new_table(vec!["Adapter", "Provider", "Kind", "Message"]);
            for failure in failures {
                table.add_row(vec![
                    Cell::new(failure.adapter),
                    Cell::new(failure.adapter.provider_name()),
                    Cell::new(failure.kind),
                    Cell::new(&failure.message),
                ]);
            }
            out.push_str(&format!("{table}\n"));
        }

        out
    }
}

impl ChartRenderer for TableRenderer {
    fn render(&self, charts: &ChartSet, failures: &[SourceFailure]) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(self.format(charts, failures).as_bytes())
            .and_then(|()| stdout.flush())
            .map_err(|e| monitor_core::MonitorError::RenderError(e.to_string()))
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// One row per point, one column per line
fn lines_table(lines: &[LineSeries], fmt: impl Fn(f64) -> String) -> Table {
    let mut header = vec!["Quarter"];
    header.extend(lines.iter().map(|l| l.name.as_str()));
    let mut table = new_table(header);

    let mut labels: Vec<&str> = lines
        .iter()
        .flat_map(|l| l.points.iter().map(|p| p.label.as_str()))
        .collect();
    labels.sort_unstable();
    labels.dedup();

    for label in labels {
        let mut row = vec![Cell::new(label)];
        for line in lines {
            let value = line.points.iter().find(|p| p.label == label).map(|p| p.value);
            row.push(Cell::new(value.map(&fmt).unwrap_or_else(|| "-".to_string())));
        }
        table.add_row(row);
    }

    table
}

/// Compact dollar amount: 1.2B, 350.0M, 12.5K
fn format_amount(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{:.1}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", value / 1e3)
    } else {
        format!("{value:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{q1_2024, sample_nvidia};
    use monitor_core::{FailureKind, MetricSnapshot, SourceId};

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(2.5e9), "2.5B");
        assert_eq!(format_amount(3.5e8), "350.0M");
        assert_eq!(format_amount(12_500.0), "12.5K");
        assert_eq!(format_amount(0.0), "0.0");
    }

    #[test]
    fn test_empty_charts() {
        let text = TableRenderer::new().format(&ChartSet::default(), &[]);
        assert_eq!(text, "No data loaded yet.\n");
    }

    #[test]
    fn test_format_includes_sections_and_failures() {
        let mut snapshot = MetricSnapshot::zeroed(q1_2024());
        snapshot.nvidia_metrics = sample_nvidia();
        let charts = ChartSet::derive(Some(&snapshot));
        let failures = vec![SourceFailure {
            adapter: SourceId::AwsMetrics,
            kind: FailureKind::SourceUnavailable,
            message: "503 Service Unavailable".to_string(),
        }];

        let text = TableRenderer::new().format(&charts, &failures);

        assert!(text.contains("Venture Investment in AI"));
        assert!(text.contains("Top deals (USD)"));
        assert!(text.contains("Cloud AI Workloads"));
        assert!(text.contains("Magnificent 7 Breakdown"));
        assert!(text.contains("50.0%"));
        assert!(text.contains("AWS CloudWatch API"));
        assert!(text.contains("SourceUnavailable"));
    }

    #[test]
    fn test_lines_table_fills_gaps() {
        let mut snapshot = MetricSnapshot::zeroed(q1_2024());
        snapshot.nvidia_metrics = sample_nvidia();
        let charts = ChartSet::derive(Some(&snapshot));

        let table = lines_table(&charts.nvidia, format_amount).to_string();
        assert!(table.contains("2023Q4"));
        assert!(table.contains('-'));
    }
}
