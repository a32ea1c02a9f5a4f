//! AI Market Monitor CLI
//!
//! Aggregates one snapshot for a time range and prints the dashboard charts.
//!
//! # Usage
//!
//! ```bash
//! # Point the adapters at your providers
//! export AI_MONITOR_VENTURE_URL="https://vc.example.com/deals"
//! export AI_MONITOR_VENTURE_API_KEY="..."
//!
//! # Print the dashboard for 2024
//! cargo run --bin ai-monitor -p ai-monitor -- --start 2024-01-01 --end 2024-12-31
//! ```

use ai_monitor::{
    Aggregator, DashboardView, MonitorConfig, RetryPolicy, Sources, TableRenderer, TimeRange,
};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ai-monitor")]
#[command(
    about = "Quarterly AI-market metrics: venture investment, cloud GPU workloads, NVIDIA orders",
    long_about = None
)]
struct Args {
    /// Range start (YYYY-MM-DD or RFC 3339); defaults to 2023-01-01
    #[arg(long)]
    start: Option<String>,

    /// Range end (YYYY-MM-DD or RFC 3339); defaults to now
    #[arg(long)]
    end: Option<String>,

    /// Retry sources that are temporarily unavailable
    #[arg(long)]
    retry: bool,

    /// Override the upstream timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print the snapshot and failures as JSON instead of tables
    #[arg(long)]
    json: bool,
}

fn resolve_range(args: &Args) -> anyhow::Result<TimeRange> {
    let default = TimeRange::dashboard_default();
    let range = match (&args.start, &args.end) {
        (None, None) => default,
        (Some(start), Some(end)) => TimeRange::parse(start, end)?,
        (Some(start), None) => TimeRange::parse(start, &default.end().to_rfc3339())?,
        (None, Some(end)) => TimeRange::parse(&default.start().to_rfc3339(), end)?,
    };
    Ok(range)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    monitor_utils::init_tracing_with("warn,ai_monitor=info");

    let args = Args::parse();
    let range = resolve_range(&args)?;

    let mut config = MonitorConfig::from_env()?;
    if let Some(secs) = args.timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
        config.validate()?;
    }

    let mut sources = Sources::from_config(&config)?;
    if args.retry {
        sources = sources.with_retries(&RetryPolicy::from_config(&config));
    }

    info!(%range, retry = args.retry, "loading dashboard");

    let view = DashboardView::new(Arc::new(Aggregator::new(sources)), range);
    view.mount().await?;

    if args.json {
        let output = serde_json::json!({
            "snapshot": view.snapshot().as_deref(),
            "failures": view.failures(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        view.render(&TableRenderer::new())?;
    }

    Ok(())
}
