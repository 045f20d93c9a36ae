// Telemetry module for structured logging and metrics

use anyhow::Result;
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize structured logging with JSON formatting.
///
/// Log levels come from `RUST_LOG` when set, otherwise from the configured
/// level.
pub fn init_logging(log_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))?;

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_target(true)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    tracing::info!(log_level = log_level, "Structured logging initialized");
    Ok(())
}

/// Initialize the Prometheus metrics exporter and register the service
/// metrics:
/// - trigger_requests_total: trigger requests received, by selector kind
/// - pipelines_triggered_total: start orders issued, by trigger source
/// - pipeline_launch_failures_total: start orders the queue refused
pub fn init_metrics(metrics_port: u16) -> Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", metrics_port)
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid metrics port: {}", e))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    describe_counter!(
        "trigger_requests_total",
        "Total number of trigger requests received"
    );
    describe_counter!(
        "pipelines_triggered_total",
        "Total number of pipeline start orders issued"
    );
    describe_counter!(
        "pipeline_launch_failures_total",
        "Total number of start orders rejected by the queue"
    );

    tracing::info!(
        metrics_port = metrics_port,
        "Prometheus metrics exporter initialized"
    );

    Ok(())
}

/// Record a received trigger request
#[inline]
pub fn record_trigger_request(selector: &str) {
    counter!("trigger_requests_total", "selector" => selector.to_string()).increment(1);
}

/// Record issued start orders
#[inline]
pub fn record_pipelines_triggered(source: &str, count: u64) {
    counter!("pipelines_triggered_total", "source" => source.to_string()).increment(count);
}

/// Record a start order the queue refused
#[inline]
pub fn record_launch_failure() {
    counter!("pipeline_launch_failures_total").increment(1);
}
