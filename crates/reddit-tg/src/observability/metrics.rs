use super::GLOBAL_LABELS;
use crate::Config;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};
use serde::Deserialize;
use std::net::SocketAddr;

/// Histogram buckets to measure the distribution of request durations in seconds
pub(crate) const DEFAULT_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

pub(crate) const HTTP_REQUEST_DURATION: &str = "http_request_duration_seconds";
pub(crate) const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub(crate) const TG_COMMANDS_TOTAL: &str = "tg_commands_total";

#[derive(Deserialize)]
pub(crate) struct MetricsConfig {
    /// Address of the prometheus scrape endpoint. Metrics are only
    /// collected in memory and dropped when it is not set.
    pub(crate) listen_addr: Option<SocketAddr>,
}

pub fn init_metrics(config: &Config) -> Result<(), BuildError> {
    let Some(addr) = config.metrics.listen_addr else {
        return Ok(());
    };

    let mut builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION.to_owned()),
            DEFAULT_DURATION_BUCKETS,
        )?;

    for (key, value) in GLOBAL_LABELS {
        builder = builder.add_global_label(*key, *value);
    }

    builder.install()?;

    metrics::describe_counter!(
        TG_COMMANDS_TOTAL,
        "Number of bot commands handled, by command and outcome"
    );
    metrics::describe_counter!(
        HTTP_REQUESTS_TOTAL,
        "Number of outgoing HTTP requests, by host and status"
    );
    metrics::describe_histogram!(
        HTTP_REQUEST_DURATION,
        metrics::Unit::Seconds,
        "Duration of a single outgoing HTTP request"
    );

    tracing::info!(%addr, "Prometheus metrics exporter started");

    Ok(())
}
