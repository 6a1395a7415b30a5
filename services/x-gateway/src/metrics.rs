//! Prometheus metrics exposition
//!
//! - `oauth_flow_total` (counter): labels `step` (authorize, callback,
//!   refresh), `outcome` (success or an error kind)
//! - `x_api_requests_total` (counter): labels `operation`, `outcome`
//! - `http_request_duration_seconds` (histogram): labels `route`, `status`

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_METRIC: &str = "http_request_duration_seconds";

/// Bucket boundaries from 5ms up to 30s, above the default 10s provider timeout.
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(DURATION_METRIC.to_string()), DURATION_BUCKETS)
}

/// Install the global Prometheus recorder and return a handle for `/metrics`.
///
/// Explicit buckets make the duration metric render as a histogram with
/// `_bucket` lines instead of a summary.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

/// Record the outcome of one authorization flow step.
pub fn record_flow_step(step: &'static str, outcome: &'static str) {
    metrics::counter!("oauth_flow_total", "step" => step, "outcome" => outcome).increment(1);
}

/// Record the outcome of one call through the API facade.
pub fn record_api_call(operation: &'static str, outcome: &'static str) {
    metrics::counter!("x_api_requests_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
}

/// Record a completed HTTP request against its matched route.
pub fn record_request(route: &'static str, status: u16, duration_secs: f64) {
    metrics::histogram!(DURATION_METRIC, "route" => route, "status" => status.to_string())
        .record(duration_secs);
}
