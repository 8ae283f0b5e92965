//! Prometheus exposition for a single CLI run
//!
//! The api-client records through the `metrics` facade. When
//! `telemetry.print_metrics` is set the binary installs this recorder and
//! writes the rendered text to stderr before exiting.

use api_client::metrics::{REQUEST_DURATION_BUCKETS, REQUEST_DURATION_METRIC};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

/// Builder with histogram buckets for request durations, so they render as
/// `_bucket` lines rather than a summary.
fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full(REQUEST_DURATION_METRIC.to_string()),
        REQUEST_DURATION_BUCKETS,
    )
}

/// Install the Prometheus recorder globally and return a handle for
/// rendering.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}
