//! Client-side metrics
//!
//! Recorded through the `metrics` facade; the binary decides whether a
//! Prometheus recorder is installed. Without one every call is a no-op.
//!
//! - `api_client_requests_total` (counter): labels `status`, `method`
//! - `api_client_request_duration_seconds` (histogram): label `status`
//! - `api_client_transport_errors_total` (counter): label `error_type`
//! - `api_client_refresh_total` (counter): label `outcome`
//! - `api_client_replays_total` (counter)
//! - `api_client_refresh_waiters` (histogram): queued requests per refresh

pub const REQUEST_DURATION_METRIC: &str = "api_client_request_duration_seconds";

/// Bucket boundaries for `api_client_request_duration_seconds`, 5ms to 60s.
pub const REQUEST_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Record one transport round trip that produced a response.
pub fn record_request(status: u16, method: &str, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!("api_client_requests_total", "status" => status_str.clone(), "method" => method.to_string())
        .increment(1);
    metrics::histogram!(REQUEST_DURATION_METRIC, "status" => status_str).record(duration_secs);
}

/// Record a round trip that failed before a status was available.
pub fn record_transport_error(error_type: &str) {
    metrics::counter!("api_client_transport_errors_total", "error_type" => error_type.to_string())
        .increment(1);
}

/// Record a settled refresh and how many queued requests it released.
pub fn record_refresh(success: bool, waiters: usize) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("api_client_refresh_total", "outcome" => outcome).increment(1);
    metrics::histogram!("api_client_refresh_waiters").record(waiters as f64);
}

pub fn record_replay() {
    metrics::counter!("api_client_replays_total").increment(1);
}
