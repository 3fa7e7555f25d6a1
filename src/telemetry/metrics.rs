//! Prometheus metrics setup and metric definitions

use crate::events::channels;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> PrometheusHandle {
    // Histogram buckets (seconds) for HTTP latency, including sub-millisecond
    // buckets for fast endpoints.
    let buckets = vec![
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Register metric descriptions and emit initial zero values so Prometheus
/// output includes HELP/TYPE lines for all metrics from startup (not just
/// after first use).
pub fn describe_metrics() {
    // HTTP metrics
    describe_counter!("patio_http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "patio_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_gauge!(
        "patio_http_requests_in_flight",
        "Number of HTTP requests currently being processed"
    );

    // Authentication gateway
    describe_counter!(
        "patio_gateway_requests_total",
        "Authentication gateway decisions by outcome"
    );

    // Rate limiting
    describe_counter!(
        "patio_rate_limit_throttled_total",
        "Requests rejected by the per-IP rate limiter"
    );
    describe_counter!(
        "patio_rate_limit_backend_errors_total",
        "Rate-limit backend failures that fell back to in-process counting"
    );

    // User service client
    describe_counter!(
        "patio_upstream_requests_total",
        "User service calls by operation and outcome"
    );

    // Event bus
    describe_counter!(
        "patio_events_published_total",
        "Events published to the bus per channel"
    );
    describe_counter!(
        "patio_events_publish_failures_total",
        "Events dropped because publishing failed"
    );
    describe_counter!(
        "patio_events_received_total",
        "Events received from the bus per channel"
    );
    describe_counter!(
        "patio_events_dropped_total",
        "Received payloads dropped because they could not be decoded"
    );

    // Verification
    describe_counter!(
        "patio_verification_sends_total",
        "Verification send attempts by outcome"
    );
    describe_counter!(
        "patio_verification_checks_total",
        "Verification check attempts by outcome"
    );

    // Emit initial zero values for counters gated behind specific code paths
    // so HELP/TYPE lines appear from startup. The HTTP metrics self-initialise
    // on the first request.
    counter!("patio_gateway_requests_total", "outcome" => "open").absolute(0);
    counter!("patio_gateway_requests_total", "outcome" => "forwarded").absolute(0);
    counter!("patio_gateway_requests_total", "outcome" => "rejected", "reason" => "missing_bearer")
        .absolute(0);
    counter!("patio_rate_limit_throttled_total", "path" => "").absolute(0);
    counter!("patio_rate_limit_backend_errors_total").absolute(0);
    counter!("patio_upstream_requests_total", "operation" => "get_user", "outcome" => "ok")
        .absolute(0);
    counter!("patio_upstream_requests_total", "operation" => "get_user", "outcome" => "fallback")
        .absolute(0);
    for channel in channels::ALL {
        counter!("patio_events_published_total", "channel" => *channel).absolute(0);
        counter!("patio_events_publish_failures_total", "channel" => *channel).absolute(0);
        counter!("patio_events_received_total", "channel" => *channel).absolute(0);
        counter!("patio_events_dropped_total", "channel" => *channel).absolute(0);
    }
    counter!("patio_verification_sends_total", "outcome" => "sent").absolute(0);
    counter!("patio_verification_checks_total", "outcome" => "verified").absolute(0);
    gauge!("patio_http_requests_in_flight").set(0.0);
}
