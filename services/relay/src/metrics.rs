//! Prometheus metrics exposition
//!
//! Registers and exposes the relay's metrics:
//!
//! - `relay_requests_total` (counter): labels `route`, `status`
//! - `relay_resolve_hops` (histogram): redirects followed per resolution
//! - `relay_upstream_errors_total` (counter): label `error_type`

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// `relay_resolve_hops` gets one bucket per possible hop count (the budget
/// caps it at 10) so the rendered histogram shows the chain-length
/// distribution directly.
pub fn install_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("relay_resolve_hops".to_string()),
            &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        )
        .expect("failed to set histogram buckets")
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record a completed request with route and status labels.
pub fn record_request(route: &'static str, status: u16) {
    metrics::counter!("relay_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
}

/// Record how many redirects one resolution followed.
pub fn record_resolve_hops(hops: u32) {
    metrics::histogram!("relay_resolve_hops").record(f64::from(hops));
}

/// Record an upstream failure with a classification label.
pub fn record_upstream_error(error_type: &'static str) {
    metrics::counter!("relay_upstream_errors_total", "error_type" => error_type).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        // When no recorder is installed, metrics calls are no-ops.
        record_request("resolve", 200);
        record_resolve_hops(3);
        record_upstream_error("timeout");
    }

    /// Create an isolated recorder/handle pair for unit tests, avoiding the
    /// global-recorder singleton constraint.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                metrics_exporter_prometheus::Matcher::Full("relay_resolve_hops".to_string()),
                &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
            )
            .expect("failed to set histogram buckets")
            .build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn request_counter_carries_route_and_status_labels() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_request("token", 200);
        record_request("resolve", 400);

        let output = handle.render();
        assert!(output.contains("relay_requests_total"));
        assert!(output.contains("route=\"token\""));
        assert!(output.contains("status=\"200\""));
        assert!(output.contains("route=\"resolve\""));
        assert!(output.contains("status=\"400\""));
    }

    #[test]
    fn resolve_hops_renders_histogram_buckets() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_resolve_hops(0);
        record_resolve_hops(10);

        let output = handle.render();
        assert!(
            output.contains("relay_resolve_hops_bucket"),
            "histogram must render _bucket lines, got:\n{output}"
        );
        assert!(output.contains("le=\"10\""), "hop-budget bucket must exist");
        assert!(output.contains("le=\"+Inf\""));
    }

    #[test]
    fn upstream_error_counter_carries_error_type() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_upstream_error("timeout");
        record_upstream_error("token_endpoint");

        let output = handle.render();
        assert!(output.contains("relay_upstream_errors_total"));
        assert!(output.contains("error_type=\"timeout\""));
        assert!(output.contains("error_type=\"token_endpoint\""));
    }
}
