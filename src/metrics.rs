/// Prometheus metrics for the planning portal
///
/// - HTTP request counts and latencies
/// - Section lifecycle transitions
/// - Portal token validations and launches
/// - Transaction conflict retries
/// - Draft saves per section

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, path, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "portal_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "portal_http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap();

    // ========== Lifecycle Metrics ==========

    /// Section transitions by kind (submit, approve, revision, skip)
    pub static ref SECTION_TRANSITIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "portal_section_transitions_total",
        "Section lifecycle transitions",
        &["transition", "section"]
    )
    .unwrap();

    /// Draft saves by section
    pub static ref DRAFT_SAVES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "portal_draft_saves_total",
        "Client draft saves",
        &["section"]
    )
    .unwrap();

    // ========== Access Metrics ==========

    /// Token validations by outcome
    pub static ref TOKEN_VALIDATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "portal_token_validations_total",
        "Portal token validations",
        &["outcome"]
    )
    .unwrap();

    /// Portal links minted
    pub static ref PORTAL_LINKS_GENERATED_TOTAL: IntCounter = register_int_counter!(
        "portal_links_generated_total",
        "Portal links generated"
    )
    .unwrap();

    /// Portal launches that started a new client session
    pub static ref PORTAL_SESSIONS_TOTAL: IntCounter = register_int_counter!(
        "portal_sessions_total",
        "Client portal sessions after debounce"
    )
    .unwrap();

    // ========== Database Metrics ==========

    /// Transaction attempts repeated after a lock conflict
    pub static ref TRANSACTION_RETRIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "portal_transaction_retries_total",
        "Transactions retried after a SQLite lock conflict",
        &["operation"]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

pub fn record_transition(transition: &str, section: &str) {
    SECTION_TRANSITIONS_TOTAL
        .with_label_values(&[transition, section])
        .inc();
}

pub fn record_draft_save(section: &str) {
    DRAFT_SAVES_TOTAL.with_label_values(&[section]).inc();
}

/// Outcome is one of ok, not_found, denied, expired
pub fn record_token_validation(outcome: &str) {
    TOKEN_VALIDATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_link_generated() {
    PORTAL_LINKS_GENERATED_TOTAL.inc();
}

pub fn record_portal_session() {
    PORTAL_SESSIONS_TOTAL.inc();
}

pub fn record_transaction_retry(operation: &str) {
    TRANSACTION_RETRIES_TOTAL.with_label_values(&[operation]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_http_request() {
        record_http_request("POST", "/api/sections.submit", 200, 0.05);
        let metrics = render_metrics();
        assert!(metrics.contains("portal_http_requests_total"));
        assert!(metrics.contains("portal_http_request_duration_seconds"));
    }

    #[test]
    fn test_lifecycle_counters_render() {
        record_transition("skip", "keyPeople");
        record_draft_save("locations");
        record_token_validation("denied");
        record_transaction_retry("skip_step");

        let metrics = render_metrics();
        assert!(metrics.contains("portal_section_transitions_total"));
        assert!(metrics.contains("portal_draft_saves_total"));
        assert!(metrics.contains("portal_token_validations_total"));
        assert!(metrics.contains("portal_transaction_retries_total"));
    }

    #[test]
    fn test_transition_labels() {
        let before = SECTION_TRANSITIONS_TOTAL
            .with_label_values(&["approve", "timeline"])
            .get();
        record_transition("approve", "timeline");
        let after = SECTION_TRANSITIONS_TOTAL
            .with_label_values(&["approve", "timeline"])
            .get();
        assert_eq!(after, before + 1);
    }
}
