//! Prometheus metrics for the WalletKit bridge.
//!
//! All metrics follow the naming convention: `walletkit_<component>_<metric>_<unit>`
//!
//! Metrics register themselves on first use against a crate-private
//! registry; [`gather_metrics`] renders that registry.

use lazy_static::lazy_static;
use prometheus::core::Collector;
use prometheus::{
    exponential_buckets, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, IntCounter, Opts,
    Registry, TextEncoder,
};
use std::time::Duration;

use crate::TelemetryError;

fn registered<C: Collector + Clone + 'static>(collector: C) -> C {
    // Only fails on a duplicate name, which the static set below cannot produce.
    let _ = REGISTRY.register(Box::new(collector.clone()));
    collector
}

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // CALL CORRELATION METRICS
    // =========================================================================

    /// Calls sent to the engine
    pub static ref CALLS_ISSUED: CounterVec = registered(CounterVec::new(
        Opts::new("walletkit_calls_issued_total", "Correlated calls sent to the engine"),
        &["method"]
    ).expect("metric creation failed"));

    /// Calls resolved with a result
    pub static ref CALLS_COMPLETED: CounterVec = registered(CounterVec::new(
        Opts::new("walletkit_calls_completed_total", "Correlated calls resolved with a result"),
        &["method"]
    ).expect("metric creation failed"));

    /// Calls resolved with a failure
    pub static ref CALLS_FAILED: CounterVec = registered(CounterVec::new(
        Opts::new("walletkit_calls_failed_total", "Correlated calls resolved with a failure"),
        &["method", "reason"]  // reason: remote/timeout/cancelled/shutdown/channel/protocol
    ).expect("metric creation failed"));

    /// Calls currently awaiting a response
    pub static ref PENDING_CALLS: Gauge = registered(Gauge::new(
        "walletkit_calls_pending",
        "Correlated calls currently awaiting a response"
    ).expect("metric creation failed"));

    /// Time from send to resolution
    pub static ref CALL_LATENCY: HistogramVec = registered(HistogramVec::new(
        HistogramOpts::new(
            "walletkit_call_duration_seconds",
            "Time from sending a call to its resolution"
        ).buckets(exponential_buckets(0.0005, 2.0, 16).expect("valid buckets")),
        &["method"]
    ).expect("metric creation failed"));

    /// Responses that matched no pending call
    pub static ref UNMATCHED_RESPONSES: IntCounter = registered(IntCounter::new(
        "walletkit_responses_unmatched_total",
        "Responses whose correlation ID matched no pending call"
    ).expect("metric creation failed"));

    // =========================================================================
    // INITIALISATION METRICS
    // =========================================================================

    /// Engine init attempts by outcome
    pub static ref INIT_ATTEMPTS: CounterVec = registered(CounterVec::new(
        Opts::new("walletkit_init_attempts_total", "Engine init attempts"),
        &["outcome"]  // outcome: success/failure
    ).expect("metric creation failed"));

    // =========================================================================
    // EVENT METRICS
    // =========================================================================

    /// Events delivered to the router
    pub static ref EVENTS_DISPATCHED: CounterVec = registered(CounterVec::new(
        Opts::new("walletkit_events_dispatched_total", "Engine events dispatched to handlers"),
        &["event_type"]
    ).expect("metric creation failed"));

    /// Inbound messages dropped before dispatch
    pub static ref EVENTS_DROPPED: CounterVec = registered(CounterVec::new(
        Opts::new("walletkit_events_dropped_total", "Inbound messages dropped before dispatch"),
        &["reason"]
    ).expect("metric creation failed"));

    /// Handler invocations that failed or panicked
    pub static ref HANDLER_FAILURES: CounterVec = registered(CounterVec::new(
        Opts::new("walletkit_handler_failures_total", "Event handler invocations that failed"),
        &["event_type"]
    ).expect("metric creation failed"));
}

/// A call was sent.
pub fn record_call_issued(method: &str) {
    CALLS_ISSUED.with_label_values(&[method]).inc();
    PENDING_CALLS.inc();
}

/// A call resolved. `failure` carries the failure reason label, if any.
pub fn record_call_resolved(method: &str, elapsed: Duration, failure: Option<&str>) {
    PENDING_CALLS.dec();
    CALL_LATENCY
        .with_label_values(&[method])
        .observe(elapsed.as_secs_f64());
    match failure {
        None => CALLS_COMPLETED.with_label_values(&[method]).inc(),
        Some(reason) => CALLS_FAILED.with_label_values(&[method, reason]).inc(),
    }
}

/// A response arrived for an id nobody waits on.
pub fn record_unmatched_response() {
    UNMATCHED_RESPONSES.inc();
}

/// An init attempt finished.
pub fn record_init_attempt(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    INIT_ATTEMPTS.with_label_values(&[outcome]).inc();
}

/// An event reached the router.
pub fn record_event_dispatched(event_type: &str, handler_failures: usize) {
    EVENTS_DISPATCHED.with_label_values(&[event_type]).inc();
    if handler_failures > 0 {
        HANDLER_FAILURES
            .with_label_values(&[event_type])
            .inc_by(handler_failures as f64);
    }
}

/// An inbound message was dropped.
pub fn record_event_dropped(reason: &str) {
    EVENTS_DROPPED.with_label_values(&[reason]).inc();
}

/// Encode all metrics in the Prometheus text exposition format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsEncode(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsEncode(e.to_string()))
}
