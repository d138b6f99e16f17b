//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `cluster_registration_events_total` - Secret events handled, by kind
//! - `cluster_registration_events_ignored_total` - Events dropped by the name filter
//! - `cluster_registration_event_failures_total` - Events abandoned or failed, by stage
//! - `cluster_registration_registrations_total` - Successful `eksctl register` calls
//! - `cluster_registration_deregistrations_total` - Successful `eksctl deregister` calls
//! - `cluster_registration_manifest_apply_attempts_total` - `kubectl apply` attempts
//! - `cluster_registration_event_duration_seconds` - Time spent handling one event

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static EVENTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cluster_registration_events_total",
            "Total number of secret events handled by kind",
        ),
        &["kind"],
    )
    .expect("Failed to create EVENTS_TOTAL metric - this should never happen")
});

static EVENTS_IGNORED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cluster_registration_events_ignored_total",
        "Total number of secret events ignored by the name filter",
    )
    .expect("Failed to create EVENTS_IGNORED_TOTAL metric - this should never happen")
});

static EVENT_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "cluster_registration_event_failures_total",
            "Total number of failed event handling steps by stage",
        ),
        &["stage"],
    )
    .expect("Failed to create EVENT_FAILURES_TOTAL metric - this should never happen")
});

static REGISTRATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cluster_registration_registrations_total",
        "Total number of clusters registered",
    )
    .expect("Failed to create REGISTRATIONS_TOTAL metric - this should never happen")
});

static DEREGISTRATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cluster_registration_deregistrations_total",
        "Total number of clusters deregistered",
    )
    .expect("Failed to create DEREGISTRATIONS_TOTAL metric - this should never happen")
});

static MANIFEST_APPLY_ATTEMPTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "cluster_registration_manifest_apply_attempts_total",
        "Total number of manifest apply attempts",
    )
    .expect("Failed to create MANIFEST_APPLY_ATTEMPTS_TOTAL metric - this should never happen")
});

static EVENT_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "cluster_registration_event_duration_seconds",
            "Duration of secret event handling in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create EVENT_DURATION metric - this should never happen")
});

/// Register all metrics with the registry served on `/metrics`
///
/// # Errors
///
/// Fails if a metric is registered twice.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(EVENTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(EVENTS_IGNORED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(EVENT_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REGISTRATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DEREGISTRATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(MANIFEST_APPLY_ATTEMPTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(EVENT_DURATION.clone()))?;

    Ok(())
}

pub fn increment_events(kind: &str) {
    EVENTS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn increment_events_ignored() {
    EVENTS_IGNORED_TOTAL.inc();
}

pub fn increment_event_failures(stage: &str) {
    EVENT_FAILURES_TOTAL.with_label_values(&[stage]).inc();
}

pub fn increment_registrations() {
    REGISTRATIONS_TOTAL.inc();
}

pub fn increment_deregistrations() {
    DEREGISTRATIONS_TOTAL.inc();
}

pub fn increment_manifest_apply_attempts() {
    MANIFEST_APPLY_ATTEMPTS_TOTAL.inc();
}

pub fn observe_event_duration(duration: f64) {
    EVENT_DURATION.observe(duration);
}
