//! OpenTelemetry metric handles.
//!
//! With the `metrics` feature the binary builds a meter provider and passes a
//! [`Meter`] to [`init_metric_handles`]. Without it, every recording function
//! below compiles to a no-op so call sites stay unconditional.

#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

#[cfg(feature = "metrics")]
static ARTIFACTS_GENERATED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static ARTIFACTS_PERSISTED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static GENERATION_FAILURES: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static GENERATION_FALLBACKS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static FLUSH_DURATION_MS: OnceLock<Histogram<f64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static FLUSH_SIZE: OnceLock<Histogram<u64>> = OnceLock::new();

#[cfg(feature = "metrics")]
pub fn init_metric_handles(meter: &Meter) {
    let _ = ARTIFACTS_GENERATED.set(
        meter
            .u64_counter("artifacts_generated")
            .with_description("Successful artifacts observed by the coordinator")
            .build(),
    );

    let _ = ARTIFACTS_PERSISTED.set(
        meter
            .u64_counter("artifacts_persisted")
            .with_description("Artifacts durably written to the sink")
            .build(),
    );

    let _ = GENERATION_FAILURES.set(
        meter
            .u64_counter("generation_failures")
            .with_description("Jobs that produced no artifact")
            .build(),
    );

    let _ = GENERATION_FALLBACKS.set(
        meter
            .u64_counter("generation_fallbacks")
            .with_description("Artifacts produced by the derivation fallback")
            .build(),
    );

    let _ = FLUSH_DURATION_MS.set(
        meter
            .f64_histogram("flush_duration")
            .with_unit("ms")
            .with_description("Time to write and sync one batch")
            .build(),
    );

    let _ = FLUSH_SIZE.set(
        meter
            .u64_histogram("flush_size")
            .with_description("Artifacts per flushed batch")
            .build(),
    );
}

#[cfg(feature = "metrics")]
pub fn increment_generated(count: u64) {
    if let Some(counter) = ARTIFACTS_GENERATED.get() {
        counter.add(count, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_generated(_count: u64) {}

#[cfg(feature = "metrics")]
pub fn increment_failures() {
    if let Some(counter) = GENERATION_FAILURES.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_failures() {}

#[cfg(feature = "metrics")]
pub fn increment_fallbacks() {
    if let Some(counter) = GENERATION_FALLBACKS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_fallbacks() {}

#[cfg(feature = "metrics")]
pub fn record_flush(size: u64, duration_ms: f64) {
    if let Some(counter) = ARTIFACTS_PERSISTED.get() {
        counter.add(size, &[]);
    }
    if let Some(histogram) = FLUSH_SIZE.get() {
        histogram.record(size, &[]);
    }
    if let Some(histogram) = FLUSH_DURATION_MS.get() {
        histogram.record(duration_ms, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_flush(_size: u64, _duration_ms: f64) {}
