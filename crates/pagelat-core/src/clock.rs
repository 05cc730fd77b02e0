//! Monotonic timing helpers.
//!
//! All latencies come from [`Instant`], which reads `CLOCK_MONOTONIC` on
//! Linux and is immune to wall-clock adjustments.

use std::time::Instant;

/// Time a single closure invocation, returning its result and the elapsed
/// nanoseconds.
#[inline]
pub fn time_once<R>(f: impl FnOnce() -> R) -> (R, u64) {
    let start = Instant::now();
    let out = f();
    let ns = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
    (out, ns)
}

/// Estimate the cost of one clock read by averaging back-to-back reads.
///
/// At warm-read timescales (tens of nanoseconds) this overhead rivals the
/// access being measured; logged at startup so warm figures can be judged
/// against it.
#[must_use]
pub fn clock_overhead_ns(iterations: u32) -> f64 {
    let start = Instant::now();
    for _ in 0..iterations {
        std::hint::black_box(Instant::now());
    }
    start.elapsed().as_nanos() as f64 / f64::from(iterations.max(1))
}
