//! Metrics module - control loop timing and fallback tracking

use crate::control::ActuationResult;
use crate::error::ControlError;
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// LOOP METRICS - Thread-safe, shared between a runner and its owner
// ============================================================================

#[derive(Clone)]
pub struct LoopMetrics {
    evaluation_hist: Arc<Mutex<Histogram<u64>>>,
    // |measured elapsed - nominal period|
    jitter_hist: Arc<Mutex<Histogram<u64>>>,
    iterations: Arc<AtomicU64>,
    elapsed_fallbacks: Arc<AtomicU64>,
    non_finite_errors: Arc<AtomicU64>,
    saturated: Arc<AtomicU64>,
    out_of_range: Arc<AtomicU64>,
}

impl LoopMetrics {
    pub fn new() -> Self {
        Self {
            evaluation_hist: Arc::new(Mutex::new(new_histogram())),
            jitter_hist: Arc::new(Mutex::new(new_histogram())),
            iterations: Arc::new(AtomicU64::new(0)),
            elapsed_fallbacks: Arc::new(AtomicU64::new(0)),
            non_finite_errors: Arc::new(AtomicU64::new(0)),
            saturated: Arc::new(AtomicU64::new(0)),
            out_of_range: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records one completed iteration and how long `evaluate_once` took.
    pub fn record_iteration(&self, result: &ActuationResult, evaluation: Duration) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
        self.evaluation_hist
            .lock()
            .record(evaluation.as_nanos() as u64)
            .ok();

        match result.anomaly {
            Some(ControlError::NonPositiveElapsedTime { .. }) => {
                self.elapsed_fallbacks.fetch_add(1, Ordering::Relaxed);
            }
            Some(ControlError::NonFiniteError { .. }) => {
                self.non_finite_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
        if result.proportional <= 0.0 || result.proportional >= 1.0 {
            self.saturated.fetch_add(1, Ordering::Relaxed);
        }
        if !(0.0..=1.0).contains(&result.output) {
            self.out_of_range.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_jitter(&self, elapsed_secs: f64, period: Duration) {
        if elapsed_secs <= 0.0 || !elapsed_secs.is_finite() {
            return;
        }
        let jitter = (elapsed_secs - period.as_secs_f64()).abs();
        self.jitter_hist
            .lock()
            .record(Duration::from_secs_f64(jitter).as_nanos() as u64)
            .ok();
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(Ordering::Relaxed)
    }

    pub fn report(&self) -> MetricsReport {
        let evaluation = self.evaluation_hist.lock();
        let jitter = self.jitter_hist.lock();

        MetricsReport {
            iterations: self.iterations.load(Ordering::Relaxed),
            elapsed_fallbacks: self.elapsed_fallbacks.load(Ordering::Relaxed),
            non_finite_errors: self.non_finite_errors.load(Ordering::Relaxed),
            saturated_iterations: self.saturated.load(Ordering::Relaxed),
            out_of_range_outputs: self.out_of_range.load(Ordering::Relaxed),
            evaluation_p50: Duration::from_nanos(evaluation.value_at_quantile(0.5)),
            evaluation_p99: Duration::from_nanos(evaluation.value_at_quantile(0.99)),
            jitter_p50: Duration::from_nanos(jitter.value_at_quantile(0.5)),
            jitter_p99: Duration::from_nanos(jitter.value_at_quantile(0.99)),
        }
    }
}

impl Default for LoopMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn new_histogram() -> Histogram<u64> {
    // auto-resizing, so only the precision can be rejected
    Histogram::new(3).expect("3 significant figures is a valid histogram precision")
}

// ============================================================================
// METRICS REPORT - Summary statistics
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReport {
    pub iterations: u64,
    pub elapsed_fallbacks: u64,
    pub non_finite_errors: u64,
    pub saturated_iterations: u64,
    pub out_of_range_outputs: u64,
    pub evaluation_p50: Duration,
    pub evaluation_p99: Duration,
    pub jitter_p50: Duration,
    pub jitter_p99: Duration,
}
