//! IPC module - state shared between the control loop and its surroundings

use crate::actuator::ActuationSink;
use crate::sensor::MeasurementSource;
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// SHARED - Mutex-guarded handle for sources/sinks used from several threads
// ============================================================================

/// Cloneable handle to a value that both the control loop and a surrounding
/// process (a simulator, a UI) need to touch.
///
/// The control loop itself never needs this; it is for callers whose source
/// or sink is also driven from another thread.
#[derive(Debug, Default)]
pub struct Shared<T> {
    data: Arc<Mutex<T>>,
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self {
            data: Arc::new(Mutex::new(value)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.data.lock()
    }

    pub fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        let mut value = self.data.lock();
        f(&mut *value)
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.data.lock().clone()
    }
}

impl<T: MeasurementSource> MeasurementSource for Shared<T> {
    fn read(&mut self) -> f64 {
        self.data.lock().read()
    }
}

impl<T: ActuationSink> ActuationSink for Shared<T> {
    fn apply(&mut self, measurement: f64, signal: f64) {
        self.data.lock().apply(measurement, signal)
    }
}

// ============================================================================
// SETPOINT CELL - Lock-free setpoint that operators can retune at runtime
// ============================================================================

#[derive(Debug, Clone)]
pub struct SetpointCell {
    bits: Arc<AtomicU64>,
}

impl SetpointCell {
    pub fn new(setpoint: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(setpoint.to_bits())),
        }
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set(&self, setpoint: f64) {
        self.bits.store(setpoint.to_bits(), Ordering::Relaxed);
    }
}
