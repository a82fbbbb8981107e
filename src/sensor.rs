//! Sensor module - measurement source capability and the smoker thermometer

use log::debug;

// ============================================================================
// MEASUREMENT SOURCE - Anything that can report the process value
// ============================================================================

/// Produces the current process measurement on demand.
///
/// A source that cannot measure must handle that at its own boundary (map it
/// to a sentinel or fail loudly); the control loop takes whatever it returns.
pub trait MeasurementSource {
    fn read(&mut self) -> f64;
}

impl<F> MeasurementSource for F
where
    F: FnMut() -> f64,
{
    fn read(&mut self) -> f64 {
        self()
    }
}

// ============================================================================
// THERMOMETER - Simulated smoker temperature probe
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Thermometer {
    pub value: f64,
}

impl Thermometer {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl MeasurementSource for Thermometer {
    fn read(&mut self) -> f64 {
        debug!("Thermometer={:.4}", self.value);
        self.value
    }
}
