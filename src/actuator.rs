//! Actuator module - actuation sink capability and smoker outputs

use log::info;

/// Smoker temperature below which the igniter rod is switched on.
pub const IGNITER_ON_TEMP: f64 = 100.0;

// ============================================================================
// ACTUATION SINK - Anything that applies the controller output
// ============================================================================

/// Consumes the measurement an output was computed from together with the
/// actuation signal, and applies it to the device.
pub trait ActuationSink {
    fn apply(&mut self, measurement: f64, signal: f64);
}

impl<F> ActuationSink for F
where
    F: FnMut(f64, f64),
{
    fn apply(&mut self, measurement: f64, signal: f64) {
        self(measurement, signal)
    }
}

// ============================================================================
// SMOKER - Pellet auger, draft fan and igniter
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Smoker {
    pub auger: f64,
    pub fan: f64,
    pub igniter: bool,
}

impl Smoker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActuationSink for Smoker {
    fn apply(&mut self, measurement: f64, signal: f64) {
        self.igniter = measurement < IGNITER_ON_TEMP;
        self.auger = signal;
        self.fan = signal;

        info!(
            "Smoker ctrl: auger={:.4} fan={:.4} igniter={}",
            self.auger, self.fan, self.igniter
        );
    }
}

// ============================================================================
// SIGNAL LATCH - Holds the last applied pair, used by the simulator
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SignalLatch {
    pub measurement: f64,
    pub signal: f64,
    pub updates: u64,
}

impl ActuationSink for SignalLatch {
    fn apply(&mut self, measurement: f64, signal: f64) {
        self.measurement = measurement;
        self.signal = signal;
        self.updates += 1;
    }
}
