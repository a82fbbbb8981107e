//! Gain model - proportional band tuning to standard-form PID coefficients
//!
//! Standard form: `u(t) = Kp * (e(t) + 1/Ti * ∫e dt + Td * de/dt)`, so with a
//! proportional band `PB`:
//!
//! ```text
//! Kp    = 1 / PB
//! Ki    = Kp / Ti
//! Kd    = Kp * Td
//! KiMax = |0.5 / Ki|
//! ```

use crate::error::ControlError;
use log::debug;

// ============================================================================
// TUNING PARAMETERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningParameters {
    /// Measurement span over which the proportional output sweeps 0..1.
    pub proportional_band: f64,
    /// Seconds in which accumulated past error should be eliminated.
    pub integral_time: f64,
    /// Seconds ahead the rate of error change is projected.
    pub derivative_time: f64,
}

impl TuningParameters {
    pub fn new(proportional_band: f64, integral_time: f64, derivative_time: f64) -> Self {
        Self {
            proportional_band,
            integral_time,
            derivative_time,
        }
    }

    pub fn validate(&self) -> Result<(), ControlError> {
        if !(self.proportional_band > 0.0 && self.proportional_band.is_finite()) {
            return Err(ControlError::InvalidTuning {
                parameter: "proportional_band",
                value: self.proportional_band,
                requirement: "must be finite and greater than zero",
            });
        }
        if !(self.integral_time > 0.0 && self.integral_time.is_finite()) {
            return Err(ControlError::InvalidTuning {
                parameter: "integral_time",
                value: self.integral_time,
                requirement: "must be finite and greater than zero",
            });
        }
        if !(self.derivative_time >= 0.0 && self.derivative_time.is_finite()) {
            return Err(ControlError::InvalidTuning {
                parameter: "derivative_time",
                value: self.derivative_time,
                requirement: "must be finite and not negative",
            });
        }
        Ok(())
    }
}

impl Default for TuningParameters {
    fn default() -> Self {
        Self::new(100.0, 180.0, 45.0)
    }
}

// ============================================================================
// GAINS
// ============================================================================

/// Controller coefficients. Only obtainable through derivation, which keeps
/// `ki_max` finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gains {
    kp: f64,
    ki: f64,
    kd: f64,
    ki_max: f64,
}

impl Gains {
    pub fn from_tuning(tuning: &TuningParameters) -> Result<Self, ControlError> {
        tuning.validate()?;

        let kp = 1.0 / tuning.proportional_band;
        let ki = kp / tuning.integral_time;
        let kd = kp * tuning.derivative_time;
        let ki_max = (0.5 / ki).abs();

        // Tiny bands or huge integral times can still overflow or underflow.
        for (parameter, value) in [("kp", kp), ("ki", ki), ("kd", kd), ("ki_max", ki_max)] {
            if !value.is_finite() {
                return Err(ControlError::InvalidTuning {
                    parameter,
                    value,
                    requirement: "derived gain must be finite",
                });
            }
        }

        debug!(
            "PB: {} Ti: {} Td: {} --> Kp: {} Ki: {} Kd: {} KiMax: {}",
            tuning.proportional_band, tuning.integral_time, tuning.derivative_time, kp, ki, kd, ki_max
        );

        Ok(Self { kp, ki, kd, ki_max })
    }

    pub fn kp(&self) -> f64 {
        self.kp
    }

    pub fn ki(&self) -> f64 {
        self.ki
    }

    pub fn kd(&self) -> f64 {
        self.kd
    }

    /// Bound applied to the accumulated error (not the scaled integral term).
    pub fn ki_max(&self) -> f64 {
        self.ki_max
    }
}

pub fn derive_gains(
    proportional_band: f64,
    integral_time: f64,
    derivative_time: f64,
) -> Result<Gains, ControlError> {
    Gains::from_tuning(&TuningParameters::new(
        proportional_band,
        integral_time,
        derivative_time,
    ))
}
