//! Control module - proportional band PID control law
//!
//! Each call to [`ControlLoop::evaluate_once`] reads the process value, computes
//!
//! - proportional: `clamp(Kp * e + 0.5, 0, 1)`, so zero error maps to 50% duty
//! - integral: `Ki * Σ(e * dt)`, with the accumulated error clamped to `±KiMax`
//! - derivative: `Kd * (e - e_prev) / dt`, on error
//!
//! and hands `proportional + integral + derivative` to the sink. The sum is not
//! clamped again; only the proportional term is bounded to the unit interval.
//!
//! A non-finite error (NaN or infinite measurement or setpoint) leaves the
//! accumulated and previous error untouched, so the loop recovers as soon as
//! the source does.

use crate::actuator::ActuationSink;
use crate::error::ControlError;
use crate::gain::{Gains, TuningParameters};
use crate::ipc::SetpointCell;
use crate::sensor::MeasurementSource;
use log::{debug, warn};
use std::time::Instant;

// ============================================================================
// CONTROLLER STATE
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerState {
    previous_error: f64,
    cumulative_error: f64,
    previous_sample_time: Option<Instant>,
}

impl ControllerState {
    pub fn previous_error(&self) -> f64 {
        self.previous_error
    }

    /// Accumulated `error * elapsed`, always within `±ki_max`.
    pub fn cumulative_error(&self) -> f64 {
        self.cumulative_error
    }

    /// `None` until the first sample has been evaluated.
    pub fn previous_sample_time(&self) -> Option<Instant> {
        self.previous_sample_time
    }
}

// ============================================================================
// ACTUATION RESULT - What one iteration computed
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ActuationResult {
    pub measurement: f64,
    pub setpoint: f64,
    pub error: f64,
    /// Seconds since the previous sample, negative under clock skew.
    pub elapsed: f64,
    pub proportional: f64,
    pub integral: f64,
    pub derivative: f64,
    pub output: f64,
    /// Set when the iteration fell back to skipping the integral increment
    /// and zeroing the derivative, either for the elapsed time or for a
    /// non-finite error.
    pub anomaly: Option<ControlError>,
}

// ============================================================================
// CONTROL LOOP
// ============================================================================

pub struct ControlLoop<S, A> {
    source: S,
    sink: A,
    gains: Gains,
    setpoint: SetpointCell,
    state: ControllerState,
}

impl<S, A> ControlLoop<S, A>
where
    S: MeasurementSource,
    A: ActuationSink,
{
    pub fn new(source: S, sink: A, gains: Gains, setpoint: f64) -> Self {
        Self {
            source,
            sink,
            gains,
            setpoint: SetpointCell::new(setpoint),
            state: ControllerState::default(),
        }
    }

    /// Derives the gains from a proportional band tuning, then constructs.
    pub fn with_tuning(
        source: S,
        sink: A,
        tuning: &TuningParameters,
        setpoint: f64,
    ) -> Result<Self, ControlError> {
        let gains = Gains::from_tuning(tuning)?;
        Ok(Self::new(source, sink, gains, setpoint))
    }

    pub fn evaluate_once(&mut self, now: Instant) -> ActuationResult {
        let elapsed = match self.state.previous_sample_time {
            Some(previous) => signed_elapsed_secs(previous, now),
            None => 0.0,
        };

        let measurement = self.source.read();
        let setpoint = self.setpoint.get();
        let error = setpoint - measurement;

        debug!(
            "Input: measurement={:.4} setpoint={:.4} error={:.4} dt={:.4}",
            measurement, setpoint, error, elapsed
        );

        let proportional = (self.gains.kp() * error + 0.5).clamp(0.0, 1.0);

        let mut anomaly = None;
        let derivative = if !error.is_finite() {
            warn!(
                "Non-finite error {} (measurement {}), holding integral and derivative",
                error, measurement
            );
            anomaly = Some(ControlError::NonFiniteError { error });
            0.0
        } else if elapsed > 0.0 && elapsed.is_finite() {
            let ki_max = self.gains.ki_max();
            self.state.cumulative_error =
                (self.state.cumulative_error + error * elapsed).clamp(-ki_max, ki_max);

            self.gains.kd() * (error - self.state.previous_error) / elapsed
        } else {
            if self.state.previous_sample_time.is_some() {
                warn!(
                    "Non-positive elapsed time {}s, skipping integral and derivative update",
                    elapsed
                );
            } else {
                debug!("First sample, no elapsed time yet");
            }
            anomaly = Some(ControlError::NonPositiveElapsedTime { elapsed });
            0.0
        };
        let integral = self.gains.ki() * self.state.cumulative_error;

        let output = proportional + integral + derivative;

        debug!(
            "Output: proportional={:.4} integral={:.4} derivative={:.4} output={:.4}",
            proportional, integral, derivative, output
        );

        // A bad sample must not poison the next derivative.
        if error.is_finite() {
            self.state.previous_error = error;
        }
        self.state.previous_sample_time = Some(now);

        self.sink.apply(measurement, output);

        ActuationResult {
            measurement,
            setpoint,
            error,
            elapsed,
            proportional,
            integral,
            derivative,
            output,
            anomaly,
        }
    }
}

impl<S, A> ControlLoop<S, A> {
    pub fn gains(&self) -> &Gains {
        &self.gains
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint.get()
    }

    pub fn set_setpoint(&self, setpoint: f64) {
        self.setpoint.set(setpoint);
    }

    /// Handle for retuning the setpoint while the loop runs elsewhere.
    pub fn setpoint_handle(&self) -> SetpointCell {
        self.setpoint.clone()
    }

    /// Clears accumulated and previous error and forgets the last sample time.
    pub fn reset(&mut self) {
        self.state = ControllerState::default();
    }

    /// Forgets the last sample time and keeps the accumulated error, so the
    /// first evaluation after a restart does not count the time spent stopped.
    pub fn begin_session(&mut self) {
        self.state.previous_sample_time = None;
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sink(&self) -> &A {
        &self.sink
    }
}

fn signed_elapsed_secs(previous: Instant, now: Instant) -> f64 {
    match now.checked_duration_since(previous) {
        Some(forward) => forward.as_secs_f64(),
        None => -previous.duration_since(now).as_secs_f64(),
    }
}
