//! Simulation module - crude smoker thermal response on a virtual clock
//!
//! The process model is deliberately simple: drive above 50% heats the pit by
//! the excess, drive below 50% cools it by the drive itself, and exactly 50%
//! lets the temperature wander by up to half a degree.

use crate::actuator::SignalLatch;
use crate::control::ControlLoop;
use crate::error::ControlError;
use crate::gain::TuningParameters;
use crate::ipc::Shared;
use crate::sensor::Thermometer;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

// ============================================================================
// PROCESS SIMULATOR
// ============================================================================

pub struct ProcessSimulator {
    rng: StdRng,
}

impl ProcessSimulator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Next temperature given the current one and the applied drive.
    pub fn advance(&mut self, temperature: f64, drive: f64) -> f64 {
        if drive > 0.5 {
            temperature + (drive - 0.5)
        } else if drive < 0.5 {
            temperature - drive
        } else {
            temperature + self.rng.gen_range(-0.5..0.5)
        }
    }
}

// ============================================================================
// SIMULATION RUNS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOptions {
    pub setpoint: f64,
    pub initial_temperature: f64,
    pub iterations: u32,
    /// Virtual time between controller evaluations.
    pub step: Duration,
    /// Process updates per controller evaluation.
    pub advances_per_step: u32,
    pub seed: u64,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            setpoint: 225.0,
            initial_temperature: 0.0,
            iterations: 1000,
            step: Duration::from_secs(5),
            advances_per_step: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSeries {
    pub name: String,
    pub tuning: TuningParameters,
    /// (virtual seconds, temperature after the step)
    pub points: Vec<(f64, f64)>,
}

impl SimulationSeries {
    pub fn final_temperature(&self) -> Option<f64> {
        self.points.last().map(|&(_, temperature)| temperature)
    }

    /// Highest temperature above `setpoint`, zero if it was never exceeded.
    pub fn max_overshoot(&self, setpoint: f64) -> f64 {
        self.points
            .iter()
            .map(|&(_, temperature)| temperature - setpoint)
            .fold(0.0, f64::max)
    }
}

pub fn run_simulation(
    tuning: &TuningParameters,
    options: &SimulationOptions,
) -> Result<SimulationSeries, ControlError> {
    let thermometer = Shared::new(Thermometer::new(options.initial_temperature));
    let latch = Shared::new(SignalLatch::default());
    let mut control = ControlLoop::with_tuning(
        thermometer.clone(),
        latch.clone(),
        tuning,
        options.setpoint,
    )?;
    let mut simulator = ProcessSimulator::new(options.seed);

    let name = format!(
        "pb={:.2}, ti={:.2}, td={:.2}",
        tuning.proportional_band, tuning.integral_time, tuning.derivative_time
    );
    debug!("Running simulation {}", name);

    let start = Instant::now();
    let mut points = Vec::with_capacity(options.iterations as usize);

    for i in 0..options.iterations {
        control.evaluate_once(start + options.step * i);

        let drive = latch.lock().signal;
        thermometer.update(|probe| {
            for _ in 0..options.advances_per_step {
                probe.value = simulator.advance(probe.value, drive);
            }
        });

        let seconds = options.step.as_secs_f64() * f64::from(i);
        points.push((seconds, thermometer.lock().value));
    }

    Ok(SimulationSeries {
        name,
        tuning: *tuning,
        points,
    })
}

/// Runs every integral/derivative time combination for one proportional band.
pub fn run_sweep(
    proportional_band: f64,
    integral_times: &[f64],
    derivative_times: &[f64],
    options: &SimulationOptions,
) -> Result<Vec<SimulationSeries>, ControlError> {
    let mut series = Vec::with_capacity(integral_times.len() * derivative_times.len());
    for &integral_time in integral_times {
        for &derivative_time in derivative_times {
            let tuning = TuningParameters::new(proportional_band, integral_time, derivative_time);
            series.push(run_simulation(&tuning, options)?);
        }
    }
    Ok(series)
}
