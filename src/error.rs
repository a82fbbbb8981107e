//! Error types for gain derivation, the control loop lifecycle and configuration.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    /// A tuning parameter would produce non-finite or meaningless gains.
    #[error("invalid tuning: {parameter} = {value} ({requirement})")]
    InvalidTuning {
        parameter: &'static str,
        value: f64,
        requirement: &'static str,
    },

    /// The time since the previous sample was zero, negative or not finite.
    /// The iteration still produces an output, without integral increment
    /// and with a zero derivative.
    #[error("non-positive elapsed time between samples: {elapsed}s")]
    NonPositiveElapsedTime { elapsed: f64 },

    /// The measurement or setpoint was NaN or infinite. The integral and
    /// previous error are held, and the derivative is zero.
    #[error("non-finite control error: {error}")]
    NonFiniteError { error: f64 },

    #[error("control loop is already running")]
    AlreadyRunning,

    #[error("control loop is already stopped")]
    AlreadyStopped,

    #[error("sample period must be a positive whole number of milliseconds")]
    InvalidPeriod,

    #[error("failed to spawn control loop worker: {0}")]
    Spawn(String),

    #[error("control loop worker panicked")]
    WorkerPanicked,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Tuning(#[from] ControlError),
}
