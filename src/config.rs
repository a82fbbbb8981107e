// Controller configuration loaded from TOML, every field optional
use crate::error::{ConfigError, ControlError};
use crate::gain::TuningParameters;
use log::info;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    pub proportional_band: f64,
    pub setpoint: f64,
    pub integral_time: f64,
    pub derivative_time: f64,
    pub sample_period_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            proportional_band: 100.0,
            setpoint: 225.0,
            integral_time: 180.0,
            derivative_time: 45.0,
            sample_period_ms: 5_000,
        }
    }
}

impl ControllerConfig {
    pub fn tuning(&self) -> Result<TuningParameters, ControlError> {
        let tuning = TuningParameters::new(
            self.proportional_band,
            self.integral_time,
            self.derivative_time,
        );
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }

    /// Sets the sample period from seconds. The period is stored in whole
    /// milliseconds, so anything finer, zero, or negative is refused.
    pub fn set_sample_time(&mut self, seconds: f64) -> Result<(), ControlError> {
        let millis = seconds * 1_000.0;
        let whole = millis.round();
        if !millis.is_finite() || whole < 1.0 || whole >= u64::MAX as f64 {
            return Err(ControlError::InvalidPeriod);
        }
        // tolerance for decimal inputs like 0.3 that are not exact in binary
        if (millis - whole).abs() > 1e-6 {
            return Err(ControlError::InvalidPeriod);
        }
        self.sample_period_ms = whole as u64;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tuning()?;
        if self.sample_period_ms == 0 {
            return Err(ControlError::InvalidPeriod.into());
        }
        Ok(())
    }
}

/// A missing file yields the defaults; an unreadable or malformed one is an error.
pub fn load_config(path: impl AsRef<Path>) -> Result<ControllerConfig, ConfigError> {
    let path = path.as_ref();
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No config at {}, using defaults", path.display());
            return Ok(ControllerConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    parse_config(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_config(text: &str) -> Result<ControllerConfig, toml::de::Error> {
    toml::from_str(text)
}
