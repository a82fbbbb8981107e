pub mod error;
pub mod gain;
pub mod sensor;
pub mod actuator;
pub mod ipc;
pub mod control;
pub mod metrics;
pub mod threaded_impl;
pub mod async_impl;
pub mod config;
pub mod simulation;
pub mod visualization;

pub use actuator::{ActuationSink, SignalLatch, Smoker};
pub use async_impl::{spawn_control_task, ControlTaskHandle};
pub use config::{load_config, ControllerConfig};
pub use control::{ActuationResult, ControlLoop, ControllerState};
pub use error::{ConfigError, ControlError};
pub use gain::{derive_gains, Gains, TuningParameters};
pub use ipc::{SetpointCell, Shared};
pub use metrics::{LoopMetrics, MetricsReport};
pub use sensor::{MeasurementSource, Thermometer};
pub use simulation::{run_simulation, run_sweep, ProcessSimulator, SimulationOptions, SimulationSeries};
pub use threaded_impl::LoopRunner;
