use crate::actuator::ActuationSink;
use crate::control::ControlLoop;
use crate::error::ControlError;
use crate::ipc::SetpointCell;
use crate::metrics::LoopMetrics;
use crate::sensor::MeasurementSource;
use crossbeam::channel::{bounded, select, tick, Receiver, Sender};
use log::{error, info};
use std::mem;
use std::thread;
use std::time::{Duration, Instant};

enum RunState<S, A> {
    Stopped(ControlLoop<S, A>),
    Running {
        stop_tx: Sender<()>,
        handle: thread::JoinHandle<ControlLoop<S, A>>,
    },
    // worker panicked or never spawned, and took the loop with it
    Lost,
}

/// Runs a [`ControlLoop`] on its own thread, one evaluation per tick.
///
/// While running, the worker thread owns the loop outright, so evaluations
/// can never overlap. `stop` hands it back.
pub struct LoopRunner<S, A> {
    state: RunState<S, A>,
    setpoint: SetpointCell,
    metrics: LoopMetrics,
}

impl<S, A> LoopRunner<S, A>
where
    S: MeasurementSource + Send + 'static,
    A: ActuationSink + Send + 'static,
{
    pub fn new(control: ControlLoop<S, A>) -> Self {
        Self::with_metrics(control, LoopMetrics::new())
    }

    pub fn with_metrics(control: ControlLoop<S, A>, metrics: LoopMetrics) -> Self {
        Self {
            setpoint: control.setpoint_handle(),
            state: RunState::Stopped(control),
            metrics,
        }
    }

    pub fn start(&mut self, period: Duration) -> Result<(), ControlError> {
        if period.is_zero() {
            return Err(ControlError::InvalidPeriod);
        }

        let mut control = match mem::replace(&mut self.state, RunState::Lost) {
            RunState::Stopped(control) => control,
            running @ RunState::Running { .. } => {
                self.state = running;
                return Err(ControlError::AlreadyRunning);
            }
            RunState::Lost => return Err(ControlError::WorkerPanicked),
        };

        control.begin_session();

        let gains = *control.gains();
        info!(
            "Starting control loop: Kp={} Ki={} Kd={} KiMax={} period={:?}",
            gains.kp(),
            gains.ki(),
            gains.kd(),
            gains.ki_max(),
            period
        );

        // One slot, so signalling stop never blocks.
        let (stop_tx, stop_rx) = bounded(1);
        let metrics = self.metrics.clone();

        let spawned = thread::Builder::new()
            .name("control-loop".to_string())
            .spawn(move || run_ticks(control, period, stop_rx, metrics));

        match spawned {
            Ok(handle) => {
                self.state = RunState::Running { stop_tx, handle };
                Ok(())
            }
            Err(e) => {
                // The closure, and the loop inside it, is gone at this point.
                error!("Failed to spawn control loop thread: {}", e);
                Err(ControlError::Spawn(e.to_string()))
            }
        }
    }

    /// Signals the worker and waits for the in-flight iteration, if any.
    pub fn stop(&mut self) -> Result<(), ControlError> {
        match mem::replace(&mut self.state, RunState::Lost) {
            RunState::Running { stop_tx, handle } => {
                // Full or disconnected both mean the worker is already on its way out.
                let _ = stop_tx.try_send(());
                match handle.join() {
                    Ok(control) => {
                        info!("Stopped control loop");
                        self.state = RunState::Stopped(control);
                        Ok(())
                    }
                    Err(_) => {
                        error!("Control loop worker panicked");
                        Err(ControlError::WorkerPanicked)
                    }
                }
            }
            stopped @ RunState::Stopped(_) => {
                self.state = stopped;
                Err(ControlError::AlreadyStopped)
            }
            RunState::Lost => Err(ControlError::WorkerPanicked),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, RunState::Running { .. })
    }

    pub fn setpoint(&self) -> SetpointCell {
        self.setpoint.clone()
    }

    pub fn metrics(&self) -> &LoopMetrics {
        &self.metrics
    }

    /// The loop, readable only while stopped.
    pub fn control_loop(&self) -> Option<&ControlLoop<S, A>> {
        match &self.state {
            RunState::Stopped(control) => Some(control),
            _ => None,
        }
    }

    pub fn into_inner(mut self) -> Result<ControlLoop<S, A>, ControlError> {
        if self.is_running() {
            self.stop()?;
        }
        match mem::replace(&mut self.state, RunState::Lost) {
            RunState::Stopped(control) => Ok(control),
            _ => Err(ControlError::WorkerPanicked),
        }
    }
}

impl<S, A> Drop for LoopRunner<S, A> {
    fn drop(&mut self) {
        if let RunState::Running { stop_tx, handle } = mem::replace(&mut self.state, RunState::Lost)
        {
            let _ = stop_tx.try_send(());
            if handle.join().is_err() {
                error!("Control loop worker panicked during shutdown");
            }
        }
    }
}

fn run_ticks<S, A>(
    mut control: ControlLoop<S, A>,
    period: Duration,
    stop_rx: Receiver<()>,
    metrics: LoopMetrics,
) -> ControlLoop<S, A>
where
    S: MeasurementSource,
    A: ActuationSink,
{
    let ticker = tick(period);

    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(ticker) -> _ => {
                // Both may be ready at once; a pending stop wins.
                if !stop_rx.is_empty() {
                    break;
                }

                let now = Instant::now();
                let result = control.evaluate_once(now);
                metrics.record_iteration(&result, now.elapsed());
                metrics.record_jitter(result.elapsed, period);
            }
        }
    }

    info!("Control loop worker exiting");
    control
}
