use crate::actuator::ActuationSink;
use crate::control::ControlLoop;
use crate::error::ControlError;
use crate::ipc::SetpointCell;
use crate::metrics::LoopMetrics;
use crate::sensor::MeasurementSource;
use log::{error, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

pub struct ControlTaskHandle<S, A> {
    stop_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<ControlLoop<S, A>>>,
    setpoint: SetpointCell,
}

/// Spawns the loop onto the current tokio runtime. The first evaluation
/// happens one `period` after spawning.
pub fn spawn_control_task<S, A>(
    mut control: ControlLoop<S, A>,
    period: Duration,
    metrics: LoopMetrics,
) -> Result<ControlTaskHandle<S, A>, ControlError>
where
    S: MeasurementSource + Send + 'static,
    A: ActuationSink + Send + 'static,
{
    if period.is_zero() {
        return Err(ControlError::InvalidPeriod);
    }

    control.begin_session();

    let (stop_tx, stop_rx) = watch::channel(false);
    let setpoint = control.setpoint_handle();
    let handle = tokio::spawn(control_task(control, period, stop_rx, metrics));

    Ok(ControlTaskHandle {
        stop_tx,
        handle: Some(handle),
        setpoint,
    })
}

impl<S, A> ControlTaskHandle<S, A> {
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn setpoint(&self) -> SetpointCell {
        self.setpoint.clone()
    }

    /// Signals the task and waits for it to hand the loop back.
    pub async fn stop(&mut self) -> Result<ControlLoop<S, A>, ControlError> {
        let handle = self.handle.take().ok_or(ControlError::AlreadyStopped)?;
        // Receiver only goes away with the task, which join covers.
        let _ = self.stop_tx.send(true);

        handle.await.map_err(|e| {
            error!("Control task failed: {}", e);
            ControlError::WorkerPanicked
        })
    }
}

async fn control_task<S, A>(
    mut control: ControlLoop<S, A>,
    period: Duration,
    mut stop_rx: watch::Receiver<bool>,
    metrics: LoopMetrics,
) -> ControlLoop<S, A>
where
    S: MeasurementSource,
    A: ActuationSink,
{
    info!("Starting control task: period={:?}", period);

    let mut interval_timer = interval_at(Instant::now() + period, period);
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = interval_timer.tick() => {
                let fired_at = Instant::now();
                let result = control.evaluate_once(fired_at.into_std());
                metrics.record_iteration(&result, fired_at.elapsed());
                metrics.record_jitter(result.elapsed, period);
            }
        }
    }

    info!("Control task exiting");
    control
}
