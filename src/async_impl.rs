//! Async implementation - control loop as a tokio task

pub mod control_task;

pub use control_task::{spawn_control_task, ControlTaskHandle};
