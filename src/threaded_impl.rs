//! Threaded implementation - control loop on a dedicated OS thread

pub mod control_thread;

pub use control_thread::LoopRunner;
