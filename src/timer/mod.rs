//! Timer module
//!
//! This module contains the timer state machine, the actions it publishes and
//! the schedulers that drive its ticks.

pub mod action;
pub mod engine;
pub mod scheduler;

// Re-export main types
pub use action::{TimerAction, TimerStatus};
pub use engine::{Timer, TimerBuilder, TimerDelegate, DEFAULT_CHANNEL_CAPACITY, MIN_RESUME_PERIOD};
pub use scheduler::{ManualScheduler, Scheduler, TickFn, TickHandle, TokioScheduler};
