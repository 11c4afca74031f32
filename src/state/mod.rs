//! State management module
//! 
//! This module contains the daemon's shared state and the timer delegate that
//! feeds it.

pub mod app_state;
pub mod completion_counter;

// Re-export main types
pub use app_state::{AppState, CommandOutcome, TimerCommand};
pub use completion_counter::CompletionCounter;
