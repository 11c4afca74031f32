//! Thrimer - A pausable, observable interval timer
//!
//! This library provides a timer state machine that publishes its lifecycle
//! (idle, start, pause, completed, stop) to any number of subscribers, plus
//! the pieces of the `thrimer` control daemon that exposes one timer over HTTP.

pub mod config;
pub mod error;
pub mod timer;
pub mod state;
pub mod api;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{duration_from_secs, TimerError};
pub use timer::{Timer, TimerAction, TimerBuilder, TimerDelegate, TimerStatus};
pub use state::AppState;
pub use api::create_router;
pub use utils::signals::shutdown_signal;
