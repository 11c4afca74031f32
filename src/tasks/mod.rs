//! Background tasks module
//! 
//! This module contains background tasks that run alongside the HTTP server.

pub mod action_log;

// Re-export main functions
pub use action_log::action_log_task;
