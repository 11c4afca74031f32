//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerStatus;

/// Serializable view of a timer status, with durations in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerView {
    pub action: String,
    pub paused_elapsed_seconds: Option<f64>,
    pub duration_seconds: f64,
    pub repeats: bool,
    pub running: bool,
    pub paused: bool,
    pub stopped: bool,
    /// Elapsed time of the active run
    pub time_remaining_seconds: Option<f64>,
}

impl From<&TimerStatus> for TimerView {
    fn from(status: &TimerStatus) -> Self {
        Self {
            action: status.action.as_str().to_string(),
            paused_elapsed_seconds: status.action.paused_elapsed().map(|d| d.as_secs_f64()),
            duration_seconds: status.duration.as_secs_f64(),
            repeats: status.repeats,
            running: status.is_running,
            paused: status.is_paused,
            stopped: status.is_stopped(),
            time_remaining_seconds: status.time_remaining.map(|d| d.as_secs_f64()),
        }
    }
}

/// API response structure for control endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerView,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: String, message: String, timer: &TimerStatus) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            timer: TimerView::from(timer),
        }
    }

    /// Create a response for an operation that changed the timer
    pub fn applied(message: String, timer: &TimerStatus) -> Self {
        Self::new("applied".to_string(), message, timer)
    }

    /// Create a response for an operation that did not apply in the current state
    pub fn ignored(message: String, timer: &TimerStatus) -> Self {
        Self::new("ignored".to_string(), message, timer)
    }
}

/// Status response with timer and server information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub timer: TimerView,
    pub completions: u64,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
