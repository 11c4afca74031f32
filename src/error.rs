//! Error types for timer construction

use std::time::Duration;
use thiserror::Error;

/// Errors raised while building a [`Timer`](crate::Timer).
///
/// Control operations never fail; calls made in an inapplicable state are
/// ignored instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimerError {
    /// A zero-length run was requested
    #[error("timer duration must be greater than zero")]
    ZeroDuration,

    /// A floating-point duration that is not a positive, finite number of seconds
    #[error("timer duration must be a positive number of seconds, got {0}")]
    InvalidSeconds(f64),

    /// The default scheduler was requested outside of a tokio runtime
    #[error("no tokio runtime available to drive the timer")]
    NoRuntime,
}

/// Convert a floating-point number of seconds into a validated [`Duration`].
pub fn duration_from_secs(secs: f64) -> Result<Duration, TimerError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(TimerError::InvalidSeconds(secs));
    }

    let duration =
        Duration::try_from_secs_f64(secs).map_err(|_| TimerError::InvalidSeconds(secs))?;
    if duration.is_zero() {
        return Err(TimerError::InvalidSeconds(secs));
    }

    Ok(duration)
}
