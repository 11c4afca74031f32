//! Timer lifecycle actions and status snapshots

use std::{fmt, time::Duration};

/// A lifecycle transition published by a [`Timer`](super::Timer).
///
/// A single completion tick may publish more than one action (for example
/// `Completed` followed by `Idle`), so subscribers should consume the
/// broadcast feed when they need every transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimerAction {
    /// No run is active
    #[default]
    Idle,
    /// A run has begun (start, restart, resume or a repeat cycle)
    Start,
    /// The run was paused after the given elapsed time
    Pause(Duration),
    /// A run reached its configured duration
    Completed,
    /// The timer was stopped for good
    Stop,
}

impl TimerAction {
    /// Lowercase name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerAction::Idle => "idle",
            TimerAction::Start => "start",
            TimerAction::Pause(_) => "pause",
            TimerAction::Completed => "completed",
            TimerAction::Stop => "stop",
        }
    }

    /// Elapsed time carried by a pause action
    pub fn paused_elapsed(&self) -> Option<Duration> {
        match self {
            TimerAction::Pause(elapsed) => Some(*elapsed),
            _ => None,
        }
    }

    /// Check if no further actions can follow this one
    pub fn is_terminal(&self) -> bool {
        matches!(self, TimerAction::Stop)
    }
}

impl fmt::Display for TimerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerAction::Pause(elapsed) => write!(f, "pause({:.3}s)", elapsed.as_secs_f64()),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Point-in-time view of a timer, taken under a single lock
#[derive(Debug, Clone, PartialEq)]
pub struct TimerStatus {
    pub action: TimerAction,
    pub duration: Duration,
    pub repeats: bool,
    pub is_running: bool,
    pub is_paused: bool,
    /// Elapsed time of the active run, rounded to milliseconds
    pub time_remaining: Option<Duration>,
}

impl TimerStatus {
    /// Check if the timer reached its terminal state
    pub fn is_stopped(&self) -> bool {
        self.action.is_terminal()
    }
}

/// Round a duration to whole milliseconds, half away from zero.
pub(crate) fn round_to_millis(elapsed: Duration) -> Duration {
    let micros = elapsed.as_micros();
    let millis = (micros + 500) / 1000;
    Duration::from_millis(millis as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_match_notification_vocabulary() {
        assert_eq!(TimerAction::Idle.as_str(), "idle");
        assert_eq!(TimerAction::Start.as_str(), "start");
        assert_eq!(TimerAction::Pause(Duration::from_secs(1)).as_str(), "pause");
        assert_eq!(TimerAction::Completed.as_str(), "completed");
        assert_eq!(TimerAction::Stop.as_str(), "stop");
    }

    #[test]
    fn display_includes_paused_elapsed() {
        let action = TimerAction::Pause(Duration::from_millis(1250));
        assert_eq!(action.to_string(), "pause(1.250s)");
        assert_eq!(TimerAction::Completed.to_string(), "completed");
    }

    #[test]
    fn only_stop_is_terminal() {
        assert!(TimerAction::Stop.is_terminal());
        assert!(!TimerAction::Idle.is_terminal());
        assert!(!TimerAction::Completed.is_terminal());
    }

    #[test]
    fn rounds_to_nearest_millisecond() {
        assert_eq!(round_to_millis(Duration::from_micros(1_499)), Duration::from_millis(1));
        assert_eq!(round_to_millis(Duration::from_micros(1_500)), Duration::from_millis(2));
        assert_eq!(round_to_millis(Duration::from_nanos(999_999_600)), Duration::from_secs(1));
    }
}
