//! Main application state management

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
    time::Instant,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::CompletionCounter;
use crate::{
    config::Config,
    error::TimerError,
    timer::{Timer, TimerStatus},
};

/// Control operations accepted by the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Start,
    Pause,
    Resume,
    Stop,
}

impl TimerCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerCommand::Start => "start",
            TimerCommand::Pause => "pause",
            TimerCommand::Resume => "resume",
            TimerCommand::Stop => "stop",
        }
    }
}

impl fmt::Display for TimerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of applying a [`TimerCommand`]
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    /// Whether the command changed the timer
    pub applied: bool,
    /// Timer status right after the command
    pub status: TimerStatus,
}

/// Main application state that owns the timer and server metadata
#[derive(Debug)]
pub struct AppState {
    /// The single timer controlled by this daemon
    pub timer: Timer,
    /// Delegate counting completion ticks
    pub completions: Arc<CompletionCounter>,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
    /// Serializes control commands so applicability is judged atomically
    command_lock: Mutex<()>,
}

impl AppState {
    /// Wrap an existing timer, registering the completion counter as its delegate
    pub fn new(port: u16, host: String, timer: Timer) -> Self {
        let completions = Arc::new(CompletionCounter::new());
        timer.set_delegate(&completions);

        Self {
            timer,
            completions,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
            command_lock: Mutex::new(()),
        }
    }

    /// Build the daemon timer from configuration.
    ///
    /// The timer is never auto-started here so that background tasks can
    /// subscribe before the first action is published.
    pub fn from_config(config: &Config) -> Result<Self, TimerError> {
        let timer = Timer::builder(config.duration)
            .repeats(config.repeats)
            .autostart(false)
            .channel_capacity(config.channel_capacity)
            .build()?;

        Ok(Self::new(config.port, config.host.clone(), timer))
    }

    /// Apply a control operation and report whether it took effect.
    ///
    /// Commands are serialized, and the last action is only recorded for
    /// commands that changed the timer.
    pub fn apply(&self, command: TimerCommand) -> CommandOutcome {
        let _guard = self
            .command_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let before = self.timer.status();
        match command {
            TimerCommand::Start => self.timer.start(),
            TimerCommand::Pause => self.timer.pause(),
            TimerCommand::Resume => self.timer.resume(),
            TimerCommand::Stop => self.timer.stop(),
        }
        let status = self.timer.status();

        // A completion tick may land between the two reads, so pause and
        // resume are judged by the state they leave behind
        let applied = match command {
            TimerCommand::Start | TimerCommand::Stop => !before.is_stopped(),
            TimerCommand::Pause => before.is_running && status.is_paused,
            TimerCommand::Resume => before.is_paused && status.is_running,
        };

        if applied {
            info!("Applied timer command: {}", command);
            if let Ok(mut last_action) = self.last_action.lock() {
                *last_action = Some(command.as_str().to_string());
            }
            if let Ok(mut last_time) = self.last_action_time.lock() {
                *last_time = Some(Utc::now());
            }
        } else {
            debug!("Timer command {} ignored while {}", command, before.action.as_str());
        }

        CommandOutcome { applied, status }
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
