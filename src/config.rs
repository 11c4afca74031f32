//! Configuration and CLI argument handling

use std::time::Duration;
use clap::Parser;

use crate::{error::duration_from_secs, timer::DEFAULT_CHANNEL_CAPACITY};

/// CLI argument parsing structure
#[derive(Debug, Parser)]
#[command(name = "thrimer")]
#[command(about = "A pausable interval timer controlled over HTTP")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Timer duration in seconds
    #[arg(short, long, default_value = "1500", value_parser = parse_duration)]
    pub duration: Duration,

    /// Restart the timer after every completion
    #[arg(short, long)]
    pub repeats: bool,

    /// Wait for POST /start instead of starting at launch
    #[arg(long)]
    pub no_autostart: bool,

    /// Buffer size of the action feed
    #[arg(long, default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    pub fn autostart(&self) -> bool {
        !self.no_autostart
    }
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|e| format!("'{}' is not a number of seconds: {}", value, e))?;
    duration_from_secs(secs).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["thrimer"]).unwrap();
        assert_eq!(config.port, 20554);
        assert_eq!(config.address(), "0.0.0.0:20554");
        assert_eq!(config.duration, Duration::from_secs(1500));
        assert!(!config.repeats);
        assert!(config.autostart());
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn fractional_duration_and_flags() {
        let config = Config::try_parse_from([
            "thrimer",
            "--duration",
            "0.5",
            "--repeats",
            "--no-autostart",
            "-v",
        ])
        .unwrap();
        assert_eq!(config.duration, Duration::from_millis(500));
        assert!(config.repeats);
        assert!(!config.autostart());
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn rejects_non_positive_duration() {
        assert!(Config::try_parse_from(["thrimer", "--duration", "0"]).is_err());
        assert!(Config::try_parse_from(["thrimer", "--duration", "-3"]).is_err());
        assert!(Config::try_parse_from(["thrimer", "--duration", "soon"]).is_err());
    }
}
