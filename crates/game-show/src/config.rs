//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Process configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `FRAME_DIR`: directory whose files are fed as frames in name order;
///   synthetic frames are generated when unset
/// - `FRAME_INTERVAL_MS`: delay between frames (default: `500`)
/// - `FRAME_LIMIT`: stop after this many frames (default: run until signalled)
/// - `FRAME_SIZE`: bytes per synthetic frame (default: `1024`)
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub frame_dir: Option<PathBuf>,
    pub frame_interval: Duration,
    pub frame_limit: Option<u64>,
    pub frame_size: usize,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .and_then(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),
            frame_dir: lookup("FRAME_DIR")
                .filter(|d| !d.trim().is_empty())
                .map(PathBuf::from),
            frame_interval: lookup("FRAME_INTERVAL_MS")
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.frame_interval),
            frame_limit: lookup("FRAME_LIMIT").and_then(|n| n.parse().ok()),
            frame_size: lookup("FRAME_SIZE")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.frame_size),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            frame_dir: None,
            frame_interval: Duration::from_millis(500),
            frame_limit: None,
            frame_size: 1024,
        }
    }
}
