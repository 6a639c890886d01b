//! Runtime diagnostics configuration.
//!
//! Two environment variables control the structured log sink:
//! - `RTSTREAM_LOG`: `off` (default), `stderr`, or a file path. Entries are
//!   appended to the file as JSONL.
//! - `RTSTREAM_LOG_LEVEL`: minimum level emitted (`trace`, `debug`, `info`,
//!   `warn`, `error`, `fatal`). Defaults to `warn`.
//!
//! Both are read once on first use and cached for the life of the process.
//! Neither changes the result of any stream operation.

use std::path::PathBuf;
use std::sync::OnceLock;

use crate::error::ConfigError;
use crate::log::LogLevel;

/// Environment variable selecting the log sink.
pub const LOG_ENV: &str = "RTSTREAM_LOG";
/// Environment variable selecting the minimum log level.
pub const LOG_LEVEL_ENV: &str = "RTSTREAM_LOG_LEVEL";

/// Where structured log lines go.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogTarget {
    #[default]
    Off,
    Stderr,
    File(PathBuf),
}

impl LogTarget {
    /// Parse an `RTSTREAM_LOG` value. Empty strings and `off`/`none`/`0`
    /// disable logging; anything other than `stderr` is taken as a path.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "off" | "none" | "0" => Self::Off,
            "stderr" | "2" => Self::Stderr,
            _ => Self::File(PathBuf::from(trimmed)),
        }
    }
}

/// Resolved log configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub target: LogTarget,
    pub min_level: LogLevel,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            target: LogTarget::Off,
            min_level: LogLevel::Warn,
        }
    }
}

impl LogConfig {
    /// Build a config from raw variable values. An unparseable level falls
    /// back to the default rather than failing.
    #[must_use]
    pub fn from_values(target: Option<&str>, level: Option<&str>) -> Self {
        let defaults = Self::default();
        Self {
            target: target.map_or(defaults.target, LogTarget::from_str_loose),
            min_level: level
                .and_then(|l| parse_level(l).ok())
                .unwrap_or(defaults.min_level),
        }
    }

    /// Read the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        let target = std::env::var(LOG_ENV).ok();
        let level = std::env::var(LOG_LEVEL_ENV).ok();
        Self::from_values(target.as_deref(), level.as_deref())
    }

    /// True if an entry at `level` should be written.
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.target != LogTarget::Off && level >= self.min_level
    }
}

/// Parse a log level name (case-insensitive).
pub fn parse_level(s: &str) -> Result<LogLevel, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(LogLevel::Trace),
        "debug" => Ok(LogLevel::Debug),
        "info" => Ok(LogLevel::Info),
        "warn" | "warning" => Ok(LogLevel::Warn),
        "error" => Ok(LogLevel::Error),
        "fatal" => Ok(LogLevel::Fatal),
        _ => Err(ConfigError::UnknownLevel(s.to_string())),
    }
}

/// Process-wide log configuration (reads the environment on first call).
#[must_use]
pub fn log_config() -> &'static LogConfig {
    static CONFIG: OnceLock<LogConfig> = OnceLock::new();
    CONFIG.get_or_init(LogConfig::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_parsing() {
        assert_eq!(LogTarget::from_str_loose(""), LogTarget::Off);
        assert_eq!(LogTarget::from_str_loose("OFF"), LogTarget::Off);
        assert_eq!(LogTarget::from_str_loose("stderr"), LogTarget::Stderr);
        assert_eq!(
            LogTarget::from_str_loose("/tmp/rt.jsonl"),
            LogTarget::File(PathBuf::from("/tmp/rt.jsonl"))
        );
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!(parse_level("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(parse_level(" warning ").unwrap(), LogLevel::Warn);
        assert!(matches!(
            parse_level("chatty"),
            Err(ConfigError::UnknownLevel(_))
        ));
    }

    #[test]
    fn test_defaults_when_unset() {
        let cfg = LogConfig::from_values(None, None);
        assert_eq!(cfg, LogConfig::default());
        assert!(!cfg.enabled(LogLevel::Fatal));
    }

    #[test]
    fn test_unknown_level_falls_back() {
        let cfg = LogConfig::from_values(Some("stderr"), Some("verbose"));
        assert_eq!(cfg.min_level, LogLevel::Warn);
        assert!(cfg.enabled(LogLevel::Error));
        assert!(!cfg.enabled(LogLevel::Debug));
    }

    #[test]
    fn test_threshold() {
        let cfg = LogConfig::from_values(Some("stderr"), Some("debug"));
        assert!(cfg.enabled(LogLevel::Debug));
        assert!(!cfg.enabled(LogLevel::Trace));
    }
}
