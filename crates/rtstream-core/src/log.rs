//! Structured JSONL diagnostics.
//!
//! Every entry is one JSON object per line with required `timestamp`,
//! `level` and `event` fields plus optional stream context. The sink is
//! process-wide and configured from the environment (see [`crate::config`]);
//! [`install`] replaces it programmatically.
//!
//! Logging is best-effort: a failing sink never changes an operation's result.

use std::fs::OpenOptions;
use std::io::Write;
use std::sync::OnceLock;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::{self, LogTarget};
use crate::error::ConfigError;
use crate::stream::StreamKind;

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

/// Severity level for log entries, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// Canonical structured log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub event: String,

    /// Stream operation that produced the entry (`get_char`, `read_block`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<StreamKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<i32>,
    /// Raw OS error code of the failed host call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errno: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl LogEntry {
    /// Create a new log entry with required fields only.
    #[must_use]
    pub fn new(level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            level,
            event: event.into(),
            op: None,
            kind: None,
            line_number: None,
            errno: None,
            detail: None,
        }
    }

    #[must_use]
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: StreamKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn with_line_number(mut self, line_number: i32) -> Self {
        self.line_number = Some(line_number);
        self
    }

    /// Attach an errno. `None` leaves the field absent.
    #[must_use]
    pub fn with_errno(mut self, errno: Option<i32>) -> Self {
        self.errno = errno;
        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Sink
// ---------------------------------------------------------------------------

struct Sink {
    writer: Option<Box<dyn Write + Send>>,
    min_level: LogLevel,
}

impl Sink {
    fn from_config() -> Self {
        let cfg = config::log_config();
        let writer = match open_target(&cfg.target) {
            Ok(w) => w,
            Err(err) => {
                let _ = writeln!(std::io::stderr(), "rtstream: {err}; logging disabled");
                None
            }
        };
        Self {
            writer,
            min_level: cfg.min_level,
        }
    }
}

fn open_target(target: &LogTarget) -> Result<Option<Box<dyn Write + Send>>, ConfigError> {
    match target {
        LogTarget::Off => Ok(None),
        LogTarget::Stderr => Ok(Some(Box::new(std::io::stderr()))),
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| ConfigError::LogFile {
                    path: path.display().to_string(),
                    source,
                })?;
            Ok(Some(Box::new(file)))
        }
    }
}

fn sink() -> &'static Mutex<Sink> {
    static SINK: OnceLock<Mutex<Sink>> = OnceLock::new();
    SINK.get_or_init(|| Mutex::new(Sink::from_config()))
}

/// Replace the process-wide sink.
pub fn install(writer: Box<dyn Write + Send>, min_level: LogLevel) {
    let mut s = sink().lock();
    s.writer = Some(writer);
    s.min_level = min_level;
}

/// Disable logging until the next [`install`].
pub fn disable() {
    sink().lock().writer = None;
}

/// True if an entry at `level` would currently be written.
#[must_use]
pub fn enabled(level: LogLevel) -> bool {
    let s = sink().lock();
    s.writer.is_some() && level >= s.min_level
}

/// Write `entry` to the sink if its level passes the threshold.
pub fn emit(entry: LogEntry) {
    let mut s = sink().lock();
    if entry.level < s.min_level {
        return;
    }
    let Some(writer) = s.writer.as_mut() else {
        return;
    };
    if let Ok(line) = entry.to_jsonl() {
        let _ = writeln!(writer, "{line}");
        let _ = writer.flush();
    }
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Current wall-clock time as an RFC 3339 UTC timestamp.
pub fn now_utc() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format_utc(duration.as_secs(), duration.subsec_millis())
}

/// Format seconds since the epoch as RFC 3339 UTC with millisecond precision.
fn format_utc(secs: u64, millis: u32) -> String {
    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{millis:03}Z",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60,
    )
}

// Howard Hinnant's days-to-civil algorithm.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entry_serializes_required_fields() {
        let entry = LogEntry::new(LogLevel::Info, "stream_init");
        let json = entry.to_jsonl().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["timestamp"].is_string());
        assert_eq!(parsed["level"], "info");
        assert_eq!(parsed["event"], "stream_init");
        // Optional fields should be absent
        assert!(parsed.get("op").is_none());
        assert!(parsed.get("kind").is_none());
        assert!(parsed.get("errno").is_none());
    }

    #[test]
    fn log_entry_with_stream_context() {
        let entry = LogEntry::new(LogLevel::Debug, "host_error")
            .with_op("read_block")
            .with_kind(StreamKind::NativeFile)
            .with_line_number(42)
            .with_errno(Some(9))
            .with_detail("bad file descriptor");
        let parsed: serde_json::Value = serde_json::from_str(&entry.to_jsonl().unwrap()).unwrap();
        assert_eq!(parsed["op"], "read_block");
        assert_eq!(parsed["kind"], "native_file");
        assert_eq!(parsed["line_number"], 42);
        assert_eq!(parsed["errno"], 9);
        assert_eq!(parsed["detail"], "bad file descriptor");
    }

    #[test]
    fn log_entry_round_trips_through_serde() {
        let entry = LogEntry::new(LogLevel::Fatal, "stream_fault").with_op("unget_char");
        let back: LogEntry = serde_json::from_str(&entry.to_jsonl().unwrap()).unwrap();
        assert_eq!(back.level, LogLevel::Fatal);
        assert_eq!(back.op.as_deref(), Some("unget_char"));
    }

    #[test]
    fn levels_are_ordered() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Fatal);
    }

    #[test]
    fn format_utc_known_instants() {
        assert_eq!(format_utc(0, 0), "1970-01-01T00:00:00.000Z");
        // 2000-02-29T12:34:56Z, a leap day.
        assert_eq!(format_utc(951_827_696, 7), "2000-02-29T12:34:56.007Z");
    }
}
