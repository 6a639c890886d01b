//! Error types and the fatal-error channel.
//!
//! Stream operations report recoverable outcomes in-band (see
//! [`crate::stream::EOF`]). The types here cover the surfaces that are not
//! sentinel-based: a broken push-back invariant, which terminates the process
//! through [`fatal`], and configuration problems.

use std::io::Write;

use thiserror::Error;

use crate::log::{self, LogEntry, LogLevel};
use crate::stream::StreamKind;

/// A backend invariant violation. Never returned to callers; it is carried
/// into [`fatal`] so the diagnostic names what broke.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamFault {
    #[error("putback_char: ungetc failed (push-back slot already holds {pending:#04x})")]
    PushbackFull { pending: u8 },
    #[error("putback_char: ungetc failed (character code {ch} is not a byte)")]
    PushbackNotAByte { ch: i32 },
    #[error("putback_char: ungetc failed (stream is closed)")]
    PushbackClosed,
    #[error("putback_char: ungetc failed (host rejected character code {ch})")]
    PushbackRejected { ch: i32 },
}

/// Errors raised while resolving runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown log level {0:?}")]
    UnknownLevel(String),
    #[error("cannot open log file {path}: {source}")]
    LogFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Report a fatal I/O error and abort the process.
///
/// The diagnostic goes to the structured log (level `fatal`) and directly to
/// the process's stderr, bypassing any output capture.
pub fn fatal(kind: StreamKind, fault: &StreamFault) -> ! {
    log::emit(
        LogEntry::new(LogLevel::Fatal, "stream_fault")
            .with_op("unget_char")
            .with_kind(kind)
            .with_detail(fault.to_string()),
    );
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "rtstream: fatal I/O error: {fault}");
    let _ = stderr.flush();
    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_messages_name_putback() {
        let full = StreamFault::PushbackFull { pending: b'x' };
        assert!(full.to_string().contains("putback_char"));
        assert!(full.to_string().contains("0x78"));

        let not_byte = StreamFault::PushbackNotAByte { ch: -1 };
        assert!(not_byte.to_string().contains("-1"));

        assert!(StreamFault::PushbackClosed.to_string().contains("closed"));

        let rejected = StreamFault::PushbackRejected { ch: 65 };
        assert!(rejected.to_string().contains("65"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnknownLevel("loud".to_string());
        assert_eq!(err.to_string(), "unknown log level \"loud\"");
    }
}
