//! Native-file backend.
//!
//! Forwards each stream operation to a host byte stream (`H: Read + Write`)
//! and translates host outcomes into the sentinel convention of
//! [`StreamOps`]. Rust host streams have no push-back and no sticky
//! indicators, so the backend keeps the state a C `FILE` would:
//!
//! - a one-byte push-back slot (a second push-back while it is full fails);
//! - sticky end-of-stream and error indicators, cleared by [`NativeFile::clear_err`]
//!   (a successful push-back also clears end-of-stream);
//! - the OS error code of the last failed host call.
//!
//! Host calls that fail with `ErrorKind::Interrupted` are retried.
//!
//! Binding an owned host (`File`) hands the close to this backend; binding a
//! borrowed host (`&mut File`) makes `close` flush and detach, leaving the
//! resource to its owner.

use std::fmt;
use std::io::{self, ErrorKind, Read, Write};

use super::{EOF, StreamKind, StreamOps, count_to_i32, count_to_isize, pushback_byte};
use crate::error::{StreamFault, fatal};
use crate::log::{self, LogEntry, LogLevel};

/// Runtime indicator flags, mirroring `feof` / `ferror`.
#[derive(Debug, Clone, Copy, Default)]
struct StreamFlags {
    eof: bool,
    error: bool,
}

/// A stream backed by a host byte stream.
#[derive(Debug)]
pub struct NativeFile<H> {
    /// `None` once closed.
    host: Option<H>,
    pushback: Option<u8>,
    flags: StreamFlags,
    last_os_error: Option<i32>,
}

impl<H: Read + Write> NativeFile<H> {
    /// Bind an already-open host stream. Cannot fail.
    pub fn new(host: H) -> Self {
        Self {
            host: Some(host),
            pushback: None,
            flags: StreamFlags::default(),
            last_os_error: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// True once a read has hit end-of-stream (until [`clear_err`](Self::clear_err)
    /// or a push-back).
    pub fn is_eof(&self) -> bool {
        self.flags.eof
    }

    /// True once a host call has failed (until [`clear_err`](Self::clear_err)).
    pub fn is_error(&self) -> bool {
        self.flags.error
    }

    /// Clear the end-of-stream and error indicators.
    pub fn clear_err(&mut self) {
        self.flags.eof = false;
        self.flags.error = false;
    }

    /// OS error code of the most recent failed host call, if it had one.
    pub fn last_os_error(&self) -> Option<i32> {
        self.last_os_error
    }

    pub fn is_closed(&self) -> bool {
        self.host.is_none()
    }

    /// The host stream, or `None` after `close`.
    pub fn get_ref(&self) -> Option<&H> {
        self.host.as_ref()
    }

    /// Unbind and return the host stream. A pending push-back byte is lost.
    pub fn into_inner(self) -> Option<H> {
        self.host
    }

    // -----------------------------------------------------------------------
    // Host plumbing
    // -----------------------------------------------------------------------

    fn record_host_error(&mut self, op: &'static str, err: &io::Error) {
        self.flags.error = true;
        self.last_os_error = err.raw_os_error();
        if log::enabled(LogLevel::Debug) {
            log::emit(
                LogEntry::new(LogLevel::Debug, "host_error")
                    .with_op(op)
                    .with_kind(StreamKind::NativeFile)
                    .with_errno(self.last_os_error)
                    .with_detail(err.to_string()),
            );
        }
    }

    /// Write as much of `bytes` as the host accepts. Returns the count written;
    /// anything short of `bytes.len()` has been recorded as a host error.
    fn write_bytes(&mut self, op: &'static str, bytes: &[u8]) -> usize {
        let Some(host) = self.host.as_mut() else {
            return 0;
        };
        let mut written = 0;
        let mut failure = None;
        while written < bytes.len() {
            match retry(|| host.write(&bytes[written..])) {
                Ok(0) => {
                    failure = Some(io::Error::from(ErrorKind::WriteZero));
                    break;
                }
                Ok(n) => written += n,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        if let Some(e) = failure {
            self.record_host_error(op, &e);
        }
        written
    }
}

/// Run a host call, retrying while it reports `Interrupted`.
fn retry<T>(mut call: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    loop {
        match call() {
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

// ---------------------------------------------------------------------------
// Stream operations
// ---------------------------------------------------------------------------

impl<H: Read + Write> StreamOps for NativeFile<H> {
    fn kind(&self) -> StreamKind {
        StreamKind::NativeFile
    }

    fn get_char(&mut self) -> i32 {
        if let Some(b) = self.pushback.take() {
            return i32::from(b);
        }
        let Some(host) = self.host.as_mut() else {
            return EOF;
        };
        let mut byte = [0u8; 1];
        match retry(|| host.read(&mut byte)) {
            Ok(0) => {
                self.flags.eof = true;
                EOF
            }
            Ok(_) => i32::from(byte[0]),
            Err(e) => {
                self.record_host_error("get_char", &e);
                EOF
            }
        }
    }

    fn unget_char(&mut self, ch: i32) -> i32 {
        let Some(byte) = pushback_byte(ch) else {
            fatal(self.kind(), &StreamFault::PushbackNotAByte { ch });
        };
        if self.host.is_none() {
            fatal(self.kind(), &StreamFault::PushbackClosed);
        }
        if let Some(pending) = self.pushback {
            fatal(self.kind(), &StreamFault::PushbackFull { pending });
        }
        self.pushback = Some(byte);
        self.flags.eof = false;
        ch
    }

    fn put_char(&mut self, ch: i32) -> i32 {
        // putc semantics: only the low byte is written.
        let byte = ch as u8;
        if self.write_bytes("put_char", &[byte]) == 1 {
            i32::from(byte)
        } else {
            EOF
        }
    }

    fn close(&mut self) -> i32 {
        let Some(mut host) = self.host.take() else {
            log::emit(
                LogEntry::new(LogLevel::Warn, "close_after_close")
                    .with_op("close")
                    .with_kind(StreamKind::NativeFile),
            );
            return EOF;
        };
        self.pushback = None;
        let rc = match retry(|| host.flush()) {
            Ok(()) => 0,
            Err(e) => {
                self.record_host_error("close", &e);
                EOF
            }
        };
        drop(host);
        rc
    }

    fn flush(&mut self) -> i32 {
        let Some(host) = self.host.as_mut() else {
            return EOF;
        };
        match retry(|| host.flush()) {
            Ok(()) => 0,
            Err(e) => {
                self.record_host_error("flush", &e);
                EOF
            }
        }
    }

    fn formatted_write(&mut self, args: fmt::Arguments<'_>) -> i32 {
        if self.host.is_none() {
            return -1;
        }
        let mut rendered = String::new();
        if fmt::Write::write_fmt(&mut rendered, args).is_err() {
            log::emit(
                LogEntry::new(LogLevel::Debug, "format_error")
                    .with_op("formatted_write")
                    .with_kind(StreamKind::NativeFile),
            );
            return -1;
        }
        let bytes = rendered.as_bytes();
        if self.write_bytes("formatted_write", bytes) < bytes.len() {
            -1
        } else {
            count_to_i32(bytes.len())
        }
    }

    fn read_block(&mut self, buf: &mut [u8]) -> isize {
        if buf.is_empty() {
            return 0;
        }
        let Some(host) = self.host.as_mut() else {
            return -1;
        };
        let mut filled = 0;
        if let Some(b) = self.pushback.take() {
            buf[0] = b;
            filled = 1;
        }
        let mut hit_eof = false;
        let mut failure = None;
        while filled < buf.len() {
            match retry(|| host.read(&mut buf[filled..])) {
                Ok(0) => {
                    hit_eof = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        if hit_eof {
            self.flags.eof = true;
        }
        if let Some(e) = failure {
            self.record_host_error("read_block", &e);
        }

        // End-of-stream outranks the error indicator: a short read at EOF is
        // a count even if the host also flagged an error.
        if filled < buf.len() && self.flags.eof {
            count_to_isize(filled)
        } else if self.flags.error {
            -1
        } else {
            count_to_isize(filled)
        }
    }

    fn write_block(&mut self, buf: &[u8]) -> isize {
        if self.host.is_none() {
            return -1;
        }
        let written = self.write_bytes("write_block", buf);
        if written < buf.len() {
            -1
        } else {
            count_to_isize(written)
        }
    }
}
