//! Stream handle: construction and dispatch.
//!
//! A [`StreamHandle`] owns one backend and a line counter. The backend's
//! discriminant is captured when the handle is built and never changes.
//! Dispatch is static for a concrete backend (`StreamHandle<NativeFile<File>>`)
//! and table-based for `StreamHandle<Box<dyn StreamOps + Send>>`; results are
//! identical either way.
//!
//! The `pluggable` feature picks which of the two the [`Stream`] alias means.

use std::fmt;
use std::fs::File;

use super::{NativeFile, StreamKind, StreamOps};
use crate::metrics::{METRICS, StreamMetrics};

/// Backend type behind the [`Stream`] alias.
#[cfg(feature = "pluggable")]
pub type DefaultBackend = Box<dyn StreamOps + Send>;

/// Backend type behind the [`Stream`] alias.
#[cfg(not(feature = "pluggable"))]
pub type DefaultBackend = NativeFile<File>;

/// The runtime's stream type.
pub type Stream = StreamHandle<DefaultBackend>;

/// True when [`Stream`] dispatches through the bound operation table.
pub const TABLE_DISPATCH: bool = cfg!(feature = "pluggable");

/// Per-stream record through which all I/O is invoked.
///
/// Not internally synchronized: at most one reader/writer drives a handle at
/// a time. A handle can move between threads when its backend is `Send`.
pub struct StreamHandle<B = DefaultBackend> {
    kind: StreamKind,
    backend: B,
    line_number: i32,
}

impl<B: StreamOps> StreamHandle<B> {
    /// Bind `backend` with an initial line number. Cannot fail; the first
    /// operation reports any problem with the underlying resource.
    pub fn new(backend: B, line_number: i32) -> Self {
        StreamMetrics::inc(&METRICS.handles_initialized);
        Self {
            kind: backend.kind(),
            backend,
            line_number,
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    /// Current line number. Stream operations never change it.
    pub fn line_number(&self) -> i32 {
        self.line_number
    }

    pub fn set_line_number(&mut self, line_number: i32) {
        self.line_number = line_number;
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    pub fn get_char(&mut self) -> i32 {
        let ch = self.backend.get_char();
        if ch < 0 {
            StreamMetrics::inc(&METRICS.eof_hits);
        } else {
            StreamMetrics::inc(&METRICS.chars_read);
        }
        ch
    }

    /// Push back one character. Aborts the process if the backend cannot.
    pub fn unget_char(&mut self, ch: i32) -> i32 {
        let rc = self.backend.unget_char(ch);
        StreamMetrics::inc(&METRICS.pushbacks);
        rc
    }

    pub fn put_char(&mut self, ch: i32) -> i32 {
        let rc = self.backend.put_char(ch);
        if rc < 0 {
            StreamMetrics::inc(&METRICS.failures);
        } else {
            StreamMetrics::inc(&METRICS.chars_written);
        }
        rc
    }

    /// Close the backing resource. The handle is invalid afterwards whatever
    /// the result; closing twice is out of contract.
    pub fn close(&mut self) -> i32 {
        let rc = self.backend.close();
        StreamMetrics::inc(&METRICS.closes);
        if rc != 0 {
            StreamMetrics::inc(&METRICS.failures);
        }
        rc
    }

    pub fn flush(&mut self) -> i32 {
        let rc = self.backend.flush();
        if rc != 0 {
            StreamMetrics::inc(&METRICS.failures);
        }
        rc
    }

    /// Usually called through [`stream_write!`](crate::stream_write).
    pub fn formatted_write(&mut self, args: fmt::Arguments<'_>) -> i32 {
        let n = self.backend.formatted_write(args);
        match u64::try_from(n) {
            Ok(n) => StreamMetrics::add(&METRICS.bytes_written, n),
            Err(_) => StreamMetrics::inc(&METRICS.failures),
        }
        n
    }

    pub fn read_block(&mut self, buf: &mut [u8]) -> isize {
        let n = self.backend.read_block(buf);
        match u64::try_from(n) {
            Ok(n) => {
                StreamMetrics::inc(&METRICS.blocks_read);
                StreamMetrics::add(&METRICS.bytes_read, n);
            }
            Err(_) => StreamMetrics::inc(&METRICS.failures),
        }
        n
    }

    pub fn write_block(&mut self, buf: &[u8]) -> isize {
        let n = self.backend.write_block(buf);
        match u64::try_from(n) {
            Ok(n) => {
                StreamMetrics::inc(&METRICS.blocks_written);
                StreamMetrics::add(&METRICS.bytes_written, n);
            }
            Err(_) => StreamMetrics::inc(&METRICS.failures),
        }
        n
    }
}

impl StreamHandle<DefaultBackend> {
    /// Bind an open file as a native-file stream.
    pub fn init(file: File, line_number: i32) -> Self {
        Self::new(bind_native(file), line_number)
    }
}

#[cfg(feature = "pluggable")]
impl StreamHandle<DefaultBackend> {
    /// Bind any backend behind the operation table.
    pub fn bind(backend: impl StreamOps + Send + 'static, line_number: i32) -> Self {
        Self::new(Box::new(backend), line_number)
    }
}

#[cfg(feature = "pluggable")]
fn bind_native(file: File) -> DefaultBackend {
    Box::new(NativeFile::new(file))
}

#[cfg(not(feature = "pluggable"))]
fn bind_native(file: File) -> DefaultBackend {
    NativeFile::new(file)
}

impl<B> fmt::Debug for StreamHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("kind", &self.kind)
            .field("line_number", &self.line_number)
            .finish_non_exhaustive()
    }
}

/// Formatted write through a stream handle.
///
/// `stream_write!(handle, "{} {}", a, b)` expands to
/// `handle.formatted_write(format_args!("{} {}", a, b))`.
#[macro_export]
macro_rules! stream_write {
    ($stream:expr, $($arg:tt)*) => {
        $stream.formatted_write(::std::format_args!($($arg)*))
    };
}
