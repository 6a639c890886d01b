//! Stream abstraction.
//!
//! [`StreamOps`] is the fixed capability set every backend implements.
//! [`StreamHandle`] binds one backend plus a line counter and is the only
//! surface callers use.
//!
//! Result convention (in-band sentinels, no error channel):
//! - character operations return the byte as `0..=255` or [`EOF`];
//! - `close` and `flush` return `0` or [`EOF`];
//! - block and formatted transfers return a count or `-1`.
//!
//! The single exception is `unget_char`: a backend that cannot push back
//! aborts the process through [`crate::error::fatal`].

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod handle;
pub mod memory;
pub mod native;

pub use handle::{DefaultBackend, Stream, StreamHandle, TABLE_DISPATCH};
pub use memory::MemoryStream;
pub use native::NativeFile;

/// End-of-stream / error sentinel for character, close and flush operations.
pub const EOF: i32 = -1;

/// Backend discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum StreamKind {
    /// A host byte stream (file, pipe, socket, C `FILE *`).
    NativeFile,
    /// An in-process byte buffer.
    Memory,
}

impl StreamKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NativeFile => "native_file",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations every stream backend provides.
///
/// Implementations must not assume they are the only backend in the process;
/// handles of other kinds may be live at the same time. Behavior after
/// `close` is out of contract; implementations return failure sentinels.
pub trait StreamOps {
    /// Backend discriminant. Constant for the life of the backend.
    fn kind(&self) -> StreamKind;

    /// Next byte, or [`EOF`] at end-of-stream or on a host read failure.
    fn get_char(&mut self) -> i32;

    /// Push `ch` back so the next `get_char` returns it. Returns `ch`.
    ///
    /// A backend that cannot push back aborts the process; there is no
    /// recoverable failure path.
    fn unget_char(&mut self, ch: i32) -> i32;

    /// Write the low byte of `ch`. Returns that byte, or [`EOF`] on failure.
    fn put_char(&mut self, ch: i32) -> i32;

    /// Close the backing resource. `0` on success, [`EOF`] on failure; the
    /// backend is unusable afterwards either way.
    fn close(&mut self) -> i32;

    /// Flush pending output. `0` on success, [`EOF`] on failure.
    fn flush(&mut self) -> i32;

    /// Render `args` to the stream. Returns bytes written, or `-1`.
    fn formatted_write(&mut self, args: fmt::Arguments<'_>) -> i32;

    /// Read up to `buf.len()` bytes. A short count means end-of-stream;
    /// `-1` means a host error was reported and end-of-stream was not.
    fn read_block(&mut self, buf: &mut [u8]) -> isize;

    /// Write all of `buf`. Returns `buf.len()`, or `-1` if the host accepted
    /// fewer bytes.
    fn write_block(&mut self, buf: &[u8]) -> isize;
}

impl<T: StreamOps + ?Sized> StreamOps for Box<T> {
    fn kind(&self) -> StreamKind {
        (**self).kind()
    }

    fn get_char(&mut self) -> i32 {
        (**self).get_char()
    }

    fn unget_char(&mut self, ch: i32) -> i32 {
        (**self).unget_char(ch)
    }

    fn put_char(&mut self, ch: i32) -> i32 {
        (**self).put_char(ch)
    }

    fn close(&mut self) -> i32 {
        (**self).close()
    }

    fn flush(&mut self) -> i32 {
        (**self).flush()
    }

    fn formatted_write(&mut self, args: fmt::Arguments<'_>) -> i32 {
        (**self).formatted_write(args)
    }

    fn read_block(&mut self, buf: &mut [u8]) -> isize {
        (**self).read_block(buf)
    }

    fn write_block(&mut self, buf: &[u8]) -> isize {
        (**self).write_block(buf)
    }
}

/// Clamp a byte count into the `i32` result space of `formatted_write`.
pub fn count_to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Clamp a byte count into the `isize` result space of block transfers.
pub fn count_to_isize(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}

/// Convert a character code to the byte a backend stores, or `None` if it is
/// out of range for push-back.
pub(crate) fn pushback_byte(ch: i32) -> Option<u8> {
    u8::try_from(ch).ok()
}
