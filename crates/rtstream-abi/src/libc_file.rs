//! Native-file backend over a C `FILE *`.
//!
//! Each operation forwards to the matching libc stdio call. `read_block`
//! consults `feof` before `ferror`, so a short read at end-of-stream is a
//! count even when the host also raised its error indicator.
//!
//! The `FILE *` is not owned: dropping a `LibcFile` leaves it open. Only
//! `close` calls `fclose`, after which the backend holds a null pointer.

use std::fmt;
use std::ptr;

use rtstream_core::error::{StreamFault, fatal};
use rtstream_core::log::{self, LogEntry, LogLevel};
use rtstream_core::stream::{count_to_i32, count_to_isize};
use rtstream_core::{EOF, StreamKind, StreamOps};

#[derive(Debug)]
pub struct LibcFile {
    file: *mut libc::FILE,
}

// SAFETY: a FILE* may be used from any thread; stdio locks internally and the
// handle contract already forbids concurrent use of one stream.
unsafe impl Send for LibcFile {}

impl LibcFile {
    /// Bind an open C stream.
    ///
    /// # Safety
    ///
    /// `file` must be a valid, open `FILE *` that stays open until this
    /// backend's `close` runs or the backend is dropped.
    pub unsafe fn new(file: *mut libc::FILE) -> Self {
        Self { file }
    }

    /// The bound `FILE *`, or null after `close`.
    pub fn as_ptr(&self) -> *mut libc::FILE {
        self.file
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_null()
    }

    fn note_failure(&self, op: &'static str) {
        if log::enabled(LogLevel::Debug) {
            log::emit(
                LogEntry::new(LogLevel::Debug, "host_error")
                    .with_op(op)
                    .with_kind(StreamKind::NativeFile)
                    .with_errno(std::io::Error::last_os_error().raw_os_error()),
            );
        }
    }

    fn write_bytes(&mut self, op: &'static str, bytes: &[u8]) -> usize {
        if bytes.is_empty() {
            return 0;
        }
        // SAFETY: `self.file` is open (checked by callers) and `bytes` is a
        // valid readable slice.
        let n = unsafe { libc::fwrite(bytes.as_ptr().cast(), 1, bytes.len(), self.file) };
        if n < bytes.len() {
            self.note_failure(op);
        }
        n
    }
}

impl StreamOps for LibcFile {
    fn kind(&self) -> StreamKind {
        StreamKind::NativeFile
    }

    fn get_char(&mut self) -> i32 {
        if self.is_closed() {
            return EOF;
        }
        // SAFETY: open FILE*.
        unsafe { libc::fgetc(self.file) }
    }

    fn unget_char(&mut self, ch: i32) -> i32 {
        if self.is_closed() {
            fatal(self.kind(), &StreamFault::PushbackClosed);
        }
        // SAFETY: open FILE*.
        let res = unsafe { libc::ungetc(ch, self.file) };
        if res == libc::EOF {
            fatal(self.kind(), &StreamFault::PushbackRejected { ch });
        }
        res
    }

    fn put_char(&mut self, ch: i32) -> i32 {
        if self.is_closed() {
            return EOF;
        }
        // SAFETY: open FILE*.
        let rc = unsafe { libc::fputc(ch, self.file) };
        if rc == libc::EOF {
            self.note_failure("put_char");
        }
        rc
    }

    fn close(&mut self) -> i32 {
        if self.is_closed() {
            return EOF;
        }
        let file = std::mem::replace(&mut self.file, ptr::null_mut());
        // SAFETY: `file` was open and is never used again.
        let rc = unsafe { libc::fclose(file) };
        if rc != 0 {
            self.note_failure("close");
        }
        rc
    }

    fn flush(&mut self) -> i32 {
        if self.is_closed() {
            return EOF;
        }
        // SAFETY: open FILE*.
        let rc = unsafe { libc::fflush(self.file) };
        if rc != 0 {
            self.note_failure("flush");
        }
        rc
    }

    fn formatted_write(&mut self, args: fmt::Arguments<'_>) -> i32 {
        if self.is_closed() {
            return -1;
        }
        let mut rendered = String::new();
        if fmt::Write::write_fmt(&mut rendered, args).is_err() {
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
        if self.is_closed() {
            return -1;
        }
        if buf.is_empty() {
            return 0;
        }
        // SAFETY: open FILE*, `buf` is a valid writable slice.
        let rc = unsafe { libc::fread(buf.as_mut_ptr().cast(), 1, buf.len(), self.file) };
        let count = count_to_isize(rc);
        // SAFETY: open FILE*.
        if rc < buf.len() && unsafe { libc::feof(self.file) } != 0 {
            count
        } else if unsafe { libc::ferror(self.file) } != 0 {
            self.note_failure("read_block");
            -1
        } else {
            count
        }
    }

    fn write_block(&mut self, buf: &[u8]) -> isize {
        if self.is_closed() {
            return -1;
        }
        let n = self.write_bytes("write_block", buf);
        if n < buf.len() {
            -1
        } else {
            count_to_isize(n)
        }
    }
}
