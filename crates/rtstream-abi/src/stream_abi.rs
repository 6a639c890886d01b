//! ABI layer for rtstream handles.
//!
//! `rtstream_init` boxes a table-dispatched [`StreamHandle`] bound to a
//! [`LibcFile`] and returns it as an opaque `RtStream *`. Every other export
//! takes that pointer back. A null `RtStream *` yields the operation's failure
//! sentinel; any other pointer must come from `rtstream_init` and must not
//! have been passed to `rtstream_release`.
//!
//! `rtstream_close` closes the `FILE *` but keeps the handle record;
//! `rtstream_release` frees the record and never touches the `FILE *`.

use std::ffi::{CStr, c_char, c_int, c_void};

use rtstream_core::{EOF, StreamHandle, StreamOps};

use crate::libc_file::LibcFile;

/// Opaque handle type seen by C callers.
pub type RtStream = StreamHandle<Box<dyn StreamOps + Send>>;

#[inline]
unsafe fn stream_mut<'a>(stream: *mut RtStream) -> Option<&'a mut RtStream> {
    // SAFETY: caller contract: null or a live pointer from `rtstream_init`.
    unsafe { stream.as_mut() }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Bind an open `FILE *`. Returns null if `file` is null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rtstream_init(file: *mut libc::FILE, line_number: c_int) -> *mut RtStream {
    if file.is_null() {
        return std::ptr::null_mut();
    }
    // SAFETY: caller hands over an open FILE* that outlives the handle.
    let backend: Box<dyn StreamOps + Send> = Box::new(unsafe { LibcFile::new(file) });
    Box::into_raw(Box::new(StreamHandle::new(backend, line_number)))
}

/// Free a handle record. The bound `FILE *` is left as it is.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rtstream_release(stream: *mut RtStream) {
    if stream.is_null() {
        return;
    }
    // SAFETY: pointer came from Box::into_raw in `rtstream_init`.
    drop(unsafe { Box::from_raw(stream) });
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rtstream_close(stream: *mut RtStream) -> c_int {
    match unsafe { stream_mut(stream) } {
        Some(s) => s.close(),
        None => EOF,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rtstream_flush(stream: *mut RtStream) -> c_int {
    match unsafe { stream_mut(stream) } {
        Some(s) => s.flush(),
        None => EOF,
    }
}

// ---------------------------------------------------------------------------
// Character I/O
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rtstream_getc(stream: *mut RtStream) -> c_int {
    match unsafe { stream_mut(stream) } {
        Some(s) => s.get_char(),
        None => EOF,
    }
}

/// Push back `ch`. Aborts the process if the stream cannot take it.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rtstream_ungetc(stream: *mut RtStream, ch: c_int) -> c_int {
    match unsafe { stream_mut(stream) } {
        Some(s) => s.unget_char(ch),
        None => EOF,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rtstream_putc(stream: *mut RtStream, ch: c_int) -> c_int {
    match unsafe { stream_mut(stream) } {
        Some(s) => s.put_char(ch),
        None => EOF,
    }
}

// ---------------------------------------------------------------------------
// Block and formatted I/O
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rtstream_read(
    stream: *mut RtStream,
    buffer: *mut c_void,
    size: usize,
) -> isize {
    let Some(s) = (unsafe { stream_mut(stream) }) else {
        return -1;
    };
    if size == 0 {
        return 0;
    }
    if buffer.is_null() {
        return -1;
    }
    // SAFETY: caller guarantees `buffer` is writable for `size` bytes.
    let dst = unsafe { std::slice::from_raw_parts_mut(buffer.cast::<u8>(), size) };
    s.read_block(dst)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rtstream_write(
    stream: *mut RtStream,
    buffer: *const c_void,
    size: usize,
) -> isize {
    let Some(s) = (unsafe { stream_mut(stream) }) else {
        return -1;
    };
    if size == 0 {
        return 0;
    }
    if buffer.is_null() {
        return -1;
    }
    // SAFETY: caller guarantees `buffer` is readable for `size` bytes.
    let src = unsafe { std::slice::from_raw_parts(buffer.cast::<u8>(), size) };
    s.write_block(src)
}

/// Write a NUL-terminated string through the formatted-write path.
///
/// Returns the number of bytes written, or a negative value on failure.
/// Strings that are not UTF-8 are written byte for byte.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rtstream_puts(stream: *mut RtStream, text: *const c_char) -> c_int {
    let Some(s) = (unsafe { stream_mut(stream) }) else {
        return -1;
    };
    if text.is_null() {
        return -1;
    }
    // SAFETY: caller guarantees a valid NUL-terminated string.
    let text = unsafe { CStr::from_ptr(text) };
    match text.to_str() {
        Ok(utf8) => s.formatted_write(format_args!("{utf8}")),
        Err(_) => {
            let n = s.write_block(text.to_bytes());
            c_int::try_from(n).unwrap_or(-1)
        }
    }
}

// ---------------------------------------------------------------------------
// Line numbers
// ---------------------------------------------------------------------------

/// Current line number, or 0 for a null handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rtstream_line_number(stream: *mut RtStream) -> c_int {
    match unsafe { stream_mut(stream) } {
        Some(s) => s.line_number(),
        None => 0,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rtstream_set_line_number(stream: *mut RtStream, line_number: c_int) {
    if let Some(s) = unsafe { stream_mut(stream) } {
        s.set_line_number(line_number);
    }
}
