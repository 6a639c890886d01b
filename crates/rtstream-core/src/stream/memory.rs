//! In-memory backend.
//!
//! A byte buffer with a single cursor shared by reads and writes. Writes
//! overwrite at the cursor, extend the buffer past its end and discard a
//! pending push-back byte. The host never fails, so the only error outcomes
//! are operations on a closed stream.

use std::fmt;

use super::{EOF, StreamKind, StreamOps, count_to_i32, count_to_isize, pushback_byte};
use crate::error::{StreamFault, fatal};

#[derive(Debug, Default, Clone)]
pub struct MemoryStream {
    data: Vec<u8>,
    pos: usize,
    pushback: Option<u8>,
    closed: bool,
}

impl MemoryStream {
    /// An empty stream, cursor at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A stream over `data`, cursor at the start.
    #[must_use]
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the cursor. Positions past the end are clamped. Discards any
    /// pending push-back.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
        self.pushback = None;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Writes discard a pending push-back byte.
    fn write_at_cursor(&mut self, bytes: &[u8]) {
        self.pushback = None;
        let end = self.pos + bytes.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
    }
}

impl StreamOps for MemoryStream {
    fn kind(&self) -> StreamKind {
        StreamKind::Memory
    }

    fn get_char(&mut self) -> i32 {
        if self.closed {
            return EOF;
        }
        if let Some(b) = self.pushback.take() {
            return i32::from(b);
        }
        match self.data.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                i32::from(b)
            }
            None => EOF,
        }
    }

    fn unget_char(&mut self, ch: i32) -> i32 {
        let Some(byte) = pushback_byte(ch) else {
            fatal(self.kind(), &StreamFault::PushbackNotAByte { ch });
        };
        if self.closed {
            fatal(self.kind(), &StreamFault::PushbackClosed);
        }
        if let Some(pending) = self.pushback {
            fatal(self.kind(), &StreamFault::PushbackFull { pending });
        }
        self.pushback = Some(byte);
        ch
    }

    fn put_char(&mut self, ch: i32) -> i32 {
        if self.closed {
            return EOF;
        }
        let byte = ch as u8;
        self.write_at_cursor(&[byte]);
        i32::from(byte)
    }

    fn close(&mut self) -> i32 {
        if self.closed {
            return EOF;
        }
        self.closed = true;
        self.pushback = None;
        0
    }

    fn flush(&mut self) -> i32 {
        if self.closed { EOF } else { 0 }
    }

    fn formatted_write(&mut self, args: fmt::Arguments<'_>) -> i32 {
        if self.closed {
            return -1;
        }
        let mut rendered = String::new();
        if fmt::Write::write_fmt(&mut rendered, args).is_err() {
            return -1;
        }
        self.write_at_cursor(rendered.as_bytes());
        count_to_i32(rendered.len())
    }

    fn read_block(&mut self, buf: &mut [u8]) -> isize {
        if self.closed {
            return -1;
        }
        if buf.is_empty() {
            return 0;
        }
        let mut filled = 0;
        if let Some(b) = self.pushback.take() {
            buf[0] = b;
            filled = 1;
        }
        let available = self.data.len() - self.pos;
        let take = available.min(buf.len() - filled);
        buf[filled..filled + take].copy_from_slice(&self.data[self.pos..self.pos + take]);
        self.pos += take;
        count_to_isize(filled + take)
    }

    fn write_block(&mut self, buf: &[u8]) -> isize {
        if self.closed {
            return -1;
        }
        self.write_at_cursor(buf);
        count_to_isize(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_rewind_and_read() {
        let mut m = MemoryStream::new();
        assert_eq!(m.put_char(i32::from(b'A')), i32::from(b'A'));
        assert_eq!(m.write_block(b"BC"), 2);
        assert_eq!(m.formatted_write(format_args!("{}", 42)), 2);
        m.set_position(0);
        let mut buf = [0u8; 16];
        assert_eq!(m.read_block(&mut buf), 5);
        assert_eq!(&buf[..5], b"ABC42");
        assert_eq!(m.get_char(), EOF);
    }

    #[test]
    fn test_write_discards_pending_pushback() {
        let mut m = MemoryStream::from_bytes(b"abcd".to_vec());
        let c = m.get_char();
        m.unget_char(c);
        assert_eq!(m.put_char(i32::from(b'X')), i32::from(b'X'));
        assert_eq!(m.get_char(), i32::from(b'c'));

        m.unget_char(i32::from(b'c'));
        assert_eq!(m.write_block(b"Y"), 1);
        assert_eq!(m.get_char(), EOF);

        m.set_position(0);
        m.get_char();
        m.unget_char(i32::from(b'a'));
        assert_eq!(crate::stream_write!(m, "{}", 'Z'), 1);
        assert_eq!(m.get_char(), i32::from(b'c'));
        assert_eq!(m.bytes(), b"aZcY");
    }

    #[test]
    fn test_overwrite_in_place() {
        let mut m = MemoryStream::from_bytes(b"hello".to_vec());
        m.set_position(1);
        m.write_block(b"EL");
        assert_eq!(m.bytes(), b"hELlo");
        assert_eq!(m.position(), 3);
    }

    #[test]
    fn test_pushback_depth_one() {
        let mut m = MemoryStream::from_bytes(b"ab".to_vec());
        let c = m.get_char();
        assert_eq!(m.unget_char(c), c);
        assert_eq!(m.get_char(), i32::from(b'a'));
        assert_eq!(m.get_char(), i32::from(b'b'));
    }

    #[test]
    fn test_read_block_short_at_end_is_count() {
        let mut m = MemoryStream::from_bytes(b"abcd".to_vec());
        let mut buf = [0u8; 10];
        assert_eq!(m.read_block(&mut buf), 4);
        assert_eq!(m.read_block(&mut buf), 0);
    }

    #[test]
    fn test_set_position_clamps() {
        let mut m = MemoryStream::from_bytes(b"ab".to_vec());
        m.set_position(99);
        assert_eq!(m.position(), 2);
        assert_eq!(m.get_char(), EOF);
    }

    #[test]
    fn test_closed_stream_sentinels() {
        let mut m = MemoryStream::from_bytes(b"abc".to_vec());
        assert_eq!(m.close(), 0);
        assert!(m.is_closed());
        assert_eq!(m.get_char(), EOF);
        assert_eq!(m.put_char(1), EOF);
        assert_eq!(m.flush(), EOF);
        assert_eq!(m.read_block(&mut [0u8; 2]), -1);
        assert_eq!(m.write_block(b"x"), -1);
        assert_eq!(m.formatted_write(format_args!("x")), -1);
        assert_eq!(m.into_inner(), b"abc");
    }
}
