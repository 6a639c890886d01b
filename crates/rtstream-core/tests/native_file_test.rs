//! Integration test: native-file streams over real files.
//!
//! Exercises the stream contract end to end through `Stream::init` and the
//! statically dispatched `StreamHandle<NativeFile<File>>`, including the
//! fatal push-back path (run in a child copy of this test binary).
//!
//! Run: cargo test -p rtstream-core --test native_file_test

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use rtstream_core::{EOF, NativeFile, Stream, StreamHandle, StreamKind, stream_write};

static TEST_SEQ: AtomicU64 = AtomicU64::new(0);

const FATAL_CHILD_ENV: &str = "RTSTREAM_FATAL_CHILD";
#[cfg(unix)]
const EBADF: i32 = 9;

fn temp_path(prefix: &str) -> PathBuf {
    let seq = TEST_SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "rtstream-{prefix}-{}-{seq}.bin",
        std::process::id()
    ))
}

fn open_rw(path: &PathBuf) -> File {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .expect("scratch file should be creatable")
}

// -----------------------------------------------------------------
// Round trips
// -----------------------------------------------------------------

#[test]
fn put_chars_then_reopen_and_get_them_back() {
    let path = temp_path("chars");
    let mut out = Stream::init(open_rw(&path), 1);
    assert_eq!(out.kind(), StreamKind::NativeFile);
    assert_eq!(out.put_char(i32::from(b'A')), i32::from(b'A'));
    assert_eq!(out.put_char(i32::from(b'B')), i32::from(b'B'));
    assert_eq!(out.flush(), 0);
    assert_eq!(out.close(), 0);

    let mut inp = Stream::init(File::open(&path).unwrap(), 1);
    assert_eq!(inp.get_char(), i32::from(b'A'));
    assert_eq!(inp.get_char(), i32::from(b'B'));
    assert_eq!(inp.get_char(), EOF);
    assert_eq!(inp.close(), 0);

    fs::remove_file(&path).unwrap();
}

#[test]
fn block_round_trip_preserves_every_byte() {
    let path = temp_path("block");
    let payload: Vec<u8> = (0..=255u8).cycle().take(5000).collect();

    let mut out = StreamHandle::new(NativeFile::new(open_rw(&path)), 0);
    assert_eq!(out.write_block(&payload), payload.len() as isize);
    assert_eq!(out.close(), 0);

    let mut inp = StreamHandle::new(NativeFile::new(File::open(&path).unwrap()), 0);
    let mut back = vec![0u8; payload.len() + 100];
    let n = inp.read_block(&mut back);
    assert_eq!(n, payload.len() as isize);
    assert_eq!(&back[..payload.len()], &payload[..]);
    assert!(inp.backend().is_eof());

    fs::remove_file(&path).unwrap();
}

#[test]
fn formatted_write_lands_in_file() {
    let path = temp_path("fmt");
    let mut out = Stream::init(open_rw(&path), 1);
    let n = stream_write!(out, "{}:{} {}\n", "main.m", 12, "syntax error");
    assert_eq!(n, 23);
    assert_eq!(out.close(), 0);
    assert_eq!(fs::read(&path).unwrap(), b"main.m:12 syntax error\n");
    fs::remove_file(&path).unwrap();
}

// -----------------------------------------------------------------
// read_block end-of-stream and error branches
// -----------------------------------------------------------------

#[test]
fn short_read_of_four_byte_file() {
    let path = temp_path("short");
    fs::write(&path, b"1234").unwrap();
    let mut inp = Stream::init(File::open(&path).unwrap(), 1);
    let mut buf = [0u8; 10];
    assert_eq!(inp.read_block(&mut buf), 4);
    assert_eq!(&buf[..4], b"1234");
    assert_eq!(inp.read_block(&mut buf), 0);
    fs::remove_file(&path).unwrap();
}

#[test]
fn read_block_at_eof_of_empty_file_is_zero() {
    let path = temp_path("empty");
    fs::write(&path, b"").unwrap();
    let mut inp = Stream::init(File::open(&path).unwrap(), 1);
    let mut buf = [0u8; 16];
    assert_eq!(inp.read_block(&mut buf), 0);
    fs::remove_file(&path).unwrap();
}

#[cfg(unix)]
#[test]
fn read_block_on_write_only_file_is_error() {
    let path = temp_path("wronly");
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .unwrap();
    let mut h = StreamHandle::new(NativeFile::new(file), 1);
    let mut buf = [0u8; 4];
    assert_eq!(h.read_block(&mut buf), -1);
    assert!(h.backend().is_error());
    assert_eq!(h.backend().last_os_error(), Some(EBADF));
    assert_eq!(h.get_char(), EOF);
    fs::remove_file(&path).unwrap();
}

#[cfg(unix)]
#[test]
fn write_block_on_read_only_file_is_error() {
    let path = temp_path("rdonly");
    fs::write(&path, b"data").unwrap();
    let mut h = StreamHandle::new(NativeFile::new(File::open(&path).unwrap()), 1);
    assert_eq!(h.write_block(b"more"), -1);
    assert_eq!(h.put_char(i32::from(b'x')), EOF);
    assert_eq!(h.formatted_write(format_args!("{}", 1)), -1);
    assert_eq!(fs::read(&path).unwrap(), b"data");
    fs::remove_file(&path).unwrap();
}

// -----------------------------------------------------------------
// Push-back
// -----------------------------------------------------------------

#[test]
fn unget_then_get_over_file() {
    let path = temp_path("unget");
    fs::write(&path, b"xy").unwrap();
    let mut inp = Stream::init(File::open(&path).unwrap(), 1);
    let c = inp.get_char();
    assert_eq!(inp.unget_char(c), c);
    assert_eq!(inp.get_char(), c);
    assert_eq!(inp.get_char(), i32::from(b'y'));
    fs::remove_file(&path).unwrap();
}

#[test]
fn borrowed_host_survives_close() {
    let path = temp_path("borrowed");
    let mut file = open_rw(&path);
    {
        let mut h = StreamHandle::new(NativeFile::new(&mut file), 1);
        assert_eq!(h.write_block(b"kept"), 4);
        assert_eq!(h.close(), 0);
    }
    // The owner still holds an open file after the handle closed.
    file.write_all(b"!").unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"kept!");
    fs::remove_file(&path).unwrap();
}

// Double close is out of contract: only check that it does not panic.
#[test]
fn second_close_is_outside_contract() {
    let path = temp_path("double-close");
    let mut h = Stream::init(open_rw(&path), 1);
    assert_eq!(h.close(), 0);
    let _ = h.close();
    fs::remove_file(&path).unwrap();
}

// -----------------------------------------------------------------
// Fatal push-back failure
// -----------------------------------------------------------------

/// Only does anything when re-run as a child by
/// `double_pushback_aborts_process`.
#[test]
fn fatal_child_entry() {
    if std::env::var_os(FATAL_CHILD_ENV).is_none() {
        return;
    }
    let path = temp_path("fatal");
    fs::write(&path, b"ab").unwrap();
    let mut inp = Stream::init(File::open(&path).unwrap(), 1);
    let a = inp.get_char();
    let b = inp.get_char();
    inp.unget_char(b);
    inp.unget_char(a);
    unreachable!("second push-back must abort");
}

#[test]
fn double_pushback_aborts_process() {
    let exe = std::env::current_exe().expect("test binary path");
    let output = Command::new(exe)
        .args(["fatal_child_entry", "--exact", "--test-threads=1"])
        .env(FATAL_CHILD_ENV, "1")
        .output()
        .expect("child test binary should run");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("putback_char: ungetc failed"),
        "unexpected stderr: {stderr}"
    );
}
