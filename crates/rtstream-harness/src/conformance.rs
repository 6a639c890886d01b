//! Stream contract checks against real files.
//!
//! Every property opens its own files in a run-private subdirectory of the
//! scratch base, drives them
//! through [`Stream`] handles and records what came back. A property that
//! cannot even set up its files is a harness error, not a failed property.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use rtstream_core::log::now_utc;
use rtstream_core::metrics::METRICS;
use rtstream_core::{EOF, NativeFile, Stream, StreamHandle, TABLE_DISPATCH};

use crate::HarnessError;
use crate::report::{ConformanceReport, PropertyResult, PropertySummary};

type Check = fn(&mut ConformanceRunner) -> Result<PropertyResult, HarnessError>;

const CHECKS: &[(&str, Check)] = &[
    ("round_trip", ConformanceRunner::round_trip),
    ("unget_then_get", ConformanceRunner::unget_then_get),
    ("read_block_eof_is_zero", ConformanceRunner::read_block_eof_is_zero),
    ("read_block_host_error", ConformanceRunner::read_block_host_error),
    ("short_write_is_failure", ConformanceRunner::short_write_is_failure),
    ("second_close_boundary", ConformanceRunner::second_close_boundary),
    ("put_chars_then_read_back", ConformanceRunner::put_chars_then_read_back),
    ("short_read_at_eof", ConformanceRunner::short_read_at_eof),
];

/// Runs the property set in a private directory under a scratch base.
#[derive(Debug)]
pub struct ConformanceRunner {
    base: PathBuf,
    workdir: PathBuf,
    seq: u32,
}

impl ConformanceRunner {
    /// A runner whose files live in a fresh subdirectory of `base`. Nothing
    /// else under `base` is touched.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            workdir: base.clone(),
            base,
            seq: 0,
        }
    }

    /// A runner under the system temp dir.
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn scratch(&self) -> &Path {
        &self.base
    }

    /// Names of all properties, in run order.
    pub fn property_names() -> impl Iterator<Item = &'static str> {
        CHECKS.iter().map(|(name, _)| *name)
    }

    /// Run every property. The private subdirectory is removed afterwards,
    /// whether or not a check failed to set up.
    pub fn run(&mut self) -> Result<ConformanceReport, HarnessError> {
        let dir = ScratchDir::create(&self.base)?;
        self.workdir = dir.path().to_path_buf();
        self.seq = 0;

        let mut results = Vec::with_capacity(CHECKS.len());
        for (_, check) in CHECKS {
            results.push(check(self)?);
        }
        drop(dir);

        Ok(ConformanceReport {
            title: "rtstream conformance".to_string(),
            mode: if TABLE_DISPATCH { "pluggable" } else { "minimal" }.to_string(),
            timestamp: now_utc(),
            summary: PropertySummary::from_results(results),
            metrics: METRICS.snapshot(),
        })
    }

    // -----------------------------------------------------------------------
    // File helpers
    // -----------------------------------------------------------------------

    fn next_path(&mut self, stem: &str) -> PathBuf {
        self.seq += 1;
        self.workdir.join(format!("{stem}-{}.bin", self.seq))
    }

    fn open(path: &Path, options: &OpenOptions) -> Result<File, HarnessError> {
        options.open(path).map_err(|source| HarnessError::Open {
            path: path.to_path_buf(),
            source,
        })
    }

    fn create(path: &Path) -> Result<Stream, HarnessError> {
        let file = Self::open(path, OpenOptions::new().write(true).create(true).truncate(true))?;
        Ok(Stream::init(file, 1))
    }

    fn open_read(path: &Path) -> Result<Stream, HarnessError> {
        Ok(Stream::init(Self::open(path, OpenOptions::new().read(true))?, 1))
    }

    fn seed(path: &Path, bytes: &[u8]) -> Result<(), HarnessError> {
        fs::write(path, bytes).map_err(|source| HarnessError::Open {
            path: path.to_path_buf(),
            source,
        })
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    fn round_trip(&mut self) -> Result<PropertyResult, HarnessError> {
        let payload: Vec<u8> = (0..=255u8).cycle().take(3000).collect();
        let path = self.next_path("round-trip");

        let mut out = Self::create(&path)?;
        let written = out.write_block(&payload);
        let closed = out.close();
        if written != payload.len() as isize || closed != 0 {
            return Ok(PropertyResult::failed(
                "round_trip",
                format!("write {} close 0", payload.len()),
                format!("write {written} close {closed}"),
            ));
        }

        let mut input = Self::open_read(&path)?;
        let mut back = vec![0u8; payload.len() + 16];
        let n = input.read_block(&mut back);
        input.close();
        let same = usize::try_from(n).is_ok_and(|n| back[..n] == payload[..]);
        Ok(PropertyResult::check(
            "round_trip",
            format!("{} identical bytes", payload.len()),
            if same {
                format!("{n} identical bytes")
            } else {
                format!("{n} bytes, content differs")
            },
        ))
    }

    fn unget_then_get(&mut self) -> Result<PropertyResult, HarnessError> {
        let path = self.next_path("unget");
        Self::seed(&path, b"qr")?;
        let mut s = Self::open_read(&path)?;
        let first = s.get_char();
        s.unget_char(first);
        let again = s.get_char();
        let next = s.get_char();
        s.close();
        Ok(PropertyResult::check(
            "unget_then_get",
            format!("{} {}", b'q', b'r'),
            format!("{again} {next}"),
        ))
    }

    fn read_block_eof_is_zero(&mut self) -> Result<PropertyResult, HarnessError> {
        let path = self.next_path("empty");
        Self::seed(&path, b"")?;
        let mut s = Self::open_read(&path)?;
        let mut buf = [0u8; 32];
        let n = s.read_block(&mut buf);
        s.close();
        Ok(PropertyResult::check("read_block_eof_is_zero", "0", n.to_string()))
    }

    fn read_block_host_error(&mut self) -> Result<PropertyResult, HarnessError> {
        let path = self.next_path("write-only");
        let mut s = Self::create(&path)?;
        let mut buf = [0u8; 8];
        let n = s.read_block(&mut buf);
        s.close();
        Ok(PropertyResult::check("read_block_host_error", "-1", n.to_string()))
    }

    fn short_write_is_failure(&mut self) -> Result<PropertyResult, HarnessError> {
        let mut s = StreamHandle::new(NativeFile::new(CappedSink::new(4)), 1);
        let n = s.write_block(b"0123456789");
        Ok(PropertyResult::check("short_write_is_failure", "-1", n.to_string()))
    }

    fn second_close_boundary(&mut self) -> Result<PropertyResult, HarnessError> {
        let path = self.next_path("double-close");
        let mut s = Self::create(&path)?;
        let first = s.close();
        let second = s.close();
        Ok(PropertyResult::observe(
            "second_close_boundary",
            format!("first {first} second {second}"),
        ))
    }

    fn put_chars_then_read_back(&mut self) -> Result<PropertyResult, HarnessError> {
        let path = self.next_path("put-ab");
        let mut out = Self::create(&path)?;
        let put = [out.put_char(i32::from(b'A')), out.put_char(i32::from(b'B'))];
        let flushed = out.flush();
        let closed = out.close();
        if put != [i32::from(b'A'), i32::from(b'B')] || flushed != 0 || closed != 0 {
            return Ok(PropertyResult::failed(
                "put_chars_then_read_back",
                "65 66 0 0",
                format!("{} {} {flushed} {closed}", put[0], put[1]),
            ));
        }

        let mut input = Self::open_read(&path)?;
        let got = [input.get_char(), input.get_char(), input.get_char()];
        input.close();
        Ok(PropertyResult::check(
            "put_chars_then_read_back",
            format!("{} {} {EOF}", b'A', b'B'),
            format!("{} {} {}", got[0], got[1], got[2]),
        ))
    }

    fn short_read_at_eof(&mut self) -> Result<PropertyResult, HarnessError> {
        let path = self.next_path("four");
        Self::seed(&path, b"abcd")?;
        let mut s = Self::open_read(&path)?;
        let mut buf = [0u8; 10];
        let n = s.read_block(&mut buf);
        s.close();
        Ok(PropertyResult::check("short_read_at_eof", "4", n.to_string()))
    }
}

static RUN_SEQ: AtomicU64 = AtomicU64::new(0);

/// A directory created for one run and removed when dropped.
#[derive(Debug)]
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create `base` if needed, then a new `rtstream-conformance-<pid>-<n>`
    /// directory inside it. Fails rather than reuse an existing directory.
    fn create(base: &Path) -> Result<Self, HarnessError> {
        fs::create_dir_all(base).map_err(|source| HarnessError::Scratch {
            path: base.to_path_buf(),
            source,
        })?;
        let seq = RUN_SEQ.fetch_add(1, Ordering::Relaxed);
        let path = base.join(format!("rtstream-conformance-{}-{seq}", std::process::id()));
        fs::create_dir(&path).map_err(|source| HarnessError::Scratch {
            path: path.clone(),
            source,
        })?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Host that accepts at most `capacity` bytes, then reports a full device.
#[derive(Debug)]
struct CappedSink {
    capacity: usize,
    written: usize,
}

impl CappedSink {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            written: 0,
        }
    }
}

impl Read for CappedSink {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }
}

impl Write for CappedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.capacity - self.written;
        if room == 0 {
            return Err(io::Error::from_raw_os_error(28));
        }
        let n = buf.len().min(room);
        self.written += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_names_are_unique() {
        let mut names: Vec<&str> = ConformanceRunner::property_names().collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_capped_sink_stops_at_capacity() {
        let mut sink = CappedSink::new(3);
        assert_eq!(sink.write(b"abcdef").unwrap(), 3);
        assert!(sink.write(b"g").is_err());
    }

    fn base_dir(tag: &str) -> PathBuf {
        let seq = RUN_SEQ.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!("rtstream-scratch-{tag}-{}-{seq}", std::process::id()))
    }

    #[test]
    fn test_scratch_dir_removed_on_error_path() {
        let base = base_dir("err");
        fs::create_dir_all(&base).unwrap();
        fs::write(base.join("keep.txt"), b"keep").unwrap();

        let mut created = None;
        let outcome = (|| -> Result<(), HarnessError> {
            let dir = ScratchDir::create(&base)?;
            fs::write(dir.path().join("partial.bin"), b"x").unwrap();
            created = Some(dir.path().to_path_buf());
            Err(HarnessError::ZeroBlockSize)
        })();

        assert!(matches!(outcome, Err(HarnessError::ZeroBlockSize)));
        assert!(!created.unwrap().exists());
        assert_eq!(fs::read(base.join("keep.txt")).unwrap(), b"keep");
        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_scratch_dirs_are_distinct() {
        let base = base_dir("distinct");
        let a = ScratchDir::create(&base).unwrap();
        let b = ScratchDir::create(&base).unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(&base));
        drop(a);
        drop(b);
        fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn test_short_write_property_passes() {
        let mut runner = ConformanceRunner::new(std::env::temp_dir());
        let result = runner.short_write_is_failure().unwrap();
        assert!(result.passed, "{result:?}");
    }
}
