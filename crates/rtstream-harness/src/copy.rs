//! File copy through two stream handles.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use serde::Serialize;

use rtstream_core::Stream;

use crate::HarnessError;

/// Totals for one copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CopyStats {
    pub bytes: u64,
    pub blocks: u64,
}

/// Copy `input` to `output` with `read_block` / `write_block` in chunks of
/// `block_size` bytes. `output` is created or truncated, so a copy onto the
/// input itself (same path, symlink or hard link) is refused up front.
pub fn copy_file(input: &Path, output: &Path, block_size: usize) -> Result<CopyStats, HarnessError> {
    if block_size == 0 {
        return Err(HarnessError::ZeroBlockSize);
    }
    let src = File::open(input).map_err(|source| HarnessError::Open {
        path: input.to_path_buf(),
        source,
    })?;
    if same_file(&src, input, output) {
        return Err(HarnessError::SameFile {
            path: output.to_path_buf(),
        });
    }
    let dst = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(output)
        .map_err(|source| HarnessError::Open {
            path: output.to_path_buf(),
            source,
        })?;

    let mut reader = Stream::init(src, 1);
    let mut writer = Stream::init(dst, 1);
    let copied = pump(&mut reader, &mut writer, block_size, input, output);
    reader.close();
    let closed = writer.close();
    let stats = copied?;
    if closed != 0 {
        return Err(HarnessError::Close {
            path: output.to_path_buf(),
        });
    }
    Ok(stats)
}

/// True if `output` already exists and is the file `src` was opened from.
#[cfg(unix)]
fn same_file(src: &File, _input: &Path, output: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (src.metadata(), fs::metadata(output)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

/// True if `output` already exists and resolves to the same path as `input`.
#[cfg(not(unix))]
fn same_file(_src: &File, input: &Path, output: &Path) -> bool {
    match (fs::canonicalize(input), fs::canonicalize(output)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn pump(
    reader: &mut Stream,
    writer: &mut Stream,
    block_size: usize,
    input: &Path,
    output: &Path,
) -> Result<CopyStats, HarnessError> {
    let mut stats = CopyStats::default();
    let mut buf = vec![0u8; block_size];
    loop {
        let n = reader.read_block(&mut buf);
        let Ok(n) = usize::try_from(n) else {
            return Err(HarnessError::Read {
                path: input.to_path_buf(),
            });
        };
        if n == 0 {
            return Ok(stats);
        }
        if writer.write_block(&buf[..n]) < 0 {
            return Err(HarnessError::Write {
                path: output.to_path_buf(),
            });
        }
        stats.bytes += n as u64;
        stats.blocks += 1;
    }
}
