//! Conformance harness for rtstream.
//!
//! This crate provides:
//! - Property checks: run the stream contract against real files
//! - Report generation: machine-readable JSON conformance reports
//! - File copy: move bytes between two handles with block I/O

#![forbid(unsafe_code)]

pub mod conformance;
pub mod copy;
pub mod report;

use std::path::PathBuf;

use thiserror::Error;

pub use conformance::ConformanceRunner;
pub use copy::{CopyStats, copy_file};
pub use report::{ConformanceReport, PropertyResult, PropertySummary};

/// Failures of the harness itself (not of the checked properties).
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("cannot prepare scratch directory {path}: {source}")]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("read from {path} failed")]
    Read { path: PathBuf },
    #[error("write to {path} failed")]
    Write { path: PathBuf },
    #[error("close of {path} failed")]
    Close { path: PathBuf },
    #[error("refusing to copy {path} onto itself")]
    SameFile { path: PathBuf },
    #[error("block size must be positive")]
    ZeroBlockSize,
    #[error("cannot write report {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("report serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
