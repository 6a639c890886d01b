// All extern "C" exports accept raw pointers from C callers; the contract is
// documented once on each module rather than per function.
#![allow(clippy::missing_safety_doc)]
//! # rtstream-abi
//!
//! C boundary for rtstream. A C runtime hands over an open `FILE *` and gets
//! back an opaque `RtStream *` whose operations dispatch through the bound
//! operation table to the [`LibcFile`] backend.
//!
//! ```text
//! C caller -> rtstream_* (stream_abi) -> StreamHandle -> LibcFile -> libc stdio
//! ```

pub mod libc_file;
pub mod stream_abi;

pub use libc_file::LibcFile;
pub use stream_abi::RtStream;
