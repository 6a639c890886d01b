//! # rtstream-core
//!
//! Polymorphic I/O streams for a language runtime.
//!
//! A [`StreamHandle`] binds an already-open byte stream plus a line counter and
//! exposes one uniform operation set (`get_char`, `unget_char`, `put_char`,
//! `close`, `flush`, `formatted_write`, `read_block`, `write_block`). Failures
//! are reported in-band as sentinels; the only fatal path is a failed push-back.
//!
//! With the default `pluggable` feature the [`Stream`] alias dispatches through
//! a bound `Box<dyn StreamOps>`, so native-file and in-memory streams coexist.
//! Without it, [`Stream`] is the native-file backend called directly.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod log;
pub mod metrics;
pub mod stream;

pub use error::{ConfigError, StreamFault};
pub use stream::{
    DefaultBackend, EOF, MemoryStream, NativeFile, Stream, StreamHandle, StreamKind, StreamOps,
    TABLE_DISPATCH,
};
