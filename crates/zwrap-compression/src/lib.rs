//! Dual-backend streaming compression for zwrap
//!
//! This crate exposes one legacy-style compression interface that drives
//! either of two engines:
//!
//! - **Legacy**: the deflate family (zlib, raw and gzip wrappers)
//! - **BlockCodec**: Zstandard frames
//!
//! Compression contexts ([`DeflateStream`]) pick a backend when they are
//! created, either explicitly or from the process-wide [`selector`].
//! Decompression contexts ([`InflateStream`]) sniff the first four bytes of
//! input and route the rest of the stream to whichever engine produced it.
//!
//! # Features
//!
//! - `serde` (default): Enable serialization support for stream parameters
//!
//! # Examples
//!
//! ```rust
//! use zwrap_compression::{DeflateOptions, DeflateStream, InflateStream};
//! use zwrap_types::{Backend, FlushMode};
//!
//! let data = b"Hello, world! This is test data for compression.";
//!
//! let mut deflate = DeflateStream::with_options(
//!     DeflateOptions::default().with_backend(Backend::BlockCodec),
//! )?;
//! let mut compressed = vec![0u8; 256];
//! let progress = deflate.process(data, &mut compressed, FlushMode::Finish)?;
//! assert!(progress.is_stream_end());
//! compressed.truncate(progress.produced);
//! deflate.end();
//!
//! let mut inflate = InflateStream::init()?;
//! let mut output = vec![0u8; 256];
//! let progress = inflate.process(&compressed, &mut output, FlushMode::NoFlush)?;
//! assert_eq!(inflate.resolved(), Some(Backend::BlockCodec));
//! assert_eq!(&output[..progress.produced], data);
//! inflate.end();
//! # Ok::<(), zwrap_types::Error>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod alloc;
pub mod capability;
pub mod checksum;
mod context;
pub mod deflate;
mod engine;
pub mod inflate;
pub mod oneshot;
pub mod selector;

#[cfg(test)]
mod error_tests;

// Re-export main types
pub use alloc::{Allocator, AllocatorBinding, CountingAllocator, Reservation, SystemAllocator};
pub use capability::{Operation, Scope, Verdict};
pub use checksum::{adler32, crc32};
pub use deflate::{DeflateOptions, DeflateStream};
pub use inflate::{InflateOptions, InflateStream};
pub use oneshot::{compress, compress2, compress_bound, compress_into, sniff, uncompress, uncompress_into};
pub use selector::{current_backend, set_backend};

/// Name of the deflate implementation behind the legacy backend
pub const LEGACY_ENGINE: &str = "zlib-rs";

/// Version string of the linked Zstandard library
pub fn zstd_version() -> &'static str {
    zstd::zstd_safe::version_string()
}

/// Version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
