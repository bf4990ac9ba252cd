//! Core type system and error handling for zwrap
//!
//! This crate provides the foundational types shared by the zwrap crates:
//!
//! - **Error handling**: one error enum whose severity tells callers whether
//!   the stream context survived the failed call
//! - **Core types**: backend tags, flush modes, call progress and byte totals
//! - **Configuration**: validated counterparts of the legacy init parameters
//!
//! # Features
//!
//! - `std` (default): Enable standard library features
//! - `serde`: Enable serialization support
//!
//! # Examples
//!
//! ```rust
//! use zwrap_types::{Backend, CompressionLevel};
//!
//! let header = 0xFD2F_B528u32.to_le_bytes();
//! assert_eq!(Backend::from_header(header), Backend::BlockCodec);
//!
//! let level = CompressionLevel::default();
//! assert_eq!(level.resolve(Backend::Legacy).unwrap(), 6);
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod result;
pub mod types;

// Re-export commonly used types
pub use config::{
    BufferSize, CompressionLevel, MemLevel, Method, Strategy, StreamParams, WindowBits, Wrapper,
};
pub use error::{Error, ErrorKind, ErrorSeverity};
pub use result::Result;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_sniffing() {
        assert_eq!(
            Backend::from_header(BLOCK_CODEC_MAGIC.to_le_bytes()),
            Backend::BlockCodec
        );
        assert_eq!(Backend::from_header([0x78, 0x9c, 0x00, 0x00]), Backend::Legacy);
        // big-endian magic is not the discriminator
        assert_eq!(
            Backend::from_header(BLOCK_CODEC_MAGIC.to_be_bytes()),
            Backend::Legacy
        );
    }

    #[test]
    fn test_stream_totals_record() {
        let mut totals = StreamTotals::new();
        totals.record(&Progress::new(100, 40, Status::Ok));
        totals.record(&Progress::new(28, 10, Status::StreamEnd));

        assert_eq!(totals.total_in, 128);
        assert_eq!(totals.total_out, 50);
        assert!((totals.ratio() - 50.0 / 128.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_progress_idle() {
        let idle = Progress::idle();
        assert_eq!(idle.consumed, 0);
        assert_eq!(idle.produced, 0);
        assert!(!idle.is_stream_end());
    }
}
