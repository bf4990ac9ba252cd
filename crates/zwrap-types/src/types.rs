//! Core data types for zwrap
//!
//! Backend tags, flush modes, call outcomes and per-stream byte accounting
//! shared by the adapters, the configuration layer and the CLI.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Little-endian discriminator at the start of every block-codec frame
pub const BLOCK_CODEC_MAGIC: u32 = 0xFD2F_B528;

/// Number of leading stream bytes inspected to resolve the backend
pub const HEADER_SIZE: usize = 4;

/// Compression engine backing a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Backend {
    /// Classic deflate-family engine (zlib wire format)
    #[default]
    Legacy,
    /// Block-oriented engine (Zstandard frames)
    BlockCodec,
}

impl Backend {
    /// Both backends, legacy first
    pub const ALL: [Backend; 2] = [Backend::Legacy, Backend::BlockCodec];

    /// Stable short name
    pub fn name(self) -> &'static str {
        match self {
            Backend::Legacy => "legacy",
            Backend::BlockCodec => "block-codec",
        }
    }

    /// Decide which engine produced a stream from its first four bytes
    pub fn from_header(header: [u8; HEADER_SIZE]) -> Self {
        if u32::from_le_bytes(header) == BLOCK_CODEC_MAGIC {
            Backend::BlockCodec
        } else {
            Backend::Legacy
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction of a stream context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Compress direction
    Compress,
    /// Decompress direction
    Decompress,
}

/// Flush policy for a process call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// Let the engine decide how much to buffer
    #[default]
    NoFlush,
    /// Emit all pending output on a byte boundary
    SyncFlush,
    /// Like `SyncFlush`, and reset the compression history
    FullFlush,
    /// Complete the stream
    Finish,
}

/// Non-error outcome of a process call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Progress was made, or no progress was possible without more input or output room
    Ok,
    /// The engine reported the logical end of the stream
    StreamEnd,
    /// The decoder needs a dictionary before it can continue
    NeedDictionary,
}

/// Bytes moved by a single call and the resulting status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Input bytes consumed
    pub consumed: usize,
    /// Output bytes produced
    pub produced: usize,
    /// Outcome of the call
    pub status: Status,
}

impl Progress {
    /// Create a progress record
    pub const fn new(consumed: usize, produced: usize, status: Status) -> Self {
        Self {
            consumed,
            produced,
            status,
        }
    }

    /// A call that moved nothing
    pub const fn idle() -> Self {
        Self::new(0, 0, Status::Ok)
    }

    /// Whether the stream reached its logical end
    pub fn is_stream_end(&self) -> bool {
        self.status == Status::StreamEnd
    }
}

/// Lifecycle of a decompression stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// Fewer than four header bytes seen, backend unresolved
    AwaitingHeader,
    /// Backend resolved, calls forwarded to its decoder
    Delegating,
    /// Resolved decoder reported end of stream
    Finished,
    /// A fatal error released the decoder
    Failed,
}

/// Cumulative byte counters of one stream context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StreamTotals {
    /// Bytes consumed from the caller
    pub total_in: u64,
    /// Bytes handed back to the caller
    pub total_out: u64,
}

impl StreamTotals {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one call
    pub fn record(&mut self, progress: &Progress) {
        self.total_in += progress.consumed as u64;
        self.total_out += progress.produced as u64;
    }

    /// Output size relative to input size
    pub fn ratio(&self) -> f64 {
        if self.total_in == 0 {
            1.0
        } else {
            self.total_out as f64 / self.total_in as f64
        }
    }
}
