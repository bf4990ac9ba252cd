//! Engine state wrappers
//!
//! Each backend exposes one encoder and one decoder state behind the
//! [`EncoderState`] / [`DecoderState`] traits. The adapters pick the variant
//! once at construction and never re-dispatch afterwards.
//!
//! Engine memory is accounted through the context's [`AllocatorBinding`]: every
//! state reserves an estimate of its working set when it is built and returns
//! it when dropped.

mod block;
mod legacy;

pub(crate) use block::{BlockDecoderState, BlockEncoderState};
pub(crate) use legacy::{LegacyDecoderState, LegacyEncoderState};

use crate::alloc::AllocatorBinding;
use zwrap_types::{Backend, FlushMode, Result, StreamParams, WindowBits};

/// Maximum block size of the block codec (128 KiB)
pub(crate) const BLOCK_SIZE_MAX: usize = 128 * 1024;

/// Fixed part of a legacy deflate state beyond its window and hash tables
const LEGACY_ENCODER_BASE: usize = 6 * 1024;

/// Fixed part of a legacy inflate state beyond its window
const LEGACY_DECODER_BASE: usize = 7160;

/// Block-codec decoder context without its frame window
pub(crate) const BLOCK_DECODER_FOOTPRINT: usize = 160 * 1024 + BLOCK_SIZE_MAX;

/// zlib's documented deflate working set for the given window and memLevel
pub(crate) fn legacy_encoder_footprint(window_log: u8, mem_level: u8) -> usize {
    (1 << (window_log + 2)) + (1 << (mem_level + 9)) + LEGACY_ENCODER_BASE
}

/// zlib's documented inflate working set for the given window
pub(crate) fn legacy_decoder_footprint(window_log: u8) -> usize {
    (1 << window_log) + LEGACY_DECODER_BASE
}

/// Working set of a block-codec encoder at `level`
pub(crate) fn block_encoder_footprint(level: i32) -> usize {
    let window_log = match level {
        i32::MIN..=2 => 19,
        3..=8 => 21,
        9..=16 => 22,
        _ => 23,
    };
    (1usize << window_log) + 2 * BLOCK_SIZE_MAX
}

/// Result of one encoder call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct EncodeStep {
    pub consumed: usize,
    pub produced: usize,
    /// Non-zero while a flush or finish still has bytes to emit
    pub pending: usize,
    /// Engine wrote its end-of-stream marker
    pub finished: bool,
}

/// What the decoder asks for next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecodeSignal {
    Continue,
    End,
    /// Legacy stream carries a dictionary identifier (its Adler-32)
    NeedDictionary(u32),
}

/// Result of one decoder call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DecodeStep {
    pub consumed: usize,
    pub produced: usize,
    pub signal: DecodeSignal,
}

/// Engine-internal decode failure, classified by the adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DecodeFault(pub String);

/// Compress-direction engine state
pub(crate) trait EncoderState: Send {
    /// Consume input bounded by output room and apply `flush`
    fn encode(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Result<EncodeStep>;

    /// Install a preset dictionary; only valid before the first encode
    fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()>;

    /// Change the level mid-stream
    fn set_level(&mut self, level: i32) -> Result<()>;

    /// Restart the session, keeping level and dictionary
    fn reset(&mut self) -> Result<()>;
}

/// Decompress-direction engine state
pub(crate) trait DecoderState: Send {
    /// Consume input bounded by output room
    fn decode(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> std::result::Result<DecodeStep, DecodeFault>;

    /// Install a dictionary into a running decoder
    fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()>;

    /// Restart the session, keeping configuration
    fn reset(&mut self) -> Result<()>;
}

/// Build the encoder for `backend`
pub(crate) fn create_encoder(
    backend: Backend,
    binding: &AllocatorBinding,
    level: i32,
    params: &StreamParams,
    dictionary: Option<&[u8]>,
) -> Result<Box<dyn EncoderState>> {
    match backend {
        Backend::Legacy => {
            let mut state = LegacyEncoderState::new(binding, level, params)?;
            if let Some(dictionary) = dictionary {
                state.set_dictionary(dictionary)?;
            }
            Ok(Box::new(state))
        }
        Backend::BlockCodec => Ok(Box::new(BlockEncoderState::new(
            binding, level, dictionary,
        )?)),
    }
}

/// Build the decoder for `backend`
///
/// The block codec takes its dictionary at construction. The legacy decoder
/// never does; the adapter installs it when the stream asks for it.
pub(crate) fn create_decoder(
    backend: Backend,
    binding: &AllocatorBinding,
    window_bits: WindowBits,
    dictionary: Option<&[u8]>,
) -> Result<Box<dyn DecoderState>> {
    match backend {
        Backend::Legacy => Ok(Box::new(LegacyDecoderState::new(binding, window_bits)?)),
        Backend::BlockCodec => Ok(Box::new(BlockDecoderState::new(binding, dictionary)?)),
    }
}
