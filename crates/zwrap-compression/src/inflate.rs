//! Decompression adapter
//!
//! An [`InflateStream`] is not told which engine produced its input. It
//! buffers the first four bytes of the logical stream, however they are split
//! across calls, resolves the backend from them, and from then on forwards
//! every call to that backend's decoder. The buffered header is replayed into
//! the decoder as the first bytes it ever sees.
//!
//! Block-codec failures get one retry: the first is reported as
//! [`Status::NeedDictionary`] so the caller can install a dictionary, the
//! second in a row is fatal.

use crate::alloc::{Allocator, AllocatorBinding};
use crate::capability::{self, Operation};
use crate::context::{Dictionary, StreamCore};
use crate::engine::{self, DecodeFault, DecodeSignal, DecoderState};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use zwrap_types::{
    Backend, DecodeState, Error, FlushMode, Phase, Progress, Result, Status, StreamTotals,
    WindowBits, Wrapper, HEADER_SIZE,
};

/// Construction options for an [`InflateStream`]
#[derive(Clone, Default)]
pub struct InflateOptions {
    /// Window and wrapper, used only if the stream resolves to legacy
    pub window_bits: WindowBits,
    /// Memory provider; `None` uses the process default
    pub allocator: Option<Arc<dyn Allocator>>,
}

impl InflateOptions {
    /// Set the legacy window bits
    pub fn with_window_bits(mut self, window_bits: WindowBits) -> Self {
        self.window_bits = window_bits;
        self
    }

    /// Route the context's memory through `allocator`
    pub fn with_allocator(mut self, allocator: Arc<dyn Allocator>) -> Self {
        self.allocator = Some(allocator);
        self
    }
}

impl fmt::Debug for InflateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InflateOptions")
            .field("window_bits", &self.window_bits)
            .field("custom_allocator", &self.allocator.is_some())
            .finish()
    }
}

/// First bytes of the logical stream
#[derive(Debug, Clone, Copy, Default)]
struct HeaderSniffer {
    bytes: [u8; HEADER_SIZE],
    filled: usize,
}

impl HeaderSniffer {
    /// Take as many header bytes from `input` as are still missing
    fn fill(&mut self, input: &[u8]) -> usize {
        let take = (HEADER_SIZE - self.filled).min(input.len());
        self.bytes[self.filled..self.filled + take].copy_from_slice(&input[..take]);
        self.filled += take;
        take
    }

    fn is_complete(&self) -> bool {
        self.filled == HEADER_SIZE
    }

    /// Backend the header would resolve to once `input` is taken, without taking it
    fn resolves_to(&self, input: &[u8]) -> Option<Backend> {
        let mut ahead = *self;
        ahead.fill(input);
        ahead
            .is_complete()
            .then(|| Backend::from_header(ahead.bytes))
    }
}

/// Bytes moved by the resolved decoder within one call
#[derive(Debug, Clone, Copy)]
struct Driven {
    consumed: usize,
    produced: usize,
    status: Status,
}

/// Decompress-direction stream context
pub struct InflateStream {
    core: StreamCore,
    window_bits: WindowBits,
    state: DecodeState,
    sniffer: HeaderSniffer,
    resolved: Option<Backend>,
    decoder: Option<Box<dyn DecoderState>>,
    /// Header bytes already accepted by the current decoder
    replay: usize,
    /// Whether a rebuilt decoder has to see the sniffed header again
    replays_header: bool,
    /// Caller bytes accepted by the decoder after the header
    payload_in: u64,
    error_count: u8,
    /// A mid-stream block-codec failure left the decoder unusable
    poisoned: bool,
    dictionary: Option<Dictionary>,
    dictionary_installed: bool,
    awaiting_dictionary: bool,
}

impl InflateStream {
    /// Create a context with default options
    pub fn init() -> Result<Self> {
        Self::with_options(InflateOptions::default())
    }

    /// Create a context whose legacy decoder uses `window_bits`
    pub fn init_with_window_bits(window_bits: WindowBits) -> Result<Self> {
        Self::with_options(InflateOptions::default().with_window_bits(window_bits))
    }

    /// Create a context from explicit options
    pub fn with_options(options: InflateOptions) -> Result<Self> {
        Self::build(
            options.window_bits,
            AllocatorBinding::from_option(options.allocator),
        )
    }

    fn build(window_bits: WindowBits, binding: AllocatorBinding) -> Result<Self> {
        let core = StreamCore::new(Phase::Decompress, binding)?;
        debug!(
            window_bits = window_bits.get(),
            custom_allocator = core.binding().is_custom(),
            "created decompression context"
        );

        Ok(Self {
            core,
            window_bits,
            state: DecodeState::AwaitingHeader,
            sniffer: HeaderSniffer::default(),
            resolved: None,
            decoder: None,
            replay: 0,
            replays_header: false,
            payload_in: 0,
            error_count: 0,
            poisoned: false,
            dictionary: None,
            dictionary_installed: false,
            awaiting_dictionary: false,
        })
    }

    /// Feed `input`, writing at most `output.len()` bytes
    ///
    /// Zero output room returns without consuming anything. A stream that
    /// has ended reports `StreamEnd` with nothing moved.
    pub fn process(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<Progress> {
        self.core.ensure_live()?;
        if self.state == DecodeState::Finished {
            return Ok(Progress::new(0, 0, Status::StreamEnd));
        }
        if flush == FlushMode::FullFlush {
            // a call that completes the header is judged by the backend it resolves to
            let backend = match self.state {
                DecodeState::AwaitingHeader => self.sniffer.resolves_to(input),
                _ => self.resolved,
            };
            self.check(Operation::FullFlush, backend)?;
        }
        if output.is_empty() {
            return Ok(Progress::idle());
        }

        let mut consumed = 0;
        if self.state == DecodeState::AwaitingHeader {
            consumed = self.sniffer.fill(input);
            if !self.sniffer.is_complete() {
                return Ok(self.complete(Progress::new(consumed, 0, Status::Ok)));
            }
            if let Err(error) = self.resolve() {
                self.core.record(&Progress::new(consumed, 0, Status::Ok));
                return Err(self.fail(error));
            }
        }

        let mut produced = 0;
        if self.replay < HEADER_SIZE {
            let header = self.sniffer.bytes;
            let driven = self.drive(&header[self.replay..], output, flush, true)?;
            produced += driven.produced;
            if driven.status == Status::NeedDictionary {
                return Ok(self.complete(Progress::new(consumed, produced, driven.status)));
            }
            self.replay += driven.consumed;
            if driven.status == Status::StreamEnd {
                return Ok(self.complete(Progress::new(consumed, produced, Status::StreamEnd)));
            }
            if self.replay < HEADER_SIZE {
                // decoder wants output room before it takes the rest of the header
                return Ok(self.complete(Progress::new(consumed, produced, Status::Ok)));
            }
        }

        let driven = self.drive(&input[consumed..], &mut output[produced..], flush, false)?;
        consumed += driven.consumed;
        produced += driven.produced;
        self.payload_in += driven.consumed as u64;
        Ok(self.complete(Progress::new(consumed, produced, driven.status)))
    }

    /// Drain the decoder; `StreamEnd` once the stream is complete
    ///
    /// A context that never saw four bytes returns `Ok` with nothing produced.
    pub fn finish(&mut self, output: &mut [u8]) -> Result<Progress> {
        self.process(&[], output, FlushMode::Finish)
    }

    /// Register a dictionary
    ///
    /// Before resolution it is kept and installed once the backend is known.
    /// On the block codec it is accepted until payload past the header has
    /// been decoded. On the legacy engine it is installed when the stream
    /// asks for it.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        self.core.ensure_live()?;
        let result = match self.resolved {
            None => self.store_dictionary(dictionary).map(|()| {
                debug!(
                    len = dictionary.len(),
                    "dictionary deferred until the backend is resolved"
                );
            }),
            Some(Backend::BlockCodec) => self.install_block_dictionary(dictionary),
            Some(Backend::Legacy) => self.install_legacy_dictionary(dictionary),
        };
        result.map_err(|error| self.fail(error))
    }

    /// Dictionary registered on this context
    pub fn dictionary(&self) -> Option<&[u8]> {
        self.dictionary.as_ref().map(Dictionary::as_slice)
    }

    /// Restart the session
    ///
    /// An unresolved context forgets its partial header. A resolved one keeps
    /// its backend and restarts that decoder; the next stream is fed to it
    /// directly.
    pub fn reset(&mut self) -> Result<()> {
        self.core.ensure_live()?;
        if self.resolved.is_none() {
            self.sniffer = HeaderSniffer::default();
        } else if let Err(error) = self.restart_decoder() {
            return Err(self.fail(error));
        }
        self.core.reset_totals();
        debug!(resolved = ?self.resolved, "reset decompression context");
        Ok(())
    }

    /// Duplicate the context
    ///
    /// Only possible before the backend is resolved: the legacy engine
    /// cannot clone a running decoder and the block codec denies copies.
    pub fn copy(&self) -> Result<Self> {
        self.core.ensure_live()?;
        capability::ensure(Operation::Copy, self.resolved)?;
        if self.resolved.is_some() {
            return Err(Error::invalid_parameter(
                "source",
                "a resolved legacy decoder cannot be duplicated",
            ));
        }

        let mut copy = Self::build(self.window_bits, self.core.binding().clone())?;
        copy.sniffer = self.sniffer;
        if let Some(dictionary) = &self.dictionary {
            copy.store_dictionary(dictionary.as_slice())?;
        }
        copy.core.restore_totals(self.core.totals());
        Ok(copy)
    }

    /// Release the decoder, header and dictionary; safe to call any number of times
    pub fn end(&mut self) {
        if self.core.is_released() {
            return;
        }
        self.teardown();
        debug!(resolved = ?self.resolved, "released decompression context");
    }

    /// Backend resolved from the header, if any
    pub fn resolved(&self) -> Option<Backend> {
        self.resolved
    }

    /// Lifecycle state
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Always [`Phase::Decompress`]
    pub fn phase(&self) -> Phase {
        self.core.phase()
    }

    /// Window bits for the legacy decoder
    pub fn window_bits(&self) -> WindowBits {
        self.window_bits
    }

    /// Cumulative byte counters
    pub fn totals(&self) -> StreamTotals {
        self.core.totals()
    }

    /// Bytes consumed so far, each header byte counted once
    pub fn total_in(&self) -> u64 {
        self.core.totals().total_in
    }

    /// Bytes produced so far
    pub fn total_out(&self) -> u64 {
        self.core.totals().total_out
    }

    /// Most recent error reported by this context
    pub fn last_error(&self) -> Option<&Error> {
        self.core.last_error()
    }

    /// Whether the decoder has been released
    pub fn is_finalized(&self) -> bool {
        self.core.is_released()
    }

    fn resolve(&mut self) -> Result<()> {
        let backend = Backend::from_header(self.sniffer.bytes);
        self.resolved = Some(backend);
        self.state = DecodeState::Delegating;
        self.replay = 0;
        self.replays_header = true;
        debug!(%backend, "resolved decompression backend");

        let dictionary = self.dictionary.as_ref().map(Dictionary::as_slice);
        let decoder =
            engine::create_decoder(backend, self.core.binding(), self.window_bits, dictionary)?;
        self.decoder = Some(decoder);
        self.dictionary_installed = backend == Backend::BlockCodec && dictionary.is_some();
        if backend == Backend::Legacy {
            self.drop_gzip_dictionary();
            self.install_raw_dictionary()?;
        }
        Ok(())
    }

    /// Gzip members never ask for a dictionary, so one registered early is refused
    fn drop_gzip_dictionary(&mut self) {
        if self.window_bits.wrapper() != Wrapper::Gzip || self.dictionary.is_none() {
            return;
        }
        let error = Error::invalid_parameter(
            "dictionary",
            "gzip-wrapped streams cannot carry a preset dictionary",
        );
        warn!(%error, "dropping dictionary registered before a gzip stream");
        self.core.note_error(&error);
        self.dictionary = None;
        self.dictionary_installed = false;
    }

    /// Raw deflate has no dictionary request, so it gets the dictionary up front
    fn install_raw_dictionary(&mut self) -> Result<()> {
        if self.window_bits.wrapper() != Wrapper::Raw {
            return Ok(());
        }
        if let (Some(dictionary), Some(decoder)) = (&self.dictionary, self.decoder.as_mut()) {
            decoder.set_dictionary(dictionary.as_slice())?;
            self.dictionary_installed = true;
            debug!(len = dictionary.as_slice().len(), "installed raw-deflate dictionary");
        }
        Ok(())
    }

    /// Run the resolved decoder over `input`
    ///
    /// Replaying the header never counts as recovering from a failure.
    fn drive(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
        replaying: bool,
    ) -> Result<Driven> {
        if self.poisoned {
            return Err(self.fail(Error::stream_corrupt(
                "block-codec decoder failed twice in a row",
            )));
        }

        let mut driven = Driven {
            consumed: 0,
            produced: 0,
            status: Status::Ok,
        };
        loop {
            let decoder = self.decoder.as_mut().ok_or(Error::Finalized)?;
            let result = decoder.decode(
                &input[driven.consumed..],
                &mut output[driven.produced..],
                flush,
            );
            let step = match result {
                Ok(step) => step,
                Err(DecodeFault(message)) => return self.on_fault(message, driven),
            };
            driven.consumed += step.consumed;
            driven.produced += step.produced;
            if !replaying && (step.consumed > 0 || step.produced > 0) {
                self.error_count = 0;
            }

            match step.signal {
                DecodeSignal::Continue => return Ok(driven),
                DecodeSignal::End => {
                    self.state = DecodeState::Finished;
                    debug!(resolved = ?self.resolved, "decompression stream complete");
                    driven.status = Status::StreamEnd;
                    return Ok(driven);
                }
                DecodeSignal::NeedDictionary(id) => {
                    if self.install_requested_dictionary(id) {
                        continue;
                    }
                    self.awaiting_dictionary = true;
                    driven.status = Status::NeedDictionary;
                    return Ok(driven);
                }
            }
        }
    }

    /// Install the stored dictionary when the legacy stream asks for one
    fn install_requested_dictionary(&mut self, id: u32) -> bool {
        if self.dictionary_installed {
            return false;
        }
        let (Some(dictionary), Some(decoder)) = (&self.dictionary, self.decoder.as_mut()) else {
            return false;
        };
        match decoder.set_dictionary(dictionary.as_slice()) {
            Ok(()) => {
                self.dictionary_installed = true;
                self.awaiting_dictionary = false;
                debug!(dictionary_id = id, "installed deferred dictionary");
                true
            }
            Err(error) => {
                warn!(dictionary_id = id, %error, "deferred dictionary rejected");
                self.core.note_error(&error);
                false
            }
        }
    }

    fn on_fault(&mut self, message: String, driven: Driven) -> Result<Driven> {
        if self.resolved != Some(Backend::BlockCodec) {
            return Err(self.fail(Error::data(message)));
        }

        self.error_count += 1;
        if self.error_count > 1 {
            return Err(self.fail(Error::stream_corrupt(message)));
        }
        warn!(%message, "block-codec decode failed, reporting NeedDictionary");
        if self.payload_in == 0 {
            // only the header reached the decoder: start over so a retry replays it
            if let Err(error) = self.rebuild_block_decoder() {
                return Err(self.fail(error));
            }
        } else {
            self.poisoned = true;
        }
        Ok(Driven {
            status: Status::NeedDictionary,
            ..driven
        })
    }

    fn rebuild_block_decoder(&mut self) -> Result<()> {
        let dictionary = self.dictionary.as_ref().map(Dictionary::as_slice);
        let decoder = engine::create_decoder(
            Backend::BlockCodec,
            self.core.binding(),
            self.window_bits,
            dictionary,
        )?;
        self.dictionary_installed = dictionary.is_some();
        self.decoder = Some(decoder);
        self.replay = if self.replays_header { 0 } else { HEADER_SIZE };
        self.poisoned = false;
        Ok(())
    }

    fn install_block_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        if self.payload_in > 0 {
            return Err(Error::dictionary_too_late(
                "block-codec payload has already been decoded",
            ));
        }
        self.store_dictionary(dictionary)?;
        self.rebuild_block_decoder()?;
        debug!(len = dictionary.len(), "installed block-codec dictionary");
        Ok(())
    }

    fn install_legacy_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        let defer = !self.awaiting_dictionary
            && self.window_bits.wrapper() == Wrapper::Zlib
            && self.core.totals().total_out == 0;
        if defer {
            self.store_dictionary(dictionary)?;
            debug!(len = dictionary.len(), "dictionary deferred until the stream asks for it");
            return Ok(());
        }

        let decoder = self.decoder.as_mut().ok_or(Error::Finalized)?;
        decoder.set_dictionary(dictionary)?;
        self.store_dictionary(dictionary)?;
        self.dictionary_installed = true;
        self.awaiting_dictionary = false;
        debug!(len = dictionary.len(), "installed legacy dictionary");
        Ok(())
    }

    fn store_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        self.dictionary = Some(Dictionary::new(self.core.binding(), dictionary)?);
        self.dictionary_installed = false;
        Ok(())
    }

    fn restart_decoder(&mut self) -> Result<()> {
        let decoder = self.decoder.as_mut().ok_or(Error::Finalized)?;
        decoder.reset()?;
        self.state = DecodeState::Delegating;
        self.replay = HEADER_SIZE;
        self.replays_header = false;
        self.payload_in = 0;
        self.error_count = 0;
        self.poisoned = false;
        self.awaiting_dictionary = false;
        if self.resolved == Some(Backend::Legacy) {
            self.dictionary_installed = false;
            self.install_raw_dictionary()?;
        }
        Ok(())
    }

    fn check(&mut self, operation: Operation, backend: Option<Backend>) -> Result<()> {
        capability::ensure(operation, backend).map_err(|error| {
            self.core.note_error(&error);
            error
        })
    }

    fn complete(&mut self, progress: Progress) -> Progress {
        self.core.record(&progress);
        trace!(
            consumed = progress.consumed,
            produced = progress.produced,
            status = ?progress.status,
            state = ?self.state,
            "inflate"
        );
        progress
    }

    fn fail(&mut self, error: Error) -> Error {
        if self.core.note_error(&error) {
            self.teardown();
            self.state = DecodeState::Failed;
        }
        error
    }

    fn teardown(&mut self) {
        self.decoder = None;
        self.dictionary = None;
        self.core.release();
    }
}

impl fmt::Debug for InflateStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InflateStream")
            .field("state", &self.state)
            .field("resolved", &self.resolved)
            .field("header_filled", &self.sniffer.filled)
            .field("totals", &self.core.totals())
            .field("error_count", &self.error_count)
            .field("finalized", &self.core.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::CountingAllocator;
    use crate::checksum::{adler32, ADLER32_INIT};
    use crate::deflate::{DeflateOptions, DeflateStream};
    use crate::oneshot::compress;
    use rstest::rstest;
    use zwrap_types::{StreamParams, BLOCK_CODEC_MAGIC};

    fn decompress_all(inflate: &mut InflateStream, input: &[u8], chunk: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut buffer = [0u8; 512];
        let mut offset = 0;
        loop {
            let end = (offset + chunk).min(input.len());
            let progress = inflate
                .process(&input[offset..end], &mut buffer, FlushMode::NoFlush)
                .unwrap();
            offset += progress.consumed;
            out.extend_from_slice(&buffer[..progress.produced]);
            if progress.is_stream_end() {
                return out;
            }
            assert_ne!(progress.status, Status::NeedDictionary);
        }
    }

    fn legacy_stream(params: StreamParams, dictionary: Option<&[u8]>, payload: &[u8]) -> Vec<u8> {
        let mut deflate = DeflateStream::with_options(
            DeflateOptions::default()
                .with_backend(Backend::Legacy)
                .with_params(params),
        )
        .unwrap();
        if let Some(dictionary) = dictionary {
            deflate.set_dictionary(dictionary).unwrap();
        }
        let mut compressed = vec![0u8; payload.len() + 128];
        let step = deflate
            .process(payload, &mut compressed, FlushMode::NoFlush)
            .unwrap();
        assert_eq!(step.consumed, payload.len());
        let mut len = step.produced;
        loop {
            let progress = deflate.finish(&mut compressed[len..]).unwrap();
            len += progress.produced;
            if progress.is_stream_end() {
                break;
            }
        }
        compressed.truncate(len);
        compressed
    }

    #[rstest]
    #[case(Backend::Legacy, 1)]
    #[case(Backend::Legacy, 3)]
    #[case(Backend::Legacy, 4096)]
    #[case(Backend::BlockCodec, 1)]
    #[case(Backend::BlockCodec, 5)]
    #[case(Backend::BlockCodec, 4096)]
    fn test_resolves_and_round_trips(#[case] backend: Backend, #[case] chunk: usize) {
        let input = b"sniffed and redispatched ".repeat(64);
        let compressed = compress(&input, backend).unwrap();

        let mut inflate = InflateStream::init().unwrap();
        let output = decompress_all(&mut inflate, &compressed, chunk);

        assert_eq!(output, input);
        assert_eq!(inflate.resolved(), Some(backend));
        assert_eq!(inflate.state(), DecodeState::Finished);
        assert_eq!(inflate.total_in(), compressed.len() as u64);
        assert_eq!(inflate.total_out(), input.len() as u64);
    }

    #[test]
    fn test_partial_header_stays_unresolved() {
        let mut inflate = InflateStream::init().unwrap();
        let progress = inflate
            .process(&[0x28, 0xb5, 0x2f], &mut [0u8; 16], FlushMode::NoFlush)
            .unwrap();

        assert_eq!(progress, Progress::new(3, 0, Status::Ok));
        assert_eq!(inflate.state(), DecodeState::AwaitingHeader);
        assert_eq!(inflate.resolved(), None);

        let finished = inflate.finish(&mut [0u8; 16]).unwrap();
        assert_eq!(finished, Progress::idle());
    }

    #[test]
    fn test_zero_output_room_consumes_nothing() {
        let mut inflate = InflateStream::init().unwrap();
        let progress = inflate
            .process(&BLOCK_CODEC_MAGIC.to_le_bytes(), &mut [], FlushMode::NoFlush)
            .unwrap();

        assert_eq!(progress, Progress::idle());
        assert_eq!(inflate.state(), DecodeState::AwaitingHeader);
        assert_eq!(inflate.total_in(), 0);
    }

    #[test]
    fn test_block_codec_failure_budget() {
        let mut input = BLOCK_CODEC_MAGIC.to_le_bytes().to_vec();
        input.extend_from_slice(&[0x08, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut inflate = InflateStream::init().unwrap();
        let mut output = [0u8; 64];

        let first = inflate
            .process(&input, &mut output, FlushMode::NoFlush)
            .unwrap();
        assert_eq!(first, Progress::new(4, 0, Status::NeedDictionary));
        assert_eq!(inflate.resolved(), Some(Backend::BlockCodec));
        assert!(!inflate.is_finalized());

        let second = inflate.process(&input[first.consumed..], &mut output, FlushMode::NoFlush);
        assert!(matches!(second, Err(Error::StreamCorrupt { .. })));
        assert!(inflate.is_finalized());
        assert_eq!(inflate.state(), DecodeState::Failed);
        assert_eq!(inflate.resolved(), Some(Backend::BlockCodec));
        assert_eq!(
            inflate.process(&input, &mut output, FlushMode::NoFlush),
            Err(Error::Finalized)
        );
        inflate.end();
    }

    #[test]
    fn test_legacy_corruption_is_fatal() {
        let mut inflate = InflateStream::init().unwrap();
        let result = inflate.process(
            &[0x78, 0x9c, 0xff, 0xff, 0xff, 0xff],
            &mut [0u8; 64],
            FlushMode::NoFlush,
        );

        assert!(matches!(result, Err(Error::Data { .. })));
        assert_eq!(inflate.state(), DecodeState::Failed);
        assert!(inflate.is_finalized());
    }

    #[test]
    fn test_full_flush_denied_after_block_resolution() {
        let compressed = compress(b"full flush", Backend::BlockCodec).unwrap();
        let mut inflate = InflateStream::init().unwrap();
        inflate
            .process(&compressed[..4], &mut [0u8; 64], FlushMode::NoFlush)
            .unwrap();

        let err = inflate
            .process(&compressed[4..], &mut [0u8; 64], FlushMode::FullFlush)
            .unwrap_err();
        assert_eq!(err, Error::unsupported("full_flush", Backend::BlockCodec));
        assert!(!inflate.is_finalized());
    }

    #[rstest]
    #[case(4)]
    #[case(usize::MAX)]
    fn test_full_flush_denied_on_resolving_call(#[case] split: usize) {
        let compressed = compress(&[3u8; 100], Backend::BlockCodec).unwrap();
        let first = &compressed[..split.min(compressed.len())];
        let mut inflate = InflateStream::init().unwrap();

        let err = inflate
            .process(first, &mut [0u8; 128], FlushMode::FullFlush)
            .unwrap_err();
        assert_eq!(err, Error::unsupported("full_flush", Backend::BlockCodec));
        assert_eq!(inflate.state(), DecodeState::AwaitingHeader);
        assert_eq!(inflate.resolved(), None);
        assert_eq!(inflate.total_in(), 0);

        let output = decompress_all(&mut inflate, &compressed, 64);
        assert_eq!(output, vec![3u8; 100]);
    }

    #[test]
    fn test_full_flush_allowed_on_legacy_resolution() {
        let compressed = compress(b"legacy full flush", Backend::Legacy).unwrap();
        let mut inflate = InflateStream::init().unwrap();
        let progress = inflate
            .process(&compressed, &mut [0u8; 64], FlushMode::FullFlush)
            .unwrap();
        assert_eq!(progress.status, Status::StreamEnd);
        assert_eq!(inflate.resolved(), Some(Backend::Legacy));
    }

    #[test]
    fn test_header_count_survives_teardown() {
        let mut inflate = InflateStream::init().unwrap();
        let result = inflate.process(
            &[0x78, 0x9c, 0xff, 0xff, 0xff, 0xff],
            &mut [0u8; 64],
            FlushMode::NoFlush,
        );
        assert!(result.is_err());
        assert!(inflate.is_finalized());
        assert!(format!("{:?}", inflate).contains("header_filled: 4"));
    }

    #[test]
    fn test_wrong_early_dictionary_is_a_mismatch() {
        let dictionary = b"the dictionary both sides agreed on";
        let compressed = legacy_stream(
            StreamParams::default(),
            Some(dictionary.as_slice()),
            b"dictionary payload",
        );

        let mut inflate = InflateStream::init().unwrap();
        inflate.set_dictionary(b"some other dictionary").unwrap();
        let progress = inflate
            .process(&compressed, &mut [0u8; 64], FlushMode::NoFlush)
            .unwrap();

        assert_eq!(progress.status, Status::NeedDictionary);
        assert_eq!(
            inflate.last_error(),
            Some(&Error::DictionaryMismatch {
                expected: adler32(ADLER32_INIT, dictionary)
            })
        );
        let err = inflate.set_dictionary(b"still the wrong one").unwrap_err();
        assert!(matches!(err, Error::DictionaryMismatch { .. }));
        assert!(!inflate.is_finalized());
    }

    #[test]
    fn test_gzip_stream_drops_early_dictionary() {
        let gzip = WindowBits::new(31).unwrap();
        let options = InflateOptions::default().with_window_bits(gzip);
        let params = StreamParams {
            window_bits: gzip,
            ..StreamParams::default()
        };
        let compressed = legacy_stream(params, None, b"gzip member");

        let mut inflate = InflateStream::with_options(options).unwrap();
        inflate.set_dictionary(b"unusable").unwrap();
        let output = decompress_all(&mut inflate, &compressed, 3);

        assert_eq!(output, b"gzip member");
        assert_eq!(inflate.dictionary(), None);
        assert!(matches!(
            inflate.last_error(),
            Some(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_dictionary_too_late_after_block_payload() {
        let compressed = compress(&[9u8; 2048], Backend::BlockCodec).unwrap();
        let mut inflate = InflateStream::init().unwrap();
        inflate
            .process(&compressed[..8], &mut [0u8; 64], FlushMode::NoFlush)
            .unwrap();

        let err = inflate.set_dictionary(b"late").unwrap_err();
        assert!(matches!(err, Error::DictionaryTooLate { .. }));
        assert!(!inflate.is_finalized());
    }

    #[rstest]
    #[case(Backend::Legacy)]
    #[case(Backend::BlockCodec)]
    fn test_reset_keeps_resolved_backend(#[case] backend: Backend) {
        let input = b"decode me twice".repeat(10);
        let compressed = compress(&input, backend).unwrap();
        let mut inflate = InflateStream::init().unwrap();
        assert_eq!(decompress_all(&mut inflate, &compressed, 7), input);

        inflate.reset().unwrap();
        assert_eq!(inflate.state(), DecodeState::Delegating);
        assert_eq!(inflate.total_in(), 0);
        assert_eq!(decompress_all(&mut inflate, &compressed, 7), input);
        assert_eq!(inflate.resolved(), Some(backend));
    }

    #[test]
    fn test_copy_before_resolution() {
        let compressed = compress(b"copy before resolution", Backend::BlockCodec).unwrap();
        let mut original = InflateStream::init().unwrap();
        original
            .process(&compressed[..2], &mut [0u8; 8], FlushMode::NoFlush)
            .unwrap();

        let mut copy = original.copy().unwrap();
        assert_eq!(copy.total_in(), 2);
        let a = decompress_all(&mut original, &compressed[2..], 64);
        let b = decompress_all(&mut copy, &compressed[2..], 64);
        assert_eq!(a, b);
        assert!(matches!(original.copy(), Err(Error::Unsupported { .. })));
    }

    #[test]
    fn test_abandoned_context_releases_memory() {
        let counting = Arc::new(CountingAllocator::new());
        let compressed = compress(&[1u8; 1000], Backend::BlockCodec).unwrap();
        {
            let mut inflate = InflateStream::with_options(
                InflateOptions::default().with_allocator(counting.clone()),
            )
            .unwrap();
            inflate.set_dictionary(b"unused dictionary").unwrap();
            inflate
                .process(&compressed[..10], &mut [0u8; 8], FlushMode::NoFlush)
                .unwrap();
            assert!(counting.live_bytes() > 0);
        }
        assert_eq!(counting.live_bytes(), 0);
    }
}
