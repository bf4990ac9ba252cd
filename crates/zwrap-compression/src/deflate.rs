//! Compression adapter
//!
//! A [`DeflateStream`] forwards a compress-direction session to the backend
//! chosen when it was created. The adapter buffers nothing of its own: input
//! goes straight into the engine, bounded by the caller's output room.

use crate::alloc::{Allocator, AllocatorBinding};
use crate::capability::{self, Operation};
use crate::context::{Dictionary, StreamCore};
use crate::engine::{self, EncoderState};
use crate::{oneshot, selector};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};
use zwrap_types::{
    Backend, CompressionLevel, Error, FlushMode, Phase, Progress, Result, Status, Strategy,
    StreamParams, StreamTotals,
};

/// Construction options for a [`DeflateStream`]
#[derive(Clone, Default)]
pub struct DeflateOptions {
    /// Backend; `None` reads the process-wide selector
    pub backend: Option<Backend>,
    /// Level and legacy init parameters
    pub params: StreamParams,
    /// Memory provider; `None` uses the process default
    pub allocator: Option<Arc<dyn Allocator>>,
}

impl DeflateOptions {
    /// Use `backend` regardless of the process-wide selector
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the compression level
    pub fn with_level(mut self, level: CompressionLevel) -> Self {
        self.params.level = level;
        self
    }

    /// Replace all init parameters
    pub fn with_params(mut self, params: StreamParams) -> Self {
        self.params = params;
        self
    }

    /// Route the context's memory through `allocator`
    pub fn with_allocator(mut self, allocator: Arc<dyn Allocator>) -> Self {
        self.allocator = Some(allocator);
        self
    }
}

impl fmt::Debug for DeflateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeflateOptions")
            .field("backend", &self.backend)
            .field("params", &self.params)
            .field("custom_allocator", &self.allocator.is_some())
            .finish()
    }
}

/// Compress-direction stream context
pub struct DeflateStream {
    core: StreamCore,
    backend: Backend,
    level: i32,
    params: StreamParams,
    engine: Option<Box<dyn EncoderState>>,
    dictionary: Option<Dictionary>,
    pending: usize,
    started: bool,
    finished: bool,
}

impl DeflateStream {
    /// Create a context at `level` with default parameters
    pub fn init(level: CompressionLevel) -> Result<Self> {
        Self::with_options(DeflateOptions::default().with_level(level))
    }

    /// Create a context from full legacy init parameters
    pub fn init_with_params(params: StreamParams) -> Result<Self> {
        Self::with_options(DeflateOptions::default().with_params(params))
    }

    /// Create a context from explicit options
    pub fn with_options(options: DeflateOptions) -> Result<Self> {
        let backend = selector::resolve(options.backend);
        Self::build(
            backend,
            options.params,
            AllocatorBinding::from_option(options.allocator),
        )
    }

    fn build(backend: Backend, params: StreamParams, binding: AllocatorBinding) -> Result<Self> {
        let level = params.level.resolve(backend)?;
        let core = StreamCore::new(Phase::Compress, binding)?;
        let engine = engine::create_encoder(backend, core.binding(), level, &params, None)?;
        debug!(
            %backend,
            level,
            custom_allocator = core.binding().is_custom(),
            "created compression context"
        );

        Ok(Self {
            core,
            backend,
            level,
            params,
            engine: Some(engine),
            dictionary: None,
            pending: 0,
            started: false,
            finished: false,
        })
    }

    /// Feed `input`, writing at most `output.len()` bytes
    ///
    /// Zero output room returns without touching the stream. Once the stream
    /// has ended every call reports `StreamEnd` with nothing moved.
    pub fn process(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<Progress> {
        self.core.ensure_live()?;
        if flush == FlushMode::FullFlush {
            self.check(Operation::FullFlush)?;
        }
        if self.finished {
            return Ok(Progress::new(0, 0, Status::StreamEnd));
        }
        if output.is_empty() {
            return Ok(Progress::idle());
        }

        let engine = self.engine.as_mut().ok_or(Error::Finalized)?;
        self.started = true;
        let step = match engine.encode(input, output, flush) {
            Ok(step) => step,
            Err(error) => return Err(self.fail(error)),
        };
        self.pending = step.pending;
        self.finished = step.finished;

        let status = if step.finished {
            Status::StreamEnd
        } else {
            Status::Ok
        };
        let progress = Progress::new(step.consumed, step.produced, status);
        self.core.record(&progress);
        trace!(
            consumed = step.consumed,
            produced = step.produced,
            pending = step.pending,
            ?flush,
            "deflate"
        );
        Ok(progress)
    }

    /// Drain pending output and end the stream
    ///
    /// `StreamEnd` means done; `Ok` means call again with more output room.
    pub fn finish(&mut self, output: &mut [u8]) -> Result<Progress> {
        self.process(&[], output, FlushMode::Finish)
    }

    /// Register a preset dictionary; only before the first `process` call
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        self.core.ensure_live()?;
        if self.started {
            let error = Error::dictionary_too_late("compression has already started");
            self.core.note_error(&error);
            return Err(error);
        }

        let stored = match Dictionary::new(self.core.binding(), dictionary) {
            Ok(stored) => stored,
            Err(error) => return Err(self.fail(error)),
        };
        let engine = self.engine.as_mut().ok_or(Error::Finalized)?;
        if let Err(error) = engine.set_dictionary(dictionary) {
            return Err(self.fail(error));
        }
        self.dictionary = Some(stored);
        debug!(len = dictionary.len(), backend = %self.backend, "installed compression dictionary");
        Ok(())
    }

    /// Dictionary registered on this context
    pub fn dictionary(&self) -> Option<&[u8]> {
        self.dictionary.as_ref().map(Dictionary::as_slice)
    }

    /// Change level and strategy mid-stream (legacy only)
    ///
    /// The strategy is recorded; the deflate engine only honours its default.
    pub fn set_params(&mut self, level: CompressionLevel, strategy: Strategy) -> Result<()> {
        self.core.ensure_live()?;
        self.check(Operation::Params)?;
        let resolved = match level.resolve(self.backend) {
            Ok(resolved) => resolved,
            Err(error) => {
                self.core.note_error(&error);
                return Err(error);
            }
        };

        let engine = self.engine.as_mut().ok_or(Error::Finalized)?;
        if let Err(error) = engine.set_level(resolved) {
            return Err(self.fail(error));
        }
        self.level = resolved;
        self.params.level = level;
        self.params.strategy = strategy;
        debug!(level = resolved, ?strategy, "changed compression parameters");
        Ok(())
    }

    /// Bytes a flush still has to emit (legacy only)
    pub fn pending(&self) -> Result<usize> {
        self.core.ensure_live()?;
        capability::ensure(Operation::Pending, Some(self.backend))?;
        Ok(self.pending)
    }

    /// Restart the session with the same backend, parameters and dictionary
    pub fn reset(&mut self) -> Result<()> {
        self.core.ensure_live()?;
        let engine = self.engine.as_mut().ok_or(Error::Finalized)?;
        if let Err(error) = engine.reset() {
            return Err(self.fail(error));
        }
        self.pending = 0;
        self.started = false;
        self.finished = false;
        self.core.reset_totals();
        debug!(backend = %self.backend, "reset compression context");
        Ok(())
    }

    /// Duplicate an unstarted legacy context
    ///
    /// The deflate engine cannot clone its internal state, so a context that
    /// has already processed data is rejected.
    pub fn copy(&self) -> Result<Self> {
        self.core.ensure_live()?;
        capability::ensure(Operation::Copy, Some(self.backend))?;
        if self.started {
            return Err(Error::invalid_parameter(
                "source",
                "a started legacy stream cannot be duplicated",
            ));
        }

        let mut copy = Self::build(self.backend, self.params, self.core.binding().clone())?;
        if let Some(dictionary) = &self.dictionary {
            copy.set_dictionary(dictionary.as_slice())?;
        }
        Ok(copy)
    }

    /// Worst-case compressed size of `input_len` bytes for this context
    pub fn bound(&self, input_len: usize) -> usize {
        oneshot::stream_bound(input_len, self.backend, &self.params)
    }

    /// Release the engine and dictionary; safe to call any number of times
    pub fn end(&mut self) {
        if self.core.is_released() {
            return;
        }
        self.teardown();
        debug!(backend = %self.backend, "released compression context");
    }

    /// Backend bound at creation
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Always [`Phase::Compress`]
    pub fn phase(&self) -> Phase {
        self.core.phase()
    }

    /// Engine level after resolving the default
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Init parameters as last configured
    pub fn params(&self) -> &StreamParams {
        &self.params
    }

    /// Cumulative byte counters
    pub fn totals(&self) -> StreamTotals {
        self.core.totals()
    }

    /// Bytes consumed so far
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

    /// Whether the end-of-stream marker has been written
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the engine has been released
    pub fn is_finalized(&self) -> bool {
        self.core.is_released()
    }

    fn check(&mut self, operation: Operation) -> Result<()> {
        capability::ensure(operation, Some(self.backend)).map_err(|error| {
            self.core.note_error(&error);
            error
        })
    }

    fn fail(&mut self, error: Error) -> Error {
        if self.core.note_error(&error) {
            self.teardown();
        }
        error
    }

    fn teardown(&mut self) {
        self.engine = None;
        self.dictionary = None;
        self.pending = 0;
        self.core.release();
    }
}

impl fmt::Debug for DeflateStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeflateStream")
            .field("backend", &self.backend)
            .field("level", &self.level)
            .field("totals", &self.core.totals())
            .field("pending", &self.pending)
            .field("finished", &self.finished)
            .field("finalized", &self.core.is_released())
            .finish()
    }
}
