//! State shared by both stream directions

use crate::alloc::{AllocatorBinding, Reservation};
use tracing::warn;
use zwrap_types::{Error, Phase, Progress, Result, StreamTotals};

/// Bookkeeping of a context's header block
const CONTEXT_FOOTPRINT: usize = 256;

/// Phase, totals, last error and allocator binding of one stream context
#[derive(Debug)]
pub(crate) struct StreamCore {
    phase: Phase,
    totals: StreamTotals,
    last_error: Option<Error>,
    binding: AllocatorBinding,
    footprint: Option<Reservation>,
}

impl StreamCore {
    pub(crate) fn new(phase: Phase, binding: AllocatorBinding) -> Result<Self> {
        let footprint = binding.reserve("stream context", CONTEXT_FOOTPRINT)?;
        Ok(Self {
            phase,
            totals: StreamTotals::new(),
            last_error: None,
            binding,
            footprint: Some(footprint),
        })
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn binding(&self) -> &AllocatorBinding {
        &self.binding
    }

    pub(crate) fn totals(&self) -> StreamTotals {
        self.totals
    }

    pub(crate) fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }

    pub(crate) fn is_released(&self) -> bool {
        self.footprint.is_none()
    }

    /// `Err(Finalized)` once the context has been released
    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.is_released() {
            Err(Error::Finalized)
        } else {
            Ok(())
        }
    }

    pub(crate) fn record(&mut self, progress: &Progress) {
        self.totals.record(progress);
    }

    pub(crate) fn restore_totals(&mut self, totals: StreamTotals) {
        self.totals = totals;
    }

    pub(crate) fn reset_totals(&mut self) {
        self.totals = StreamTotals::new();
        self.last_error = None;
    }

    /// Remember `error`; returns whether the context must be torn down
    pub(crate) fn note_error(&mut self, error: &Error) -> bool {
        self.last_error = Some(error.clone());
        if error.is_fatal() {
            warn!(phase = ?self.phase, %error, "tearing down stream context");
            true
        } else {
            false
        }
    }

    pub(crate) fn release(&mut self) {
        self.footprint = None;
    }
}

/// Dictionary bytes held by a context
#[derive(Debug)]
pub(crate) struct Dictionary {
    bytes: Vec<u8>,
    _reservation: Reservation,
}

impl Dictionary {
    pub(crate) fn new(binding: &AllocatorBinding, bytes: &[u8]) -> Result<Self> {
        let reservation = binding.reserve("dictionary", bytes.len())?;
        Ok(Self {
            bytes: bytes.to_vec(),
            _reservation: reservation,
        })
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::CountingAllocator;
    use std::sync::Arc;
    use zwrap_types::Status;

    #[test]
    fn test_release_is_idempotent() {
        let counting = Arc::new(CountingAllocator::new());
        let mut core = StreamCore::new(Phase::Compress, AllocatorBinding::custom(counting.clone()))
            .unwrap();
        assert!(core.ensure_live().is_ok());

        core.release();
        core.release();
        assert_eq!(core.ensure_live(), Err(Error::Finalized));
        assert_eq!(counting.live_bytes(), 0);
    }

    #[test]
    fn test_note_error_classifies() {
        let mut core = StreamCore::new(Phase::Decompress, AllocatorBinding::system()).unwrap();
        assert!(!core.note_error(&Error::dictionary_too_late("late")));
        assert!(core.note_error(&Error::stream_corrupt("bad frame")));
        assert_eq!(core.last_error(), Some(&Error::stream_corrupt("bad frame")));
    }

    #[test]
    fn test_reset_totals() {
        let mut core = StreamCore::new(Phase::Compress, AllocatorBinding::system()).unwrap();
        core.record(&Progress::new(10, 4, Status::Ok));
        assert_eq!(core.totals().total_in, 10);
        core.reset_totals();
        assert_eq!(core.totals(), StreamTotals::new());
    }
}
