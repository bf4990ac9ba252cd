//! Allocator bridge
//!
//! A stream context is bound to exactly one [`Allocator`] when it is created.
//! Every piece of memory the context or its engine holds is reserved through
//! that binding as an RAII [`Reservation`], so releasing the context (by
//! `end`, by a fatal error, or by dropping it) returns the allocator to the
//! state it was in before the context existed.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::trace;
use zwrap_types::{Error, Result};

/// Caller-supplied allocate/free pair
///
/// Implementations must be thread-safe because a binding can be shared by a
/// context and its copies.
pub trait Allocator: Send + Sync + fmt::Debug {
    /// Grant `size` bytes, or refuse with `false`
    fn allocate(&self, size: usize) -> bool;

    /// Return `size` bytes previously granted by [`Allocator::allocate`]
    fn free(&self, size: usize);
}

/// Process default allocator; never refuses
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;

impl Allocator for SystemAllocator {
    fn allocate(&self, _size: usize) -> bool {
        true
    }

    fn free(&self, _size: usize) {}
}

/// Allocator that keeps live/peak accounting and can enforce a byte limit
#[derive(Debug, Default)]
pub struct CountingAllocator {
    live: AtomicUsize,
    peak: AtomicUsize,
    allocations: AtomicU64,
    frees: AtomicU64,
    limit: Option<usize>,
}

impl CountingAllocator {
    /// Create an unlimited counting allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator that refuses requests beyond `limit` live bytes
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Bytes currently granted and not yet freed
    pub fn live_bytes(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Largest number of live bytes observed
    pub fn peak_bytes(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Number of successful allocations
    pub fn allocation_count(&self) -> u64 {
        self.allocations.load(Ordering::Acquire)
    }

    /// Number of frees
    pub fn free_count(&self) -> u64 {
        self.frees.load(Ordering::Acquire)
    }
}

impl Allocator for CountingAllocator {
    fn allocate(&self, size: usize) -> bool {
        let mut current = self.live.load(Ordering::Acquire);
        loop {
            let next = match current.checked_add(size) {
                Some(next) => next,
                None => return false,
            };
            if self.limit.is_some_and(|limit| next > limit) {
                return false;
            }
            match self
                .live
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    self.peak.fetch_max(next, Ordering::AcqRel);
                    self.allocations.fetch_add(1, Ordering::AcqRel);
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    fn free(&self, size: usize) {
        self.live.fetch_sub(size, Ordering::AcqRel);
        self.frees.fetch_add(1, Ordering::AcqRel);
    }
}

/// The allocator a context was created with
///
/// Cloning shares the same allocator; there is no way to swap it afterwards.
#[derive(Clone, Debug)]
pub struct AllocatorBinding {
    allocator: Arc<dyn Allocator>,
    custom: bool,
}

impl AllocatorBinding {
    /// Bind to the process default allocator
    pub fn system() -> Self {
        Self {
            allocator: Arc::new(SystemAllocator),
            custom: false,
        }
    }

    /// Bind to a caller-supplied allocator
    pub fn custom(allocator: Arc<dyn Allocator>) -> Self {
        Self {
            allocator,
            custom: true,
        }
    }

    /// Custom allocator if given, process default otherwise
    pub fn from_option(allocator: Option<Arc<dyn Allocator>>) -> Self {
        allocator.map_or_else(Self::system, Self::custom)
    }

    /// Whether a caller-supplied allocator is in use
    pub fn is_custom(&self) -> bool {
        self.custom
    }

    /// Reserve `size` bytes for `purpose`
    pub fn reserve(&self, purpose: &'static str, size: usize) -> Result<Reservation> {
        if !self.allocator.allocate(size) {
            return Err(Error::memory(format!(
                "allocator refused {} bytes for {}",
                size, purpose
            )));
        }
        trace!(purpose, size, "reserved");
        Ok(Reservation {
            allocator: Arc::clone(&self.allocator),
            size,
            purpose,
        })
    }
}

impl Default for AllocatorBinding {
    fn default() -> Self {
        Self::system()
    }
}

/// Bytes held from an allocator, returned on drop
#[derive(Debug)]
pub struct Reservation {
    allocator: Arc<dyn Allocator>,
    size: usize,
    purpose: &'static str,
}

impl Reservation {
    /// Reserved byte count
    pub fn size(&self) -> usize {
        self.size
    }

    /// What the bytes are for
    pub fn purpose(&self) -> &'static str {
        self.purpose
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.allocator.free(self.size);
    }
}
