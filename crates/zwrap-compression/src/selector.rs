//! Backend selector
//!
//! Constructors take an explicit [`Backend`]; the process-wide selector only
//! supplies the default when none is given. It is read once, when a
//! compression context is created. Decompression never consults it.
//!
//! Changing the selector while another thread is creating a context is a
//! race the caller can observe: that context gets either the old or the new
//! backend. Set it once at startup, before any context exists.

use std::sync::atomic::{AtomicU8, Ordering};
use tracing::debug;
use zwrap_types::Backend;

const LEGACY: u8 = 0;
const BLOCK_CODEC: u8 = 1;

static SELECTED: AtomicU8 = AtomicU8::new(LEGACY);

/// Choose the backend used by compression contexts created without one
pub fn set_backend(backend: Backend) {
    let raw = match backend {
        Backend::Legacy => LEGACY,
        Backend::BlockCodec => BLOCK_CODEC,
    };
    SELECTED.store(raw, Ordering::SeqCst);
    debug!(%backend, "default compression backend changed");
}

/// Backend new compression contexts use when none is given
pub fn current_backend() -> Backend {
    match SELECTED.load(Ordering::SeqCst) {
        BLOCK_CODEC => Backend::BlockCodec,
        _ => Backend::Legacy,
    }
}

/// Explicit choice if present, process default otherwise
pub(crate) fn resolve(explicit: Option<Backend>) -> Backend {
    explicit.unwrap_or_else(current_backend)
}
