//! Capability stub layer
//!
//! Every operation of the legacy streaming surface is listed once in
//! [`CAPABILITY_TABLE`]. The verdict for an operation depends only on the
//! backend bound to the context, so repeated checks against the same binding
//! always agree.

use std::fmt;
use zwrap_types::{Backend, Error, Result};

/// Operations of the legacy streaming surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Feed / flush / finish
    Process,
    /// Restart a session keeping its configuration
    Reset,
    /// Worst-case output size
    Bound,
    /// Read back the registered dictionary
    GetDictionary,
    /// Register a preset dictionary
    SetDictionary,
    /// Adler-32 / CRC-32 helpers
    Checksum,
    /// Duplicate a live context
    Copy,
    /// Change level and strategy mid-stream
    Params,
    /// Fine-tune deflate match parameters
    Tune,
    /// Insert bits into the output stream
    Prime,
    /// Query bits not yet emitted
    Pending,
    /// Supply a gzip header
    SetHeader,
    /// Read a gzip header
    GetHeader,
    /// Flush and reset the compression history
    FullFlush,
    /// Report the decoder bit position
    Mark,
    /// Callback-driven inflate with a caller window
    BackInflate,
    /// Open a gzip file
    GzOpen,
    /// Read from a gzip file
    GzRead,
    /// Write to a gzip file
    GzWrite,
    /// Close a gzip file
    GzClose,
}

impl Operation {
    /// Stable name used in error messages
    pub fn name(self) -> &'static str {
        match self {
            Operation::Process => "process",
            Operation::Reset => "reset",
            Operation::Bound => "bound",
            Operation::GetDictionary => "get_dictionary",
            Operation::SetDictionary => "set_dictionary",
            Operation::Checksum => "checksum",
            Operation::Copy => "copy",
            Operation::Params => "params",
            Operation::Tune => "tune",
            Operation::Prime => "prime",
            Operation::Pending => "pending",
            Operation::SetHeader => "set_header",
            Operation::GetHeader => "get_header",
            Operation::FullFlush => "full_flush",
            Operation::Mark => "mark",
            Operation::BackInflate => "back_inflate",
            Operation::GzOpen => "gzopen",
            Operation::GzRead => "gzread",
            Operation::GzWrite => "gzwrite",
            Operation::GzClose => "gzclose",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which backends accept an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Valid on every backend
    Always,
    /// Invalid once the block codec is bound
    LegacyOnly,
}

/// Outcome of a capability check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Forward to the engine
    Allowed,
    /// Reject with `Unsupported`
    Denied,
}

/// The partition of the legacy surface
pub const CAPABILITY_TABLE: &[(Operation, Scope)] = &[
    (Operation::Process, Scope::Always),
    (Operation::Reset, Scope::Always),
    (Operation::Bound, Scope::Always),
    (Operation::GetDictionary, Scope::Always),
    (Operation::SetDictionary, Scope::Always),
    (Operation::Checksum, Scope::Always),
    (Operation::Copy, Scope::LegacyOnly),
    (Operation::Params, Scope::LegacyOnly),
    (Operation::Tune, Scope::LegacyOnly),
    (Operation::Prime, Scope::LegacyOnly),
    (Operation::Pending, Scope::LegacyOnly),
    (Operation::SetHeader, Scope::LegacyOnly),
    (Operation::GetHeader, Scope::LegacyOnly),
    (Operation::FullFlush, Scope::LegacyOnly),
    (Operation::Mark, Scope::LegacyOnly),
    (Operation::BackInflate, Scope::LegacyOnly),
    (Operation::GzOpen, Scope::LegacyOnly),
    (Operation::GzRead, Scope::LegacyOnly),
    (Operation::GzWrite, Scope::LegacyOnly),
    (Operation::GzClose, Scope::LegacyOnly),
];

/// Scope of `operation` as listed in [`CAPABILITY_TABLE`]
pub fn scope(operation: Operation) -> Scope {
    CAPABILITY_TABLE
        .iter()
        .find(|(op, _)| *op == operation)
        .map_or(Scope::LegacyOnly, |(_, scope)| *scope)
}

/// Verdict for `operation` on a context bound to `backend`
///
/// `None` is an unresolved decompression context; nothing is denied until
/// the backend is known.
pub fn verdict(operation: Operation, backend: Option<Backend>) -> Verdict {
    match (scope(operation), backend) {
        (Scope::LegacyOnly, Some(Backend::BlockCodec)) => Verdict::Denied,
        _ => Verdict::Allowed,
    }
}

/// `Err(Unsupported)` when `operation` is denied for `backend`
pub fn ensure(operation: Operation, backend: Option<Backend>) -> Result<()> {
    match verdict(operation, backend) {
        Verdict::Allowed => Ok(()),
        Verdict::Denied => Err(Error::unsupported(operation.name(), Backend::BlockCodec)),
    }
}
