//! zwrap integration test suite
//!
//! Cross-crate tests live under `tests/`; this library holds the data
//! generators and stream drivers they share.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Unified test utilities
pub mod test_utils;
