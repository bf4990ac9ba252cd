//! Result type alias for zwrap operations

use crate::Error;

/// Result type alias for zwrap operations
pub type Result<T> = std::result::Result<T, Error>;
