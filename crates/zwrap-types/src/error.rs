//! Error types and handling for zwrap
//!
//! Every adapter call returns its outcome explicitly. Errors are split by
//! severity: fatal ones tear the owning stream context down before the call
//! returns, the rest leave the context usable.

use crate::Backend;

/// Error severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Low severity - the call was rejected, the context is untouched
    Low,
    /// Medium severity - the call failed outside the engine (I/O, configuration, use after end)
    Medium,
    /// Critical severity - the engine state is lost and the context has been torn down
    Critical,
}

/// Main error type for zwrap operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Allocation failure or an unrecoverable engine fault
    #[error("Memory error: {message}")]
    Memory {
        /// Description of the failed allocation or engine fault
        message: String,
    },

    /// Operation denied for the backend bound to the context
    #[error("Operation `{operation}` is not supported by the {backend} backend")]
    Unsupported {
        /// Legacy operation name
        operation: &'static str,
        /// Backend that rejected the operation
        backend: Backend,
    },

    /// Block-codec stream could not be decoded
    #[error("Stream corrupt: {message}")]
    StreamCorrupt {
        /// Decoder diagnostic
        message: String,
    },

    /// Dictionary arrived after the engine stopped accepting one
    #[error("Dictionary set too late: {message}")]
    DictionaryTooLate {
        /// Engine diagnostic
        message: String,
    },

    /// Dictionary does not match the identifier recorded in the stream
    #[error("Dictionary mismatch: stream expects Adler-32 {expected:#010x}")]
    DictionaryMismatch {
        /// Identifier the stream header asked for
        expected: u32,
    },

    /// Invalid parameter passed to an init or tuning call
    #[error("Invalid parameter `{name}`: {message}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Why the value was rejected
        message: String,
    },

    /// Legacy stream could not be decoded
    #[error("Data error: {message}")]
    Data {
        /// Decoder diagnostic
        message: String,
    },

    /// One-shot destination capacity exceeded
    #[error("Output buffer too small: capacity {capacity} bytes")]
    Buffer {
        /// Capacity offered by the caller
        capacity: usize,
    },

    /// Call on a context whose engine has already been released
    #[error("Stream context already finalized")]
    Finalized,

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Allocation or engine fault
    Memory,
    /// Capability deny-list hit
    Unsupported,
    /// Corrupt block-codec stream
    StreamCorrupt,
    /// Dictionary rejected
    Dictionary,
    /// Invalid parameter
    Parameter,
    /// Corrupt legacy stream
    Data,
    /// Output capacity exhausted
    Buffer,
    /// Use after teardown
    Finalized,
    /// Configuration errors
    Config,
    /// I/O related errors
    Io,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Memory { .. } => ErrorKind::Memory,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::StreamCorrupt { .. } => ErrorKind::StreamCorrupt,
            Self::DictionaryTooLate { .. } | Self::DictionaryMismatch { .. } => {
                ErrorKind::Dictionary
            }
            Self::InvalidParameter { .. } => ErrorKind::Parameter,
            Self::Data { .. } => ErrorKind::Data,
            Self::Buffer { .. } => ErrorKind::Buffer,
            Self::Finalized => ErrorKind::Finalized,
            Self::Config { .. } => ErrorKind::Config,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Get the error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Memory { .. } | Self::StreamCorrupt { .. } | Self::Data { .. } => {
                ErrorSeverity::Critical
            }
            Self::Unsupported { .. }
            | Self::DictionaryTooLate { .. }
            | Self::DictionaryMismatch { .. }
            | Self::InvalidParameter { .. }
            | Self::Buffer { .. } => ErrorSeverity::Low,
            Self::Finalized | Self::Config { .. } | Self::Io { .. } => ErrorSeverity::Medium,
        }
    }

    /// Whether the context that produced this error has been torn down
    pub fn is_fatal(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Whether the caller may keep using the context after this error
    pub fn is_recoverable(&self) -> bool {
        self.severity() == ErrorSeverity::Low
    }

    /// Create a new memory error
    pub fn memory<S: Into<String>>(message: S) -> Self {
        Self::Memory {
            message: message.into(),
        }
    }

    /// Create a new unsupported-operation error
    pub fn unsupported(operation: &'static str, backend: Backend) -> Self {
        Self::Unsupported { operation, backend }
    }

    /// Create a new stream-corrupt error
    pub fn stream_corrupt<S: Into<String>>(message: S) -> Self {
        Self::StreamCorrupt {
            message: message.into(),
        }
    }

    /// Create a new dictionary-too-late error
    pub fn dictionary_too_late<S: Into<String>>(message: S) -> Self {
        Self::DictionaryTooLate {
            message: message.into(),
        }
    }

    /// Create a new invalid-parameter error
    pub fn invalid_parameter<S: Into<String>>(name: &'static str, message: S) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    /// Create a new legacy data error
    pub fn data<S: Into<String>>(message: S) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}
