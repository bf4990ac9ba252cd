//! Configuration types for zwrap
//!
//! Validated counterparts of the legacy `deflateInit2` arguments, plus the
//! streaming buffer size used by the CLI.

use crate::{Backend, Error, Result};

/// Buffer size configuration with validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "usize", into = "usize"))]
pub struct BufferSize(usize);

impl BufferSize {
    /// Minimum buffer size (4KB)
    pub const MIN: usize = 4 * 1024;
    /// Maximum buffer size (64MB)
    pub const MAX: usize = 64 * 1024 * 1024;
    /// Default buffer size (128KB)
    pub const DEFAULT: usize = 128 * 1024;

    /// Create a new buffer size with validation
    pub fn new(size: usize) -> std::result::Result<Self, String> {
        if size < Self::MIN {
            Err(format!("Buffer size {} is below minimum {}", size, Self::MIN))
        } else if size > Self::MAX {
            Err(format!("Buffer size {} exceeds maximum {}", size, Self::MAX))
        } else if !size.is_power_of_two() {
            Err(format!("Buffer size {} must be a power of two", size))
        } else {
            Ok(Self(size))
        }
    }

    /// Get the buffer size value
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for BufferSize {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<usize> for BufferSize {
    type Error = String;

    fn try_from(size: usize) -> std::result::Result<Self, String> {
        Self::new(size)
    }
}

impl From<BufferSize> for usize {
    fn from(size: BufferSize) -> Self {
        size.0
    }
}

/// Compression level in legacy numbering, `-1` meaning "engine default"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompressionLevel(i32);

impl CompressionLevel {
    /// Let the engine pick
    pub const DEFAULT: i32 = -1;
    /// Legacy engine: store only
    pub const NONE: i32 = 0;
    /// Fastest compression
    pub const FASTEST: i32 = 1;
    /// Legacy engine: best compression
    pub const LEGACY_BEST: i32 = 9;
    /// Block codec: best compression
    pub const BLOCK_BEST: i32 = 22;
    /// Legacy engine default when `DEFAULT` is requested
    pub const LEGACY_DEFAULT: i32 = 6;
    /// Block codec default when `DEFAULT` is requested
    pub const BLOCK_DEFAULT: i32 = 5;

    /// Create a level valid for at least one backend
    pub fn new(level: i32) -> Result<Self> {
        if level < Self::DEFAULT || level > Self::BLOCK_BEST {
            Err(Error::invalid_parameter(
                "level",
                format!("{} is outside -1..={}", level, Self::BLOCK_BEST),
            ))
        } else {
            Ok(Self(level))
        }
    }

    /// Raw value as passed by the caller
    pub fn get(self) -> i32 {
        self.0
    }

    /// Whether the level was left to the engine
    pub fn is_default(self) -> bool {
        self.0 == Self::DEFAULT
    }

    /// Concrete level for `backend`, rejecting values it cannot honor
    pub fn resolve(self, backend: Backend) -> Result<i32> {
        match backend {
            Backend::Legacy => match self.0 {
                Self::DEFAULT => Ok(Self::LEGACY_DEFAULT),
                level @ Self::NONE..=Self::LEGACY_BEST => Ok(level),
                level => Err(Error::invalid_parameter(
                    "level",
                    format!("{} is outside 0..={} for the legacy backend", level, Self::LEGACY_BEST),
                )),
            },
            Backend::BlockCodec => match self.0 {
                Self::DEFAULT => Ok(Self::BLOCK_DEFAULT),
                // level 0 selects the block codec's own default
                level @ Self::NONE..=Self::BLOCK_BEST => Ok(level),
                level => Err(Error::invalid_parameter(
                    "level",
                    format!("{} is outside 0..={} for the block codec", level, Self::BLOCK_BEST),
                )),
            },
        }
    }
}

impl Default for CompressionLevel {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Container format selected by the legacy `windowBits` argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrapper {
    /// zlib header and Adler-32 trailer
    Zlib,
    /// Bare deflate data
    Raw,
    /// gzip header and CRC-32 trailer
    Gzip,
}

/// Legacy `windowBits` argument: sign and offset select the wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowBits(i8);

impl WindowBits {
    /// zlib default: 32 KiB window with zlib wrapper
    pub const DEFAULT: i8 = 15;

    /// Validate a `windowBits` value (`8..=15`, `-15..=-8` or `24..=31`)
    pub fn new(bits: i8) -> Result<Self> {
        match bits {
            8..=15 | -15..=-8 | 24..=31 => Ok(Self(bits)),
            other => Err(Error::invalid_parameter(
                "window_bits",
                format!("{} is not in 8..=15, -15..=-8 or 24..=31", other),
            )),
        }
    }

    /// Raw value as passed by the caller
    pub fn get(self) -> i8 {
        self.0
    }

    /// Wrapper format encoded in the value
    pub fn wrapper(self) -> Wrapper {
        match self.0 {
            b if b < 0 => Wrapper::Raw,
            b if b > 15 => Wrapper::Gzip,
            _ => Wrapper::Zlib,
        }
    }

    /// Base-two logarithm of the window; 8 is promoted to 9 like zlib does
    pub fn log2(self) -> u8 {
        let bits = match self.wrapper() {
            Wrapper::Raw => -self.0,
            Wrapper::Gzip => self.0 - 16,
            Wrapper::Zlib => self.0,
        };
        bits.max(9) as u8
    }
}

impl Default for WindowBits {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Legacy `memLevel` argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemLevel(u8);

impl MemLevel {
    /// zlib default
    pub const DEFAULT: u8 = 8;
    /// Largest accepted value
    pub const MAX: u8 = 9;

    /// Validate a `memLevel` value
    pub fn new(level: u8) -> Result<Self> {
        if level == 0 || level > Self::MAX {
            Err(Error::invalid_parameter(
                "mem_level",
                format!("{} is outside 1..={}", level, Self::MAX),
            ))
        } else {
            Ok(Self(level))
        }
    }

    /// Get the value
    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for MemLevel {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

/// Legacy compression strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Strategy {
    /// Normal matching
    #[default]
    Default,
    /// Tuned for filtered data
    Filtered,
    /// Huffman coding only
    HuffmanOnly,
    /// Run-length matching only
    Rle,
    /// Fixed Huffman codes only
    Fixed,
}

impl Strategy {
    /// Map the numeric legacy constant
    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(Self::Default),
            1 => Ok(Self::Filtered),
            2 => Ok(Self::HuffmanOnly),
            3 => Ok(Self::Rle),
            4 => Ok(Self::Fixed),
            other => Err(Error::invalid_parameter(
                "strategy",
                format!("{} is outside 0..=4", other),
            )),
        }
    }
}

/// Legacy compression method; only deflate exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// Method 8
    #[default]
    Deflated,
}

impl Method {
    /// Map the numeric legacy constant
    pub fn from_raw(raw: i32) -> Result<Self> {
        if raw == 8 {
            Ok(Self::Deflated)
        } else {
            Err(Error::invalid_parameter(
                "method",
                format!("{} is not deflate (8)", raw),
            ))
        }
    }
}

/// Full parameter set of an `init-with-params` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamParams {
    /// Compression level
    pub level: CompressionLevel,
    /// Compression method
    pub method: Method,
    /// Window size and wrapper
    pub window_bits: WindowBits,
    /// Internal state size hint
    pub mem_level: MemLevel,
    /// Matching strategy
    pub strategy: Strategy,
}

impl StreamParams {
    /// Defaults with an explicit level
    pub fn with_level(level: CompressionLevel) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// Validate raw legacy arguments
    pub fn from_raw(
        level: i32,
        method: i32,
        window_bits: i8,
        mem_level: u8,
        strategy: i32,
    ) -> Result<Self> {
        Ok(Self {
            level: CompressionLevel::new(level)?,
            method: Method::from_raw(method)?,
            window_bits: WindowBits::new(window_bits)?,
            mem_level: MemLevel::new(mem_level)?,
            strategy: Strategy::from_raw(strategy)?,
        })
    }
}
