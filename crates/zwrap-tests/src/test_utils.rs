//! Shared test utilities for zwrap integration tests
//!
//! Data generators plus small drivers that push whole buffers through the
//! streaming adapters in fixed-size pieces.

use zwrap_compression::{DeflateOptions, DeflateStream, InflateStream};
use zwrap_types::{Backend, FlushMode, Status};

/// Test data generation patterns
#[derive(Debug, Clone, Copy)]
pub enum TestDataPattern {
    /// All zeros - highly compressible
    Zeros,
    /// Deterministic pseudo-random bytes - incompressible
    Random,
    /// Mixed compressible/incompressible data
    Mixed,
    /// Printable text with repeated words
    Text,
    /// `0x00..=0xFF` repeated
    ByteCycle,
}

impl TestDataPattern {
    /// Every pattern
    pub const ALL: [TestDataPattern; 5] = [
        TestDataPattern::Zeros,
        TestDataPattern::Random,
        TestDataPattern::Mixed,
        TestDataPattern::Text,
        TestDataPattern::ByteCycle,
    ];
}

/// Generate test data with specified pattern
pub fn generate_test_data(size: usize, pattern: TestDataPattern) -> Vec<u8> {
    match pattern {
        TestDataPattern::Zeros => vec![0u8; size],
        TestDataPattern::Random => {
            // xorshift keeps the data reproducible across runs
            let mut state = 0x2545_F491_4F6C_DD1Du64;
            (0..size)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    (state >> 24) as u8
                })
                .collect()
        }
        TestDataPattern::Mixed => (0..size)
            .map(|i| match i % 1000 {
                0..=99 => 0,
                100..=199 => 255,
                _ => (i % 256) as u8,
            })
            .collect(),
        TestDataPattern::Text => {
            const WORDS: &[&str] = &["stream ", "backend ", "header ", "frame ", "deflate "];
            WORDS
                .iter()
                .cycle()
                .flat_map(|word| word.bytes())
                .take(size)
                .collect()
        }
        TestDataPattern::ByteCycle => (0..size).map(|i| (i % 256) as u8).collect(),
    }
}

/// Common data sizes for tests
pub struct CommonSizes;

impl CommonSizes {
    /// Empty input
    pub const EMPTY: usize = 0;
    /// Shorter than the four-byte header
    pub const TINY: usize = 3;
    /// 4KB
    pub const SMALL: usize = 4 * 1024;
    /// 200KB, larger than one block-codec block
    pub const LARGE: usize = 200 * 1024;

    /// Sizes worth running every property against
    pub fn all() -> Vec<(&'static str, usize)> {
        vec![
            ("empty", Self::EMPTY),
            ("tiny", Self::TINY),
            ("4KB", Self::SMALL),
            ("200KB", Self::LARGE),
        ]
    }
}

/// Compress `data`, feeding `in_chunk` bytes and offering `out_chunk` bytes of room per call
pub fn compress_chunked(
    backend: Backend,
    data: &[u8],
    in_chunk: usize,
    out_chunk: usize,
) -> Vec<u8> {
    let mut stream = DeflateStream::with_options(DeflateOptions::default().with_backend(backend))
        .expect("Failed to create compressor");
    let compressed = compress_with(&mut stream, data, in_chunk, out_chunk);
    stream.end();
    compressed
}

/// Drive an existing compressor over `data` and finish it
pub fn compress_with(
    stream: &mut DeflateStream,
    data: &[u8],
    in_chunk: usize,
    out_chunk: usize,
) -> Vec<u8> {
    let mut buffer = vec![0u8; out_chunk];
    let mut compressed = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let end = (offset + in_chunk).min(data.len());
        let progress = stream
            .process(&data[offset..end], &mut buffer, FlushMode::NoFlush)
            .expect("Compression step failed");
        offset += progress.consumed;
        compressed.extend_from_slice(&buffer[..progress.produced]);
    }
    loop {
        let progress = stream.finish(&mut buffer).expect("Finish step failed");
        compressed.extend_from_slice(&buffer[..progress.produced]);
        if progress.is_stream_end() {
            return compressed;
        }
    }
}

/// Decompress a complete stream with a fresh context
pub fn decompress_chunked(data: &[u8], in_chunk: usize, out_chunk: usize) -> Decoded {
    let mut stream = InflateStream::init().expect("Failed to create decompressor");
    let decoded = decompress_with(&mut stream, data, in_chunk, out_chunk);
    stream.end();
    decoded
}

/// Drive an existing decompressor until the stream ends
///
/// Panics if the stream asks for a dictionary or stops making progress.
pub fn decompress_with(
    stream: &mut InflateStream,
    data: &[u8],
    in_chunk: usize,
    out_chunk: usize,
) -> Decoded {
    let mut buffer = vec![0u8; out_chunk];
    let mut output = Vec::new();
    let mut offset = 0;
    loop {
        let end = (offset + in_chunk).min(data.len());
        let progress = stream
            .process(&data[offset..end], &mut buffer, FlushMode::NoFlush)
            .expect("Decompression step failed");
        offset += progress.consumed;
        output.extend_from_slice(&buffer[..progress.produced]);
        match progress.status {
            Status::StreamEnd => break,
            Status::NeedDictionary => panic!("unexpected dictionary request at byte {}", offset),
            Status::Ok => {
                assert!(
                    progress.consumed > 0 || progress.produced > 0,
                    "decompressor stalled at byte {}",
                    offset
                );
            }
        }
    }
    Decoded {
        output,
        backend: stream.resolved(),
        total_in: stream.total_in(),
        consumed: offset,
    }
}

/// Result of a full decompression run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Decompressed bytes
    pub output: Vec<u8>,
    /// Backend the context resolved to
    pub backend: Option<Backend>,
    /// Context's input counter at the end
    pub total_in: u64,
    /// Bytes the driver saw consumed
    pub consumed: usize,
}
