//! Error handling tests for zwrap-compression

use crate::alloc::CountingAllocator;
use crate::deflate::{DeflateOptions, DeflateStream};
use crate::inflate::{InflateOptions, InflateStream};
use crate::oneshot::{compress, uncompress};
use std::sync::Arc;
use zwrap_types::{
    Backend, CompressionLevel, DecodeState, Error, ErrorKind, ErrorSeverity, FlushMode, Status,
    StreamParams, BLOCK_CODEC_MAGIC,
};

/// Corrupting the body of a legacy stream fails with a data error
#[test]
fn test_corrupted_legacy_body() {
    let input = b"Hello, world! This is test data.".repeat(8);
    let mut corrupted = compress(&input, Backend::Legacy).unwrap();
    let middle = corrupted.len() / 2;
    corrupted[middle] ^= 0xFF;
    corrupted[middle + 1] ^= 0xFF;

    match uncompress(&corrupted, input.len()) {
        Ok(output) => assert_ne!(output, input),
        Err(error) => assert!(matches!(error.kind(), ErrorKind::Data | ErrorKind::Buffer)),
    }
}

/// A truncated block-codec frame never reports the end of stream
#[test]
fn test_truncated_block_frame() {
    let input = vec![0x5Au8; 10_000];
    let compressed = compress(&input, Backend::BlockCodec).unwrap();
    let truncated = &compressed[..compressed.len() - 3];

    let mut inflate = InflateStream::init().unwrap();
    let mut output = vec![0u8; input.len()];
    let mut produced = 0;
    let mut offset = 0;
    loop {
        let progress = inflate
            .process(&truncated[offset..], &mut output[produced..], FlushMode::Finish)
            .unwrap();
        offset += progress.consumed;
        produced += progress.produced;
        assert_ne!(progress.status, Status::StreamEnd);
        if progress.consumed == 0 && progress.produced == 0 {
            break;
        }
    }
    assert_eq!(inflate.state(), DecodeState::Delegating);
}

/// Adversarial header: the magic followed by a reserved frame descriptor bit
#[test]
fn test_magic_collision_fails_cleanly() {
    let mut input = BLOCK_CODEC_MAGIC.to_le_bytes().to_vec();
    input.extend_from_slice(&[0x08; 32]);
    let mut inflate = InflateStream::init().unwrap();
    let mut output = [0u8; 128];
    let mut total_produced = 0;

    let first = inflate.process(&input, &mut output, FlushMode::NoFlush).unwrap();
    total_produced += first.produced;
    assert_eq!(first.status, Status::NeedDictionary);

    let second = inflate
        .process(&input[first.consumed..], &mut output, FlushMode::NoFlush)
        .unwrap_err();
    assert_eq!(second.kind(), ErrorKind::StreamCorrupt);
    assert_eq!(second.severity(), ErrorSeverity::Critical);
    assert_eq!(total_produced, 0);
    assert_eq!(inflate.last_error(), Some(&second));

    // end after a fatal error is a no-op
    inflate.end();
    inflate.end();
}

/// An allocator limit surfaces as a memory error and tears the context down
#[test]
fn test_allocator_limit_during_resolution() {
    let compressed = compress(b"needs a decoder", Backend::BlockCodec).unwrap();
    let limited = Arc::new(CountingAllocator::with_limit(4096));
    let mut inflate =
        InflateStream::with_options(InflateOptions::default().with_allocator(limited.clone()))
            .unwrap();

    let error = inflate
        .process(&compressed, &mut [0u8; 64], FlushMode::NoFlush)
        .unwrap_err();
    assert!(matches!(error, Error::Memory { .. }));
    assert_eq!(inflate.state(), DecodeState::Failed);
    assert_eq!(inflate.resolved(), Some(Backend::BlockCodec));
    assert_eq!(limited.live_bytes(), 0);
    assert_eq!(
        inflate.process(&compressed, &mut [0u8; 64], FlushMode::NoFlush),
        Err(Error::Finalized)
    );
}

/// Dictionary reservations count against the allocator limit
#[test]
fn test_dictionary_allocation_failure_is_fatal() {
    let limited = Arc::new(CountingAllocator::with_limit(600 * 1024));
    let mut deflate = DeflateStream::with_options(
        DeflateOptions::default()
            .with_backend(Backend::Legacy)
            .with_allocator(limited.clone()),
    )
    .unwrap();

    let huge = vec![0u8; 1024 * 1024];
    let error = deflate.set_dictionary(&huge).unwrap_err();
    assert!(error.is_fatal());
    assert!(deflate.is_finalized());
    assert_eq!(limited.live_bytes(), 0);
}

/// Invalid level for the chosen backend is rejected at init
#[test]
fn test_level_validated_per_backend() {
    let params = StreamParams::with_level(CompressionLevel::new(15).unwrap());
    let error = DeflateStream::with_options(
        DeflateOptions::default()
            .with_backend(Backend::Legacy)
            .with_params(params),
    )
    .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Parameter);

    assert!(DeflateStream::with_options(
        DeflateOptions::default()
            .with_backend(Backend::BlockCodec)
            .with_params(params),
    )
    .is_ok());
}

/// Legacy stream with a preset dictionary but no dictionary registered
#[test]
fn test_missing_legacy_dictionary_reports_need_dictionary() {
    let mut deflate = DeflateStream::with_options(
        DeflateOptions::default().with_backend(Backend::Legacy),
    )
    .unwrap();
    deflate.set_dictionary(b"preset bytes").unwrap();
    let mut compressed = vec![0u8; 256];
    let progress = deflate
        .process(b"preset bytes follow", &mut compressed, FlushMode::Finish)
        .unwrap();
    compressed.truncate(progress.produced);

    let mut inflate = InflateStream::init().unwrap();
    let mut output = [0u8; 64];
    let first = inflate.process(&compressed, &mut output, FlushMode::NoFlush).unwrap();
    assert_eq!(first.status, Status::NeedDictionary);
    assert!(!inflate.is_finalized());

    assert!(matches!(
        inflate.set_dictionary(b"wrong bytes"),
        Err(Error::DictionaryMismatch { .. })
    ));
    inflate.set_dictionary(b"preset bytes").unwrap();
    let rest = inflate
        .process(&compressed[first.consumed..], &mut output, FlushMode::NoFlush)
        .unwrap();
    assert!(rest.is_stream_end());
    assert_eq!(&output[..rest.produced], b"preset bytes follow");
}
