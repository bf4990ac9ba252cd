//! Whole-buffer convenience wrappers
//!
//! These call the engines directly rather than going through the stream
//! adapters. `uncompress` applies the same four-byte sniffing rule as the
//! streaming decompressor; sources shorter than the header go to the legacy
//! engine.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use tracing::debug;
use zstd::stream::raw::{Decoder, InBuffer, Operation, OutBuffer};
use zwrap_types::{
    Backend, CompressionLevel, Error, Result, StreamParams, Wrapper, HEADER_SIZE,
};

/// zlib wrapper overhead: 2-byte header plus Adler-32 trailer
const ZLIB_WRAPPER_LEN: usize = 6;
/// gzip wrapper overhead: 10-byte header plus CRC-32 and size trailer
const GZIP_WRAPPER_LEN: usize = 18;

/// Backend that produced `src`
pub fn sniff(src: &[u8]) -> Backend {
    match src.get(..HEADER_SIZE) {
        Some(&[a, b, c, d]) => Backend::from_header([a, b, c, d]),
        _ => Backend::Legacy,
    }
}

/// Worst-case compressed size of `len` bytes with default parameters
pub fn compress_bound(len: usize, backend: Backend) -> usize {
    match backend {
        Backend::Legacy => len + (len >> 12) + (len >> 14) + (len >> 25) + 13,
        Backend::BlockCodec => zstd::zstd_safe::compress_bound(len),
    }
}

/// Worst-case size for a stream configured with `params`
pub(crate) fn stream_bound(len: usize, backend: Backend, params: &StreamParams) -> usize {
    if backend == Backend::BlockCodec {
        return compress_bound(len, backend);
    }

    let wrapper = match params.window_bits.wrapper() {
        Wrapper::Zlib => ZLIB_WRAPPER_LEN,
        Wrapper::Raw => 0,
        Wrapper::Gzip => GZIP_WRAPPER_LEN,
    };
    if params.window_bits.log2() == 15 && params.mem_level.get() == 8 {
        compress_bound(len, backend) - ZLIB_WRAPPER_LEN + wrapper
    } else {
        // conservative bound for non-default window or memory settings
        len + ((len + 7) >> 3) + ((len + 63) >> 6) + 5 + wrapper
    }
}

/// Compress `src` at the default level
pub fn compress(src: &[u8], backend: Backend) -> Result<Vec<u8>> {
    compress2(src, CompressionLevel::default(), backend)
}

/// Compress `src` at `level`
pub fn compress2(src: &[u8], level: CompressionLevel, backend: Backend) -> Result<Vec<u8>> {
    let mut dest = vec![0u8; compress_bound(src.len(), backend)];
    let written = compress_into(&mut dest, src, level, backend)?;
    dest.truncate(written);
    Ok(dest)
}

/// Compress `src` into `dest`, returning the compressed length
pub fn compress_into(
    dest: &mut [u8],
    src: &[u8],
    level: CompressionLevel,
    backend: Backend,
) -> Result<usize> {
    let level = level.resolve(backend)?;
    let written = match backend {
        Backend::Legacy => {
            let mut engine = Compress::new(Compression::new(level as u32), true);
            let status = engine
                .compress(src, dest, FlushCompress::Finish)
                .map_err(|e| Error::memory(format!("legacy encoder fault: {}", e)))?;
            if status != Status::StreamEnd {
                return Err(Error::Buffer {
                    capacity: dest.len(),
                });
            }
            engine.total_out() as usize
        }
        Backend::BlockCodec => {
            let capacity = dest.len();
            // below the bound, a failed call is a short destination
            let fits = capacity >= compress_bound(src.len(), backend);
            zstd::bulk::compress_to_buffer(src, dest, level).map_err(|e| {
                if fits {
                    Error::memory(format!("block codec compress: {}", e))
                } else {
                    Error::Buffer { capacity }
                }
            })?
        }
    };
    debug!(%backend, level, input = src.len(), output = written, "one-shot compress");
    Ok(written)
}

/// Decompress `src` into a buffer of at most `capacity` bytes
pub fn uncompress(src: &[u8], capacity: usize) -> Result<Vec<u8>> {
    let mut dest = vec![0u8; capacity];
    let written = uncompress_into(&mut dest, src)?;
    dest.truncate(written);
    Ok(dest)
}

/// Decompress `src` into `dest`, returning the decompressed length
pub fn uncompress_into(dest: &mut [u8], src: &[u8]) -> Result<usize> {
    let backend = sniff(src);
    let written = match backend {
        Backend::Legacy => {
            let mut engine = Decompress::new(true);
            match engine.decompress(src, dest, FlushDecompress::Finish) {
                Ok(Status::StreamEnd) => engine.total_out() as usize,
                Ok(_) if engine.total_out() as usize == dest.len() => {
                    return Err(Error::Buffer {
                        capacity: dest.len(),
                    })
                }
                Ok(_) => return Err(Error::data("truncated legacy stream")),
                Err(e) if e.needs_dictionary().is_some() => {
                    return Err(Error::data("stream requires a preset dictionary"))
                }
                Err(e) => return Err(Error::data(e.to_string())),
            }
        }
        Backend::BlockCodec => uncompress_frame(dest, src)?,
    };
    debug!(%backend, input = src.len(), output = written, "one-shot uncompress");
    Ok(written)
}

/// Decode one block-codec frame, telling a full `dest` apart from bad input
fn uncompress_frame(dest: &mut [u8], src: &[u8]) -> Result<usize> {
    let capacity = dest.len();
    let mut decoder =
        Decoder::new().map_err(|e| Error::memory(format!("block codec decoder: {}", e)))?;
    let mut input = InBuffer::around(src);
    let mut output = OutBuffer::around(dest);
    loop {
        let before = (input.pos(), output.pos());
        let hint = decoder
            .run(&mut input, &mut output)
            .map_err(|e| Error::stream_corrupt(e.to_string()))?;
        if hint == 0 {
            return Ok(output.pos());
        }
        if output.pos() == capacity {
            return Err(Error::Buffer { capacity });
        }
        if (input.pos(), output.pos()) == before {
            return Err(Error::stream_corrupt("truncated block-codec frame"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use zwrap_types::{WindowBits, BLOCK_CODEC_MAGIC};

    #[rstest]
    #[case(Backend::Legacy)]
    #[case(Backend::BlockCodec)]
    fn test_round_trip_sniffs_backend(#[case] backend: Backend) {
        let input: Vec<u8> = b"one-shot round trip ".repeat(100);
        let compressed = compress(&input, backend).unwrap();

        assert_eq!(sniff(&compressed), backend);
        assert_eq!(uncompress(&compressed, input.len()).unwrap(), input);
    }

    #[test]
    fn test_short_source_goes_to_legacy() {
        assert_eq!(sniff(&[0x28, 0xb5, 0x2f]), Backend::Legacy);
        assert!(matches!(uncompress(&[0x28, 0xb5], 16), Err(Error::Data { .. })));
        assert_eq!(sniff(&BLOCK_CODEC_MAGIC.to_le_bytes()), Backend::BlockCodec);
    }

    #[rstest]
    #[case(Backend::Legacy)]
    #[case(Backend::BlockCodec)]
    fn test_small_destination_is_a_buffer_error(#[case] backend: Backend) {
        let input = vec![3u8; 4096];
        let compressed = compress(&input, backend).unwrap();

        assert_eq!(
            uncompress(&compressed, 100),
            Err(Error::Buffer { capacity: 100 })
        );
        let mut tiny = [0u8; 4];
        assert_eq!(
            compress_into(&mut tiny, &input, CompressionLevel::default(), backend),
            Err(Error::Buffer { capacity: 4 })
        );
    }

    #[test]
    fn test_level_out_of_range_for_legacy() {
        let level = CompressionLevel::new(19).unwrap();
        assert!(compress2(b"x", level, Backend::BlockCodec).is_ok());
        assert!(matches!(
            compress2(b"x", level, Backend::Legacy),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_stream_bound_by_wrapper() {
        let zlib = StreamParams::default();
        let gzip = StreamParams {
            window_bits: WindowBits::new(31).unwrap(),
            ..StreamParams::default()
        };
        let raw = StreamParams {
            window_bits: WindowBits::new(-15).unwrap(),
            ..StreamParams::default()
        };

        assert_eq!(
            stream_bound(1000, Backend::Legacy, &zlib),
            compress_bound(1000, Backend::Legacy)
        );
        assert_eq!(
            stream_bound(1000, Backend::Legacy, &gzip),
            stream_bound(1000, Backend::Legacy, &raw) + GZIP_WRAPPER_LEN
        );
    }

    #[test]
    fn test_streamed_frame_without_content_size() {
        let input = vec![5u8; 4096];
        let mut deflate = crate::DeflateStream::with_options(
            crate::DeflateOptions::default().with_backend(Backend::BlockCodec),
        )
        .unwrap();
        let mut compressed = vec![0u8; compress_bound(input.len(), Backend::BlockCodec)];
        let step = deflate
            .process(&input, &mut compressed, zwrap_types::FlushMode::NoFlush)
            .unwrap();
        let mut len = step.produced;
        loop {
            let progress = deflate.finish(&mut compressed[len..]).unwrap();
            len += progress.produced;
            if progress.is_stream_end() {
                break;
            }
        }
        compressed.truncate(len);

        assert_eq!(
            uncompress(&compressed, 1000),
            Err(Error::Buffer { capacity: 1000 })
        );
        assert_eq!(uncompress(&compressed, input.len()).unwrap(), input);
    }

    #[test]
    fn test_truncated_block_frame() {
        let compressed = compress(&[7u8; 4096], Backend::BlockCodec).unwrap();
        let truncated = &compressed[..compressed.len() - 2];
        assert!(matches!(
            uncompress(truncated, 8192),
            Err(Error::StreamCorrupt { .. })
        ));
    }

    #[test]
    fn test_corrupt_block_frame() {
        let mut frame = BLOCK_CODEC_MAGIC.to_le_bytes().to_vec();
        frame.extend_from_slice(&[0x08, 0, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(
            uncompress(&frame, 64),
            Err(Error::StreamCorrupt { .. })
        ));
    }
}
