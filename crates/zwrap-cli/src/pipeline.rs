//! Pump readers and writers through the stream adapters

use anyhow::{bail, Context, Result};
use std::io::{Read, Write};
use tracing::{debug, trace};
use zwrap_compression::{DeflateStream, InflateStream};
use zwrap_types::{FlushMode, Status, StreamTotals};

/// Compress everything `reader` yields into `writer`
pub fn compress<R: Read, W: Write>(
    stream: &mut DeflateStream,
    reader: &mut R,
    writer: &mut W,
    buffer_size: usize,
) -> Result<StreamTotals> {
    let mut input = vec![0u8; buffer_size];
    let mut output = vec![0u8; buffer_size];

    loop {
        let read = reader.read(&mut input).context("Failed to read input")?;
        if read == 0 {
            break;
        }
        let mut offset = 0;
        while offset < read {
            let progress = stream.process(&input[offset..read], &mut output, FlushMode::NoFlush)?;
            offset += progress.consumed;
            writer
                .write_all(&output[..progress.produced])
                .context("Failed to write output")?;
            trace!(consumed = progress.consumed, produced = progress.produced, "compress step");
        }
    }

    loop {
        let progress = stream.finish(&mut output)?;
        writer
            .write_all(&output[..progress.produced])
            .context("Failed to write output")?;
        if progress.is_stream_end() {
            break;
        }
    }
    writer.flush().context("Failed to flush output")?;

    let totals = stream.totals();
    debug!(backend = %stream.backend(), total_in = totals.total_in, total_out = totals.total_out, "compressed");
    Ok(totals)
}

/// Decompress one stream from `reader` into `writer`
///
/// Any dictionary must already be registered on `stream`; a request for one
/// here means none was given or it did not match.
pub fn decompress<R: Read, W: Write>(
    stream: &mut InflateStream,
    reader: &mut R,
    writer: &mut W,
    buffer_size: usize,
) -> Result<StreamTotals> {
    let mut input = vec![0u8; buffer_size];
    let mut output = vec![0u8; buffer_size];
    let mut read = 0;
    let mut offset = 0;
    let mut eof = false;

    loop {
        if offset == read && !eof {
            read = reader.read(&mut input).context("Failed to read input")?;
            offset = 0;
            eof = read == 0;
        }

        let progress = stream.process(&input[offset..read], &mut output, FlushMode::NoFlush)?;
        offset += progress.consumed;
        writer
            .write_all(&output[..progress.produced])
            .context("Failed to write output")?;

        match progress.status {
            Status::StreamEnd => break,
            Status::NeedDictionary => {
                bail!("stream needs a preset dictionary (pass --dict with the matching file)")
            }
            Status::Ok => {}
        }

        let stalled = progress.consumed == 0 && progress.produced < output.len();
        if stalled && eof {
            bail!(
                "input ended before the compressed stream was complete ({} bytes read)",
                stream.total_in()
            );
        }
        if stalled && offset < read {
            bail!("decoder stopped at byte {}", stream.total_in());
        }
    }
    writer.flush().context("Failed to flush output")?;

    let totals = stream.totals();
    debug!(
        backend = ?stream.resolved(),
        total_in = totals.total_in,
        total_out = totals.total_out,
        "decompressed"
    );
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;
    use zwrap_compression::DeflateOptions;
    use zwrap_types::Backend;

    fn sample() -> Vec<u8> {
        (0..50_000u32).map(|i| (i % 251) as u8).collect()
    }

    #[rstest]
    #[case(Backend::Legacy, 4096)]
    #[case(Backend::BlockCodec, 4096)]
    #[case(Backend::Legacy, 64)]
    #[case(Backend::BlockCodec, 7)]
    fn test_pipeline_roundtrip(#[case] backend: Backend, #[case] buffer_size: usize) {
        let data = sample();
        let mut deflate =
            DeflateStream::with_options(DeflateOptions::default().with_backend(backend)).unwrap();
        let mut compressed = Vec::new();
        let totals = compress(&mut deflate, &mut Cursor::new(&data), &mut compressed, buffer_size)
            .unwrap();
        assert_eq!(totals.total_in, data.len() as u64);
        assert_eq!(totals.total_out, compressed.len() as u64);

        let mut inflate = InflateStream::init().unwrap();
        let mut restored = Vec::new();
        decompress(&mut inflate, &mut Cursor::new(&compressed), &mut restored, buffer_size)
            .unwrap();
        assert_eq!(restored, data);
        assert_eq!(inflate.resolved(), Some(backend));
    }

    #[test]
    fn test_truncated_input_is_reported() {
        let data = sample();
        let mut deflate = DeflateStream::with_options(
            DeflateOptions::default().with_backend(Backend::Legacy),
        )
        .unwrap();
        let mut compressed = Vec::new();
        compress(&mut deflate, &mut Cursor::new(&data), &mut compressed, 4096).unwrap();
        compressed.truncate(compressed.len() / 2);

        let mut inflate = InflateStream::init().unwrap();
        let error = decompress(&mut inflate, &mut Cursor::new(&compressed), &mut Vec::new(), 4096)
            .unwrap_err();
        assert!(error.to_string().contains("input ended"));
    }

    #[test]
    fn test_missing_dictionary_is_reported() {
        let mut deflate = DeflateStream::with_options(
            DeflateOptions::default().with_backend(Backend::Legacy),
        )
        .unwrap();
        deflate.set_dictionary(b"shared dictionary").unwrap();
        let mut compressed = Vec::new();
        compress(
            &mut deflate,
            &mut Cursor::new(b"shared dictionary text"),
            &mut compressed,
            4096,
        )
        .unwrap();

        let mut inflate = InflateStream::init().unwrap();
        let error = decompress(&mut inflate, &mut Cursor::new(&compressed), &mut Vec::new(), 4096)
            .unwrap_err();
        assert!(error.to_string().contains("preset dictionary"));
    }
}
