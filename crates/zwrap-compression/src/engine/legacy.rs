//! Deflate-family engine backed by `flate2` (zlib-rs)

use super::{
    legacy_decoder_footprint, legacy_encoder_footprint, DecodeFault, DecodeSignal, DecodeStep,
    DecoderState, EncodeStep, EncoderState,
};
use crate::alloc::{AllocatorBinding, Reservation};
use crate::checksum::{adler32, ADLER32_INIT};
use flate2::{
    Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status as FlateStatus,
};
use tracing::debug;
use zwrap_types::{Error, FlushMode, Result, StreamParams, WindowBits, Wrapper};

fn new_compress(level: i32, window_bits: WindowBits) -> Compress {
    let compression = Compression::new(level as u32);
    match window_bits.wrapper() {
        Wrapper::Zlib => Compress::new_with_window_bits(compression, true, window_bits.log2()),
        Wrapper::Raw => Compress::new_with_window_bits(compression, false, window_bits.log2()),
        Wrapper::Gzip => Compress::new_gzip(compression, window_bits.log2()),
    }
}

fn new_decompress(window_bits: WindowBits) -> Decompress {
    match window_bits.wrapper() {
        Wrapper::Zlib => Decompress::new_with_window_bits(true, window_bits.log2()),
        Wrapper::Raw => Decompress::new_with_window_bits(false, window_bits.log2()),
        Wrapper::Gzip => Decompress::new_gzip(window_bits.log2()),
    }
}

fn flush_compress(flush: FlushMode) -> FlushCompress {
    match flush {
        FlushMode::NoFlush => FlushCompress::None,
        FlushMode::SyncFlush => FlushCompress::Sync,
        FlushMode::FullFlush => FlushCompress::Full,
        FlushMode::Finish => FlushCompress::Finish,
    }
}

fn flush_decompress(flush: FlushMode) -> FlushDecompress {
    match flush {
        FlushMode::NoFlush => FlushDecompress::None,
        FlushMode::SyncFlush | FlushMode::FullFlush => FlushDecompress::Sync,
        FlushMode::Finish => FlushDecompress::Finish,
    }
}

/// Legacy deflate stream
pub(crate) struct LegacyEncoderState {
    inner: Compress,
    window_bits: WindowBits,
    dictionary: Option<Vec<u8>>,
    _reservation: Reservation,
}

impl LegacyEncoderState {
    pub(crate) fn new(binding: &AllocatorBinding, level: i32, params: &StreamParams) -> Result<Self> {
        let window_bits = params.window_bits;
        let reservation = binding.reserve(
            "legacy encoder",
            legacy_encoder_footprint(window_bits.log2(), params.mem_level.get()),
        )?;
        debug!(
            level,
            window_bits = window_bits.get(),
            mem_level = params.mem_level.get(),
            strategy = ?params.strategy,
            "created legacy encoder"
        );
        Ok(Self {
            inner: new_compress(level, window_bits),
            window_bits,
            dictionary: None,
            _reservation: reservation,
        })
    }
}

impl EncoderState for LegacyEncoderState {
    fn encode(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Result<EncodeStep> {
        let before_in = self.inner.total_in();
        let before_out = self.inner.total_out();
        let status = self
            .inner
            .compress(input, output, flush_compress(flush))
            .map_err(|e| Error::memory(format!("legacy encoder fault: {}", e)))?;

        let consumed = (self.inner.total_in() - before_in) as usize;
        let produced = (self.inner.total_out() - before_out) as usize;
        let finished = status == FlateStatus::StreamEnd;
        // zlib signals "call again" for flush and finish by filling the output
        let pending = match flush {
            FlushMode::NoFlush => 0,
            FlushMode::Finish if !finished => 1,
            FlushMode::Finish => 0,
            _ if produced == output.len() => 1,
            _ => 0,
        };

        Ok(EncodeStep {
            consumed,
            produced,
            pending,
            finished,
        })
    }

    fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        if self.window_bits.wrapper() == Wrapper::Gzip {
            return Err(Error::invalid_parameter(
                "dictionary",
                "gzip-wrapped streams cannot carry a preset dictionary",
            ));
        }
        self.inner
            .set_dictionary(dictionary)
            .map_err(|e| Error::dictionary_too_late(e.to_string()))?;
        self.dictionary = Some(dictionary.to_vec());
        Ok(())
    }

    fn set_level(&mut self, level: i32) -> Result<()> {
        self.inner
            .set_level(Compression::new(level as u32))
            .map_err(|e| {
                Error::invalid_parameter(
                    "level",
                    format!("pending output must be drained first: {}", e),
                )
            })
    }

    fn reset(&mut self) -> Result<()> {
        self.inner.reset();
        if let Some(dictionary) = &self.dictionary {
            self.inner
                .set_dictionary(dictionary)
                .map_err(|e| Error::memory(format!("legacy encoder fault: {}", e)))?;
        }
        Ok(())
    }
}

/// Legacy inflate stream
pub(crate) struct LegacyDecoderState {
    inner: Decompress,
    window_bits: WindowBits,
    /// Identifier of the dictionary the stream asked for and has not received
    pending_dictionary: Option<u32>,
    _reservation: Reservation,
}

impl LegacyDecoderState {
    pub(crate) fn new(binding: &AllocatorBinding, window_bits: WindowBits) -> Result<Self> {
        let reservation = binding.reserve(
            "legacy decoder",
            legacy_decoder_footprint(window_bits.log2()),
        )?;
        debug!(window_bits = window_bits.get(), "created legacy decoder");
        Ok(Self {
            inner: new_decompress(window_bits),
            window_bits,
            pending_dictionary: None,
            _reservation: reservation,
        })
    }
}

impl DecoderState for LegacyDecoderState {
    fn decode(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> std::result::Result<DecodeStep, DecodeFault> {
        let before_in = self.inner.total_in();
        let before_out = self.inner.total_out();
        let result = self
            .inner
            .decompress(input, output, flush_decompress(flush));
        let consumed = (self.inner.total_in() - before_in) as usize;
        let produced = (self.inner.total_out() - before_out) as usize;

        let signal = match result {
            Ok(FlateStatus::StreamEnd) => DecodeSignal::End,
            Ok(_) => DecodeSignal::Continue,
            Err(e) => match e.needs_dictionary() {
                Some(id) => {
                    self.pending_dictionary = Some(id);
                    DecodeSignal::NeedDictionary(id)
                }
                None => return Err(DecodeFault(e.to_string())),
            },
        };
        Ok(DecodeStep {
            consumed,
            produced,
            signal,
        })
    }

    fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        if self.window_bits.wrapper() == Wrapper::Gzip {
            return Err(Error::invalid_parameter(
                "dictionary",
                "gzip-wrapped streams cannot carry a preset dictionary",
            ));
        }
        // zlib-rs reports a wrong dictionary as a plain failure
        if let Some(expected) = self.pending_dictionary {
            if adler32(ADLER32_INIT, dictionary) != expected {
                return Err(Error::DictionaryMismatch { expected });
            }
        }
        match self.inner.set_dictionary(dictionary) {
            Ok(_) => {
                self.pending_dictionary = None;
                Ok(())
            }
            Err(e) => Err(match e.needs_dictionary() {
                Some(expected) => Error::DictionaryMismatch { expected },
                None => Error::dictionary_too_late(e.to_string()),
            }),
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.inner = new_decompress(self.window_bits);
        self.pending_dictionary = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_all(state: &mut LegacyEncoderState, input: &[u8]) -> Vec<u8> {
        let mut output = vec![0u8; input.len() + 64];
        let step = state.encode(input, &mut output, FlushMode::Finish).unwrap();
        assert!(step.finished);
        assert_eq!(step.consumed, input.len());
        output.truncate(step.produced);
        output
    }

    #[test]
    fn test_zlib_wrapper_round_trip() {
        let binding = AllocatorBinding::system();
        let params = StreamParams::default();
        let mut encoder = LegacyEncoderState::new(&binding, 6, &params).unwrap();
        let compressed = encode_all(&mut encoder, b"legacy engine round trip");
        assert_eq!(compressed[0], 0x78);

        let mut decoder = LegacyDecoderState::new(&binding, params.window_bits).unwrap();
        let mut output = [0u8; 64];
        let step = decoder
            .decode(&compressed, &mut output, FlushMode::NoFlush)
            .unwrap();
        assert_eq!(step.signal, DecodeSignal::End);
        assert_eq!(&output[..step.produced], b"legacy engine round trip");
    }

    #[test]
    fn test_decoder_reports_dictionary_id() {
        let binding = AllocatorBinding::system();
        let dictionary = b"shared preset dictionary";
        let mut encoder = LegacyEncoderState::new(&binding, 6, &StreamParams::default()).unwrap();
        encoder.set_dictionary(dictionary).unwrap();
        let compressed = encode_all(&mut encoder, b"shared preset payload");

        let mut decoder = LegacyDecoderState::new(&binding, WindowBits::default()).unwrap();
        let mut output = [0u8; 64];
        let step = decoder
            .decode(&compressed, &mut output, FlushMode::NoFlush)
            .unwrap();
        assert_eq!(
            step.signal,
            DecodeSignal::NeedDictionary(adler32(1, dictionary))
        );

        let err = decoder.set_dictionary(b"wrong dictionary").unwrap_err();
        assert_eq!(
            err,
            Error::DictionaryMismatch {
                expected: adler32(1, dictionary)
            }
        );
        decoder.set_dictionary(dictionary).unwrap();
        let rest = decoder
            .decode(&compressed[step.consumed..], &mut output, FlushMode::NoFlush)
            .unwrap();
        assert_eq!(rest.signal, DecodeSignal::End);
        assert_eq!(&output[..rest.produced], b"shared preset payload");
    }

    #[test]
    fn test_gzip_encoder_rejects_dictionary() {
        let binding = AllocatorBinding::system();
        let params = StreamParams {
            window_bits: WindowBits::new(31).unwrap(),
            ..StreamParams::default()
        };
        let mut encoder = LegacyEncoderState::new(&binding, 6, &params).unwrap();
        assert!(encoder.set_dictionary(b"dict").is_err());
        let compressed = encode_all(&mut encoder, b"gzip");
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_gzip_decoder_rejects_dictionary() {
        let binding = AllocatorBinding::system();
        let mut decoder = LegacyDecoderState::new(&binding, WindowBits::new(31).unwrap()).unwrap();
        let err = decoder.set_dictionary(b"dict").unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn test_reset_forgets_requested_dictionary() {
        let binding = AllocatorBinding::system();
        let dictionary = b"shared preset dictionary";
        let mut encoder = LegacyEncoderState::new(&binding, 6, &StreamParams::default()).unwrap();
        encoder.set_dictionary(dictionary).unwrap();
        let compressed = encode_all(&mut encoder, b"shared preset payload");

        let mut decoder = LegacyDecoderState::new(&binding, WindowBits::default()).unwrap();
        let mut output = [0u8; 64];
        decoder
            .decode(&compressed, &mut output, FlushMode::NoFlush)
            .unwrap();
        decoder.reset().unwrap();
        assert_eq!(decoder.pending_dictionary, None);
    }

    #[test]
    fn test_corrupt_input_is_a_fault() {
        let binding = AllocatorBinding::system();
        let mut decoder = LegacyDecoderState::new(&binding, WindowBits::default()).unwrap();
        let mut output = [0u8; 16];
        assert!(decoder
            .decode(&[0x78, 0x9c, 0xff, 0xff, 0xff], &mut output, FlushMode::NoFlush)
            .is_err());
    }
}
