//! Block-codec engine backed by `zstd::stream::raw`

use super::{
    block_encoder_footprint, DecodeFault, DecodeSignal, DecodeStep, DecoderState, EncodeStep,
    EncoderState, BLOCK_DECODER_FOOTPRINT,
};
use crate::alloc::{AllocatorBinding, Reservation};
use std::io;
use tracing::debug;
use zstd::stream::raw::{Decoder, Encoder, InBuffer, Operation, OutBuffer};
use zwrap_types::{Backend, Error, FlushMode, Result};

fn engine_fault(context: &str, error: &io::Error) -> Error {
    Error::memory(format!("block codec {}: {}", context, error))
}

fn build_encoder(level: i32, dictionary: Option<&[u8]>) -> Result<Encoder<'static>> {
    match dictionary {
        Some(dictionary) => Encoder::with_dictionary(level, dictionary),
        None => Encoder::new(level),
    }
    .map_err(|e| engine_fault("encoder init", &e))
}

fn build_decoder(dictionary: Option<&[u8]>) -> Result<Decoder<'static>> {
    match dictionary {
        Some(dictionary) => Decoder::with_dictionary(dictionary),
        None => Decoder::new(),
    }
    .map_err(|e| engine_fault("decoder init", &e))
}

/// Block-codec frame encoder
pub(crate) struct BlockEncoderState {
    encoder: Encoder<'static>,
    level: i32,
    binding: AllocatorBinding,
    _reservation: Reservation,
    dictionary: Option<Reservation>,
}

impl BlockEncoderState {
    pub(crate) fn new(
        binding: &AllocatorBinding,
        level: i32,
        dictionary: Option<&[u8]>,
    ) -> Result<Self> {
        let reservation = binding.reserve("block encoder", block_encoder_footprint(level))?;
        let dictionary_reservation = dictionary
            .map(|d| binding.reserve("block encoder dictionary", d.len()))
            .transpose()?;
        let encoder = build_encoder(level, dictionary)?;
        debug!(level, dictionary = dictionary.is_some(), "created block encoder");

        Ok(Self {
            encoder,
            level,
            binding: binding.clone(),
            _reservation: reservation,
            dictionary: dictionary_reservation,
        })
    }
}

impl EncoderState for BlockEncoderState {
    fn encode(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> Result<EncodeStep> {
        let mut out = OutBuffer::around(output);
        let mut consumed = 0;
        if !input.is_empty() {
            let mut src = InBuffer::around(input);
            self.encoder
                .run(&mut src, &mut out)
                .map_err(|e| engine_fault("compress", &e))?;
            consumed = src.pos();
        }

        let mut pending = 0;
        let mut finished = false;
        match flush {
            FlushMode::NoFlush => {}
            FlushMode::SyncFlush => {
                pending = self
                    .encoder
                    .flush(&mut out)
                    .map_err(|e| engine_fault("flush", &e))?;
            }
            FlushMode::FullFlush => {
                return Err(Error::unsupported("full_flush", Backend::BlockCodec));
            }
            // the frame may only be closed once every input byte is inside it
            FlushMode::Finish if consumed < input.len() => pending = 1,
            FlushMode::Finish => {
                pending = self
                    .encoder
                    .finish(&mut out, true)
                    .map_err(|e| engine_fault("end stream", &e))?;
                finished = pending == 0;
            }
        }

        Ok(EncodeStep {
            consumed,
            produced: out.pos(),
            pending,
            finished,
        })
    }

    fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        let reservation = self
            .binding
            .reserve("block encoder dictionary", dictionary.len())?;
        self.encoder = build_encoder(self.level, Some(dictionary))?;
        self.dictionary = Some(reservation);
        Ok(())
    }

    fn set_level(&mut self, _level: i32) -> Result<()> {
        Err(Error::unsupported("params", Backend::BlockCodec))
    }

    fn reset(&mut self) -> Result<()> {
        self.encoder
            .reinit()
            .map_err(|e| engine_fault("reset", &e))
    }
}

/// Block-codec frame decoder
pub(crate) struct BlockDecoderState {
    decoder: Decoder<'static>,
    binding: AllocatorBinding,
    _reservation: Reservation,
    dictionary: Option<Reservation>,
}

impl BlockDecoderState {
    pub(crate) fn new(binding: &AllocatorBinding, dictionary: Option<&[u8]>) -> Result<Self> {
        let reservation = binding.reserve("block decoder", BLOCK_DECODER_FOOTPRINT)?;
        let dictionary_reservation = dictionary
            .map(|d| binding.reserve("block decoder dictionary", d.len()))
            .transpose()?;
        let decoder = build_decoder(dictionary)?;
        debug!(dictionary = dictionary.is_some(), "created block decoder");

        Ok(Self {
            decoder,
            binding: binding.clone(),
            _reservation: reservation,
            dictionary: dictionary_reservation,
        })
    }
}

impl DecoderState for BlockDecoderState {
    fn decode(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        _flush: FlushMode,
    ) -> std::result::Result<DecodeStep, DecodeFault> {
        let mut src = InBuffer::around(input);
        let mut out = OutBuffer::around(output);
        let hint = self
            .decoder
            .run(&mut src, &mut out)
            .map_err(|e| DecodeFault(e.to_string()))?;

        Ok(DecodeStep {
            consumed: src.pos(),
            produced: out.pos(),
            signal: if hint == 0 {
                DecodeSignal::End
            } else {
                DecodeSignal::Continue
            },
        })
    }

    fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        let reservation = self
            .binding
            .reserve("block decoder dictionary", dictionary.len())?;
        self.decoder = build_decoder(Some(dictionary))?;
        self.dictionary = Some(reservation);
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.decoder
            .reinit()
            .map_err(|e| engine_fault("reset", &e))
    }
}
