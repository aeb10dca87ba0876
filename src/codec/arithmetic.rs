use std::num::NonZeroUsize;

use super::{decode_fields, encode_fields, EntryCodec, QualityCoder, SequenceCoder, ARITHMETIC_ENTRY_CODE};
use crate::core::{BitReader, BitWriter};
use crate::entropy::{ArithmeticDecoder, ArithmeticEncoder};
use crate::error::Result;
use crate::record::Record;

/// Every byte value is a quality symbol
const QUALITY_SYMBOLS: NonZeroUsize = NonZeroUsize::new(256).unwrap();

/// Adaptive arithmetic coding of each quality score
#[derive(Debug, Clone)]
struct ArithmeticQuality {
    encoder: ArithmeticEncoder,
    decoder: ArithmeticDecoder,
}

impl QualityCoder for ArithmeticQuality {
    fn encode(&mut self, scores: &[u8], output: &mut BitWriter) -> Result<()> {
        for &score in scores {
            self.encoder.encode(usize::from(score), output)?;
        }
        self.encoder.flush(output);
        Ok(())
    }

    fn decode(&mut self, length: usize, input: &mut BitReader) -> Result<Vec<u8>> {
        let mut scores = Vec::with_capacity(length);
        for _ in 0..length {
            // the alphabet holds exactly 256 symbols
            scores.push(self.decoder.decode(input)? as u8);
        }
        self.decoder.reposition(input);
        Ok(scores)
    }

    fn new_chunk(&mut self) {
        self.encoder.new_chunk();
        self.decoder.new_chunk();
    }
}

/// Entry codec that arithmetic codes both sequences and quality scores
///
/// This is the first record coding of the format (registration code `1`). Quality
/// scores are coded directly as 256 adaptive symbols, which works well for
/// binned qualities with few distinct values.
#[derive(Debug, Clone)]
pub struct ArithmeticEntryCodec {
    sequences: SequenceCoder,
    qualities: ArithmeticQuality,
}

impl Default for ArithmeticEntryCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ArithmeticEntryCodec {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sequences: SequenceCoder::new(),
            qualities: ArithmeticQuality {
                encoder: ArithmeticEncoder::new(QUALITY_SYMBOLS),
                decoder: ArithmeticDecoder::new(QUALITY_SYMBOLS),
            },
        }
    }
}

impl EntryCodec for ArithmeticEntryCodec {
    fn name(&self) -> &'static str {
        "arithmetic"
    }

    fn registration_code(&self) -> u8 {
        ARITHMETIC_ENTRY_CODE
    }

    fn encode(&mut self, record: &Record, first_in_chunk: bool) -> Result<Option<Record>> {
        encode_fields(
            record,
            first_in_chunk,
            ARITHMETIC_ENTRY_CODE,
            &mut self.sequences,
            &mut self.qualities,
        )
    }

    fn decode(&mut self, record: &Record, first_in_chunk: bool) -> Result<Option<Record>> {
        decode_fields(
            record,
            first_in_chunk,
            ARITHMETIC_ENTRY_CODE,
            &mut self.sequences,
            &mut self.qualities,
        )
    }

    fn new_chunk(&mut self) {
        self.sequences.new_chunk();
        self.qualities.new_chunk();
    }
}
