use super::{decode_fields, encode_fields, EntryCodec, QualityCoder, SequenceCoder, DELTA_ENTRY_CODE};
use crate::core::{unzigzag, zigzag, BitReader, BitWriter};
use crate::error::{CodecError, Result};
use crate::record::Record;

/// Quality scores as gamma coded distances from the field maximum
///
/// Layout: the maximum score as 8 bits, then `gamma(zigzag(max - q) + 1)`
/// for every score `q`. The coding holds no adaptive state.
#[derive(Debug, Clone, Copy, Default)]
struct DeltaQuality;

impl QualityCoder for DeltaQuality {
    fn encode(&mut self, scores: &[u8], output: &mut BitWriter) -> Result<()> {
        let max = scores.iter().copied().max().unwrap_or(0);
        output.write_fixed(u64::from(max), 8)?;
        for &score in scores {
            let delta = i64::from(max) - i64::from(score);
            output.write_gamma(zigzag(delta) + 1)?;
        }
        Ok(())
    }

    fn decode(&mut self, length: usize, input: &mut BitReader) -> Result<Vec<u8>> {
        let max = input.read_fixed(8)? as i64;
        let mut scores = Vec::with_capacity(length);
        for _ in 0..length {
            let delta = unzigzag(input.read_gamma()? - 1);
            let score = u8::try_from(max - delta)
                .map_err(|_| CodecError::ModelDesync("quality delta out of range"))?;
            scores.push(score);
        }
        Ok(scores)
    }

    fn new_chunk(&mut self) {}
}

/// Entry codec with arithmetic coded sequences and gamma coded qualities
///
/// Registration code `2`. Unbinned quality strings tend to sit close to
/// their maximum, which the gamma code captures in a few bits per score
/// without having to learn a 256-symbol model.
#[derive(Debug, Clone)]
pub struct DeltaEntryCodec {
    sequences: SequenceCoder,
    qualities: DeltaQuality,
}

impl Default for DeltaEntryCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl DeltaEntryCodec {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sequences: SequenceCoder::new(),
            qualities: DeltaQuality,
        }
    }
}

impl EntryCodec for DeltaEntryCodec {
    fn name(&self) -> &'static str {
        "delta"
    }

    fn registration_code(&self) -> u8 {
        DELTA_ENTRY_CODE
    }

    fn encode(&mut self, record: &Record, first_in_chunk: bool) -> Result<Option<Record>> {
        encode_fields(
            record,
            first_in_chunk,
            DELTA_ENTRY_CODE,
            &mut self.sequences,
            &mut self.qualities,
        )
    }

    fn decode(&mut self, record: &Record, first_in_chunk: bool) -> Result<Option<Record>> {
        decode_fields(
            record,
            first_in_chunk,
            DELTA_ENTRY_CODE,
            &mut self.sequences,
            &mut self.qualities,
        )
    }

    fn new_chunk(&mut self) {
        self.sequences.new_chunk();
        self.qualities.new_chunk();
    }
}
