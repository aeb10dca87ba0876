//! Per-record entry codecs
//!
//! An [`EntryCodec`] folds the four byte fields of a [`Record`] (sequence,
//! quality and their mates) into a single `compressed_data` blob and restores
//! them on the way back. The blob layout is:
//!
//! ```text
//! [registration code: 8 bits, first coded record of a chunk only]
//! for each of sequence, quality, paired sequence, paired quality:
//!     presence bit, then the field when present
//! zero padding to a byte boundary
//! ```
//!
//! Sequences are arithmetic coded over the alphabet `A C T G N`. Quality
//! coding depends on the codec: [`ArithmeticEntryCodec`] arithmetic codes every
//! score over 256 symbols while [`DeltaEntryCodec`] gamma codes the distance of
//! each score from the field maximum.
//!
//! Codec models adapt across the records of a chunk. Writers and readers must
//! call `new_chunk` at the same batch boundaries and must agree on which record
//! is the first coded record of a chunk, which is passed explicitly as
//! `first_in_chunk`.

mod arithmetic;
mod delta;
mod registry;

pub use arithmetic::ArithmeticEntryCodec;
pub use delta::DeltaEntryCodec;
pub use registry::EntryCodecRegistry;

use std::num::NonZeroUsize;
use std::str::FromStr;

use auto_impl::auto_impl;
use log::debug;

use crate::core::{BitReader, BitWriter};
use crate::entropy::{ArithmeticDecoder, ArithmeticEncoder, DECODER_PADDING};
use crate::error::{CodecError, Result};
use crate::record::Record;

/// Registration code of [`ArithmeticEntryCodec`]
pub const ARITHMETIC_ENTRY_CODE: u8 = 1;

/// Registration code of [`DeltaEntryCodec`]
pub const DELTA_ENTRY_CODE: u8 = 2;

/// Base for each sequence symbol
const SYMBOL_TO_BASE: [u8; 5] = *b"ACTGN";

/// Size of the sequence alphabet
const SEQUENCE_SYMBOLS: NonZeroUsize = NonZeroUsize::new(SYMBOL_TO_BASE.len()).unwrap();

/// Maps a base onto the sequence alphabet
#[inline]
fn base_to_symbol(base: u8) -> Option<usize> {
    match base {
        b'A' => Some(0),
        b'C' => Some(1),
        b'T' => Some(2),
        b'G' => Some(3),
        b'N' => Some(4),
        _ => None,
    }
}

/// A per-record compressor for the sequence and quality fields
#[auto_impl(&mut, Box)]
pub trait EntryCodec: Send {
    fn name(&self) -> &'static str;

    /// File-format stable identifier written at the start of each chunk
    fn registration_code(&self) -> u8;

    /// Replaces the byte fields of `record` with a compressed blob
    ///
    /// Returns `None` if the record cannot be coded (it is already coded, has
    /// no byte fields, or a field length disagrees with `record.length`). The
    /// caller then stores the record as is.
    ///
    /// # Errors
    ///
    /// Returns an error if a sequence contains a byte outside `A C G T N`.
    fn encode(&mut self, record: &Record, first_in_chunk: bool) -> Result<Option<Record>>;

    /// Restores the byte fields from the blob of `record`
    ///
    /// Returns `None` if the record carries no blob or, when
    /// `first_in_chunk` is set, if the blob starts with another codec's
    /// registration code.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob is inconsistent with the model state, in
    /// which case the remaining records of the chunk cannot be decoded.
    fn decode(&mut self, record: &Record, first_in_chunk: bool) -> Result<Option<Record>>;

    /// Resets all adaptive models
    fn new_chunk(&mut self);
}

/// Built-in entry codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryCodecKind {
    /// Arithmetic coded sequences and qualities
    Arithmetic,

    /// Arithmetic coded sequences and gamma coded quality deltas
    Delta,
}
impl EntryCodecKind {
    #[must_use]
    pub fn registration_code(self) -> u8 {
        match self {
            Self::Arithmetic => ARITHMETIC_ENTRY_CODE,
            Self::Delta => DELTA_ENTRY_CODE,
        }
    }

    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            ARITHMETIC_ENTRY_CODE => Some(Self::Arithmetic),
            DELTA_ENTRY_CODE => Some(Self::Delta),
            _ => None,
        }
    }

    /// Creates a fresh codec instance
    #[must_use]
    pub fn build(self) -> Box<dyn EntryCodec> {
        match self {
            Self::Arithmetic => Box::new(ArithmeticEntryCodec::new()),
            Self::Delta => Box::new(DeltaEntryCodec::new()),
        }
    }
}
impl FromStr for EntryCodecKind {
    type Err = CodecError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "arithmetic" | "legacy" => Ok(Self::Arithmetic),
            "delta" | "gamma" => Ok(Self::Delta),
            _ => Err(CodecError::UnknownCodec(s.to_string())),
        }
    }
}

/// Adaptive coder for the sequence fields
#[derive(Debug, Clone)]
struct SequenceCoder {
    encoder: ArithmeticEncoder,
    decoder: ArithmeticDecoder,
}

impl SequenceCoder {
    fn new() -> Self {
        Self {
            encoder: ArithmeticEncoder::new(SEQUENCE_SYMBOLS),
            decoder: ArithmeticDecoder::new(SEQUENCE_SYMBOLS),
        }
    }

    fn new_chunk(&mut self) {
        self.encoder.new_chunk();
        self.decoder.new_chunk();
    }

    /// Ensures every base can be coded before any model state changes
    fn validate(bases: &[u8]) -> Result<()> {
        match bases.iter().position(|&b| base_to_symbol(b).is_none()) {
            Some(position) => Err(CodecError::InvalidBase {
                base: bases[position],
                position,
            }
            .into()),
            None => Ok(()),
        }
    }

    fn encode(&mut self, bases: &[u8], output: &mut BitWriter) -> Result<()> {
        for (position, &base) in bases.iter().enumerate() {
            let symbol = base_to_symbol(base).ok_or(CodecError::InvalidBase { base, position })?;
            self.encoder.encode(symbol, output)?;
        }
        self.encoder.flush(output);
        Ok(())
    }

    fn decode(&mut self, length: usize, input: &mut BitReader) -> Result<Vec<u8>> {
        let mut bases = Vec::with_capacity(length);
        for _ in 0..length {
            bases.push(SYMBOL_TO_BASE[self.decoder.decode(input)?]);
        }
        self.decoder.reposition(input);
        Ok(bases)
    }
}

/// Coding strategy for the quality fields
trait QualityCoder {
    fn encode(&mut self, scores: &[u8], output: &mut BitWriter) -> Result<()>;
    fn decode(&mut self, length: usize, input: &mut BitReader) -> Result<Vec<u8>>;
    fn new_chunk(&mut self);
}

fn set_byte_field(record: &mut Record, field: usize, bytes: Vec<u8>) {
    match field {
        0 => record.sequence = Some(bytes),
        1 => record.quality = Some(bytes),
        2 => record.paired_sequence = Some(bytes),
        _ => record.paired_quality = Some(bytes),
    }
}

/// Shared encoding path of the built-in codecs
fn encode_fields<Q: QualityCoder>(
    record: &Record,
    first_in_chunk: bool,
    code: u8,
    sequences: &mut SequenceCoder,
    qualities: &mut Q,
) -> Result<Option<Record>> {
    if record.is_compressed() {
        return Ok(None);
    }
    let length = record.length as usize;
    let fields = record.byte_fields();
    if fields.iter().all(Option::is_none) {
        return Ok(None);
    }
    if let Some(field) = fields.iter().flatten().find(|f| f.len() != length) {
        debug!(
            "Leaving record {} uncoded: field of {} bytes with record length {}",
            record.index,
            field.len(),
            length
        );
        return Ok(None);
    }
    for bases in [fields[0], fields[2]].into_iter().flatten() {
        SequenceCoder::validate(bases)?;
    }

    let mut output = BitWriter::new();
    if first_in_chunk {
        output.write_fixed(u64::from(code), 8)?;
    }
    for (field, bytes) in fields.into_iter().enumerate() {
        output.write_bit(bytes.is_some());
        let Some(bytes) = bytes else { continue };
        if field % 2 == 0 {
            sequences.encode(bytes, &mut output)?;
        } else {
            qualities.encode(bytes, &mut output)?;
        }
    }

    let mut encoded = record.without_byte_fields();
    encoded.compressed_data = Some(output.into_bytes());
    Ok(Some(encoded))
}

/// Shared decoding path of the built-in codecs
fn decode_fields<Q: QualityCoder>(
    record: &Record,
    first_in_chunk: bool,
    code: u8,
    sequences: &mut SequenceCoder,
    qualities: &mut Q,
) -> Result<Option<Record>> {
    let Some(blob) = record.compressed_data.as_deref() else {
        return Ok(None);
    };
    let mut padded = Vec::with_capacity(blob.len() + DECODER_PADDING);
    padded.extend_from_slice(blob);
    padded.resize(blob.len() + DECODER_PADDING, 0);
    let mut input = BitReader::new(&padded);

    if first_in_chunk && input.read_fixed(8)? != u64::from(code) {
        return Ok(None);
    }

    let length = record.length as usize;
    let mut decoded = record.without_byte_fields();
    for field in 0..4 {
        if !input.read_bit()? {
            continue;
        }
        let bytes = if field % 2 == 0 {
            sequences.decode(length, &mut input)?
        } else {
            qualities.decode(length, &mut input)?
        };
        set_byte_field(&mut decoded, field, bytes);
    }

    // only the final byte padding may remain
    let blob_bits = blob.len() as u64 * 8;
    if input.position() > blob_bits || blob_bits - input.position() >= 8 {
        return Err(CodecError::ModelDesync("blob length does not match the decoded fields").into());
    }
    Ok(Some(decoded))
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, rngs::SmallRng};

    use super::*;
    use crate::error::Error;

    const RNG_SEED: u64 = 42;

    pub(super) fn random_record(rng: &mut SmallRng, index: u32, len: usize, paired: bool) -> Record {
        let bases = |rng: &mut SmallRng| -> Vec<u8> {
            (0..len)
                .map(|_| SYMBOL_TO_BASE[rng.random_range(0..SYMBOL_TO_BASE.len())])
                .collect()
        };
        let scores = |rng: &mut SmallRng| -> Vec<u8> { (0..len).map(|_| rng.random_range(33..74)).collect() };
        let mut record = Record {
            index,
            length: len as u32,
            sequence: Some(bases(rng)),
            quality: Some(scores(rng)),
            identifier: Some(format!("read_{index}")),
            ..Record::default()
        };
        if paired {
            record.paired_sequence = Some(bases(rng));
            record.paired_quality = Some(scores(rng));
        }
        record
    }

    /// Encodes a chunk of records then decodes it with a second codec instance
    pub(super) fn chunk_round_trip(
        writer: &mut dyn EntryCodec,
        reader: &mut dyn EntryCodec,
        records: &[Record],
    ) -> Vec<Record> {
        writer.new_chunk();
        let encoded: Vec<Record> = records
            .iter()
            .enumerate()
            .map(|(i, r)| writer.encode(r, i == 0).unwrap().unwrap())
            .collect();
        assert!(encoded.iter().all(Record::is_compressed));
        assert!(encoded.iter().all(|r| r.sequence.is_none() && r.quality.is_none()));

        reader.new_chunk();
        encoded
            .iter()
            .enumerate()
            .map(|(i, r)| reader.decode(r, i == 0).unwrap().unwrap())
            .collect()
    }

    // ==================== Alphabet Tests ====================

    #[test]
    fn test_base_mapping() {
        for (symbol, &base) in SYMBOL_TO_BASE.iter().enumerate() {
            assert_eq!(base_to_symbol(base), Some(symbol));
        }
        assert_eq!(base_to_symbol(b'a'), None);
        assert_eq!(base_to_symbol(b'X'), None);
    }

    // ==================== EntryCodecKind Tests ====================

    #[test]
    fn test_kind_codes() {
        for kind in [EntryCodecKind::Arithmetic, EntryCodecKind::Delta] {
            let codec = kind.build();
            assert_eq!(codec.registration_code(), kind.registration_code());
            assert_eq!(EntryCodecKind::from_code(kind.registration_code()), Some(kind));
        }
        assert_eq!(EntryCodecKind::from_code(0xFF), None);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Delta".parse::<EntryCodecKind>().unwrap(), EntryCodecKind::Delta);
        assert_eq!(
            "arithmetic".parse::<EntryCodecKind>().unwrap(),
            EntryCodecKind::Arithmetic
        );
        assert!("huffman".parse::<EntryCodecKind>().is_err());
    }

    // ==================== Shared Field Protocol Tests ====================

    #[test]
    fn test_round_trip_both_codecs() {
        let mut rng = SmallRng::seed_from_u64(RNG_SEED);
        let records: Vec<Record> = (0..50)
            .map(|i| random_record(&mut rng, i, 20 + i as usize, i % 3 == 0))
            .collect();
        for kind in [EntryCodecKind::Arithmetic, EntryCodecKind::Delta] {
            let mut writer = kind.build();
            let mut reader = kind.build();
            let decoded = chunk_round_trip(writer.as_mut(), reader.as_mut(), &records);
            assert_eq!(decoded, records, "{kind:?}");
        }
    }

    #[test]
    fn test_partial_fields() {
        let record = Record {
            index: 3,
            length: 6,
            sequence: Some(b"NNACGT".to_vec()),
            paired_quality: Some(b"!!!!!!".to_vec()),
            ..Record::default()
        };
        for kind in [EntryCodecKind::Arithmetic, EntryCodecKind::Delta] {
            let mut writer = kind.build();
            let mut reader = kind.build();
            let decoded = chunk_round_trip(writer.as_mut(), reader.as_mut(), &[record.clone()]);
            assert_eq!(decoded[0], record);
        }
    }

    #[test]
    fn test_zero_length_fields() {
        let record = Record {
            length: 0,
            sequence: Some(Vec::new()),
            quality: Some(Vec::new()),
            ..Record::default()
        };
        for kind in [EntryCodecKind::Arithmetic, EntryCodecKind::Delta] {
            let mut writer = kind.build();
            let mut reader = kind.build();
            let decoded = chunk_round_trip(writer.as_mut(), reader.as_mut(), &[record.clone()]);
            assert_eq!(decoded[0], record);
        }
    }

    #[test]
    fn test_invalid_base_is_an_error() {
        let record = Record {
            length: 4,
            sequence: Some(b"ACXT".to_vec()),
            ..Record::default()
        };
        let mut codec = ArithmeticEntryCodec::new();
        assert!(matches!(
            codec.encode(&record, true),
            Err(Error::CodecError(CodecError::InvalidBase {
                base: b'X',
                position: 2
            }))
        ));
    }

    #[test]
    fn test_length_mismatch_is_left_uncoded() {
        let record = Record {
            length: 5,
            sequence: Some(b"ACGT".to_vec()),
            ..Record::default()
        };
        let mut codec = DeltaEntryCodec::new();
        assert!(codec.encode(&record, true).unwrap().is_none());
    }

    #[test]
    fn test_record_without_byte_fields_is_left_uncoded() {
        let mut codec = DeltaEntryCodec::new();
        assert!(codec.encode(&Record::new(1), true).unwrap().is_none());
    }

    #[test]
    fn test_decode_without_blob() {
        let mut codec = ArithmeticEntryCodec::new();
        assert!(codec.decode(&Record::new(0), true).unwrap().is_none());
    }

    #[test]
    fn test_registration_byte_mismatch() {
        let mut rng = SmallRng::seed_from_u64(RNG_SEED);
        let record = random_record(&mut rng, 0, 30, false);
        let mut writer = ArithmeticEntryCodec::new();
        let encoded = writer.encode(&record, true).unwrap().unwrap();
        assert_eq!(encoded.compressed_data.as_ref().unwrap()[0], ARITHMETIC_ENTRY_CODE);

        let mut other = DeltaEntryCodec::new();
        assert!(other.decode(&encoded, true).unwrap().is_none());
    }

    #[test]
    fn test_registration_byte_only_on_first_record() {
        let mut rng = SmallRng::seed_from_u64(RNG_SEED);
        let record = random_record(&mut rng, 0, 30, false);
        let mut first = DeltaEntryCodec::new();
        let mut second = DeltaEntryCodec::new();
        let with_code = first.encode(&record, true).unwrap().unwrap();
        let without_code = second.encode(&record, false).unwrap().unwrap();
        assert_eq!(
            with_code.compressed_data.unwrap().len(),
            without_code.compressed_data.unwrap().len() + 1
        );
    }

    #[test]
    fn test_desync_is_detected() {
        let mut rng = SmallRng::seed_from_u64(RNG_SEED);
        let record = random_record(&mut rng, 0, 40, true);
        let mut writer = DeltaEntryCodec::new();
        let mut encoded = writer.encode(&record, true).unwrap().unwrap();
        // claim a longer read than was coded
        encoded.length = 400;
        let mut reader = DeltaEntryCodec::new();
        assert!(reader.decode(&encoded, true).is_err());
    }

    #[test]
    fn test_metadata_survives() {
        let mut rng = SmallRng::seed_from_u64(RNG_SEED);
        let mut record = random_record(&mut rng, 9, 12, false);
        record.description = Some("flowcell A".to_string());
        record.barcode_index = Some(4);
        let mut codec = ArithmeticEntryCodec::new();
        let encoded = codec.encode(&record, true).unwrap().unwrap();
        assert_eq!(encoded.index, 9);
        assert_eq!(encoded.length, 12);
        assert_eq!(encoded.identifier.as_deref(), Some("read_9"));
        assert_eq!(encoded.description.as_deref(), Some("flowcell A"));
        assert_eq!(encoded.barcode_index, Some(4));
    }
}
