//! Adaptive arithmetic coding over small alphabets
//!
//! The coder works on 63-bit integer intervals with an adaptive frequency
//! model per alphabet. Symbols are grouped into fields: after the last symbol
//! of a field [`ArithmeticEncoder::flush`] emits the few bits needed to
//! disambiguate the final interval, and [`ArithmeticDecoder::reposition`]
//! rewinds the decoder lookahead so the bit reader points at the first bit
//! following the field. Other data can therefore be interleaved between
//! fields on the same bit stream.
//!
//! The decoder reads ahead of the encoder's output. Callers that decode the
//! last field of a buffer must append [`DECODER_PADDING`] zero bytes to it.

mod decoder;
mod encoder;
mod model;

pub use decoder::ArithmeticDecoder;
pub use encoder::ArithmeticEncoder;
pub use model::FrequencyModel;

/// Number of bits of the coding interval
const BITS: u32 = 63;

/// Initial interval width and the midpoint of the coding space
const HALF: i64 = 1 << (BITS - 1);

/// Interval width below which renormalization is required
const QUARTER: i64 = 1 << (BITS - 2);

/// Zero bytes to append after the final field before decoding
pub const DECODER_PADDING: usize = 16;

/// Computes the shortest bit string that identifies the interval `[low, low + range)`
///
/// Returns the number of bits and the bits themselves, right-aligned.
fn flush_bits(low: i64, range: i64) -> (u32, u64) {
    let top = low.wrapping_add(range).wrapping_sub(1);
    let mut nbits = 1;
    let mut bits = 0;
    while nbits <= BITS {
        let shift = BITS - nbits;
        let roundup = (1i64 << shift) - 1;
        bits = (low.wrapping_add(roundup) as u64) >> shift;
        let value = (bits << shift) as i64;
        let upper = value.wrapping_add(roundup);
        if low <= value && (upper <= top || (upper >= 0 && top < 0)) {
            break;
        }
        nbits += 1;
    }
    (nbits, bits)
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use rand::{Rng, SeedableRng, rngs::SmallRng};

    use super::*;
    use crate::core::{BitReader, BitWriter};

    const RNG_SEED: u64 = 42;

    fn symbols(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn padded(writer: BitWriter) -> Vec<u8> {
        let mut bytes = writer.into_bytes();
        bytes.resize(bytes.len() + DECODER_PADDING, 0);
        bytes
    }

    fn random_field(rng: &mut SmallRng, n_symbols: usize, len: usize, skew: bool) -> Vec<usize> {
        (0..len)
            .map(|_| {
                if skew && rng.random_bool(0.8) {
                    0
                } else {
                    rng.random_range(0..n_symbols)
                }
            })
            .collect()
    }

    #[test]
    fn test_flush_bits_initial_interval() {
        // the initial interval is covered by a single zero bit
        assert_eq!(flush_bits(0, HALF), (1, 0));
    }

    #[test]
    fn test_single_field() {
        let input = [0, 1, 2, 3, 4, 4, 4, 0, 2];
        let mut encoder = ArithmeticEncoder::new(symbols(5));
        let mut writer = BitWriter::new();
        for &s in &input {
            encoder.encode(s, &mut writer).unwrap();
        }
        encoder.flush(&mut writer);
        let written = writer.bits_written();
        let bytes = padded(writer);

        let mut decoder = ArithmeticDecoder::new(symbols(5));
        let mut reader = BitReader::new(&bytes);
        let decoded: Vec<usize> = input
            .iter()
            .map(|_| decoder.decode(&mut reader).unwrap())
            .collect();
        decoder.reposition(&mut reader);
        assert_eq!(decoded, input);
        assert_eq!(reader.position(), written);
    }

    #[test]
    fn test_interleaved_fields_keep_alignment() {
        let mut rng = SmallRng::seed_from_u64(RNG_SEED);
        let fields: Vec<Vec<usize>> = (0..20)
            .map(|i| random_field(&mut rng, 256, i * 7, i % 2 == 0))
            .collect();

        let mut encoder = ArithmeticEncoder::new(symbols(256));
        let mut writer = BitWriter::new();
        for (i, field) in fields.iter().enumerate() {
            for &s in field {
                encoder.encode(s, &mut writer).unwrap();
            }
            encoder.flush(&mut writer);
            writer.write_fixed(i as u64, 8).unwrap();
        }
        let bytes = padded(writer);

        let mut decoder = ArithmeticDecoder::new(symbols(256));
        let mut reader = BitReader::new(&bytes);
        for (i, field) in fields.iter().enumerate() {
            let decoded: Vec<usize> = field
                .iter()
                .map(|_| decoder.decode(&mut reader).unwrap())
                .collect();
            decoder.reposition(&mut reader);
            assert_eq!(&decoded, field, "field {i}");
            assert_eq!(reader.read_fixed(8).unwrap(), i as u64);
        }
    }

    #[test]
    fn test_empty_field_emits_nothing() {
        let mut encoder = ArithmeticEncoder::new(symbols(5));
        let mut writer = BitWriter::new();
        assert_eq!(encoder.flush(&mut writer), 0);
        assert_eq!(writer.bits_written(), 0);

        let bytes = [0u8; DECODER_PADDING];
        let mut decoder = ArithmeticDecoder::new(symbols(5));
        let mut reader = BitReader::new(&bytes);
        decoder.reposition(&mut reader);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_adaptive_model_compresses_skewed_input() {
        let input = vec![3usize; 4096];
        let mut encoder = ArithmeticEncoder::new(symbols(5));
        let mut writer = BitWriter::new();
        for &s in &input {
            encoder.encode(s, &mut writer).unwrap();
        }
        encoder.flush(&mut writer);
        // a uniform 5-symbol code would need ~2.3 bits per symbol
        assert!(writer.bits_written() < 256);
    }

    #[test]
    fn test_single_symbol_alphabet() {
        let mut encoder = ArithmeticEncoder::new(symbols(1));
        let mut writer = BitWriter::new();
        for _ in 0..100 {
            encoder.encode(0, &mut writer).unwrap();
        }
        encoder.flush(&mut writer);
        writer.write_fixed(0b1011, 4).unwrap();
        let bytes = padded(writer);

        let mut decoder = ArithmeticDecoder::new(symbols(1));
        let mut reader = BitReader::new(&bytes);
        for _ in 0..100 {
            assert_eq!(decoder.decode(&mut reader).unwrap(), 0);
        }
        decoder.reposition(&mut reader);
        assert_eq!(reader.read_fixed(4).unwrap(), 0b1011);
    }

    #[test]
    fn test_symbol_out_of_range() {
        let mut encoder = ArithmeticEncoder::new(symbols(5));
        let mut writer = BitWriter::new();
        assert!(encoder.encode(5, &mut writer).is_err());
    }

    #[test]
    fn test_new_chunk_resets_frequencies() {
        let mut rng = SmallRng::seed_from_u64(RNG_SEED);
        let first = random_field(&mut rng, 5, 300, true);
        let second = random_field(&mut rng, 5, 300, false);

        let mut encoder = ArithmeticEncoder::new(symbols(5));
        let mut chunk_a = BitWriter::new();
        for &s in &first {
            encoder.encode(s, &mut chunk_a).unwrap();
        }
        encoder.flush(&mut chunk_a);
        encoder.new_chunk();
        let mut chunk_b = BitWriter::new();
        for &s in &second {
            encoder.encode(s, &mut chunk_b).unwrap();
        }
        encoder.flush(&mut chunk_b);

        // the second chunk decodes with a freshly created decoder
        let bytes = padded(chunk_b);
        let mut decoder = ArithmeticDecoder::new(symbols(5));
        let mut reader = BitReader::new(&bytes);
        let decoded: Vec<usize> = second
            .iter()
            .map(|_| decoder.decode(&mut reader).unwrap())
            .collect();
        assert_eq!(decoded, second);
    }
}
