use std::num::NonZeroUsize;

use super::{flush_bits, FrequencyModel, HALF, QUARTER};
use crate::core::BitWriter;
use crate::error::{CodecError, Result};

/// Adaptive arithmetic encoder
///
/// The frequency model persists across fields and is only reset by
/// [`ArithmeticEncoder::new_chunk`]. The coding interval is reset after every
/// [`ArithmeticEncoder::flush`].
#[derive(Debug, Clone)]
pub struct ArithmeticEncoder {
    model: FrequencyModel,

    /// Lower end of the current interval
    low: i64,

    /// Width of the current interval
    range: i64,

    /// Pending bits whose value depends on the next resolved bit
    outstanding: u64,

    /// The first resolved bit of a field is always zero and is not written
    first_bit: bool,
}

impl ArithmeticEncoder {
    /// Creates an encoder for an alphabet of `n_symbols` symbols
    #[must_use]
    pub fn new(n_symbols: NonZeroUsize) -> Self {
        Self {
            model: FrequencyModel::new(n_symbols),
            low: 0,
            range: HALF,
            outstanding: 0,
            first_bit: true,
        }
    }

    #[must_use]
    pub fn n_symbols(&self) -> usize {
        self.model.n_symbols()
    }

    /// Resets the coding interval while keeping the learned frequencies
    pub fn reset_interval(&mut self) {
        self.low = 0;
        self.range = HALF;
        self.outstanding = 0;
        self.first_bit = true;
    }

    /// Forgets all learned frequencies and resets the interval
    pub fn new_chunk(&mut self) {
        self.model.reset();
        self.reset_interval();
    }

    /// Emits a resolved bit followed by any outstanding opposite bits
    fn emit(&mut self, bit: bool, output: &mut BitWriter) -> u64 {
        if self.first_bit {
            self.first_bit = false;
            return 0;
        }
        let mut written = output.write_bit(bit);
        while self.outstanding > 0 {
            written += output.write_bit(!bit);
            self.outstanding -= 1;
        }
        written
    }

    /// Encodes one symbol and returns the number of bits written
    pub fn encode(&mut self, symbol: usize, output: &mut BitWriter) -> Result<u64> {
        let n_symbols = self.model.n_symbols();
        if symbol >= n_symbols {
            return Err(CodecError::SymbolOutOfRange { symbol, n_symbols }.into());
        }

        let r = self.range / self.model.total() as i64;
        let low_count = self.model.cumulative(symbol) as i64;
        self.low += r * low_count;
        self.range = if symbol == n_symbols - 1 {
            self.range - r * low_count
        } else {
            r * (self.model.cumulative(symbol + 1) as i64 - low_count)
        };
        self.model.increment(symbol);

        let mut written = 0;
        while self.range <= QUARTER {
            if self.low >= HALF {
                written += self.emit(true, output);
                self.low -= HALF;
            } else if self.range + self.low <= HALF {
                written += self.emit(false, output);
            } else {
                self.low -= QUARTER;
                self.outstanding += 1;
            }
            self.range <<= 1;
            self.low <<= 1;
        }
        Ok(written)
    }

    /// Terminates the current field and resets the interval
    ///
    /// Writes the shortest bit string that places any continuation inside the
    /// final interval. Returns the number of bits written.
    pub fn flush(&mut self, output: &mut BitWriter) -> u64 {
        let (nbits, bits) = flush_bits(self.low, self.range);
        let mut written = 0;
        for shift in (0..nbits).rev() {
            written += self.emit((bits >> shift) & 1 == 1, output);
        }
        self.reset_interval();
        written
    }
}
