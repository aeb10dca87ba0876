use std::num::NonZeroUsize;

use super::{flush_bits, FrequencyModel, BITS, HALF, QUARTER};
use crate::core::BitReader;
use crate::error::Result;

/// Adaptive arithmetic decoder mirroring [`super::ArithmeticEncoder`]
#[derive(Debug, Clone)]
pub struct ArithmeticDecoder {
    model: FrequencyModel,
    range: i64,

    /// Offset of the code value from the lower end of the interval
    buffer: i64,

    /// Raw bits read so far, used to rebuild the interval when repositioning
    window: u64,

    /// Whether the lookahead has been read for the current field
    primed: bool,
}

impl ArithmeticDecoder {
    #[must_use]
    pub fn new(n_symbols: NonZeroUsize) -> Self {
        Self {
            model: FrequencyModel::new(n_symbols),
            range: HALF,
            buffer: 0,
            window: 0,
            primed: false,
        }
    }

    #[must_use]
    pub fn n_symbols(&self) -> usize {
        self.model.n_symbols()
    }

    pub fn reset_interval(&mut self) {
        self.range = HALF;
        self.buffer = 0;
        self.window = 0;
        self.primed = false;
    }

    pub fn new_chunk(&mut self) {
        self.model.reset();
        self.reset_interval();
    }

    pub fn decode(&mut self, input: &mut BitReader) -> Result<usize> {
        if !self.primed {
            let head = input.read_fixed(BITS - 1)?;
            self.window = head;
            self.buffer = head as i64;
            self.primed = true;
        }

        let n_symbols = self.model.n_symbols();
        let total = self.model.total();
        let r = self.range / total as i64;
        let target = ((self.buffer / r) as u64).min(total - 1);
        let symbol = self.model.find(target);

        let low_count = self.model.cumulative(symbol) as i64;
        self.buffer -= r * low_count;
        self.range = if symbol == n_symbols - 1 {
            self.range - r * low_count
        } else {
            r * (self.model.cumulative(symbol + 1) as i64 - low_count)
        };
        self.model.increment(symbol);

        while self.range <= QUARTER {
            self.buffer <<= 1;
            self.range <<= 1;
            self.window <<= 1;
            if input.read_bit()? {
                self.buffer += 1;
                self.window += 1;
            }
        }
        Ok(symbol)
    }

    /// Ends the current field
    ///
    /// Rebuilds the interval the encoder flushed, consumes the same number of
    /// bits it wrote and moves `input` back to the first bit after the field.
    /// The interval is reset for the next field.
    pub fn reposition(&mut self, input: &mut BitReader) {
        if !self.primed {
            // nothing was encoded in this field, so nothing was written
            return;
        }
        let low = ((self.window & (HALF as u64 - 1)) as i64)
            .wrapping_add(HALF)
            .wrapping_sub(self.buffer);
        let (nbits, _) = flush_bits(low, self.range);
        let after_flush = input.position() + u64::from(nbits);
        input.set_position(after_flush - u64::from(BITS));
        self.reset_interval();
    }
}
