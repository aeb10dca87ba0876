//! Bit-level input and output
//!
//! [`BitWriter`] appends bits most-significant-first to an in-memory byte buffer
//! and [`BitReader`] reads them back from a byte slice. Both count bits, so
//! callers can reposition a reader to an exact bit offset (the arithmetic
//! decoder relies on this to rewind its lookahead).
//!
//! Besides single bits and fixed-width integers both sides support
//! Elias-gamma codes for positive integers. Signed values can be mapped onto
//! the naturals with [`zigzag`] before gamma coding.

use crate::error::{BitError, Result};

/// Maximum number of bits moved in one fixed-width operation
pub const MAX_FIXED_WIDTH: u32 = 64;

/// Maps a signed value onto the naturals: 0, -1, 1, -2, 2 ... become 0, 1, 2, 3, 4 ...
#[must_use]
pub fn zigzag(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag`]
#[must_use]
pub fn unzigzag(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// A sink of bits over a growable byte buffer
///
/// Bits are packed most-significant-first. The last partial byte is only
/// materialized after [`BitWriter::flush`] (or [`BitWriter::into_bytes`]),
/// which pads it with zero bits.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    /// Completed bytes
    buffer: Vec<u8>,

    /// Bits of the byte under construction, right-aligned
    current: u8,

    /// Number of bits held in `current`
    filled: u8,

    /// Total number of bits written (padding included)
    written: u64,
}

impl BitWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a single bit and returns the number of bits written (always 1)
    pub fn write_bit(&mut self, bit: bool) -> u64 {
        self.current = (self.current << 1) | u8::from(bit);
        self.filled += 1;
        if self.filled == 8 {
            self.buffer.push(self.current);
            self.current = 0;
            self.filled = 0;
        }
        self.written += 1;
        1
    }

    /// Writes the `width` low bits of `value`, most significant first
    pub fn write_fixed(&mut self, value: u64, width: u32) -> Result<u64> {
        if width > MAX_FIXED_WIDTH {
            return Err(BitError::WidthTooLarge(width).into());
        }
        for shift in (0..width).rev() {
            self.write_bit((value >> shift) & 1 == 1);
        }
        Ok(u64::from(width))
    }

    /// Writes `value` as an Elias-gamma code
    ///
    /// A value with `k` significant bits is written as `k - 1` zeros followed
    /// by its binary representation. Zero cannot be represented.
    pub fn write_gamma(&mut self, value: u64) -> Result<u64> {
        if value == 0 {
            return Err(BitError::GammaZero.into());
        }
        let msb = 63 - value.leading_zeros();
        for _ in 0..msb {
            self.write_bit(false);
        }
        self.write_fixed(value, msb + 1)?;
        Ok(u64::from(2 * msb + 1))
    }

    /// Pads the current byte with zeros and returns the number of padding bits
    pub fn flush(&mut self) -> u64 {
        let mut padding = 0;
        while self.filled != 0 {
            padding += self.write_bit(false);
        }
        padding
    }

    /// Total number of bits written so far
    #[must_use]
    pub fn bits_written(&self) -> u64 {
        self.written
    }

    /// Completed bytes (does not include a partially filled byte)
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Pads to a byte boundary and returns the underlying buffer
    #[must_use]
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.flush();
        self.buffer
    }

    /// Resets the writer for reuse, keeping the allocation
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.current = 0;
        self.filled = 0;
        self.written = 0;
    }
}

/// A source of bits over a byte slice
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],

    /// Bit offset of the next bit to read
    position: u64,
}

impl<'a> BitReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Total number of bits in the underlying slice
    #[must_use]
    pub fn len_bits(&self) -> u64 {
        self.data.len() as u64 * 8
    }

    #[must_use]
    pub fn remaining_bits(&self) -> u64 {
        self.len_bits().saturating_sub(self.position)
    }

    /// Bit offset of the next bit to be read
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Moves the reader to an absolute bit offset
    ///
    /// Positions past the end are accepted; the next read will fail.
    pub fn set_position(&mut self, position: u64) {
        self.position = position;
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        let byte = (self.position / 8) as usize;
        let Some(&value) = self.data.get(byte) else {
            return Err(BitError::UnexpectedEof {
                position: self.position,
                requested: 1,
            }
            .into());
        };
        let bit = (value >> (7 - (self.position % 8))) & 1 == 1;
        self.position += 1;
        Ok(bit)
    }

    /// Reads `width` bits, most significant first
    pub fn read_fixed(&mut self, width: u32) -> Result<u64> {
        if width > MAX_FIXED_WIDTH {
            return Err(BitError::WidthTooLarge(width).into());
        }
        if self.remaining_bits() < u64::from(width) {
            return Err(BitError::UnexpectedEof {
                position: self.position,
                requested: width,
            }
            .into());
        }
        let mut value = 0u64;
        for _ in 0..width {
            value = (value << 1) | u64::from(self.read_bit()?);
        }
        Ok(value)
    }

    /// Reads an Elias-gamma code
    pub fn read_gamma(&mut self) -> Result<u64> {
        let start = self.position;
        let mut zeros = 0u32;
        while !self.read_bit()? {
            zeros += 1;
            if zeros > 63 {
                return Err(BitError::MalformedGamma(start).into());
            }
        }
        let tail = self.read_fixed(zeros)?;
        Ok((1u64 << zeros) | tail)
    }
}
