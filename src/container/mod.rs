//! Delimited chunk container
//!
//! A container is a sequence of frames, each holding one compressed batch:
//!
//! ```text
//! 0xFF x 8 | codec id (u8) | payload length (u32, big-endian) | payload
//! ```
//!
//! The stream ends with a terminal frame of payload length zero. The run of
//! delimiter bytes lets a reader positioned at an arbitrary byte offset find
//! the next frame boundary, so one file can be split into byte ranges that
//! are read independently (see [`ChunkReader::with_split`]).
//!
//! Payloads are not escaped. A compressed payload that happens to hold eight
//! consecutive `0xFF` bytes followed by another byte is indistinguishable from
//! a frame boundary during resynchronization.
//!
//! The delimiter run comes before the codec id. Streams from older writers
//! that put the codec id ahead of the delimiter are not readable by
//! [`ChunkReader`].

mod reader;
mod writer;

pub use reader::ChunkReader;
pub use writer::{ChunkWriter, WriterStats};

use byteorder::{BigEndian, ByteOrder};

use crate::error::Result;
use crate::{DELIMITER_BYTE, DELIMITER_LENGTH, FRAME_HEADER_SIZE};

/// A collection of entries that is serialized as one chunk
pub trait Batch {
    /// Number of entries currently held
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends the serialized batch to `buffer`
    fn write_bytes(&self, buffer: &mut Vec<u8>) -> Result<()>;

    fn clear(&mut self);
}

/// Fixed-size header preceding every payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameHeader {
    codec: u8,
    payload_len: u32,
}
impl FrameHeader {
    fn as_bytes(self) -> [u8; FRAME_HEADER_SIZE] {
        let mut buffer = [DELIMITER_BYTE; FRAME_HEADER_SIZE];
        buffer[DELIMITER_LENGTH] = self.codec;
        BigEndian::write_u32(&mut buffer[DELIMITER_LENGTH + 1..], self.payload_len);
        buffer
    }

    /// Parses a header, returning `None` if the delimiter is missing
    fn from_bytes(buffer: &[u8; FRAME_HEADER_SIZE]) -> Option<Self> {
        if buffer[..DELIMITER_LENGTH].iter().any(|&b| b != DELIMITER_BYTE) {
            return None;
        }
        Some(Self {
            codec: buffer[DELIMITER_LENGTH],
            payload_len: BigEndian::read_u32(&buffer[DELIMITER_LENGTH + 1..]),
        })
    }

    fn is_terminal(self) -> bool {
        self.payload_len == 0
    }
}
