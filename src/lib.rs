//! Splittable chunked storage for sequencing reads and reference genomes
//!
//! Reads are batched into frames, each frame compressed as a unit by a
//! [`chunk::ChunkCodec`] and placed behind an 8-byte delimiter so that a
//! reader starting at any byte offset can find the next frame. Inside a
//! frame, an optional [`codec::EntryCodec`] replaces the sequence and quality
//! fields of each record with an arithmetic coded blob.
//!
//! Reference genomes are held separately in a 2-bit packed
//! [`genome::GenomeCache`], and [`digest::SequenceDigests`] indexes windows
//! of bases by CRC32 to find candidate matches.

pub mod chunk;
pub mod codec;
pub mod container;
pub mod core;
pub mod digest;
pub mod entropy;
pub mod error;
pub mod genome;
pub mod parallel;
pub mod reads;
pub mod record;

pub use error::{Error, IntoChunkseqError, Result};
pub use genome::{GenomeCache, RangeCache};
pub use parallel::{MmapReadsReader, ParallelProcessor, ParallelReader};
pub use reads::{ReadsReader, ReadsWriter, ReadsWriterBuilder};
pub use record::{ReadEntry, ReadEntryBuilder, Record, RecordBatch};

/// Value of every byte of a frame delimiter
pub const DELIMITER_BYTE: u8 = 0xFF;

/// Number of delimiter bytes opening each frame
pub const DELIMITER_LENGTH: usize = 8;

/// Delimiter, codec code and payload length
pub const FRAME_HEADER_SIZE: usize = DELIMITER_LENGTH + 1 + 4;

pub const DEFAULT_ENTRIES_PER_CHUNK: usize = 10_000;

/// Level used by the zstd chunk codec when none is given
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;
