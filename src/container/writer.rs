use std::io::Write;
use std::sync::Arc;

use log::{info, trace};

use super::{Batch, FrameHeader};
use crate::chunk::ChunkCodec;
use crate::error::{CodecError, FrameError, Result, WriteError};
use crate::{DEFAULT_ENTRIES_PER_CHUNK, DELIMITER_BYTE, FRAME_HEADER_SIZE};

/// Counters reported by container writers
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WriterStats {
    /// Logical entries written (a compacted entry may stand for several)
    pub entries_written: u64,

    /// Bytes written to the underlying stream, frame headers included
    pub bytes_written: u64,

    /// Frames written, the terminal frame excluded
    pub frames_written: u64,

    /// Sequence bases written, when the writer tracks them
    pub bases_written: u64,
}
impl WriterStats {
    #[must_use]
    pub fn bytes_per_entry(&self) -> f64 {
        if self.entries_written == 0 {
            0.0
        } else {
            self.bytes_written as f64 / self.entries_written as f64
        }
    }

    /// Average storage cost of a base, if any bases were written
    #[must_use]
    pub fn bits_per_base(&self) -> Option<f64> {
        if self.bases_written == 0 {
            None
        } else {
            Some(self.bytes_written as f64 * 8.0 / self.bases_written as f64)
        }
    }

    /// Reports the counters at the info level
    pub fn log_stats(&self) {
        info!(
            "Wrote {} entries in {} frames ({} bytes, {:.2} bytes/entry)",
            self.entries_written,
            self.frames_written,
            self.bytes_written,
            self.bytes_per_entry()
        );
        if let Some(bits) = self.bits_per_base() {
            info!("{} bases at {bits:.3} bits/base", self.bases_written);
        }
    }
}

/// Writes batches as delimited, compressed frames
///
/// The caller owns the batch: it pushes one entry, then calls
/// [`ChunkWriter::write_as_needed`], which flushes the batch once it holds
/// `entries_per_chunk` entries. [`ChunkWriter::close`] flushes what remains and
/// appends the terminal frame.
pub struct ChunkWriter<W: Write> {
    inner: W,
    codec: Arc<dyn ChunkCodec>,
    entries_per_chunk: usize,

    /// Entries appended since the last flush
    appended_in_chunk: usize,

    /// Offset of the most recently flushed frame
    current_chunk_start_offset: u64,

    /// Running stream offset
    written_bytes: u64,

    stats: WriterStats,
    closed: bool,

    /// Reusable serialization buffer
    ubuf: Vec<u8>,

    /// Reusable compression buffer
    zbuf: Vec<u8>,
}

impl<W: Write> ChunkWriter<W> {
    /// Creates a writer that compresses every frame with `codec`
    ///
    /// # Errors
    ///
    /// Returns an error if the codec's registration code is the delimiter byte.
    pub fn new(inner: W, codec: Arc<dyn ChunkCodec>) -> Result<Self> {
        let code = codec.registration_code();
        if code == DELIMITER_BYTE {
            return Err(CodecError::ReservedRegistrationCode(code).into());
        }
        Ok(Self {
            inner,
            codec,
            entries_per_chunk: DEFAULT_ENTRIES_PER_CHUNK,
            appended_in_chunk: 0,
            current_chunk_start_offset: 0,
            written_bytes: 0,
            stats: WriterStats::default(),
            closed: false,
            ubuf: Vec::new(),
            zbuf: Vec::new(),
        })
    }

    /// Sets the number of entries after which a batch is flushed
    pub fn with_entries_per_chunk(mut self, entries_per_chunk: usize) -> Result<Self> {
        if entries_per_chunk == 0 {
            return Err(WriteError::ZeroEntriesPerChunk.into());
        }
        self.entries_per_chunk = entries_per_chunk;
        Ok(self)
    }

    #[must_use]
    pub fn entries_per_chunk(&self) -> usize {
        self.entries_per_chunk
    }

    /// Records one entry just pushed to `batch`, flushing if the batch is full
    ///
    /// `multiplicity` is the number of logical entries the pushed entry stands
    /// for. Returns the offset of the most recently flushed frame.
    pub fn write_as_needed<B: Batch>(&mut self, batch: &mut B, multiplicity: u64) -> Result<u64> {
        if self.closed {
            return Err(WriteError::Closed.into());
        }
        self.appended_in_chunk += 1;
        self.stats.entries_written += multiplicity;
        if self.appended_in_chunk >= self.entries_per_chunk {
            self.flush(batch)?;
        }
        Ok(self.current_chunk_start_offset)
    }

    /// Writes `batch` as one frame and clears it
    ///
    /// Empty batches are skipped.
    pub fn flush<B: Batch>(&mut self, batch: &mut B) -> Result<()> {
        if self.closed {
            return Err(WriteError::Closed.into());
        }
        if batch.is_empty() {
            self.appended_in_chunk = 0;
            return Ok(());
        }

        self.ubuf.clear();
        batch.write_bytes(&mut self.ubuf)?;
        self.zbuf.clear();
        self.codec.encode(&self.ubuf, &mut self.zbuf)?;
        let payload_len =
            u32::try_from(self.zbuf.len()).map_err(|_| FrameError::PayloadTooLarge(self.zbuf.len()))?;

        self.current_chunk_start_offset = self.written_bytes;
        let header = FrameHeader {
            codec: self.codec.registration_code(),
            payload_len,
        };
        self.inner.write_all(&header.as_bytes())?;
        self.inner.write_all(&self.zbuf)?;
        self.inner.flush()?;

        let frame_size = (FRAME_HEADER_SIZE + self.zbuf.len()) as u64;
        self.written_bytes += frame_size;
        self.stats.bytes_written += frame_size;
        self.stats.frames_written += 1;
        trace!(
            "Flushed {} entries at offset {} ({} -> {} bytes, {})",
            batch.len(),
            self.current_chunk_start_offset,
            self.ubuf.len(),
            self.zbuf.len(),
            self.codec.name()
        );

        batch.clear();
        self.appended_in_chunk = 0;
        Ok(())
    }

    /// Flushes `batch` and writes the terminal frame
    ///
    /// Closing twice is a no-op.
    pub fn close<B: Batch>(&mut self, batch: &mut B) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.flush(batch)?;
        let header = FrameHeader {
            codec: self.codec.registration_code(),
            payload_len: 0,
        };
        self.inner.write_all(&header.as_bytes())?;
        self.inner.flush()?;
        self.written_bytes += FRAME_HEADER_SIZE as u64;
        self.stats.bytes_written += FRAME_HEADER_SIZE as u64;
        self.closed = true;
        Ok(())
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Offset at which the most recently flushed frame starts
    #[must_use]
    pub fn current_chunk_start_offset(&self) -> u64 {
        self.current_chunk_start_offset
    }

    /// Entries waiting in the current batch
    #[must_use]
    pub fn appended_in_chunk(&self) -> usize {
        self.appended_in_chunk
    }

    #[must_use]
    pub fn total_entries_written(&self) -> u64 {
        self.stats.entries_written
    }

    #[must_use]
    pub fn total_bytes_written(&self) -> u64 {
        self.stats.bytes_written
    }

    #[must_use]
    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
