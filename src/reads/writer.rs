use std::io::Write;

use crate::chunk::ChunkCodecKind;
use crate::codec::{EntryCodec, EntryCodecKind};
use crate::container::{Batch, ChunkWriter, WriterStats};
use crate::error::{Result, WriteError};
use crate::record::{ReadEntry, RecordBatch};
use crate::DEFAULT_ENTRIES_PER_CHUNK;

/// Builder for [`ReadsWriter`] instances
#[derive(Debug, Clone, Default)]
pub struct ReadsWriterBuilder {
    entries_per_chunk: Option<usize>,
    chunk_codec: ChunkCodecKind,
    compression_level: Option<i32>,
    entry_codec: Option<EntryCodecKind>,
}

impl ReadsWriterBuilder {
    /// Set the number of reads per frame
    #[must_use]
    pub fn entries_per_chunk(mut self, entries_per_chunk: usize) -> Self {
        self.entries_per_chunk = Some(entries_per_chunk);
        self
    }

    /// Set the codec compressing each frame
    #[must_use]
    pub fn chunk_codec(mut self, kind: ChunkCodecKind) -> Self {
        self.chunk_codec = kind;
        self
    }

    /// Set the compression level of the chunk codec
    #[must_use]
    pub fn compression_level(mut self, level: i32) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Set the codec applied to each read before batching
    #[must_use]
    pub fn entry_codec(mut self, kind: EntryCodecKind) -> Self {
        self.entry_codec = Some(kind);
        self
    }

    #[must_use]
    pub fn opt_entry_codec(mut self, kind: Option<EntryCodecKind>) -> Self {
        self.entry_codec = kind;
        self
    }

    /// Build the writer
    ///
    /// # Errors
    ///
    /// Returns an error if `entries_per_chunk` is zero or the chunk codec
    /// uses the delimiter byte as its registration code.
    pub fn build<W: Write>(self, writer: W) -> Result<ReadsWriter<W>> {
        let chunks = ChunkWriter::new(writer, self.chunk_codec.build(self.compression_level))?
            .with_entries_per_chunk(self.entries_per_chunk.unwrap_or(DEFAULT_ENTRIES_PER_CHUNK))?;
        Ok(ReadsWriter {
            chunks,
            batch: RecordBatch::new(),
            entry_codec: self.entry_codec.map(EntryCodecKind::build),
            codec_header_written: false,
            next_index: 0,
            bases_written: 0,
        })
    }
}

/// Writes reads into a chunk container
///
/// Reads receive consecutive indices starting at 0. The container is only
/// complete after [`ReadsWriter::finish`].
pub struct ReadsWriter<W: Write> {
    chunks: ChunkWriter<W>,
    batch: RecordBatch,
    entry_codec: Option<Box<dyn EntryCodec>>,

    /// Whether a record of the current batch carries the entry codec code
    codec_header_written: bool,

    next_index: u32,
    bases_written: u64,
}

impl<W: Write> ReadsWriter<W> {
    /// Appends a read under the next index and returns that index
    pub fn append(&mut self, entry: &ReadEntry) -> Result<u32> {
        if self.chunks.is_closed() {
            return Err(WriteError::Closed.into());
        }
        let index = self.next_index;
        let mut record = entry.to_record(index);

        if let Some(codec) = self.entry_codec.as_mut() {
            if self.batch.is_empty() {
                codec.new_chunk();
                self.codec_header_written = false;
            }
            if let Some(encoded) = codec.encode(&record, !self.codec_header_written)? {
                record = encoded;
                self.codec_header_written = true;
            }
        }

        self.batch.push(record);
        self.chunks.write_as_needed(&mut self.batch, 1)?;
        self.bases_written += (entry.len() + entry.paired_sequence().map_or(0, <[u8]>::len)) as u64;
        self.next_index = index.wrapping_add(1);
        Ok(index)
    }

    /// Appends a read under an explicit index
    ///
    /// Later reads appended with [`ReadsWriter::append`] continue from
    /// `index + 1`.
    pub fn append_with_index(&mut self, index: u32, entry: &ReadEntry) -> Result<u32> {
        self.next_index = index;
        self.append(entry)
    }

    /// Writes the current batch even if it is not full
    pub fn flush(&mut self) -> Result<()> {
        self.chunks.flush(&mut self.batch)
    }

    /// Closes the container and returns the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.chunks.close(&mut self.batch)?;
        Ok(self.chunks.into_inner())
    }

    /// Index the next appended read will receive
    #[must_use]
    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    /// Offset of the most recently flushed frame
    #[must_use]
    pub fn current_chunk_start_offset(&self) -> u64 {
        self.chunks.current_chunk_start_offset()
    }

    /// Bases appended so far, mates included
    #[must_use]
    pub fn sequence_bases_written(&self) -> u64 {
        self.bases_written
    }

    #[must_use]
    pub fn stats(&self) -> WriterStats {
        WriterStats {
            bases_written: self.bases_written,
            ..self.chunks.stats()
        }
    }
}
