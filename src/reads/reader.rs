use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use log::warn;

use crate::chunk::ChunkCodecRegistry;
use crate::codec::EntryCodecRegistry;
use crate::container::{Batch, ChunkReader};
use crate::error::Result;
use crate::record::{Record, RecordBatch};

/// Reads the records of a chunk container
///
/// Records carrying an entry codec blob are restored through an
/// [`EntryCodecRegistry`] whose models are reset at every frame. As an
/// iterator the reader yields `Result<Record>` and ends after the first
/// error, since the adaptive models cannot recover within a frame.
pub struct ReadsReader<R: Read> {
    chunks: ChunkReader<R>,
    batch: RecordBatch,
    entry_codecs: EntryCodecRegistry,
    stopped: bool,
}

impl ReadsReader<BufReader<File>> {
    /// Opens a container file for sequential reading
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> ReadsReader<R> {
    pub fn new(inner: R) -> Self {
        Self::from_chunks(ChunkReader::new(inner))
    }

    fn from_chunks(chunks: ChunkReader<R>) -> Self {
        Self {
            chunks,
            batch: RecordBatch::new(),
            entry_codecs: EntryCodecRegistry::default(),
            stopped: false,
        }
    }

    /// Replaces the entry codecs available for decoding
    #[must_use]
    pub fn with_entry_codecs(mut self, registry: EntryCodecRegistry) -> Self {
        self.entry_codecs = registry;
        self
    }

    /// Replaces the chunk codecs available for decompression
    #[must_use]
    pub fn with_chunk_codecs(mut self, registry: ChunkCodecRegistry) -> Self {
        self.chunks = self.chunks.with_registry(registry);
        self
    }

    /// Returns the next record, or `None` at the end of the container
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            let entry_index = self.chunks.entry_index();
            if entry_index < self.batch.len() {
                self.chunks.increment_entry_index();
                let Some(record) = self.batch.take(entry_index) else {
                    continue;
                };
                return self.restore(record).map(Some);
            }
            if !self.chunks.has_next(self.batch.len())? {
                return Ok(None);
            }
            // the previous batch is exhausted so a new frame was loaded
            self.batch = RecordBatch::from_bytes(self.chunks.batch_bytes())?;
            self.entry_codecs.new_chunk();
        }
    }

    /// Returns the remaining records of the current frame, or of the next one
    pub fn read_batch(&mut self) -> Result<Option<Vec<Record>>> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
            if self.chunks.entry_index() >= self.batch.len() {
                break;
            }
        }
        Ok(if records.is_empty() { None } else { Some(records) })
    }

    fn restore(&mut self, record: Record) -> Result<Record> {
        if !record.is_compressed() {
            return Ok(record);
        }
        match self.entry_codecs.decode(&record)? {
            Some(decoded) => Ok(decoded),
            None => {
                warn!("No entry codec recognizes record {}", record.index);
                Ok(record)
            }
        }
    }

    /// Offset of the frame the last record came from
    #[must_use]
    pub fn frame_start(&self) -> u64 {
        self.chunks.frame_start()
    }

    /// Whether reading ended on a frame cut short by the end of the file
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.chunks.is_truncated()
    }
}

impl<R: Read + Seek> ReadsReader<R> {
    /// Reads the records of the frames starting within `[start, end)`
    pub fn with_split(inner: R, start: u64, end: u64) -> Result<Self> {
        Ok(Self::from_chunks(ChunkReader::with_split(inner, start, end)?))
    }

    /// Continues from the first frame at or after `position`
    pub fn seek(&mut self, position: u64) -> Result<()> {
        self.chunks.seek(position)?;
        self.batch = RecordBatch::new();
        self.stopped = false;
        Ok(())
    }
}

impl<R: Read> Iterator for ReadsReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped {
            return None;
        }
        match self.next_record() {
            Ok(record) => record.map(Ok),
            Err(err) => {
                self.stopped = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::chunk::ChunkCodecKind;
    use crate::codec::EntryCodecKind;
    use crate::reads::ReadsWriterBuilder;
    use crate::record::ReadEntryBuilder;

    fn write_reads(n: usize, entry_codec: Option<EntryCodecKind>) -> Vec<u8> {
        let mut writer = ReadsWriterBuilder::default()
            .entries_per_chunk(4)
            .chunk_codec(ChunkCodecKind::Zstd)
            .opt_entry_codec(entry_codec)
            .build(Vec::new())
            .unwrap();
        for i in 0..n {
            let sequence: Vec<u8> = b"ACGTN".iter().copied().cycle().skip(i).take(12).collect();
            let quality = vec![b'!' + (i % 40) as u8; 12];
            let id = format!("read_{i}");
            let entry = ReadEntryBuilder::default()
                .sequence(&sequence)
                .quality(&quality)
                .identifier(&id)
                .build()
                .unwrap();
            writer.append(&entry).unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn test_read_back_with_each_entry_codec() {
        for codec in [None, Some(EntryCodecKind::Arithmetic), Some(EntryCodecKind::Delta)] {
            let bytes = write_reads(10, codec);
            let records: Vec<Record> = ReadsReader::new(bytes.as_slice())
                .collect::<Result<_>>()
                .unwrap();
            assert_eq!(records.len(), 10);
            for (i, record) in records.iter().enumerate() {
                assert_eq!(record.index, i as u32);
                assert!(!record.is_compressed());
                assert_eq!(record.sequence.as_ref().unwrap().len(), 12);
                assert_eq!(record.identifier.as_deref(), Some(format!("read_{i}").as_str()));
            }
        }
    }

    #[test]
    fn test_read_batch_follows_frames() {
        let bytes = write_reads(10, Some(EntryCodecKind::Delta));
        let mut reader = ReadsReader::new(bytes.as_slice());
        let sizes: Vec<usize> = std::iter::from_fn(|| reader.read_batch().unwrap())
            .map(|batch| batch.len())
            .collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_unknown_entry_codec_keeps_blob() {
        let bytes = write_reads(3, Some(EntryCodecKind::Delta));
        let records: Vec<Record> = ReadsReader::new(bytes.as_slice())
            .with_entry_codecs(EntryCodecRegistry::new())
            .collect::<Result<_>>()
            .unwrap();
        assert!(records.iter().all(Record::is_compressed));
    }

    #[test]
    fn test_seek_restarts_at_frame() {
        let bytes = write_reads(10, Some(EntryCodecKind::Arithmetic));
        let mut reader = ReadsReader::new(Cursor::new(bytes));
        reader.next_record().unwrap();
        let second_frame = {
            for _ in 0..4 {
                reader.next_record().unwrap();
            }
            reader.frame_start()
        };
        reader.seek(1).unwrap();
        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.index, 4);
        assert_eq!(reader.frame_start(), second_frame);
        assert_eq!(first.sequence.as_ref().unwrap().len(), 12);
    }

    #[test]
    fn test_corrupt_blob_stops_iteration() {
        let mut writer = crate::container::ChunkWriter::new(Vec::new(), ChunkCodecKind::Gzip.build(None)).unwrap();
        let mut batch = RecordBatch::new();
        let mut record = Record::new(0);
        record.length = 500;
        // registration code of the delta codec, then a sequence presence bit
        record.compressed_data = Some(vec![0x02, 0x80]);
        batch.push(record.clone());
        writer.write_as_needed(&mut batch, 1).unwrap();
        record.index = 1;
        batch.push(record);
        writer.write_as_needed(&mut batch, 1).unwrap();
        writer.close(&mut batch).unwrap();
        let bytes = writer.into_inner();

        let results: Vec<Result<Record>> = ReadsReader::new(bytes.as_slice()).collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].as_ref().unwrap_err().is_desync());
    }
}
