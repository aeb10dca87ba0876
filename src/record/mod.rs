//! Read records and the batches they are stored in
//!
//! A [`Record`] is the unit stored in a chunk. Its byte fields are either
//! present verbatim or folded into `compressed_data` by an entry codec.
//! Records are grouped into a [`RecordBatch`] which serializes to a chunk
//! payload with `bincode`.

mod read_entry;

pub use read_entry::{ReadEntry, ReadEntryBuilder};

use bincode::{Decode, Encode};

use crate::container::Batch;
use crate::error::Result;

/// A sequencing read as stored in the container
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct Record {
    /// Position of the read in the written stream
    pub index: u32,

    /// Number of bases of each sequence field (and scores of each quality field)
    pub length: u32,
    pub sequence: Option<Vec<u8>>,
    pub quality: Option<Vec<u8>>,
    pub paired_sequence: Option<Vec<u8>>,
    pub paired_quality: Option<Vec<u8>>,
    pub identifier: Option<String>,
    pub description: Option<String>,
    pub barcode_index: Option<u32>,

    /// Entry codec output replacing the four byte fields above
    pub compressed_data: Option<Vec<u8>>,
}

impl Record {
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// Whether the byte fields were replaced by an entry codec blob
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.compressed_data.is_some()
    }

    #[must_use]
    pub fn is_paired(&self) -> bool {
        self.paired_sequence.is_some()
    }

    /// The four byte fields in codec order
    #[must_use]
    pub fn byte_fields(&self) -> [Option<&[u8]>; 4] {
        [
            self.sequence.as_deref(),
            self.quality.as_deref(),
            self.paired_sequence.as_deref(),
            self.paired_quality.as_deref(),
        ]
    }

    /// Copy of this record without the four byte fields and without a blob
    #[must_use]
    pub fn without_byte_fields(&self) -> Self {
        Self {
            index: self.index,
            length: self.length,
            identifier: self.identifier.clone(),
            description: self.description.clone(),
            barcode_index: self.barcode_index,
            ..Self::default()
        }
    }
}

/// An ordered collection of records forming one chunk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordBatch {
    records: Vec<Record>,
}

impl RecordBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Moves a record out of the batch, leaving an empty record in its place
    pub fn take(&mut self, index: usize) -> Option<Record> {
        self.records.get_mut(index).map(std::mem::take)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Decodes a batch from a decompressed chunk payload
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (records, _) = bincode::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(Self { records })
    }
}

impl From<Vec<Record>> for RecordBatch {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl Batch for RecordBatch {
    fn len(&self) -> usize {
        self.records.len()
    }

    fn write_bytes(&self, buffer: &mut Vec<u8>) -> Result<()> {
        bincode::encode_into_std_write(&self.records, buffer, bincode::config::standard())?;
        Ok(())
    }

    fn clear(&mut self) {
        self.records.clear();
    }
}
