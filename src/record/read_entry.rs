use super::Record;
use crate::{Result, error::WriteError};

/// A zero-copy read used to append sequences to a container.
///
/// The writer assigns the record index and copies the fields into an owned
/// [`Record`] when the entry is appended.
///
/// # Example
///
/// ```
/// use chunkseq::ReadEntryBuilder;
///
/// let entry = ReadEntryBuilder::default()
///     .sequence(b"ACGTACGT")
///     .quality(b"IIIIFFFF")
///     .identifier("read_001")
///     .build()
///     .unwrap();
/// assert_eq!(entry.len(), 8);
/// ```
#[derive(Clone, Copy, Default, Debug)]
pub struct ReadEntry<'a> {
    pub(crate) sequence: &'a [u8],
    pub(crate) quality: Option<&'a [u8]>,
    pub(crate) paired_sequence: Option<&'a [u8]>,
    pub(crate) paired_quality: Option<&'a [u8]>,
    pub(crate) identifier: Option<&'a str>,
    pub(crate) description: Option<&'a str>,
    pub(crate) barcode_index: Option<u32>,
}

impl<'a> ReadEntry<'a> {
    /// Creates a single-end entry with only a sequence
    #[inline]
    #[must_use]
    pub fn new(sequence: &'a [u8]) -> Self {
        Self {
            sequence,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn sequence(&self) -> &'a [u8] {
        self.sequence
    }

    #[inline]
    #[must_use]
    pub fn quality(&self) -> Option<&'a [u8]> {
        self.quality
    }

    /// Returns the mate sequence if present
    #[inline]
    #[must_use]
    pub fn paired_sequence(&self) -> Option<&'a [u8]> {
        self.paired_sequence
    }

    #[inline]
    #[must_use]
    pub fn paired_quality(&self) -> Option<&'a [u8]> {
        self.paired_quality
    }

    #[inline]
    #[must_use]
    pub fn identifier(&self) -> Option<&'a str> {
        self.identifier
    }

    #[inline]
    #[must_use]
    pub fn description(&self) -> Option<&'a str> {
        self.description
    }

    #[inline]
    #[must_use]
    pub fn barcode_index(&self) -> Option<u32> {
        self.barcode_index
    }

    /// Number of bases in the primary sequence
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_paired(&self) -> bool {
        self.paired_sequence.is_some()
    }

    /// Copies the entry into an owned record with the given index
    #[must_use]
    pub fn to_record(&self, index: u32) -> Record {
        Record {
            index,
            length: self.sequence.len() as u32,
            sequence: Some(self.sequence.to_vec()),
            quality: self.quality.map(<[u8]>::to_vec),
            paired_sequence: self.paired_sequence.map(<[u8]>::to_vec),
            paired_quality: self.paired_quality.map(<[u8]>::to_vec),
            identifier: self.identifier.map(str::to_string),
            description: self.description.map(str::to_string),
            barcode_index: self.barcode_index,
            compressed_data: None,
        }
    }
}

/// A convenience builder struct for creating a [`ReadEntry`]
///
/// # Example
///
/// ```
/// use chunkseq::ReadEntryBuilder;
///
/// let paired = ReadEntryBuilder::default()
///     .sequence(b"ACGT")
///     .paired_sequence(b"TTGA")
///     .barcode_index(2)
///     .build()
///     .unwrap();
/// assert!(paired.is_paired());
/// ```
#[derive(Default)]
pub struct ReadEntryBuilder<'a> {
    sequence: Option<&'a [u8]>,
    quality: Option<&'a [u8]>,
    paired_sequence: Option<&'a [u8]>,
    paired_quality: Option<&'a [u8]>,
    identifier: Option<&'a str>,
    description: Option<&'a str>,
    barcode_index: Option<u32>,
}

impl<'a> ReadEntryBuilder<'a> {
    #[must_use]
    pub fn sequence(mut self, sequence: &'a [u8]) -> Self {
        self.sequence = Some(sequence);
        self
    }

    #[must_use]
    pub fn quality(mut self, quality: &'a [u8]) -> Self {
        self.quality = Some(quality);
        self
    }

    #[must_use]
    pub fn opt_quality(mut self, quality: Option<&'a [u8]>) -> Self {
        self.quality = quality;
        self
    }

    #[must_use]
    pub fn paired_sequence(mut self, paired_sequence: &'a [u8]) -> Self {
        self.paired_sequence = Some(paired_sequence);
        self
    }

    #[must_use]
    pub fn opt_paired_sequence(mut self, paired_sequence: Option<&'a [u8]>) -> Self {
        self.paired_sequence = paired_sequence;
        self
    }

    #[must_use]
    pub fn paired_quality(mut self, paired_quality: &'a [u8]) -> Self {
        self.paired_quality = Some(paired_quality);
        self
    }

    #[must_use]
    pub fn opt_paired_quality(mut self, paired_quality: Option<&'a [u8]>) -> Self {
        self.paired_quality = paired_quality;
        self
    }

    #[must_use]
    pub fn identifier(mut self, identifier: &'a str) -> Self {
        self.identifier = Some(identifier);
        self
    }

    #[must_use]
    pub fn description(mut self, description: &'a str) -> Self {
        self.description = Some(description);
        self
    }

    #[must_use]
    pub fn barcode_index(mut self, barcode_index: u32) -> Self {
        self.barcode_index = Some(barcode_index);
        self
    }

    /// Builds the entry
    ///
    /// # Errors
    ///
    /// Returns an error if no primary sequence was provided
    pub fn build(self) -> Result<ReadEntry<'a>> {
        let sequence = self.sequence.ok_or(WriteError::MissingSequence)?;
        Ok(ReadEntry {
            sequence,
            quality: self.quality,
            paired_sequence: self.paired_sequence,
            paired_quality: self.paired_quality,
            identifier: self.identifier,
            description: self.description,
            barcode_index: self.barcode_index,
        })
    }
}
