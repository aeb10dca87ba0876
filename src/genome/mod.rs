//! Random access to reference sequences
//!
//! Each reference is packed at two bits per base with `bitnuc` (32 bases per
//! `u64` word, first base in the low bits). Bases outside `ACGT` are stored as
//! `A` and flagged in a per-reference [`RoaringBitmap`], so they read back as
//! `N`.
//!
//! Lookups take reference indices as they were numbered when the cache was
//! built. A cache loaded with [`GenomeCache::load_trimmed`] keeps those
//! numbers for the references it retains.
//!
//! # Panics
//!
//! Position and reference index checks in [`GenomeCache::get`] and the other
//! positional accessors are assertions: violating them is a programming error
//! and panics in all builds. [`GenomeCache::checked_get`] is the fallible
//! alternative.

mod storage;

use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;

use log::debug;
use roaring::RoaringBitmap;
use seq_io::fasta::{self, Record as _};

use crate::error::{GenomeError, Result};

/// Decoded base for each two-bit code
const CODE_TO_BASE: [u8; 4] = *b"ACGT";

/// Bases held by one packed word
const BASES_PER_WORD: usize = 32;

/// One packed reference sequence
#[derive(Debug, Clone, PartialEq)]
struct PackedReference {
    name: String,
    length: u32,
    words: Vec<u64>,
    unknown: RoaringBitmap,
}

impl PackedReference {
    fn pack(name: String, bases: &[u8]) -> Result<Self> {
        let length = u32::try_from(bases.len()).map_err(|_| GenomeError::ReferenceTooLong(name.clone()))?;
        let mut unknown = RoaringBitmap::new();
        let normalized: Vec<u8> = bases
            .iter()
            .enumerate()
            .map(|(position, &base)| match base.to_ascii_uppercase() {
                upper @ (b'A' | b'C' | b'G' | b'T') => upper,
                _ => {
                    unknown.insert(position as u32);
                    b'A'
                }
            })
            .collect();
        let mut words = Vec::with_capacity(normalized.len().div_ceil(BASES_PER_WORD));
        // bitnuc cannot pack an empty slice
        if !normalized.is_empty() {
            bitnuc::encode(&normalized, &mut words)?;
        }
        Ok(Self {
            name,
            length,
            words,
            unknown,
        })
    }

    #[inline]
    fn base(&self, position: usize) -> u8 {
        if self.unknown.contains(position as u32) {
            return b'N';
        }
        let word = self.words[position / BASES_PER_WORD];
        let code = (word >> ((position % BASES_PER_WORD) * 2)) & 0b11;
        CODE_TO_BASE[code as usize]
    }
}

/// Two-bit packed reference sequences with O(1) base lookup
///
/// Once built the cache is read-only and can be shared between threads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenomeCache {
    references: Vec<PackedReference>,

    /// Reference index of each name
    names: HashMap<String, usize>,

    /// Reference index of `references[0]`
    first_index: usize,
}

impl GenomeCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the references of a FASTA file, which may be compressed
    ///
    /// A reference is named after the first word of its header line.
    pub fn load_fasta<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let (handle, format) = niffler::from_path(path.as_ref())?;
        debug!("Loading references from {} ({format:?})", path.as_ref().display());
        let mut reader = fasta::Reader::new(handle);
        while let Some(record) = reader.next() {
            let record = record?;
            let name = std::str::from_utf8(record.head())?
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string();
            self.push_reference(name, &record.full_seq())?;
        }
        debug!("Cached {} references", self.references.len());
        Ok(())
    }

    /// Appends references from any source of named base sequences
    pub fn load_sequences<I, N, S>(&mut self, sequences: I) -> Result<()>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: AsRef<[u8]>,
    {
        for (name, bases) in sequences {
            self.push_reference(name.into(), bases.as_ref())?;
        }
        Ok(())
    }

    fn push_reference(&mut self, name: String, bases: &[u8]) -> Result<()> {
        let reference = PackedReference::pack(name, bases)?;
        let index = self.first_index + self.references.len();
        self.names.insert(reference.name.clone(), index);
        self.references.push(reference);
        Ok(())
    }

    #[inline]
    fn reference(&self, reference_index: usize) -> &PackedReference {
        assert!(
            self.index_range().contains(&reference_index),
            "reference index {reference_index} outside of loaded range {:?}",
            self.index_range()
        );
        &self.references[reference_index - self.first_index]
    }

    /// Returns the base at `position`, with `N` for unknown bases
    ///
    /// # Panics
    ///
    /// Panics if the reference is not loaded or `position` is past its end.
    #[must_use]
    pub fn get(&self, reference_index: usize, position: usize) -> u8 {
        let reference = self.reference(reference_index);
        assert!(
            position < reference.length as usize,
            "position {position} beyond the {} bases of {}",
            reference.length,
            reference.name
        );
        reference.base(position)
    }

    /// Returns the base at `position`, or `None` when out of bounds
    #[must_use]
    pub fn checked_get(&self, reference_index: usize, position: usize) -> Option<u8> {
        let reference = self
            .references
            .get(reference_index.checked_sub(self.first_index)?)?;
        (position < reference.length as usize).then(|| reference.base(position))
    }

    /// Returns a base of the reference called `name`
    ///
    /// # Panics
    ///
    /// Panics if `position` is past the end of the reference.
    #[must_use]
    pub fn get_by_name(&self, name: &str, position: usize) -> Option<u8> {
        self.reference_index(name).map(|index| self.get(index, position))
    }

    /// Replaces the contents of `output` with `length` bases from `position`
    ///
    /// # Panics
    ///
    /// Panics if the range is not within the reference.
    pub fn get_range(&self, reference_index: usize, position: usize, length: usize, output: &mut Vec<u8>) {
        let reference = self.reference(reference_index);
        assert!(
            position + length <= reference.length as usize,
            "range {position}+{length} beyond the {} bases of {}",
            reference.length,
            reference.name
        );
        output.clear();
        output.extend((position..position + length).map(|i| reference.base(i)));
    }

    #[must_use]
    pub fn reference_index(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// # Panics
    ///
    /// Panics if the reference is not loaded.
    #[must_use]
    pub fn reference_name(&self, reference_index: usize) -> &str {
        &self.reference(reference_index).name
    }

    /// Number of bases of a reference
    ///
    /// # Panics
    ///
    /// Panics if the reference is not loaded.
    #[must_use]
    pub fn sequence_size(&self, reference_index: usize) -> usize {
        self.reference(reference_index).length as usize
    }

    /// Number of loaded references
    #[must_use]
    pub fn number_of_sequences(&self) -> usize {
        self.references.len()
    }

    /// Reference indices available for lookup
    #[must_use]
    pub fn index_range(&self) -> Range<usize> {
        self.first_index..self.first_index + self.references.len()
    }
}

/// Memoizes the last range decoded from a [`GenomeCache`]
///
/// Repeated requests for the same range return the decoded bases without
/// unpacking them again.
#[derive(Debug, Clone, Default)]
pub struct RangeCache {
    key: Option<(usize, usize, usize)>,
    bases: Vec<u8>,
}

impl RangeCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `length` bases from `position`
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`GenomeCache::get_range`].
    pub fn get_range(&mut self, genome: &GenomeCache, reference_index: usize, position: usize, length: usize) -> &[u8] {
        let key = (reference_index, position, length);
        if self.key != Some(key) {
            genome.get_range(reference_index, position, length, &mut self.bases);
            self.key = Some(key);
        }
        &self.bases
    }

    /// Forgets the memoized range
    pub fn invalidate(&mut self) {
        self.key = None;
        self.bases.clear();
    }
}
