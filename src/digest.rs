//! CRC32 digests of fixed-length sequence windows
//!
//! [`SequenceDigests`] maps the digest of a window of bases to the indices of
//! the sequences it was computed from. Digests are a pre-filter: a hit must be
//! confirmed with [`SequenceDigests::confirm_match`] before it is trusted.
//!
//! An index built for the negative strand digests the reverse complement of
//! each window. An optional mask restricts the digest to selected window
//! positions, so two indices over complementary masks tolerate a single
//! mismatch between them.

use std::collections::HashMap;

use crc32fast::Hasher;

/// Bytes complemented per hasher update
const COMPLEMENT_BLOCK: usize = 64;

/// Watson-Crick complement, other bytes are returned unchanged
#[inline]
#[must_use]
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'C' => b'G',
        b'T' => b'A',
        b'G' => b'C',
        other => other,
    }
}

/// Reverse complement of a sequence
#[must_use]
pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
    sequence.iter().rev().map(|&b| complement(b)).collect()
}

/// Index from window digests to sequence indices
#[derive(Debug, Clone, Default)]
pub struct SequenceDigests {
    index: HashMap<u32, Vec<u32>>,

    /// Window positions included in the digest, all when absent
    mask: Option<Vec<bool>>,

    read_length: usize,
    positive_strand: bool,
}

impl SequenceDigests {
    /// An index over complete windows of `read_length` bases
    #[must_use]
    pub fn new(read_length: usize, positive_strand: bool) -> Self {
        Self {
            index: HashMap::new(),
            mask: None,
            read_length,
            positive_strand,
        }
    }

    /// An index over the window positions selected by `mask`
    ///
    /// Positions beyond the end of the mask are excluded.
    #[must_use]
    pub fn with_mask(mask: Vec<bool>, read_length: usize, positive_strand: bool) -> Self {
        Self {
            mask: Some(mask),
            ..Self::new(read_length, positive_strand)
        }
    }

    #[inline]
    fn included(&self, window_position: usize) -> bool {
        self.mask
            .as_ref()
            .is_none_or(|mask| mask.get(window_position).copied().unwrap_or(false))
    }

    /// Digest of `sequence[offset..offset + length]` on the strand of the index
    ///
    /// # Panics
    ///
    /// Panics if the window extends past the end of `sequence`.
    #[must_use]
    pub fn digest(&self, sequence: &[u8], offset: usize, length: usize) -> u32 {
        if self.positive_strand {
            self.digest_direct_strand_only(sequence, offset, length)
        } else {
            self.digest_reverse_complement(&sequence[offset..offset + length])
        }
    }

    /// Digest of a window read left to right whatever the strand of the index
    ///
    /// # Panics
    ///
    /// Panics if the window extends past the end of `sequence`.
    #[must_use]
    pub fn digest_direct_strand_only(&self, sequence: &[u8], offset: usize, length: usize) -> u32 {
        let window = &sequence[offset..offset + length];
        if self.mask.is_none() {
            return crc32fast::hash(window);
        }
        let mut hasher = Hasher::new();
        for (position, base) in window.iter().enumerate() {
            if self.included(position) {
                hasher.update(std::slice::from_ref(base));
            }
        }
        hasher.finalize()
    }

    fn digest_reverse_complement(&self, window: &[u8]) -> u32 {
        let mut hasher = Hasher::new();
        let mut block = [0u8; COMPLEMENT_BLOCK];
        let mut filled = 0;
        for (position, &base) in window.iter().enumerate().rev() {
            if !self.included(position) {
                continue;
            }
            block[filled] = complement(base);
            filled += 1;
            if filled == COMPLEMENT_BLOCK {
                hasher.update(&block);
                filled = 0;
            }
        }
        hasher.update(&block[..filled]);
        hasher.finalize()
    }

    /// Associates the window of `read_length` bases at `offset` with `sequence_index`
    ///
    /// Storing the same association twice has no effect.
    pub fn digest_and_store(&mut self, sequence: &[u8], offset: usize, sequence_index: u32) {
        let digest = self.digest(sequence, offset, self.read_length);
        let indices = self.index.entry(digest).or_default();
        if !indices.contains(&sequence_index) {
            indices.push(sequence_index);
        }
    }

    /// Sequence indices whose digest equals that of the given window
    #[must_use]
    pub fn lookup(&self, sequence: &[u8], offset: usize, length: usize) -> &[u32] {
        self.read_indices(self.digest(sequence, offset, length))
    }

    /// Sequence indices stored under `digest`, empty if none
    #[must_use]
    pub fn read_indices(&self, digest: u32) -> &[u32] {
        self.index.get(&digest).map_or(&[], Vec::as_slice)
    }

    /// Forgets every association of `digest`
    pub fn remove(&mut self, digest: u32) {
        self.index.remove(&digest);
    }

    /// Forgets one association, and the digest once none remain
    pub fn remove_index(&mut self, digest: u32, sequence_index: u32) {
        if let Some(indices) = self.index.get_mut(&digest) {
            indices.retain(|&i| i != sequence_index);
            if indices.is_empty() {
                self.index.remove(&digest);
            }
        }
    }

    /// Compares a read base by base against `reference` at `reference_position`
    ///
    /// On the negative strand the reverse complement of the read is compared.
    /// Windows extending past the end of the reference never match.
    #[must_use]
    pub fn confirm_match(&self, read: &[u8], reference: &[u8], reference_position: usize) -> bool {
        let Some(read) = read.get(..self.read_length) else {
            return false;
        };
        let Some(window) = reference.get(reference_position..reference_position + self.read_length) else {
            return false;
        };
        if self.positive_strand {
            read == window
        } else {
            read.iter()
                .rev()
                .zip(window)
                .all(|(&r, &w)| complement(r) == w)
        }
    }

    #[must_use]
    pub fn is_matching_positive_strand(&self) -> bool {
        self.positive_strand
    }

    #[must_use]
    pub fn read_length(&self) -> usize {
        self.read_length
    }

    /// Number of distinct digests stored
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
