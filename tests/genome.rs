use std::io::Write;

use chunkseq::digest::{SequenceDigests, reverse_complement};
use chunkseq::{GenomeCache, RangeCache};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use tempfile::TempDir;

const READ_LENGTH: usize = 24;

fn random_bases(rng: &mut SmallRng, len: usize) -> Vec<u8> {
    (0..len).map(|_| b"ACGT"[rng.random_range(0..4)]).collect()
}

#[test]
fn unknown_bases_read_back_as_n() {
    let mut genome = GenomeCache::new();
    genome.load_sequences([("chr1", "ACGTNNACGT")]).unwrap();
    let bases: Vec<u8> = (0..10).map(|i| genome.get(0, i)).collect();
    assert_eq!(bases, b"ACGTNNACGT");

    let mut range = Vec::new();
    genome.get_range(0, 3, 4, &mut range);
    assert_eq!(range, b"TNNA");
}

#[test]
fn fasta_to_cache_and_back() {
    let dir = TempDir::new().unwrap();
    let fasta = dir.path().join("ref.fa");
    let mut file = std::fs::File::create(&fasta).unwrap();
    writeln!(file, ">chr1 first chromosome\nACGTACGTNN\nacgtRYacgt\n>chr2\nTTTTGGGG").unwrap();
    drop(file);

    let mut genome = GenomeCache::new();
    genome.load_fasta(&fasta).unwrap();
    assert_eq!(genome.number_of_sequences(), 2);
    assert_eq!(genome.sequence_size(0), 20);
    assert_eq!(genome.reference_index("chr2"), Some(1));

    let mut cache = RangeCache::new();
    assert_eq!(cache.get_range(&genome, 0, 8, 12), b"NNACGTNNACGT");

    let basename = dir.path().join("ref");
    assert!(!GenomeCache::can_load(&basename));
    genome.save(&basename).unwrap();
    assert!(GenomeCache::can_load(&basename));

    let loaded = GenomeCache::load(&basename).unwrap();
    assert_eq!(loaded, genome);

    let trimmed = GenomeCache::load_trimmed(&basename, "1", "max").unwrap();
    assert_eq!(trimmed.number_of_sequences(), 1);
    assert_eq!(trimmed.reference_name(1), "chr2");
    assert_eq!(trimmed.get_by_name("chr2", 4), Some(b'G'));
    assert_eq!(trimmed.get_by_name("chr1", 0), None);
}

#[test]
fn fasta_with_empty_record_loads() {
    let dir = TempDir::new().unwrap();
    let fasta = dir.path().join("gaps.fa");
    std::fs::write(&fasta, ">empty\n>chr2\nGATTACA\n").unwrap();

    let mut genome = GenomeCache::new();
    genome.load_fasta(&fasta).unwrap();
    assert_eq!(genome.number_of_sequences(), 2);
    assert_eq!(genome.sequence_size(0), 0);
    assert_eq!(genome.checked_get(0, 0), None);
    assert_eq!(genome.get_by_name("chr2", 3), Some(b'T'));
}

#[test]
fn digests_find_reads_on_both_strands() {
    let mut rng = SmallRng::seed_from_u64(77);
    let reference = random_bases(&mut rng, 2_000);

    let mut genome = GenomeCache::new();
    genome.load_sequences([("contig", &reference[..])]).unwrap();

    // reads sampled from the reference, half of them reverse complemented
    let positions: Vec<usize> = (0..50).map(|_| rng.random_range(0..2_000 - READ_LENGTH)).collect();
    let reads: Vec<Vec<u8>> = positions
        .iter()
        .enumerate()
        .map(|(i, &pos)| {
            let window = &reference[pos..pos + READ_LENGTH];
            if i % 2 == 0 { window.to_vec() } else { reverse_complement(window) }
        })
        .collect();

    let mut forward = SequenceDigests::new(READ_LENGTH, true);
    let mut reverse = SequenceDigests::new(READ_LENGTH, false);
    for (i, read) in reads.iter().enumerate() {
        forward.digest_and_store(read, 0, i as u32);
        reverse.digest_and_store(read, 0, i as u32);
    }

    // scan the reference as the matching step would
    let mut window = Vec::new();
    let mut found = vec![false; reads.len()];
    for pos in 0..=genome.sequence_size(0) - READ_LENGTH {
        genome.get_range(0, pos, READ_LENGTH, &mut window);
        for digests in [&forward, &reverse] {
            let digest = digests.digest_direct_strand_only(&window, 0, READ_LENGTH);
            for &index in digests.read_indices(digest) {
                if digests.confirm_match(&reads[index as usize], &window, 0) {
                    found[index as usize] = true;
                }
            }
        }
    }
    assert!(found.iter().all(|&f| f));
}

#[test]
fn single_substitution_is_never_confirmed() {
    let mut rng = SmallRng::seed_from_u64(5);
    let reference = random_bases(&mut rng, 500);
    let digests = SequenceDigests::new(READ_LENGTH, true);
    let read = reference[100..100 + READ_LENGTH].to_vec();
    assert!(digests.confirm_match(&read, &reference, 100));
    for position in 0..READ_LENGTH {
        let mut mutated = read.clone();
        mutated[position] = if mutated[position] == b'A' { b'C' } else { b'A' };
        assert!(!digests.confirm_match(&mutated, &reference, 100));
    }
}

#[test]
fn palindrome_digest_matches_on_both_strands() {
    let forward = SequenceDigests::new(4, true);
    let reverse = SequenceDigests::new(4, false);
    assert_eq!(forward.digest(b"ACGT", 0, 4), reverse.digest(&reverse_complement(b"ACGT"), 0, 4));
}
