//! On-disk layout of a genome cache
//!
//! A cache saved under `basename` spans four sibling files:
//!
//! | File | Contents |
//! |------|----------|
//! | `<basename>.sizes` | bincode `Vec<u32>` of reference lengths |
//! | `<basename>.names` | bincode `Vec<String>` of reference names |
//! | `<basename>.bases` | packed words of every reference, little-endian `u64` |
//! | `<basename>.ignore` | per reference, a big-endian `u32` length then a serialized roaring bitmap |

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use log::debug;
use roaring::RoaringBitmap;

use super::{GenomeCache, PackedReference, BASES_PER_WORD};
use crate::error::{GenomeError, Result};

const SIZES_EXTENSION: &str = ".sizes";
const NAMES_EXTENSION: &str = ".names";
const BASES_EXTENSION: &str = ".bases";
const IGNORE_EXTENSION: &str = ".ignore";

const COMPONENTS: [&str; 4] = [SIZES_EXTENSION, NAMES_EXTENSION, BASES_EXTENSION, IGNORE_EXTENSION];

fn component_path(basename: &Path, extension: &str) -> PathBuf {
    let mut path = basename.as_os_str().to_owned();
    path.push(extension);
    PathBuf::from(path)
}

/// Resolves a trim bound: `min`, `max` or an explicit reference index
fn parse_bound(bound: &str, n_references: usize) -> Result<usize> {
    match bound {
        "min" => Ok(0),
        "max" => Ok(n_references.saturating_sub(1)),
        _ => bound
            .parse()
            .map_err(|_| GenomeError::InvalidBound(bound.to_string()).into()),
    }
}

impl GenomeCache {
    /// Whether every component file of `basename` exists
    pub fn can_load<P: AsRef<Path>>(basename: P) -> bool {
        COMPONENTS
            .iter()
            .all(|ext| component_path(basename.as_ref(), ext).is_file())
    }

    /// Writes the loaded references under `basename`
    ///
    /// References are numbered from 0 in the saved cache.
    pub fn save<P: AsRef<Path>>(&self, basename: P) -> Result<()> {
        let basename = basename.as_ref();
        let config = bincode::config::standard();

        let sizes: Vec<u32> = self.references.iter().map(|r| r.length).collect();
        let mut writer = BufWriter::new(File::create(component_path(basename, SIZES_EXTENSION))?);
        bincode::encode_into_std_write(&sizes, &mut writer, config)?;
        writer.flush()?;

        let names: Vec<&str> = self.references.iter().map(|r| r.name.as_str()).collect();
        let mut writer = BufWriter::new(File::create(component_path(basename, NAMES_EXTENSION))?);
        bincode::encode_into_std_write(&names, &mut writer, config)?;
        writer.flush()?;

        let mut writer = BufWriter::new(File::create(component_path(basename, BASES_EXTENSION))?);
        self.references
            .iter()
            .flat_map(|r| r.words.iter())
            .try_for_each(|&word| writer.write_u64::<LittleEndian>(word))?;
        writer.flush()?;

        let mut writer = BufWriter::new(File::create(component_path(basename, IGNORE_EXTENSION))?);
        let mut bitmap = Vec::new();
        for reference in &self.references {
            bitmap.clear();
            reference.unknown.serialize_into(&mut bitmap)?;
            writer.write_u32::<BigEndian>(bitmap.len() as u32)?;
            writer.write_all(&bitmap)?;
        }
        writer.flush()?;

        debug!("Saved {} references to {}", self.references.len(), basename.display());
        Ok(())
    }

    /// Loads every reference saved under `basename`
    pub fn load<P: AsRef<Path>>(basename: P) -> Result<Self> {
        Self::load_trimmed(basename, "min", "max")
    }

    /// Loads the references with indices in `[min, max]`
    ///
    /// Each bound is a reference index, or `min` / `max` for no trimming on
    /// that side. Retained references keep their saved indices.
    pub fn load_trimmed<P: AsRef<Path>>(basename: P, min: &str, max: &str) -> Result<Self> {
        let basename = basename.as_ref();
        if let Some(missing) = COMPONENTS
            .iter()
            .map(|ext| component_path(basename, ext))
            .find(|path| !path.is_file())
        {
            return Err(GenomeError::MissingFile(missing.display().to_string()).into());
        }
        let config = bincode::config::standard();

        let mut reader = BufReader::new(File::open(component_path(basename, SIZES_EXTENSION))?);
        let sizes: Vec<u32> = bincode::decode_from_std_read(&mut reader, config)?;
        let mut reader = BufReader::new(File::open(component_path(basename, NAMES_EXTENSION))?);
        let names: Vec<String> = bincode::decode_from_std_read(&mut reader, config)?;
        if names.len() != sizes.len() {
            return Err(GenomeError::Inconsistent(format!(
                "{} names for {} sizes",
                names.len(),
                sizes.len()
            ))
            .into());
        }

        let n_references = sizes.len();
        if n_references == 0 {
            return Ok(Self::default());
        }
        let first = parse_bound(min, n_references)?;
        let last = parse_bound(max, n_references)?;
        if first > last || last >= n_references {
            return Err(GenomeError::InvalidTrim {
                min: first,
                max: last,
                n_references,
            }
            .into());
        }

        let mut bases = BufReader::new(File::open(component_path(basename, BASES_EXTENSION))?);
        let mut ignore = BufReader::new(File::open(component_path(basename, IGNORE_EXTENSION))?);
        let mut cache = Self {
            first_index: first,
            ..Self::default()
        };
        let mut bitmap = Vec::new();
        for (index, (name, length)) in names.into_iter().zip(sizes).enumerate().take(last + 1) {
            let mut words = vec![0u64; (length as usize).div_ceil(BASES_PER_WORD)];
            bases.read_u64_into::<LittleEndian>(&mut words)?;
            bitmap.resize(ignore.read_u32::<BigEndian>()? as usize, 0);
            ignore.read_exact(&mut bitmap)?;
            if index < first {
                continue;
            }
            let unknown = RoaringBitmap::deserialize_from(bitmap.as_slice())?;
            cache.names.insert(name.clone(), index);
            cache.references.push(PackedReference {
                name,
                length,
                words,
                unknown,
            });
        }

        debug!(
            "Loaded references {first}..={last} of {n_references} from {}",
            basename.display()
        );
        Ok(cache)
    }
}
