//! Read sets stored in a chunk container
//!
//! [`ReadsWriter`] assigns read indices, applies an optional entry codec and
//! batches records into container frames. [`ReadsReader`] reverses the
//! process, optionally over a byte range of the file.

mod reader;
mod writer;

pub use reader::ReadsReader;
pub use writer::{ReadsWriter, ReadsWriterBuilder};

use std::path::{Path, PathBuf};

/// File extensions recognized as read set containers
pub const READS_EXTENSIONS: [&str; 2] = [".compact-reads", ".chunkseq"];

/// Strips a known read set extension from `path`
///
/// Paths without a known extension are returned unchanged.
pub fn basename<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    let text = path.to_string_lossy();
    READS_EXTENSIONS
        .iter()
        .find_map(|ext| text.strip_suffix(ext))
        .map_or_else(|| path.to_path_buf(), PathBuf::from)
}
