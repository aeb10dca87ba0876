use std::fs::File;
use std::io::Cursor;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use log::debug;
use memmap2::Mmap;

use crate::{
    Result,
    error::ReadError,
    reads::ReadsReader,
    record::Record,
};

/// Trait for readers that can process a container in parallel
///
/// This is implemented by the **reader** not by the **processor**.
/// For the **processor**, see the [`ParallelProcessor`] trait.
///
/// Ranges are byte offsets into the container. Every frame whose first
/// delimiter byte lies inside the range is processed, so contiguous ranges
/// visit each record exactly once.
pub trait ParallelReader {
    fn process_parallel<P: ParallelProcessor + Clone + 'static>(
        self,
        processor: P,
        num_threads: usize,
    ) -> Result<()>;

    /// Process the frames starting within a byte range in parallel
    ///
    /// The range is divided into contiguous sub-ranges, one per thread.
    ///
    /// # Arguments
    ///
    /// * `processor` - The processor to use for each record
    /// * `num_threads` - The number of threads to spawn (0 uses all cores)
    /// * `range` - The byte range of frame starts to process
    fn process_parallel_range<P: ParallelProcessor + Clone + 'static>(
        self,
        processor: P,
        num_threads: usize,
        range: Range<u64>,
    ) -> Result<()>;

    /// Validate a byte range against the length of the container
    fn validate_range(&self, total_bytes: u64, range: &Range<u64>) -> Result<()> {
        if range.start > range.end {
            Err(ReadError::InvalidRange {
                start: range.start,
                end: range.end,
            }
            .into())
        } else if range.end > total_bytes {
            Err(ReadError::OutOfRange {
                requested_index: range.end as usize,
                max_index: total_bytes as usize,
            }
            .into())
        } else {
            Ok(())
        }
    }
}

/// Trait for types that can process records in parallel.
///
/// This is implemented by the **processor** not by the **reader**.
/// For the **reader**, see the [`ParallelReader`] trait.
pub trait ParallelProcessor: Send + Clone {
    /// Process a single decoded record
    fn process_record(&mut self, record: &Record) -> Result<()>;

    /// Called after the records of each frame have been processed
    fn on_batch_complete(&mut self) -> Result<()> {
        Ok(())
    }

    /// Set the thread ID for this processor
    ///
    /// Each thread calls this method with its own unique ID.
    fn set_tid(&mut self, _tid: usize) {
        // Default implementation does nothing
    }

    /// Get the thread ID for this processor
    fn get_tid(&self) -> Option<usize> {
        None
    }
}

/// Shared view of the mapped file that a split reader can own
#[derive(Clone)]
struct SharedMap(Arc<Mmap>);

impl AsRef<[u8]> for SharedMap {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A memory-mapped container split across threads
///
/// Each thread runs its own [`ReadsReader`] over a byte range of the map, so
/// entry codec state is never shared between threads.
pub struct MmapReadsReader {
    /// Memory mapped file contents, wrapped in Arc for thread-safe sharing
    mmap: Arc<Mmap>,
}

impl MmapReadsReader {
    /// Maps a container file into memory
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not a regular file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        // Verify input file is a file before attempting to map
        let file = File::open(path)?;
        if !file.metadata()?.is_file() {
            return Err(ReadError::IncompatibleFile.into());
        }

        // Safety: the file is open and won't be modified while mapped
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap: Arc::new(mmap),
        })
    }

    /// Length of the container in bytes
    #[must_use]
    pub fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}

impl ParallelReader for MmapReadsReader {
    fn process_parallel<P: ParallelProcessor + Clone + 'static>(
        self,
        processor: P,
        num_threads: usize,
    ) -> Result<()> {
        let total_bytes = self.len();
        self.process_parallel_range(processor, num_threads, 0..total_bytes)
    }

    fn process_parallel_range<P: ParallelProcessor + Clone + 'static>(
        self,
        processor: P,
        num_threads: usize,
        range: Range<u64>,
    ) -> Result<()> {
        // Calculate the number of threads to use
        let num_threads = if num_threads == 0 {
            num_cpus::get()
        } else {
            num_threads.min(num_cpus::get())
        };

        self.validate_range(self.len(), &range)?;
        if range.is_empty() {
            return Ok(());
        }

        // Calculate the number of bytes scanned by each thread
        let bytes_per_thread = (range.end - range.start).div_ceil(num_threads as u64);
        debug!(
            "Splitting bytes {}..{} across {num_threads} threads",
            range.start, range.end
        );

        // Build thread handles
        let mut handles = Vec::new();
        for tid in 0..num_threads {
            let mut processor = processor.clone();
            let map = SharedMap(self.mmap.clone());
            processor.set_tid(tid);

            let handle = std::thread::spawn(move || -> Result<()> {
                let start = range.start + tid as u64 * bytes_per_thread;
                let end = (start + bytes_per_thread).min(range.end);

                if start >= end {
                    return Ok(()); // No bytes for this thread
                }

                let mut reader = ReadsReader::with_split(Cursor::new(map), start, end)?;
                while let Some(batch) = reader.read_batch()? {
                    for record in &batch {
                        processor.process_record(record)?;
                    }

                    // process the batch
                    processor.on_batch_complete()?;
                }

                Ok(())
            });

            handles.push(handle);
        }

        // Join every thread before reporting the first failure
        let mut outcome = Ok(());
        for handle in handles {
            let result = match handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            };
            if outcome.is_ok() {
                outcome = result;
            }
        }
        outcome
    }
}
