use std::io::{ErrorKind, Read, Seek, SeekFrom};

use log::{debug, trace, warn};
use memchr::memchr;

use super::FrameHeader;
use crate::chunk::ChunkCodecRegistry;
use crate::error::{FrameError, ReadError, Result};
use crate::{DELIMITER_BYTE, DELIMITER_LENGTH, FRAME_HEADER_SIZE};

/// Size of the blocks scanned while looking for a frame boundary
const SCAN_BLOCK_SIZE: usize = 64 * 1024;

/// Reads delimited frames and decompresses their payloads
///
/// Iteration follows the batch protocol of the writer: the caller keeps the
/// decoded batch and its own position within it (see
/// [`ChunkReader::increment_entry_index`]). [`ChunkReader::has_next`] loads
/// the next frame only once the current batch is exhausted.
pub struct ChunkReader<R: Read> {
    inner: R,
    registry: ChunkCodecRegistry,

    /// Stream offset of the next unread byte
    position: u64,

    /// Frames starting at or beyond this offset belong to another reader
    end: Option<u64>,

    /// Offset of the frame currently loaded
    frame_start: u64,

    /// Position of the caller within the current batch
    entry_index: usize,

    /// Staging buffer for the compressed payload
    payload: Vec<u8>,

    /// Decompressed bytes of the current batch
    batch_bytes: Vec<u8>,

    finished: bool,
    truncated: bool,
}

impl<R: Read> ChunkReader<R> {
    /// Reads every frame of a stream positioned at a frame boundary
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            registry: ChunkCodecRegistry::default(),
            position: 0,
            end: None,
            frame_start: 0,
            entry_index: 0,
            payload: Vec::new(),
            batch_bytes: Vec::new(),
            finished: false,
            truncated: false,
        }
    }

    /// Replaces the codec dispatch table
    #[must_use]
    pub fn with_registry(mut self, registry: ChunkCodecRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Loads the next frame once the current batch is exhausted
    ///
    /// Returns `true` while entries remain. After a `true` result with
    /// [`ChunkReader::entry_index`] at zero, [`ChunkReader::batch_bytes`] holds
    /// a freshly decompressed batch.
    ///
    /// A stream ending exactly at a frame boundary, a terminal frame, or a
    /// header without a delimiter ends the iteration. A payload cut short by
    /// the end of the stream also ends it, which is reported by
    /// [`ChunkReader::is_truncated`].
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, on a stream ending inside a frame header, and if
    /// the payload cannot be decompressed.
    pub fn has_next(&mut self, current_batch_size: usize) -> Result<bool> {
        if self.entry_index < current_batch_size {
            return Ok(true);
        }
        self.next_frame()
    }

    fn next_frame(&mut self) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }
        if self.end.is_some_and(|end| self.position >= end) {
            trace!("Reached split end at offset {}", self.position);
            self.finished = true;
            return Ok(false);
        }

        let mut header = [0u8; FRAME_HEADER_SIZE];
        let n_read = read_up_to(&mut self.inner, &mut header)?;
        if n_read == 0 {
            self.finished = true;
            return Ok(false);
        }
        if n_read < FRAME_HEADER_SIZE {
            self.finished = true;
            return Err(FrameError::TruncatedHeader(self.position, n_read).into());
        }
        let Some(header) = FrameHeader::from_bytes(&header) else {
            warn!("Missing frame delimiter at offset {}, ending stream", self.position);
            self.finished = true;
            return Ok(false);
        };
        if header.is_terminal() {
            trace!("Terminal frame at offset {}", self.position);
            self.finished = true;
            return Ok(false);
        }

        let expected = header.payload_len as usize;
        // grow with the bytes actually present, not the declared length
        self.payload.clear();
        let found = (&mut self.inner)
            .take(u64::from(header.payload_len))
            .read_to_end(&mut self.payload)?;
        if found < expected {
            warn!(
                "{}",
                FrameError::TruncatedPayload {
                    offset: self.position,
                    expected,
                    found,
                }
            );
            self.finished = true;
            self.truncated = true;
            return Ok(false);
        }

        self.batch_bytes.clear();
        self.registry
            .get(header.codec)
            .decode(&self.payload, &mut self.batch_bytes)?;
        self.frame_start = self.position;
        self.position += (FRAME_HEADER_SIZE + expected) as u64;
        self.entry_index = 0;
        Ok(true)
    }

    /// Decompressed bytes of the current batch
    #[must_use]
    pub fn batch_bytes(&self) -> &[u8] {
        &self.batch_bytes
    }

    /// Advances the position within the current batch
    pub fn increment_entry_index(&mut self) {
        self.entry_index += 1;
    }

    #[must_use]
    pub fn entry_index(&self) -> usize {
        self.entry_index
    }

    /// Offset of the frame currently loaded
    #[must_use]
    pub fn frame_start(&self) -> u64 {
        self.frame_start
    }

    /// Offset of the next unread byte
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether iteration ended on a payload cut short by the end of the stream
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl<R: Read + Seek> ChunkReader<R> {
    /// Reads the frames starting within `[start, end)`
    ///
    /// The reader resynchronizes on the first frame boundary at or after
    /// `start`. The last frame it reads may extend beyond `end`. Readers over
    /// contiguous ranges covering a file therefore see every frame exactly
    /// once.
    pub fn with_split(inner: R, start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(ReadError::InvalidRange { start, end }.into());
        }
        let mut reader = Self::new(inner);
        reader.seek(start)?;
        reader.end = Some(end);
        Ok(reader)
    }

    /// Moves to the first frame boundary at or after `position`
    ///
    /// The current batch is dropped and any split end is kept.
    pub fn seek(&mut self, position: u64) -> Result<()> {
        self.inner.seek(SeekFrom::Start(position))?;
        self.position = position;
        self.entry_index = 0;
        self.batch_bytes.clear();
        self.finished = false;
        self.truncated = false;

        match self.find_frame_start()? {
            Some(frame_start) => {
                debug!("Resynchronized from offset {position} to frame at {frame_start}");
                self.inner.seek(SeekFrom::Start(frame_start))?;
                self.position = frame_start;
            }
            None => {
                debug!("No frame boundary after offset {position}");
                self.finished = true;
            }
        }
        Ok(())
    }

    /// Scans forward for the last eight bytes of a delimiter run
    ///
    /// A run only counts once a byte other than the delimiter follows it, so
    /// payloads ending in delimiter bytes resolve to the real frame start.
    fn find_frame_start(&mut self) -> Result<Option<u64>> {
        let mut block = vec![0u8; SCAN_BLOCK_SIZE];
        let mut block_start = self.position;
        let mut run = 0usize;
        loop {
            let n_read = read_up_to(&mut self.inner, &mut block)?;
            if n_read == 0 {
                return Ok(None);
            }
            let mut i = 0;
            while i < n_read {
                if run == 0 {
                    match memchr(DELIMITER_BYTE, &block[i..n_read]) {
                        Some(skip) => i += skip,
                        None => break,
                    }
                }
                if block[i] == DELIMITER_BYTE {
                    run += 1;
                } else if run >= DELIMITER_LENGTH {
                    // the run may have started in a previous block
                    return Ok(Some(block_start + i as u64 - DELIMITER_LENGTH as u64));
                } else {
                    run = 0;
                }
                i += 1;
            }
            block_start += n_read as u64;
        }
    }
}

/// Fills `buffer` as far as the stream allows, returning the bytes read
fn read_up_to<R: Read>(reader: &mut R, buffer: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(filled)
}
