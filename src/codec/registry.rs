use log::trace;

use super::{ArithmeticEntryCodec, DeltaEntryCodec, EntryCodec};
use crate::error::{CodecError, Result};
use crate::record::Record;
use crate::DELIMITER_BYTE;

/// Reader-side dispatch over entry codecs keyed by registration code
///
/// The first coded record of each chunk carries the code of the codec that
/// wrote it. The registry offers that record to every registered codec in
/// turn and keeps the one that accepts it for the rest of the chunk.
pub struct EntryCodecRegistry {
    codecs: Vec<Box<dyn EntryCodec>>,

    /// Position in `codecs` of the codec that owns the current chunk
    active: Option<usize>,
}

impl Default for EntryCodecRegistry {
    /// A registry holding every built-in codec
    fn default() -> Self {
        Self {
            codecs: vec![
                Box::new(ArithmeticEntryCodec::new()),
                Box::new(DeltaEntryCodec::new()),
            ],
            active: None,
        }
    }
}

impl EntryCodecRegistry {
    /// An empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            codecs: Vec::new(),
            active: None,
        }
    }

    /// Adds a codec to the registry
    ///
    /// # Errors
    ///
    /// Fails if the code equals the frame delimiter byte or is already taken.
    pub fn register(&mut self, codec: Box<dyn EntryCodec>) -> Result<()> {
        let code = codec.registration_code();
        if code == DELIMITER_BYTE {
            return Err(CodecError::ReservedRegistrationCode(code).into());
        }
        if self.codecs.iter().any(|c| c.registration_code() == code) {
            return Err(CodecError::DuplicateRegistrationCode(code).into());
        }
        self.codecs.push(codec);
        Ok(())
    }

    /// Resets every codec and forgets the codec of the previous chunk
    pub fn new_chunk(&mut self) {
        for codec in &mut self.codecs {
            codec.new_chunk();
        }
        self.active = None;
    }

    /// Restores the byte fields of a record
    ///
    /// Returns `None` if the record carries no blob or no registered codec
    /// recognizes the chunk.
    pub fn decode(&mut self, record: &Record) -> Result<Option<Record>> {
        if !record.is_compressed() {
            return Ok(None);
        }
        if let Some(active) = self.active {
            return self.codecs[active].decode(record, false);
        }
        for (position, codec) in self.codecs.iter_mut().enumerate() {
            if let Some(decoded) = codec.decode(record, true)? {
                trace!("Chunk entries coded with {}", codec.name());
                self.active = Some(position);
                return Ok(Some(decoded));
            }
        }
        Ok(None)
    }

    /// Number of registered codecs
    #[must_use]
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}
