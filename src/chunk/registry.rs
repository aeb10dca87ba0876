use std::collections::HashMap;
use std::sync::Arc;

use log::warn;

use super::{ChunkCodec, GzipCodec, ZstdCodec};
use crate::error::{CodecError, Result};
use crate::DELIMITER_BYTE;

/// Reader-side dispatch over chunk codecs keyed by registration code
///
/// Frames carrying an unregistered code are decoded with the default codec.
/// This keeps files written with a since-removed codec code readable when the
/// payload format is unchanged, at the cost of misdecoding genuinely unknown
/// codecs.
#[derive(Clone)]
pub struct ChunkCodecRegistry {
    codecs: HashMap<u8, Arc<dyn ChunkCodec>>,
    default: Arc<dyn ChunkCodec>,
}

impl Default for ChunkCodecRegistry {
    /// Every built-in codec, with gzip as the fallback
    fn default() -> Self {
        let default: Arc<dyn ChunkCodec> = Arc::new(GzipCodec::default());
        let zstd: Arc<dyn ChunkCodec> = Arc::new(ZstdCodec::default());
        let codecs = [default.clone(), zstd]
            .into_iter()
            .map(|codec| (codec.registration_code(), codec))
            .collect();
        Self { codecs, default }
    }
}

impl ChunkCodecRegistry {
    /// A registry holding only `default`
    ///
    /// # Errors
    ///
    /// Fails if the codec uses the reserved delimiter byte.
    pub fn new(default: Arc<dyn ChunkCodec>) -> Result<Self> {
        let mut registry = Self {
            codecs: HashMap::new(),
            default: default.clone(),
        };
        registry.register(default)?;
        Ok(registry)
    }

    /// Adds a codec to the registry
    ///
    /// # Errors
    ///
    /// Fails if the code equals the frame delimiter byte or is already taken.
    pub fn register(&mut self, codec: Arc<dyn ChunkCodec>) -> Result<()> {
        let code = codec.registration_code();
        if code == DELIMITER_BYTE {
            return Err(CodecError::ReservedRegistrationCode(code).into());
        }
        if self.codecs.contains_key(&code) {
            return Err(CodecError::DuplicateRegistrationCode(code).into());
        }
        self.codecs.insert(code, codec);
        Ok(())
    }

    /// Returns the codec registered under `code`, or the default codec
    #[must_use]
    pub fn get(&self, code: u8) -> &Arc<dyn ChunkCodec> {
        if let Some(codec) = self.codecs.get(&code) {
            codec
        } else {
            warn!(
                "Unknown chunk codec {code:#04x}, decoding with {}",
                self.default.name()
            );
            &self.default
        }
    }

    #[must_use]
    pub fn contains(&self, code: u8) -> bool {
        self.codecs.contains_key(&code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}
