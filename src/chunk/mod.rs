//! Whole-batch compression
//!
//! A [`ChunkCodec`] turns the serialized bytes of one batch into the payload
//! of one container frame. Every frame records the registration code of the
//! codec that produced it, so a single file may mix codecs and readers
//! dispatch through a [`ChunkCodecRegistry`].

mod codecs;
mod registry;

pub use codecs::{GzipCodec, ZstdCodec};
pub use registry::ChunkCodecRegistry;

use std::str::FromStr;
use std::sync::Arc;

use auto_impl::auto_impl;

use crate::error::{CodecError, Result};

/// Registration code of [`GzipCodec`]
pub const GZIP_CHUNK_CODE: u8 = 0x01;

/// Registration code of [`ZstdCodec`]
pub const ZSTD_CHUNK_CODE: u8 = 0x02;

/// A compressor for the serialized bytes of a batch
#[auto_impl(&, Box, Arc)]
pub trait ChunkCodec: Send + Sync {
    fn name(&self) -> &'static str;

    /// File-format stable identifier written in every frame header
    fn registration_code(&self) -> u8;

    /// Compresses `batch` and appends the result to `output`
    fn encode(&self, batch: &[u8], output: &mut Vec<u8>) -> Result<()>;

    /// Decompresses `payload` and appends the result to `output`
    fn decode(&self, payload: &[u8], output: &mut Vec<u8>) -> Result<()>;
}

/// Built-in chunk codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkCodecKind {
    #[default]
    Gzip,
    Zstd,
}
impl ChunkCodecKind {
    #[must_use]
    pub fn registration_code(self) -> u8 {
        match self {
            Self::Gzip => GZIP_CHUNK_CODE,
            Self::Zstd => ZSTD_CHUNK_CODE,
        }
    }

    /// Creates the codec at the given compression level (or its default)
    #[must_use]
    pub fn build(self, level: Option<i32>) -> Arc<dyn ChunkCodec> {
        match self {
            Self::Gzip => Arc::new(level.map_or_else(GzipCodec::default, GzipCodec::new)),
            Self::Zstd => Arc::new(level.map_or_else(ZstdCodec::default, ZstdCodec::new)),
        }
    }
}
impl FromStr for ChunkCodecKind {
    type Err = CodecError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Ok(Self::Gzip),
            "zstd" | "zst" => Ok(Self::Zstd),
            _ => Err(CodecError::UnknownCodec(s.to_string())),
        }
    }
}
