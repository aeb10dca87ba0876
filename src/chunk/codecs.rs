use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use zstd::stream::{copy_decode, copy_encode};

use super::{ChunkCodec, GZIP_CHUNK_CODE, ZSTD_CHUNK_CODE};
use crate::error::Result;
use crate::DEFAULT_COMPRESSION_LEVEL;

/// Deflate stream compression of a whole batch
#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    level: Compression,
}
impl Default for GzipCodec {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}
impl GzipCodec {
    /// Levels are clamped to `0..=9`
    #[must_use]
    pub fn new(level: i32) -> Self {
        Self {
            level: Compression::new(level.clamp(0, 9) as u32),
        }
    }
}
impl ChunkCodec for GzipCodec {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn registration_code(&self) -> u8 {
        GZIP_CHUNK_CODE
    }

    fn encode(&self, batch: &[u8], output: &mut Vec<u8>) -> Result<()> {
        let mut encoder = GzEncoder::new(output, self.level);
        encoder.write_all(batch)?;
        encoder.finish()?;
        Ok(())
    }

    fn decode(&self, payload: &[u8], output: &mut Vec<u8>) -> Result<()> {
        GzDecoder::new(payload).read_to_end(output)?;
        Ok(())
    }
}

/// Zstandard compression of a whole batch
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
}
impl Default for ZstdCodec {
    fn default() -> Self {
        Self {
            level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}
impl ZstdCodec {
    #[must_use]
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}
impl ChunkCodec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn registration_code(&self) -> u8 {
        ZSTD_CHUNK_CODE
    }

    fn encode(&self, batch: &[u8], output: &mut Vec<u8>) -> Result<()> {
        copy_encode(batch, output, self.level)?;
        Ok(())
    }

    fn decode(&self, payload: &[u8], output: &mut Vec<u8>) -> Result<()> {
        copy_decode(payload, output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        b"ACGTACGTNNNN".iter().copied().cycle().take(4096).collect()
    }

    #[test]
    fn test_gzip_round_trip() {
        let codec = GzipCodec::default();
        let mut payload = Vec::new();
        codec.encode(&sample(), &mut payload).unwrap();
        assert!(payload.len() < 4096);

        let mut batch = Vec::new();
        codec.decode(&payload, &mut batch).unwrap();
        assert_eq!(batch, sample());
    }

    #[test]
    fn test_zstd_round_trip() {
        let codec = ZstdCodec::new(1);
        let mut payload = Vec::new();
        codec.encode(&sample(), &mut payload).unwrap();
        let mut batch = Vec::new();
        codec.decode(&payload, &mut batch).unwrap();
        assert_eq!(batch, sample());
    }

    #[test]
    fn test_output_is_appended() {
        let codec = GzipCodec::new(42);
        let mut payload = vec![7u8];
        codec.encode(b"ACGT", &mut payload).unwrap();
        assert_eq!(payload[0], 7);

        let mut batch = vec![9u8];
        codec.decode(&payload[1..], &mut batch).unwrap();
        assert_eq!(batch, b"\x09ACGT");
    }

    #[test]
    fn test_gzip_rejects_garbage() {
        let mut batch = Vec::new();
        assert!(GzipCodec::default().decode(b"not gzip", &mut batch).is_err());
    }
}
