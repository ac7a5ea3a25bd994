//! zlib compression at a caller-chosen level

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{Result, TxrxError};

/// Compress `data` at `level` (1-9)
pub fn compress(data: &[u8], level: u8) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(data.len() / 2),
        Compression::new(u32::from(level)),
    );
    encoder
        .write_all(data)
        .map_err(|e| TxrxError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| TxrxError::Compression(e.to_string()))
}

/// Decompress `data`, refusing output larger than `limit` bytes
pub fn decompress(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    ZlibDecoder::new(data)
        .take(limit as u64 + 1)
        .read_to_end(&mut output)
        .map_err(|e| TxrxError::Compression(e.to_string()))?;

    if output.len() > limit {
        return Err(TxrxError::FrameTooLarge {
            size: output.len(),
            max: limit,
        });
    }

    Ok(output)
}
