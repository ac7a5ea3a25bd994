//! Checksum Module
//!
//! Pluggable integrity functions computed over the final wire bytes of a
//! payload: a fast CRC32 (default) and MD5 / SHA-256 / SHA-512 digests.
//!
//! Verification failures are reported as `ChecksumMismatch`, a protocol error
//! the connection engine answers with an error acknowledgement.

use std::fmt;
use std::str::FromStr;

use md5::Md5;
use sha2::{Digest, Sha256, Sha512};

use crate::error::{Result, TxrxError};

/// Integrity function selected per connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChecksumAlgorithm {
    /// No integrity check
    None,

    /// 32-bit CRC (fast, non-cryptographic)
    #[default]
    Crc32,

    /// 128-bit MD5 digest
    Md5,

    /// 256-bit SHA-2 digest
    Sha256,

    /// 512-bit SHA-2 digest
    Sha512,
}

impl ChecksumAlgorithm {
    /// Every supported algorithm, weakest first
    pub const ALL: [ChecksumAlgorithm; 5] = [
        ChecksumAlgorithm::None,
        ChecksumAlgorithm::Crc32,
        ChecksumAlgorithm::Md5,
        ChecksumAlgorithm::Sha256,
        ChecksumAlgorithm::Sha512,
    ];

    /// Resolve an algorithm by its wire name or descriptive alias
    ///
    /// Accepted: `none`, `crc32`/`fast32`, `md5`/`digest128`,
    /// `sha256`/`digest256`, `sha512`/`digest512`.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "none" => Ok(ChecksumAlgorithm::None),
            "crc32" | "fast32" => Ok(ChecksumAlgorithm::Crc32),
            "md5" | "digest128" => Ok(ChecksumAlgorithm::Md5),
            "sha256" | "digest256" => Ok(ChecksumAlgorithm::Sha256),
            "sha512" | "digest512" => Ok(ChecksumAlgorithm::Sha512),
            other => Err(TxrxError::Config(format!(
                "unknown checksum algorithm '{}'",
                other
            ))),
        }
    }

    /// Name written into the frame header
    pub fn name(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::None => "none",
            ChecksumAlgorithm::Crc32 => "crc32",
            ChecksumAlgorithm::Md5 => "md5",
            ChecksumAlgorithm::Sha256 => "sha256",
            ChecksumAlgorithm::Sha512 => "sha512",
        }
    }

    /// Width of the checksum value in bytes
    pub fn value_len(&self) -> usize {
        match self {
            ChecksumAlgorithm::None => 0,
            ChecksumAlgorithm::Crc32 => 4,
            ChecksumAlgorithm::Md5 => 16,
            ChecksumAlgorithm::Sha256 => 32,
            ChecksumAlgorithm::Sha512 => 64,
        }
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = TxrxError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A computed checksum; its width is fixed by the algorithm that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumValue {
    None,
    Crc32(u32),
    Digest(Vec<u8>),
}

impl ChecksumValue {
    /// Wire bytes of the value (CRC32 is big-endian)
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ChecksumValue::None => Vec::new(),
            ChecksumValue::Crc32(crc) => crc.to_be_bytes().to_vec(),
            ChecksumValue::Digest(digest) => digest.clone(),
        }
    }

    /// Rebuild a value from wire bytes, checking the width against the algorithm
    pub fn from_bytes(algorithm: ChecksumAlgorithm, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != algorithm.value_len() {
            return Err(TxrxError::InvalidHeader(format!(
                "{} checksum must be {} bytes, got {}",
                algorithm,
                algorithm.value_len(),
                bytes.len()
            )));
        }

        Ok(match algorithm {
            ChecksumAlgorithm::None => ChecksumValue::None,
            ChecksumAlgorithm::Crc32 => {
                ChecksumValue::Crc32(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            _ => ChecksumValue::Digest(bytes.to_vec()),
        })
    }
}

/// Compute the checksum of `data`
pub fn compute(data: &[u8], algorithm: ChecksumAlgorithm) -> ChecksumValue {
    match algorithm {
        ChecksumAlgorithm::None => ChecksumValue::None,
        ChecksumAlgorithm::Crc32 => ChecksumValue::Crc32(crc32fast::hash(data)),
        ChecksumAlgorithm::Md5 => ChecksumValue::Digest(Md5::digest(data).to_vec()),
        ChecksumAlgorithm::Sha256 => ChecksumValue::Digest(Sha256::digest(data).to_vec()),
        ChecksumAlgorithm::Sha512 => ChecksumValue::Digest(Sha512::digest(data).to_vec()),
    }
}

/// Verify `data` against an expected checksum
pub fn verify(data: &[u8], algorithm: ChecksumAlgorithm, expected: &ChecksumValue) -> Result<()> {
    if compute(data, algorithm) == *expected {
        Ok(())
    } else {
        Err(TxrxError::ChecksumMismatch {
            algorithm: algorithm.name(),
        })
    }
}
