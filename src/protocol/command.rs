//! Command header
//!
//! Fixed 8-byte prefix of every frame: protocol magic + length of the
//! serialized frame header that follows.

use crate::error::{Result, TxrxError};

/// Protocol magic opening every frame
pub const MSG_MAGIC: [u8; 4] = *b"MSG\0";

/// Command header size: 4 bytes magic + 4 bytes header length
pub const COMMAND_SIZE: usize = 8;

/// The outer framing prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    /// Length of the serialized `FrameHeader` that follows
    pub header_len: u32,
}

impl CommandHeader {
    pub fn new(header_len: u32) -> Self {
        Self { header_len }
    }

    /// Encode to wire bytes: magic (4) + header_len (4, BE)
    pub fn encode(&self) -> [u8; COMMAND_SIZE] {
        let mut bytes = [0u8; COMMAND_SIZE];
        bytes[..4].copy_from_slice(&MSG_MAGIC);
        bytes[4..].copy_from_slice(&self.header_len.to_be_bytes());
        bytes
    }

    /// Decode from wire bytes, rejecting anything without the magic
    pub fn decode(bytes: &[u8; COMMAND_SIZE]) -> Result<Self> {
        let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
        if magic != MSG_MAGIC {
            return Err(TxrxError::InvalidCommand { found: magic });
        }

        let header_len = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Ok(Self { header_len })
    }
}
