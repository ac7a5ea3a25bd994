//! Acknowledgement definitions
//!
//! Fixed 4-byte status the receiver returns after every frame.

use crate::error::{Result, TxrxError};

/// Acknowledgement size
pub const ACK_SIZE: usize = 4;

/// Receiver verdict on one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Frame fully decoded and delivered
    Ok,

    /// Frame rejected; the sender should retransmit
    Error,
}

impl Ack {
    const OK_BYTES: [u8; ACK_SIZE] = *b"OK\0\0";
    const ERROR_BYTES: [u8; ACK_SIZE] = *b"ERR\0";

    /// Wire representation
    pub fn as_bytes(&self) -> &'static [u8; ACK_SIZE] {
        match self {
            Ack::Ok => &Self::OK_BYTES,
            Ack::Error => &Self::ERROR_BYTES,
        }
    }

    /// Parse a received acknowledgement
    pub fn from_bytes(bytes: [u8; ACK_SIZE]) -> Result<Self> {
        match bytes {
            Self::OK_BYTES => Ok(Ack::Ok),
            Self::ERROR_BYTES => Ok(Ack::Error),
            found => Err(TxrxError::InvalidAck { found }),
        }
    }
}
