//! Error types for txrx
//!
//! Provides a unified error type for all operations, classified the way the
//! connection engine needs to dispatch them:
//!
//! - **Protocol** errors are answered with an error acknowledgement and retried
//! - **Connection** errors are retried, then recovered by reconnecting
//! - **Configuration** errors are fatal and never retried
//! - **Retry exhaustion** surfaces the failed operation to the caller

use std::fmt;

use thiserror::Error;

use crate::network::PeerId;

/// Result type alias using TxrxError
pub type Result<T> = std::result::Result<T, TxrxError>;

/// The exchange that ran out of attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Send,
    Receive,
    Connect,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Send => "send",
            Operation::Receive => "receive",
            Operation::Connect => "connect",
        };
        f.write_str(name)
    }
}

/// Unified error type for txrx operations
#[derive(Debug, Error)]
pub enum TxrxError {
    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Not connected")]
    NotConnected,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Invalid command header: magic {found:02x?}")]
    InvalidCommand { found: [u8; 4] },

    #[error("Invalid acknowledgement: {found:02x?}")]
    InvalidAck { found: [u8; 4] },

    #[error("Invalid frame header: {0}")]
    InvalidHeader(String),

    #[error("Truncated frame: header declares {expected} payload bytes, got {actual}")]
    TruncatedFrame { expected: usize, actual: usize },

    #[error("Checksum mismatch ({algorithm})")]
    ChecksumMismatch { algorithm: &'static str },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    // -------------------------------------------------------------------------
    // Local Encoding Errors (never retried)
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    // -------------------------------------------------------------------------
    // Retry Exhaustion
    // -------------------------------------------------------------------------
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetryExhausted {
        operation: Operation,
        attempts: u32,
        last_error: String,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown peer: {0}")]
    UnknownPeer(PeerId),

    // -------------------------------------------------------------------------
    // Concurrency Errors
    // -------------------------------------------------------------------------
    #[error("Worker thread panicked")]
    WorkerPanicked,
}

impl TxrxError {
    /// Frame-level failure detected by the receiver; answered with `ERR`.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            TxrxError::InvalidCommand { .. }
                | TxrxError::InvalidAck { .. }
                | TxrxError::InvalidHeader(_)
                | TxrxError::TruncatedFrame { .. }
                | TxrxError::ChecksumMismatch { .. }
                | TxrxError::MalformedPayload(_)
                | TxrxError::Compression(_)
                | TxrxError::Decryption(_)
                | TxrxError::FrameTooLarge { .. }
        )
    }

    /// Socket-level failure; only a reconnect can recover the peer.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            TxrxError::Io(_) | TxrxError::ConnectionLost(_) | TxrxError::NotConnected
        )
    }

    /// Programmer error; fatal immediately.
    pub fn is_configuration(&self) -> bool {
        matches!(self, TxrxError::Config(_) | TxrxError::UnknownPeer(_))
    }

    /// Whether tearing the socket down and reconnecting may help.
    pub fn is_recoverable(&self) -> bool {
        self.is_protocol() || self.is_connection() || matches!(self, TxrxError::RetryExhausted { .. })
    }

    /// Whether the stream is still positioned at a frame boundary after this
    /// error was raised on the receive path.
    pub(crate) fn leaves_stream_aligned(&self) -> bool {
        matches!(
            self,
            TxrxError::TruncatedFrame { .. }
                | TxrxError::ChecksumMismatch { .. }
                | TxrxError::MalformedPayload(_)
                | TxrxError::Compression(_)
                | TxrxError::Decryption(_)
        )
    }

    /// The operation that exhausted its retries, if any.
    pub fn exhausted_operation(&self) -> Option<Operation> {
        match self {
            TxrxError::RetryExhausted { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}
