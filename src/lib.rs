//! # txrx
//!
//! Point-to-point message framing over raw TCP/UDP sockets with:
//! - Per-message checksums (CRC32, MD5, SHA-256, SHA-512)
//! - Optional zlib compression and passphrase-based AEAD encryption
//! - A fixed 8-byte command header and self-describing frame header
//! - A 4-byte acknowledgement after every frame, with bounded retries
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │            Client            │   │            Server            │
//! │  (connect, reconnect)        │   │  (accept, PeerTable)         │
//! └──────────────┬───────────────┘   └──────────────┬───────────────┘
//!                │                                  │
//! ┌──────────────▼──────────────────────────────────▼───────────────┐
//! │                  Connection Protocol Engine                     │
//! │      (send → ack, receive → verify → ack, retry/resync)         │
//! └──────────────┬──────────────────────────────────┬───────────────┘
//!                │                                  │
//!                ▼                                  ▼
//!   ┌────────────────────────┐         ┌────────────────────────┐
//!   │      Frame Codec       │         │     Wire Protocol      │
//!   │ encode/compress/crypt  │         │ "MSG\0" │ len │ ack    │
//!   └───────────┬────────────┘         └────────────────────────┘
//!               │
//!        ┌──────┴───────┐
//!        ▼              ▼
//!  ┌───────────┐  ┌───────────┐
//!  │ Checksum  │  │  Cipher   │
//!  └───────────┘  └───────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod checksum;
pub mod cipher;
pub mod frame;
pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use checksum::{ChecksumAlgorithm, ChecksumValue};
pub use cipher::{Cipher, NonceMode};
pub use config::{BackoffPolicy, ConnectionConfig, Transport};
pub use error::{Operation, Result, TxrxError};
pub use frame::{BincodeEncoding, FrameHeader, JsonEncoding, MessageEncoding, MessageFrame};
pub use network::{Client, Connection, PeerId, Server};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of txrx
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
