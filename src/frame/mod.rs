//! Frame Module
//!
//! Turns application messages into header + payload bytes and back.
//!
//! ## Responsibilities
//! - Serialize messages with a pluggable encoding (bincode by default)
//! - Optional zlib compression and AEAD encryption
//! - Checksum over the final wire bytes
//! - Self-describing, validated header record
//!
//! ## Header Record
//! ```text
//! ┌─────────┬─────────┬────────────────────────────────────────────────┐
//! │ Ver (1) │ Cnt (1) │ PayloadLen │ Encrypted │ Level │ Alg │ Value  │
//! │         │         │   (tag 1)  │  (tag 2)  │ (t 3) │(t 4)│ (t 5)  │
//! └─────────┴─────────┴────────────────────────────────────────────────┘
//! each field: tag (1) + len (2, BE) + value
//! ```

mod compression;
mod encoding;
mod header;
mod message;

pub use compression::{compress, decompress};
pub use encoding::{BincodeEncoding, JsonEncoding, MessageEncoding};
pub use header::{FrameHeader, FIELD_COUNT, HEADER_VERSION, MAX_HEADER_SIZE};
pub use message::{decode_payload, MessageFrame, PackOptions, DEFAULT_MAX_MESSAGE_SIZE};
