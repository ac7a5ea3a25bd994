//! Payload encodings
//!
//! Turns application messages into the flat byte sequence the frame codec
//! compresses, encrypts and checksums. Any serde type is a valid message.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, TxrxError};

/// A serde-backed message encoding
///
/// Encoding failures are local bugs (`Serialization`, never retried);
/// decoding failures are protocol errors (`MalformedPayload`).
pub trait MessageEncoding: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    fn encode<T: Serialize + ?Sized>(&self, message: &T) -> Result<Vec<u8>>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// Compact binary encoding (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeEncoding;

impl MessageEncoding for BincodeEncoding {
    fn name(&self) -> &'static str {
        "bincode"
    }

    fn encode<T: Serialize + ?Sized>(&self, message: &T) -> Result<Vec<u8>> {
        bincode::serialize(message).map_err(|e| TxrxError::Serialization(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        bincode::deserialize(bytes).map_err(|e| TxrxError::MalformedPayload(e.to_string()))
    }
}

/// JSON encoding, for peers that want human-readable payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoding;

impl MessageEncoding for JsonEncoding {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode<T: Serialize + ?Sized>(&self, message: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(message).map_err(|e| TxrxError::Serialization(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| TxrxError::MalformedPayload(e.to_string()))
    }
}
