//! Message frame codec
//!
//! Send pipeline:    encode → compress → encrypt → checksum → header
//! Receive pipeline: header → length check → checksum → decrypt → decompress → decode
//!
//! The checksum always covers the bytes exactly as they travel on the wire,
//! so a bit flip anywhere in the payload is caught before decryption or
//! decompression run.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::checksum::{self, ChecksumAlgorithm};
use crate::cipher::Cipher;
use crate::config::MAX_COMPRESSION_LEVEL;
use crate::error::{Result, TxrxError};

use super::compression;
use super::encoding::MessageEncoding;
use super::header::FrameHeader;

/// Default cap on the decoded message size used by `MessageFrame::unpack`
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Options for packing one message
#[derive(Debug, Clone, Copy)]
pub struct PackOptions<'a> {
    pub checksum: ChecksumAlgorithm,
    pub compression_level: u8,
    pub cipher: Option<&'a Cipher>,
}

impl Default for PackOptions<'_> {
    fn default() -> Self {
        Self {
            checksum: ChecksumAlgorithm::Crc32,
            compression_level: 0,
            cipher: None,
        }
    }
}

/// A packed message: its header and the final payload bytes
#[derive(Debug, Clone)]
pub struct MessageFrame {
    header: FrameHeader,
    header_bytes: Vec<u8>,
    payload: Vec<u8>,
}

impl MessageFrame {
    /// Run the send pipeline over `message`
    pub fn pack<T, E>(message: &T, encoding: &E, options: PackOptions<'_>) -> Result<Self>
    where
        T: Serialize + ?Sized,
        E: MessageEncoding,
    {
        if options.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(TxrxError::Config(format!(
                "compression level {} out of range (0-{})",
                options.compression_level, MAX_COMPRESSION_LEVEL
            )));
        }

        let mut payload = encoding.encode(message)?;

        if options.compression_level > 0 {
            payload = compression::compress(&payload, options.compression_level)?;
        }

        if let Some(cipher) = options.cipher {
            payload = cipher.encrypt(&payload)?;
        }

        let payload_length = u32::try_from(payload.len()).map_err(|_| TxrxError::FrameTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        })?;

        let header = FrameHeader {
            payload_length,
            encrypted: options.cipher.is_some(),
            compression_level: options.compression_level,
            checksum_algorithm: options.checksum,
            checksum: checksum::compute(&payload, options.checksum),
        };
        let header_bytes = header.pack();

        Ok(Self {
            header,
            header_bytes,
            payload,
        })
    }

    /// Run the receive pipeline over a serialized header and its payload
    pub fn unpack<T, E>(
        header_bytes: &[u8],
        payload: &[u8],
        encoding: &E,
        cipher: Option<&Cipher>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        E: MessageEncoding,
    {
        let header = FrameHeader::unpack(header_bytes)?;
        decode_payload(&header, payload, encoding, cipher, DEFAULT_MAX_MESSAGE_SIZE)
    }

    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    pub fn header_bytes(&self) -> &[u8] {
        &self.header_bytes
    }

    pub fn header_len(&self) -> usize {
        self.header_bytes.len()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Split into (header bytes, payload bytes)
    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.header_bytes, self.payload)
    }
}

/// Verify, decrypt, decompress and decode a payload described by `header`
///
/// `max_message_size` bounds the decompressed size.
pub fn decode_payload<T, E>(
    header: &FrameHeader,
    payload: &[u8],
    encoding: &E,
    cipher: Option<&Cipher>,
    max_message_size: usize,
) -> Result<T>
where
    T: DeserializeOwned,
    E: MessageEncoding,
{
    if payload.len() != header.payload_length as usize {
        return Err(TxrxError::TruncatedFrame {
            expected: header.payload_length as usize,
            actual: payload.len(),
        });
    }

    checksum::verify(payload, header.checksum_algorithm, &header.checksum)?;

    let decrypted;
    let mut bytes = payload;

    if header.encrypted {
        let cipher = cipher.ok_or_else(|| {
            TxrxError::Decryption("frame is encrypted but no passphrase is configured".to_string())
        })?;
        decrypted = cipher.decrypt(bytes)?;
        bytes = &decrypted;
    }

    if header.compression_level > 0 {
        let decompressed = compression::decompress(bytes, max_message_size)?;
        return encoding.decode(&decompressed);
    }

    encoding.decode(bytes)
}
