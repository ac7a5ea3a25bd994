//! Frame header record
//!
//! Explicitly tagged, length-prefixed serialization of the five header
//! fields. Decoding fails closed: anything other than exactly the expected
//! field set is rejected with `InvalidHeader`.

use bytes::{Buf, BufMut, BytesMut};

use crate::checksum::{ChecksumAlgorithm, ChecksumValue};
use crate::config::MAX_COMPRESSION_LEVEL;
use crate::error::{Result, TxrxError};

/// Header record format version
pub const HEADER_VERSION: u8 = 1;

/// Fields in a version 1 record
pub const FIELD_COUNT: u8 = 5;

/// Largest header record accepted off the wire
pub const MAX_HEADER_SIZE: usize = 1024;

/// Per-field prefix: tag (1) + value length (2)
const FIELD_PREFIX_SIZE: usize = 3;

/// Field tags, in the order they are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum FieldTag {
    PayloadLength = 0x01,
    Encrypted = 0x02,
    Compression = 0x03,
    ChecksumAlgorithm = 0x04,
    ChecksumValue = 0x05,
}

/// Metadata describing one payload on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// Exact number of payload bytes that follow the header
    pub payload_length: u32,

    /// Payload was encrypted after compression
    pub encrypted: bool,

    /// zlib level used on the payload; 0 means uncompressed
    pub compression_level: u8,

    /// Algorithm that produced `checksum`
    pub checksum_algorithm: ChecksumAlgorithm,

    /// Checksum of the payload bytes as transmitted
    pub checksum: ChecksumValue,
}

impl FrameHeader {
    /// Serialize the header
    ///
    /// ```text
    /// ┌─────────┬─────────┬──────────────────────────────────────┐
    /// │ Ver (1) │ Cnt (1) │ 5 × [ Tag (1) │ Len (2) │ Value ]   │
    /// └─────────┴─────────┴──────────────────────────────────────┘
    /// ```
    pub fn pack(&self) -> Vec<u8> {
        let checksum_name = self.checksum_algorithm.name().as_bytes();
        let checksum_value = self.checksum.to_bytes();

        let mut buf = BytesMut::with_capacity(
            2 + 5 * FIELD_PREFIX_SIZE + 4 + 1 + 1 + checksum_name.len() + checksum_value.len(),
        );
        buf.put_u8(HEADER_VERSION);
        buf.put_u8(FIELD_COUNT);

        put_field(&mut buf, FieldTag::PayloadLength, &self.payload_length.to_be_bytes());
        put_field(&mut buf, FieldTag::Encrypted, &[self.encrypted as u8]);
        put_field(&mut buf, FieldTag::Compression, &[self.compression_level]);
        put_field(&mut buf, FieldTag::ChecksumAlgorithm, checksum_name);
        put_field(&mut buf, FieldTag::ChecksumValue, &checksum_value);

        buf.to_vec()
    }

    /// Deserialize and validate a header
    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_HEADER_SIZE {
            return Err(TxrxError::InvalidHeader(format!(
                "header of {} bytes exceeds {} byte limit",
                bytes.len(),
                MAX_HEADER_SIZE
            )));
        }

        let mut buf = bytes;
        if buf.remaining() < 2 {
            return Err(TxrxError::InvalidHeader("missing version".to_string()));
        }

        let version = buf.get_u8();
        if version != HEADER_VERSION {
            return Err(TxrxError::InvalidHeader(format!(
                "unsupported header version {}",
                version
            )));
        }

        let count = buf.get_u8();
        if count != FIELD_COUNT {
            return Err(TxrxError::InvalidHeader(format!(
                "expected {} fields, found {}",
                FIELD_COUNT, count
            )));
        }

        let payload_length = take_field(&mut buf, FieldTag::PayloadLength)?;
        let payload_length = match payload_length {
            [a, b, c, d] => u32::from_be_bytes([*a, *b, *c, *d]),
            _ => return Err(field_width_error(FieldTag::PayloadLength, payload_length.len())),
        };

        let encrypted = match take_field(&mut buf, FieldTag::Encrypted)? {
            [0] => false,
            [1] => true,
            other => {
                return Err(TxrxError::InvalidHeader(format!(
                    "invalid encrypted flag {:02x?}",
                    other
                )))
            }
        };

        let compression_level = match take_field(&mut buf, FieldTag::Compression)? {
            [level] if *level <= MAX_COMPRESSION_LEVEL => *level,
            other => {
                return Err(TxrxError::InvalidHeader(format!(
                    "invalid compression level {:02x?}",
                    other
                )))
            }
        };

        let name = take_field(&mut buf, FieldTag::ChecksumAlgorithm)?;
        let name = std::str::from_utf8(name)
            .map_err(|_| TxrxError::InvalidHeader("checksum name is not UTF-8".to_string()))?;
        let checksum_algorithm = ChecksumAlgorithm::ALL
            .into_iter()
            .find(|algorithm| algorithm.name() == name)
            .ok_or_else(|| {
                TxrxError::InvalidHeader(format!("unknown checksum algorithm '{}'", name))
            })?;

        let value = take_field(&mut buf, FieldTag::ChecksumValue)?;
        let checksum = ChecksumValue::from_bytes(checksum_algorithm, value)?;

        if buf.has_remaining() {
            return Err(TxrxError::InvalidHeader(format!(
                "{} trailing bytes after header",
                buf.remaining()
            )));
        }

        Ok(Self {
            payload_length,
            encrypted,
            compression_level,
            checksum_algorithm,
            checksum,
        })
    }
}

fn put_field(buf: &mut BytesMut, tag: FieldTag, value: &[u8]) {
    buf.put_u8(tag as u8);
    buf.put_u16(value.len() as u16);
    buf.put_slice(value);
}

/// Read the next field, which must carry `expected` as its tag
fn take_field<'a>(buf: &mut &'a [u8], expected: FieldTag) -> Result<&'a [u8]> {
    if buf.remaining() < FIELD_PREFIX_SIZE {
        return Err(TxrxError::InvalidHeader(format!(
            "missing field {:?}",
            expected
        )));
    }

    let tag = buf.get_u8();
    if tag != expected as u8 {
        return Err(TxrxError::InvalidHeader(format!(
            "expected field tag 0x{:02x} ({:?}), found 0x{:02x}",
            expected as u8, expected, tag
        )));
    }

    let len = buf.get_u16() as usize;
    if buf.remaining() < len {
        return Err(TxrxError::InvalidHeader(format!(
            "field {:?} declares {} bytes, only {} remain",
            expected,
            len,
            buf.remaining()
        )));
    }

    let (value, rest) = buf.split_at(len);
    *buf = rest;
    Ok(value)
}

fn field_width_error(tag: FieldTag, len: usize) -> TxrxError {
    TxrxError::InvalidHeader(format!("field {:?} has invalid width {}", tag, len))
}
