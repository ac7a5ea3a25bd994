//! Checksum Tests
//!
//! Tests for algorithm selection, checksum widths and verification.

use std::str::FromStr;

use txrx::checksum::{self, ChecksumAlgorithm, ChecksumValue};
use txrx::TxrxError;

// =============================================================================
// Algorithm Selection Tests
// =============================================================================

#[test]
fn test_from_name_wire_names() {
    for algorithm in ChecksumAlgorithm::ALL {
        assert_eq!(ChecksumAlgorithm::from_name(algorithm.name()).unwrap(), algorithm);
    }
}

#[test]
fn test_from_name_aliases() {
    assert_eq!(ChecksumAlgorithm::from_name("fast32").unwrap(), ChecksumAlgorithm::Crc32);
    assert_eq!(ChecksumAlgorithm::from_name("digest128").unwrap(), ChecksumAlgorithm::Md5);
    assert_eq!(ChecksumAlgorithm::from_name("DIGEST256").unwrap(), ChecksumAlgorithm::Sha256);
    assert_eq!(ChecksumAlgorithm::from_str("digest512").unwrap(), ChecksumAlgorithm::Sha512);
}

#[test]
fn test_from_name_unknown_is_config_error() {
    let err = ChecksumAlgorithm::from_name("adler32").unwrap_err();
    assert!(matches!(err, TxrxError::Config(_)));
    assert!(err.is_configuration());
    assert!(!err.is_recoverable());
}

#[test]
fn test_default_is_crc32() {
    assert_eq!(ChecksumAlgorithm::default(), ChecksumAlgorithm::Crc32);
}

// =============================================================================
// Compute Tests
// =============================================================================

#[test]
fn test_compute_widths() {
    for algorithm in ChecksumAlgorithm::ALL {
        let value = checksum::compute(b"hello", algorithm);
        assert_eq!(value.to_bytes().len(), algorithm.value_len(), "{}", algorithm);
    }
}

#[test]
fn test_compute_crc32_known_value() {
    // CRC-32/ISO-HDLC check value
    let value = checksum::compute(b"123456789", ChecksumAlgorithm::Crc32);
    assert_eq!(value, ChecksumValue::Crc32(0xCBF4_3926));
    assert_eq!(value.to_bytes(), vec![0xCB, 0xF4, 0x39, 0x26]);
}

#[test]
fn test_compute_md5_known_value() {
    let value = checksum::compute(b"", ChecksumAlgorithm::Md5);
    assert_eq!(
        value.to_bytes(),
        vec![
            0xd4, 0x1d, 0x8c, 0xd9, 0x8f, 0x00, 0xb2, 0x04, 0xe9, 0x80, 0x09, 0x98, 0xec, 0xf8,
            0x42, 0x7e
        ]
    );
}

#[test]
fn test_compute_none_is_empty() {
    assert_eq!(checksum::compute(b"anything", ChecksumAlgorithm::None), ChecksumValue::None);
}

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_accepts_matching_data() {
    for algorithm in ChecksumAlgorithm::ALL {
        let value = checksum::compute(b"payload bytes", algorithm);
        checksum::verify(b"payload bytes", algorithm, &value).unwrap();
    }
}

#[test]
fn test_verify_rejects_modified_data() {
    for algorithm in ChecksumAlgorithm::ALL {
        if algorithm == ChecksumAlgorithm::None {
            continue;
        }
        let value = checksum::compute(b"payload bytes", algorithm);
        let err = checksum::verify(b"payload bytez", algorithm, &value).unwrap_err();

        match err {
            TxrxError::ChecksumMismatch { algorithm: name } => assert_eq!(name, algorithm.name()),
            other => panic!("Expected ChecksumMismatch, got {:?}", other),
        }
    }
}

#[test]
fn test_verify_rejects_other_algorithm() {
    let value = checksum::compute(b"data", ChecksumAlgorithm::Sha256);
    let err = checksum::verify(b"data", ChecksumAlgorithm::Crc32, &value).unwrap_err();
    assert!(matches!(err, TxrxError::ChecksumMismatch { .. }));
    assert!(err.is_protocol());
}

// =============================================================================
// Value Encoding Tests
// =============================================================================

#[test]
fn test_value_from_bytes_roundtrip() {
    for algorithm in ChecksumAlgorithm::ALL {
        let value = checksum::compute(b"roundtrip", algorithm);
        let decoded = ChecksumValue::from_bytes(algorithm, &value.to_bytes()).unwrap();
        assert_eq!(decoded, value);
    }
}

#[test]
fn test_value_from_bytes_wrong_width() {
    let err = ChecksumValue::from_bytes(ChecksumAlgorithm::Sha512, &[0u8; 32]).unwrap_err();
    assert!(matches!(err, TxrxError::InvalidHeader(_)));

    let err = ChecksumValue::from_bytes(ChecksumAlgorithm::None, &[0u8; 1]).unwrap_err();
    assert!(matches!(err, TxrxError::InvalidHeader(_)));
}
