//! Codec Tests
//!
//! Tests for command headers, acknowledgements and the blocking stream
//! helpers.

use std::io::Cursor;

use txrx::protocol::{
    read_ack, read_chunked, read_command, read_exact_bytes, resync_command, write_ack,
    write_command, write_frame, Ack, CommandHeader, ACK_SIZE, COMMAND_SIZE, MSG_MAGIC,
};
use txrx::TxrxError;

use crate::support::ScriptedStream;

// =============================================================================
// Command Header Tests
// =============================================================================

#[test]
fn test_command_encode_layout() {
    let bytes = CommandHeader::new(0x0102_0304).encode();
    assert_eq!(bytes.len(), COMMAND_SIZE);
    assert_eq!(&bytes[..4], b"MSG\0");
    assert_eq!(&bytes[4..], &[0x01, 0x02, 0x03, 0x04]);
}

#[test]
fn test_command_decode() {
    let command = CommandHeader::decode(&CommandHeader::new(32).encode()).unwrap();
    assert_eq!(command.header_len, 32);
}

#[test]
fn test_command_bad_magic() {
    let err = CommandHeader::decode(b"GET\0\0\0\0\x20").unwrap_err();
    match err {
        TxrxError::InvalidCommand { found } => assert_eq!(&found, b"GET\0"),
        other => panic!("Expected InvalidCommand, got {:?}", other),
    }
}

// =============================================================================
// Acknowledgement Tests
// =============================================================================

#[test]
fn test_ack_bytes() {
    assert_eq!(Ack::Ok.as_bytes(), b"OK\0\0");
    assert_eq!(Ack::Error.as_bytes(), b"ERR\0");
    assert_eq!(Ack::Ok.as_bytes().len(), ACK_SIZE);
}

#[test]
fn test_ack_write_read() {
    let mut buf = Vec::new();
    write_ack(&mut buf, Ack::Ok).unwrap();
    write_ack(&mut buf, Ack::Error).unwrap();

    let mut cursor = Cursor::new(buf);
    assert_eq!(read_ack(&mut cursor).unwrap(), Ack::Ok);
    assert_eq!(read_ack(&mut cursor).unwrap(), Ack::Error);
}

#[test]
fn test_ack_unknown() {
    let mut cursor = Cursor::new(b"NOPE".to_vec());
    assert!(matches!(read_ack(&mut cursor), Err(TxrxError::InvalidAck { .. })));
}

#[test]
fn test_ack_closed_stream() {
    let mut cursor = Cursor::new(b"OK".to_vec());
    let err = read_ack(&mut cursor).unwrap_err();
    assert!(matches!(err, TxrxError::ConnectionLost(_)));
    assert!(err.is_connection());
}

// =============================================================================
// Frame Writing/Reading Tests
// =============================================================================

#[test]
fn test_write_frame_layout() {
    let mut buf = Vec::new();
    write_frame(&mut buf, &CommandHeader::new(3), b"hdr", b"payload").unwrap();

    assert_eq!(&buf[..4], &MSG_MAGIC);
    assert_eq!(&buf[4..8], &3u32.to_be_bytes());
    assert_eq!(&buf[8..11], b"hdr");
    assert_eq!(&buf[11..], b"payload");
}

#[test]
fn test_write_command_then_read() {
    let mut buf = Vec::new();
    write_command(&mut buf, &CommandHeader::new(4), b"abcd").unwrap();

    let mut cursor = Cursor::new(buf);
    let command = read_command(&mut cursor).unwrap();
    assert_eq!(command.header_len, 4);
    assert_eq!(read_exact_bytes(&mut cursor, 4).unwrap(), b"abcd");
}

#[test]
fn test_read_command_short_stream() {
    let mut cursor = Cursor::new(b"MSG\0".to_vec());
    assert!(matches!(read_command(&mut cursor), Err(TxrxError::ConnectionLost(_))));
}

#[test]
fn test_resync_skips_garbage() {
    let mut bytes = b"xxMSjunk".to_vec();
    bytes.extend_from_slice(&CommandHeader::new(9).encode());

    let mut cursor = Cursor::new(bytes);
    let (command, discarded) = resync_command(&mut cursor).unwrap();
    assert_eq!(command.header_len, 9);
    assert_eq!(discarded, 8);
}

#[test]
fn test_resync_aligned_discards_nothing() {
    let mut cursor = Cursor::new(CommandHeader::new(1).encode().to_vec());
    let (_, discarded) = resync_command(&mut cursor).unwrap();
    assert_eq!(discarded, 0);
}

#[test]
fn test_resync_without_magic() {
    let mut cursor = Cursor::new(vec![0xAB; 64]);
    assert!(matches!(resync_command(&mut cursor), Err(TxrxError::ConnectionLost(_))));
}

// =============================================================================
// Chunked Read Tests
// =============================================================================

#[test]
fn test_read_chunked_counts_reads() {
    let mut stream = ScriptedStream::new((0..10u8).collect());
    let data = read_chunked(&mut stream, 10, 3).unwrap();

    assert_eq!(data, (0..10u8).collect::<Vec<_>>());
    assert_eq!(stream.reads, 4);
}

#[test]
fn test_read_chunked_stops_at_total() {
    let mut stream = ScriptedStream::new(b"payloadMSG\0".to_vec());
    let data = read_chunked(&mut stream, 7, 2).unwrap();

    assert_eq!(data, b"payload");
    assert_eq!(stream.remaining(), 4);
}

#[test]
fn test_read_chunked_zero_length() {
    let mut stream = ScriptedStream::new(Vec::new());
    assert!(read_chunked(&mut stream, 0, 4096).unwrap().is_empty());
    assert_eq!(stream.reads, 0);
}

#[test]
fn test_read_chunked_peer_gone() {
    let mut stream = ScriptedStream::new(vec![1, 2, 3]);
    let err = read_chunked(&mut stream, 8, 2).unwrap_err();
    assert!(matches!(err, TxrxError::ConnectionLost(_)));
}
