//! Protocol codec
//!
//! Blocking stream helpers for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Frame (sender → receiver)
//! ```text
//! ┌───────────┬───────────────┬──────────────────────┬─────────────────────┐
//! │ Magic (4) │ HeaderLen (4) │ FrameHeader          │ Payload             │
//! │ "MSG\0"   │ big-endian    │ (HeaderLen bytes)    │ (payload_length B)  │
//! └───────────┴───────────────┴──────────────────────┴─────────────────────┘
//! ```
//!
//! ### Acknowledgement (receiver → sender)
//! ```text
//! ┌──────────────────────────┐
//! │ "OK\0\0" or "ERR\0" (4)  │
//! └──────────────────────────┘
//! ```

use std::io::{ErrorKind, Read, Write};

use crate::error::{Result, TxrxError};

use super::{Ack, CommandHeader, ACK_SIZE, COMMAND_SIZE, MSG_MAGIC};

// =============================================================================
// Frame Writing
// =============================================================================

/// Write the command header followed by the serialized frame header
pub fn write_command<W: Write>(writer: &mut W, command: &CommandHeader, header: &[u8]) -> Result<()> {
    writer.write_all(&command.encode())?;
    writer.write_all(header)?;
    Ok(())
}

/// Write the payload and flush the frame
pub fn write_payload<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Write one complete frame: command header, frame header, payload
pub fn write_frame<W: Write>(
    writer: &mut W,
    command: &CommandHeader,
    header: &[u8],
    payload: &[u8],
) -> Result<()> {
    write_command(writer, command, header)?;
    write_payload(writer, payload)
}

// =============================================================================
// Frame Reading
// =============================================================================

/// Read the 8-byte command header at the current stream position
pub fn read_command<R: Read>(reader: &mut R) -> Result<CommandHeader> {
    let mut bytes = [0u8; COMMAND_SIZE];
    read_full(reader, &mut bytes)?;
    CommandHeader::decode(&bytes)
}

/// Skip bytes until the protocol magic, then read the command header
///
/// Returns the command and the number of bytes discarded before the magic.
pub fn resync_command<R: Read>(reader: &mut R) -> Result<(CommandHeader, usize)> {
    let mut window = [0u8; 4];
    read_full(reader, &mut window)?;

    let mut discarded = 0usize;
    while window != MSG_MAGIC {
        let mut next = [0u8; 1];
        read_full(reader, &mut next)?;
        window.rotate_left(1);
        window[3] = next[0];
        discarded += 1;
    }

    let mut len = [0u8; 4];
    read_full(reader, &mut len)?;
    Ok((CommandHeader::new(u32::from_be_bytes(len)), discarded))
}

/// Read exactly `len` bytes in one buffer
pub fn read_exact_bytes<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; len];
    read_full(reader, &mut bytes)?;
    Ok(bytes)
}

/// Read exactly `total` bytes using reads of at most `chunk_size` bytes
///
/// A zero-length read before `total` is reached means the peer went away.
pub fn read_chunked<R: Read>(reader: &mut R, total: usize, chunk_size: usize) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(total);
    let mut chunk = vec![0u8; chunk_size.clamp(1, total.max(1))];
    let mut reads = 0usize;

    while data.len() < total {
        let want = chunk.len().min(total - data.len());
        let read = match reader.read(&mut chunk[..want]) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(TxrxError::Io(e)),
        };

        if read == 0 {
            return Err(TxrxError::ConnectionLost(format!(
                "stream closed after {} of {} payload bytes",
                data.len(),
                total
            )));
        }

        data.extend_from_slice(&chunk[..read]);
        reads += 1;
    }

    tracing::trace!("Read {} payload bytes in {} chunks", total, reads);
    Ok(data)
}

// =============================================================================
// Acknowledgements
// =============================================================================

/// Send an acknowledgement
pub fn write_ack<W: Write>(writer: &mut W, ack: Ack) -> Result<()> {
    writer.write_all(ack.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Block until a 4-byte acknowledgement arrives
pub fn read_ack<R: Read>(reader: &mut R) -> Result<Ack> {
    let mut bytes = [0u8; ACK_SIZE];
    read_full(reader, &mut bytes)?;
    Ack::from_bytes(bytes)
}

// =============================================================================
// Helpers
// =============================================================================

/// `read_exact` that reports a closed stream as `ConnectionLost`
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(TxrxError::ConnectionLost(format!(
                    "stream closed after {} of {} bytes",
                    filled,
                    buf.len()
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(TxrxError::Io(e)),
        }
    }
    Ok(())
}
