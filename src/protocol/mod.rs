//! Protocol Module
//!
//! Defines the outer wire protocol that carries frames between peers.
//!
//! ## Exchange
//! ```text
//!  sender                                   receiver
//!    │ ── "MSG\0" │ HeaderLen (4, BE) ──────▶ │
//!    │ ── FrameHeader (HeaderLen bytes) ────▶ │
//!    │ ── Payload (payload_length bytes) ───▶ │  verify, decode
//!    │ ◀──────────── "OK\0\0" │ "ERR\0" ──── │
//! ```
//!
//! One exchange completes before the next starts on the same socket; the
//! acknowledgement doubles as flow control.

mod ack;
mod codec;
mod command;

pub use ack::{Ack, ACK_SIZE};
pub use codec::{
    read_ack, read_chunked, read_command, read_exact_bytes, resync_command, write_ack,
    write_command, write_frame, write_payload,
};
pub use command::{CommandHeader, COMMAND_SIZE, MSG_MAGIC};
