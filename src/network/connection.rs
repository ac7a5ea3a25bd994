//! Connection protocol engine
//!
//! Drives one blocking, half-duplex stream: frames out, acknowledgements
//! back, with a bounded retry loop around every send and receive.
//!
//! ## Send
//! ```text
//! IDLE → SENDING_HEADER → SENDING_PAYLOAD → AWAITING_ACK
//!      → SUCCESS | RETRY (→ SENDING_HEADER) | FAILED
//! ```
//!
//! ## Receive
//! ```text
//! IDLE → READING_COMMAND → READING_HEADER → READING_PAYLOAD → VERIFYING
//!      → EMIT_OK + DELIVER | EMIT_ERROR + RETRY
//! ```

use std::io::{Read, Write};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cipher::Cipher;
use crate::config::ConnectionConfig;
use crate::error::{Operation, Result, TxrxError};
use crate::frame::{
    decode_payload, BincodeEncoding, FrameHeader, MessageEncoding, MessageFrame, PackOptions,
    MAX_HEADER_SIZE,
};
use crate::protocol::{self, Ack, CommandHeader};

/// Position within the exchange currently in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    SendingHeader,
    SendingPayload,
    AwaitingAck,
    ReadingCommand,
    ReadingHeader,
    ReadingPayload,
    Verifying,
}

/// Protocol engine bound to one stream
pub struct Connection<S, E = BincodeEncoding> {
    /// Underlying socket (or any blocking byte stream)
    stream: S,

    /// Shared, read-only connection settings
    config: Arc<ConnectionConfig>,

    /// Present when a passphrase is configured
    cipher: Option<Cipher>,

    /// Message encoding
    encoding: E,

    /// Peer label for logging
    peer_addr: String,

    /// Scan for the magic before the next command header
    resync: bool,

    /// Stage reached by the current (or last) exchange
    stage: Stage,
}

impl<S: Read + Write> Connection<S, BincodeEncoding> {
    /// Create an engine with the default encoding
    pub fn new(stream: S, config: Arc<ConnectionConfig>) -> Result<Self> {
        Self::with_encoding(stream, config, BincodeEncoding)
    }
}

impl<S: Read + Write, E: MessageEncoding> Connection<S, E> {
    /// Create an engine with an explicit message encoding
    ///
    /// Fails with `Config` if `config` does not validate.
    pub fn with_encoding(stream: S, config: Arc<ConnectionConfig>, encoding: E) -> Result<Self> {
        config.validate()?;
        let cipher = config.cipher();
        Ok(Self {
            stream,
            config,
            cipher,
            encoding,
            peer_addr: "unknown".to_string(),
            resync: false,
            stage: Stage::Idle,
        })
    }

    /// Set the peer label used in log events
    pub fn with_peer_addr(mut self, peer_addr: impl Into<String>) -> Self {
        self.peer_addr = peer_addr.into();
        self
    }

    // =========================================================================
    // Send
    // =========================================================================

    /// Send one message and wait for the peer to acknowledge it
    ///
    /// The full frame is retransmitted on an `ERR` acknowledgement or a
    /// connection/protocol failure, up to `max_retry` attempts. Packing
    /// failures are returned immediately.
    pub fn send<T: Serialize + ?Sized>(&mut self, message: &T) -> Result<()> {
        let frame = MessageFrame::pack(
            message,
            &self.encoding,
            PackOptions {
                checksum: self.config.checksum,
                compression_level: self.config.compression_level,
                cipher: self.cipher.as_ref(),
            },
        )?;

        if frame.payload().len() > self.config.max_payload_size {
            return Err(TxrxError::FrameTooLarge {
                size: frame.payload().len(),
                max: self.config.max_payload_size,
            });
        }

        // Header records are a few dozen bytes; MAX_HEADER_SIZE fits in u32
        let command = CommandHeader::new(frame.header_len() as u32);
        let max_retry = self.config.max_retry;
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=max_retry {
            match self.send_attempt(&command, &frame) {
                Ok(Ack::Ok) => {
                    tracing::debug!(
                        "Sent {} byte payload to {} (attempt {})",
                        frame.payload().len(),
                        self.peer_addr,
                        attempt
                    );
                    self.stage = Stage::Idle;
                    return Ok(());
                }
                Ok(Ack::Error) => {
                    tracing::warn!(
                        "Peer {} rejected frame (attempt {}/{})",
                        self.peer_addr,
                        attempt,
                        max_retry
                    );
                    last_error = "peer answered with error acknowledgement".to_string();
                }
                Err(e) if e.is_connection() || e.is_protocol() => {
                    tracing::warn!(
                        "Send to {} failed while {:?} (attempt {}/{}): {}",
                        self.peer_addr,
                        self.stage,
                        attempt,
                        max_retry,
                        e
                    );
                    last_error = e.to_string();
                }
                Err(e) => return Err(e),
            }
        }

        self.stage = Stage::Idle;
        tracing::error!("Could not send message to {}: {}", self.peer_addr, last_error);
        Err(TxrxError::RetryExhausted {
            operation: Operation::Send,
            attempts: max_retry,
            last_error,
        })
    }

    /// One pass of SENDING_HEADER → SENDING_PAYLOAD → AWAITING_ACK
    fn send_attempt(&mut self, command: &CommandHeader, frame: &MessageFrame) -> Result<Ack> {
        self.stage = Stage::SendingHeader;
        protocol::write_command(&mut self.stream, command, frame.header_bytes())?;

        self.stage = Stage::SendingPayload;
        protocol::write_payload(&mut self.stream, frame.payload())?;

        self.stage = Stage::AwaitingAck;
        protocol::read_ack(&mut self.stream)
    }

    // =========================================================================
    // Receive
    // =========================================================================

    /// Receive one message, acknowledging it only once fully decoded
    ///
    /// Every rejected frame is answered with `ERR` and the receive is
    /// attempted again, up to `max_retry` attempts. A connection failure
    /// before any frame arrived (idle timeout, peer closed) is retried
    /// without an acknowledgement, since there is no frame to reject.
    pub fn receive<T: DeserializeOwned>(&mut self) -> Result<T> {
        let max_retry = self.config.max_retry;
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=max_retry {
            match self.receive_attempt::<T>() {
                Ok(message) => {
                    if let Err(e) = protocol::write_ack(&mut self.stream, Ack::Ok) {
                        // The sender will retransmit; the message is still valid
                        tracing::warn!(
                            "Could not acknowledge message from {}: {}",
                            self.peer_addr,
                            e
                        );
                    }
                    tracing::debug!("Received message from {} (attempt {})", self.peer_addr, attempt);
                    self.stage = Stage::Idle;
                    return Ok(message);
                }
                Err(e) if e.is_connection() || e.is_protocol() => {
                    tracing::warn!(
                        "Receive from {} failed while {:?} (attempt {}/{}): {}",
                        self.peer_addr,
                        self.stage,
                        attempt,
                        max_retry,
                        e
                    );
                    self.resync = !e.leaves_stream_aligned();
                    let frame_started = !(self.stage == Stage::ReadingCommand && e.is_connection());
                    if frame_started {
                        if let Err(ack_err) = protocol::write_ack(&mut self.stream, Ack::Error) {
                            tracing::debug!(
                                "Could not send error acknowledgement to {}: {}",
                                self.peer_addr,
                                ack_err
                            );
                        }
                    }
                    last_error = e.to_string();
                }
                Err(e) => return Err(e),
            }
        }

        self.stage = Stage::Idle;
        tracing::error!("Could not receive message from {}: {}", self.peer_addr, last_error);
        Err(TxrxError::RetryExhausted {
            operation: Operation::Receive,
            attempts: max_retry,
            last_error,
        })
    }

    /// One pass of READING_COMMAND → READING_HEADER → READING_PAYLOAD → VERIFYING
    fn receive_attempt<T: DeserializeOwned>(&mut self) -> Result<T> {
        self.stage = Stage::ReadingCommand;
        let command = if self.resync {
            let (command, discarded) = protocol::resync_command(&mut self.stream)?;
            if discarded > 0 {
                tracing::debug!(
                    "Discarded {} stale bytes from {} before next frame",
                    discarded,
                    self.peer_addr
                );
            }
            command
        } else {
            protocol::read_command(&mut self.stream)?
        };
        self.resync = false;

        let header_len = command.header_len as usize;
        if header_len > MAX_HEADER_SIZE {
            return Err(TxrxError::FrameTooLarge {
                size: header_len,
                max: MAX_HEADER_SIZE,
            });
        }

        self.stage = Stage::ReadingHeader;
        let header_bytes = protocol::read_exact_bytes(&mut self.stream, header_len)?;
        let header = FrameHeader::unpack(&header_bytes)?;

        let payload_len = header.payload_length as usize;
        if payload_len > self.config.max_payload_size {
            return Err(TxrxError::FrameTooLarge {
                size: payload_len,
                max: self.config.max_payload_size,
            });
        }

        self.stage = Stage::ReadingPayload;
        let payload =
            protocol::read_chunked(&mut self.stream, payload_len, self.config.recv_chunk_size)?;

        self.stage = Stage::Verifying;
        decode_payload(
            &header,
            &payload,
            &self.encoding,
            self.cipher.as_ref(),
            self.config.max_payload_size,
        )
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Stage reached by the current (or last failed) exchange
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Borrow the underlying stream
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Mutably borrow the underlying stream
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Consume the engine and return the stream
    pub fn into_inner(self) -> S {
        self.stream
    }
}
