//! Configuration for txrx connections
//!
//! Centralized per-connection configuration with sensible defaults. A
//! `ConnectionConfig` is built once and then shared read-only (behind an
//! `Arc`) by every exchange on the connection.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::checksum::ChecksumAlgorithm;
use crate::cipher::{Cipher, NonceMode};
use crate::error::{Result, TxrxError};

/// Highest zlib compression level
pub const MAX_COMPRESSION_LEVEL: u8 = 9;

/// Socket transport kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Tcp,
    Udp,
}

impl FromStr for Transport {
    type Err = TxrxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Transport::Tcp),
            "udp" => Ok(Transport::Udp),
            other => Err(TxrxError::Config(format!(
                "invalid transport kind '{}' (expected tcp or udp)",
                other
            ))),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Tcp => f.write_str("tcp"),
            Transport::Udp => f.write_str("udp"),
        }
    }
}

/// Delay policy between connect (and re-accept) attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Same delay before every attempt
    Fixed(Duration),

    /// Doubling delay starting at `initial`, capped at `max`
    Exponential { initial: Duration, max: Duration },
}

impl BackoffPolicy {
    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            BackoffPolicy::Fixed(delay) => delay,
            BackoffPolicy::Exponential { initial, max } => {
                let shift = attempt.saturating_sub(1).min(31);
                initial
                    .checked_mul(1u32 << shift)
                    .map_or(max, |delay| delay.min(max))
            }
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Fixed(Duration::from_secs(1))
    }
}

/// Configuration shared by every operation on one connection
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    // -------------------------------------------------------------------------
    // Endpoint Configuration
    // -------------------------------------------------------------------------
    /// Host to connect to (client) or bind on (server)
    pub host: String,

    /// Port to connect to or bind on
    pub port: u16,

    /// Stream (TCP) or datagram (UDP) sockets
    pub transport: Transport,

    // -------------------------------------------------------------------------
    // Frame Configuration
    // -------------------------------------------------------------------------
    /// Integrity function applied to the final wire bytes of every payload
    pub checksum: ChecksumAlgorithm,

    /// zlib level; 0 disables compression
    pub compression_level: u8,

    /// Encryption passphrase; `None` disables encryption
    pub passphrase: Option<String>,

    /// How the cipher picks its nonce
    pub nonce_mode: NonceMode,

    /// Largest payload (and decompressed message) accepted, in bytes
    pub max_payload_size: usize,

    // -------------------------------------------------------------------------
    // Retry Configuration
    // -------------------------------------------------------------------------
    /// Reconnect (client) or re-accept (server) when an exchange fails
    pub auto_reconnect: bool,

    /// Attempts per send, receive and connect call
    pub max_retry: u32,

    /// Delay between connect attempts
    pub backoff: BackoffPolicy,

    // -------------------------------------------------------------------------
    // Socket Configuration
    // -------------------------------------------------------------------------
    /// Upper bound on a single payload read, in bytes
    pub recv_chunk_size: usize,

    /// Socket read timeout (milliseconds, 0 = block forever)
    pub read_timeout_ms: u64,

    /// Socket write timeout (milliseconds, 0 = block forever)
    pub write_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5001,
            transport: Transport::Tcp,
            checksum: ChecksumAlgorithm::Crc32,
            compression_level: 0,
            passphrase: None,
            nonce_mode: NonceMode::Random,
            max_payload_size: 64 * 1024 * 1024, // 64 MB
            auto_reconnect: false,
            max_retry: 5,
            backoff: BackoffPolicy::default(),
            recv_chunk_size: 4096,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl ConnectionConfig {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings that can never work
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(TxrxError::Config("host must not be empty".to_string()));
        }
        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(TxrxError::Config(format!(
                "compression level {} out of range (0-{})",
                self.compression_level, MAX_COMPRESSION_LEVEL
            )));
        }
        if self.recv_chunk_size == 0 {
            return Err(TxrxError::Config(
                "receive chunk size must be at least 1 byte".to_string(),
            ));
        }
        if self.max_retry == 0 {
            return Err(TxrxError::Config(
                "max retry count must be at least 1".to_string(),
            ));
        }
        if self.max_payload_size == 0 || self.max_payload_size > u32::MAX as usize {
            return Err(TxrxError::Config(format!(
                "max payload size {} out of range (1-{})",
                self.max_payload_size,
                u32::MAX
            )));
        }
        Ok(())
    }

    /// `host:port` as used for connect and bind
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Derive the cipher for this connection, if encryption is enabled
    pub fn cipher(&self) -> Option<Cipher> {
        self.passphrase
            .as_deref()
            .map(|passphrase| Cipher::new(passphrase, self.nonce_mode))
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }
}

/// Builder for ConnectionConfig
#[derive(Default)]
pub struct ConfigBuilder {
    config: ConnectionConfig,
}

impl ConfigBuilder {
    /// Set the host to connect to or bind on
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the transport kind
    pub fn transport(mut self, transport: Transport) -> Self {
        self.config.transport = transport;
        self
    }

    /// Set the checksum algorithm
    pub fn checksum(mut self, algorithm: ChecksumAlgorithm) -> Self {
        self.config.checksum = algorithm;
        self
    }

    /// Set the zlib compression level (0 disables)
    pub fn compression_level(mut self, level: u8) -> Self {
        self.config.compression_level = level;
        self
    }

    /// Enable encryption with the given passphrase
    pub fn passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.config.passphrase = Some(passphrase.into());
        self
    }

    /// Set the nonce mode used when encryption is enabled
    pub fn nonce_mode(mut self, mode: NonceMode) -> Self {
        self.config.nonce_mode = mode;
        self
    }

    /// Set the payload size cap (in bytes)
    pub fn max_payload_size(mut self, size: usize) -> Self {
        self.config.max_payload_size = size;
        self
    }

    /// Enable or disable reconnect on failure
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.config.auto_reconnect = enabled;
        self
    }

    /// Set the retry count for send, receive and connect
    pub fn max_retry(mut self, count: u32) -> Self {
        self.config.max_retry = count;
        self
    }

    /// Set the connect backoff policy
    pub fn backoff(mut self, policy: BackoffPolicy) -> Self {
        self.config.backoff = policy;
        self
    }

    /// Set the receive chunk size (in bytes)
    pub fn recv_chunk_size(mut self, size: usize) -> Self {
        self.config.recv_chunk_size = size;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}
