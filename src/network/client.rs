//! Client
//!
//! One outbound connection with connect-with-backoff and optional
//! reconnect-on-failure around every send and receive.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ConnectionConfig;
use crate::error::{Operation, Result, TxrxError};
use crate::frame::{BincodeEncoding, MessageEncoding};

use super::connection::Connection;
use super::socket::Socket;

/// Client side of a txrx connection
pub struct Client<E = BincodeEncoding> {
    config: Arc<ConnectionConfig>,
    encoding: E,
    connection: Option<Connection<Socket, E>>,
}

impl Client<BincodeEncoding> {
    /// Create a disconnected client with the default encoding
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        Self::with_encoding(config, BincodeEncoding)
    }
}

impl<E: MessageEncoding + Clone> Client<E> {
    /// Create a disconnected client with an explicit encoding
    pub fn with_encoding(config: ConnectionConfig, encoding: E) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            encoding,
            connection: None,
        })
    }

    /// Open the configured transport
    ///
    /// With `wait_indefinitely`, keeps retrying until the peer is reachable;
    /// otherwise gives up after `max_retry` attempts with
    /// `RetryExhausted { operation: Connect, .. }`. Any existing socket is
    /// closed first.
    pub fn connect(&mut self, wait_indefinitely: bool) -> Result<()> {
        self.disconnect();

        let endpoint = self.config.endpoint();
        let max_retry = self.config.max_retry;
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);

            match Socket::connect(&self.config) {
                Ok(socket) => {
                    let peer = socket
                        .peer_addr()
                        .map(|a| a.to_string())
                        .unwrap_or_else(|_| endpoint.clone());
                    self.connection = Some(
                        Connection::with_encoding(
                            socket,
                            Arc::clone(&self.config),
                            self.encoding.clone(),
                        )?
                        .with_peer_addr(peer),
                    );
                    tracing::info!(
                        "Connected to {} over {} (attempt {})",
                        endpoint,
                        self.config.transport,
                        attempt
                    );
                    return Ok(());
                }
                Err(e) => {
                    if !wait_indefinitely && attempt >= max_retry {
                        tracing::error!("Could not connect to {}: {}", endpoint, e);
                        return Err(TxrxError::RetryExhausted {
                            operation: Operation::Connect,
                            attempts: attempt,
                            last_error: e.to_string(),
                        });
                    }

                    let delay = self.config.backoff.delay(attempt);
                    tracing::info!(
                        "Waiting for server on {} ({}), retrying in {:?}",
                        endpoint,
                        e,
                        delay
                    );
                    thread::sleep(delay);
                }
            }
        }
    }

    /// Send one message to the server
    pub fn send<T: Serialize + ?Sized>(&mut self, message: &T) -> Result<()> {
        self.with_reconnect(|connection| connection.send(message))
    }

    /// Receive one message from the server
    pub fn receive<T: DeserializeOwned>(&mut self) -> Result<T> {
        self.with_reconnect(|connection| connection.receive())
    }

    /// Close the socket; calling it again is a no-op
    pub fn disconnect(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.get_ref().shutdown();
            tracing::info!("Disconnected from {}", connection.peer_addr());
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Local address of the open socket
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let connection = self.connection.as_ref().ok_or(TxrxError::NotConnected)?;
        Ok(connection.get_ref().local_addr()?)
    }

    /// Remote address of the open socket
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        let connection = self.connection.as_ref().ok_or(TxrxError::NotConnected)?;
        Ok(connection.get_ref().peer_addr()?)
    }

    /// Run `op`, tearing down and re-establishing the socket on recoverable
    /// failures when auto-reconnect is enabled
    ///
    /// Reconnect cycles are bounded by `max_retry`; each cycle uses a bounded
    /// connect.
    fn with_reconnect<R>(
        &mut self,
        mut op: impl FnMut(&mut Connection<Socket, E>) -> Result<R>,
    ) -> Result<R> {
        let mut reconnects: u32 = 0;

        loop {
            let connection = self.connection.as_mut().ok_or(TxrxError::NotConnected)?;

            match op(connection) {
                Ok(value) => return Ok(value),
                Err(e)
                    if self.config.auto_reconnect
                        && e.is_recoverable()
                        && reconnects < self.config.max_retry =>
                {
                    reconnects += 1;
                    tracing::info!("Resetting connection after error: {}", e);
                    self.connect(false)?;
                    tracing::info!("Reconnected to server");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
