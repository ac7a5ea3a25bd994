//! Server
//!
//! Owns the listening socket and the peer table.
//!
//! ## Responsibilities
//! - Bind on the configured transport and accept peers
//! - Route per-peer send/receive to that peer's connection engine
//! - Re-accept under the same identity when an exchange fails and
//!   auto-reconnect is enabled
//! - Fan out to every peer (`broadcast`, `receive_all`)
//!
//! Methods other than `start` and `stop` take `&self`, so one server can be
//! shared between threads; each peer's engine is locked only for the
//! duration of its own exchange. Closing a peer shuts its socket down through
//! a separate handle, which interrupts an exchange blocked on that peer.
//! Accepts are serialized, so each re-accepted connection binds to exactly
//! one waiting identity.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{ConnectionConfig, Transport};
use crate::error::{Result, TxrxError};
use crate::frame::{BincodeEncoding, MessageEncoding};

use super::connection::Connection;
use super::peers::{PeerId, PeerTable};
use super::socket::{Listener, ShutdownHandle, Socket};

/// Server side of txrx connections
pub struct Server<E = BincodeEncoding> {
    config: Arc<ConnectionConfig>,
    encoding: E,
    listener: Option<Listener>,
    /// Held for the duration of every accept on `listener`
    accept_lock: Mutex<()>,
    peers: PeerTable<E>,
}

impl Server<BincodeEncoding> {
    /// Create a server with the default encoding; nothing is bound yet
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        Self::with_encoding(config, BincodeEncoding)
    }
}

impl<E: MessageEncoding + Clone> Server<E> {
    /// Create a server with an explicit encoding
    pub fn with_encoding(config: ConnectionConfig, encoding: E) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            encoding,
            listener: None,
            accept_lock: Mutex::new(()),
            peers: PeerTable::new(),
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Bind and listen on the configured endpoint
    pub fn start(&mut self) -> Result<()> {
        let listener = Listener::bind(&self.config)?;
        tracing::info!(
            "Listening on {} ({})",
            listener.local_addr()?,
            listener.transport()
        );
        self.listener = Some(listener);
        Ok(())
    }

    /// Block until `count` new peers have been accepted
    ///
    /// Returns their identities in accept order. A UDP listener serves a
    /// single peer.
    pub fn accept_connections(&self, count: usize) -> Result<Vec<PeerId>> {
        let listener = self.listener()?;
        if listener.transport() == Transport::Udp && self.peers.len() + count > 1 {
            return Err(TxrxError::Config(
                "a udp server serves exactly one peer".to_string(),
            ));
        }

        let _accepting = self.accept_lock.lock();
        let mut accepted = Vec::with_capacity(count);
        for _ in 0..count {
            let (connection, closer, addr) = self.accept_one(listener)?;
            let id = self.peers.insert(addr, connection, closer);
            tracing::info!("Accepted {} from {}", id, addr);
            accepted.push(id);
        }
        Ok(accepted)
    }

    /// Close every peer and the listening socket
    pub fn stop(&mut self) {
        self.close_all();
        if self.listener.take().is_some() {
            tracing::info!("Server stopped");
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    /// Address the listener is bound to (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener()?.local_addr()?)
    }

    // =========================================================================
    // Per-Peer Exchanges
    // =========================================================================

    /// Send one message to a peer
    pub fn send<T: Serialize + ?Sized>(&self, peer: PeerId, message: &T) -> Result<()> {
        self.with_peer(peer, |connection| connection.send(message))
    }

    /// Receive one message from a peer
    pub fn receive<T: DeserializeOwned>(&self, peer: PeerId) -> Result<T> {
        self.with_peer(peer, |connection| connection.receive())
    }

    /// Send the same message to every peer, in accept order
    ///
    /// Stops at the first peer that fails.
    pub fn broadcast<T: Serialize + ?Sized>(&self, message: &T) -> Result<()> {
        for peer in self.peers.ids() {
            self.send(peer, message)?;
        }
        Ok(())
    }

    /// Receive one message from every peer, each on its own thread
    ///
    /// Results come back in accept order; one peer failing does not affect
    /// the others.
    pub fn receive_all<T>(&self) -> Result<Vec<(PeerId, Result<T>)>>
    where
        T: DeserializeOwned + Send,
        E: Send + Sync,
    {
        let ids = self.peers.ids();

        let results = crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = ids
                .iter()
                .map(|&peer| (peer, scope.spawn(move |_| self.receive::<T>(peer))))
                .collect();

            handles
                .into_iter()
                .map(|(peer, handle)| {
                    let result = handle.join().unwrap_or(Err(TxrxError::WorkerPanicked));
                    (peer, result)
                })
                .collect::<Vec<_>>()
        })
        .map_err(|_| TxrxError::WorkerPanicked)?;

        Ok(results)
    }

    // =========================================================================
    // Peer Table
    // =========================================================================

    /// Tear down one peer and forget its identity
    ///
    /// An exchange blocked on this peer in another thread fails with a
    /// connection error.
    pub fn close_connection(&self, peer: PeerId) -> Result<()> {
        let closer = self.peers.remove(peer).ok_or(TxrxError::UnknownPeer(peer))?;
        closer.shutdown();
        tracing::info!("Closed {}", peer);
        Ok(())
    }

    /// Tear down every peer
    pub fn close_all(&self) {
        for (peer, closer) in self.peers.drain() {
            closer.shutdown();
            tracing::info!("Closed {}", peer);
        }
    }

    /// Identities of the connected peers, in accept order
    pub fn peers(&self) -> Vec<PeerId> {
        self.peers.ids()
    }

    /// Remote address currently bound to a peer identity
    pub fn peer_addr(&self, peer: PeerId) -> Result<SocketAddr> {
        self.peers.addr(peer).ok_or(TxrxError::UnknownPeer(peer))
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn listener(&self) -> Result<&Listener> {
        self.listener.as_ref().ok_or(TxrxError::NotConnected)
    }

    /// Accept one peer; callers hold `accept_lock`
    fn accept_one(
        &self,
        listener: &Listener,
    ) -> Result<(Connection<Socket, E>, ShutdownHandle, SocketAddr)> {
        let (socket, addr) = listener.accept()?;
        socket.apply_timeouts(&self.config)?;
        let closer = socket.shutdown_handle()?;
        let connection =
            Connection::with_encoding(socket, Arc::clone(&self.config), self.encoding.clone())?
                .with_peer_addr(addr.to_string());
        Ok((connection, closer, addr))
    }

    /// Run `op` against a peer's engine, re-accepting under the same identity
    /// on recoverable failures when auto-reconnect is enabled
    fn with_peer<R>(
        &self,
        peer: PeerId,
        mut op: impl FnMut(&mut Connection<Socket, E>) -> Result<R>,
    ) -> Result<R> {
        let mut reconnects: u32 = 0;

        loop {
            let connection = self.peers.get(peer).ok_or(TxrxError::UnknownPeer(peer))?;
            let result = op(&mut *connection.lock());

            match result {
                Ok(value) => return Ok(value),
                Err(e)
                    if self.config.auto_reconnect
                        && e.is_recoverable()
                        && reconnects < self.config.max_retry =>
                {
                    // Closed while the exchange was running
                    if !self.peers.shutdown(peer) {
                        return Err(e);
                    }
                    reconnects += 1;
                    tracing::info!("Resetting {} after error: {}", peer, e);
                    self.reaccept(peer)?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Accept the next incoming peer and bind it to an existing identity
    fn reaccept(&self, peer: PeerId) -> Result<()> {
        let listener = self.listener()?;
        let _accepting = self.accept_lock.lock();
        if !self.peers.contains(peer) {
            return Err(TxrxError::UnknownPeer(peer));
        }

        let (connection, closer, addr) = self.accept_one(listener)?;
        match self.peers.replace(peer, addr, connection, closer) {
            Some(_) => {
                tracing::info!("Reconnected {} from {}", peer, addr);
                Ok(())
            }
            // Closed by another thread while we were accepting
            None => Err(TxrxError::UnknownPeer(peer)),
        }
    }
}
