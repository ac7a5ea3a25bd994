//! Peer table
//!
//! Server-side registry of accepted peers. Identities are opaque handles
//! handed out in accept order; the table lock only guards insert, remove and
//! lookup. Each connection sits behind its own mutex so peers can be driven
//! from different threads while blocking I/O runs outside the table lock.
//! A peer's shutdown handle lives outside that mutex, so a peer can be closed
//! while its exchange is still blocked.

use std::collections::BTreeMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::connection::Connection;
use super::socket::{ShutdownHandle, Socket};

/// Opaque identity of an accepted peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeerId(u64);

impl PeerId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Engine for one peer, lockable independently of the table
pub type SharedConnection<E> = Arc<Mutex<Connection<Socket, E>>>;

struct PeerEntry<E> {
    addr: SocketAddr,
    connection: SharedConnection<E>,
    closer: ShutdownHandle,
}

/// Mapping from peer identity to its connection
pub struct PeerTable<E> {
    /// Ordered by id, which is accept order
    entries: Mutex<BTreeMap<PeerId, PeerEntry<E>>>,
    next_id: AtomicU64,
}

impl<E> PeerTable<E> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new peer and return its identity
    pub fn insert(
        &self,
        addr: SocketAddr,
        connection: Connection<Socket, E>,
        closer: ShutdownHandle,
    ) -> PeerId {
        let id = PeerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().insert(
            id,
            PeerEntry {
                addr,
                connection: Arc::new(Mutex::new(connection)),
                closer,
            },
        );
        id
    }

    /// Swap in a fresh connection for an existing identity
    ///
    /// Returns the previous connection's shutdown handle, or `None` if the
    /// identity is unknown.
    pub fn replace(
        &self,
        id: PeerId,
        addr: SocketAddr,
        connection: Connection<Socket, E>,
        closer: ShutdownHandle,
    ) -> Option<ShutdownHandle> {
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(&id)?;
        entry.addr = addr;
        entry.connection = Arc::new(Mutex::new(connection));
        Some(std::mem::replace(&mut entry.closer, closer))
    }

    pub fn get(&self, id: PeerId) -> Option<SharedConnection<E>> {
        self.entries
            .lock()
            .get(&id)
            .map(|entry| Arc::clone(&entry.connection))
    }

    pub fn addr(&self, id: PeerId) -> Option<SocketAddr> {
        self.entries.lock().get(&id).map(|entry| entry.addr)
    }

    pub fn contains(&self, id: PeerId) -> bool {
        self.entries.lock().contains_key(&id)
    }

    /// Close a peer's socket without waiting for its engine lock
    ///
    /// Returns `false` if the identity is unknown.
    pub fn shutdown(&self, id: PeerId) -> bool {
        match self.entries.lock().get(&id) {
            Some(entry) => {
                entry.closer.shutdown();
                true
            }
            None => false,
        }
    }

    /// Forget a peer, returning its shutdown handle
    pub fn remove(&self, id: PeerId) -> Option<ShutdownHandle> {
        self.entries.lock().remove(&id).map(|entry| entry.closer)
    }

    /// Remove every peer, returning their shutdown handles in accept order
    pub fn drain(&self) -> Vec<(PeerId, ShutdownHandle)> {
        std::mem::take(&mut *self.entries.lock())
            .into_iter()
            .map(|(id, entry)| (id, entry.closer))
            .collect()
    }

    /// Identities in accept order
    pub fn ids(&self) -> Vec<PeerId> {
        self.entries.lock().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl<E> Default for PeerTable<E> {
    fn default() -> Self {
        Self::new()
    }
}
