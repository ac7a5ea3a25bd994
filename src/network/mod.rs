//! Network Module
//!
//! Sockets, the per-connection protocol engine, and the client/server
//! orchestration on top of it.
//!
//! ## Architecture
//! - One `Connection` engine per socket, blocking and half-duplex
//! - `Client` owns a single engine and reconnects on failure
//! - `Server` owns a listener and a `PeerTable` of engines keyed by `PeerId`

mod client;
mod connection;
mod peers;
mod server;
mod socket;

pub use client::Client;
pub use connection::{Connection, Stage};
pub use peers::{PeerId, PeerTable, SharedConnection};
pub use server::Server;
pub use socket::{DatagramStream, Listener, ShutdownHandle, Socket, MAX_DATAGRAM_SIZE};
