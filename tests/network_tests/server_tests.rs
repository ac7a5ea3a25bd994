//! Server Tests
//!
//! Tests for accept, the peer table, fan-out and re-accept.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use txrx::{Client, ConnectionConfig, Server, Transport, TxrxError};

use crate::support::{loopback_config, started_server};

// =============================================================================
// Helper Functions
// =============================================================================

fn connect_clients(port: u16, count: usize) -> Vec<Client> {
    (0..count)
        .map(|_| {
            let mut client = Client::new(loopback_config(port)).unwrap();
            client.connect(false).unwrap();
            client
        })
        .collect()
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_new_rejects_invalid_config() {
    let config = ConnectionConfig::builder().recv_chunk_size(0).build();
    assert!(matches!(Server::new(config), Err(TxrxError::Config(_))));
}

#[test]
fn test_accept_before_start() {
    let server = Server::new(loopback_config(0)).unwrap();
    assert!(!server.is_listening());
    assert!(matches!(server.accept_connections(1), Err(TxrxError::NotConnected)));
}

#[test]
fn test_stop_closes_everything() {
    let (mut server, port) = started_server(loopback_config(0));
    let _clients = connect_clients(port, 2);
    server.accept_connections(2).unwrap();

    server.stop();
    assert!(!server.is_listening());
    assert_eq!(server.peer_count(), 0);
    assert!(matches!(server.local_addr(), Err(TxrxError::NotConnected)));
}

// =============================================================================
// Peer Table Tests
// =============================================================================

#[test]
fn test_accept_registers_peers_in_order() {
    let (server, port) = started_server(loopback_config(0));
    let clients = connect_clients(port, 3);

    let accepted = server.accept_connections(3).unwrap();
    assert_eq!(accepted.len(), 3);
    assert_eq!(server.peers(), accepted);
    assert!(accepted.windows(2).all(|pair| pair[0] < pair[1]));

    for (peer, client) in accepted.iter().zip(&clients) {
        assert_eq!(server.peer_addr(*peer).unwrap(), client.local_addr().unwrap());
    }
}

#[test]
fn test_unknown_peer() {
    let (server, port) = started_server(loopback_config(0));
    let _clients = connect_clients(port, 1);
    let peer = server.accept_connections(1).unwrap()[0];

    server.close_connection(peer).unwrap();

    let err = server.send(peer, "hello").unwrap_err();
    assert!(matches!(err, TxrxError::UnknownPeer(id) if id == peer));
    assert!(err.is_configuration());
    assert!(matches!(server.receive::<String>(peer), Err(TxrxError::UnknownPeer(_))));
    assert!(matches!(server.close_connection(peer), Err(TxrxError::UnknownPeer(_))));
    assert!(matches!(server.peer_addr(peer), Err(TxrxError::UnknownPeer(_))));
}

#[test]
fn test_close_all() {
    let (server, port) = started_server(loopback_config(0));
    let _clients = connect_clients(port, 2);
    server.accept_connections(2).unwrap();

    server.close_all();
    assert!(server.peers().is_empty());
    assert!(server.is_listening());
}

#[test]
fn test_close_interrupts_blocked_receive() {
    // Idle peer: a blocked receive would otherwise wait out every read timeout
    let config = ConnectionConfig {
        read_timeout_ms: 5000,
        ..loopback_config(0)
    };
    let (server, port) = started_server(config);
    let _clients = connect_clients(port, 1);
    let peer = server.accept_connections(1).unwrap()[0];

    let server = Arc::new(server);
    let receiver = Arc::clone(&server);
    let started = Instant::now();
    let handle = thread::spawn(move || receiver.receive::<String>(peer));

    thread::sleep(Duration::from_millis(100));
    let closing = Instant::now();
    server.close_connection(peer).unwrap();
    assert!(closing.elapsed() < Duration::from_secs(1));

    let result = handle.join().unwrap();
    assert!(result.is_err());
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(server.peers().is_empty());
}

#[test]
fn test_close_all_interrupts_blocked_receives() {
    let config = ConnectionConfig {
        read_timeout_ms: 5000,
        ..loopback_config(0)
    };
    let (server, port) = started_server(config);
    let _clients = connect_clients(port, 2);
    let peers = server.accept_connections(2).unwrap();

    let server = Arc::new(server);
    let started = Instant::now();
    let handles: Vec<_> = peers
        .iter()
        .map(|&peer| {
            let receiver = Arc::clone(&server);
            thread::spawn(move || receiver.receive::<String>(peer))
        })
        .collect();

    thread::sleep(Duration::from_millis(100));
    server.close_all();

    for handle in handles {
        assert!(handle.join().unwrap().is_err());
    }
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(server.peer_count(), 0);
}

// =============================================================================
// Fan-Out Tests
// =============================================================================

#[test]
fn test_broadcast() {
    let (server, port) = started_server(loopback_config(0));
    let mut clients = connect_clients(port, 3);
    server.accept_connections(3).unwrap();

    let server = Arc::new(server);
    let sender = Arc::clone(&server);
    let handle = thread::spawn(move || sender.broadcast("to everyone").unwrap());

    for client in &mut clients {
        let message: String = client.receive().unwrap();
        assert_eq!(message, "to everyone");
    }
    handle.join().unwrap();
}

#[test]
fn test_receive_all() {
    let (server, port) = started_server(loopback_config(0));
    let clients = connect_clients(port, 3);
    let peers = server.accept_connections(3).unwrap();

    let senders: Vec<_> = clients
        .into_iter()
        .enumerate()
        .map(|(i, mut client)| {
            thread::spawn(move || {
                client.send(&(i as u32 * 10)).unwrap();
                client
            })
        })
        .collect();

    let results = server.receive_all::<u32>().unwrap();
    for handle in senders {
        handle.join().unwrap();
    }

    assert_eq!(results.len(), 3);
    for (i, (peer, result)) in results.into_iter().enumerate() {
        assert_eq!(peer, peers[i]);
        assert_eq!(result.unwrap(), i as u32 * 10);
    }
}

// =============================================================================
// Reconnect Tests
// =============================================================================

#[test]
fn test_reaccept_under_same_identity() {
    let config = ConnectionConfig {
        auto_reconnect: true,
        ..loopback_config(0)
    };
    let (server, port) = started_server(config);

    let first = connect_clients(port, 1);
    let peer = server.accept_connections(1).unwrap()[0];
    let first_addr = server.peer_addr(peer).unwrap();

    let server = Arc::new(server);
    let receiver = Arc::clone(&server);
    let handle = thread::spawn(move || receiver.receive::<String>(peer).unwrap());

    // Peer goes away; its replacement is accepted under the same identity
    drop(first);
    let mut replacement = connect_clients(port, 1);
    replacement[0].send("from replacement").unwrap();

    assert_eq!(handle.join().unwrap(), "from replacement");
    assert_eq!(server.peers(), vec![peer]);
    assert_ne!(server.peer_addr(peer).unwrap(), first_addr);
    assert_eq!(
        server.peer_addr(peer).unwrap(),
        replacement[0].local_addr().unwrap()
    );
}

#[test]
fn test_concurrent_reaccepts_bind_one_peer_each() {
    let config = ConnectionConfig {
        auto_reconnect: true,
        ..loopback_config(0)
    };
    let (server, port) = started_server(config);

    let originals = connect_clients(port, 2);
    let peers = server.accept_connections(2).unwrap();

    let server = Arc::new(server);
    let receiver = Arc::clone(&server);
    let handle = thread::spawn(move || receiver.receive_all::<u32>().unwrap());

    // Both peers go away at once; both identities wait on the listener
    drop(originals);
    let replacements = connect_clients(port, 2);
    let addrs: Vec<_> = replacements
        .iter()
        .map(|client| client.local_addr().unwrap())
        .collect();

    let senders: Vec<_> = replacements
        .into_iter()
        .enumerate()
        .map(|(i, mut client)| {
            thread::spawn(move || {
                client.send(&(i as u32)).unwrap();
                client
            })
        })
        .collect();

    let results = handle.join().unwrap();
    for sender in senders {
        sender.join().unwrap();
    }

    let mut seen = HashSet::new();
    for (peer, result) in results {
        let index = result.unwrap();
        assert!(seen.insert(index));
        assert_eq!(server.peer_addr(peer).unwrap(), addrs[index as usize]);
    }
    assert_eq!(seen, HashSet::from([0, 1]));
    assert_eq!(server.peers(), peers);
}

#[test]
fn test_failed_receive_without_reconnect() {
    let (server, port) = started_server(loopback_config(0));
    let clients = connect_clients(port, 1);
    let peer = server.accept_connections(1).unwrap()[0];

    drop(clients);
    let err = server.receive::<String>(peer).unwrap_err();
    assert!(err.is_recoverable());
    assert!(server.peers().contains(&peer));
}

// =============================================================================
// UDP Tests
// =============================================================================

#[test]
fn test_udp_exchange() {
    let config = ConnectionConfig {
        transport: Transport::Udp,
        ..loopback_config(0)
    };
    let (server, port) = started_server(config.clone());

    let handle = thread::spawn(move || {
        let peer = server.accept_connections(1).unwrap()[0];
        let message: String = server.receive(peer).unwrap();
        server.send(peer, &format!("echo: {}", message)).unwrap();
        assert!(matches!(
            server.accept_connections(1),
            Err(TxrxError::Config(_))
        ));
    });

    let mut client = Client::new(ConnectionConfig { port, ..config }).unwrap();
    client.connect(false).unwrap();
    client.send("datagram").unwrap();
    let reply: String = client.receive().unwrap();

    assert_eq!(reply, "echo: datagram");
    handle.join().unwrap();
}
