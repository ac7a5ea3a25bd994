//! txrx Server Binary
//!
//! Accepts a fixed number of peers and echoes every text message back to
//! its sender.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use txrx::{ChecksumAlgorithm, ConnectionConfig, Server, Transport, TxrxError};

/// txrx echo server
#[derive(Parser, Debug)]
#[command(name = "txrx-server")]
#[command(about = "Echo server for the txrx framing protocol")]
#[command(version)]
struct Args {
    /// Address to bind on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind on
    #[arg(short, long, default_value = "5001")]
    port: u16,

    /// Transport kind (tcp or udp)
    #[arg(short, long, default_value = "tcp")]
    transport: Transport,

    /// Checksum algorithm (none, crc32, md5, sha256, sha512)
    #[arg(short, long, default_value = "crc32")]
    checksum: ChecksumAlgorithm,

    /// zlib compression level, 0 disables
    #[arg(short = 'z', long, default_value = "0")]
    compression: u8,

    /// Encryption passphrase
    #[arg(long)]
    passphrase: Option<String>,

    /// Number of peers to accept before serving
    #[arg(short = 'n', long, default_value = "1")]
    peers: usize,

    /// Re-accept a peer whose exchange fails
    #[arg(long)]
    auto_reconnect: bool,

    /// Attempts per send/receive
    #[arg(long, default_value = "5")]
    max_retry: u32,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,txrx=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("txrx server v{}", txrx::VERSION);

    let mut builder = ConnectionConfig::builder()
        .host(&args.host)
        .port(args.port)
        .transport(args.transport)
        .checksum(args.checksum)
        .compression_level(args.compression)
        .auto_reconnect(args.auto_reconnect)
        .max_retry(args.max_retry)
        // An echo server waits on idle peers indefinitely
        .read_timeout_ms(0);
    if let Some(passphrase) = &args.passphrase {
        builder = builder.passphrase(passphrase);
    }

    if let Err(e) = run(builder.build(), args.peers) {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

fn run(config: ConnectionConfig, peer_count: usize) -> txrx::Result<()> {
    let mut server = Server::new(config)?;
    server.start()?;

    let peers = server.accept_connections(peer_count)?;
    tracing::info!("Serving {} peer(s)", peers.len());

    let result = echo(&server);
    server.stop();
    result
}

/// Echo until every peer has gone away
fn echo(server: &Server) -> txrx::Result<()> {
    while server.peer_count() > 0 {
        for (peer, received) in server.receive_all::<String>()? {
            match received {
                Ok(message) => {
                    tracing::info!("{} says: {}", peer, message);
                    if let Err(e) = server.send(peer, &message) {
                        tracing::warn!("Dropping {}: {}", peer, e);
                        server.close_connection(peer)?;
                    }
                }
                Err(TxrxError::UnknownPeer(_)) => {}
                Err(e) => {
                    tracing::warn!("Dropping {}: {}", peer, e);
                    server.close_connection(peer)?;
                }
            }
        }
    }
    Ok(())
}
