//! txrx Client Binary
//!
//! Sends text messages to a txrx server and prints each reply.

use std::io::{self, BufRead};

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use txrx::{ChecksumAlgorithm, Client, ConnectionConfig, Transport};

/// txrx client
#[derive(Parser, Debug)]
#[command(name = "txrx-client")]
#[command(about = "Client for the txrx framing protocol")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
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

    /// Reconnect when an exchange fails
    #[arg(long)]
    auto_reconnect: bool,

    /// Keep retrying until the server is reachable
    #[arg(short, long)]
    wait: bool,

    /// Messages to send; reads lines from stdin when empty
    messages: Vec<String>,
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

    let mut builder = ConnectionConfig::builder()
        .host(&args.host)
        .port(args.port)
        .transport(args.transport)
        .checksum(args.checksum)
        .compression_level(args.compression)
        .auto_reconnect(args.auto_reconnect);
    if let Some(passphrase) = &args.passphrase {
        builder = builder.passphrase(passphrase);
    }

    if let Err(e) = run(builder.build(), args.wait, &args.messages) {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}

fn run(config: ConnectionConfig, wait: bool, messages: &[String]) -> txrx::Result<()> {
    let mut client = Client::new(config)?;
    client.connect(wait)?;

    if messages.is_empty() {
        for line in io::stdin().lock().lines() {
            exchange(&mut client, &line?)?;
        }
    } else {
        for message in messages {
            exchange(&mut client, message)?;
        }
    }

    client.disconnect();
    Ok(())
}

fn exchange(client: &mut Client, message: &str) -> txrx::Result<()> {
    client.send(message)?;
    let reply: String = client.receive()?;
    println!("{}", reply);
    Ok(())
}
