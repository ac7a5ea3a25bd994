//! Socket abstraction
//!
//! Blocking TCP and UDP sockets behind one `Read + Write` type so the
//! connection engine drives both the same way.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, UdpSocket};

use bytes::{Buf, BytesMut};

use crate::config::{ConnectionConfig, Transport};

/// Largest UDP payload over IPv4
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// A connected socket
#[derive(Debug)]
pub enum Socket {
    Tcp(TcpStream),
    Udp(DatagramStream),
}

impl Socket {
    /// Open an outbound socket to the configured endpoint
    pub fn connect(config: &ConnectionConfig) -> io::Result<Self> {
        let endpoint = config.endpoint();
        let socket = match config.transport {
            Transport::Tcp => {
                let stream = TcpStream::connect(endpoint.as_str())?;
                // Disable Nagle's algorithm: every exchange waits on a 4-byte ack
                stream.set_nodelay(true)?;
                Socket::Tcp(stream)
            }
            Transport::Udp => {
                let socket = UdpSocket::bind(("0.0.0.0", 0))?;
                socket.connect(endpoint.as_str())?;
                Socket::Udp(DatagramStream::new(socket))
            }
        };
        socket.apply_timeouts(config)?;
        Ok(socket)
    }

    /// Apply the configured read/write timeouts
    pub fn apply_timeouts(&self, config: &ConnectionConfig) -> io::Result<()> {
        match self {
            Socket::Tcp(stream) => {
                stream.set_read_timeout(config.read_timeout())?;
                stream.set_write_timeout(config.write_timeout())
            }
            Socket::Udp(stream) => {
                stream.socket.set_read_timeout(config.read_timeout())?;
                stream.socket.set_write_timeout(config.write_timeout())
            }
        }
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Socket::Tcp(stream) => stream.peer_addr(),
            Socket::Udp(stream) => stream.socket.peer_addr(),
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Socket::Tcp(stream) => stream.local_addr(),
            Socket::Udp(stream) => stream.socket.local_addr(),
        }
    }

    /// Close both directions of a TCP socket
    pub fn shutdown(&self) {
        if let Socket::Tcp(stream) = self {
            // NotConnected here only means the peer already closed
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    /// A second handle that can close this socket while another thread is
    /// blocked reading or writing it
    pub fn shutdown_handle(&self) -> io::Result<ShutdownHandle> {
        match self {
            Socket::Tcp(stream) => Ok(ShutdownHandle(Some(stream.try_clone()?))),
            Socket::Udp(_) => Ok(ShutdownHandle(None)),
        }
    }
}

/// Out-of-band close for a socket owned by a connection engine
///
/// Shutting down a TCP socket wakes any blocked read or write on it with a
/// connection error. UDP has no such wakeup; a blocked UDP read ends at the
/// read timeout.
#[derive(Debug)]
pub struct ShutdownHandle(Option<TcpStream>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        if let Some(stream) = &self.0 {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

impl Read for Socket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Socket::Tcp(stream) => stream.read(buf),
            Socket::Udp(stream) => stream.read(buf),
        }
    }
}

impl Write for Socket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Socket::Tcp(stream) => stream.write(buf),
            Socket::Udp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Socket::Tcp(stream) => stream.flush(),
            Socket::Udp(stream) => stream.flush(),
        }
    }
}

/// Byte-stream view of a connected UDP socket
///
/// Each received datagram is buffered whole, so reads smaller than a
/// datagram never drop its tail. Writes are split into datagrams of at most
/// `MAX_DATAGRAM_SIZE` bytes. UDP does not retransmit: a lost datagram shows
/// up as a read timeout or checksum failure and goes through the normal
/// retry path.
#[derive(Debug)]
pub struct DatagramStream {
    socket: UdpSocket,
    pending: BytesMut,
}

impl DatagramStream {
    /// Wrap an already-connected UDP socket
    pub fn new(socket: UdpSocket) -> Self {
        Self {
            socket,
            pending: BytesMut::new(),
        }
    }

    pub fn get_ref(&self) -> &UdpSocket {
        &self.socket
    }
}

impl Read for DatagramStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.pending.is_empty() {
            let mut datagram = vec![0u8; MAX_DATAGRAM_SIZE];
            let received = self.socket.recv(&mut datagram)?;
            if received == 0 {
                // Empty datagrams carry nothing; wait for the next one
                continue;
            }
            self.pending.extend_from_slice(&datagram[..received]);
        }

        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }
}

impl Write for DatagramStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let len = buf.len().min(MAX_DATAGRAM_SIZE);
        self.socket.send(&buf[..len])
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A bound, listening socket
#[derive(Debug)]
pub enum Listener {
    Tcp(TcpListener),
    Udp(UdpSocket),
}

impl Listener {
    /// Bind to the configured endpoint
    pub fn bind(config: &ConnectionConfig) -> io::Result<Self> {
        let endpoint = config.endpoint();
        match config.transport {
            Transport::Tcp => Ok(Listener::Tcp(TcpListener::bind(endpoint.as_str())?)),
            Transport::Udp => Ok(Listener::Udp(UdpSocket::bind(endpoint.as_str())?)),
        }
    }

    /// Block until a peer arrives
    ///
    /// For UDP the first datagram's sender becomes the peer and the socket
    /// is connected to it; the datagram itself stays queued.
    pub fn accept(&self) -> io::Result<(Socket, SocketAddr)> {
        match self {
            Listener::Tcp(listener) => {
                let (stream, addr) = listener.accept()?;
                stream.set_nodelay(true)?;
                Ok((Socket::Tcp(stream), addr))
            }
            Listener::Udp(socket) => {
                let mut first = [0u8; 1];
                let (_, addr) = socket.peek_from(&mut first)?;
                let peer = socket.try_clone()?;
                peer.connect(addr)?;
                Ok((Socket::Udp(DatagramStream::new(peer)), addr))
            }
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        match self {
            Listener::Tcp(listener) => listener.local_addr(),
            Listener::Udp(socket) => socket.local_addr(),
        }
    }

    pub fn transport(&self) -> Transport {
        match self {
            Listener::Tcp(_) => Transport::Tcp,
            Listener::Udp(_) => Transport::Udp,
        }
    }
}
