//! Connections handed from the scanner to a discovery protocol.
//!
//! The scanner decides how a host is dialed; the protocol only sees a [`Connection`], which
//! states up front whether it is datagram or stream oriented.

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::net::{TcpStream, UdpSocket};

/// A datagram connection bound to a single remote endpoint.
#[async_trait]
pub trait PacketConn: Send + Sync {
    /// Sends one datagram to the remote endpoint.
    async fn send(&self, payload: &[u8]) -> io::Result<usize>;

    /// Receives one datagram. `buf` is filled from the start; excess bytes are dropped.
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// The endpoint datagrams are sent to.
    fn remote_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl PacketConn for UdpSocket {
    async fn send(&self, payload: &[u8]) -> io::Result<usize> {
        UdpSocket::send(self, payload).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        UdpSocket::recv_from(self, buf).await
    }

    fn remote_addr(&self) -> io::Result<SocketAddr> {
        self.peer_addr()
    }
}

/// An open connection to a scanned host:port.
pub enum Connection {
    Packet(Box<dyn PacketConn>),
    Stream(TcpStream),
}

impl Connection {
    pub fn packet(conn: impl PacketConn + 'static) -> Self {
        Connection::Packet(Box::new(conn))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Connection::Packet(_) => "packet",
            Connection::Stream(_) => "stream",
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connection::Packet(conn) => f
                .debug_tuple("Packet")
                .field(&conn.remote_addr().ok())
                .finish(),
            Connection::Stream(stream) => f
                .debug_tuple("Stream")
                .field(&stream.peer_addr().ok())
                .finish(),
        }
    }
}
