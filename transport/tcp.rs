// TCP transport implementation
use crate::traits::{Transport, TransportListener};
use std::io::{Read, Result, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::os::fd::AsRawFd;

use nix::sys::socket::{
    bind, listen, setsockopt, socket, sockopt, AddressFamily, Backlog, SockFlag, SockType,
    SockaddrStorage,
};

pub struct TcpTransport {
    stream: TcpStream,
    peer: Option<SocketAddr>,
}

impl TcpTransport {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        Ok(Self::from_stream(stream))
    }

    pub fn from_stream(stream: TcpStream) -> Self {
        let peer = stream.peer_addr().ok();
        TcpTransport { stream, peer }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.stream.local_addr()
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, data: &[u8]) -> Result<usize> {
        self.stream.write(data)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.stream.read(buf)
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()> {
        self.stream.set_nonblocking(nonblocking)
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    fn shutdown(&mut self) -> Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            // Peer may already be gone
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

/// Listening TCP socket with an explicit accept backlog.
pub struct TcpListenerTransport {
    listener: TcpListener,
}

impl TcpListenerTransport {
    /// socket + SO_REUSEADDR + bind + listen(backlog). `std` does not expose the
    /// backlog, so the socket is built with nix and handed to `TcpListener`.
    pub fn bind(addr: SocketAddr, backlog: i32) -> Result<Self> {
        let family = if addr.is_ipv4() {
            AddressFamily::Inet
        } else {
            AddressFamily::Inet6
        };

        let fd = socket(family, SockType::Stream, SockFlag::empty(), None)?;
        setsockopt(&fd, sockopt::ReuseAddr, &true)?;
        bind(fd.as_raw_fd(), &SockaddrStorage::from(addr))?;

        let backlog = Backlog::new(backlog.clamp(1, libc::SOMAXCONN))?;
        listen(&fd, backlog)?;

        Ok(TcpListenerTransport {
            listener: TcpListener::from(fd),
        })
    }
}

impl TransportListener for TcpListenerTransport {
    type Connection = TcpTransport;

    fn accept(&mut self) -> Result<(TcpTransport, SocketAddr)> {
        let (stream, peer) = self.listener.accept()?;
        Ok((TcpTransport { stream, peer: Some(peer) }, peer))
    }

    fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr()
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()> {
        self.listener.set_nonblocking(nonblocking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[test]
    fn bind_to_ephemeral_port() {
        let listener = TcpListenerTransport::bind(loopback(), 8).unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[test]
    fn nonblocking_accept_would_block_without_clients() {
        let mut listener = TcpListenerTransport::bind(loopback(), 8).unwrap();
        listener.set_nonblocking(true).unwrap();

        let err = listener.accept().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);
    }

    #[test]
    fn accepted_connection_receives_sent_bytes() {
        let mut listener = TcpListenerTransport::bind(loopback(), 8).unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = TcpTransport::connect(addr).unwrap();
        let (mut server_side, peer) = listener.accept().unwrap();
        assert_eq!(Some(peer), server_side.peer_addr());

        client.send_all(b"Apple").unwrap();
        let mut buf = [0u8; 5];
        let mut read = 0;
        while read < buf.len() {
            read += server_side.receive(&mut buf[read..]).unwrap();
        }
        assert_eq!(&buf, b"Apple");
    }

    #[test]
    fn bind_twice_on_same_port_fails() {
        let first = TcpListenerTransport::bind(loopback(), 8).unwrap();
        let addr = first.local_addr().unwrap();
        assert!(TcpListenerTransport::bind(addr, 8).is_err());
    }
}
