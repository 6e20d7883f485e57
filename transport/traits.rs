// Transport abstraction - lets the server loops run over any stream backend
use std::io::Result;
use std::net::SocketAddr;

/// A connected, bidirectional byte stream.
pub trait Transport: Send {
    fn send(&mut self, data: &[u8]) -> Result<usize>;
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize>;
    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()>;
    fn peer_addr(&self) -> Option<SocketAddr>;
    fn shutdown(&mut self) -> Result<()>;

    /// Write the whole buffer, retrying short writes.
    fn send_all(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            match self.send(data) {
                Ok(0) => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::WriteZero,
                        "connection closed while sending",
                    ))
                }
                Ok(n) => data = &data[n..],
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// A listening endpoint producing connected transports.
pub trait TransportListener: Send {
    type Connection: Transport + 'static;

    fn accept(&mut self) -> Result<(Self::Connection, SocketAddr)>;
    fn local_addr(&self) -> Result<SocketAddr>;
    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()>;
}
