// client: companion sender that writes zero-padded fixed-size frames
use fanin_core::encode_frame;
use fanin_transport::{TcpTransport, Transport};
use std::io;
use std::net::ToSocketAddrs;

/// Messages each client sends in the reference scenario.
pub const DEFAULT_MESSAGES: [&str; 5] = ["Hello", "Apple", "Car", "Green", "Dog"];

pub struct IngestClient {
    transport: Box<dyn Transport>,
    frame_size: usize,
    sent: usize,
}

impl IngestClient {
    pub fn connect<A: ToSocketAddrs>(addr: A, frame_size: usize) -> io::Result<Self> {
        let transport = TcpTransport::connect(addr)?;
        Ok(Self::with_transport(Box::new(transport), frame_size))
    }

    pub fn with_transport(transport: Box<dyn Transport>, frame_size: usize) -> Self {
        IngestClient {
            transport,
            frame_size,
            sent: 0,
        }
    }

    /// Send `text` as one frame. Text longer than a frame is truncated.
    pub fn send_message(&mut self, text: &str) -> io::Result<()> {
        let frame = encode_frame(text, self.frame_size);
        self.transport.send_all(&frame)?;
        self.sent += 1;
        Ok(())
    }

    pub fn send_all<'a, I>(&mut self, messages: I) -> io::Result<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut count = 0;
        for text in messages {
            self.send_message(text)?;
            count += 1;
        }
        Ok(count)
    }

    /// Frames sent on this connection so far.
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Close the connection so the server side sees end-of-stream.
    pub fn close(mut self) -> io::Result<()> {
        self.transport.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder {
        bytes: Arc<Mutex<Vec<u8>>>,
    }

    impl Transport for Recorder {
        fn send(&mut self, data: &[u8]) -> io::Result<usize> {
            // Accept at most 3 bytes per call to exercise short writes.
            let n = data.len().min(3);
            self.bytes.lock().unwrap().extend_from_slice(&data[..n]);
            Ok(n)
        }
        fn receive(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
        fn set_nonblocking(&mut self, _nonblocking: bool) -> io::Result<()> {
            Ok(())
        }
        fn peer_addr(&self) -> Option<SocketAddr> {
            None
        }
        fn shutdown(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn every_message_becomes_one_padded_frame() {
        let recorder = Recorder::default();
        let mut client = IngestClient::with_transport(Box::new(recorder.clone()), 8);

        assert_eq!(client.send_all(["Hello", "Car"]).unwrap(), 2);
        assert_eq!(client.sent(), 2);

        let bytes = recorder.bytes.lock().unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..8], b"Hello\0\0\0");
        assert_eq!(&bytes[8..], b"Car\0\0\0\0\0");
    }
}
