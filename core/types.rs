// Core types shared by every fanin component
use std::borrow::Cow;
use std::fmt;

/// Size of one message frame on the wire (BUF_SIZE).
pub const FRAME_SIZE: usize = 1024;

pub const DEFAULT_PORT: u16 = 8001;
pub const DEFAULT_BACKLOG: i32 = 32;

/// Maximum connections admitted per run (MAX_CLIENTS).
pub const DEFAULT_CAPACITY: usize = 4;
pub const DEFAULT_MESSAGES_PER_CLIENT: usize = 5;

// Connection ID, assigned in admission order starting at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One complete frame received on a connection.
///
/// The payload is opaque and captured verbatim; it is never modified after the
/// message is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    connection: ConnectionId,
    payload: Box<[u8]>,
}

impl Message {
    pub fn new(connection: ConnectionId, payload: impl Into<Box<[u8]>>) -> Self {
        Message {
            connection,
            payload: payload.into(),
        }
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Payload up to the first NUL byte, decoded lossily.
    pub fn text(&self) -> Cow<'_, str> {
        let end = self
            .payload
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.payload.len());
        String::from_utf8_lossy(&self.payload[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_stops_at_first_nul() {
        let mut frame = vec![0u8; 16];
        frame[..5].copy_from_slice(b"Hello");
        frame[6] = b'X';
        let msg = Message::new(ConnectionId(1), frame);

        assert_eq!(msg.text(), "Hello");
        assert_eq!(msg.len(), 16);
    }

    #[test]
    fn text_without_nul_uses_whole_payload() {
        let msg = Message::new(ConnectionId(2), b"Car".to_vec());
        assert_eq!(msg.text(), "Car");
        assert_eq!(msg.connection().to_string(), "conn-2");
    }
}
