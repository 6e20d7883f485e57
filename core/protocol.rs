// Framing: fixed-size frames with no length prefix.
//
// A read may return any number of bytes, so frames are accumulated until exactly
// `frame_size` bytes are available. Short reads are never turned into messages.

/// Copy `text` into a zero-padded frame, truncating if it does not fit.
pub fn encode_frame(text: &str, frame_size: usize) -> Vec<u8> {
    let mut frame = vec![0u8; frame_size];
    let bytes = text.as_bytes();
    let len = bytes.len().min(frame_size);
    frame[..len].copy_from_slice(&bytes[..len]);
    frame
}

/// Reassembles a byte stream into fixed-size frames.
#[derive(Debug)]
pub struct FrameAssembler {
    frame_size: usize,
    pending: Vec<u8>,
}

impl FrameAssembler {
    pub fn new(frame_size: usize) -> Self {
        assert!(frame_size > 0, "frame size must be non-zero");
        FrameAssembler {
            frame_size,
            pending: Vec::with_capacity(frame_size),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Feed raw bytes, returning every frame completed by them, in arrival order.
    pub fn push(&mut self, mut bytes: &[u8]) -> Vec<Box<[u8]>> {
        let mut frames = Vec::new();

        while !bytes.is_empty() {
            let want = self.frame_size - self.pending.len();
            let take = want.min(bytes.len());
            self.pending.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];

            if self.pending.len() == self.frame_size {
                let frame = std::mem::replace(&mut self.pending, Vec::with_capacity(self.frame_size));
                frames.push(frame.into_boxed_slice());
            }
        }

        frames
    }

    /// Bytes buffered towards an incomplete frame.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
