//! Wire format encoding and decoding.
//!
//! Every inbound message starts with a 16-byte header:
//! ```text
//! ┌───────────┬──────────┬────────────┬────────────────┐
//! │ Timestamp │ Duration │ Frame kind │ Payload length │
//! │ 4 bytes   │ 4 bytes  │ 4 bytes    │ 4 bytes        │
//! │ int32 LE  │ int32 LE │ int32 LE   │ int32 LE       │
//! └───────────┴──────────┴────────────┴────────────────┘
//! ```
//!
//! All multi-byte integers are Little Endian.

use crate::error::{Error, Result};

/// Header size in bytes (fixed, exactly 16).
pub const HEADER_SIZE: usize = 16;

/// Call id appended to commands that expect no response.
pub const FIRE_AND_FORGET_ID: u32 = 0xFFFF_FFFF;

/// Frame kind tags.
pub mod kinds {
    /// Video key frame.
    pub const VIDEO_KEY_FRAME: i32 = 0;
    /// Video delta frame.
    pub const VIDEO_DELTA_FRAME: i32 = 1;
    /// Remote is about to close the session.
    pub const DISCONNECT: i32 = 2;
    /// Server-pushed camera pose.
    pub const CAMERA_POSE: i32 = 254;
    /// Response to an awaited call.
    pub const CALL_RESPONSE: i32 = 255;
}

/// Decoded frame kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    VideoKeyFrame,
    VideoDeltaFrame,
    Disconnect,
    CameraPose,
    CallResponse,
    /// A tag this client does not know; such frames are ignored.
    Other(i32),
}

impl FrameKind {
    pub fn from_tag(tag: i32) -> Self {
        match tag {
            kinds::VIDEO_KEY_FRAME => FrameKind::VideoKeyFrame,
            kinds::VIDEO_DELTA_FRAME => FrameKind::VideoDeltaFrame,
            kinds::DISCONNECT => FrameKind::Disconnect,
            kinds::CAMERA_POSE => FrameKind::CameraPose,
            kinds::CALL_RESPONSE => FrameKind::CallResponse,
            other => FrameKind::Other(other),
        }
    }

    pub fn tag(self) -> i32 {
        match self {
            FrameKind::VideoKeyFrame => kinds::VIDEO_KEY_FRAME,
            FrameKind::VideoDeltaFrame => kinds::VIDEO_DELTA_FRAME,
            FrameKind::Disconnect => kinds::DISCONNECT,
            FrameKind::CameraPose => kinds::CAMERA_POSE,
            FrameKind::CallResponse => kinds::CALL_RESPONSE,
            FrameKind::Other(tag) => tag,
        }
    }

    /// Check if this kind carries encoded video.
    #[inline]
    pub fn is_video(self) -> bool {
        matches!(self, FrameKind::VideoKeyFrame | FrameKind::VideoDeltaFrame)
    }
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Presentation timestamp set by the server.
    pub timestamp: i32,
    /// Frame duration set by the server.
    pub duration: i32,
    /// How the payload is interpreted.
    pub kind: FrameKind,
    /// Payload length in bytes as stated by the sender.
    pub payload_length: i32,
}

impl FrameHeader {
    /// Create a new header.
    pub fn new(timestamp: i32, duration: i32, kind: FrameKind, payload_length: i32) -> Self {
        Self {
            timestamp,
            duration,
            kind,
            payload_length,
        }
    }

    /// Encode header to bytes (Little Endian).
    ///
    /// # Example
    ///
    /// ```
    /// use render_stream::protocol::{FrameHeader, FrameKind};
    ///
    /// let header = FrameHeader::new(0, 0, FrameKind::CallResponse, 8);
    /// let bytes = header.encode();
    /// assert_eq!(bytes.len(), 16);
    /// assert_eq!(bytes[8], 255);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (16 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0..4].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[4..8].copy_from_slice(&self.duration.to_le_bytes());
        buf[8..12].copy_from_slice(&self.kind.tag().to_le_bytes());
        buf[12..16].copy_from_slice(&self.payload_length.to_le_bytes());
    }

    /// Decode header from bytes (Little Endian).
    ///
    /// Returns `None` if buffer is too short.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        let field = |at: usize| i32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
        Some(Self {
            timestamp: field(0),
            duration: field(4),
            kind: FrameKind::from_tag(field(8)),
            payload_length: field(12),
        })
    }

    /// Check that the stated payload fits in `available` bytes.
    pub fn validate(&self, available: usize) -> Result<usize> {
        let length = usize::try_from(self.payload_length).map_err(|_| {
            Error::Protocol(format!("Negative payload length {}", self.payload_length))
        })?;
        if length > available {
            return Err(Error::Protocol(format!(
                "Payload length {} exceeds {} bytes received",
                length, available
            )));
        }
        Ok(length)
    }
}
