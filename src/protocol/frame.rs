//! Inbound frame with typed accessors.
//!
//! Each WebSocket binary message is exactly one frame: a 16-byte header
//! followed by the payload. Uses `bytes::Bytes` so the payload is a
//! zero-copy slice of the received message.
//!
//! # Example
//!
//! ```
//! use render_stream::protocol::{build_frame, Frame, FrameHeader, FrameKind};
//!
//! let header = FrameHeader::new(0, 0, FrameKind::CallResponse, 5);
//! let message = build_frame(&header, b"hello");
//! let frame = Frame::parse(message.into()).unwrap();
//!
//! assert_eq!(frame.kind(), FrameKind::CallResponse);
//! assert_eq!(frame.payload(), b"hello");
//! ```

use bytes::Bytes;

use super::wire_format::{FrameHeader, FrameKind, HEADER_SIZE};
use crate::error::{Error, Result};

/// A complete inbound frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Decoded header.
    pub header: FrameHeader,
    /// Payload bytes, exactly `header.payload_length` long.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from header and payload.
    pub fn new(header: FrameHeader, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Split a received message into header and payload.
    ///
    /// Bytes after the stated payload length are ignored.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the message is shorter than a header or
    /// the stated payload length is negative or larger than what arrived.
    pub fn parse(message: Bytes) -> Result<Self> {
        let header = FrameHeader::decode(&message).ok_or_else(|| {
            Error::Protocol(format!(
                "Message of {} bytes is shorter than the {}-byte header",
                message.len(),
                HEADER_SIZE
            ))
        })?;
        let length = header.validate(message.len() - HEADER_SIZE)?;
        let payload = message.slice(HEADER_SIZE..HEADER_SIZE + length);
        Ok(Self { header, payload })
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the frame kind.
    #[inline]
    pub fn kind(&self) -> FrameKind {
        self.header.kind
    }

    /// Get the server timestamp.
    #[inline]
    pub fn timestamp(&self) -> i32 {
        self.header.timestamp
    }

    /// Get the frame duration.
    #[inline]
    pub fn duration(&self) -> i32 {
        self.header.duration
    }
}

/// Build a complete inbound message as a single byte vector.
///
/// The client never sends framed messages; this is used to emulate a
/// server in tests and tools.
pub fn build_frame(header: &FrameHeader, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(payload);
    buf
}
