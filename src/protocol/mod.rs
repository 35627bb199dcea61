//! Protocol module - wire format, framing, and frame routing.
//!
//! This module implements the binary protocol spoken over the socket:
//! - 16-byte inbound header encoding/decoding
//! - Frame struct splitting a message into header and payload
//! - Outbound command layout with the call id appended last
//! - Classification of inbound frames by kind

mod demux;
mod frame;
mod request;
mod wire_format;

pub use demux::{decode_camera_pose, CameraPose, FrameSink, Inbound, NullSink, VideoFrame};
pub use frame::{build_frame, Frame};
pub use request::{CallId, Request};
pub use wire_format::{kinds, FrameHeader, FrameKind, FIRE_AND_FORGET_ID, HEADER_SIZE};
