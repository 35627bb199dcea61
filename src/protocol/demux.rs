//! Routing of inbound frames by kind.
//!
//! [`Inbound::classify`] turns a parsed [`Frame`] into what the connection
//! has to do with it. Video and camera pose frames go to a [`FrameSink`]
//! supplied by the application; call responses go to the correlation layer.

use bytes::Bytes;

use super::frame::Frame;
use super::wire_format::FrameKind;
use crate::codec::{Decode, Vec3, WireBuffer};
use crate::error::Result;

/// An encoded video frame, passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// True for key frames, false for delta frames.
    pub key_frame: bool,
    pub timestamp: i32,
    pub duration: i32,
    pub data: Bytes,
}

/// Camera pose pushed by the server when it moves the camera itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
}

impl Decode for CameraPose {
    fn decode(buf: &mut WireBuffer) -> Result<Self> {
        Ok(CameraPose {
            position: buf.read()?,
            target: buf.read()?,
        })
    }
}

/// Consumer of out-of-band frames.
///
/// Both methods default to doing nothing, so a sink only implements what it
/// cares about. They are called from the connection task and must not block.
pub trait FrameSink: Send + Sync + 'static {
    fn on_video_frame(&self, _frame: VideoFrame) {}

    fn on_camera_pose(&self, _pose: CameraPose) {}
}

/// Sink that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FrameSink for NullSink {}

/// What an inbound frame asks the connection to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Shut the session down cleanly.
    Disconnect,
    /// Resolve a pending call; payload starts with the call id.
    CallResponse(Bytes),
    /// Forward to the pose sink.
    CameraPose(Bytes),
    /// Forward to the video sink.
    Video(VideoFrame),
    /// Unknown kind, ignored.
    Ignored(i32),
}

impl Inbound {
    pub fn classify(frame: Frame) -> Self {
        match frame.header.kind {
            FrameKind::Disconnect => Inbound::Disconnect,
            FrameKind::CallResponse => Inbound::CallResponse(frame.payload),
            FrameKind::CameraPose => Inbound::CameraPose(frame.payload),
            kind @ (FrameKind::VideoKeyFrame | FrameKind::VideoDeltaFrame) => {
                Inbound::Video(VideoFrame {
                    key_frame: kind == FrameKind::VideoKeyFrame,
                    timestamp: frame.header.timestamp,
                    duration: frame.header.duration,
                    data: frame.payload,
                })
            }
            FrameKind::Other(tag) => Inbound::Ignored(tag),
        }
    }
}

/// Decode a pose payload.
pub fn decode_camera_pose(payload: &[u8]) -> Result<CameraPose> {
    WireBuffer::from_bytes(payload).read()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FrameHeader;

    fn frame(kind: FrameKind, payload: &'static [u8]) -> Frame {
        Frame::new(
            FrameHeader::new(5, 33, kind, payload.len() as i32),
            Bytes::from_static(payload),
        )
    }

    #[test]
    fn test_classify_control_frames() {
        assert_eq!(
            Inbound::classify(frame(FrameKind::Disconnect, b"")),
            Inbound::Disconnect
        );
        assert_eq!(
            Inbound::classify(frame(FrameKind::CallResponse, b"\x01\x00\x00\x00")),
            Inbound::CallResponse(Bytes::from_static(b"\x01\x00\x00\x00"))
        );
        assert_eq!(
            Inbound::classify(frame(FrameKind::Other(9), b"x")),
            Inbound::Ignored(9)
        );
    }

    #[test]
    fn test_classify_video_keeps_timing() {
        match Inbound::classify(frame(FrameKind::VideoDeltaFrame, b"slice")) {
            Inbound::Video(video) => {
                assert!(!video.key_frame);
                assert_eq!(video.timestamp, 5);
                assert_eq!(video.duration, 33);
                assert_eq!(&video.data[..], b"slice");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_camera_pose() {
        let mut buf = WireBuffer::new();
        buf.write(&Vec3::new(1.0, 2.0, 3.0)).write(&Vec3::ZERO);
        let pose = decode_camera_pose(buf.as_slice()).unwrap();
        assert_eq!(pose.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(pose.target, Vec3::ZERO);

        assert!(decode_camera_pose(&[0u8; 4]).is_err());
    }
}
