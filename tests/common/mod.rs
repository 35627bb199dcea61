//! In-memory render server used to drive the real client in tests.
//!
//! [`FakeConnector`] hands the client one end of a pair of channels per
//! connection attempt and the test the other end as a [`ServerSession`].

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures_util::{sink, stream};
use tokio::sync::mpsc;

use render_stream::api::Version;
use render_stream::codec::{Encode, WireBuffer};
use render_stream::protocol::{
    build_frame, CameraPose, FrameHeader, FrameKind, FrameSink, VideoFrame, FIRE_AND_FORGET_ID,
};
use render_stream::transport::{BoxFuture, Connector, Socket};
use render_stream::{Error, Result};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// How the fake server answers connection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Accept,
    Refuse,
    /// Never answer; the attempt only ends by timing out.
    Hang,
}

struct Shared {
    attempts: AtomicUsize,
    mode: Mutex<Mode>,
    sessions: mpsc::UnboundedSender<ServerSession>,
}

#[derive(Clone)]
pub struct FakeConnector {
    shared: Arc<Shared>,
}

impl FakeConnector {
    pub fn new(mode: Mode) -> (Self, mpsc::UnboundedReceiver<ServerSession>) {
        let (sessions, accepted) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            attempts: AtomicUsize::new(0),
            mode: Mutex::new(mode),
            sessions,
        });
        (Self { shared }, accepted)
    }

    pub fn attempts(&self) -> usize {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.shared.mode.lock().unwrap() = mode;
    }
}

impl Connector for FakeConnector {
    fn connect(&self, _address: &str) -> BoxFuture<'static, Result<Socket>> {
        self.shared.attempts.fetch_add(1, Ordering::SeqCst);
        let mode = *self.shared.mode.lock().unwrap();
        let sessions = self.shared.sessions.clone();

        Box::pin(async move {
            match mode {
                Mode::Refuse => {
                    return Err(Error::Io(io::Error::new(
                        io::ErrorKind::ConnectionRefused,
                        "refused",
                    )))
                }
                Mode::Hang => std::future::pending::<()>().await,
                Mode::Accept => {}
            }

            let (to_server, from_client) = mpsc::unbounded_channel::<Bytes>();
            let (to_client, from_server) = mpsc::unbounded_channel::<Result<Bytes>>();

            let sink = sink::unfold(to_server, |tx, message: Bytes| async move {
                tx.send(message).map_err(|_| Error::ConnectionClosed)?;
                Ok::<_, Error>(tx)
            });
            let stream = stream::unfold(from_server, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            });

            let _ = sessions.send(ServerSession {
                inbound: from_client,
                outbound: to_client,
            });
            Ok(Socket::new(Box::pin(sink), Box::pin(stream)))
        })
    }
}

/// A command message as received by the server.
#[derive(Debug)]
pub struct Call {
    pub command: String,
    /// Arguments, positioned after the command name.
    pub args: WireBuffer,
    pub id: u32,
}

impl Call {
    pub fn is_fire_and_forget(&self) -> bool {
        self.id == FIRE_AND_FORGET_ID
    }
}

fn decode_call(message: &[u8]) -> Call {
    let (body, id) = message.split_at(message.len() - 4);
    let id = u32::from_le_bytes(id.try_into().unwrap());
    let mut args = WireBuffer::from_bytes(body);
    let command: String = args.read().unwrap();
    Call { command, args, id }
}

/// Server end of one accepted connection. Dropping it closes the socket.
pub struct ServerSession {
    inbound: mpsc::UnboundedReceiver<Bytes>,
    outbound: mpsc::UnboundedSender<Result<Bytes>>,
}

impl ServerSession {
    /// Next message sent by the client.
    pub async fn next_call(&mut self) -> Call {
        let message = self.inbound.recv().await.expect("client closed the socket");
        decode_call(&message)
    }

    /// Next message, asserting its command name.
    pub async fn expect(&mut self, command: &str) -> Call {
        let call = self.next_call().await;
        assert_eq!(call.command, command, "unexpected command");
        call
    }

    pub fn try_next_call(&mut self) -> Option<Call> {
        self.inbound.try_recv().ok().map(|m| decode_call(&m))
    }

    pub fn respond<T: Encode + ?Sized>(&self, id: u32, value: &T) {
        self.respond_with(id, |buf| {
            buf.write(value);
        });
    }

    pub fn respond_with(&self, id: u32, build: impl FnOnce(&mut WireBuffer)) {
        let mut payload = WireBuffer::new();
        payload.write(&id);
        build(&mut payload);
        self.push(FrameKind::CallResponse, payload.as_slice());
    }

    pub fn push(&self, kind: FrameKind, payload: &[u8]) {
        let header = FrameHeader::new(0, 0, kind, payload.len() as i32);
        self.push_raw(build_frame(&header, payload));
    }

    pub fn push_raw(&self, message: Vec<u8>) {
        let _ = self.outbound.send(Ok(Bytes::from(message)));
    }

    /// Answer the version query of a validating client.
    pub async fn accept_version(&mut self, version: Version) {
        let call = self.expect("getVersion").await;
        self.respond_with(call.id, |buf| {
            buf.write(&version.major)
                .write(&version.minor)
                .write(&version.patch);
        });
    }
}

/// Something a [`RecordingSink`] saw.
#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Video(VideoFrame),
    Pose(CameraPose),
}

pub struct RecordingSink {
    seen: mpsc::UnboundedSender<Seen>,
}

impl RecordingSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Seen>) {
        let (seen, rx) = mpsc::unbounded_channel();
        (Self { seen }, rx)
    }
}

impl FrameSink for RecordingSink {
    fn on_video_frame(&self, frame: VideoFrame) {
        let _ = self.seen.send(Seen::Video(frame));
    }

    fn on_camera_pose(&self, pose: CameraPose) {
        let _ = self.seen.send(Seen::Pose(pose));
    }
}
