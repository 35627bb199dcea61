//! Connection task: socket ownership, lifecycle state machine, reconnection.
//!
//! One task per [`Transport`] owns the socket, the pending-call table, the
//! connect timeout and the retry timer. Everything else reaches it through
//! [`Command`]s, so the state is only ever touched from this task and no
//! lock is needed.
//!
//! ```text
//!                 connect()
//! Disconnected ──────────────► Connecting ──open──► Validating ──ok──► Connected
//!      ▲                          ▲  │                 │    │              │
//!      │ disconnect()             │  │ error/timeout   │    │ rejected     │ close/error
//!      │                          │  ▼                 ▼    ▼              ▼
//!      └──────────────────── Error(connection) ◄───────┘  Error(compatibility|stream)
//!                              │  retry after delay
//!                              └─► Connecting
//! ```
//!
//! Retry budget: a failure with zero retries left is final and fails every
//! `connect()` waiter; otherwise a positive budget is decremented and a
//! reconnect is scheduled after `retry_delay`. A negative budget never runs
//! out. Reaching `Connected` restores the configured budget.

use std::future::{pending, Future};
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{sleep, Sleep};

use super::socket::{BoxFuture, Connector, Socket, SocketStream};
use super::state::{ConnectionState, ErrorKind, Rejection, SessionValidator};
use super::Transport;
use crate::calls::{PendingCalls, Resolution, ResponseSender};
use crate::config::ConnectionSettings;
use crate::error::{Error, Result};
use crate::protocol::{decode_camera_pose, CallId, Frame, FrameSink, Inbound, Request};
use crate::writer::{spawn_writer_task, WriterHandle};

/// Requests handled by the connection task.
pub(crate) enum Command {
    Connect {
        settings: ConnectionSettings,
        reply: oneshot::Sender<Result<()>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
    Send {
        request: Request,
        reply: Option<ResponseSender>,
    },
}

pub(crate) struct Connection {
    commands: mpsc::UnboundedReceiver<Command>,
    /// Used to hand validators a [`Transport`] without keeping the task alive.
    weak_commands: mpsc::WeakUnboundedSender<Command>,
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<ConnectionState>,

    connector: Arc<dyn Connector>,
    validator: Arc<dyn SessionValidator>,
    sink: Arc<dyn FrameSink>,

    settings: Option<ConnectionSettings>,
    retries_left: i32,
    waiters: Vec<oneshot::Sender<Result<()>>>,
    calls: PendingCalls,

    writer: Option<WriterHandle>,
    stream: Option<SocketStream>,
    opening: Option<BoxFuture<'static, Result<Socket>>>,
    validating: Option<BoxFuture<'static, std::result::Result<(), Rejection>>>,
    deadline: Option<Pin<Box<Sleep>>>,
    retry: Option<Pin<Box<Sleep>>>,
}

impl Connection {
    pub(crate) fn new(
        commands: mpsc::UnboundedReceiver<Command>,
        weak_commands: mpsc::WeakUnboundedSender<Command>,
        state: watch::Sender<ConnectionState>,
        events: broadcast::Sender<ConnectionState>,
        connector: Arc<dyn Connector>,
        validator: Arc<dyn SessionValidator>,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        Self {
            commands,
            weak_commands,
            state,
            events,
            connector,
            validator,
            sink,
            settings: None,
            retries_left: 0,
            waiters: Vec::new(),
            calls: PendingCalls::new(),
            writer: None,
            stream: None,
            opening: None,
            validating: None,
            deadline: None,
            retry: None,
        }
    }

    /// Run until every [`Transport`] handle is dropped.
    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        self.disconnect();
                        return;
                    }
                },
                opened = poll_slot(&mut self.opening) => {
                    self.opening = None;
                    self.on_opened(opened);
                }
                verdict = poll_slot(&mut self.validating) => {
                    self.validating = None;
                    self.on_validated(verdict);
                }
                message = next_message(&mut self.stream) => self.on_message(message),
                _ = poll_slot(&mut self.deadline) => {
                    self.deadline = None;
                    tracing::warn!("Timed out establishing session with {}", self.address());
                    self.on_failure();
                }
                _ = poll_slot(&mut self.retry) => {
                    self.retry = None;
                    self.start_attempt();
                }
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { settings, reply } => self.connect(settings, reply),
            Command::Disconnect { reply } => {
                self.disconnect();
                let _ = reply.send(());
            }
            Command::Send { request, reply } => self.send(request, reply),
        }
    }

    fn connect(&mut self, settings: ConnectionSettings, reply: oneshot::Sender<Result<()>>) {
        let same_address = self
            .settings
            .as_ref()
            .is_some_and(|current| current.address == settings.address);

        if same_address {
            let state = self.state.borrow().clone();
            match state {
                ConnectionState::Connected => {
                    let _ = reply.send(Ok(()));
                    return;
                }
                ConnectionState::Connecting | ConnectionState::Validating => {
                    self.waiters.push(reply);
                    return;
                }
                ConnectionState::Error {
                    kind: ErrorKind::Connection,
                    ..
                } if self.retry.is_some() => {
                    self.waiters.push(reply);
                    return;
                }
                _ => {}
            }
        }

        // A new target supersedes whatever was in progress.
        self.cancel_timers();
        self.teardown_socket();
        self.resolve_waiters(|| Err(Error::ConnectionClosed));

        self.retries_left = settings.retries;
        self.settings = Some(settings);
        self.waiters.push(reply);
        self.start_attempt();
    }

    fn start_attempt(&mut self) {
        let Some(settings) = self.settings.as_ref() else {
            return;
        };
        let address = settings.address.clone();
        let timeout = settings.timeout;

        self.teardown_socket();
        self.set_state(ConnectionState::Connecting);
        tracing::debug!("Connecting to {}", address);
        self.opening = Some(self.connector.connect(&address));
        self.deadline = Some(Box::pin(sleep(timeout)));
    }

    fn on_opened(&mut self, opened: Result<Socket>) {
        let socket = match opened {
            Ok(socket) => socket,
            Err(e) => {
                tracing::warn!("Could not open socket to {}: {}", self.address(), e);
                self.on_failure();
                return;
            }
        };

        let (writer, _task) = spawn_writer_task(socket.sink);
        self.writer = Some(writer);
        self.stream = Some(socket.stream);
        self.set_state(ConnectionState::Validating);

        if let Some(commands) = self.weak_commands.upgrade() {
            let transport = Transport::from_parts(commands, self.state.subscribe(), self.events.clone());
            self.validating = Some(self.validator.validate(transport));
        }
    }

    fn on_validated(&mut self, verdict: std::result::Result<(), Rejection>) {
        self.deadline = None;
        match verdict {
            Ok(()) => {
                if let Some(settings) = self.settings.as_ref() {
                    self.retries_left = settings.retries;
                }
                self.set_state(ConnectionState::Connected);
                tracing::debug!("Session with {} established", self.address());
                self.resolve_waiters(|| Ok(()));
            }
            Err(rejection) => {
                self.teardown_socket();
                let (kind, detail) = match rejection {
                    Rejection::Compatibility(detail) => (ErrorKind::Compatibility, detail),
                    Rejection::Stream(detail) => (ErrorKind::Stream, detail),
                };
                tracing::error!("Session with {} rejected: {}", self.address(), detail);
                self.set_state(ConnectionState::error(kind, detail.clone()));
                self.resolve_waiters(|| match kind {
                    ErrorKind::Compatibility => Err(Error::Compatibility(detail.clone())),
                    _ => Err(Error::Stream(detail.clone())),
                });
            }
        }
    }

    fn on_message(&mut self, message: Option<Result<Bytes>>) {
        match message {
            Some(Ok(bytes)) => match Frame::parse(bytes) {
                Ok(frame) => self.dispatch(Inbound::classify(frame)),
                Err(e) => tracing::warn!("Dropping malformed message: {}", e),
            },
            Some(Err(e)) => {
                tracing::warn!("Socket to {} failed: {}", self.address(), e);
                self.on_failure();
            }
            None => {
                tracing::warn!("Socket to {} closed", self.address());
                self.on_failure();
            }
        }
    }

    fn dispatch(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Disconnect => {
                tracing::info!("Remote {} ended the session", self.address());
                self.disconnect();
            }
            Inbound::CallResponse(payload) => match self.calls.resolve(payload) {
                Resolution::Delivered(_) => {}
                Resolution::Abandoned(id) => {
                    tracing::debug!("Caller stopped waiting for call {}", id)
                }
                Resolution::Unmatched(id) => {
                    tracing::debug!("Discarding response for unknown call {}", id)
                }
                Resolution::Malformed => tracing::warn!("Call response too short for a call id"),
            },
            Inbound::CameraPose(payload) => match decode_camera_pose(&payload) {
                Ok(pose) => self.sink.on_camera_pose(pose),
                Err(e) => tracing::warn!("Undecodable camera pose: {}", e),
            },
            Inbound::Video(frame) => self.sink.on_video_frame(frame),
            Inbound::Ignored(tag) => tracing::trace!("Ignoring frame kind {}", tag),
        }
    }

    fn send(&mut self, request: Request, reply: Option<ResponseSender>) {
        let writer = match &self.writer {
            Some(writer) if self.state.borrow().accepts_sends() => writer.clone(),
            _ => {
                tracing::warn!(
                    "Dropping {} while {}",
                    request.command(),
                    *self.state.borrow()
                );
                if let Some(reply) = reply {
                    let _ = reply.send(Err(Error::NotConnected));
                }
                return;
            }
        };

        let id = match reply {
            Some(reply) => self.calls.register(reply),
            None => CallId::FireAndForget,
        };
        let command = request.command();
        if let Err(e) = writer.send(request.finish(id)) {
            tracing::warn!("Could not queue {}: {}", command, e);
            if let Some(reply) = self.calls.forget(id) {
                let _ = reply.send(Err(Error::ConnectionClosed));
            }
        }
    }

    /// Socket error, close or timeout: fall into `Error(connection)` and
    /// either schedule a reconnect or give up, per the retry budget.
    fn on_failure(&mut self) {
        self.cancel_timers();
        self.teardown_socket();

        let address = self.address().to_string();
        self.set_state(ConnectionState::error(ErrorKind::Connection, address.clone()));

        if self.retries_left == 0 {
            tracing::error!("Giving up on {}", address);
            self.resolve_waiters(|| {
                Err(Error::ConnectionFailed {
                    address: address.clone(),
                })
            });
            return;
        }
        if self.retries_left > 0 {
            self.retries_left -= 1;
        }
        let delay = self
            .settings
            .as_ref()
            .map(|settings| settings.retry_delay)
            .unwrap_or_default();
        tracing::debug!(
            "Reconnecting to {} in {:?} ({} retries left)",
            address,
            delay,
            self.retries_left
        );
        self.retry = Some(Box::pin(sleep(delay)));
    }

    /// Stop everything; no automatic reconnect follows.
    fn disconnect(&mut self) {
        self.cancel_timers();
        self.teardown_socket();
        self.resolve_waiters(|| Err(Error::ConnectionClosed));
        self.set_state(ConnectionState::Disconnected);
    }

    /// Close the current socket, if any, and fail every pending call.
    fn teardown_socket(&mut self) {
        self.opening = None;
        self.validating = None;
        self.stream = None;
        // Dropping the last handle makes the writer task close the sink.
        self.writer = None;

        let failed = self.calls.fail_all();
        if failed > 0 {
            tracing::debug!("Failed {} pending calls on teardown", failed);
        }
    }

    fn cancel_timers(&mut self) {
        self.deadline = None;
        self.retry = None;
    }

    fn resolve_waiters(&mut self, outcome: impl Fn() -> Result<()>) {
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(outcome());
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        tracing::debug!("Connection state: {}", state);
        self.state.send_replace(state.clone());
        let _ = self.events.send(state);
    }

    fn address(&self) -> &str {
        self.settings
            .as_ref()
            .map(|settings| settings.address.as_str())
            .unwrap_or("<none>")
    }
}

/// Await an optional future; pend forever while the slot is empty.
async fn poll_slot<F: Future + Unpin>(slot: &mut Option<F>) -> F::Output {
    match slot {
        Some(future) => future.await,
        None => pending().await,
    }
}

async fn next_message(stream: &mut Option<SocketStream>) -> Option<Result<Bytes>> {
    match stream {
        Some(stream) => stream.next().await,
        None => pending().await,
    }
}
