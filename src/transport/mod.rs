//! Transport module - socket ownership, connection lifecycle and calls.
//!
//! [`Transport`] is a cheap, cloneable handle to a connection task that
//! exclusively owns the socket. All access goes through
//! [`Transport::send_fire_and_forget`] and [`Transport::send_awaited`].
//!
//! # Example
//!
//! ```ignore
//! use render_stream::protocol::{NullSink, Request};
//! use render_stream::transport::{AcceptAll, Transport, WebSocketConnector};
//! use render_stream::ConnectionSettings;
//!
//! let transport = Transport::spawn(WebSocketConnector, AcceptAll, NullSink);
//! transport.connect(ConnectionSettings::new("ws://127.0.0.1:8080")).await?;
//!
//! let mut reply = transport.send_awaited(Request::new("getVersion")).await?;
//! let major: u32 = reply.read()?;
//! ```

mod connection;
mod socket;
mod state;

pub use socket::{BoxFuture, Connector, Socket, SocketSink, SocketStream, WebSocketConnector};
pub use state::{
    validator_fn, AcceptAll, ConnectionState, ErrorKind, FnValidator, Rejection, SessionValidator,
};

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::codec::WireBuffer;
use crate::config::ConnectionSettings;
use crate::error::{Error, Result};
use crate::protocol::{FrameSink, Request};
use connection::{Command, Connection};

/// Capacity of the state-change broadcast; slow observers lag, never block.
const STATE_EVENT_CAPACITY: usize = 64;

/// Handle to a connection task.
#[derive(Clone)]
pub struct Transport {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    events: broadcast::Sender<ConnectionState>,
}

impl Transport {
    /// Spawn a connection task in the `Disconnected` state.
    ///
    /// Must be called within a Tokio runtime. The task stops once every
    /// handle is dropped.
    pub fn spawn<C, V, S>(connector: C, validator: V, sink: S) -> Self
    where
        C: Connector,
        V: SessionValidator,
        S: FrameSink,
    {
        Self::spawn_shared(Arc::new(connector), Arc::new(validator), Arc::new(sink))
    }

    /// Like [`Transport::spawn`], with already shared collaborators.
    pub fn spawn_shared(
        connector: Arc<dyn Connector>,
        validator: Arc<dyn SessionValidator>,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (events_tx, _) = broadcast::channel(STATE_EVENT_CAPACITY);

        let connection = Connection::new(
            commands_rx,
            commands_tx.downgrade(),
            state_tx,
            events_tx.clone(),
            connector,
            validator,
            sink,
        );
        tokio::spawn(connection.run());

        Self::from_parts(commands_tx, state_rx, events_tx)
    }

    pub(crate) fn from_parts(
        commands: mpsc::UnboundedSender<Command>,
        state: watch::Receiver<ConnectionState>,
        events: broadcast::Sender<ConnectionState>,
    ) -> Self {
        Self {
            commands,
            state,
            events,
        }
    }

    /// Connect and validate a session.
    ///
    /// Resolves once the session is `Connected`, or fails once the retry
    /// budget is spent or the remote is rejected. Calling this again for the
    /// address already being connected joins the attempt in flight.
    pub async fn connect(&self, settings: ConnectionSettings) -> Result<()> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .send(Command::Connect { settings, reply })
            .map_err(|_| Error::ConnectionClosed)?;
        outcome.await.map_err(|_| Error::ConnectionClosed)?
    }

    /// Close the socket, fail pending calls and stay `Disconnected`.
    pub async fn disconnect(&self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(Command::Disconnect { reply }).is_ok() {
            let _ = done.await;
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Receiver that always holds the latest state.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionState> {
        self.events.subscribe()
    }

    /// Send a command without waiting for a response.
    ///
    /// Outside `Connected`/`Validating` the command is dropped with a warning.
    pub fn send_fire_and_forget(&self, request: Request) {
        let command = request.command();
        let sent = self.commands.send(Command::Send {
            request,
            reply: None,
        });
        if sent.is_err() {
            tracing::warn!("Dropping {}: transport stopped", command);
        }
    }

    /// Send a command and wait for its response.
    ///
    /// The returned buffer is positioned after the call id, at the return
    /// value. Fails with [`Error::NotConnected`] if the command could not be
    /// sent and with [`Error::ConnectionClosed`] if the connection dropped
    /// before the response arrived.
    pub async fn send_awaited(&self, request: Request) -> Result<WireBuffer> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Send {
                request,
                reply: Some(reply),
            })
            .map_err(|_| Error::ConnectionClosed)?;
        response.await.map_err(|_| Error::ConnectionClosed)?
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("state", &*self.state.borrow())
            .finish()
    }
}
