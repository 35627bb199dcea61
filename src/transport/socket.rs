//! Socket abstraction and the WebSocket implementation.
//!
//! The connection task never touches a concrete socket type; it asks a
//! [`Connector`] for a [`Socket`], which is a boxed sink of outbound
//! messages and a boxed stream of inbound ones. Each item is one whole
//! binary message.

use std::future::{self, Future};
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{Error, Result};

/// Boxed future used at trait seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outbound half of a socket.
pub type SocketSink = Pin<Box<dyn Sink<Bytes, Error = Error> + Send>>;

/// Inbound half of a socket. The stream ends (or yields an error) when the
/// socket closes.
pub type SocketStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// An open socket.
pub struct Socket {
    pub sink: SocketSink,
    pub stream: SocketStream,
}

impl Socket {
    pub fn new(sink: SocketSink, stream: SocketStream) -> Self {
        Self { sink, stream }
    }
}

/// Opens sockets to an address.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, address: &str) -> BoxFuture<'static, Result<Socket>>;
}

/// Connector for `ws://` and `wss://` addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn connect(&self, address: &str) -> BoxFuture<'static, Result<Socket>> {
        let address = address.to_string();
        Box::pin(async move {
            let (ws_stream, _response) = connect_async(address.as_str()).await?;
            let (write, read) = ws_stream.split();

            let sink = write
                .sink_map_err(Error::from)
                .with(|bytes: Bytes| future::ready(Ok::<_, Error>(Message::Binary(bytes.to_vec()))));

            let stream = read.filter_map(|message| {
                future::ready(match message {
                    Ok(Message::Binary(data)) => Some(Ok(Bytes::from(data))),
                    Ok(Message::Close(_)) => Some(Err(Error::ConnectionClosed)),
                    // Text, ping and pong carry nothing for us.
                    Ok(_) => None,
                    Err(e) => Some(Err(Error::from(e))),
                })
            });

            Ok(Socket::new(Box::pin(sink), Box::pin(stream)))
        })
    }
}
