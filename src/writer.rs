//! Dedicated writer task for outbound messages.
//!
//! Each open socket gets one writer task that owns the socket's sink and
//! receives messages via an unbounded mpsc channel, so queuing a message
//! never blocks the connection task or a fire-and-forget caller.
//!
//! # Architecture
//!
//! ```text
//! Connection task ─► mpsc::UnboundedSender<Bytes> ─► Writer Task ─► Socket sink
//! ```
//!
//! Messages that are already queued when the task wakes up are fed to the
//! sink together and flushed once. Dropping every [`WriterHandle`] ends the
//! task, which then closes the sink.

use bytes::Bytes;
use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::transport::SocketSink;

/// Maximum messages fed to the sink before a flush.
const MAX_BATCH_SIZE: usize = 64;

/// Handle for queuing messages on the writer task.
#[derive(Debug, Clone)]
pub struct WriterHandle {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl WriterHandle {
    /// Queue a message.
    ///
    /// Fails with [`Error::ConnectionClosed`] once the writer task has
    /// stopped (the socket failed or was closed).
    pub fn send(&self, message: Bytes) -> Result<()> {
        self.tx.send(message).map_err(|_| Error::ConnectionClosed)
    }
}

/// Spawn the writer task and return a handle for sending messages.
pub fn spawn_writer_task(sink: SocketSink) -> (WriterHandle, JoinHandle<Result<()>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(writer_loop(rx, sink));
    (WriterHandle { tx }, task)
}

/// Main writer loop - receives messages and writes them to the socket.
async fn writer_loop(mut rx: mpsc::UnboundedReceiver<Bytes>, mut sink: SocketSink) -> Result<()> {
    let mut batch = Vec::with_capacity(MAX_BATCH_SIZE);

    loop {
        let first = match rx.recv().await {
            Some(message) => message,
            None => {
                // All handles dropped, clean shutdown
                let _ = sink.close().await;
                return Ok(());
            }
        };

        batch.push(first);
        while batch.len() < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(message) => batch.push(message),
                Err(_) => break,
            }
        }

        let result = write_batch(&mut sink, &mut batch).await;
        if let Err(e) = result {
            tracing::warn!("Writer stopped: {}", e);
            return Err(e);
        }
    }
}

async fn write_batch(sink: &mut SocketSink, batch: &mut Vec<Bytes>) -> Result<()> {
    for message in batch.drain(..) {
        sink.feed(message).await?;
    }
    sink.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::sink;

    fn channel_sink() -> (SocketSink, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = sink::unfold(tx, |tx, message: Bytes| async move {
            tx.send(message).map_err(|_| Error::ConnectionClosed)?;
            Ok::<_, Error>(tx)
        });
        (Box::pin(sink), rx)
    }

    #[tokio::test]
    async fn test_messages_arrive_in_order() {
        let (sink, mut out) = channel_sink();
        let (handle, _task) = spawn_writer_task(sink);

        for i in 0..100u32 {
            handle.send(Bytes::copy_from_slice(&i.to_le_bytes())).unwrap();
        }
        for i in 0..100u32 {
            assert_eq!(out.recv().await.unwrap(), Bytes::copy_from_slice(&i.to_le_bytes()));
        }
    }

    #[tokio::test]
    async fn test_shutdown_on_handle_drop() {
        let (sink, _out) = channel_sink();
        let (handle, task) = spawn_writer_task(sink);
        drop(handle);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_sink_failure_stops_writer() {
        let failing = sink::unfold((), |_, _message: Bytes| async {
            Err::<(), _>(Error::ConnectionClosed)
        });
        let (handle, task) = spawn_writer_task(Box::pin(failing));

        handle.send(Bytes::from_static(b"x")).unwrap();
        assert!(task.await.unwrap().is_err());
        assert!(matches!(
            handle.send(Bytes::from_static(b"y")),
            Err(Error::ConnectionClosed)
        ));
    }
}
