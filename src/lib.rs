//! # render-stream
//!
//! Client for a remote 3D renderer that streams video over a WebSocket.
//!
//! The application sends commands (camera moves, visibility, materials,
//! model loads) and receives encoded video frames, camera pose pushes and
//! call results on the same socket.
//!
//! ## Architecture
//!
//! ```text
//! Api (validate, batch) ─► Transport ─► connection task ─► writer task ─► socket
//!                                          │
//!                 socket ─► Frame ─► Inbound ─┬─► PendingCalls (call responses)
//!                                             └─► FrameSink (video, camera pose)
//! ```
//!
//! - **Codec**: little-endian encoding of arguments and return values
//! - **Protocol**: 16-byte frame header, frame classification, requests
//! - **Transport**: connection lifecycle with bounded reconnection
//! - **Api**: argument validation, clamping and batching
//! - **Load**: model load sessions polled to completion
//!
//! ## Example
//!
//! ```ignore
//! use render_stream::{ClientBuilder, ConnectionSettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClientBuilder::new()
//!         .settings(ConnectionSettings::from_json(r#"{"address": "ws://render:8080"}"#)?)
//!         .start()
//!         .await?;
//!
//!     let bounds = client.api().get_bounding_box(&[10, 11, 12]).await;
//!     println!("{:?}", bounds.center());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod calls;
pub mod codec;
pub mod config;
pub mod error;
pub mod load;
pub mod protocol;
pub mod transport;

mod client;
mod writer;

pub use api::{Api, Commands, MaterialCatalog, VersionGate, INVALID_HANDLE};
pub use client::{Client, ClientBuilder};
pub use config::{BatchConfig, ConnectionSettings, LoadConfig};
pub use error::{Error, Result};
pub use load::{LoadError, LoadErrorKind, LoadResult, LoadSession, LoadStatus};
pub use transport::{ConnectionState, ErrorKind, Transport};
