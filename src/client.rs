//! Client builder and handle.
//!
//! The [`ClientBuilder`] collects the connection settings and the pluggable
//! pieces (socket connector, session validator, frame sink, material
//! catalog). [`ClientBuilder::build`] spawns the connection task; the
//! returned [`Client`] starts `Disconnected` until [`Client::connect`].
//!
//! # Example
//!
//! ```ignore
//! use render_stream::{Client, ConnectionSettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .settings(ConnectionSettings::new("ws://render-host:8080").retries(3))
//!         .start()
//!         .await?;
//!
//!     client.api().set_opacity(&[1, 2, 3], 0.5);
//!     let session = client.api().load_model("https://cdn.example.com/engine.glb");
//!     println!("{:?}", session.completion().await);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::api::{Api, MaterialCatalog, VersionGate};
use crate::config::{BatchConfig, ConnectionSettings, LoadConfig};
use crate::error::Result;
use crate::protocol::{FrameSink, NullSink};
use crate::transport::{
    ConnectionState, Connector, SessionValidator, Transport, WebSocketConnector,
};

/// Builder for configuring and creating a [`Client`].
pub struct ClientBuilder {
    settings: ConnectionSettings,
    connector: Arc<dyn Connector>,
    validator: Arc<dyn SessionValidator>,
    sink: Arc<dyn FrameSink>,
    catalog: MaterialCatalog,
    batch: BatchConfig,
    load: LoadConfig,
}

impl ClientBuilder {
    /// Create a builder with default settings.
    ///
    /// Defaults: WebSocket connector, [`VersionGate`] for the client's
    /// protocol version, frames discarded, built-in materials only.
    pub fn new() -> Self {
        Self {
            settings: ConnectionSettings::default(),
            connector: Arc::new(WebSocketConnector),
            validator: Arc::new(VersionGate::default()),
            sink: Arc::new(NullSink),
            catalog: MaterialCatalog::default(),
            batch: BatchConfig::default(),
            load: LoadConfig::default(),
        }
    }

    pub fn settings(mut self, settings: ConnectionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use a different socket implementation.
    pub fn connector<C: Connector>(mut self, connector: C) -> Self {
        self.connector = Arc::new(connector);
        self
    }

    /// Check each new session before it is `Connected`.
    pub fn validator<V: SessionValidator>(mut self, validator: V) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    /// Receive video frames and camera poses.
    pub fn frame_sink<S: FrameSink>(mut self, sink: S) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn material_catalog(mut self, catalog: MaterialCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Maximum elements per call for bulk operations.
    ///
    /// Default: 10 000
    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.batch.max_batch_size = size;
        self
    }

    /// Status poll interval of load sessions.
    ///
    /// Default: 100 ms
    pub fn poll_interval(mut self, interval: std::time::Duration) -> Self {
        self.load.poll_interval = interval;
        self
    }

    /// Spawn the connection task without connecting.
    ///
    /// Must be called within a Tokio runtime.
    pub fn build(self) -> Client {
        let transport = Transport::spawn_shared(self.connector, self.validator, self.sink);
        let api = Api::new(transport.clone(), Arc::new(self.catalog))
            .with_batch_config(self.batch)
            .with_load_config(self.load);

        Client {
            settings: self.settings,
            transport,
            api,
        }
    }

    /// Build and connect.
    ///
    /// Resolves once the session is `Connected`.
    pub async fn start(self) -> Result<Client> {
        let client = self.build();
        client.connect().await?;
        Ok(client)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A render-stream client.
///
/// Cloning is cheap; clones share the connection.
#[derive(Debug, Clone)]
pub struct Client {
    settings: ConnectionSettings,
    transport: Transport,
    api: Api,
}

impl Client {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Connect with the configured settings.
    pub async fn connect(&self) -> Result<()> {
        self.transport.connect(self.settings.clone()).await
    }

    /// Close the connection and fail pending calls.
    pub async fn disconnect(&self) {
        self.transport.disconnect().await
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.transport.watch_state()
    }

    /// Every state change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionState> {
        self.transport.subscribe()
    }

    /// The validated façade.
    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}
