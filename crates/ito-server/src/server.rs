//! `ItoServer` builder and accept loop.
//!
//! Ties the layers together: transport → handler → room actor → session.

use std::net::SocketAddr;
use std::time::Duration;

use ito_protocol::JsonCodec;
use ito_session::{Session, SessionSettings};
use ito_transport::{Transport, WebSocketTransport};

use crate::ServerError;
use crate::config::ServerConfig;
use crate::handler::handle_connection;
use crate::room::{ROOM_CHANNEL_SIZE, RoomHandle, spawn_room};

/// Builder for configuring and starting an Ito server.
///
/// # Example
///
/// ```rust,no_run
/// use ito_server::ItoServer;
///
/// # async fn start() -> Result<(), ito_server::ServerError> {
/// let server = ItoServer::builder()
///     .bind("0.0.0.0:3000")
///     .reset_secret("letmein")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ItoServerBuilder {
    config: ServerConfig,
    seed: Option<u64>,
}

impl ItoServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Closes connections that send nothing for this long.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    pub fn settings(mut self, settings: SessionSettings) -> Self {
        self.config.settings = settings;
        self
    }

    pub fn reset_secret(mut self, secret: &str) -> Self {
        self.config.settings.reset_secret = secret.to_string();
        self
    }

    /// Seeds the session's random source, for reproducible deals.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Binds the listener and starts the room actor.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<ItoServer, ServerError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;

        let settings = self.config.settings;
        let session = match self.seed {
            Some(seed) => Session::with_seed(settings, seed),
            None => Session::new(settings),
        };
        let room = spawn_room(session, ROOM_CHANNEL_SIZE);

        Ok(ItoServer {
            transport,
            room,
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout,
        })
    }
}

/// A running Ito server hosting one session.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ItoServer {
    transport: WebSocketTransport,
    room: RoomHandle,
    codec: JsonCodec,
    idle_timeout: Duration,
}

impl ItoServer {
    /// Creates a new builder.
    pub fn builder() -> ItoServerBuilder {
        ItoServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.transport.local_addr()?)
    }

    /// Handle to the room actor.
    pub fn room(&self) -> RoomHandle {
        self.room.clone()
    }

    /// Runs the accept loop until the process is terminated.
    ///
    /// A failed accept (bad handshake, reset socket) is logged and the
    /// loop carries on.
    pub async fn run(mut self) -> Result<(), ServerError> {
        tracing::info!("Ito server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let room = self.room.clone();
                    let codec = self.codec;
                    let idle_timeout = self.idle_timeout;
                    tokio::spawn(async move {
                        if let Err(e) =
                            handle_connection(conn, room, codec, idle_timeout).await
                        {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
