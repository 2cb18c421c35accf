//! # Ito server
//!
//! Hosts one Ito session over WebSocket. A single room actor owns the
//! [`Session`](ito_session::Session); every connection gets a handler
//! task that decodes JSON envelopes and relays them to the room.
//!
//! ```text
//! Transport (WebSocket) → Handler (per connection) → Room actor → Session
//!                                   ↑                     │
//!                                   └──── events ─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ito_server::prelude::*;
//!
//! # async fn start() -> Result<(), ServerError> {
//! let server = ItoServer::builder()
//!     .config(ServerConfig::from_env()?)
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod room;
mod server;

pub use config::{DEFAULT_PORT, ServerConfig};
pub use error::ServerError;
pub use room::{EventSender, ROOM_CHANNEL_SIZE, RoomHandle, RoomSnapshot, spawn_room};
pub use server::{ItoServer, ItoServerBuilder};

/// Everything a server binary or test needs in one import.
pub mod prelude {
    pub use crate::{
        ItoServer, ItoServerBuilder, RoomHandle, RoomSnapshot, ServerConfig,
        ServerError,
    };
    pub use ito_protocol::{
        ClientAction, ClientEnvelope, Mode, ParticipantId, ServerEnvelope,
        ServerEvent, Status,
    };
    pub use ito_session::{SessionSettings, TimerSlot};
}
