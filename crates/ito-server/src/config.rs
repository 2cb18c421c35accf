//! Server configuration.

use std::time::Duration;

use ito_session::SessionSettings;

use crate::ServerError;

/// Port used when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3000;

/// Everything needed to start a server.
///
/// Start from `Default` and override field by field, or read the
/// process environment with [`from_env`](Self::from_env).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// A connection that sends nothing for this long is closed.
    pub idle_timeout: Duration,
    pub settings: SessionSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: format!("0.0.0.0:{DEFAULT_PORT}"),
            idle_timeout: Duration::from_secs(60),
            settings: SessionSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Reads `PORT`, `ITO_BIND` and `ITO_RESET_SECRET`.
    ///
    /// `ITO_BIND` is a full address and wins over `PORT`.
    ///
    /// # Errors
    /// [`ServerError::Config`] if `PORT` is not a valid port number.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ServerError> {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| ServerError::Config(format!("PORT={port:?} is not a port")))?;
            config.bind_addr = format!("0.0.0.0:{port}");
        }
        if let Some(addr) = lookup("ITO_BIND").filter(|a| !a.trim().is_empty()) {
            config.bind_addr = addr.trim().to_string();
        }
        if let Some(secret) = lookup("ITO_RESET_SECRET").filter(|s| !s.is_empty()) {
            config.settings.reset_secret = secret;
        }
        Ok(config)
    }
}
