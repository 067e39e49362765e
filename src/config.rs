//! Viewer configuration from CLI flags with environment fallbacks.
//!
//! Every flag can also come from the environment (a `.env` file is loaded
//! first), so the viewer can be launched with just `WEBSOCKET_URL` set.

use std::time::Duration;

use clap::Parser;

use crate::poller::DEFAULT_POLL_INTERVAL;
use crate::socket::ReconnectPolicy;
use crate::status::Endpoint;

pub const DEFAULT_USERNAME: &str = "evan";

#[derive(Parser, Debug)]
#[command(name = "tabview", about = "Tabbed viewer for the chat, goal, and map WebSocket endpoints")]
pub struct Cli {
    /// Base address the `/chat`, `/goal`, and `/map` endpoints hang off.
    #[arg(long, env = "WEBSOCKET_URL")]
    pub ws_base_url: String,

    #[arg(long, env = "TABVIEW_USERNAME", default_value = DEFAULT_USERNAME)]
    pub username: String,

    #[arg(long, env = "TABVIEW_POLL_INTERVAL_MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Consecutive reconnect attempts per socket; 0 disables reconnect.
    #[arg(long, env = "TABVIEW_RECONNECT_ATTEMPTS", default_value_t = 0)]
    pub reconnect_attempts: u32,

    #[arg(long, env = "TABVIEW_RECONNECT_INTERVAL_MS", default_value_t = 1000)]
    pub reconnect_interval_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("websocket base URL is empty; pass --ws-base-url or set WEBSOCKET_URL")]
    MissingBaseUrl,
    #[error("websocket base URL must start with ws:// or wss://, got `{0}`")]
    InvalidScheme(String),
    #[error("{name} must be greater than zero")]
    ZeroDuration { name: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    pub base_url: String,
    pub username: String,
    pub poll_interval: Duration,
    pub reconnect: ReconnectPolicy,
}

impl ViewerConfig {
    /// Validate parsed flags into a typed config.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(&cli.ws_base_url)?;
        if cli.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration { name: "poll interval" });
        }
        if cli.reconnect_attempts > 0 && cli.reconnect_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration { name: "reconnect interval" });
        }
        Ok(Self {
            base_url,
            username: cli.username,
            poll_interval: Duration::from_millis(cli.poll_interval_ms),
            reconnect: ReconnectPolicy {
                attempts: cli.reconnect_attempts,
                interval: Duration::from_millis(cli.reconnect_interval_ms),
            },
        })
    }

    /// Config with defaults for everything but the base address.
    pub fn with_base_url(raw: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_base_url(raw)?,
            username: DEFAULT_USERNAME.to_owned(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            reconnect: ReconnectPolicy::disabled(),
        })
    }

    #[must_use]
    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }
}

/// Trim whitespace and trailing slashes; require a WebSocket scheme.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::MissingBaseUrl);
    }
    let lower = trimmed.to_ascii_lowercase();
    if !(lower.starts_with("ws://") || lower.starts_with("wss://")) {
        return Err(ConfigError::InvalidScheme(trimmed.to_owned()));
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
