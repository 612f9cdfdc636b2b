//! Uplink link configuration.

use serde::Deserialize;
use std::time::Duration;

/// The server this daemon connects to.
#[derive(Debug, Clone, Deserialize)]
pub struct UplinkBlock {
    /// Remote server name (e.g., "hub.straylight.net").
    pub name: String,
    /// Remote server IP/hostname to connect to.
    pub hostname: String,
    /// Remote server port.
    pub port: u16,
    /// Password we send in PASS.
    pub send_password: String,
    /// Password we expect back. Defaults to `send_password`.
    #[serde(default)]
    pub receive_password: Option<String>,
    /// Seconds allowed for the TCP connect (default: 10).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
    /// Seconds between keepalive PINGs (default: 30).
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    /// Seconds of silence before the link is declared dead (default: 90).
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
    /// Seconds to wait before reconnecting (default: 10).
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: u64,
}

impl UplinkBlock {
    /// Password the uplink must present.
    pub fn receive_password(&self) -> &str {
        self.receive_password
            .as_deref()
            .unwrap_or(&self.send_password)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay)
    }

    /// `host:port` for connecting.
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_ping_interval() -> u64 {
    30
}

fn default_ping_timeout() -> u64 {
    90
}

fn default_reconnect_delay() -> u64 {
    10
}
