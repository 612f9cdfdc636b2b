//! Pseudo-client configuration.

use serde::Deserialize;

/// A services client (NickServ, ChanServ, ...) owned by the local server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceBlock {
    /// Nickname to claim on the network.
    pub nick: String,
    /// Ident.
    pub user: String,
    /// Hostname.
    pub host: String,
    /// Real name field.
    pub gecos: String,
    /// Channels joined (with op) right after the client is introduced.
    #[serde(default)]
    pub channels: Vec<String>,
}
