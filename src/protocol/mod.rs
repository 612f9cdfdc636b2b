//! Dialect Capability Descriptor.
//!
//! A [`Dialect`] is everything the dialect-agnostic core knows about one
//! server-to-server protocol: its [`Capabilities`] as plain data, the inbound
//! command tokens it registers into the [`DispatchTable`], and its outbound
//! operations. Exactly one dialect is active per process, chosen with
//! [`select`] at startup and shared read-only as an `Arc<dyn Dialect>`.
//!
//! Outbound operations write wire lines into an [`Outbox`]; the uplink
//! session flushes it once the current dispatch is done. An operation a
//! dialect does not implement logs a warning and sends nothing.

mod caps;
mod outbox;
pub mod p10;
pub mod ts6;

use std::sync::Arc;

use tracing::warn;

use crate::config::DialectKind;
use crate::error::DispatchError;
use crate::handlers::DispatchTable;
use crate::state::{Channel, Identity, User};

pub use caps::{Capabilities, STANDARD_STATUS_MODES, Status, StatusMode};
pub use outbox::Outbox;
pub use p10::P10;
pub use ts6::Ts6;

/// Log an outbound operation the active dialect cannot perform.
fn unsupported(caps: &Capabilities, operation: &'static str) {
    warn!(
        dialect = caps.name,
        operation, "Operation not supported by the active dialect"
    );
}

/// One server-to-server protocol.
pub trait Dialect: Send + Sync {
    /// Capability flags consulted by the State Store and merge engine.
    fn caps(&self) -> &Capabilities;

    /// The local server as this dialect announces it.
    fn identity(&self) -> &Identity;

    /// Register this dialect's inbound command tokens.
    fn register(&self, table: &mut DispatchTable) -> Result<(), DispatchError>;

    /// Registration lines sent right after connecting.
    fn login(&self, _out: &mut Outbox, _password: &str) {
        unsupported(self.caps(), "login");
    }

    fn introduce_user(&self, _out: &mut Outbox, _user: &User) {
        unsupported(self.caps(), "introduce_user");
    }

    fn quit(&self, _out: &mut Outbox, _user: &User, _reason: &str) {
        unsupported(self.caps(), "quit");
    }

    /// Join a local client with op. `is_new` is set when the join creates
    /// the channel on the network side.
    fn join(&self, _out: &mut Outbox, _channel: &Channel, _user: &User, _is_new: bool) {
        unsupported(self.caps(), "join");
    }

    fn part(&self, _out: &mut Outbox, _channel: &Channel, _user: &User) {
        unsupported(self.caps(), "part");
    }

    fn kick(
        &self,
        _out: &mut Outbox,
        _source: Option<&User>,
        _channel: &Channel,
        _target: &User,
        _reason: &str,
    ) {
        unsupported(self.caps(), "kick");
    }

    fn mode(&self, _out: &mut Outbox, _source: Option<&User>, _channel: &Channel, _modes: &str) {
        unsupported(self.caps(), "mode");
    }

    fn topic(&self, _out: &mut Outbox, _source: &User, _channel: &Channel, _text: &str, _ts: i64) {
        unsupported(self.caps(), "topic");
    }

    /// Kill by UID (or nick on UID-less dialects). `killer` of `None` means
    /// the local server.
    fn kill_id(&self, _out: &mut Outbox, _killer: Option<&User>, _target: &str, _reason: &str) {
        unsupported(self.caps(), "kill_id");
    }

    fn kline(
        &self,
        _out: &mut Outbox,
        _server: &str,
        _user: &str,
        _host: &str,
        _duration: u64,
        _reason: &str,
    ) {
        unsupported(self.caps(), "kline");
    }

    fn unkline(&self, _out: &mut Outbox, _server: &str, _user: &str, _host: &str) {
        unsupported(self.caps(), "unkline");
    }

    /// Ping the uplink (`None`) or a specific server.
    fn ping(&self, _out: &mut Outbox, _target: Option<&str>) {
        unsupported(self.caps(), "ping");
    }

    fn pong(&self, _out: &mut Outbox, _target: &str) {
        unsupported(self.caps(), "pong");
    }

    fn invite(&self, _out: &mut Outbox, _source: &User, _target: &User, _channel: &Channel) {
        unsupported(self.caps(), "invite");
    }

    fn wallops(&self, _out: &mut Outbox, _text: &str) {
        unsupported(self.caps(), "wallops");
    }

    /// Tell the network a local client holds op again after a TS reset or
    /// a deop.
    fn reop(&self, _out: &mut Outbox, _channel: &Channel, _user: &User) {
        unsupported(self.caps(), "reop");
    }

    /// Sent after our own burst. Most dialects have nothing to say.
    fn end_of_burst(&self, _out: &mut Outbox) {}

    /// Acknowledge the uplink's end of burst, where the dialect expects it.
    fn burst_ack(&self, _out: &mut Outbox) {}

    /// UID for the `seq`-th local client, if this dialect uses UIDs.
    fn allocate_uid(&self, _seq: u64) -> Option<String> {
        None
    }
}

/// Build the dialect named in configuration.
pub fn select(kind: DialectKind, me: Arc<Identity>) -> Arc<dyn Dialect> {
    match kind {
        DialectKind::Ts6 => Arc::new(Ts6::new(me)),
        DialectKind::P10 => Arc::new(P10::new(me)),
    }
}
