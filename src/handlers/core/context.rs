//! Handler context.
//!
//! Everything a handler may touch while processing one message: the
//! network state, the active dialect, the outbox, per-link state and the
//! pseudo-client roster, plus the resolved source of the message.

use tracing::debug;

use super::traits::SourceKind;
use crate::error::HandlerError;
use crate::protocol::{Dialect, Outbox};
use crate::services::Roster;
use crate::state::{Effect, Network, UserId};
use crate::uplink::LinkState;

/// Resolved origin of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    User(UserId),
    /// Server, by name.
    Server(String),
    /// The uplink before registration.
    Unregistered,
}

impl Source {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::User(_) => SourceKind::User,
            Self::Server(_) => SourceKind::Server,
            Self::Unregistered => SourceKind::Unregistered,
        }
    }
}

pub struct Context<'a> {
    pub net: &'a mut Network,
    pub dialect: &'a dyn Dialect,
    pub out: &'a mut Outbox,
    pub link: &'a mut LinkState,
    pub roster: &'a mut Roster,
    pub source: Source,
}

impl<'a> Context<'a> {
    /// The source user, for commands only users may send.
    pub fn source_user(&self) -> Result<UserId, HandlerError> {
        match self.source {
            Source::User(id) => Ok(id),
            _ => Err(HandlerError::WrongSource("user")),
        }
    }

    /// The source server's name, for commands only servers may send.
    pub fn source_server(&self) -> Result<&str, HandlerError> {
        match &self.source {
            Source::Server(name) => Ok(name),
            _ => Err(HandlerError::WrongSource("server")),
        }
    }

    /// Name to show for the source: nick or server name.
    pub fn source_name(&self) -> String {
        match &self.source {
            Source::User(id) => self
                .net
                .user(*id)
                .map(|u| u.nick.clone())
                .unwrap_or_default(),
            Source::Server(name) => name.clone(),
            Source::Unregistered => self.link.uplink_name.clone(),
        }
    }

    /// Send state store effects through the dialect.
    pub fn apply(&mut self, effects: Vec<Effect>) {
        apply_effects(self.net, self.dialect, self.out, effects);
    }

    pub fn wallops(&mut self, text: &str) {
        self.dialect.wallops(self.out, text);
    }
}

/// Turn store effects into wire lines.
pub fn apply_effects(net: &Network, dialect: &dyn Dialect, out: &mut Outbox, effects: Vec<Effect>) {
    for effect in effects {
        match effect {
            Effect::Kill { target, reason } => dialect.kill_id(out, None, &target, &reason),
            Effect::Wallops(text) => dialect.wallops(out, &text),
            Effect::Reop { channel, user } => {
                match (net.find_channel(&channel), net.user(user)) {
                    (Some(chan), Some(u)) => dialect.reop(out, chan, u),
                    _ => debug!(channel = %channel, "Re-op target vanished"),
                }
            }
        }
    }
}
