//! Handler trait and source-kind filters.

use std::ops::BitOr;

use slirc_link::RawMessage;

use super::context::Context;
use crate::error::HandlerResult;

/// What a resolved origin turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    User,
    Server,
    /// The uplink before it has introduced itself.
    Unregistered,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Server => "server",
            Self::Unregistered => "unregistered",
        }
    }
}

/// Set of source kinds a command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceKinds(u8);

impl SourceKinds {
    pub const USER: Self = Self(1);
    pub const SERVER: Self = Self(1 << 1);
    pub const UNREGISTERED: Self = Self(1 << 2);

    pub fn allows(self, kind: SourceKind) -> bool {
        let bit = match kind {
            SourceKind::User => Self::USER,
            SourceKind::Server => Self::SERVER,
            SourceKind::Unregistered => Self::UNREGISTERED,
        };
        self.0 & bit.0 != 0
    }
}

impl BitOr for SourceKinds {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// An inbound command handler.
///
/// Handlers run to completion without awaiting; anything they want sent goes
/// into the context's outbox.
pub trait Handler: Send + Sync {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult;
}
