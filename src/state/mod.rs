//! State Store.
//!
//! An in-memory mirror of the network: servers, users, channels, their
//! memberships and ban lists. Every index is keyed by a case-folded name,
//! with a second map for UIDs and SIDs. Users are referenced everywhere by
//! a stable [`UserId`], so renames never break membership links.
//!
//! The store is owned by the uplink session task and mutated only from the
//! dispatch path. Wire consequences of a mutation are returned to the caller
//! as [`Effect`]s rather than written from here.

pub mod burst;
pub mod channel;
pub mod collision;
mod modes;
pub mod observer;
mod server;
mod user;

use std::collections::HashMap;
use std::sync::Arc;

use slirc_link::fold;

use crate::protocol::Capabilities;

pub use burst::{Burst, BurstMember, MergeOutcome};
pub use channel::{Ban, Channel, MemberModes, SimpleModes, Topic};
pub use modes::ModeChange;
pub use observer::{Event, EventLog, Notifier, StateObserver, TraceObserver};
pub use server::{Identity, Server, ServerFlags};
pub use user::{IntroduceOutcome, NewUser, RenameOutcome, User, UserFlags};

/// Stable handle for a user. Never reused within one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(pub u64);

/// A wire-visible consequence of a state change, to be sent through the
/// active dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Kill a client by UID (or by nick on UID-less dialects).
    Kill { target: String, reason: String },
    /// Network-wide operator notice.
    Wallops(String),
    /// Give a local client operator status back on a channel.
    Reop { channel: String, user: UserId },
}

/// The network as services see it.
#[derive(Debug)]
pub struct Network {
    me: Arc<Identity>,
    caps: Arc<Capabilities>,
    notifier: Arc<Notifier>,
    /// Folded server name -> server
    servers: HashMap<String, Server>,
    /// SID/numeric -> folded server name
    sids: HashMap<String, String>,
    users: HashMap<UserId, User>,
    /// Folded nick -> user
    nicks: HashMap<String, UserId>,
    uids: HashMap<String, UserId>,
    /// Folded channel name -> channel
    channels: HashMap<String, Channel>,
    uplink: Option<String>,
    next_user: u64,
}

impl Network {
    /// Create a store holding only the local server.
    pub fn new(me: Arc<Identity>, caps: Arc<Capabilities>, notifier: Arc<Notifier>) -> Self {
        let local = Server::local(&me);
        let key = fold(&me.name);
        let mut sids = HashMap::new();
        if let Some(sid) = &me.sid {
            sids.insert(sid.clone(), key.clone());
        }
        let mut servers = HashMap::new();
        servers.insert(key, local);
        Self {
            me,
            caps,
            notifier,
            servers,
            sids,
            users: HashMap::new(),
            nicks: HashMap::new(),
            uids: HashMap::new(),
            channels: HashMap::new(),
            uplink: None,
            next_user: 1,
        }
    }

    pub fn me(&self) -> &Arc<Identity> {
        &self.me
    }

    pub fn caps(&self) -> &Capabilities {
        &self.caps
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    /// True once the uplink has introduced itself.
    pub fn is_registered(&self) -> bool {
        self.uplink.is_some()
    }

    /// The directly linked server, once registered.
    pub fn uplink(&self) -> Option<&Server> {
        self.uplink.as_ref().and_then(|k| self.servers.get(k))
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn servers(&self) -> impl Iterator<Item = &Server> {
        self.servers.values()
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    fn publish(&self, event: Event) {
        let notifier = Arc::clone(&self.notifier);
        notifier.publish(self, &event);
    }
}
