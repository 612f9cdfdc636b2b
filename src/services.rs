//! Pseudo-client roster.
//!
//! The configured services clients (NickServ, ChanServ, ...) are local users
//! of the local server. They are added and introduced when the link comes
//! up, keep their channels with op, and are put back when something on the
//! network removes them.

use std::collections::HashSet;

use slirc_link::fold;
use tracing::{debug, error, info};

use crate::config::ServiceBlock;
use crate::error::StateError;
use crate::protocol::{Dialect, Outbox};
use crate::state::{MemberModes, Network, UserId};

/// Configured pseudo-clients plus the UID sequence handed out to them.
///
/// Outlives individual uplink sessions, so reconnects keep allocating fresh
/// UIDs.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    blocks: Vec<ServiceBlock>,
    next_seq: u64,
}

impl Roster {
    pub fn new(blocks: Vec<ServiceBlock>) -> Self {
        Self { blocks, next_seq: 0 }
    }

    pub fn blocks(&self) -> &[ServiceBlock] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Next UID not already taken, or `None` on UID-less dialects.
    pub fn next_uid(&mut self, net: &Network, dialect: &dyn Dialect) -> Option<String> {
        if !dialect.caps().uses_uid {
            return None;
        }
        loop {
            let Some(uid) = dialect.allocate_uid(self.next_seq) else {
                error!(seq = self.next_seq, "Out of UIDs for local clients");
                return None;
            };
            self.next_seq += 1;
            if net.find_user_by_uid(&uid).is_none() {
                return Some(uid);
            }
        }
    }

    /// Add every configured client that is not already present, then
    /// introduce all of them and their channels. Called once per link, right
    /// after login.
    ///
    /// Returns how many clients were introduced.
    pub fn introduce_all(
        &mut self,
        net: &mut Network,
        dialect: &dyn Dialect,
        out: &mut Outbox,
    ) -> usize {
        let now = chrono::Utc::now().timestamp();
        let mut announced = HashSet::new();
        let mut introduced = 0;

        for block in self.blocks.clone() {
            let existing = net
                .find_user_by_nick(&block.nick)
                .filter(|u| u.local)
                .map(|u| u.id);
            let id = match existing {
                Some(id) => id,
                None => {
                    let uid = self.next_uid(net, dialect);
                    match net.add_local_user(
                        &block.nick,
                        &block.user,
                        &block.host,
                        &block.gecos,
                        uid.as_deref(),
                    ) {
                        Ok(id) => id,
                        Err(e) => {
                            error!(nick = %block.nick, error = %e, "Could not add service client");
                            continue;
                        }
                    }
                }
            };

            for channel in &block.channels {
                let joined = net
                    .add_channel(channel, now)
                    .and_then(|_| net.join(channel, id, MemberModes::op()));
                if let Err(e) = joined {
                    error!(nick = %block.nick, channel = %channel, error = %e, "Could not join service channel");
                }
            }

            let Some(user) = net.user(id) else {
                continue;
            };
            dialect.introduce_user(out, user);
            introduced += 1;
            for key in &user.channels {
                let Some(chan) = net.find_channel(key) else {
                    continue;
                };
                let is_new = announced.insert(fold(&chan.name));
                dialect.join(out, chan, user, is_new);
            }
        }
        info!(clients = introduced, "Introduced service clients");
        introduced
    }

    /// Put a killed pseudo-client back on the network under a fresh UID and
    /// re-join its channels.
    pub fn reintroduce(
        &mut self,
        net: &mut Network,
        dialect: &dyn Dialect,
        out: &mut Outbox,
        id: UserId,
    ) -> Result<(), StateError> {
        let (nick, has_uid) = {
            let user = net.user(id).ok_or(StateError::UnknownUser)?;
            (user.nick.clone(), user.uid.is_some())
        };
        if has_uid {
            if let Some(uid) = self.next_uid(net, dialect) {
                net.change_uid(id, &uid)?;
            }
        } else if !dialect.caps().uses_uid {
            dialect.kill_id(out, None, &nick, "Service nick");
        }

        let caps = dialect.caps();
        let ban_kinds = caps.ban_like_modes;
        let perm = caps.perm_mode;
        let channels: Vec<String> = net
            .user(id)
            .map(|u| u.channels.iter().cloned().collect())
            .unwrap_or_default();
        // Alone in a channel, we recreate it: stale bans would come back.
        for key in &channels {
            if let Some(chan) = net.channel_mut(key)
                && chan.members.len() <= 1
                && !perm.is_some_and(|m| chan.modes.contains(m))
            {
                chan.clear_bans(ban_kinds);
            }
        }

        let user = net.user(id).ok_or(StateError::UnknownUser)?;
        debug!(nick = %nick, uid = ?user.uid, "Reintroducing service client");
        dialect.introduce_user(out, user);
        for key in &channels {
            let Some(chan) = net.find_channel(key) else {
                continue;
            };
            if chan.members.len() > 1 || perm.is_some_and(|m| chan.modes.contains(m)) {
                dialect.join(out, chan, user, false);
            } else {
                dialect.join(out, chan, user, true);
                if let Some(topic) = &chan.topic {
                    dialect.topic(out, user, chan, &topic.text, topic.set_at);
                }
            }
        }
        Ok(())
    }
}

/// Join a local client to a channel with op, creating the channel at the
/// current time if nobody is in it.
pub fn join_channel(
    net: &mut Network,
    dialect: &dyn Dialect,
    out: &mut Outbox,
    id: UserId,
    channel: &str,
) -> Result<(), StateError> {
    let created = net.add_channel(channel, chrono::Utc::now().timestamp())?;
    net.join(channel, id, MemberModes::op())?;
    let user = net.user(id).ok_or(StateError::UnknownUser)?;
    let chan = net
        .find_channel(channel)
        .ok_or_else(|| StateError::UnknownChannel(channel.to_string()))?;
    dialect.join(out, chan, user, created);
    Ok(())
}
