//! Channel-related types and state.

use std::collections::BTreeMap;
use std::sync::Arc;

use slirc_link::fold;
use tracing::debug;

use crate::error::StateError;
use crate::protocol::{Capabilities, Status};

use super::{Event, Network, UserId};

/// An entry in a ban-like list (bans, excepts, invex, quiets).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ban {
    /// Mode letter of the list this entry belongs to.
    pub kind: char,
    pub mask: String,
}

/// Channel topic with metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub text: String,
    pub set_by: String,
    pub set_at: i64,
}

/// Member modes (op, voice, etc.).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemberModes {
    pub owner: bool,   // +q (~)
    pub protect: bool, // +a (&)
    pub op: bool,      // +o (@)
    pub halfop: bool,  // +h (%)
    pub voice: bool,   // +v (+)
}

impl MemberModes {
    /// Operator status only.
    pub fn op() -> Self {
        Self {
            op: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn set(&mut self, status: Status, on: bool) {
        match status {
            Status::Owner => self.owner = on,
            Status::Protect => self.protect = on,
            Status::Op => self.op = on,
            Status::Halfop => self.halfop = on,
            Status::Voice => self.voice = on,
        }
    }

    pub fn has(&self, status: Status) -> bool {
        match status {
            Status::Owner => self.owner,
            Status::Protect => self.protect,
            Status::Op => self.op,
            Status::Halfop => self.halfop,
            Status::Voice => self.voice,
        }
    }

    /// Drop every bit the dialect cannot represent.
    pub fn masked(mut self, caps: &Capabilities) -> Self {
        self.owner &= caps.uses_owner;
        self.protect &= caps.uses_protect;
        self.halfop &= caps.uses_halfops;
        self
    }

    /// Union of two status sets.
    pub fn merged(self, other: Self) -> Self {
        Self {
            owner: self.owner || other.owner,
            protect: self.protect || other.protect,
            op: self.op || other.op,
            halfop: self.halfop || other.halfop,
            voice: self.voice || other.voice,
        }
    }
}

/// Parameterless channel modes as a bitset over `a-z` and `A-Z`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SimpleModes(u64);

impl SimpleModes {
    fn bit(letter: char) -> Option<u64> {
        match letter {
            'a'..='z' => Some(1 << (letter as u32 - 'a' as u32)),
            'A'..='Z' => Some(1 << (26 + letter as u32 - 'A' as u32)),
            _ => None,
        }
    }

    pub fn contains(&self, letter: char) -> bool {
        Self::bit(letter).is_some_and(|b| self.0 & b != 0)
    }

    pub fn set(&mut self, letter: char, on: bool) {
        if let Some(b) = Self::bit(letter) {
            if on {
                self.0 |= b;
            } else {
                self.0 &= !b;
            }
        }
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Letters currently set, lowercase first.
    pub fn letters(&self) -> String {
        ('a'..='z')
            .chain('A'..='Z')
            .filter(|c| self.contains(*c))
            .collect()
    }
}

/// A channel as seen by services.
#[derive(Debug, Clone)]
pub struct Channel {
    pub name: String,
    /// Creation timestamp; 0 pins the channel permanently.
    pub ts: i64,
    pub modes: SimpleModes,
    pub key: Option<String>,
    pub limit: Option<u32>,
    /// Parameter modes other than `k` and `l`.
    pub extmodes: BTreeMap<char, String>,
    pub topic: Option<Topic>,
    pub bans: Vec<Ban>,
    pub members: BTreeMap<UserId, MemberModes>,
}

impl Channel {
    pub fn new(name: &str, ts: i64) -> Self {
        Self {
            name: name.to_string(),
            ts,
            modes: SimpleModes::default(),
            key: None,
            limit: None,
            extmodes: BTreeMap::new(),
            topic: None,
            bans: Vec::new(),
            members: BTreeMap::new(),
        }
    }

    /// TS 0 or the dialect's perm mode keeps an empty channel alive.
    pub fn is_permanent(&self, caps: &Capabilities) -> bool {
        self.ts == 0 || caps.perm_mode.is_some_and(|m| self.modes.contains(m))
    }

    pub fn member(&self, user: UserId) -> Option<&MemberModes> {
        self.members.get(&user)
    }

    /// Drop simple modes, key, limit and parameter modes.
    pub fn clear_simple_modes(&mut self) {
        self.modes.clear();
        self.key = None;
        self.limit = None;
        self.extmodes.clear();
    }

    pub fn find_ban(&self, kind: char, mask: &str) -> Option<usize> {
        self.bans
            .iter()
            .position(|b| b.kind == kind && b.mask.eq_ignore_ascii_case(mask))
    }

    /// Add a list entry. Empty masks, masks that would break the wire format
    /// and case-insensitive duplicates are refused.
    pub fn add_ban(&mut self, kind: char, mask: &str) -> bool {
        if mask.is_empty() || mask.starts_with(':') || mask.contains(' ') {
            return false;
        }
        if self.find_ban(kind, mask).is_some() {
            return false;
        }
        self.bans.push(Ban {
            kind,
            mask: mask.to_string(),
        });
        true
    }

    pub fn remove_ban(&mut self, kind: char, mask: &str) -> bool {
        match self.find_ban(kind, mask) {
            Some(i) => {
                self.bans.remove(i);
                true
            }
            None => false,
        }
    }

    /// Remove every entry of the given kinds.
    pub fn clear_bans(&mut self, kinds: &str) {
        self.bans.retain(|b| !kinds.contains(b.kind));
    }

    /// Current simple and parameter modes as `+modes params...`.
    pub fn mode_string(&self) -> String {
        let mut letters = format!("+{}", self.modes.letters());
        let mut params = Vec::new();
        if let Some(key) = &self.key {
            letters.push('k');
            params.push(key.clone());
        }
        if let Some(limit) = self.limit {
            letters.push('l');
            params.push(limit.to_string());
        }
        for (letter, value) in &self.extmodes {
            letters.push(*letter);
            params.push(value.clone());
        }
        if params.is_empty() {
            letters
        } else {
            format!("{} {}", letters, params.join(" "))
        }
    }
}

impl Network {
    pub fn find_channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&fold(name))
    }

    pub(crate) fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.get_mut(&fold(name))
    }

    /// Create a channel. Returns false if it already existed.
    pub fn add_channel(&mut self, name: &str, ts: i64) -> Result<bool, StateError> {
        if !name.starts_with('#') {
            debug!(channel = %name, "Refusing non-# channel");
            return Err(StateError::InvalidChannelName(name.to_string()));
        }
        let key = fold(name);
        if self.channels.contains_key(&key) {
            return Ok(false);
        }
        debug!(channel = %name, ts, "channel_add");
        self.channels.insert(key, Channel::new(name, ts));
        self.publish(Event::ChannelAdd(name.to_string()));
        Ok(true)
    }

    fn delete_channel_key(&mut self, key: &str) {
        let Some(name) = self.channels.get(key).map(|c| c.name.clone()) else {
            return;
        };
        debug!(channel = %name, "channel_delete");
        self.publish(Event::ChannelDelete(name));

        if let Some(channel) = self.channels.remove(key) {
            for id in channel.members.keys() {
                if let Some(user) = self.users.get_mut(id) {
                    user.channels.remove(key);
                }
            }
        }
    }

    /// Add a member, or widen an existing member's status. Returns true for
    /// a new membership.
    pub fn join(
        &mut self,
        channel: &str,
        user: UserId,
        status: MemberModes,
    ) -> Result<bool, StateError> {
        let key = fold(channel);
        if !self.users.contains_key(&user) {
            return Err(StateError::UnknownUser);
        }
        let status = status.masked(&self.caps);
        let chan = self
            .channels
            .get_mut(&key)
            .ok_or_else(|| StateError::UnknownChannel(channel.to_string()))?;
        if let Some(existing) = chan.members.get_mut(&user) {
            *existing = existing.merged(status);
            return Ok(false);
        }
        chan.members.insert(user, status);
        let name = chan.name.clone();
        if let Some(u) = self.users.get_mut(&user) {
            u.channels.insert(key);
        }
        self.publish(Event::ChannelJoin {
            channel: name,
            user,
        });
        Ok(true)
    }

    /// Remove a member. A non-permanent channel left empty is destroyed.
    pub fn part(&mut self, channel: &str, user: UserId) -> Result<(), StateError> {
        let key = fold(channel);
        let is_member = self
            .channels
            .get(&key)
            .ok_or_else(|| StateError::UnknownChannel(channel.to_string()))?
            .members
            .contains_key(&user);
        if !is_member {
            return Err(StateError::UnknownUser);
        }
        self.part_key(&key, user);
        Ok(())
    }

    pub(super) fn part_key(&mut self, key: &str, user: UserId) {
        let Some(name) = self
            .channels
            .get(key)
            .filter(|c| c.members.contains_key(&user))
            .map(|c| c.name.clone())
        else {
            return;
        };
        self.publish(Event::ChannelPart {
            channel: name,
            user,
        });

        if let Some(u) = self.users.get_mut(&user) {
            u.channels.remove(key);
        }
        let caps = Arc::clone(&self.caps);
        let now_empty = match self.channels.get_mut(key) {
            Some(chan) => {
                chan.members.remove(&user);
                chan.members.is_empty() && !chan.is_permanent(&caps)
            }
            None => false,
        };
        if now_empty {
            self.delete_channel_key(key);
        }
    }

    /// Delete the channel if nobody is left in it and nothing pins it.
    pub(super) fn reap_channel(&mut self, key: &str) -> bool {
        let empty = self
            .channels
            .get(key)
            .is_some_and(|c| c.members.is_empty() && !c.is_permanent(&self.caps));
        if empty {
            self.delete_channel_key(key);
        }
        empty
    }

    /// Replace the topic; empty text clears it.
    pub fn set_topic(
        &mut self,
        channel: &str,
        setter: &str,
        ts: i64,
        text: &str,
    ) -> Result<(), StateError> {
        let chan = self
            .channel_mut(channel)
            .ok_or_else(|| StateError::UnknownChannel(channel.to_string()))?;
        chan.topic = (!text.is_empty()).then(|| Topic {
            text: text.to_string(),
            set_by: setter.to_string(),
            set_at: ts,
        });
        let name = chan.name.clone();
        self.publish(Event::ChannelTopic(name));
        Ok(())
    }

    /// Change a channel's TS, firing `channel_tschange` when it moves.
    pub(super) fn set_channel_ts(&mut self, key: &str, ts: i64) {
        let Some(chan) = self.channels.get_mut(key) else {
            return;
        };
        if chan.ts == ts {
            return;
        }
        let old_ts = std::mem::replace(&mut chan.ts, ts);
        let name = chan.name.clone();
        debug!(channel = %name, old_ts, ts, "channel_tschange");
        self.publish(Event::ChannelTsChange {
            channel: name,
            old_ts,
        });
    }
}
