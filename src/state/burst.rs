//! Burst Merge Engine.
//!
//! Every dialect's channel burst and timestamped join funnels into
//! [`Network::merge_burst`]. The incoming TS is compared with the stored
//! one:
//!
//! | incoming        | result                                                        |
//! |-----------------|---------------------------------------------------------------|
//! | `0`, or stored `0` | channel pinned at TS 0, incoming modes applied             |
//! | older           | our modes (and bans, per dialect) wiped, statuses stripped, TS lowered, incoming modes applied |
//! | newer           | incoming modes and statuses dropped, members still added      |
//! | equal           | incoming modes and statuses merged on top                     |
//!
//! Local clients never lose op on a TS reset: they are re-opped and a
//! [`Effect::Reop`] is returned so the dialect can tell the network.

use slirc_link::fold;
use tracing::{debug, info};

use crate::error::StateError;

use super::{Effect, MemberModes, Network, UserId};

/// A member listed in a burst, already resolved to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstMember {
    pub user: UserId,
    pub status: MemberModes,
}

/// Channel state as announced by a peer.
#[derive(Debug, Clone, Default)]
pub struct Burst<'a> {
    pub channel: &'a str,
    pub ts: i64,
    /// Mode string, `+` alone or empty for none.
    pub modes: &'a str,
    pub mode_params: Vec<&'a str>,
    /// `(list letter, mask)` entries.
    pub bans: Vec<(char, &'a str)>,
    pub members: Vec<BurstMember>,
    /// Drop the topic when our TS loses.
    pub clear_topic: bool,
    /// Drop ban-like lists when our TS loses, if the dialect does so at all.
    /// Full bursts set this; a timestamped JOIN leaves the lists alone.
    pub clear_bans: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub created: bool,
    pub ts_changed: bool,
    /// Incoming modes and statuses were honoured.
    pub kept_modes: bool,
    /// The channel ended up empty and was destroyed.
    pub deleted: bool,
    pub effects: Vec<Effect>,
}

impl Network {
    /// Merge a burst into the channel it names, creating it if needed.
    pub fn merge_burst(&mut self, burst: Burst<'_>) -> Result<MergeOutcome, StateError> {
        let key = fold(burst.channel);
        let mut outcome = MergeOutcome {
            created: self.add_channel(burst.channel, burst.ts)?,
            ..MergeOutcome::default()
        };
        let current = self
            .channels
            .get(&key)
            .map(|c| c.ts)
            .ok_or_else(|| StateError::UnknownChannel(burst.channel.to_string()))?;

        outcome.kept_modes = if outcome.created {
            true
        } else if burst.ts == 0 || current == 0 {
            if current != 0 {
                info!(channel = %burst.channel, old_ts = current, "Channel pinned at TS 0");
                self.set_channel_ts(&key, 0);
                outcome.ts_changed = true;
            }
            true
        } else if burst.ts < current {
            self.reset_channel(&key, &burst, &mut outcome.effects);
            outcome.ts_changed = true;
            true
        } else {
            burst.ts == current
        };

        if outcome.kept_modes {
            if !burst.modes.is_empty() && burst.modes != "+" {
                let reops = self.apply_modes_key(&key, burst.modes, &burst.mode_params);
                outcome.effects.extend(reops);
            }
            if let Some(chan) = self.channels.get_mut(&key) {
                for (kind, mask) in &burst.bans {
                    chan.add_ban(*kind, mask);
                }
            }
        }

        for member in &burst.members {
            let status = if outcome.kept_modes {
                member.status
            } else {
                MemberModes::default()
            };
            if self.channels.contains_key(&key) {
                self.join(burst.channel, member.user, status)?;
            }
        }

        outcome.deleted = !self.channels.contains_key(&key) || self.reap_channel(&key);
        debug!(
            channel = %burst.channel,
            ts = burst.ts,
            created = outcome.created,
            kept = outcome.kept_modes,
            members = burst.members.len(),
            "Burst merged"
        );
        Ok(outcome)
    }

    /// Our copy of the channel lost: wipe modes, strip statuses, lower TS.
    fn reset_channel(&mut self, key: &str, burst: &Burst<'_>, effects: &mut Vec<Effect>) {
        let ts = burst.ts;
        let clear_bans = self.caps.clears_bans_on_reset && burst.clear_bans;
        let ban_kinds = self.caps.ban_like_modes;
        let local: Vec<UserId> = match self.channels.get(key) {
            Some(chan) => chan
                .members
                .keys()
                .copied()
                .filter(|id| self.users.get(id).is_some_and(|u| u.local))
                .collect(),
            None => return,
        };
        let Some(chan) = self.channels.get_mut(key) else {
            return;
        };
        info!(channel = %chan.name, old_ts = chan.ts, ts, "TS changed, resetting channel modes");

        chan.clear_simple_modes();
        if clear_bans {
            chan.clear_bans(ban_kinds);
        }
        if burst.clear_topic {
            chan.topic = None;
        }
        for (id, status) in chan.members.iter_mut() {
            *status = if local.contains(id) {
                MemberModes::op()
            } else {
                MemberModes::default()
            };
        }
        let name = chan.name.clone();

        self.set_channel_ts(key, ts);
        effects.extend(local.into_iter().map(|user| Effect::Reop {
            channel: name.clone(),
            user,
        }));
    }
}
