//! Channel mode changes.

use slirc_link::fold;
use tracing::debug;

use crate::error::StateError;
use crate::protocol::{Capabilities, Status};

use super::{Effect, Network};

/// One parsed mode letter with its direction and parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeChange {
    pub adding: bool,
    pub letter: char,
    pub param: Option<String>,
}

impl ModeChange {
    /// Split a mode string and its parameters into single changes.
    ///
    /// `0` means "no change". `k` takes a parameter both ways, `l` only when
    /// set, other parameter modes only when set. Status and list modes always
    /// take one. A change whose parameter is missing ends the parse.
    pub fn parse(caps: &Capabilities, modes: &str, params: &[&str]) -> Vec<Self> {
        let mut changes = Vec::new();
        if modes == "0" {
            return changes;
        }
        let mut params = params.iter();
        let mut adding = true;
        for letter in modes.chars() {
            let needs_param = match letter {
                '+' => {
                    adding = true;
                    continue;
                }
                '-' => {
                    adding = false;
                    continue;
                }
                'k' => true,
                'l' => adding,
                _ if caps.status_for_letter(letter).is_some() => true,
                _ if caps.is_ban_like(letter) => true,
                _ if caps.is_param_mode(letter) => adding,
                _ => false,
            };
            let param = if needs_param {
                match params.next() {
                    Some(p) => Some((*p).to_string()),
                    None => {
                        debug!(letter = %letter, modes = %modes, "Mode is missing its parameter");
                        break;
                    }
                }
            } else {
                None
            };
            changes.push(Self {
                adding,
                letter,
                param,
            });
        }
        changes
    }
}

impl Network {
    /// Apply a channel mode change. Returns re-op effects for local clients
    /// that were de-opped.
    pub fn apply_channel_modes(
        &mut self,
        channel: &str,
        modes: &str,
        params: &[&str],
    ) -> Result<Vec<Effect>, StateError> {
        let key = fold(channel);
        if !self.channels.contains_key(&key) {
            return Err(StateError::UnknownChannel(channel.to_string()));
        }
        let effects = self.apply_modes_key(&key, modes, params);
        if self.reap_channel(&key) {
            debug!(channel = %channel, "Channel emptied by mode change");
        }
        Ok(effects)
    }

    /// Mode application without reaping, for callers that add members next.
    pub(super) fn apply_modes_key(
        &mut self,
        key: &str,
        modes: &str,
        params: &[&str],
    ) -> Vec<Effect> {
        let changes = ModeChange::parse(&self.caps, modes, params);
        let mut effects = Vec::new();

        for change in changes {
            let letter = change.letter;
            if let Some(status) = self.caps.status_for_letter(letter) {
                let target = change.param.as_deref().unwrap_or_default();
                let Some((id, local)) = self.find_user(target).map(|u| (u.id, u.local)) else {
                    debug!(channel = %key, target = %target, "Status mode for unknown user");
                    continue;
                };
                let Some(chan) = self.channels.get_mut(key) else {
                    break;
                };
                let Some(member) = chan.members.get_mut(&id) else {
                    debug!(channel = %key, target = %target, "Status mode for non-member");
                    continue;
                };
                if !change.adding && local && status == Status::Op {
                    effects.push(Effect::Reop {
                        channel: chan.name.clone(),
                        user: id,
                    });
                    continue;
                }
                member.set(status, change.adding);
                continue;
            }

            let Some(chan) = self.channels.get_mut(key) else {
                break;
            };
            match letter {
                _ if self.caps.is_ban_like(letter) => {
                    let mask = change.param.as_deref().unwrap_or_default();
                    if change.adding {
                        chan.add_ban(letter, mask);
                    } else {
                        chan.remove_ban(letter, mask);
                    }
                }
                'k' => chan.key = change.param.filter(|_| change.adding),
                'l' => {
                    chan.limit = change
                        .param
                        .filter(|_| change.adding)
                        .and_then(|p| p.parse().ok())
                }
                _ if self.caps.is_param_mode(letter) => match change.param {
                    Some(value) if change.adding => {
                        chan.extmodes.insert(letter, value);
                    }
                    _ => {
                        chan.extmodes.remove(&letter);
                    }
                },
                _ if self.caps.is_simple_mode(letter) => chan.modes.set(letter, change.adding),
                _ => debug!(channel = %key, letter = %letter, "Ignoring unknown channel mode"),
            }
        }
        effects
    }
}
