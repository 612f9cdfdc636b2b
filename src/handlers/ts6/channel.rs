//! TS6 channel commands: bursts, joins, modes, topics.

use slirc_link::RawMessage;
use tracing::debug;

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::common::{self, parse_ts};
use crate::handlers::core::{Context, Handler};
use crate::protocol::Capabilities;
use crate::state::{Burst, BurstMember, MemberModes, Network};

/// Split `@+0HBAAAAAA` into its status and the user it names.
fn parse_member<'a>(caps: &Capabilities, token: &'a str) -> (MemberModes, &'a str) {
    let start = token
        .find(|c: char| c.is_ascii_alphanumeric())
        .unwrap_or(token.len());
    let mut status = MemberModes::default();
    for prefix in token[..start].chars() {
        if let Some(s) = caps.status_for_prefix(prefix) {
            status.set(s, true);
        }
    }
    (status, &token[start..])
}

/// Resolve an SJOIN member list, skipping users we do not know.
fn burst_members(net: &Network, list: &str) -> Vec<BurstMember> {
    list.split_whitespace()
        .filter_map(|token| {
            let (status, target) = parse_member(net.caps(), token);
            match net.find_user(target) {
                Some(user) => Some(BurstMember {
                    user: user.id,
                    status,
                }),
                None => {
                    debug!(target = %target, "SJOIN member not found");
                    None
                }
            }
        })
        .collect()
}

/// Handler for the SJOIN command.
///
/// `SJOIN <ts> <channel> <modes> [params...] :<members>`
pub struct SjoinHandler;

impl Handler for SjoinHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let ts = parse_ts(msg.arg(0).ok_or(HandlerError::NeedMoreParams)?)?;
        let channel = msg.arg(1).ok_or(HandlerError::NeedMoreParams)?;
        let modes = msg.arg(2).ok_or(HandlerError::NeedMoreParams)?;
        let last = msg.args.len() - 1;
        let members = burst_members(ctx.net, msg.args[last]);

        let outcome = ctx.net.merge_burst(Burst {
            channel,
            ts,
            modes,
            mode_params: msg.args[3..last].to_vec(),
            members,
            clear_bans: true,
            ..Burst::default()
        })?;
        ctx.apply(outcome.effects);
        Ok(())
    }
}

/// Handler for the JOIN command.
///
/// `JOIN <ts> <channel> [modes]`, or `JOIN 0` to leave every channel.
pub struct JoinHandler;

impl Handler for JoinHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let id = ctx.source_user()?;
        let first = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        if first == "0" && msg.args.len() <= 2 {
            common::part_all(ctx, id);
            return Ok(());
        }

        let ts = parse_ts(first)?;
        let channel = msg.arg(1).ok_or(HandlerError::NeedMoreParams)?;
        let outcome = ctx.net.merge_burst(Burst {
            channel,
            ts,
            modes: msg.arg(2).unwrap_or("+"),
            mode_params: msg.args.iter().skip(3).copied().collect(),
            members: vec![BurstMember {
                user: id,
                status: MemberModes::default(),
            }],
            ..Burst::default()
        })?;
        ctx.apply(outcome.effects);
        Ok(())
    }
}

/// Handler for the PART command.
pub struct PartHandler;

impl Handler for PartHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let id = ctx.source_user()?;
        let channels = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        for channel in channels.split(',').filter(|c| !c.is_empty()) {
            common::handle_part(ctx, channel, id);
        }
        Ok(())
    }
}

/// Handler for the KICK command.
pub struct KickHandler;

impl Handler for KickHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let channel = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let target = msg.arg(1).ok_or(HandlerError::NeedMoreParams)?;
        common::handle_kick(ctx, channel, target)
    }
}

/// Handler for the MODE command.
///
/// Channel targets carry no TS; anything else is a user mode change.
pub struct ModeHandler;

impl Handler for ModeHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let target = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let modes = msg.arg(1).ok_or(HandlerError::NeedMoreParams)?;
        if target.starts_with('#') {
            if ctx.net.find_channel(target).is_none() {
                debug!(channel = %target, "MODE for nonexistent channel");
                return Ok(());
            }
            let params: Vec<&str> = msg.args.iter().skip(2).copied().collect();
            let effects = ctx.net.apply_channel_modes(target, modes, &params)?;
            ctx.apply(effects);
        } else {
            let id = ctx
                .net
                .user_id(target)
                .ok_or_else(|| HandlerError::NoSuchUser(target.to_string()))?;
            ctx.net.apply_user_modes(id, modes)?;
        }
        Ok(())
    }
}

/// Handler for the TMODE command.
///
/// `TMODE <ts> <channel> <modes> [params...]`; ignored when the TS is newer
/// than ours.
pub struct TmodeHandler;

impl Handler for TmodeHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let ts = parse_ts(msg.arg(0).ok_or(HandlerError::NeedMoreParams)?)?;
        let channel = msg.arg(1).ok_or(HandlerError::NeedMoreParams)?;
        let modes = msg.arg(2).ok_or(HandlerError::NeedMoreParams)?;
        let Some(current) = ctx.net.find_channel(channel).map(|c| c.ts) else {
            debug!(channel = %channel, "TMODE for nonexistent channel");
            return Ok(());
        };
        if ts > current {
            debug!(channel = %channel, ts, current, "Ignoring TMODE with newer TS");
            return Ok(());
        }
        let params: Vec<&str> = msg.args.iter().skip(3).copied().collect();
        let effects = ctx.net.apply_channel_modes(channel, modes, &params)?;
        ctx.apply(effects);
        Ok(())
    }
}

/// Handler for the BMASK command.
///
/// `BMASK <ts> <channel> <type> :<masks>`
pub struct BmaskHandler;

impl Handler for BmaskHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let ts = parse_ts(msg.arg(0).ok_or(HandlerError::NeedMoreParams)?)?;
        let channel = msg.arg(1).ok_or(HandlerError::NeedMoreParams)?;
        let kind = msg.arg(2).ok_or(HandlerError::NeedMoreParams)?;
        let masks = msg.args.last().copied().unwrap_or_default();

        let mut letters = kind.chars();
        let (Some(letter), None) = (letters.next(), letters.next()) else {
            debug!(kind = %kind, "Invalid BMASK type");
            return Ok(());
        };
        if !ctx.net.caps().is_ban_like(letter) {
            debug!(kind = %kind, "BMASK type is not a list mode");
            return Ok(());
        }
        let Some(chan) = ctx.net.channel_mut(channel) else {
            debug!(channel = %channel, "BMASK for nonexistent channel");
            return Ok(());
        };
        if ts > chan.ts {
            debug!(channel = %channel, ts, current = chan.ts, "Ignoring BMASK with newer TS");
            return Ok(());
        }
        for mask in masks.split_whitespace() {
            chan.add_ban(letter, mask);
        }
        Ok(())
    }
}

/// Handler for the TOPIC command.
pub struct TopicHandler;

impl Handler for TopicHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        ctx.source_user()?;
        let channel = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let text = msg.arg(1).ok_or(HandlerError::NeedMoreParams)?;
        if ctx.net.find_channel(channel).is_none() {
            debug!(channel = %channel, "TOPIC for nonexistent channel");
            return Ok(());
        }
        let setter = ctx.source_name();
        let now = chrono::Utc::now().timestamp();
        ctx.net.set_topic(channel, &setter, now, text)?;
        Ok(())
    }
}

/// Handler for the TB command (topic burst).
///
/// `TB <channel> <ts> [setter] :<topic>`; ignored when we already hold a
/// topic at least as old.
pub struct TbHandler;

impl Handler for TbHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let channel = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let ts = parse_ts(msg.arg(1).ok_or(HandlerError::NeedMoreParams)?)?;
        let text = msg.args.last().copied().unwrap_or_default();
        let Some(chan) = ctx.net.find_channel(channel) else {
            debug!(channel = %channel, "TB for nonexistent channel");
            return Ok(());
        };
        if chan.topic.as_ref().is_some_and(|t| t.set_at <= ts) {
            return Ok(());
        }
        let setter = if msg.args.len() > 3 {
            msg.args[2].to_string()
        } else {
            ctx.source_name()
        };
        ctx.net.set_topic(channel, &setter, ts, text)?;
        Ok(())
    }
}
