//! P10 channel commands.

use slirc_link::RawMessage;
use tracing::debug;

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::common::{self, parse_ts};
use crate::handlers::core::{Context, Handler};
use crate::protocol::Status;
use crate::state::{Burst, BurstMember, MemberModes, ModeChange};

/// Handler for the B (burst) command.
///
/// `B <channel> <ts> [+modes [key] [limit]] [members] [:%bans]`. Members
/// are `numeric[:modes]`, comma separated; a status applies to every
/// following member until the next one that names its own.
pub struct BurstHandler;

impl BurstHandler {
    /// Parse `o`, `h`, `v` and oplevel digits into a member status.
    fn member_status(flags: &str) -> MemberModes {
        let mut status = MemberModes::default();
        for c in flags.chars() {
            match c {
                'o' => status.set(Status::Op, true),
                '0'..='9' => status.set(Status::Op, true),
                'h' => status.set(Status::Halfop, true),
                'v' => status.set(Status::Voice, true),
                _ => {}
            }
        }
        status
    }
}

impl Handler for BurstHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let channel = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let ts = parse_ts(msg.arg(1).ok_or(HandlerError::NeedMoreParams)?)?;

        let mut modes = String::new();
        let mut mode_params = Vec::new();
        let mut bans = Vec::new();
        let mut members = Vec::new();

        let mut rest = msg.args.iter().skip(2).copied();
        while let Some(token) = rest.next() {
            if token.starts_with('+') {
                modes.push_str(token);
                for letter in ['k', 'l'] {
                    if token.contains(letter)
                        && let Some(param) = rest.next()
                    {
                        mode_params.push(param);
                    }
                }
            } else if let Some(masks) = token.strip_prefix('%') {
                bans.extend(masks.split_whitespace().map(|mask| ('b', mask)));
            } else {
                let mut status = MemberModes::default();
                for entry in token.split(',').filter(|e| !e.is_empty()) {
                    let numeric = match entry.split_once(':') {
                        Some((numeric, flags)) => {
                            status = Self::member_status(flags);
                            numeric
                        }
                        None => entry,
                    };
                    match ctx.net.user_id(numeric) {
                        Some(user) => members.push(BurstMember { user, status }),
                        None => debug!(numeric = %numeric, channel = %channel, "Burst member not found"),
                    }
                }
            }
        }

        let outcome = ctx.net.merge_burst(Burst {
            channel,
            ts,
            modes: &modes,
            mode_params,
            bans,
            members,
            clear_topic: true,
            clear_bans: true,
        })?;
        ctx.apply(outcome.effects);
        Ok(())
    }
}

/// Handler for the C (create) command.
///
/// `C <channel>[,<channel>...] <ts>`; the creator gets op unless the
/// channel already exists with an older TS.
pub struct CreateHandler;

impl Handler for CreateHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let id = ctx.source_user()?;
        let channels = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let ts = parse_ts(msg.arg(1).ok_or(HandlerError::NeedMoreParams)?)?;

        for channel in channels.split(',').filter(|c| !c.is_empty()) {
            if let Err(e) = ctx.net.add_channel(channel, ts) {
                debug!(channel = %channel, error = %e, "CREATE ignored");
                continue;
            }
            let current = ctx.net.find_channel(channel).map_or(ts, |c| c.ts);
            let status = if ts <= current {
                MemberModes::op()
            } else {
                MemberModes::default()
            };
            ctx.net.join(channel, id, status)?;
        }
        Ok(())
    }
}

/// Handler for the J command.
///
/// `J <channel>[,<channel>...] <ts>`, or `J 0` to leave every channel.
pub struct JoinHandler;

impl Handler for JoinHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let id = ctx.source_user()?;
        let channels = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        if channels == "0" {
            common::part_all(ctx, id);
            return Ok(());
        }
        let Some(ts) = msg.arg(1) else {
            debug!(channels = %channels, "J without a timestamp");
            return Ok(());
        };
        let ts = parse_ts(ts)?;

        for channel in channels.split(',').filter(|c| !c.is_empty()) {
            if let Err(e) = ctx.net.add_channel(channel, ts) {
                debug!(channel = %channel, error = %e, "JOIN ignored");
                continue;
            }
            ctx.net.join(channel, id, MemberModes::default())?;
        }
        Ok(())
    }
}

/// Handler for the L (part) command.
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

/// Handler for the M and OM commands.
///
/// A channel mode change may carry the channel TS after its parameters;
/// changes with a newer TS than ours are ignored. User targets are nicks.
pub struct ModeHandler;

impl Handler for ModeHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let target = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let modes = msg.arg(1).ok_or(HandlerError::NeedMoreParams)?;

        if !target.starts_with('#') {
            let Some(id) = ctx.net.find_user_by_nick(target).map(|u| u.id) else {
                debug!(target = %target, "User mode for unknown user");
                return Ok(());
            };
            ctx.net.apply_user_modes(id, modes)?;
            return Ok(());
        }

        let Some(current) = ctx.net.find_channel(target).map(|c| c.ts) else {
            debug!(channel = %target, "MODE for nonexistent channel");
            return Ok(());
        };
        let params: Vec<&str> = msg.args.iter().skip(2).copied().collect();
        let consumed = ModeChange::parse(ctx.net.caps(), modes, &params)
            .iter()
            .filter(|c| c.param.is_some())
            .count();
        let ts = params
            .get(consumed)
            .and_then(|t| t.parse::<i64>().ok())
            .unwrap_or(0);
        if ts != 0 && ts > current {
            debug!(channel = %target, ts, current, "Ignoring MODE with newer TS");
            return Ok(());
        }
        let effects = ctx.net.apply_channel_modes(target, modes, &params[..consumed])?;
        ctx.apply(effects);
        Ok(())
    }
}

/// Handler for the K and OK commands.
pub struct KickHandler;

impl Handler for KickHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let channel = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let target = msg.arg(1).ok_or(HandlerError::NeedMoreParams)?;
        common::handle_kick(ctx, channel, target)
    }
}

/// Handler for the T command.
///
/// `T <channel> [<channel ts>] [<topic ts>] :<text>`. Without a topic TS the
/// current time is used; an older topic than ours is ignored.
pub struct TopicHandler;

impl Handler for TopicHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let channel = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let text = msg.args.last().copied().unwrap_or_default();
        let argc = msg.args.len();
        let Some(chan) = ctx.net.find_channel(channel) else {
            debug!(channel = %channel, "TOPIC for nonexistent channel");
            return Ok(());
        };

        let ts = if argc > 2 {
            msg.args[argc - 2].parse::<i64>().unwrap_or(0)
        } else {
            0
        };
        let ts = if ts == 0 {
            chrono::Utc::now().timestamp()
        } else if chan.topic.as_ref().is_some_and(|t| ts < t.set_at) {
            return Ok(());
        } else {
            ts
        };

        let setter = ctx.source_name();
        ctx.net.set_topic(channel, &setter, ts, text)?;
        Ok(())
    }
}
