//! Behaviour shared by every dialect's handlers.

use slirc_link::fold_eq;
use tracing::{debug, error, info, warn};

use super::core::{Context, Source};
use crate::error::{HandlerError, HandlerResult};
use crate::services;
use crate::state::{IntroduceOutcome, NewUser, RenameOutcome, UserId};

pub fn parse_ts(s: &str) -> Result<i64, HandlerError> {
    s.parse()
        .map_err(|_| HandlerError::ProtocolError(format!("Invalid timestamp: {s}")))
}

pub fn parse_hops(s: &str) -> Result<u32, HandlerError> {
    s.parse()
        .map_err(|_| HandlerError::ProtocolError(format!("Invalid hopcount: {s}")))
}

/// Strip a kill path (`server!server!oper (reason)`) down to `(reason)`.
///
/// The first word only counts as a path if it contains `!` or `.` and none
/// of the characters that can appear in a free-form reason.
pub fn skip_kill_path(reason: &str) -> &str {
    let mut path_like = false;
    for (i, c) in reason.char_indices() {
        match c {
            ' ' => {
                return if path_like { &reason[i + 1..] } else { reason };
            }
            '<' | '>' | '(' | ')' | '#' | '&' | '?' | '%' | '$' | ',' | ';' => return reason,
            '!' | '.' => path_like = true,
            _ => {}
        }
    }
    reason
}

/// Who the source of a kill is, as shown to opers and as used in the quit
/// reason.
fn killer_names(ctx: &Context<'_>) -> (String, String) {
    match &ctx.source {
        Source::User(id) => match ctx.net.user(*id) {
            Some(u) => {
                let server = ctx
                    .net
                    .find_server(&u.server)
                    .map(|s| s.name.as_str())
                    .unwrap_or(&u.server);
                (
                    format!("{}!{}@{}{{{}}}", u.nick, u.user, u.vhost, server),
                    u.nick.clone(),
                )
            }
            None => ("<unknown>".to_string(), "<unknown>".to_string()),
        },
        Source::Server(name) => (name.clone(), name.clone()),
        Source::Unregistered => (ctx.link.uplink_name.clone(), ctx.link.uplink_name.clone()),
    }
}

/// Quit reason recorded for a killed client.
fn kill_quit_reason(source: &str, reason: &str) -> String {
    let stripped = skip_kill_path(reason);
    if stripped.starts_with('[') || stripped.starts_with("Killed") {
        stripped.to_string()
    } else if stripped.len() == reason.len() {
        format!("Killed ({source} ({reason}))")
    } else {
        format!("Killed ({source} {stripped})")
    }
}

/// A client was killed. Remote clients are forgotten; our own are put back
/// unless we are losing a kill fight.
pub fn handle_kill(ctx: &mut Context<'_>, victim: &str, reason: &str) -> HandlerResult {
    handle_kill_at(ctx, victim, reason, chrono::Utc::now().timestamp())
}

/// [`handle_kill`] with the kill-fight clock at unix time `now`.
pub(crate) fn handle_kill_at(
    ctx: &mut Context<'_>,
    victim: &str,
    reason: &str,
    now: i64,
) -> HandlerResult {
    let (killer, source) = killer_names(ctx);
    let Some((id, nick, local, enforcer)) = ctx
        .net
        .find_user(victim)
        .map(|u| (u.id, u.nick.clone(), u.local, u.flags.enforcer))
    else {
        debug!(victim = %victim, killer = %killer, "KILL for unknown user");
        return Ok(());
    };

    if enforcer {
        info!(nick = %nick, killer = %killer, "Enforcer killed");
        ctx.net.delete_user(id);
        return Ok(());
    }

    if !local {
        debug!(nick = %nick, reason = %kill_quit_reason(&source, reason), "user_delete");
        ctx.net.delete_user(id);
        return Ok(());
    }

    warn!(nick = %nick, killer = %killer, reason = %reason, "Service client killed");
    ctx.wallops(&format!("{killer} killed service {nick} ({reason})"));

    let local_clients = ctx.net.local_users().count();
    if ctx.link.note_service_kill(now, local_clients) {
        ctx.roster.reintroduce(ctx.net, ctx.dialect, ctx.out, id)?;
    } else {
        error!(killer = %killer, nick = %nick, "Services kill fight, shutting down");
        ctx.wallops(&format!(
            "Services kill fight ({killer} -> {nick}), shutting down!"
        ));
        ctx.link.request_shutdown("Services kill fight");
    }
    Ok(())
}

/// A server introduction. Returns true when it registered the uplink.
pub fn handle_server(
    ctx: &mut Context<'_>,
    name: &str,
    sid: Option<&str>,
    hops: u32,
    description: &str,
) -> Result<bool, HandlerError> {
    match &ctx.source {
        Source::Server(parent) => {
            let parent = parent.clone();
            debug!(server = %name, parent = %parent, "New server");
            Ok(ctx
                .net
                .add_server(name, sid, hops, Some(&parent), description)?)
        }
        Source::Unregistered => {
            if ctx.net.server_count() != 1 {
                return Err(HandlerError::ProtocolError(
                    "unregistered/unknown server attempting to introduce another server".into(),
                ));
            }
            if !fold_eq(name, &ctx.link.uplink_name) {
                error!(
                    server = %name,
                    expected = %ctx.link.uplink_name,
                    "Server name does not match the configured uplink"
                );
            }
            Ok(ctx.net.add_server(name, sid, hops, None, description)?)
        }
        Source::User(_) => Err(HandlerError::WrongSource("server")),
    }
}

/// End of burst for a server and any pre-synced children.
pub fn handle_eob(ctx: &mut Context<'_>, server: &str) -> HandlerResult {
    let already = ctx
        .net
        .find_server(server)
        .ok_or_else(|| HandlerError::NoSuchServer(server.to_string()))?
        .flags
        .eob;
    if !already {
        ctx.net.server_eob(server)?;
    }
    Ok(())
}

/// Leave our own bursting phase and tell the opers how long it took.
pub fn finish_burst(ctx: &mut Context<'_>) {
    let Some(elapsed) = ctx.link.finish_burst() else {
        return;
    };
    let ms = elapsed.as_millis();
    let (amount, unit) = if ms > 1000 { (ms / 1000, "s") } else { (ms, "ms") };
    info!(
        elapsed_ms = ms as u64,
        servers = ctx.net.server_count(),
        users = ctx.net.user_count(),
        channels = ctx.net.channel_count(),
        "Finished synchronizing with network"
    );
    ctx.wallops(&format!(
        "Finished synchronizing with network in {amount} {unit}."
    ));
}

/// Add a remote user and apply its initial modes, or send whatever the
/// collision resolver decided.
pub fn introduce(ctx: &mut Context<'_>, new: NewUser<'_>, modes: &str) -> HandlerResult {
    match ctx.net.introduce_user(new)? {
        IntroduceOutcome::Created(id) => {
            ctx.net.apply_user_modes(id, modes)?;
        }
        IntroduceOutcome::Unchanged(_) => {}
        IntroduceOutcome::Rejected(effects) => ctx.apply(effects),
    }
    Ok(())
}

pub fn rename(ctx: &mut Context<'_>, id: UserId, nick: &str, ts: i64) -> HandlerResult {
    if let RenameOutcome::Removed(effects) = ctx.net.change_nick(id, nick, ts)? {
        ctx.apply(effects);
    }
    Ok(())
}

/// A user was kicked. Our own clients rejoin straight away.
pub fn handle_kick(ctx: &mut Context<'_>, channel: &str, target: &str) -> HandlerResult {
    let Some((id, nick, local)) = ctx
        .net
        .find_user(target)
        .map(|u| (u.id, u.nick.clone(), u.local))
    else {
        debug!(target = %target, channel = %channel, "KICK for nonexistent user");
        return Ok(());
    };
    let Some(chan) = ctx.net.find_channel(channel) else {
        debug!(channel = %channel, "KICK in nonexistent channel");
        return Ok(());
    };
    if chan.member(id).is_none() {
        debug!(nick = %nick, channel = %channel, "KICK of a non-member");
        return Ok(());
    }
    ctx.net.part(channel, id)?;
    if local {
        debug!(nick = %nick, channel = %channel, "Service kicked, rejoining");
        services::join_channel(ctx.net, ctx.dialect, ctx.out, id, channel)?;
    }
    Ok(())
}

/// Part a user from a channel it may or may not be in.
pub fn handle_part(ctx: &mut Context<'_>, channel: &str, id: UserId) {
    if let Err(e) = ctx.net.part(channel, id) {
        debug!(channel = %channel, error = %e, "PART ignored");
    }
}

/// Part a user from every channel (`JOIN 0`).
pub fn part_all(ctx: &mut Context<'_>, id: UserId) {
    let channels: Vec<String> = ctx
        .net
        .user(id)
        .map(|u| u.channels.iter().cloned().collect())
        .unwrap_or_default();
    for channel in channels {
        handle_part(ctx, &channel, id);
    }
}
