//! TS6 user introduction, renames, quits and kills.

use slirc_link::RawMessage;
use tracing::debug;

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::common::{self, parse_ts};
use crate::handlers::core::{Context, Handler, Source};
use crate::state::NewUser;

/// Handler for the UID command.
///
/// Nine arguments: `nick hops ts umodes user host ip uid :gecos`.
/// Ten or more: `nick hops ts umodes user host uid realhost ip [account] :gecos`.
pub struct UidHandler;

impl Handler for UidHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let server = ctx.source_server()?.to_string();
        let arg = |i: usize| msg.arg(i).ok_or(HandlerError::NeedMoreParams);
        let gecos = msg.args.last().copied().unwrap_or_default();

        let (host, vhost, ip, uid) = if msg.args.len() == 9 {
            (arg(5)?, None, arg(6)?, arg(7)?)
        } else {
            let realhost = arg(7)?;
            let host = if realhost == "*" { arg(5)? } else { realhost };
            (host, Some(arg(5)?), arg(8)?, arg(6)?)
        };

        let new = NewUser {
            nick: arg(0)?,
            user: arg(4)?,
            host,
            vhost,
            ip: Some(ip),
            uid: Some(uid),
            gecos,
            server: &server,
            ts: parse_ts(arg(2)?)?,
        };
        debug!(nick = %new.nick, uid = %uid, server = %server, "UID");
        common::introduce(ctx, new, arg(3)?)
    }
}

/// Handler for the EUID command.
///
/// `nick hops ts umodes user host ip uid realhost account :gecos`, where
/// `realhost` is `*` when it equals the visible host.
pub struct EuidHandler;

impl Handler for EuidHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let server = ctx.source_server()?.to_string();
        let arg = |i: usize| msg.arg(i).ok_or(HandlerError::NeedMoreParams);
        let vhost = arg(5)?;
        let realhost = arg(8)?;

        let new = NewUser {
            nick: arg(0)?,
            user: arg(4)?,
            host: if realhost == "*" { vhost } else { realhost },
            vhost: Some(vhost),
            ip: Some(arg(6)?),
            uid: Some(arg(7)?),
            gecos: msg.args.last().copied().unwrap_or_default(),
            server: &server,
            ts: parse_ts(arg(2)?)?,
        };
        common::introduce(ctx, new, arg(3)?)
    }
}

/// Handler for the NICK command.
///
/// From a server with eight arguments it introduces a UID-less client
/// (`nick hops ts umodes user host server :gecos`); from a user with two it
/// is a rename (`newnick ts`).
pub struct NickHandler;

impl Handler for NickHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let arg = |i: usize| msg.arg(i).ok_or(HandlerError::NeedMoreParams);
        match (ctx.source.clone(), msg.args.len()) {
            (Source::Server(_), 8) => {
                let new = NewUser {
                    nick: arg(0)?,
                    user: arg(4)?,
                    host: arg(5)?,
                    vhost: None,
                    ip: None,
                    uid: None,
                    gecos: arg(7)?,
                    server: arg(6)?,
                    ts: parse_ts(arg(2)?)?,
                };
                common::introduce(ctx, new, arg(3)?)
            }
            (Source::User(id), 2) => common::rename(ctx, id, arg(0)?, parse_ts(arg(1)?)?),
            (_, n) => {
                debug!(args = n, "Unrecognized NICK form");
                Ok(())
            }
        }
    }
}

/// Handler for the QUIT command.
pub struct QuitHandler;

impl Handler for QuitHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let id = ctx.source_user()?;
        let nick = ctx.source_name();
        debug!(nick = %nick, reason = %msg.arg(0).unwrap_or_default(), "QUIT");
        ctx.net.delete_user(id);
        Ok(())
    }
}

/// Handler for the KILL command.
pub struct KillHandler;

impl Handler for KillHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let victim = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let reason = msg.arg(1).unwrap_or("<No reason given>");
        common::handle_kill(ctx, victim, reason)
    }
}

/// Handler for the CHGHOST command.
///
/// `CHGHOST <target> <host>`. Unknown targets are ignored.
pub struct ChghostHandler;

impl Handler for ChghostHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let target = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let host = msg.arg(1).ok_or(HandlerError::NeedMoreParams)?;
        let Some(id) = ctx.net.user_id(target) else {
            debug!(target = %target, "CHGHOST for unknown user");
            return Ok(());
        };
        ctx.net.set_vhost(id, host)?;
        Ok(())
    }
}
