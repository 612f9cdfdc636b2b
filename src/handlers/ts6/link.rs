//! TS6 link management: registration, server tree, ping/pong.

use slirc_link::{RawMessage, fold_eq};
use tracing::{debug, error, info};

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::common::{self, parse_hops};
use crate::handlers::core::{Context, Handler};

/// Handler for the PASS command.
///
/// `PASS <password> TS <version> :<sid>`
pub struct PassHandler;

impl Handler for PassHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let password = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        if !ctx.link.password_matches(password) {
            error!(uplink = %ctx.link.uplink_name, "Uplink sent an invalid password");
            ctx.link.request_close("Invalid password");
            return Ok(());
        }
        if msg.args.len() > 3
            && msg.arg(2).and_then(|v| v.parse::<u32>().ok()).is_some_and(|v| v >= 6)
        {
            ctx.link.uplink_sid = msg.arg(3).map(str::to_string);
        }
        Ok(())
    }
}

/// Handler for the CAPAB command.
pub struct CapabHandler;

impl Handler for CapabHandler {
    fn handle(&self, _ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        debug!(capab = %msg.args.join(" "), "Uplink capabilities");
        Ok(())
    }
}

/// Handler for the SERVER command.
///
/// `SERVER <name> <hops> :<description>`. From the unregistered uplink this
/// registers the link, using the SID from its `PASS`.
pub struct ServerHandler;

impl Handler for ServerHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let name = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let hops = parse_hops(msg.arg(1).ok_or(HandlerError::NeedMoreParams)?)?;
        let description = msg.args.last().copied().unwrap_or_default();
        let sid = if ctx.net.is_registered() {
            None
        } else {
            ctx.link.uplink_sid.clone()
        };

        let became_uplink = common::handle_server(ctx, name, sid.as_deref(), hops, description)?;
        if became_uplink {
            ctx.dialect.ping(ctx.out, None);
        } else {
            ctx.dialect.ping(ctx.out, Some(name));
        }
        Ok(())
    }
}

/// Handler for the SID command.
///
/// `SID <name> <hops> <sid> :<description>`
pub struct SidHandler;

impl Handler for SidHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let name = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let hops = parse_hops(msg.arg(1).ok_or(HandlerError::NeedMoreParams)?)?;
        let sid = msg.arg(2).ok_or(HandlerError::NeedMoreParams)?;
        let description = msg.arg(3).ok_or(HandlerError::NeedMoreParams)?;

        common::handle_server(ctx, name, Some(sid), hops, description)?;
        // The PONG to this marks its end of burst.
        ctx.dialect.ping(ctx.out, Some(sid));
        Ok(())
    }
}

/// Handler for the SQUIT command.
pub struct SquitHandler;

impl Handler for SquitHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let target = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let reason = msg.arg(1).unwrap_or_default();
        info!(server = %target, reason = %reason, "SQUIT");
        ctx.net.delete_server(target)?;
        Ok(())
    }
}

/// Handler for the PING command.
pub struct PingHandler;

impl Handler for PingHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let origin = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        ctx.dialect.pong(ctx.out, origin);
        Ok(())
    }
}

/// Handler for the PONG command.
///
/// A PONG answers the PING sent when the server was introduced, so it marks
/// that server's end of burst. The uplink's PONG also ends ours.
pub struct PongHandler;

impl Handler for PongHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let name = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        if ctx.net.find_server(name).is_some() {
            common::handle_eob(ctx, name)?;
        }
        let from_uplink = ctx.net.uplink().is_some_and(|u| fold_eq(&u.name, name));
        if from_uplink {
            ctx.link.record_pong();
            common::finish_burst(ctx);
        }
        Ok(())
    }
}

/// Handler for the ERROR command.
pub struct ErrorHandler;

impl Handler for ErrorHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let text = msg.arg(0).unwrap_or_default();
        info!(uplink = %ctx.link.uplink_name, error = %text, "ERROR from uplink");
        Ok(())
    }
}
