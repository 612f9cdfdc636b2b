//! P10 link management.

use slirc_link::{RawMessage, fold_eq};
use tracing::{debug, error, info};

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::common::{self, parse_hops};
use crate::handlers::core::{Context, Handler, Source};

/// Handler for the PASS command.
pub struct PassHandler;

impl Handler for PassHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let password = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        if !ctx.link.password_matches(password) {
            error!(uplink = %ctx.link.uplink_name, "Uplink sent an invalid password");
            ctx.link.request_close("Invalid password");
        }
        Ok(())
    }
}

/// Handler for the SERVER and S commands.
///
/// `SERVER <name> <hops> <boot ts> <link ts> <protocol> <numeric+capacity>
/// <flags> :<description>`. A protocol starting with `P` means the server
/// has already finished its own burst.
pub struct ServerHandler;

impl Handler for ServerHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let arg = |i: usize| msg.arg(i).ok_or(HandlerError::NeedMoreParams);
        let name = arg(0)?;
        let hops = parse_hops(arg(1)?)?;
        let protocol = arg(4)?;
        let numeric = arg(5)?;
        let numeric = numeric.get(..2).unwrap_or(numeric);
        let description = msg.args.last().copied().unwrap_or_default();

        debug!(
            server = %name,
            numeric = %numeric,
            synced = protocol.starts_with('P'),
            "New server"
        );
        common::handle_server(ctx, name, Some(numeric), hops, description)?;
        if protocol.starts_with('P') {
            ctx.net.mark_pre_synced(name)?;
        }
        Ok(())
    }
}

/// Handler for the SQ command.
pub struct SquitHandler;

impl Handler for SquitHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let target = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        info!(server = %target, reason = %msg.args.last().copied().unwrap_or_default(), "SQUIT");
        ctx.net.delete_server(target)?;
        Ok(())
    }
}

/// Handler for the G (ping) command.
///
/// `AB G !1119920789.573932 services.test 1119920789.573932`
pub struct PingHandler;

impl Handler for PingHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let origin = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let target = match &ctx.source {
            Source::User(_) => ctx.source_name(),
            _ if !origin.starts_with('!') => ctx.source_name(),
            _ => origin.to_string(),
        };
        ctx.dialect.pong(ctx.out, &target);
        Ok(())
    }
}

/// Handler for the Z (pong) command.
pub struct PongHandler;

impl Handler for PongHandler {
    fn handle(&self, ctx: &mut Context<'_>, _msg: &RawMessage<'_>) -> HandlerResult {
        ctx.link.record_pong();
        common::finish_burst(ctx);
        Ok(())
    }
}

/// Handler for the EB (end of burst) command.
///
/// The uplink's EB is acknowledged with EA and ends our bursting phase.
pub struct EndOfBurstHandler;

impl Handler for EndOfBurstHandler {
    fn handle(&self, ctx: &mut Context<'_>, _msg: &RawMessage<'_>) -> HandlerResult {
        let server = ctx.source_server()?.to_string();
        common::handle_eob(ctx, &server)?;
        let from_uplink = ctx.net.uplink().is_some_and(|u| fold_eq(&u.name, &server));
        if from_uplink {
            ctx.dialect.burst_ack(ctx.out);
            common::finish_burst(ctx);
        }
        Ok(())
    }
}

/// Handler for the Y and ERROR commands.
pub struct ErrorHandler;

impl Handler for ErrorHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let text = msg.args.last().copied().unwrap_or_default();
        info!(uplink = %ctx.link.uplink_name, error = %text, "ERROR from uplink");
        Ok(())
    }
}
