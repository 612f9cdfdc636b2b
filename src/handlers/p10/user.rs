//! P10 user introduction, renames, quits and kills.

use slirc_link::{RawMessage, p10};
use tracing::debug;

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::common::{self, parse_ts};
use crate::handlers::core::{Context, Handler, Source};
use crate::state::NewUser;

/// Handler for the N command.
///
/// From a server with eight or more arguments it introduces a client:
/// `nick hops ts user host [+modes [params]] ip numeric :gecos`, the IP
/// being base64. From a user with two it is a rename (`newnick ts`).
pub struct NickHandler;

impl Handler for NickHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let arg = |i: usize| msg.arg(i).ok_or(HandlerError::NeedMoreParams);
        let argc = msg.args.len();
        match ctx.source.clone() {
            Source::Server(server) if argc >= 8 => {
                let numeric = arg(argc - 2)?;
                if !p10::is_client_numeric(numeric) {
                    return Err(HandlerError::ProtocolError(format!(
                        "bad client numeric {numeric}"
                    )));
                }
                let modes = arg(5).ok().filter(|m| m.starts_with('+')).unwrap_or("+");
                let ip = p10::decode_ipv4(arg(argc - 3)?).map(|ip| ip.to_string());
                let new = NewUser {
                    nick: arg(0)?,
                    user: arg(3)?,
                    host: arg(4)?,
                    vhost: None,
                    ip: ip.as_deref(),
                    uid: Some(numeric),
                    gecos: arg(argc - 1)?,
                    server: &server,
                    ts: parse_ts(arg(2)?)?,
                };
                debug!(nick = %new.nick, server = %server, "New user");
                common::introduce(ctx, new, modes)
            }
            Source::User(id) if argc == 2 => {
                common::rename(ctx, id, arg(0)?, parse_ts(arg(1)?)?)
            }
            source => {
                debug!(args = argc, source = source.kind().as_str(), "Unrecognized N form");
                Ok(())
            }
        }
    }
}

/// Handler for the Q command.
pub struct QuitHandler;

impl Handler for QuitHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let id = ctx.source_user()?;
        debug!(nick = %ctx.source_name(), reason = %msg.arg(0).unwrap_or_default(), "QUIT");
        ctx.net.delete_user(id);
        Ok(())
    }
}

/// Handler for the D (kill) command.
pub struct KillHandler;

impl Handler for KillHandler {
    fn handle(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
        let victim = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let reason = msg.arg(1).unwrap_or("<No reason given>");
        common::handle_kill(ctx, victim, reason)
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use crate::config::ServiceBlock;
    use crate::error::{DispatchError, HandlerError};
    use crate::handlers::LineOutcome;
    use crate::handlers::core::context::tests::Harness;
    use crate::services::Roster;

    #[test]
    fn test_introduction_with_modes() {
        let mut h = Harness::p10();
        h.ok("AB N alice 1 1700000000 alice example.com +iow B]AAAB ABAAA :Alice Example");
        let alice = h.net.find_user("ABAAA").unwrap();
        assert_eq!(alice.nick, "alice");
        assert_eq!(alice.ip, Some(Ipv4Addr::LOCALHOST.into()));
        assert_eq!(alice.gecos, "Alice Example");
        assert!(alice.flags.invisible && alice.flags.oper);
        assert_eq!(alice.server, "hub.test");
    }

    #[test]
    fn test_introduction_without_modes() {
        let mut h = Harness::p10();
        h.ok("AB N bob 1 1700000000 bob example.net AAAAAA ABAAB :Bob");
        let bob = h.net.find_user("bob").unwrap();
        assert_eq!(bob.uid.as_deref(), Some("ABAAB"));
        assert!(!bob.flags.invisible);
    }

    #[test]
    fn test_rename_and_quit() {
        let mut h = Harness::p10();
        h.ok("AB N alice 1 1700000000 alice example.com +i B]AAAB ABAAA :Alice");
        h.ok("ABAAA N alicia 1700000300");
        assert_eq!(h.net.find_user("ABAAA").unwrap().nick, "alicia");
        h.ok("ABAAA Q :Bye");
        assert!(h.net.find_user("alicia").is_none());
    }

    #[test]
    fn test_introduction_with_bad_numeric_is_refused() {
        let mut h = Harness::p10();
        for line in [
            "AB N bob 1 1700000000 bob example.net AAAAAA ABAA :Bob",
            "AB N bob 1 1700000000 bob example.net AAAAAA AB-AB :Bob",
        ] {
            assert!(matches!(
                h.feed(line),
                LineOutcome::Rejected(DispatchError::Handler {
                    source: HandlerError::ProtocolError(_),
                    ..
                })
            ));
        }
        assert_eq!(h.net.user_count(), 0);
    }

    #[test]
    fn test_odd_nick_forms_are_ignored() {
        let mut h = Harness::p10();
        h.ok("AB N alice 1700000000 extra");
        assert_eq!(h.net.user_count(), 0);
    }

    #[test]
    fn test_kill_of_service() {
        let mut h = Harness::p10();
        h.roster = Roster::new(vec![ServiceBlock {
            nick: "NickServ".into(),
            user: "ns".into(),
            host: "services.test".into(),
            gecos: "Nick Services".into(),
            channels: Vec::new(),
        }]);
        h.roster
            .introduce_all(&mut h.net, h.dialect.as_ref(), &mut h.out);
        h.out.take();

        h.ok("AB D SVAAA :hub.test (test)");
        let lines = h.out.take();
        assert_eq!(
            lines[0],
            "SV WA :hub.test killed service NickServ (hub.test (test))"
        );
        assert!(lines[1].starts_with("SV N NickServ 1 "));
        assert!(lines[1].ends_with(" SVAAB :Nick Services"));
        assert_eq!(h.net.find_user("NickServ").unwrap().uid.as_deref(), Some("SVAAB"));
    }

    #[test]
    fn test_kill_of_remote_user() {
        let mut h = Harness::p10();
        h.ok("AB N alice 1 1700000000 alice example.com +i B]AAAB ABAAA :Alice");
        h.ok("AB D ABAAA");
        assert!(h.net.find_user("alice").is_none());
    }
}
