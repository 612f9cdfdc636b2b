//! Decode, resolve, dispatch.
//!
//! One inbound line runs through here to completion before the next is read.

use std::sync::Arc;

use slirc_link::{DecodeError, Origin, RawMessage};
use tracing::{debug, info, warn};

use super::context::{Context, Source};
use super::registry::DispatchTable;
use crate::error::DispatchError;
use crate::protocol::{Dialect, Outbox};
use crate::services::Roster;
use crate::state::Network;
use crate::uplink::LinkState;

/// What became of one line.
#[derive(Debug)]
pub enum LineOutcome {
    Handled,
    Malformed(DecodeError),
    /// The origin is not a server or user we know.
    UnknownOrigin(String),
    /// The origin is us or one of our own clients.
    SelfOriginated,
    Rejected(DispatchError),
}

/// Dispatch table and dialect, fixed for the life of the process.
pub struct Pipeline {
    table: DispatchTable,
    dialect: Arc<dyn Dialect>,
}

impl Pipeline {
    /// Build the table from the dialect's registrations.
    pub fn new(dialect: Arc<dyn Dialect>) -> Result<Self, DispatchError> {
        let mut table = DispatchTable::new();
        dialect.register(&mut table)?;
        debug!(dialect = dialect.caps().name, commands = table.len(), "Dispatch table built");
        Ok(Self { table, dialect })
    }

    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// Handle one inbound line.
    pub fn handle_line(
        &self,
        net: &mut Network,
        link: &mut LinkState,
        roster: &mut Roster,
        out: &mut Outbox,
        line: &str,
    ) -> LineOutcome {
        let framing = self.dialect.caps().framing;
        let msg = match RawMessage::decode(line, framing, net.is_registered()) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(error = %e, code = e.error_code(), "Dropping malformed line");
                return LineOutcome::Malformed(e);
            }
        };

        let source = match resolve(net, &msg.origin) {
            Resolved::Source(source) => source,
            Resolved::Local(origin) => {
                info!(origin = %origin, command = %msg.command, "Dropping message from ourselves");
                return LineOutcome::SelfOriginated;
            }
            Resolved::Unknown(origin) => {
                warn!(origin = %origin, command = %msg.command, "Dropping message from unknown origin");
                return LineOutcome::UnknownOrigin(origin);
            }
        };

        let mut ctx = Context {
            net,
            dialect: self.dialect.as_ref(),
            out,
            link,
            roster,
            source,
        };
        match self.table.dispatch(&mut ctx, &msg) {
            Ok(()) => LineOutcome::Handled,
            Err(e) => {
                match &e {
                    DispatchError::UnknownCommand(command) => {
                        debug!(command = %command, "Unknown command")
                    }
                    DispatchError::Handler { command, source } => warn!(
                        command = %command,
                        code = e.error_code(),
                        error = %source,
                        "Handler failed"
                    ),
                    _ => info!(code = e.error_code(), error = %e, "Message rejected"),
                }
                LineOutcome::Rejected(e)
            }
        }
    }
}

enum Resolved {
    Source(Source),
    Local(String),
    Unknown(String),
}

/// Look an origin up as a server, then as a user.
fn resolve(net: &Network, origin: &Origin<'_>) -> Resolved {
    let Some(name) = origin.as_str() else {
        return match net.uplink() {
            Some(uplink) => Resolved::Source(Source::Server(uplink.name.clone())),
            None => Resolved::Source(Source::Unregistered),
        };
    };
    if let Some(server) = net.find_server(name) {
        if server.local {
            return Resolved::Local(name.to_string());
        }
        return Resolved::Source(Source::Server(server.name.clone()));
    }
    if let Some(user) = net.find_user(name) {
        if user.local {
            return Resolved::Local(name.to_string());
        }
        return Resolved::Source(Source::User(user.id));
    }
    if net.is_registered() {
        Resolved::Unknown(name.to_string())
    } else {
        Resolved::Source(Source::Unregistered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Ts6;
    use crate::state::test_support::identity;
    use crate::state::Notifier;

    fn setup() -> (Pipeline, Network, LinkState, Roster, Outbox) {
        let dialect: Arc<dyn Dialect> = Arc::new(Ts6::new(identity()));
        let net = Network::new(
            identity(),
            Arc::new(dialect.caps().clone()),
            Arc::new(Notifier::new()),
        );
        (
            Pipeline::new(dialect).unwrap(),
            net,
            LinkState::new("hub.test", "linkpass"),
            Roster::default(),
            Outbox::new(),
        )
    }

    #[test]
    fn test_registration_then_resolution() {
        let (pipe, mut net, mut link, mut roster, mut out) = setup();
        let mut feed = |net: &mut Network, line: &str| {
            pipe.handle_line(net, &mut link, &mut roster, &mut out, line)
        };

        assert!(matches!(feed(&mut net, ""), LineOutcome::Malformed(_)));
        assert!(matches!(
            feed(&mut net, "PASS linkpass TS 6 :0HB"),
            LineOutcome::Handled
        ));
        assert!(matches!(
            feed(&mut net, "SERVER hub.test 1 :Hub"),
            LineOutcome::Handled
        ));
        assert!(net.is_registered());

        assert!(matches!(
            feed(&mut net, ":ghost.test PING :ghost.test"),
            LineOutcome::UnknownOrigin(o) if o == "ghost.test"
        ));
        assert!(matches!(
            feed(&mut net, ":0SV PING :services.test"),
            LineOutcome::SelfOriginated
        ));
        assert!(matches!(
            feed(&mut net, ":0HB FROB x"),
            LineOutcome::Rejected(DispatchError::UnknownCommand(_))
        ));
        assert!(matches!(
            feed(&mut net, "PING :hub.test"),
            LineOutcome::Handled
        ));
    }
}
