//! Command dispatch table.
//!
//! One entry per token: the handler, the fewest arguments it accepts and the
//! source kinds it may come from. The table knows nothing about dialects;
//! each dialect registers the tokens it speaks at startup and the table is
//! read-only afterwards. Usage counters are atomics so dispatch only needs
//! `&self`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use slirc_link::RawMessage;
use tracing::debug_span;

use super::context::Context;
use super::traits::{Handler, SourceKinds};
use crate::error::DispatchError;

struct Entry {
    handler: Box<dyn Handler>,
    min_args: usize,
    sources: SourceKinds,
    calls: AtomicU64,
}

/// Registry of inbound command handlers.
#[derive(Default)]
pub struct DispatchTable {
    entries: HashMap<String, Entry>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Tokens are case-insensitive; registering the same
    /// token twice is an error.
    pub fn register(
        &mut self,
        token: &str,
        handler: impl Handler + 'static,
        min_args: usize,
        sources: SourceKinds,
    ) -> Result<(), DispatchError> {
        let token = token.to_ascii_uppercase();
        if self.entries.contains_key(&token) {
            return Err(DispatchError::DuplicateToken(token));
        }
        self.entries.insert(
            token,
            Entry {
                handler: Box::new(handler),
                min_args,
                sources,
                calls: AtomicU64::new(0),
            },
        );
        Ok(())
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains_key(&token.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Route a decoded message to its handler.
    pub fn dispatch(&self, ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> Result<(), DispatchError> {
        let command = msg.command.to_ascii_uppercase();
        let Some(entry) = self.entries.get(&command) else {
            return Err(DispatchError::UnknownCommand(command));
        };

        let kind = ctx.source.kind();
        if !entry.sources.allows(kind) {
            return Err(DispatchError::SourceNotAllowed {
                command,
                kind: kind.as_str(),
            });
        }
        if msg.args.len() < entry.min_args {
            return Err(DispatchError::NeedMoreParams {
                command,
                min: entry.min_args,
                got: msg.args.len(),
            });
        }

        entry.calls.fetch_add(1, Ordering::Relaxed);
        let span = debug_span!(
            "link.command",
            command = %command,
            source = kind.as_str(),
            origin = msg.origin.as_str().unwrap_or("-"),
        );
        let _enter = span.enter();
        entry
            .handler
            .handle(ctx, msg)
            .map_err(|source| DispatchError::Handler { command, source })
    }

    /// Usage counts of every command seen at least once, busiest first.
    pub fn command_stats(&self) -> Vec<(&str, u64)> {
        let mut stats: Vec<_> = self
            .entries
            .iter()
            .map(|(cmd, entry)| (cmd.as_str(), entry.calls.load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();
        stats.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        stats
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("commands", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HandlerError, HandlerResult};
    use crate::handlers::core::context::tests::Harness;
    use crate::handlers::core::context::Source;
    use slirc_link::Framing;

    struct Nop;

    impl Handler for Nop {
        fn handle(&self, _ctx: &mut Context<'_>, _msg: &RawMessage<'_>) -> HandlerResult {
            Ok(())
        }
    }

    struct Fails;

    impl Handler for Fails {
        fn handle(&self, _ctx: &mut Context<'_>, msg: &RawMessage<'_>) -> HandlerResult {
            Err(HandlerError::NoSuchChannel(msg.args[0].to_string()))
        }
    }

    fn decode(line: &str) -> RawMessage<'_> {
        RawMessage::decode(line, Framing::Rfc1459, true).unwrap()
    }

    #[test]
    fn test_duplicate_registration_is_refused() {
        let mut table = DispatchTable::new();
        table.register("ping", Nop, 1, SourceKinds::SERVER).unwrap();
        assert!(table.contains("PING"));
        assert!(matches!(
            table.register("PING", Nop, 1, SourceKinds::SERVER),
            Err(DispatchError::DuplicateToken(t)) if t == "PING"
        ));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_rejections_in_order() {
        let mut table = DispatchTable::new();
        table.register("SJOIN", Nop, 4, SourceKinds::SERVER).unwrap();
        let mut h = Harness::new();

        let mut ctx = h.context(Source::Unregistered);
        let err = table.dispatch(&mut ctx, &decode("FOO bar")).unwrap_err();
        assert_eq!(err.error_code(), "unknown_command");

        let err = table.dispatch(&mut ctx, &decode("SJOIN 1 #a + :x")).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::SourceNotAllowed { kind: "unregistered", .. }
        ));

        let mut ctx = h.context(Source::Server("hub.test".into()));
        let err = table.dispatch(&mut ctx, &decode(":hub.test SJOIN 1 #a")).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::NeedMoreParams { min: 4, got: 2, .. }
        ));
        table
            .dispatch(&mut ctx, &decode(":hub.test sjoin 1 #a + :x"))
            .unwrap();
        assert_eq!(table.command_stats(), vec![("SJOIN", 1)]);
    }

    #[test]
    fn test_handler_errors_are_wrapped() {
        let mut table = DispatchTable::new();
        table.register("TB", Fails, 1, SourceKinds::SERVER).unwrap();
        let mut h = Harness::new();
        let mut ctx = h.context(Source::Server("hub.test".into()));
        let err = table.dispatch(&mut ctx, &decode(":hub.test TB #gone")).unwrap_err();
        assert_eq!(err.to_string(), "TB failed: no such channel: #gone");
    }
}
