//! Property-based tests for link message decoding.
//!
//! Checks that:
//! 1. Decoding never panics, whatever the line holds
//! 2. Middle tokens and the trailing argument come back exactly
//! 3. Both framings agree on colon-prefixed lines

use proptest::prelude::*;
use slirc_link::{Framing, Origin, RawMessage};

// =============================================================================
// STRATEGIES
// =============================================================================

fn origin_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[0-9][A-Z0-9]{2}([A-Z0-9]{6})?|[a-z][a-z0-9.]{0,20}")
        .expect("valid regex")
}

fn command_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z]{1,8}|[0-9]{3}").expect("valid regex")
}

/// Middle arguments: no spaces, never starting with `:`.
fn middle_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9#@+%!.*\\[\\]{}|^-][a-zA-Z0-9#@+%!.*:\\[\\]{}|^-]{0,15}")
        .expect("valid regex")
}

fn trailing_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 :#@!.,()-]{0,60}").expect("valid regex")
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn decode_never_panics(line in "\\PC{0,200}") {
        let _ = RawMessage::decode(&line, Framing::Rfc1459, true);
        let _ = RawMessage::decode(&line, Framing::P10, true);
        let _ = RawMessage::decode(&line, Framing::P10, false);
    }

    #[test]
    fn arguments_survive_decoding(
        origin in origin_strategy(),
        command in command_strategy(),
        middles in prop::collection::vec(middle_strategy(), 0..20),
        trailing in trailing_strategy(),
    ) {
        let mut line = format!(":{origin} {command}");
        for m in &middles {
            line.push(' ');
            line.push_str(m);
        }
        line.push_str(" :");
        line.push_str(&trailing);

        let msg = RawMessage::decode(&line, Framing::Rfc1459, true).unwrap();
        prop_assert_eq!(msg.origin, Origin::Prefix(origin.as_str()));
        prop_assert_eq!(msg.command, command.as_str());
        prop_assert_eq!(msg.args.len(), middles.len() + 1);
        for (got, want) in msg.args.iter().zip(&middles) {
            prop_assert_eq!(*got, want.as_str());
        }
        prop_assert_eq!(msg.args[middles.len()], trailing.as_str());
    }

    #[test]
    fn framings_agree_on_prefixed_lines(
        origin in origin_strategy(),
        command in command_strategy(),
        middles in prop::collection::vec(middle_strategy(), 0..6),
    ) {
        let line = format!(":{origin} {command} {}", middles.join(" "));
        let classic = RawMessage::decode(&line, Framing::Rfc1459, true);
        let p10 = RawMessage::decode(&line, Framing::P10, true);
        prop_assert_eq!(classic, p10);
    }
}
