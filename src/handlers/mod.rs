//! Inbound command handlers.
//!
//! [`core`] holds the dialect-agnostic machinery. Each dialect module
//! registers its own tokens into the shared [`DispatchTable`]; behaviour
//! both dialects share (kills, server introductions, end of burst) lives in
//! [`common`].

pub mod common;
pub mod core;
pub mod p10;
pub mod ts6;

pub use self::core::{
    Context, DispatchTable, Handler, LineOutcome, Pipeline, Source, SourceKind, SourceKinds,
    apply_effects,
};
