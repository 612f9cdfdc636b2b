//! Core handler infrastructure: the handler trait, its context, the
//! dispatch table and the line pipeline that feeds it.

pub mod context;
pub mod pipeline;
pub mod registry;
pub mod traits;

pub use context::{Context, Source, apply_effects};
pub use pipeline::{LineOutcome, Pipeline};
pub use registry::DispatchTable;
pub use traits::{Handler, SourceKind, SourceKinds};
