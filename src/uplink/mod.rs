//! Uplink connection.
//!
//! - [`link`]: per-connection state (burst timing, liveness, kill guard)
//! - [`session`]: the event loop driving one connection

mod link;
mod session;

pub use link::{CloseRequest, LinkState};
pub use session::Services;
