//! slirc-services - IRC services daemon core.
//!
//! Links to a single uplink server as a pseudo-server, mirrors the network
//! it learns about from the uplink's burst, and keeps a set of configured
//! pseudo-clients present on the network. Two server-to-server dialects are
//! supported: TS6 (charybdis family) and P10 (nefarious family).

pub mod config;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod uplink;

pub use config::Config;
pub use error::{DispatchError, HandlerError, StateError, UplinkError};
pub use uplink::Services;
