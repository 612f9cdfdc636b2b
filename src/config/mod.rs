//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, ProtocolConfig, LoggingConfig)
//! - [`uplink`]: Uplink connection block and its timers
//! - [`service`]: Pseudo-client blocks introduced on link
//! - [`validation`]: Semantic checks run once at startup

mod service;
mod types;
mod uplink;
mod validation;

pub use service::ServiceBlock;
pub use types::{Config, ConfigError, DialectKind, LogFormat, LoggingConfig, ProtocolConfig, ServerConfig};
pub use uplink::UplinkBlock;
pub use validation::{ValidationError, validate};
