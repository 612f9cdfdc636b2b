//! Logging setup and span constructors.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Install the global tracing subscriber. `RUST_LOG` overrides the
/// configured filter.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    if let Err(e) = installed {
        // Already installed, e.g. by a test harness.
        tracing::debug!(error = %e, "Tracing subscriber not installed");
    }
}

/// Standardized span constructors for link observability.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span covering one uplink session.
    pub fn session(uplink: &str, address: &str) -> Span {
        info_span!("uplink", uplink = %uplink, address = %address)
    }
}
