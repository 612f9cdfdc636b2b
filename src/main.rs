//! slservices - IRC services daemon.

use anyhow::Context;
use slirc_services::{Config, Services, UplinkError, telemetry};
use tokio::signal::ctrl_c;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "services.toml".to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;
    telemetry::init(&config.logging);

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!(path = %config_path, error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {config_path}", errors.len());
    }

    info!(
        server = %config.server.name,
        dialect = config.protocol.dialect.as_str(),
        uplink = %config.uplink.name,
        services = config.services.len(),
        "Starting slservices"
    );

    let reconnect_delay = config.uplink.reconnect_delay();
    let mut services = Services::new(config).context("failed to build dispatch table")?;

    loop {
        let reason = tokio::select! {
            reason = services.connect() => reason,
            _ = ctrl_c() => {
                info!("Interrupted, shutting down");
                return Ok(());
            }
        };
        if let UplinkError::Shutdown(_) = reason {
            return Err(anyhow::Error::new(reason).context("services stopped"));
        }

        info!(
            delay_secs = reconnect_delay.as_secs(),
            reason = %reason,
            "Reconnecting to uplink"
        );
        tokio::select! {
            _ = tokio::time::sleep(reconnect_delay) => {}
            _ = ctrl_c() => {
                info!("Interrupted, shutting down");
                return Ok(());
            }
        }
    }
}
