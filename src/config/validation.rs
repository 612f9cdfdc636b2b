//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{Config, DialectKind};
use std::collections::HashSet;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("server.description is required")]
    MissingDescription,
    #[error("server.sid is required for the ts6 dialect")]
    MissingSid,
    #[error("server.sid must be exactly 3 characters, got {0}")]
    InvalidSid(usize),
    #[error("server.sid must match pattern [0-9][A-Z0-9][A-Z0-9], got '{0}'")]
    InvalidSidFormat(String),
    #[error("server.numeric is required for the p10 dialect")]
    MissingNumeric,
    #[error("server.numeric must be 1-2 base64 characters, got '{0}'")]
    InvalidNumeric(String),
    #[error("uplink.name is required")]
    MissingUplinkName,
    #[error("uplink.hostname is required")]
    MissingUplinkHost,
    #[error("uplink.send_password must not be empty")]
    EmptySendPassword,
    #[error("uplink.receive_password must not be empty")]
    EmptyReceivePassword,
    #[error("uplink.{0} must be greater than zero")]
    ZeroTimeout(&'static str),
    #[error("uplink.ping_timeout ({timeout}s) must exceed uplink.ping_interval ({interval}s)")]
    PingTimeoutTooShort { interval: u64, timeout: u64 },
    #[error("protocol.max_line_len must be at least 512, got {0}")]
    LineLimitTooSmall(usize),
    #[error("service nick '{0}' is defined more than once")]
    DuplicateServiceNick(String),
    #[error("service '{0}' has an empty user, host or gecos")]
    IncompleteService(String),
    #[error("service '{nick}' channel '{channel}' must start with '#'")]
    InvalidServiceChannel { nick: String, channel: String },
}

fn is_valid_sid(sid: &str) -> bool {
    let b = sid.as_bytes();
    b.len() == 3
        && b[0].is_ascii_digit()
        && (b[1].is_ascii_uppercase() || b[1].is_ascii_digit())
        && (b[2].is_ascii_uppercase() || b[2].is_ascii_digit())
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Required fields
    if config.server.name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    }
    if config.server.description.is_empty() {
        errors.push(ValidationError::MissingDescription);
    }

    // Identity per dialect
    match config.protocol.dialect {
        DialectKind::Ts6 => match config.server.sid.as_deref() {
            None => errors.push(ValidationError::MissingSid),
            Some(sid) if sid.len() != 3 => errors.push(ValidationError::InvalidSid(sid.len())),
            Some(sid) if !is_valid_sid(sid) => {
                errors.push(ValidationError::InvalidSidFormat(sid.to_string()))
            }
            Some(_) => {}
        },
        DialectKind::P10 => match config.server.numeric.as_deref() {
            None => errors.push(ValidationError::MissingNumeric),
            Some(n) if !slirc_link::p10::is_server_numeric(n) => {
                errors.push(ValidationError::InvalidNumeric(n.to_string()))
            }
            Some(_) => {}
        },
    }

    // Uplink
    let uplink = &config.uplink;
    if uplink.name.is_empty() {
        errors.push(ValidationError::MissingUplinkName);
    }
    if uplink.hostname.is_empty() {
        errors.push(ValidationError::MissingUplinkHost);
    }
    if uplink.send_password.is_empty() {
        errors.push(ValidationError::EmptySendPassword);
    }
    if uplink.receive_password.as_deref() == Some("") {
        errors.push(ValidationError::EmptyReceivePassword);
    }
    for (field, value) in [
        ("connect_timeout", uplink.connect_timeout),
        ("ping_interval", uplink.ping_interval),
        ("ping_timeout", uplink.ping_timeout),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(field));
        }
    }
    if uplink.ping_interval > 0 && uplink.ping_timeout > 0 && uplink.ping_timeout <= uplink.ping_interval
    {
        errors.push(ValidationError::PingTimeoutTooShort {
            interval: uplink.ping_interval,
            timeout: uplink.ping_timeout,
        });
    }

    if config.protocol.max_line_len < slirc_link::DEFAULT_MAX_LINE_LEN {
        errors.push(ValidationError::LineLimitTooSmall(
            config.protocol.max_line_len,
        ));
    }

    // Services
    let mut seen = HashSet::new();
    for service in &config.services {
        if !seen.insert(slirc_link::fold(&service.nick)) {
            errors.push(ValidationError::DuplicateServiceNick(service.nick.clone()));
        }
        if service.user.is_empty() || service.host.is_empty() || service.gecos.is_empty() {
            errors.push(ValidationError::IncompleteService(service.nick.clone()));
        }
        for channel in &service.channels {
            if !channel.starts_with('#') {
                errors.push(ValidationError::InvalidServiceChannel {
                    nick: service.nick.clone(),
                    channel: channel.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

impl Config {
    /// Run every semantic check; see [`validate`].
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        validate(self)
    }
}
