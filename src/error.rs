//! Unified error handling for slirc-services.
//!
//! Nothing in the protocol core is reported back to a caller on the wire.
//! Errors are logged and the offending message is dropped; only the uplink
//! session errors end a connection.

use slirc_link::FrameError;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Handler Errors (command processing)
// ============================================================================

/// Errors raised by inbound command handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("not enough parameters")]
    NeedMoreParams,

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("no such user: {0}")]
    NoSuchUser(String),

    #[error("no such channel: {0}")]
    NoSuchChannel(String),

    #[error("no such server: {0}")]
    NoSuchServer(String),

    #[error("command requires a {0} source")]
    WrongSource(&'static str),

    #[error(transparent)]
    State(#[from] StateError),
}

impl HandlerError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NeedMoreParams => "need_more_params",
            Self::ProtocolError(_) => "protocol_error",
            Self::NoSuchUser(_) => "no_such_user",
            Self::NoSuchChannel(_) => "no_such_channel",
            Self::NoSuchServer(_) => "no_such_server",
            Self::WrongSource(_) => "wrong_source",
            Self::State(e) => e.error_code(),
        }
    }
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// Dispatch Errors (routing)
// ============================================================================

/// Why a decoded message never reached (or failed inside) its handler.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("command {0} is already registered")]
    DuplicateToken(String),

    #[error("unknown command {0}")]
    UnknownCommand(String),

    #[error("{command} not accepted from a {kind} source")]
    SourceNotAllowed {
        command: String,
        kind: &'static str,
    },

    #[error("{command} needs {min} parameters, got {got}")]
    NeedMoreParams {
        command: String,
        min: usize,
        got: usize,
    },

    #[error("{command} failed: {source}")]
    Handler {
        command: String,
        #[source]
        source: HandlerError,
    },
}

impl DispatchError {
    /// Get a static error code string for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateToken(_) => "duplicate_token",
            Self::UnknownCommand(_) => "unknown_command",
            Self::SourceNotAllowed { .. } => "source_not_allowed",
            Self::NeedMoreParams { .. } => "need_more_params",
            Self::Handler { source, .. } => source.error_code(),
        }
    }
}

// ============================================================================
// State Errors (store invariants)
// ============================================================================

/// State store operations that were refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("server {0} already exists")]
    DuplicateServer(String),

    #[error("server ID {0} already in use")]
    DuplicateSid(String),

    #[error("unknown server {0}")]
    UnknownServer(String),

    #[error("refusing to delete the local server")]
    DeleteSelf,

    #[error("local client collides with existing nick {0}")]
    LocalNickCollision(String),

    #[error("UID {0} already in use")]
    DuplicateUid(String),

    #[error("invalid channel name {0}")]
    InvalidChannelName(String),

    #[error("unknown channel {0}")]
    UnknownChannel(String),

    #[error("unknown user")]
    UnknownUser,
}

impl StateError {
    /// Get a static error code string for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateServer(_) => "duplicate_server",
            Self::DuplicateSid(_) => "duplicate_sid",
            Self::UnknownServer(_) => "unknown_server",
            Self::DeleteSelf => "delete_self",
            Self::LocalNickCollision(_) => "local_nick_collision",
            Self::DuplicateUid(_) => "duplicate_uid",
            Self::InvalidChannelName(_) => "invalid_channel_name",
            Self::UnknownChannel(_) => "unknown_channel",
            Self::UnknownUser => "unknown_user",
        }
    }
}

// ============================================================================
// Uplink Errors (session lifetime)
// ============================================================================

/// Reasons an uplink session ended.
#[derive(Debug, Error)]
pub enum UplinkError {
    #[error("connection failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("link error: {0}")]
    Frame(#[from] FrameError),

    #[error("ping timeout: nothing received for {0:?}")]
    PingTimeout(Duration),

    #[error("uplink closed the connection")]
    Closed,

    #[error("session closed: {0}")]
    Dropped(String),

    #[error("shutting down: {0}")]
    Shutdown(String),
}

impl UplinkError {
    /// Get a static error code string for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect_failed",
            Self::ConnectTimeout(_) => "connect_timeout",
            Self::Frame(_) => "frame_error",
            Self::PingTimeout(_) => "ping_timeout",
            Self::Closed => "closed",
            Self::Dropped(_) => "dropped",
            Self::Shutdown(_) => "shutdown",
        }
    }
}
