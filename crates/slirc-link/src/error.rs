//! Error types for the link layer.
//!
//! Framing errors are transport failures and end the link. Decode errors
//! concern a single line and are always recoverable: the caller logs the
//! line and moves on to the next one.

use thiserror::Error;

/// Convenience type alias for framing results.
pub type Result<T, E = FrameError> = std::result::Result<T, E>;

/// Errors raised while framing the byte stream into lines.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrameError {
    /// I/O error on the underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while decoding a single line into a message.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// The line was empty or held only whitespace.
    #[error("empty line")]
    EmptyLine,

    /// An origin prefix was present but nothing followed it.
    #[error("no command after origin {origin:?}")]
    MissingCommand {
        /// The origin that was parsed.
        origin: String,
    },

    /// The command token held characters other than ASCII letters and digits.
    #[error("invalid command token {token:?}")]
    InvalidCommand {
        /// The offending token.
        token: String,
    },

    /// A `:` prefix with no origin text after it.
    #[error("empty origin prefix")]
    EmptyOrigin,
}

impl DecodeError {
    /// Static label for log fields.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyLine => "empty_line",
            Self::MissingCommand { .. } => "missing_command",
            Self::InvalidCommand { .. } => "invalid_command",
            Self::EmptyOrigin => "empty_origin",
        }
    }
}
