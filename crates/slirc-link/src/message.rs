//! Server link message decoding.
//!
//! A decoded line is an [`Origin`], a command token and an argument vector.
//! Two framings exist:
//!
//! - [`Framing::Rfc1459`]: `[:origin] COMMAND args... [:trailing]`. A line
//!   without a prefix comes from the uplink itself.
//! - [`Framing::P10`]: once the link is registered every line starts with the
//!   sender's numeric, with no colon: `AB N nick ...`. Before registration
//!   lines look like classic ones (`PASS :secret`, `SERVER ...`).
//!
//! Arguments are split on runs of spaces. A token starting with `:` takes
//! the rest of the line verbatim, spaces included.

use nom::{
    bytes::complete::take_while1,
    character::complete::char,
    combinator::opt,
    sequence::preceded,
    IResult,
};
use smallvec::SmallVec;

use crate::error::DecodeError;

/// Which line syntax the active dialect speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Framing {
    /// Classic colon-prefixed origins (TS6 and relatives).
    Rfc1459,
    /// Bare numeric origins after registration (P10).
    P10,
}

/// Where a line claims to come from, before it is resolved against state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin<'a> {
    /// `:name` prefix: a server name, nickname or UID.
    Prefix(&'a str),
    /// Bare leading numeric (P10 framing only).
    Numeric(&'a str),
    /// No origin on the wire; the uplink once registered.
    Implicit,
}

impl<'a> Origin<'a> {
    /// The origin text, if any was present.
    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            Self::Prefix(s) | Self::Numeric(s) => Some(s),
            Self::Implicit => None,
        }
    }
}

/// Argument vector. Bursts can carry long member lists, so this spills to
/// the heap past 15 entries rather than truncating.
pub type Args<'a> = SmallVec<[&'a str; 15]>;

/// A decoded line borrowing from the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawMessage<'a> {
    /// Claimed origin.
    pub origin: Origin<'a>,
    /// Command token exactly as received.
    pub command: &'a str,
    /// Positional arguments, trailing argument last.
    pub args: Args<'a>,
}

fn parse_prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

fn parse_token(input: &str) -> IResult<&str, &str> {
    take_while1(|c| c != ' ')(input)
}

fn split_args(mut rest: &str) -> Args<'_> {
    let mut args = Args::new();
    loop {
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            break;
        }
        if let Some(trailing) = rest.strip_prefix(':') {
            args.push(trailing);
            break;
        }
        let end = rest.find(' ').unwrap_or(rest.len());
        args.push(&rest[..end]);
        rest = &rest[end..];
    }
    args
}

fn validate_command(token: &str) -> Result<(), DecodeError> {
    if token.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(DecodeError::InvalidCommand {
            token: token.to_string(),
        })
    }
}

impl<'a> RawMessage<'a> {
    /// Decode one line (terminator optional).
    ///
    /// `registered` selects the post-registration grammar of [`Framing::P10`];
    /// classic framing ignores it.
    pub fn decode(
        line: &'a str,
        framing: Framing,
        registered: bool,
    ) -> Result<Self, DecodeError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let input = line.trim_start_matches(' ');
        if input.is_empty() {
            return Err(DecodeError::EmptyLine);
        }

        let (input, origin) = if input.starts_with(':') {
            match opt(parse_prefix)(input) {
                Ok((rest, Some(prefix))) => (rest, Origin::Prefix(prefix)),
                _ => return Err(DecodeError::EmptyOrigin),
            }
        } else if framing == Framing::P10 && registered {
            match parse_token(input) {
                Ok((rest, numeric)) => (rest, Origin::Numeric(numeric)),
                Err(_) => return Err(DecodeError::EmptyLine),
            }
        } else {
            (input, Origin::Implicit)
        };

        let input = input.trim_start_matches(' ');
        let (rest, command) = match parse_token(input) {
            Ok(parsed) => parsed,
            Err(_) => {
                return Err(DecodeError::MissingCommand {
                    origin: origin.as_str().unwrap_or_default().to_string(),
                })
            }
        };
        validate_command(command)?;

        Ok(Self {
            origin,
            command,
            args: split_args(rest),
        })
    }

    /// Argument at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.get(index).copied()
    }
}
