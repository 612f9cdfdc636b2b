//! # slirc-link
//!
//! Wire layer for IRC services links: turns the uplink byte stream into
//! lines, and lines into `(origin, command, args)` triples.
//!
//! ```rust
//! use slirc_link::{Framing, Origin, RawMessage};
//!
//! let msg = RawMessage::decode(":0AA SJOIN 100 #test +nt :@0AAAAAAAB", Framing::Rfc1459, true)
//!     .expect("valid line");
//! assert_eq!(msg.origin, Origin::Prefix("0AA"));
//! assert_eq!(msg.command, "SJOIN");
//! assert_eq!(msg.args.len(), 4);
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
pub mod error;
pub mod line;
pub mod message;
pub mod p10;

pub use self::casemap::{fold, fold_char, fold_eq};
pub use self::error::{DecodeError, FrameError};
pub use self::line::{LineFramer, DEFAULT_MAX_LINE_LEN};
pub use self::message::{Args, Framing, Origin, RawMessage};
