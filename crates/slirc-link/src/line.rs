//! Line framing codec for tokio.
//!
//! Splits the uplink byte stream into `\n` terminated lines (an optional
//! `\r` before the `\n` is stripped too). Partial lines stay buffered until
//! the rest arrives. A line that grows past the configured limit is thrown
//! away up to its terminator instead of being buffered without bound.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use crate::error::{self, FrameError};

/// Default maximum line length, terminator included.
pub const DEFAULT_MAX_LINE_LEN: usize = 512;

/// Newline-delimited codec for server links.
#[derive(Debug)]
pub struct LineFramer {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum line length, terminator included
    max_len: usize,
    /// Set while skipping the rest of an oversized line
    discarding: bool,
}

impl LineFramer {
    /// Create a framer with the default 512 byte limit.
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LINE_LEN)
    }

    /// Create a framer with a custom line limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
        }
    }

    /// The configured line limit.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    fn strip_terminator(mut line: &[u8]) -> &[u8] {
        if let [rest @ .., b'\n'] = line {
            line = rest;
        }
        if let [rest @ .., b'\r'] = line {
            line = rest;
        }
        line
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineFramer {
    type Item = String;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                if src.len() > self.max_len {
                    if !self.discarding {
                        warn!(
                            buffered = src.len(),
                            limit = self.max_len,
                            "Discarding oversized line"
                        );
                    }
                    self.discarding = true;
                    src.clear();
                }
                self.next_index = src.len();
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if self.discarding {
                // Tail of a line whose head was already thrown away.
                self.discarding = false;
                continue;
            }

            if line.len() > self.max_len {
                warn!(
                    length = line.len(),
                    limit = self.max_len,
                    "Discarding oversized line"
                );
                continue;
            }

            let text = String::from_utf8_lossy(Self::strip_terminator(&line)).into_owned();
            return Ok(Some(text));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None => {
                if !src.is_empty() {
                    debug!(bytes = src.len(), "Dropping unterminated line at end of stream");
                    src.advance(src.len());
                }
                self.next_index = 0;
                self.discarding = false;
                Ok(None)
            }
        }
    }
}

impl Encoder<String> for LineFramer {
    type Error = FrameError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> error::Result<()> {
        <Self as Encoder<&str>>::encode(self, line.as_str(), dst)
    }
}

impl Encoder<&str> for LineFramer {
    type Error = FrameError;

    fn encode(&mut self, line: &str, dst: &mut BytesMut) -> error::Result<()> {
        let line = line.trim_end_matches(['\r', '\n']);
        dst.reserve(line.len() + 2);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}
