//! Capability flags describing one wire dialect.
//!
//! Everything the dialect-agnostic core needs to know about a protocol lives
//! here as plain data: which status modes exist, which mode letters take
//! parameters, which are ban lists. The State Store and the Burst Merge
//! Engine consult these instead of asking which dialect is active.

use slirc_link::Framing;

/// A channel membership status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Channel owner (`~`).
    Owner,
    /// Protected user (`&`).
    Protect,
    /// Channel operator (`@`).
    Op,
    /// Half operator (`%`).
    Halfop,
    /// Voice (`+`).
    Voice,
}

/// A status mode as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMode {
    /// Mode letter, e.g. `o`.
    pub letter: char,
    /// NAMES/burst prefix, e.g. `@`.
    pub prefix: char,
    /// Status the mode grants.
    pub status: Status,
}

/// Static description of a dialect.
#[derive(Debug, Clone)]
pub struct Capabilities {
    /// Dialect name as selected in configuration.
    pub name: &'static str,
    /// Line framing variant.
    pub framing: Framing,
    /// Clients are identified by UID/numeric rather than nickname.
    pub uses_uid: bool,
    /// Owner status exists.
    pub uses_owner: bool,
    /// Protect status exists.
    pub uses_protect: bool,
    /// Half operator status exists.
    pub uses_halfops: bool,
    /// Status modes, highest rank first.
    pub status_modes: &'static [StatusMode],
    /// Parameterless channel modes.
    pub simple_modes: &'static str,
    /// Modes that take a parameter when set and none when unset.
    pub param_modes: &'static str,
    /// List modes (bans, exceptions, invite exceptions, quiets...).
    pub ban_like_modes: &'static str,
    /// Ban exception letter, if any.
    pub except_mchar: Option<char>,
    /// Invite exception letter, if any.
    pub invex_mchar: Option<char>,
    /// Modes only IRC operators may set.
    pub oper_only_modes: &'static str,
    /// Mode that keeps an empty channel alive.
    pub perm_mode: Option<char>,
    /// Lowering a channel TS wipes its ban lists.
    pub clears_bans_on_reset: bool,
}

impl Capabilities {
    /// Whether `status` can be represented by this dialect.
    pub fn supports(&self, status: Status) -> bool {
        match status {
            Status::Owner => self.uses_owner,
            Status::Protect => self.uses_protect,
            Status::Halfop => self.uses_halfops,
            Status::Op | Status::Voice => true,
        }
    }

    /// Status granted by a mode letter.
    pub fn status_for_letter(&self, letter: char) -> Option<Status> {
        self.status_modes
            .iter()
            .find(|m| m.letter == letter && self.supports(m.status))
            .map(|m| m.status)
    }

    /// Status granted by a burst/NAMES prefix character.
    pub fn status_for_prefix(&self, prefix: char) -> Option<Status> {
        self.status_modes
            .iter()
            .find(|m| m.prefix == prefix && self.supports(m.status))
            .map(|m| m.status)
    }

    pub fn is_simple_mode(&self, letter: char) -> bool {
        self.simple_modes.contains(letter)
    }

    pub fn is_param_mode(&self, letter: char) -> bool {
        self.param_modes.contains(letter)
    }

    pub fn is_ban_like(&self, letter: char) -> bool {
        self.ban_like_modes.contains(letter)
    }
}

/// The usual `@`/`%`/`+` set plus owner and protect. Dialects switch entries
/// off through their `uses_*` flags.
pub const STANDARD_STATUS_MODES: &[StatusMode] = &[
    StatusMode {
        letter: 'q',
        prefix: '~',
        status: Status::Owner,
    },
    StatusMode {
        letter: 'a',
        prefix: '&',
        status: Status::Protect,
    },
    StatusMode {
        letter: 'o',
        prefix: '@',
        status: Status::Op,
    },
    StatusMode {
        letter: 'h',
        prefix: '%',
        status: Status::Halfop,
    },
    StatusMode {
        letter: 'v',
        prefix: '+',
        status: Status::Voice,
    },
];
