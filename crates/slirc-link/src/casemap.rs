//! rfc1459 case folding.
//!
//! Nicknames, server names and channel names are compared with the
//! rfc1459 mapping, where `[]\~` are the uppercase forms of `{}|^`.
//! Every index in the services state store is keyed by [`fold`].

/// Fold one character to its rfc1459 lowercase form.
#[inline]
pub const fn fold_char(c: char) -> char {
    match c {
        'A'..='Z' => (c as u8 + 32) as char,
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        _ => c,
    }
}

/// Fold a name to its canonical index key.
pub fn fold(name: &str) -> String {
    name.chars().map(fold_char).collect()
}

/// Compare two names under rfc1459 folding.
pub fn fold_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .chars()
            .zip(b.chars())
            .all(|(x, y)| fold_char(x) == fold_char(y))
}
