//! P10 base64 numerics.
//!
//! P10 identifies servers by one or two base64 characters and clients by the
//! server numeric followed by three more (`ABAAB`). Client IPv4 addresses
//! travel as six base64 characters.

use std::net::Ipv4Addr;

/// The P10 base64 alphabet. Note `[` and `]` in place of `+` and `/`.
pub const ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789[]";

/// Width of a server numeric.
pub const SERVER_NUMERIC_LEN: usize = 2;

/// Width of a full client numeric (server part included).
pub const CLIENT_NUMERIC_LEN: usize = 5;

fn digit_value(b: u8) -> Option<u64> {
    let v = match b {
        b'A'..=b'Z' => b - b'A',
        b'a'..=b'z' => b - b'a' + 26,
        b'0'..=b'9' => b - b'0' + 52,
        b'[' => 62,
        b']' => 63,
        _ => return None,
    };
    Some(u64::from(v))
}

/// Decode a base64 numeric. Empty strings and anything over 10 digits are
/// rejected.
pub fn decode(numeric: &str) -> Option<u64> {
    if numeric.is_empty() || numeric.len() > 10 {
        return None;
    }
    numeric
        .bytes()
        .try_fold(0u64, |acc, b| Some((acc << 6) | digit_value(b)?))
}

/// Encode `value` as exactly `width` base64 digits, or `None` if it does not
/// fit.
pub fn encode(value: u64, width: usize) -> Option<String> {
    if width == 0 || width > 10 || (width < 10 && value >> (6 * width) != 0) {
        return None;
    }
    let digits = (0..width)
        .rev()
        .map(|i| ALPHABET[((value >> (6 * i)) & 63) as usize] as char)
        .collect();
    Some(digits)
}

/// Whether `s` is shaped like a server numeric.
pub fn is_server_numeric(s: &str) -> bool {
    (1..=SERVER_NUMERIC_LEN).contains(&s.len()) && decode(s).is_some()
}

/// Whether `s` is shaped like a client numeric.
pub fn is_client_numeric(s: &str) -> bool {
    s.len() == CLIENT_NUMERIC_LEN && decode(s).is_some()
}

/// Decode a six character base64 IPv4 address. IPv6 and malformed values
/// yield `None`.
pub fn decode_ipv4(encoded: &str) -> Option<Ipv4Addr> {
    if encoded.len() != 6 {
        return None;
    }
    let value = decode(encoded)?;
    u32::try_from(value).ok().map(Ipv4Addr::from)
}
