//! Canonical serial-number encoding.
//!
//! The hex string produced here is the one and only key used for DB lookups,
//! cache lookups, the `Edge-Cache-Tag` header, and log lines. Every call site
//! that needs "the serial" goes through [`to_canonical_hex`].

/// Render a certificate serial number as a lowercase hex string, zero-padded
/// to an even number of digits.
///
/// `bytes` is the big-endian two's-complement representation DER gives us
/// for an `INTEGER`; a leading `0x00` pad byte (added by DER to keep the
/// sign bit clear) is dropped so that two encodings of the same serial
/// produce the same string.
pub fn to_canonical_hex(bytes: &[u8]) -> String {
    let trimmed = match bytes {
        [0x00, rest @ ..] if !rest.is_empty() && rest[0] & 0x80 != 0 => rest,
        other => other,
    };
    let hex = hex::encode(trimmed);
    if hex.len() % 2 == 0 {
        hex
    } else {
        format!("0{hex}")
    }
}

/// The last two hex characters of a canonical serial, used for the
/// `Edge-Cache-Tag` header. `None` if the serial is shorter than 2 hex
/// digits.
pub fn edge_cache_tag(serial_hex: &str) -> Option<&str> {
    if serial_hex.len() >= 2 {
        Some(&serial_hex[serial_hex.len() - 2..])
    } else {
        None
    }
}
