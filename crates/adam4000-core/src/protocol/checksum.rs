//! Frame checksum
//!
//! The checksum is the sum of all ASCII byte values preceding the checksum field,
//! modulo 256, transmitted as two uppercase hex digits.
//!
//! This is not injective: any change that shifts the byte sum by a multiple of 256
//! (or two changes that cancel out) goes undetected.

/// Sum of `bytes` modulo 256
pub fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Checksum of `bytes` rendered as exactly two uppercase hex digits
pub fn compute(bytes: &[u8]) -> String {
    format!("{:02X}", sum(bytes))
}

/// Check `claimed` (two hex digits, any case) against the checksum of `payload`.
///
/// Anything that is not exactly two hex digits fails verification.
pub fn verify(payload: &[u8], claimed: &[u8]) -> bool {
    match decode(claimed) {
        Some(value) => value == sum(payload),
        None => false,
    }
}

/// Decode a two-digit hex checksum field
pub fn decode(field: &[u8]) -> Option<u8> {
    if field.len() != 2 || !field.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let text = std::str::from_utf8(field).ok()?;
    u8::from_str_radix(text, 16).ok()
}
