//! Response parsing
//!
//! A response is `<delimiter><payload><CK><CR>`, where the checksum covers the
//! delimiter and the payload. Bytes before the delimiter (line noise, a stray
//! echo) are skipped.

use std::fmt;

use super::{checksum, ParseError, TERMINATOR};

/// First character of a valid response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `>` answers an analog read
    Analog,
    /// `!` answers every other command
    Command,
}

impl Delimiter {
    pub fn byte(&self) -> u8 {
        match self {
            Delimiter::Analog => b'>',
            Delimiter::Command => b'!',
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.byte() as char)
    }
}

/// A response whose framing and checksum have been validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub delimiter: Delimiter,
    /// Everything between the delimiter and the checksum
    pub payload: String,
    /// Checksum field as received
    pub checksum: String,
}

/// Width of the data field in an analog read response (`+dd.ddd`)
pub const ANALOG_FIELD_WIDTH: usize = 7;

impl ParsedResponse {
    /// Numeric value in the fixed-width field following the delimiter
    pub fn analog_value(&self) -> Result<f64, ParseError> {
        let field = self
            .payload
            .get(..ANALOG_FIELD_WIDTH)
            .ok_or(ParseError::Malformed)?;
        field
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or(ParseError::Malformed)
    }
}

/// Validate `raw` and extract the payload following `expected`
pub fn parse(raw: &[u8], expected: Delimiter) -> Result<ParsedResponse, ParseError> {
    let start = raw
        .iter()
        .position(|&b| b == expected.byte())
        .ok_or(ParseError::NoDelimiter)?;

    let end = raw[start..]
        .iter()
        .position(|&b| b == TERMINATOR)
        .map(|offset| start + offset)
        .ok_or(ParseError::NoTerminator)?;

    // Delimiter plus a two-digit checksum is the shortest possible frame
    if end - start < 3 {
        return Err(ParseError::Malformed);
    }

    let body = &raw[start..end - 2];
    let claimed = &raw[end - 2..end];

    if !checksum::verify(body, claimed) {
        return Err(ParseError::ChecksumMismatch {
            expected: checksum::compute(body),
            actual: claimed.escape_ascii().to_string(),
        });
    }

    let payload = std::str::from_utf8(&body[1..]).map_err(|_| ParseError::Malformed)?;
    let checksum = std::str::from_utf8(claimed).map_err(|_| ParseError::Malformed)?;

    Ok(ParsedResponse {
        delimiter: expected,
        payload: payload.to_string(),
        checksum: checksum.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn framed(body: &str) -> Vec<u8> {
        let mut raw = body.as_bytes().to_vec();
        raw.extend_from_slice(checksum::compute(body.as_bytes()).as_bytes());
        raw.push(b'\r');
        raw
    }

    #[test]
    fn test_parse_analog_response() {
        let raw = framed(">0012.50");
        let parsed = parse(&raw, Delimiter::Analog).unwrap();
        assert_eq!(parsed.delimiter, Delimiter::Analog);
        assert_eq!(parsed.payload, "0012.50");
        assert_eq!(parsed.checksum, checksum::compute(b">0012.50"));
        assert_eq!(parsed.analog_value().unwrap(), 12.5);
    }

    #[test]
    fn test_parse_signed_value() {
        let parsed = parse(&framed(">-03.125"), Delimiter::Analog).unwrap();
        assert_eq!(parsed.analog_value().unwrap(), -3.125);
        let parsed = parse(&framed(">+19.998"), Delimiter::Analog).unwrap();
        assert_eq!(parsed.analog_value().unwrap(), 19.998);
    }

    #[test]
    fn test_checksum_accepted_in_lowercase() {
        let mut raw = framed(">+04.000");
        let n = raw.len();
        raw[n - 3..n - 1].make_ascii_lowercase();
        assert!(parse(&raw, Delimiter::Analog).is_ok());
    }

    #[test]
    fn test_altered_checksum_rejected() {
        let mut raw = framed(">0012.50");
        let n = raw.len();
        // '>' 62 + "0012.50" 48+48+49+50+46+53+48 = 404 % 256 = 148 = 0x94
        assert_eq!(&raw[n - 3..n - 1], b"94");
        raw[n - 2] = b'5';
        assert_eq!(
            parse(&raw, Delimiter::Analog),
            Err(ParseError::ChecksumMismatch {
                expected: "94".to_string(),
                actual: "95".to_string(),
            })
        );
    }

    #[test]
    fn test_non_hex_checksum_is_mismatch() {
        let raw = b">0012.50ZZ\r";
        assert!(matches!(
            parse(raw, Delimiter::Analog),
            Err(ParseError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_leading_noise_skipped() {
        let mut raw = b"\x00\xff".to_vec();
        raw.extend(framed("!014050600"));
        let parsed = parse(&raw, Delimiter::Command).unwrap();
        assert_eq!(parsed.payload, "014050600");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(b"", Delimiter::Analog), Err(ParseError::NoDelimiter));
    }

    #[test]
    fn test_missing_delimiter() {
        assert_eq!(
            parse(b"0012.5094\r", Delimiter::Analog),
            Err(ParseError::NoDelimiter)
        );
        // An analog delimiter does not satisfy a command parse
        assert_eq!(
            parse(&framed(">0012.50"), Delimiter::Command),
            Err(ParseError::NoDelimiter)
        );
    }

    #[test]
    fn test_invalid_command_reply() {
        // The module answers `?AA` to commands it rejects
        assert_eq!(
            parse(b"?01\r", Delimiter::Command),
            Err(ParseError::NoDelimiter)
        );
    }

    #[test]
    fn test_missing_terminator() {
        assert_eq!(
            parse(b">0012.5094", Delimiter::Analog),
            Err(ParseError::NoTerminator)
        );
    }

    #[test]
    fn test_terminator_before_delimiter_only() {
        assert_eq!(
            parse(b"\r>0012.5094", Delimiter::Analog),
            Err(ParseError::NoTerminator)
        );
    }

    #[test]
    fn test_too_short_for_checksum() {
        assert_eq!(parse(b">\r", Delimiter::Analog), Err(ParseError::Malformed));
        assert_eq!(parse(b">4\r", Delimiter::Analog), Err(ParseError::Malformed));
    }

    #[test]
    fn test_empty_payload_with_valid_checksum() {
        // '>' alone sums to 0x3E
        let parsed = parse(b">3E\r", Delimiter::Analog).unwrap();
        assert_eq!(parsed.payload, "");
        assert_eq!(parsed.analog_value(), Err(ParseError::Malformed));
    }

    #[test]
    fn test_non_numeric_analog_field() {
        let parsed = parse(&framed(">ABCDEFG"), Delimiter::Analog).unwrap();
        assert_eq!(parsed.analog_value(), Err(ParseError::Malformed));
    }

    #[test]
    fn test_non_finite_analog_field() {
        let parsed = parse(&framed(">    inf"), Delimiter::Analog).unwrap();
        assert_eq!(parsed.analog_value(), Err(ParseError::Malformed));
    }

    #[test]
    fn test_short_analog_field() {
        let parsed = parse(&framed(">12.5"), Delimiter::Analog).unwrap();
        assert_eq!(parsed.analog_value(), Err(ParseError::Malformed));
    }
}
