//! Numeric field decoding for tar headers.
//!
//! Tar stores numbers in fixed-width fields. Over the years three encodings
//! have been used for them, and a single archive may mix all three:
//!
//! - octal ASCII, NUL or space terminated (the original V7 encoding),
//! - base-256 big-endian binary, flagged by the top bit of the first byte
//!   (GNU tar, for values too large for octal),
//! - base-64, flagged by a leading `+` or `-` (very old GNU tar).

/// Error type for field decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("unknown numeric field encoding (leading byte 0x{0:02x})")]
    UnknownEncoding(u8),
}

const BASE256_POSITIVE: u8 = 0x80;
const BASE256_NEGATIVE: u8 = 0xff;

/// Decode a fixed-width numeric field.
///
/// An all-NUL (or empty) field decodes to zero. Base-256 values wider than 64
/// bits keep their low 64 bits, which is what GNU tar has always done.
pub fn decode(field: &[u8]) -> Result<i64, FieldError> {
    let first = match field.first() {
        Some(v) => *v,
        None => return Ok(0),
    };

    match first {
        b'0'..=b'7' | b' ' => Ok(decode_octal(field)),
        BASE256_POSITIVE => Ok(decode_base256(field, false)),
        BASE256_NEGATIVE => Ok(decode_base256(field, true)),
        b'+' => Ok(decode_base64(&field[1..])),
        b'-' => Ok(decode_base64(&field[1..]).wrapping_neg()),
        0 if field.iter().all(|b| *b == 0) => Ok(0),
        other => Err(FieldError::UnknownEncoding(other)),
    }
}

/// Decode a field, logging and substituting zero when the encoding is unknown.
///
/// `name` only labels the log line.
pub fn decode_or_zero(field: &[u8], name: &'static str) -> i64 {
    match decode(field) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(field = name, error = %e, "cannot decode header field, using 0");
            0
        }
    }
}

fn decode_octal(field: &[u8]) -> i64 {
    let mut value: i64 = 0;
    let digits = field
        .iter()
        .skip_while(|b| **b == b' ')
        .take_while(|b| (b'0'..=b'7').contains(*b));

    for digit in digits {
        value = value.wrapping_mul(8).wrapping_add((digit - b'0') as i64);
    }

    value
}

fn decode_base256(field: &[u8], negative: bool) -> i64 {
    // Negative values are two's complement over the whole field, so start from
    // all ones and shift the payload in.
    let mut value: u64 = if negative {
        u64::MAX
    } else {
        (field[0] & 0x7f) as u64
    };

    for byte in &field[1..] {
        value = (value << 8) | *byte as u64;
    }

    value as i64
}

fn base64_digit(c: u8) -> Option<i64> {
    let v = match c {
        b'A'..=b'Z' => c - b'A',
        b'a'..=b'z' => c - b'a' + 26,
        b'0'..=b'9' => c - b'0' + 52,
        b'+' => 62,
        b'/' => 63,
        _ => return None,
    };
    Some(v as i64)
}

fn decode_base64(digits: &[u8]) -> i64 {
    digits
        .iter()
        .filter_map(|c| base64_digit(*c))
        .fold(0i64, |acc, d| acc.wrapping_mul(64).wrapping_add(d))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn octal() {
        assert_eq!(decode(b"0000777\0"), Ok(511));
        assert_eq!(decode(b"00000000012\0"), Ok(10));
        assert_eq!(decode(b"   644 \0"), Ok(0o644));
        assert_eq!(decode(b"7777777\0"), Ok(0o7777777));
    }

    #[test]
    fn all_nul_is_zero() {
        assert_eq!(decode(&[0u8; 12]), Ok(0));
        assert_eq!(decode(&[]), Ok(0));
    }

    #[test]
    fn base256() {
        let mut field = [0u8; 12];
        field[0] = 0x80;
        field[6] = 0x01;
        assert_eq!(decode(&field), Ok(1 << 40));
    }

    #[test]
    fn base256_negative() {
        let mut field = [0xffu8; 12];
        field[11] = 0xfe;
        assert_eq!(decode(&field), Ok(-2));
    }

    #[test]
    fn base256_overflow_truncates() {
        let mut field = [0u8; 12];
        field[0] = 0x80;
        field[2] = 0x01;
        field[11] = 0x05;
        // The 0x01 falls outside the low 64 bits.
        assert_eq!(decode(&field), Ok(5));
    }

    #[test]
    fn base64() {
        assert_eq!(decode(b"+AB\0\0\0\0\0"), Ok(1));
        assert_eq!(decode(b"+BA"), Ok(64));
        assert_eq!(decode(b"-B"), Ok(-1));
        // Bytes outside the alphabet are skipped, not read as zero.
        assert_eq!(decode(b"+B*A"), Ok(64));
    }

    #[test]
    fn unknown_encoding() {
        assert_eq!(decode(b"x123"), Err(FieldError::UnknownEncoding(b'x')));
        assert_eq!(decode(b"\0\x01"), Err(FieldError::UnknownEncoding(0)));
        assert_eq!(decode_or_zero(b"zz", "size"), 0);
    }
}
