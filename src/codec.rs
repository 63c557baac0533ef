//! Token codec for genotype text serialization
//!
//! Every primitive value that appears in a serialized genotype goes through
//! this codec. Tokens are self-delimiting ASCII: a one-letter type tag, the
//! payload, and a `|` delimiter where needed. Floating values carry their raw
//! bit pattern so that text round-trips are bit-exact, including `-0.0`,
//! `NaN` and the infinities; a human-readable decimal rendering follows the
//! bits purely for inspection and is only consulted when the bits field is
//! empty.

use crate::error::{KarvaError, Result};

/// A decoded primitive value.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Char(char),
    Str(String),
}

pub fn encode_bool(out: &mut String, value: bool) {
    out.push(if value { 'T' } else { 'F' });
}

pub fn encode_i8(out: &mut String, value: i8) {
    out.push('b');
    out.push_str(&value.to_string());
    out.push('|');
}

pub fn encode_i16(out: &mut String, value: i16) {
    out.push('s');
    out.push_str(&value.to_string());
    out.push('|');
}

pub fn encode_i32(out: &mut String, value: i32) {
    out.push('i');
    out.push_str(&value.to_string());
    out.push('|');
}

pub fn encode_i64(out: &mut String, value: i64) {
    out.push('l');
    out.push_str(&value.to_string());
    out.push('|');
}

pub fn encode_f32(out: &mut String, value: f32) {
    out.push('f');
    out.push_str(&value.to_bits().to_string());
    out.push('|');
    out.push_str(&value.to_string());
    out.push('|');
}

pub fn encode_f64(out: &mut String, value: f64) {
    out.push('d');
    out.push_str(&value.to_bits().to_string());
    out.push('|');
    out.push_str(&value.to_string());
    out.push('|');
}

pub fn encode_char(out: &mut String, value: char) {
    out.push('c');
    out.push_str(&(value as u32).to_string());
    out.push('|');
}

/// Encode a string as a double-quoted token.
///
/// Printable ASCII passes through literally (`"` and `\` get a backslash
/// escape). Control characters and non-ASCII switch into a unicode mode:
/// `\u` toggles the mode, and inside it each character is written as its
/// UTF-16 code units, four hex digits per unit, with no separators. A run of
/// contiguous special characters therefore costs one toggle, not one escape
/// per character.
pub fn encode_str(out: &mut String, value: &str) {
    out.push('"');
    let mut unicode_mode = false;
    for ch in value.chars() {
        let special = (ch as u32) < 0x20 || (ch as u32) > 0x7e;
        if special {
            if !unicode_mode {
                out.push_str("\\u");
                unicode_mode = true;
            }
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                out.push_str(&format!("{:04X}", unit));
            }
        } else {
            if unicode_mode {
                out.push_str("\\u");
                unicode_mode = false;
            }
            match ch {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                _ => out.push(ch),
            }
        }
    }
    out.push('"');
}

fn decode_error(message: impl Into<String>, position: usize) -> KarvaError {
    KarvaError::Decode {
        message: message.into(),
        position,
    }
}

/// Decode the next token starting at `position`, skipping leading ASCII
/// whitespace. Returns the token and the position just past it. The cursor
/// the caller holds is untouched on error.
pub fn decode(input: &str, position: usize) -> Result<(Token, usize)> {
    let bytes = input.as_bytes();
    let mut pos = position;
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    let Some(&tag) = bytes.get(pos) else {
        return Err(decode_error("unexpected end of input", position));
    };
    match tag {
        b'T' => Ok((Token::Bool(true), pos + 1)),
        b'F' => Ok((Token::Bool(false), pos + 1)),
        b'b' => {
            let (field, next) = read_field(input, pos + 1)?;
            let value = field
                .parse::<i8>()
                .map_err(|e| decode_error(format!("bad byte token {field:?}: {e}"), pos))?;
            Ok((Token::I8(value), next))
        }
        b's' => {
            let (field, next) = read_field(input, pos + 1)?;
            let value = field
                .parse::<i16>()
                .map_err(|e| decode_error(format!("bad short token {field:?}: {e}"), pos))?;
            Ok((Token::I16(value), next))
        }
        b'i' => {
            let (field, next) = read_field(input, pos + 1)?;
            let value = field
                .parse::<i32>()
                .map_err(|e| decode_error(format!("bad int token {field:?}: {e}"), pos))?;
            Ok((Token::I32(value), next))
        }
        b'l' => {
            let (field, next) = read_field(input, pos + 1)?;
            let value = field
                .parse::<i64>()
                .map_err(|e| decode_error(format!("bad long token {field:?}: {e}"), pos))?;
            Ok((Token::I64(value), next))
        }
        b'f' => {
            let (bits, after_bits) = read_field(input, pos + 1)?;
            let (human, next) = read_field(input, after_bits)?;
            let value = if bits.is_empty() {
                human
                    .parse::<f32>()
                    .map_err(|e| decode_error(format!("bad float token {human:?}: {e}"), pos))?
            } else {
                let raw = bits
                    .parse::<u32>()
                    .map_err(|e| decode_error(format!("bad float bits {bits:?}: {e}"), pos))?;
                f32::from_bits(raw)
            };
            Ok((Token::F32(value), next))
        }
        b'd' => {
            let (bits, after_bits) = read_field(input, pos + 1)?;
            let (human, next) = read_field(input, after_bits)?;
            let value = if bits.is_empty() {
                human
                    .parse::<f64>()
                    .map_err(|e| decode_error(format!("bad double token {human:?}: {e}"), pos))?
            } else {
                let raw = bits
                    .parse::<u64>()
                    .map_err(|e| decode_error(format!("bad double bits {bits:?}: {e}"), pos))?;
                f64::from_bits(raw)
            };
            Ok((Token::F64(value), next))
        }
        b'c' => {
            let (field, next) = read_field(input, pos + 1)?;
            let scalar = field
                .parse::<u32>()
                .map_err(|e| decode_error(format!("bad char token {field:?}: {e}"), pos))?;
            let value = char::from_u32(scalar)
                .ok_or_else(|| decode_error(format!("invalid char scalar {scalar}"), pos))?;
            Ok((Token::Char(value), next))
        }
        b'"' => decode_str(input, pos),
        other => Err(decode_error(
            format!("unknown type tag {:?}", other as char),
            pos,
        )),
    }
}

/// Read up to the next `|` delimiter, returning the field contents and the
/// position past the delimiter.
fn read_field(input: &str, start: usize) -> Result<(&str, usize)> {
    match input[start..].find('|') {
        Some(offset) => Ok((&input[start..start + offset], start + offset + 1)),
        None => Err(decode_error("missing '|' delimiter", start)),
    }
}

fn decode_str(input: &str, open: usize) -> Result<(Token, usize)> {
    let bytes = input.as_bytes();
    let mut pos = open + 1;
    let mut value = String::new();
    let mut unicode_mode = false;
    loop {
        let Some(&b) = bytes.get(pos) else {
            return Err(decode_error("unterminated string token", open));
        };
        if b == b'"' {
            return Ok((Token::Str(value), pos + 1));
        }
        if b == b'\\' {
            match bytes.get(pos + 1) {
                Some(b'u') => {
                    unicode_mode = !unicode_mode;
                    pos += 2;
                }
                Some(b'"') if !unicode_mode => {
                    value.push('"');
                    pos += 2;
                }
                Some(b'\\') if !unicode_mode => {
                    value.push('\\');
                    pos += 2;
                }
                _ => return Err(decode_error("bad escape in string token", pos)),
            }
            continue;
        }
        if unicode_mode {
            let unit = read_hex_unit(input, pos)?;
            pos += 4;
            if (0xD800..0xDC00).contains(&unit) {
                let low = read_hex_unit(input, pos)?;
                pos += 4;
                if !(0xDC00..0xE000).contains(&low) {
                    return Err(decode_error("unpaired surrogate in string token", pos - 4));
                }
                let scalar =
                    0x10000 + (((unit - 0xD800) as u32) << 10) + (low - 0xDC00) as u32;
                match char::from_u32(scalar) {
                    Some(ch) => value.push(ch),
                    None => return Err(decode_error("invalid surrogate pair", pos - 8)),
                }
            } else {
                match char::from_u32(unit as u32) {
                    Some(ch) => value.push(ch),
                    None => return Err(decode_error("invalid code unit", pos - 4)),
                }
            }
        } else {
            if b >= 0x80 {
                return Err(decode_error("raw non-ASCII byte in string token", pos));
            }
            value.push(b as char);
            pos += 1;
        }
    }
}

fn read_hex_unit(input: &str, pos: usize) -> Result<u16> {
    let hex = input
        .get(pos..pos + 4)
        .ok_or_else(|| decode_error("truncated unicode escape", pos))?;
    u16::from_str_radix(hex, 16)
        .map_err(|e| decode_error(format!("bad unicode escape {hex:?}: {e}"), pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(encode: impl FnOnce(&mut String)) -> Token {
        let mut out = String::new();
        encode(&mut out);
        let (token, next) = decode(&out, 0).unwrap();
        assert_eq!(next, out.len(), "token not fully consumed: {out:?}");
        token
    }

    #[test]
    fn test_bool_roundtrip() {
        assert_eq!(roundtrip(|o| encode_bool(o, true)), Token::Bool(true));
        assert_eq!(roundtrip(|o| encode_bool(o, false)), Token::Bool(false));
    }

    #[test]
    fn test_integer_roundtrip() {
        assert_eq!(roundtrip(|o| encode_i8(o, -128)), Token::I8(-128));
        assert_eq!(roundtrip(|o| encode_i16(o, 31000)), Token::I16(31000));
        assert_eq!(roundtrip(|o| encode_i32(o, -7)), Token::I32(-7));
        assert_eq!(roundtrip(|o| encode_i64(o, i64::MIN)), Token::I64(i64::MIN));
    }

    #[test]
    fn test_float_bit_exact() {
        for value in [0.0f64, -0.0, 1.5, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let Token::F64(back) = roundtrip(|o| encode_f64(o, value)) else {
                panic!("wrong token type");
            };
            assert_eq!(back.to_bits(), value.to_bits());
        }
        for value in [0.1f32, -0.0, f32::NAN, f32::MIN_POSITIVE] {
            let Token::F32(back) = roundtrip(|o| encode_f32(o, value)) else {
                panic!("wrong token type");
            };
            assert_eq!(back.to_bits(), value.to_bits());
        }
    }

    #[test]
    fn test_float_human_fallback() {
        // Empty bits field falls back to the readable rendering.
        let (token, _) = decode("d|2.5|", 0).unwrap();
        assert_eq!(token, Token::F64(2.5));
    }

    #[test]
    fn test_char_roundtrip() {
        for value in ['a', '|', '"', '\u{1F600}'] {
            assert_eq!(roundtrip(|o| encode_char(o, value)), Token::Char(value));
        }
    }

    #[test]
    fn test_string_roundtrip() {
        for value in ["", "plain", "quo\"te\\slash", "tab\there", "mixed π≈3.14", "😀😀 run"] {
            assert_eq!(
                roundtrip(|o| encode_str(o, value)),
                Token::Str(value.to_string())
            );
        }
    }

    #[test]
    fn test_unicode_run_single_toggle() {
        let mut out = String::new();
        encode_str(&mut out, "a\u{0001}\u{0002}b");
        // Two contiguous specials share one unicode-mode run.
        assert_eq!(out, "\"a\\u00010002\\ub\"");
    }

    #[test]
    fn test_whitespace_skipped() {
        let (token, next) = decode("  \n i42|", 0).unwrap();
        assert_eq!(token, Token::I32(42));
        assert_eq!(next, 8);
    }

    #[test]
    fn test_decode_errors() {
        assert!(decode("", 0).is_err());
        assert!(decode("i42", 0).is_err()); // missing delimiter
        assert!(decode("ifoo|", 0).is_err()); // non-numeric payload
        assert!(decode("\"open", 0).is_err()); // unterminated string
        assert!(decode("z1|", 0).is_err()); // unknown tag
    }

    #[test]
    fn test_raw_non_ascii_rejected() {
        // Multi-byte UTF-8 must arrive through the unicode mode, never raw.
        let err = decode("\"caf\u{e9}\"", 0);
        assert!(matches!(err, Err(KarvaError::Decode { .. })));
    }

    #[test]
    fn test_sequential_tokens() {
        let mut out = String::new();
        encode_i32(&mut out, 3);
        encode_bool(&mut out, true);
        encode_f64(&mut out, -0.25);
        let (a, p) = decode(&out, 0).unwrap();
        let (b, p) = decode(&out, p).unwrap();
        let (c, p) = decode(&out, p).unwrap();
        assert_eq!(a, Token::I32(3));
        assert_eq!(b, Token::Bool(true));
        assert_eq!(c, Token::F64(-0.25));
        assert_eq!(p, out.len());
    }
}
