//! Decoding of string literals found in configuration values.
//!
//! Values arrive the way the bar serialized them: possibly wrapped in double
//! quotes, possibly carrying C-style escapes such as `\n`, `\x1b` or
//! `\u00e9`. [`decode`] turns them into plain UTF-8; [`clean_value`] is the
//! infallible wrapper used by the configuration parser.

use crate::logging::Logger;
use thiserror::Error;

/// Failure while expanding an escape sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// `\u` or `\U` ran past the end of the input.
    #[error("incomplete unicode escape: expected {expected} hex digits")]
    IncompleteUnicode { expected: usize },

    /// `\u` or `\U` followed by something that is not hexadecimal.
    #[error("invalid unicode escape sequence: \\{kind}{digits}")]
    InvalidUnicode { kind: char, digits: String },

    /// The escape named a value that is not a Unicode scalar value.
    #[error("invalid unicode code point: U+{0:X}")]
    InvalidCodePoint(u32),

    /// `\x` at the very end of the input.
    #[error("incomplete hexadecimal escape sequence")]
    IncompleteHex,

    /// `\x` not followed by any hex digit.
    #[error("invalid hexadecimal escape sequence before '{0}'")]
    InvalidHex(char),
}

/// Decode a raw configuration literal.
///
/// Trailing CR/LF characters are removed, one layer of surrounding double
/// quotes is stripped and escape sequences are expanded. Unknown single
/// character escapes are kept as the two characters `\` and the character.
///
/// # Examples
///
/// ```rust
/// use waygauge_core::decode::decode;
///
/// assert_eq!(decode("\"hello\\nworld\"").unwrap(), "hello\nworld");
/// assert_eq!(decode("\\u00e9").unwrap(), "é");
/// assert_eq!(decode("C:\\q").unwrap(), "C:\\q");
/// ```
///
/// # Errors
///
/// Returns a [`DecodeError`] for truncated or malformed `\x`, `\u` and `\U`
/// sequences.
pub fn decode(raw: &str) -> Result<String, DecodeError> {
    let body = strip_quotes(strip_line_endings(raw));
    let chars: Vec<char> = body.chars().collect();
    let mut out: Vec<u8> = Vec::with_capacity(body.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;
        if c != '\\' {
            push_char(&mut out, c);
            continue;
        }

        // A lone trailing backslash has nothing to escape and is dropped.
        let Some(&escape) = chars.get(i) else {
            break;
        };
        i += 1;

        match escape {
            '\\' | '\'' | '"' => push_char(&mut out, escape),
            'n' => out.push(b'\n'),
            'r' => out.push(b'\r'),
            't' => out.push(b'\t'),
            'v' => out.push(VERTICAL_TAB),
            '0' => out.push(NUL),
            'a' => out.push(BELL),
            'b' => out.push(BACKSPACE),
            'f' => out.push(FORM_FEED),
            'u' | 'U' => {
                let expected = if escape == 'u' { 4 } else { 8 };
                let digits = chars
                    .get(i..i + expected)
                    .ok_or(DecodeError::IncompleteUnicode { expected })?;
                i += expected;

                let code_point =
                    parse_hex(digits).ok_or_else(|| DecodeError::InvalidUnicode {
                        kind: escape,
                        digits: digits.iter().collect(),
                    })?;
                let ch =
                    char::from_u32(code_point).ok_or(DecodeError::InvalidCodePoint(code_point))?;
                push_char(&mut out, ch);
            }
            'x' => {
                let Some(&next) = chars.get(i) else {
                    return Err(DecodeError::IncompleteHex);
                };
                let count = chars[i..]
                    .iter()
                    .take(2)
                    .take_while(|c| c.is_ascii_hexdigit())
                    .count();
                if count == 0 {
                    return Err(DecodeError::InvalidHex(next));
                }
                // At most two hex digits, so the value always fits a byte.
                let value = parse_hex(&chars[i..i + count]).unwrap_or_default();
                out.push(value as u8);
                i += count;
            }
            other => {
                out.push(b'\\');
                push_char(&mut out, other);
            }
        }
    }

    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Decode `raw`, falling back to the raw text when it cannot be decoded.
///
/// The fallback keeps the trailing line-ending cleanup and logs a warning
/// through `logger`.
pub fn clean_value(raw: &str, logger: &dyn Logger) -> String {
    if raw.is_empty() {
        return String::new();
    }

    match decode(raw) {
        Ok(decoded) => decoded,
        Err(err) => {
            logger.warning(&format!("Error parsing escape sequences in {raw:?}: {err}"));
            strip_line_endings(raw).to_owned()
        }
    }
}

const NUL: u8 = 0x00;
const BELL: u8 = 0x07;
const BACKSPACE: u8 = 0x08;
const VERTICAL_TAB: u8 = 0x0B;
const FORM_FEED: u8 = 0x0C;

fn strip_line_endings(raw: &str) -> &str {
    raw.trim_end_matches(['\r', '\n'])
}

fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

fn parse_hex(digits: &[char]) -> Option<u32> {
    digits
        .iter()
        .try_fold(0u32, |acc, c| Some((acc << 4) | c.to_digit(16)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{Level, MemoryLogger};
    use proptest::prelude::*;

    #[test]
    fn test_strips_quotes_and_expands_newline() {
        assert_eq!(decode("\"hello\\nworld\"").unwrap(), "hello\nworld");
    }

    #[test]
    fn test_strips_only_one_layer_of_quotes() {
        assert_eq!(decode("\"\"x\"\"").unwrap(), "\"x\"");
        assert_eq!(decode("\"").unwrap(), "\"");
        assert_eq!(decode("\"open").unwrap(), "\"open");
    }

    #[test]
    fn test_strips_trailing_line_endings_before_quotes() {
        assert_eq!(decode("\"value\"\r\n\n").unwrap(), "value");
    }

    #[test]
    fn test_unicode_escape_encodes_utf8() {
        let decoded = decode("\\u00e9").unwrap();
        assert_eq!(decoded.as_bytes(), &[0xC3, 0xA9]);

        assert_eq!(decode("\\u0041").unwrap(), "A");
        assert_eq!(decode("\\u20AC").unwrap().as_bytes(), &[0xE2, 0x82, 0xAC]);
        assert_eq!(
            decode("\\U0001F600").unwrap().as_bytes(),
            &[0xF0, 0x9F, 0x98, 0x80]
        );
    }

    #[test]
    fn test_simple_escapes() {
        assert_eq!(decode("a\\tb").unwrap(), "a\tb");
        assert_eq!(decode("\\r").unwrap(), "\r");
        assert_eq!(decode("\\v").unwrap(), "\u{0B}");
        assert_eq!(decode("\\0").unwrap(), "\0");
        assert_eq!(decode("\\\\").unwrap(), "\\");
        assert_eq!(decode("\\'").unwrap(), "'");
        assert_eq!(decode("say \\\"hi\\\"").unwrap(), "say \"hi\"");
    }

    #[test]
    fn test_control_escapes_use_ascii_codes() {
        assert_eq!(decode("\\a").unwrap().as_bytes(), &[7]);
        assert_eq!(decode("\\b").unwrap().as_bytes(), &[8]);
        assert_eq!(decode("\\f").unwrap().as_bytes(), &[12]);
    }

    #[test]
    fn test_hex_escape() {
        assert_eq!(decode("\\x41").unwrap(), "A");
        assert_eq!(decode("\\x9").unwrap(), "\t");
        // Only two digits are consumed.
        assert_eq!(decode("\\x414").unwrap(), "A4");
        assert_eq!(decode("\\x1b[0m").unwrap(), "\u{1b}[0m");
    }

    #[test]
    fn test_hex_bytes_form_utf8() {
        assert_eq!(decode("\\xc3\\xa9").unwrap(), "é");
        assert_eq!(decode("a\\xffb").unwrap(), "a\u{FFFD}b");
    }

    #[test]
    fn test_unknown_escape_is_kept_literally() {
        assert_eq!(decode("\\q").unwrap(), "\\q");
        assert_eq!(decode("100\\%").unwrap(), "100\\%");
    }

    #[test]
    fn test_trailing_backslash_is_dropped() {
        assert_eq!(decode("abc\\").unwrap(), "abc");
    }

    #[test]
    fn test_incomplete_sequences_are_errors() {
        assert_eq!(
            decode("\\u12"),
            Err(DecodeError::IncompleteUnicode { expected: 4 })
        );
        assert_eq!(
            decode("\\U0001F60"),
            Err(DecodeError::IncompleteUnicode { expected: 8 })
        );
        assert_eq!(decode("\\x"), Err(DecodeError::IncompleteHex));
        assert_eq!(decode("\\xzz"), Err(DecodeError::InvalidHex('z')));
    }

    #[test]
    fn test_invalid_unicode_is_error() {
        assert!(matches!(
            decode("\\u12G4"),
            Err(DecodeError::InvalidUnicode { kind: 'u', .. })
        ));
        assert_eq!(
            decode("\\U00110000"),
            Err(DecodeError::InvalidCodePoint(0x110000))
        );
        assert_eq!(decode("\\uD800"), Err(DecodeError::InvalidCodePoint(0xD800)));
    }

    #[test]
    fn test_clean_value_falls_back_to_raw() {
        let logger = MemoryLogger::new();
        assert_eq!(clean_value("\"bad \\u12\"\n", &logger), "\"bad \\u12\"");
        assert!(logger.contains(Level::Warning, "Error parsing escape sequences"));
    }

    #[test]
    fn test_clean_value_decodes() {
        let logger = MemoryLogger::new();
        assert_eq!(clean_value("\"{icon} {usage}%\"", &logger), "{icon} {usage}%");
        assert_eq!(clean_value("", &logger), "");
        assert!(logger.is_empty());
    }

    proptest! {
        #[test]
        fn prop_clean_strings_are_fixed_points(s in "[^\\\\\"\r\n]*") {
            let once = decode(&s).unwrap();
            prop_assert_eq!(&once, &s);
            prop_assert_eq!(decode(&once).unwrap(), s);
        }
    }
}
