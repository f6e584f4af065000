// Copyright 2025 Rowforge Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Boundary string helpers: case mapping with a short cache, hex codecs,
//! SQL identifier/literal quoting, Unicode literal decoding, XML text
//! escaping, and a process-wide interning cache.
//!
//! These helpers sit on compatibility boundaries, so their output is
//! bit-exact: same digits, same escape forms, same fault markers.

use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHasher;

use crate::core::{Error, Result};

const HEX: &[u8; 16] = b"0123456789abcdef";

// memory used by this cache:
// 2048 slots * 2 strings * up to 64 bytes each = 0.25 MB
const TO_UPPER_CACHE_LENGTH: usize = 2 * 1024;
const TO_UPPER_CACHE_MAX_ENTRY_LENGTH: usize = 64;

const INTERN_CACHE_SIZE: usize = 1024;

/// Minimum delay between wholesale rebuilds of the interning cache
const INTERN_CACHE_REBUILD_DELAY: Duration = Duration::from_secs(5);

type UpperCacheSlot = Mutex<Option<(Box<str>, Box<str>)>>;

fn upper_cache() -> &'static [UpperCacheSlot] {
    static CACHE: OnceLock<Box<[UpperCacheSlot]>> = OnceLock::new();
    CACHE.get_or_init(|| {
        (0..TO_UPPER_CACHE_LENGTH)
            .map(|_| Mutex::new(None))
            .collect()
    })
}

fn slot_hash(s: &str) -> usize {
    let mut hasher = FxHasher::default();
    s.hash(&mut hasher);
    hasher.finish() as usize
}

/// Convert a string to uppercase using the English locale.
///
/// Short strings go through a fixed-size, lossy, last-writer-wins cache;
/// a cache hit or miss is unobservable in the result.
pub fn to_upper_english(s: &str) -> String {
    if s.len() > TO_UPPER_CACHE_MAX_ENTRY_LENGTH {
        return s.to_uppercase();
    }
    let index = slot_hash(s) & (TO_UPPER_CACHE_LENGTH - 1);
    let slot = &upper_cache()[index];
    {
        let entry = slot.lock();
        if let Some((key, upper)) = entry.as_ref() {
            if key.as_ref() == s {
                return upper.to_string();
            }
        }
    }
    let upper = s.to_uppercase();
    *slot.lock() = Some((Box::from(s), Box::from(upper.as_str())));
    upper
}

/// Convert a string to lowercase using the English locale.
pub fn to_lower_english(s: &str) -> String {
    s.to_lowercase()
}

/// Convert a byte array to a hex encoded string, lowercase digits.
pub fn convert_bytes_to_hex(value: &[u8]) -> String {
    let mut out = String::with_capacity(value.len() * 2);
    for &b in value {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0xf) as usize] as char);
    }
    out
}

fn hex_decode(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Convert a hex encoded string to a byte array.
///
/// Odd length or a non-hex digit is a format error carrying the input.
pub fn convert_hex_to_bytes(s: &str) -> Result<Vec<u8>> {
    let bytes = s.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(Error::HexStringOdd(s.to_string()));
    }
    let mut out = Vec::with_capacity(bytes.len() / 2);
    for pair in bytes.chunks_exact(2) {
        let high = hex_decode(pair[0]).ok_or_else(|| Error::HexStringInvalid(s.to_string()))?;
        let low = hex_decode(pair[1]).ok_or_else(|| Error::HexStringInvalid(s.to_string()))?;
        out.push(high << 4 | low);
    }
    Ok(out)
}

/// Append the trailing `bytes` bytes of `x` as lowercase hex digits.
fn append_hex(builder: &mut String, x: u32, bytes: usize) {
    let mut i = bytes * 8;
    while i > 0 {
        i -= 4;
        builder.push(HEX[((x >> i) & 0xf) as usize] as char);
        i -= 4;
        builder.push(HEX[((x >> i) & 0xf) as usize] as char);
    }
}

/// Enclose a string in double quotes; an embedded double quote is doubled.
/// Strings with code points outside `[0x20, 0x7F)` switch to the Unicode
/// identifier form `U&"…"`.
pub fn quote_identifier(s: &str) -> String {
    quote_identifier_or_literal(s, '"')
}

/// Convert a string to a SQL character string literal in single quotes,
/// switching to the `U&'…'` form when needed.
pub fn quote_string_sql(s: &str) -> String {
    quote_identifier_or_literal(s, '\'')
}

fn quote_identifier_or_literal(s: &str, q: char) -> String {
    let mut builder = String::with_capacity(s.len() + 2);
    builder.push(q);
    for cp in s.chars() {
        if !(' '..'\u{7f}').contains(&cp) {
            // need to start from the beginning
            builder.clear();
            builder.push_str("U&");
            builder.push(q);
            for cp in s.chars() {
                if (' '..'\u{7f}').contains(&cp) {
                    if cp == q || cp == '\\' {
                        builder.push(cp);
                    }
                    builder.push(cp);
                } else if (cp as u32) <= 0xffff {
                    builder.push('\\');
                    append_hex(&mut builder, cp as u32, 2);
                } else {
                    builder.push_str("\\+");
                    append_hex(&mut builder, cp as u32, 3);
                }
            }
            builder.push(q);
            return builder;
        }
        if cp == q {
            builder.push(q);
        }
        builder.push(cp);
    }
    builder.push(q);
    builder
}

/// Insert a `[*]` fault marker into a string at the given character index.
pub fn add_asterisk(s: &str, index: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    let index = index.min(chars.len());
    let mut out = String::with_capacity(s.len() + 3);
    out.extend(&chars[..index]);
    out.push_str("[*]");
    out.extend(&chars[index..]);
    out
}

fn format_error(chars: &[char], i: usize) -> Error {
    let s: String = chars.iter().collect();
    Error::StringFormat(add_asterisk(&s, i))
}

/// Decode a Unicode SQL string.
///
/// `uencode` is the configured escape character (default `\`). `EExxxx`
/// decodes a BMP code point, `EE+xxxxxx` a supplementary one, and a doubled
/// `EE` is the literal escape character.
pub fn decode_unicode_string_sql(s: &str, uencode: char) -> Result<String> {
    let chars: Vec<char> = s.chars().collect();
    let l = chars.len();
    let mut builder = String::with_capacity(s.len());
    let mut i = 0;
    while i < l {
        let mut cp = chars[i] as u32;
        i += 1;
        if chars[i - 1] == uencode {
            if i >= l {
                return Err(format_error(&chars, i));
            }
            if chars[i] == uencode {
                i += 1;
            } else {
                let (digits, skip) = if chars[i] == '+' {
                    if i + 7 > l {
                        return Err(format_error(&chars, i));
                    }
                    (&chars[i + 1..i + 7], 7)
                } else {
                    if i + 4 > l {
                        return Err(format_error(&chars, i));
                    }
                    (&chars[i..i + 4], 4)
                };
                let hex: String = digits.iter().collect();
                i += skip;
                cp = u32::from_str_radix(&hex, 16).map_err(|_| format_error(&chars, i))?;
            }
        }
        match char::from_u32(cp) {
            Some(c) => builder.push(c),
            None => return Err(format_error(&chars, i)),
        }
    }
    Ok(builder)
}

/// Escape an XML text element.
///
/// `<`, `>`, `&`, `'` (as `&#39;`) and `"` become entity references; other
/// characters below `0x20` or above `0x7F` become numeric references.
pub fn xml_text(text: &str) -> String {
    let mut buff = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => buff.push_str("&lt;"),
            '>' => buff.push_str("&gt;"),
            '&' => buff.push_str("&amp;"),
            // &apos; is not valid in HTML
            '\'' => buff.push_str("&#39;"),
            '"' => buff.push_str("&quot;"),
            '\r' | '\n' | '\t' => buff.push(ch),
            _ => {
                if ch < ' ' || ch > '\u{7f}' {
                    buff.push_str(&format!("&#x{:x};", ch as u32));
                } else {
                    buff.push(ch);
                }
            }
        }
    }
    buff
}

struct InternCache {
    slots: Box<[Option<Arc<str>>]>,
}

static INTERN_CACHE: Mutex<Option<InternCache>> = Mutex::new(None);
static INTERN_CACHE_CREATED: Mutex<Option<Instant>> = Mutex::new(None);

/// Intern a string through the process-wide lossy slot cache.
///
/// Exists for latency, not correctness: the cache may be released
/// wholesale under memory pressure and rebuilds at most once per 5 seconds
/// to avoid thrash.
pub fn cache(s: &str) -> Arc<str> {
    let mut guard = INTERN_CACHE.lock();
    if guard.is_none() {
        let mut created = INTERN_CACHE_CREATED.lock();
        let throttled = created
            .map(|at| at.elapsed() < INTERN_CACHE_REBUILD_DELAY)
            .unwrap_or(false);
        if throttled {
            return Arc::from(s);
        }
        *created = Some(Instant::now());
        *guard = Some(InternCache {
            slots: (0..INTERN_CACHE_SIZE).map(|_| None).collect(),
        });
    }
    let cache = guard.as_mut().unwrap();
    let index = slot_hash(s) & (INTERN_CACHE_SIZE - 1);
    if let Some(existing) = &cache.slots[index] {
        if existing.as_ref() == s {
            return existing.clone();
        }
    }
    let interned: Arc<str> = Arc::from(s);
    cache.slots[index] = Some(interned.clone());
    interned
}

/// Release the interning cache wholesale.
pub fn clear_cache() {
    *INTERN_CACHE.lock() = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_upper_english() {
        assert_eq!(to_upper_english("abc"), "ABC");
        // hit the cache the second time around
        assert_eq!(to_upper_english("abc"), "ABC");
        assert_eq!(to_upper_english("café"), "CAFÉ");
        let long = "x".repeat(100);
        assert_eq!(to_upper_english(&long), long.to_uppercase());
        assert_eq!(to_lower_english("ABC"), "abc");
    }

    #[test]
    fn test_hex_round_trip() {
        let data: Vec<u8> = (0..=255).collect();
        let hex = convert_bytes_to_hex(&data);
        assert_eq!(convert_hex_to_bytes(&hex).unwrap(), data);
        assert_eq!(convert_bytes_to_hex(&[0xde, 0xad]), "dead");
        assert_eq!(convert_hex_to_bytes("").unwrap(), Vec::<u8>::new());
        // upper-case digits decode too
        assert_eq!(convert_hex_to_bytes("DEAD").unwrap(), vec![0xde, 0xad]);
    }

    #[test]
    fn test_hex_errors() {
        assert_eq!(
            convert_hex_to_bytes("4"),
            Err(Error::HexStringOdd("4".to_string()))
        );
        assert_eq!(
            convert_hex_to_bytes("4g"),
            Err(Error::HexStringInvalid("4g".to_string()))
        );
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("a"), "\"a\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_identifier("café"), "U&\"caf\\00e9\"");
        assert_eq!(quote_identifier("𝄞"), "U&\"\\+01d11e\"");
        // backslash is doubled in the Unicode form
        assert_eq!(quote_identifier("a\\\u{1}"), "U&\"a\\\\\\0001\"");
    }

    #[test]
    fn test_quote_string_sql() {
        assert_eq!(quote_string_sql("it's"), "'it''s'");
        assert_eq!(quote_string_sql("café"), "U&'caf\\00e9'");
    }

    #[test]
    fn test_decode_unicode_round_trip() {
        for s in ["hello", "a\"b", "café", "𝄞 clef", "mix\\ed"] {
            let quoted = quote_identifier(s);
            let inner = quoted
                .strip_prefix("U&\"")
                .or_else(|| quoted.strip_prefix('"'))
                .unwrap()
                .strip_suffix('"')
                .unwrap();
            // plain form only doubles quotes; Unicode form needs decoding
            let decoded = if quoted.starts_with("U&") {
                decode_unicode_string_sql(&inner.replace("\"\"", "\""), '\\').unwrap()
            } else {
                inner.replace("\"\"", "\"")
            };
            assert_eq!(decoded, s);
        }
    }

    #[test]
    fn test_decode_unicode_errors() {
        // truncated escapes carry a fault marker
        let err = decode_unicode_string_sql("ab\\00", '\\').unwrap_err();
        assert!(matches!(err, Error::StringFormat(ref s) if s.contains("[*]")));
        let err = decode_unicode_string_sql("\\+01d1", '\\').unwrap_err();
        assert!(err.is_format_error());
        // bad digits
        assert!(decode_unicode_string_sql("\\zzzz", '\\').is_err());
        // doubled escape decodes to the escape character
        assert_eq!(decode_unicode_string_sql("a\\\\b", '\\').unwrap(), "a\\b");
        // alternate escape character
        assert_eq!(decode_unicode_string_sql("#0041", '#').unwrap(), "A");
    }

    #[test]
    fn test_add_asterisk() {
        assert_eq!(add_asterisk("abcd", 2), "ab[*]cd");
        assert_eq!(add_asterisk("ab", 9), "ab[*]");
    }

    #[test]
    fn test_xml_text() {
        assert_eq!(xml_text("a<b>&'\""), "a&lt;b&gt;&amp;&#39;&quot;");
        assert_eq!(xml_text("tab\there"), "tab\there");
        assert_eq!(xml_text("é"), "&#xe9;");
        assert_eq!(xml_text("\u{1}"), "&#x1;");
    }

    #[test]
    fn test_intern_cache() {
        clear_cache();
        // the first call after a clear may be throttled and uncached, but
        // values always compare equal
        let a = cache("some string");
        let b = cache("some string");
        assert_eq!(a, b);
    }
}
