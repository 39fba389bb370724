//! The key/value state machine shared by the query and cookie parsers.
//!
//! Input is scanned once, left to right. Bytes are accumulated into a key buffer
//! until `=` is seen, then into a value buffer until a pair separator or the end
//! of input. Percent escapes are decoded into the active buffer as raw bytes, so
//! multi-byte utf-8 sequences survive decoding.

use crate::value::coerce;
use crate::{ParseError, QueryMap};
use serde_json::Value;
use std::mem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ReadingKey,
    ReadingValue,
}

/// How a particular input format separates and frames its pairs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Dialect {
    separators: &'static [u8],
    skip_key_whitespace: bool,
    lenient_end: bool,
}

impl Dialect {
    /// `a=1&b=2;c=3`: strict, a dangling separator is an empty key.
    pub(crate) const QUERY: Dialect = Dialect { separators: b"&;", skip_key_whitespace: false, lenient_end: false };

    /// `a=1; b=2;`: whitespace before keys is ignored and a trailing `;` is fine.
    pub(crate) const COOKIE: Dialect = Dialect { separators: b";", skip_key_whitespace: true, lenient_end: true };
}

pub(crate) struct Scanner<'a> {
    input: &'a [u8],
    dialect: Dialect,
    convert_values: bool,
    state: State,
    pair_start: usize,
    key: Vec<u8>,
    value: Vec<u8>,
    result: QueryMap,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(input: &'a str, dialect: Dialect, convert_values: bool) -> Self {
        Self {
            input: input.as_bytes(),
            dialect,
            convert_values,
            state: State::ReadingKey,
            pair_start: 0,
            key: Vec::new(),
            value: Vec::new(),
            result: QueryMap::new(),
        }
    }

    pub(crate) fn scan(mut self) -> Result<QueryMap, ParseError> {
        let mut position = 0;
        while let Some(&byte) = self.input.get(position) {
            match byte {
                b'=' if self.state == State::ReadingKey => self.state = State::ReadingValue,
                b'%' => {
                    let decoded = self.decode_escape(position)?;
                    self.buffer().push(decoded);
                    position += 3;
                    continue;
                }
                _ if self.dialect.separators.contains(&byte) => self.flush(position)?,
                b' ' | b'\t' if self.skips_whitespace() => {}
                _ => self.buffer().push(byte),
            }
            position += 1;
        }
        self.finish(position)
    }

    fn skips_whitespace(&self) -> bool {
        self.dialect.skip_key_whitespace && self.state == State::ReadingKey && self.key.is_empty()
    }

    fn buffer(&mut self) -> &mut Vec<u8> {
        match self.state {
            State::ReadingKey => &mut self.key,
            State::ReadingValue => &mut self.value,
        }
    }

    fn decode_escape(&self, position: usize) -> Result<u8, ParseError> {
        let high = self.input.get(position + 1).copied().and_then(hex_value);
        let low = self.input.get(position + 2).copied().and_then(hex_value);
        match (high, low) {
            (Some(high), Some(low)) => Ok((high << 4) | low),
            _ => Err(ParseError::invalid_escape(position)),
        }
    }

    /// Stores the pending pair; an empty key is reported where its pair began.
    fn flush(&mut self, position: usize) -> Result<(), ParseError> {
        if self.key.is_empty() {
            return Err(ParseError::empty_key(self.pair_start));
        }

        let key = into_string(mem::take(&mut self.key), position)?;
        let value = into_string(mem::take(&mut self.value), position)?;
        let value = if self.convert_values { coerce(value) } else { Value::String(value) };

        self.result.insert(key, value);
        self.state = State::ReadingKey;
        self.pair_start = position + 1;
        Ok(())
    }

    fn finish(mut self, position: usize) -> Result<QueryMap, ParseError> {
        let pending = self.state == State::ReadingValue || !self.key.is_empty();
        if pending {
            self.flush(position)?;
        } else if !self.input.is_empty() && !self.dialect.lenient_end {
            return Err(ParseError::empty_key(self.pair_start));
        }
        Ok(self.result)
    }
}

fn into_string(bytes: Vec<u8>, position: usize) -> Result<String, ParseError> {
    String::from_utf8(bytes).map_err(|_err| ParseError::invalid_utf8(position))
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{Dialect, Scanner, hex_value};
    use crate::ParseError;
    use serde_json::json;

    #[test]
    fn test_hex_value() {
        assert_eq!(hex_value(b'0'), Some(0));
        assert_eq!(hex_value(b'a'), Some(10));
        assert_eq!(hex_value(b'F'), Some(15));
        assert_eq!(hex_value(b'g'), None);
    }

    #[test]
    fn test_escape_decodes_multi_byte_utf8() {
        let map = Scanner::new("name=%E4%BD%A0%E5%A5%BD", Dialect::QUERY, false).scan().unwrap();
        assert_eq!(map.get("name"), Some(&json!("你好")));
    }

    #[test]
    fn test_escape_producing_invalid_utf8() {
        let result = Scanner::new("name=%FF", Dialect::QUERY, false).scan();
        assert_eq!(result, Err(ParseError::invalid_utf8(8)));
    }

    #[test]
    fn test_second_equal_sign_is_part_of_value() {
        let map = Scanner::new("token=abc==", Dialect::QUERY, false).scan().unwrap();
        assert_eq!(map.get("token"), Some(&json!("abc==")));
    }

    #[test]
    fn test_escaped_separator_is_literal() {
        let map = Scanner::new("q=a%26b", Dialect::QUERY, false).scan().unwrap();
        assert_eq!(map.get("q"), Some(&json!("a&b")));
    }

    #[test]
    fn test_cookie_dialect_ignores_ampersand() {
        let map = Scanner::new("q=a&b", Dialect::COOKIE, false).scan().unwrap();
        assert_eq!(map.get("q"), Some(&json!("a&b")));
    }

    #[test]
    fn test_empty_key_reported_at_pair_start() {
        assert_eq!(Scanner::new("=1", Dialect::QUERY, false).scan(), Err(ParseError::empty_key(0)));
        assert_eq!(Scanner::new("a=1&=2", Dialect::QUERY, false).scan(), Err(ParseError::empty_key(4)));
        assert_eq!(Scanner::new("a=1;=2;", Dialect::COOKIE, false).scan(), Err(ParseError::empty_key(4)));
    }

    #[test]
    fn test_last_duplicate_wins() {
        let map = Scanner::new("a=1&a=2", Dialect::QUERY, false).scan().unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a"), Some(&json!("2")));
    }
}
