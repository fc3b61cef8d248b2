//! Decoder for the legacy serialized-blob format stored in translation and
//! configuration columns (`a:2:{s:3:"key";s:5:"value";...}`).
//!
//! Only scalars, strings and arrays are accepted. Object payloads are
//! rejected, never instantiated.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Deepest array nesting accepted before decoding is refused.
pub const MAX_DEPTH: usize = 512;

#[derive(Debug, Error, PartialEq)]
pub enum UnserializeError {
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEnd(usize),

    #[error("expected '{expected}' at byte {pos}, found '{found}'")]
    UnexpectedByte { pos: usize, expected: char, found: char },

    #[error("invalid number at byte {0}")]
    InvalidNumber(usize),

    #[error("string at byte {0} is not valid UTF-8")]
    InvalidUtf8(usize),

    #[error("unsupported type tag '{tag}' at byte {pos}")]
    UnsupportedType { tag: char, pos: usize },

    #[error("trailing data at byte {0}")]
    TrailingData(usize),

    #[error("top-level value is not an array")]
    NotAnArray,

    #[error("array nesting deeper than {max} at byte {pos}")]
    TooDeep { max: usize, pos: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhpKey {
    Int(i64),
    Str(String),
}

impl PhpKey {
    pub fn into_string(self) -> String {
        match self {
            PhpKey::Int(i) => i.to_string(),
            PhpKey::Str(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhpValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<(PhpKey, PhpValue)>),
}

impl PhpValue {
    /// Lists (keys `0..n` in order) become JSON arrays, every other array
    /// becomes an object with stringified keys. Non-finite floats become null.
    pub fn into_json(self) -> Value {
        match self {
            PhpValue::Null => Value::Null,
            PhpValue::Bool(b) => Value::Bool(b),
            PhpValue::Int(i) => Value::Number(i.into()),
            PhpValue::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
            PhpValue::Str(s) => Value::String(s),
            PhpValue::Array(entries) => {
                let is_list = entries
                    .iter()
                    .enumerate()
                    .all(|(idx, (key, _))| matches!(key, PhpKey::Int(i) if *i == idx as i64));
                if is_list && !entries.is_empty() {
                    Value::Array(entries.into_iter().map(|(_, v)| v.into_json()).collect())
                } else {
                    Value::Object(entries_to_map(entries))
                }
            }
        }
    }
}

fn entries_to_map(entries: Vec<(PhpKey, PhpValue)>) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(k, v)| (k.into_string(), v.into_json()))
        .collect()
}

pub fn unserialize(input: &str) -> Result<PhpValue, UnserializeError> {
    let mut parser = Parser {
        bytes: input.as_bytes(),
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    if parser.pos != parser.bytes.len() {
        return Err(UnserializeError::TrailingData(parser.pos));
    }
    Ok(value)
}

/// Decodes a blob that must hold an array, returning it as a JSON object
/// keyed by the stringified array keys.
pub fn unserialize_array(input: &str) -> Result<Map<String, Value>, UnserializeError> {
    match unserialize(input)? {
        PhpValue::Array(entries) => Ok(entries_to_map(entries)),
        _ => Err(UnserializeError::NotAnArray),
    }
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Result<u8, UnserializeError> {
        self.bytes
            .get(self.pos)
            .copied()
            .ok_or(UnserializeError::UnexpectedEnd(self.pos))
    }

    fn expect(&mut self, expected: u8) -> Result<(), UnserializeError> {
        let found = self.peek()?;
        if found != expected {
            return Err(UnserializeError::UnexpectedByte {
                pos: self.pos,
                expected: expected as char,
                found: found as char,
            });
        }
        self.pos += 1;
        Ok(())
    }

    /// Raw token up to (not including) `terminator`; consumes the terminator.
    fn token_until(&mut self, terminator: u8) -> Result<&'a str, UnserializeError> {
        let bytes = self.bytes;
        let start = self.pos;
        let rest = &bytes[start..];
        let len = rest
            .iter()
            .position(|b| *b == terminator)
            .ok_or(UnserializeError::UnexpectedEnd(bytes.len()))?;
        self.pos = start + len + 1;
        std::str::from_utf8(&rest[..len]).map_err(|_| UnserializeError::InvalidUtf8(start))
    }

    fn int_until(&mut self, terminator: u8) -> Result<i64, UnserializeError> {
        let start = self.pos;
        self.token_until(terminator)?
            .parse()
            .map_err(|_| UnserializeError::InvalidNumber(start))
    }

    fn value(&mut self) -> Result<PhpValue, UnserializeError> {
        let tag_pos = self.pos;
        let tag = self.peek()?;
        self.pos += 1;
        match tag {
            b'N' => {
                self.expect(b';')?;
                Ok(PhpValue::Null)
            }
            b'b' => {
                self.expect(b':')?;
                let start = self.pos;
                match self.token_until(b';')? {
                    "0" => Ok(PhpValue::Bool(false)),
                    "1" => Ok(PhpValue::Bool(true)),
                    _ => Err(UnserializeError::InvalidNumber(start)),
                }
            }
            b'i' => {
                self.expect(b':')?;
                Ok(PhpValue::Int(self.int_until(b';')?))
            }
            b'd' => {
                self.expect(b':')?;
                let start = self.pos;
                let raw = self.token_until(b';')?;
                let value = match raw {
                    "INF" => f64::INFINITY,
                    "-INF" => f64::NEG_INFINITY,
                    "NAN" => f64::NAN,
                    other => other
                        .parse()
                        .map_err(|_| UnserializeError::InvalidNumber(start))?,
                };
                Ok(PhpValue::Float(value))
            }
            b's' => {
                self.expect(b':')?;
                let len_pos = self.pos;
                let len = usize::try_from(self.int_until(b':')?)
                    .map_err(|_| UnserializeError::InvalidNumber(len_pos))?;
                self.expect(b'"')?;
                let start = self.pos;
                let end = start
                    .checked_add(len)
                    .filter(|end| *end <= self.bytes.len())
                    .ok_or(UnserializeError::UnexpectedEnd(self.bytes.len()))?;
                let text = std::str::from_utf8(&self.bytes[start..end])
                    .map_err(|_| UnserializeError::InvalidUtf8(start))?
                    .to_string();
                self.pos = end;
                self.expect(b'"')?;
                self.expect(b';')?;
                Ok(PhpValue::Str(text))
            }
            b'a' => {
                if self.depth >= MAX_DEPTH {
                    return Err(UnserializeError::TooDeep {
                        max: MAX_DEPTH,
                        pos: tag_pos,
                    });
                }
                self.depth += 1;
                let entries = self.array_body()?;
                self.depth -= 1;
                Ok(PhpValue::Array(entries))
            }
            other => Err(UnserializeError::UnsupportedType {
                tag: other as char,
                pos: tag_pos,
            }),
        }
    }

    fn array_body(&mut self) -> Result<Vec<(PhpKey, PhpValue)>, UnserializeError> {
        self.expect(b':')?;
        let count_pos = self.pos;
        let count = usize::try_from(self.int_until(b':')?)
            .map_err(|_| UnserializeError::InvalidNumber(count_pos))?;
        self.expect(b'{')?;
        let mut entries = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            let key_pos = self.pos;
            let key = match self.value()? {
                PhpValue::Int(i) => PhpKey::Int(i),
                PhpValue::Str(s) => PhpKey::Str(s),
                _ => {
                    return Err(UnserializeError::UnsupportedType {
                        tag: self.bytes[key_pos] as char,
                        pos: key_pos,
                    });
                }
            };
            let value = self.value()?;
            entries.push((key, value));
        }
        self.expect(b'}')?;
        Ok(entries)
    }
}
