//! Explicit-presence access to loosely typed source rows.
//!
//! Source rows come as JSON objects whose keys and value types vary per
//! source version: numbers arrive as strings, booleans as `"1"`/`"0"`, and
//! any key may be missing. Every accessor here returns a [`Field`] so callers
//! branch on absence instead of probing nested maps ad hoc.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Field<'a> {
    Absent,
    Null,
    Present(&'a Value),
}

impl<'a> Field<'a> {
    pub fn from_option(value: Option<&'a Value>) -> Self {
        match value {
            None => Field::Absent,
            Some(Value::Null) => Field::Null,
            Some(v) => Field::Present(v),
        }
    }

    pub fn value(self) -> Option<&'a Value> {
        match self {
            Field::Present(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_present(self) -> bool {
        matches!(self, Field::Present(_))
    }

    /// Missing, null, empty string or empty collection.
    pub fn is_blank(self) -> bool {
        match self {
            Field::Absent | Field::Null => true,
            Field::Present(Value::String(s)) => s.is_empty(),
            Field::Present(Value::Array(items)) => items.is_empty(),
            Field::Present(Value::Object(map)) => map.is_empty(),
            Field::Present(_) => false,
        }
    }

    pub fn as_str(self) -> Option<&'a str> {
        self.value().and_then(Value::as_str)
    }

    /// Non-empty string content.
    pub fn as_text(self) -> Option<&'a str> {
        self.as_str().filter(|s| !s.is_empty())
    }

    /// Scalar rendered as an identifier: strings verbatim, numbers in their
    /// shortest form. Empty strings count as missing.
    pub fn as_id(self) -> Option<String> {
        match self.value()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn as_f64(self) -> Option<f64> {
        match self.value()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_i64(self) -> Option<i64> {
        match self.value()? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
            }
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Source-system truthiness: `true`, non-zero numbers and any string
    /// other than `""`/`"0"`.
    pub fn as_bool(self) -> bool {
        match self.value() {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => !s.is_empty() && s != "0",
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            _ => false,
        }
    }

    pub fn as_object(self) -> Option<&'a Map<String, Value>> {
        self.value().and_then(Value::as_object)
    }

    pub fn as_array(self) -> Option<&'a Vec<Value>> {
        self.value().and_then(Value::as_array)
    }

    /// Nested access, `Absent` as soon as a level is not an object.
    pub fn get(self, key: &str) -> Field<'a> {
        match self.as_object() {
            Some(map) => Field::from_option(map.get(key)),
            None => Field::Absent,
        }
    }
}

/// Read-only view over a source row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRecord {
    data: Map<String, Value>,
}

impl RawRecord {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    /// `None` when the value is not a JSON object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(data) => Some(Self { data }),
            _ => None,
        }
    }

    pub fn field(&self, key: &str) -> Field<'_> {
        Field::from_option(self.data.get(key))
    }

    pub fn path(&self, keys: &[&str]) -> Field<'_> {
        let mut keys = keys.iter();
        let mut current = match keys.next() {
            Some(first) => self.field(first),
            None => return Field::Absent,
        };
        for key in keys {
            current = current.get(key);
        }
        current
    }

    pub fn id(&self, key: &str) -> Option<String> {
        self.field(key).as_id()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.data.clone())
    }

    /// Mutable copy used while converting; the original stays untouched.
    pub fn working_copy(&self) -> Working {
        Working {
            data: self.data.clone(),
        }
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(data: Map<String, Value>) -> Self {
        Self::new(data)
    }
}

/// Consumable copy of a row. Converters take the keys they map; whatever
/// remains becomes the `unmapped` part of the result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Working {
    data: Map<String, Value>,
}

impl Working {
    pub fn new(data: Map<String, Value>) -> Self {
        Self { data }
    }

    pub fn field(&self, key: &str) -> Field<'_> {
        Field::from_option(self.data.get(key))
    }

    pub fn take(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key).filter(|v| !v.is_null())
    }

    pub fn take_id(&mut self, key: &str) -> Option<String> {
        let id = self.field(key).as_id();
        self.data.remove(key);
        id
    }

    pub fn take_text(&mut self, key: &str) -> Option<String> {
        let text = self.field(key).as_text().map(str::to_string);
        self.data.remove(key);
        text
    }

    pub fn take_f64(&mut self, key: &str) -> Option<f64> {
        let value = self.field(key).as_f64();
        self.data.remove(key);
        value
    }

    pub fn take_i64(&mut self, key: &str) -> Option<i64> {
        let value = self.field(key).as_i64();
        self.data.remove(key);
        value
    }

    pub fn take_bool(&mut self, key: &str) -> bool {
        let value = self.field(key).as_bool();
        self.data.remove(key);
        value
    }

    pub fn take_object(&mut self, key: &str) -> Option<Map<String, Value>> {
        match self.data.remove(key) {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        }
    }

    pub fn take_array(&mut self, key: &str) -> Option<Vec<Value>> {
        match self.data.remove(key) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        }
    }

    /// Drops keys that have no counterpart in the destination schema.
    pub fn discard(&mut self, keys: &[&str]) {
        for key in keys {
            self.data.remove(*key);
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Leftover keys, `None` if everything was consumed.
    pub fn into_unmapped(self) -> Option<Value> {
        if self.data.is_empty() {
            None
        } else {
            Some(Value::Object(self.data))
        }
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        RawRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_field_presence_states() {
        let rec = record(json!({"a": null, "b": "", "c": "x"}));
        assert_eq!(rec.field("a"), Field::Null);
        assert_eq!(rec.field("missing"), Field::Absent);
        assert!(rec.field("b").is_present());
        assert!(rec.field("b").is_blank());
        assert!(!rec.field("c").is_blank());
    }

    #[test]
    fn test_loose_scalar_coercion() {
        let rec = record(json!({
            "price": "5.010",
            "qty": 3,
            "active": "1",
            "inactive": "0",
            "id": 15,
        }));
        assert_eq!(rec.field("price").as_f64(), Some(5.01));
        assert_eq!(rec.field("qty").as_i64(), Some(3));
        assert!(rec.field("active").as_bool());
        assert!(!rec.field("inactive").as_bool());
        assert_eq!(rec.id("id").as_deref(), Some("15"));
    }

    #[test]
    fn test_nested_path() {
        let rec = record(json!({"shop": {"customer_scope": "1"}, "flat": "x"}));
        assert_eq!(rec.path(&["shop", "customer_scope"]).as_str(), Some("1"));
        assert_eq!(rec.path(&["flat", "deeper"]), Field::Absent);
        assert_eq!(rec.path(&[]), Field::Absent);
    }

    #[test]
    fn test_working_copy_leftovers() {
        let rec = record(json!({"id": "1", "name": "A", "legacy": true}));
        let mut working = rec.working_copy();
        assert_eq!(working.take_id("id").as_deref(), Some("1"));
        assert_eq!(working.take_text("name").as_deref(), Some("A"));
        assert_eq!(working.into_unmapped(), Some(json!({"legacy": true})));
        // The source row is untouched.
        assert_eq!(rec.as_map().len(), 3);
    }
}
