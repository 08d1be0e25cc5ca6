//! Logical and protocol attribute values.
//!
//! Directory attributes are always multi-valued on the wire, but callers often work with a single
//! scalar. [`AttributeValue`] keeps track of which shape the caller used so that hydrated values can
//! be handed back in the same shape.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format used for directory generalized time values.
pub const GENERALIZED_TIME_FORMAT: &str = "%Y%m%d%H%M%S.0Z";

/// A single attribute value.
///
/// Variant order matters for untagged deserialisation: RFC 3339 strings become [`Value::Time`],
/// everything else that is a string becomes [`Value::Text`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Time(DateTime<Utc>),
    Text(String),
    Binary(Vec<u8>),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// `true` for null and for the empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Textual protocol form of the value. Binary values are returned lossily; use
    /// [`crate::escape`] helpers when the bytes must survive.
    pub fn to_protocol_text(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::Bool(true) => Cow::Borrowed("TRUE"),
            Value::Bool(false) => Cow::Borrowed("FALSE"),
            Value::Int(i) => Cow::Owned(i.to_string()),
            Value::Time(t) => Cow::Owned(t.format(GENERALIZED_TIME_FORMAT).to_string()),
            Value::Text(s) => Cow::Borrowed(s),
            Value::Binary(b) => String::from_utf8_lossy(b),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Time(_) => "time",
            Value::Text(_) => "text",
            Value::Binary(_) => "binary",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Binary(b) => {
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            other => f.write_str(&other.to_protocol_text()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Time(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Binary(value)
    }
}

/// The value(s) of one attribute, in the shape the caller supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Multi(Vec<Value>),
    Single(Value),
}

impl Default for AttributeValue {
    fn default() -> Self {
        AttributeValue::Single(Value::Null)
    }
}

impl AttributeValue {
    pub fn single(value: impl Into<Value>) -> Self {
        Self::Single(value.into())
    }

    pub fn multi<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::Multi(values.into_iter().map(Into::into).collect())
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, AttributeValue::Multi(_))
    }

    /// Flattens into a list of values regardless of shape.
    pub fn into_values(self) -> Vec<Value> {
        match self {
            AttributeValue::Single(v) => vec![v],
            AttributeValue::Multi(values) => values,
        }
    }

    pub fn values(&self) -> Vec<&Value> {
        match self {
            AttributeValue::Single(v) => vec![v],
            AttributeValue::Multi(values) => values.iter().collect(),
        }
    }

    /// Rebuilds a value using the same shape as `self`. A scalar that converts to several values
    /// becomes a list, since dropping values would lose data.
    pub fn reshaped(&self, mut values: Vec<Value>) -> AttributeValue {
        match self {
            AttributeValue::Single(_) if values.len() == 1 => AttributeValue::Single(values.remove(0)),
            AttributeValue::Single(_) if values.is_empty() => AttributeValue::Single(Value::Null),
            _ => AttributeValue::Multi(values),
        }
    }

    pub fn first(&self) -> Option<&Value> {
        match self {
            AttributeValue::Single(v) => Some(v),
            AttributeValue::Multi(values) => values.first(),
        }
    }

    /// An empty list, a null, or an empty string. A list holding only empty strings is not blank.
    pub fn is_blank(&self) -> bool {
        match self {
            AttributeValue::Single(v) => v.is_blank(),
            AttributeValue::Multi(values) => values.is_empty(),
        }
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        AttributeValue::Single(value)
    }
}

impl From<Vec<Value>> for AttributeValue {
    fn from(values: Vec<Value>) -> Self {
        AttributeValue::Multi(values)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Single(Value::from(value))
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Single(Value::Text(value))
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Single(Value::Bool(value))
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Single(Value::Int(value))
    }
}

/// Attribute name → value(s).
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// Case-insensitive lookup of an attribute key, returning the stored key.
pub fn find_key<'a>(map: &'a AttributeMap, name: &str) -> Option<&'a str> {
    map.keys().find(|key| key.eq_ignore_ascii_case(name)).map(String::as_str)
}
