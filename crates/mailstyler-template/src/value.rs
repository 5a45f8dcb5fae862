//! Template data.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Data bound to a template.
///
/// Maps are ordered by key, so `range` over a map is deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value. Prints as nothing.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Number (integers are stored exactly up to 2^53).
    Number(f64),
    /// Plain text, escaped on output.
    Text(String),
    /// Ordered sequence.
    Seq(Vec<Value>),
    /// String-keyed map.
    Map(BTreeMap<String, Value>),
    /// Trusted markup, written without escaping.
    Html(String),
}

impl Value {
    /// Converts any serializable value.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` fails to serialize (for example a map
    /// with non-string keys).
    pub fn from_serialize<T: Serialize + ?Sized>(data: &T) -> serde_json::Result<Self> {
        serde_json::to_value(data).map(Self::from)
    }

    /// Short type name used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "nil",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "string",
            Self::Seq(_) => "slice",
            Self::Map(_) => "map",
            Self::Html(_) => "html",
        }
    }

    /// Truthiness as used by `if`, `with`, `and`, `or` and `not`: false,
    /// zero, nil and empty strings, sequences and maps are false.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::Text(s) | Self::Html(s) => !s.is_empty(),
            Self::Seq(items) => !items.is_empty(),
            Self::Map(map) => !map.is_empty(),
        }
    }

    /// Returns the text of a `Text` or `Html` value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Html(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number of a `Number` value.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the length of a string (in characters), sequence or map.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Text(s) | Self::Html(s) => Some(s.chars().count()),
            Self::Seq(items) => Some(items.len()),
            Self::Map(map) => Some(map.len()),
            _ => None,
        }
    }

    /// Looks up a field. Missing keys and fields of nil are nil.
    ///
    /// # Errors
    ///
    /// Returns an error if the value has no fields.
    pub fn field(&self, name: &str) -> Result<Self, String> {
        match self {
            Self::Map(map) => Ok(map.get(name).cloned().unwrap_or_default()),
            Self::Null => Ok(Self::Null),
            other => Err(format!("can't evaluate field {name} in type {}", other.kind())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) | Self::Html(s) => f.write_str(s),
            Self::Seq(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(map) => {
                f.write_str("map[")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{key}:{value}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => Self::Seq(items.into_iter().map(Self::from).collect()),
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Seq(items.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<Self>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
