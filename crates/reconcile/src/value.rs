//! Field values.
//!
//! A [`Value`] is the semantic container for a single configuration
//! value. Comparison semantics (numeric coercion, set vs sequence,
//! null/absent equivalence, secret placeholders) live in the field
//! schema; the value itself only knows its own shape.

use std::collections::BTreeSet;
use std::fmt;

/// Masked sentinel the remote returns in place of stored secrets.
pub const SECRET_PLACEHOLDER: &str = "********";

/// A single configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent or explicitly null.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Unordered set of strings; compared as a set.
    StringSet(BTreeSet<String>),
    /// Ordered list of strings; compared as a sequence.
    StringList(Vec<String>),
}

impl Value {
    /// Human-readable type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "string",
            Self::StringSet(_) => "set",
            Self::StringList(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value is null, an empty string, or the masked
    /// secret placeholder. Secrets in any of these states carry no
    /// comparable content.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty() || s == SECRET_PLACEHOLDER,
            _ => false,
        }
    }

    /// Coerce to a boolean, accepting the textual forms remotes tend
    /// to send back.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(0) => Some(false),
            Self::Int(1) => Some(true),
            Self::Text(s) => match s.as_str() {
                "true" | "True" | "1" => Some(true),
                "false" | "False" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Coerce to an integer. Floats with no fractional part and
    /// numeric strings are accepted; anything else is not.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerce to a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerce to a string. Scalars render to their canonical textual
    /// form; collections do not coerce.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            _ => None,
        }
    }

    /// Coerce to an unordered string set. Lists collapse to sets.
    pub fn as_string_set(&self) -> Option<BTreeSet<String>> {
        match self {
            Self::StringSet(s) => Some(s.clone()),
            Self::StringList(l) => Some(l.iter().cloned().collect()),
            _ => None,
        }
    }

    /// Coerce to an ordered string list.
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        match self {
            Self::StringList(l) => Some(l.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::StringSet(s) => {
                let items: Vec<&str> = s.iter().map(String::as_str).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Self::StringList(l) => {
                let items: Vec<&str> = l.iter().map(String::as_str).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
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

impl<const N: usize> From<[&str; N]> for Value {
    fn from(items: [&str; N]) -> Self {
        Self::StringSet(items.iter().map(ToString::to_string).collect())
    }
}
