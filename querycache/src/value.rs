// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Value type system for query arguments and row columns
//!
//! Supports the scalar types a relational executor hands back:
//! - Basic types: String, Integer, Number, Boolean, Null
//! - Collections: Array (used for `IN (...)` style arguments)

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Comparison mode used when ordering string values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collation {
    /// Byte-wise, case-sensitive comparison
    #[default]
    Binary,
    /// Case-insensitive comparison (Unicode lowercase folding)
    CaseInsensitive,
}

/// Dynamic value bound to a query argument or stored in a row column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    String(String),
    Array(Vec<Value>),
}

impl Value {
    /// Extract as integer if possible
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract as number, widening integers
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Render the value as a cache key fragment.
    ///
    /// Arrays render as a bracketed, comma-joined list. Separator and
    /// bracket characters inside strings are backslash-escaped, so values
    /// of different shapes never render to the same fragment.
    pub fn key_fragment(&self) -> String {
        match self {
            Value::Null => "\\N".to_string(),
            Value::Boolean(b) => if *b { "1" } else { "0" }.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::String(s) => escape_fragment(s),
            Value::Array(items) => format!(
                "[{}]",
                items
                    .iter()
                    .map(Value::key_fragment)
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        }
    }

    /// Equality used by row filters: integers and numbers compare by
    /// numeric value, everything else structurally.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Integer(_) | Value::Number(_), Value::Integer(_) | Value::Number(_)) => {
                self.as_number() == other.as_number()
            }
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            _ => self == other,
        }
    }

    /// Total ordering for sorting result rows.
    ///
    /// Values of different kinds order as
    /// Null < Boolean < Integer/Number < String < Array.
    pub fn compare(&self, other: &Value, collation: Collation) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Integer(_) | Value::Number(_), Value::Integer(_) | Value::Number(_)) => {
                let a = self.as_number().unwrap_or(f64::NAN);
                let b = other.as_number().unwrap_or(f64::NAN);
                a.total_cmp(&b)
            }
            (Value::String(a), Value::String(b)) => match collation {
                Collation::Binary => a.cmp(b),
                Collation::CaseInsensitive => a
                    .to_lowercase()
                    .cmp(&b.to_lowercase())
                    .then_with(|| a.cmp(b)),
            },
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b) {
                    let ord = x.compare(y, collation);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) | Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
        }
    }
}

/// Backslash-escape the characters key derivation uses as separators.
pub fn escape_fragment(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | ':' | ',' | '=' | '[' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, item) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Null => write!(f, "null"),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(vec: Vec<T>) -> Self {
        Value::Array(vec.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_fragment_brackets_arrays() {
        let value = Value::from(vec![1i64, 2, 3]);
        assert_eq!(value.key_fragment(), "[1,2,3]");
        assert_eq!(Value::from("abc").key_fragment(), "abc");
        assert_eq!(Value::Number(5.0).key_fragment(), "5");
        assert_eq!(Value::Number(2.5).key_fragment(), "2.5");
        assert_eq!(Value::Boolean(true).key_fragment(), "1");
    }

    #[test]
    fn test_key_fragment_escapes_separators() {
        let joined = Value::from("1,2").key_fragment();
        let array = Value::from(vec![1i64, 2]).key_fragment();
        assert_ne!(joined, array);
        assert_eq!(joined, "1\\,2");
        assert_eq!(Value::from("a:b").key_fragment(), "a\\:b");
        assert_ne!(Value::Null.key_fragment(), Value::from("").key_fragment());
    }

    #[test]
    fn test_key_fragment_distinguishes_arrays_from_scalars() {
        let pairs = [
            (Value::from(vec!["a"]), Value::from("a")),
            (Value::Array(vec![]), Value::from("")),
            (Value::Array(vec![Value::Null]), Value::Null),
            (Value::from(vec!["a"]), Value::from("[a]")),
            (
                Value::Array(vec![Value::from(vec![1i64]), Value::Integer(2)]),
                Value::Array(vec![Value::Integer(1), Value::from(vec![2i64])]),
            ),
        ];
        for (array, other) in pairs {
            assert_ne!(array.key_fragment(), other.key_fragment(), "{} vs {}", array, other);
        }
        assert_eq!(Value::from("[a]").key_fragment(), "\\[a\\]");
    }

    #[test]
    fn test_compare_orders_kinds() {
        assert_eq!(
            Value::Null.compare(&Value::Integer(1), Collation::Binary),
            Ordering::Less
        );
        assert_eq!(
            Value::Integer(2).compare(&Value::Number(1.5), Collation::Binary),
            Ordering::Greater
        );
        assert_eq!(
            Value::from("b").compare(&Value::Integer(100), Collation::Binary),
            Ordering::Greater
        );
    }

    #[test]
    fn test_case_insensitive_collation() {
        let lower = Value::from("apple");
        let upper = Value::from("Banana");
        assert_eq!(lower.compare(&upper, Collation::Binary), Ordering::Greater);
        assert_eq!(
            lower.compare(&upper, Collation::CaseInsensitive),
            Ordering::Less
        );
    }

    #[test]
    fn test_loose_eq_numeric() {
        assert!(Value::Integer(5).loose_eq(&Value::Number(5.0)));
        assert!(!Value::Integer(5).loose_eq(&Value::from("5")));
    }
}
