//! Cell values, column types and row identity.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Str(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Ordering used for display sorting.
    ///
    /// Null sorts first, then integers numerically, then strings
    /// case-insensitively with an exact comparison as tie-break.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(_), Value::Str(_)) => Ordering::Less,
            (Value::Str(_), Value::Int(_)) => Ordering::Greater,
            (Value::Str(a), Value::Str(b)) => a
                .to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Int(i64::from(b))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Declared semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Int,
}

impl ColumnType {
    /// Whether a value may be stored in a column of this type.
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null) | (ColumnType::String, Value::Str(_)) | (ColumnType::Int, Value::Int(_))
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::String => write!(f, "string"),
            ColumnType::Int => write!(f, "int"),
        }
    }
}

/// How key values are compared when rows are matched across snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCollation {
    /// Exact comparison.
    #[default]
    Ordinal,
    /// String parts compare ignoring case (directory attribute names, DNs).
    CaseInsensitive,
}

/// Identity of a row: the collated values of its key columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey(Vec<Value>);

impl RowKey {
    /// Build a key from selected columns of a row.
    pub fn from_values(values: &[Value], columns: &[usize], collation: KeyCollation) -> Self {
        RowKey(
            columns
                .iter()
                .map(|&c| {
                    let v = values.get(c).cloned().unwrap_or(Value::Null);
                    match (collation, v) {
                        (KeyCollation::CaseInsensitive, Value::Str(s)) => Value::Str(s.to_lowercase()),
                        (_, v) => v,
                    }
                })
                .collect(),
        )
    }

    /// True when every part is null (an unset optional link).
    pub fn is_null(&self) -> bool {
        self.0.iter().all(Value::is_null)
    }

    pub fn parts(&self) -> &[Value] {
        &self.0
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match part {
                Value::Null => write!(f, "null")?,
                other => write!(f, "{}", other)?,
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_deserializes_untagged() {
        let values: Vec<Value> = serde_json::from_str(r#"["a", 3, null]"#).unwrap();
        assert_eq!(values, vec![Value::from("a"), Value::Int(3), Value::Null]);
    }

    #[test]
    fn test_sort_cmp_orders_kinds_then_values() {
        assert_eq!(Value::Null.sort_cmp(&Value::Int(0)), Ordering::Less);
        assert_eq!(Value::Int(2).sort_cmp(&Value::Int(10)), Ordering::Less);
        assert_eq!(Value::from("apple").sort_cmp(&Value::from("Banana")), Ordering::Less);
        assert_eq!(Value::from("a").sort_cmp(&Value::from("A")), Ordering::Greater);
    }

    #[test]
    fn test_column_type_accepts() {
        assert!(ColumnType::Int.accepts(&Value::Int(1)));
        assert!(ColumnType::Int.accepts(&Value::Null));
        assert!(!ColumnType::Int.accepts(&Value::from("1")));
        assert!(ColumnType::String.accepts(&Value::from("x")));
    }

    #[test]
    fn test_row_key_collation() {
        let row = vec![Value::from("CN=Users"), Value::Int(1)];
        let exact = RowKey::from_values(&row, &[0], KeyCollation::Ordinal);
        let folded = RowKey::from_values(&row, &[0], KeyCollation::CaseInsensitive);
        let lower = RowKey::from_values(&[Value::from("cn=users")], &[0], KeyCollation::CaseInsensitive);
        assert_ne!(exact, folded);
        assert_eq!(folded, lower);
        assert_eq!(exact.to_string(), "(CN=Users)");
    }
}
