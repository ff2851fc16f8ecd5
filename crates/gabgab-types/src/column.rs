//! Column values and column types.
//!
//! `ColumnValue` is the dynamically typed cell used by update assignments,
//! predicates and evolved (non-base) columns. `ExtraColumn` describes a
//! nullable column appended to the table by schema evolution.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::StoreError;

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    Bytes(Vec<u8>),
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    /// Short type label used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnValue::Null => "null",
            ColumnValue::Bool(_) => "bool",
            ColumnValue::Int(_) => "int",
            ColumnValue::Float(_) => "float",
            ColumnValue::Text(_) => "text",
            ColumnValue::Timestamp(_) => "timestamp",
            ColumnValue::Bytes(_) => "bytes",
        }
    }

    /// Equality with SQL-like semantics: null never equals anything and
    /// integers compare numerically against floats.
    pub fn sql_eq(&self, other: &ColumnValue) -> bool {
        match (self, other) {
            (ColumnValue::Null, _) | (_, ColumnValue::Null) => false,
            (ColumnValue::Int(a), ColumnValue::Float(b))
            | (ColumnValue::Float(b), ColumnValue::Int(a)) => (*a as f64) == *b,
            (a, b) => a == b,
        }
    }

    /// Render as a SQL literal for a LanceDB filter or update expression.
    ///
    /// Text is single-quoted with embedded quotes doubled. Binary values and
    /// non-finite floats have no literal form.
    pub fn sql_literal(&self) -> Result<String, StoreError> {
        match self {
            ColumnValue::Null => Ok("NULL".to_string()),
            ColumnValue::Bool(b) => Ok(b.to_string()),
            ColumnValue::Int(i) => Ok(i.to_string()),
            ColumnValue::Float(f) if f.is_finite() => Ok(format!("{f:?}")),
            ColumnValue::Float(f) => Err(StoreError::InvalidPredicate(format!(
                "float literal {f} is not finite"
            ))),
            ColumnValue::Text(s) => Ok(format!("'{}'", s.replace('\'', "''"))),
            ColumnValue::Timestamp(ts) => Ok(format!(
                "TIMESTAMP '{}'",
                ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f")
            )),
            ColumnValue::Bytes(_) => Err(StoreError::InvalidPredicate(
                "binary values cannot be used in expressions".to_string(),
            )),
        }
    }

    /// Whether this value can be stored in a column of the given type.
    pub fn fits(&self, column_type: ColumnType) -> bool {
        matches!(
            (self, column_type),
            (ColumnValue::Null, _)
                | (ColumnValue::Text(_), ColumnType::Text)
                | (ColumnValue::Int(_), ColumnType::Int)
                | (ColumnValue::Int(_), ColumnType::Float)
                | (ColumnValue::Float(_), ColumnType::Float)
                | (ColumnValue::Bool(_), ColumnType::Bool)
        )
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Null => write!(f, "null"),
            ColumnValue::Bool(b) => write!(f, "{b}"),
            ColumnValue::Int(i) => write!(f, "{i}"),
            ColumnValue::Float(v) => write!(f, "{v}"),
            ColumnValue::Text(s) => write!(f, "{s}"),
            ColumnValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            ColumnValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Parse a loosely typed literal as typed on a command line.
///
/// `null`, `true`/`false`, integers and floats are recognized; quoted
/// strings keep their content verbatim; anything else is text.
impl FromStr for ColumnValue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(quote) = s.chars().next().filter(|c| *c == '\'' || *c == '"') {
            if s.len() < 2 || !s.ends_with(quote) {
                return Err(format!("unterminated string literal: {s}"));
            }
            let inner = &s[1..s.len() - 1];
            let doubled = format!("{quote}{quote}");
            return Ok(ColumnValue::Text(inner.replace(&doubled, &quote.to_string())));
        }

        match s.to_lowercase().as_str() {
            "null" => return Ok(ColumnValue::Null),
            "true" => return Ok(ColumnValue::Bool(true)),
            "false" => return Ok(ColumnValue::Bool(false)),
            _ => {}
        }

        if let Ok(i) = s.parse::<i64>() {
            return Ok(ColumnValue::Int(i));
        }
        match s.parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(ColumnValue::Float(f)),
            _ => Ok(ColumnValue::Text(s.to_string())),
        }
    }
}

impl From<&str> for ColumnValue {
    fn from(value: &str) -> Self {
        ColumnValue::Text(value.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(value: String) -> Self {
        ColumnValue::Text(value)
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::Int(value)
    }
}

impl From<i32> for ColumnValue {
    fn from(value: i32) -> Self {
        ColumnValue::Int(i64::from(value))
    }
}

impl From<f64> for ColumnValue {
    fn from(value: f64) -> Self {
        ColumnValue::Float(value)
    }
}

impl From<bool> for ColumnValue {
    fn from(value: bool) -> Self {
        ColumnValue::Bool(value)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ColumnValue::Null, Into::into)
    }
}

/// Storage type of a column added through schema evolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Int,
    Float,
    Bool,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Text => write!(f, "text"),
            ColumnType::Int => write!(f, "int"),
            ColumnType::Float => write!(f, "float"),
            ColumnType::Bool => write!(f, "bool"),
        }
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "string" | "utf8" => Ok(ColumnType::Text),
            "int" | "integer" | "int64" => Ok(ColumnType::Int),
            "float" | "double" | "float64" => Ok(ColumnType::Float),
            "bool" | "boolean" => Ok(ColumnType::Bool),
            other => Err(format!("invalid column type: '{other}'")),
        }
    }
}

/// A nullable column appended to an existing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtraColumn {
    pub name: String,
    pub column_type: ColumnType,
}

impl ExtraColumn {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Parses `name:type`, e.g. `quality_score:float`.
impl FromStr for ExtraColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, ty) = s
            .split_once(':')
            .ok_or_else(|| format!("expected name:type, got '{s}'"))?;
        let name = name.trim();
        if !is_column_name(name) {
            return Err(format!("invalid column name: '{name}'"));
        }
        Ok(ExtraColumn::new(name, ty.trim().parse()?))
    }
}

/// A column of the live table as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Scalar type, or `None` for columns that cannot be assigned
    /// (timestamp, binary audio, the embedding vector).
    pub column_type: Option<ColumnType>,
    pub nullable: bool,
}

/// Column names must be plain identifiers so they can be embedded in SQL
/// expressions without quoting.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Whether `name` may be used for a new column. A leading underscore is
/// reserved for store-generated columns such as `_distance` and `_rowid`.
pub fn is_column_name(name: &str) -> bool {
    is_identifier(name) && !name.starts_with('_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_column_values() {
        assert_eq!("null".parse::<ColumnValue>().unwrap(), ColumnValue::Null);
        assert_eq!("TRUE".parse::<ColumnValue>().unwrap(), ColumnValue::Bool(true));
        assert_eq!("42".parse::<ColumnValue>().unwrap(), ColumnValue::Int(42));
        assert_eq!("3.8".parse::<ColumnValue>().unwrap(), ColumnValue::Float(3.8));
        assert_eq!(
            "'it''s'".parse::<ColumnValue>().unwrap(),
            ColumnValue::Text("it's".to_string())
        );
        assert_eq!(
            "system".parse::<ColumnValue>().unwrap(),
            ColumnValue::Text("system".to_string())
        );
        assert!("'open".parse::<ColumnValue>().is_err());
    }

    #[test]
    fn test_sql_literals() {
        assert_eq!(ColumnValue::Float(4.0).sql_literal().unwrap(), "4.0");
        assert_eq!(ColumnValue::Int(-3).sql_literal().unwrap(), "-3");
        assert_eq!(
            ColumnValue::from("O'Brien").sql_literal().unwrap(),
            "'O''Brien'"
        );
        assert_eq!(ColumnValue::Null.sql_literal().unwrap(), "NULL");
        assert!(ColumnValue::Float(f64::NAN).sql_literal().is_err());
        assert!(ColumnValue::Bytes(vec![1, 2]).sql_literal().is_err());
    }

    #[test]
    fn test_sql_eq_semantics() {
        assert!(!ColumnValue::Null.sql_eq(&ColumnValue::Null));
        assert!(ColumnValue::Int(2).sql_eq(&ColumnValue::Float(2.0)));
        assert!(!ColumnValue::from("User").sql_eq(&ColumnValue::from("user")));
    }

    #[test]
    fn test_value_fits_column_type() {
        assert!(ColumnValue::Int(1).fits(ColumnType::Float));
        assert!(ColumnValue::Null.fits(ColumnType::Bool));
        assert!(!ColumnValue::Float(1.5).fits(ColumnType::Int));
        assert!(!ColumnValue::from("x").fits(ColumnType::Int));
    }

    #[test]
    fn test_parse_extra_column() {
        let col: ExtraColumn = "quality_score:float".parse().unwrap();
        assert_eq!(col, ExtraColumn::new("quality_score", ColumnType::Float));
        assert!("quality_score".parse::<ExtraColumn>().is_err());
        assert!("9lives:int".parse::<ExtraColumn>().is_err());
        assert!("tag:blob".parse::<ExtraColumn>().is_err());
        assert!("_note:text".parse::<ExtraColumn>().is_err());
    }

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("processing_time_ms"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("drop table"));
        assert!(!is_identifier("a-b"));
        assert!(is_column_name("quality_score"));
        assert!(!is_column_name("_distance"));
    }
}
