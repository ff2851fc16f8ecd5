//! Row predicates for conditional updates and search filters.
//!
//! Predicates are deliberately small: column equality, null checks and
//! conjunction. They render to a LanceDB (DataFusion SQL) filter string and
//! can also be evaluated directly against a [`Recording`].
//!
//! ```
//! use gabgab_types::predicate::Predicate;
//!
//! let p: Predicate = "speaker = 'system' and quality_score is null".parse().unwrap();
//! assert_eq!(
//!     p.to_sql().unwrap(),
//!     "(speaker = 'system') AND (quality_score IS NULL)"
//! );
//! ```

use std::fmt;
use std::str::FromStr;

use crate::column::{is_identifier, ColumnValue};
use crate::error::StoreError;
use crate::recording::Recording;

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(String, ColumnValue),
    IsNull(String),
    IsNotNull(String),
    And(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: impl Into<ColumnValue>) -> Self {
        Predicate::Eq(column.into(), value.into())
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Predicate::IsNull(column.into())
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Predicate::IsNotNull(column.into())
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    /// All column names referenced by this predicate, in order of appearance.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Predicate::Eq(c, _) | Predicate::IsNull(c) | Predicate::IsNotNull(c) => vec![c],
            Predicate::And(l, r) => {
                let mut cols = l.columns();
                cols.extend(r.columns());
                cols
            }
        }
    }

    /// Render as a SQL filter expression.
    ///
    /// Fails with `InvalidPredicate` if a column name is not an identifier or
    /// a value has no literal form.
    pub fn to_sql(&self) -> Result<String, StoreError> {
        match self {
            Predicate::Eq(c, ColumnValue::Null) | Predicate::IsNull(c) => {
                Ok(format!("{} IS NULL", checked_column(c)?))
            }
            Predicate::Eq(c, v) => Ok(format!("{} = {}", checked_column(c)?, v.sql_literal()?)),
            Predicate::IsNotNull(c) => Ok(format!("{} IS NOT NULL", checked_column(c)?)),
            Predicate::And(l, r) => Ok(format!("({}) AND ({})", l.to_sql()?, r.to_sql()?)),
        }
    }

    /// Evaluate against a recording with SQL semantics (unknown columns and
    /// nulls never compare equal).
    pub fn matches(&self, recording: &Recording) -> bool {
        match self {
            Predicate::Eq(c, ColumnValue::Null) | Predicate::IsNull(c) => {
                recording.value_of(c).is_some_and(|v| v.is_null())
            }
            Predicate::Eq(c, expected) => recording
                .value_of(c)
                .is_some_and(|v| v.sql_eq(expected)),
            Predicate::IsNotNull(c) => recording.value_of(c).is_some_and(|v| !v.is_null()),
            Predicate::And(l, r) => l.matches(recording) && r.matches(recording),
        }
    }
}

fn checked_column(column: &str) -> Result<&str, StoreError> {
    if is_identifier(column) {
        Ok(column)
    } else {
        Err(StoreError::InvalidPredicate(format!(
            "invalid column name: '{column}'"
        )))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Eq(c, ColumnValue::Text(s)) => write!(f, "{c} = '{}'", s.replace('\'', "''")),
            Predicate::Eq(c, v) => write!(f, "{c} = {v}"),
            Predicate::IsNull(c) => write!(f, "{c} is null"),
            Predicate::IsNotNull(c) => write!(f, "{c} is not null"),
            Predicate::And(l, r) => write!(f, "{l} and {r}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
    Equals,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '=' {
            chars.next();
            tokens.push(Token::Equals);
        } else if c == '\'' || c == '"' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    Some(q) if q == c => {
                        // A doubled quote is an escaped quote character.
                        if chars.peek() == Some(&c) {
                            chars.next();
                            text.push(c);
                        } else {
                            break;
                        }
                    }
                    Some(other) => text.push(other),
                    None => return Err(format!("unterminated string literal in '{input}'")),
                }
            }
            tokens.push(Token::Quoted(text));
        } else {
            let mut word = String::new();
            while let Some(&w) = chars.peek() {
                if w.is_whitespace() || w == '=' || w == '\'' || w == '"' {
                    break;
                }
                word.push(w);
                chars.next();
            }
            tokens.push(Token::Word(word));
        }
    }

    Ok(tokens)
}

fn is_keyword(token: Option<&Token>, keyword: &str) -> bool {
    matches!(token, Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
}

/// Parses `col = value`, `col is [not] null`, joined with `and`.
impl FromStr for Predicate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = tokenize(s)?;
        let mut pos = 0;
        let mut predicate: Option<Predicate> = None;

        loop {
            let column = match tokens.get(pos) {
                Some(Token::Word(w)) if is_identifier(w) => w.clone(),
                Some(other) => return Err(format!("expected column name, found {other:?}")),
                None => return Err(format!("empty predicate: '{s}'")),
            };
            pos += 1;

            let term = match tokens.get(pos) {
                Some(Token::Equals) => {
                    pos += 1;
                    let value = match tokens.get(pos) {
                        Some(Token::Quoted(text)) => ColumnValue::Text(text.clone()),
                        Some(Token::Word(w)) => w.parse()?,
                        _ => return Err(format!("expected value after '{column} ='")),
                    };
                    pos += 1;
                    Predicate::Eq(column, value)
                }
                t if is_keyword(t, "is") => {
                    pos += 1;
                    let negated = is_keyword(tokens.get(pos), "not");
                    if negated {
                        pos += 1;
                    }
                    if !is_keyword(tokens.get(pos), "null") {
                        return Err(format!("expected NULL after '{column} is'"));
                    }
                    pos += 1;
                    if negated {
                        Predicate::IsNotNull(column)
                    } else {
                        Predicate::IsNull(column)
                    }
                }
                _ => return Err(format!("expected '=' or 'is' after '{column}'")),
            };

            predicate = Some(match predicate {
                Some(lhs) => lhs.and(term),
                None => term,
            });

            match tokens.get(pos) {
                None => break,
                t if is_keyword(t, "and") => pos += 1,
                Some(other) => return Err(format!("unexpected token {other:?}")),
            }
        }

        predicate.ok_or_else(|| format!("empty predicate: '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{NewRecording, EMBEDDING_DIMENSION};
    use chrono::Utc;

    fn recording(speaker: Option<&str>) -> Recording {
        let mut new = NewRecording::new("rec-1", "turn on the lights", "kokoro-82m", 2700);
        new.speaker = speaker.map(str::to_string);
        new.into_recording(vec![0.0; EMBEDDING_DIMENSION], Utc::now())
            .unwrap()
    }

    #[test]
    fn test_parse_null_check() {
        let p: Predicate = "quality_score is null".parse().unwrap();
        assert_eq!(p, Predicate::is_null("quality_score"));

        let p: Predicate = "speaker IS NOT NULL".parse().unwrap();
        assert_eq!(p, Predicate::is_not_null("speaker"));
    }

    #[test]
    fn test_parse_equality_and_conjunction() {
        let p: Predicate = "speaker = 'system' and duration_ms = 4200".parse().unwrap();
        assert_eq!(
            p,
            Predicate::eq("speaker", "system").and(Predicate::eq("duration_ms", 4200_i64))
        );
        assert_eq!(p.columns(), vec!["speaker", "duration_ms"]);
    }

    #[test]
    fn test_parse_escaped_quote() {
        let p: Predicate = "speaker = 'O''Brien'".parse().unwrap();
        assert_eq!(p, Predicate::eq("speaker", "O'Brien"));
        assert_eq!(p.to_sql().unwrap(), "speaker = 'O''Brien'");
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<Predicate>().is_err());
        assert!("speaker".parse::<Predicate>().is_err());
        assert!("speaker = ".parse::<Predicate>().is_err());
        assert!("speaker is empty".parse::<Predicate>().is_err());
        assert!("speaker = 'x' or model = 'y'".parse::<Predicate>().is_err());
        assert!("speaker = 'x".parse::<Predicate>().is_err());
    }

    #[test]
    fn test_to_sql_rejects_bad_column() {
        let p = Predicate::eq("speaker; drop", "x");
        assert!(matches!(p.to_sql(), Err(StoreError::InvalidPredicate(_))));
    }

    #[test]
    fn test_eq_null_renders_is_null() {
        let p = Predicate::eq("speaker", ColumnValue::Null);
        assert_eq!(p.to_sql().unwrap(), "speaker IS NULL");
    }

    #[test]
    fn test_matches() {
        let system = recording(Some("system"));
        let anonymous = recording(None);

        let p = Predicate::eq("speaker", "system");
        assert!(p.matches(&system));
        assert!(!p.matches(&anonymous));
        assert!(!Predicate::eq("speaker", "System").matches(&system));

        assert!(Predicate::is_null("speaker").matches(&anonymous));
        assert!(Predicate::is_not_null("speaker").matches(&system));
        assert!(!Predicate::is_null("unknown_column").matches(&system));

        let both = Predicate::eq("speaker", "system").and(Predicate::eq("duration_ms", 2700_i64));
        assert!(both.matches(&system));
    }

    #[test]
    fn test_display_roundtrips_through_parser() {
        let p = Predicate::eq("model", "lfm2.5").and(Predicate::is_null("quality_score"));
        let reparsed: Predicate = p.to_string().parse().unwrap();
        assert_eq!(reparsed, p);
    }
}
