//! Type definitions shared by the gateway, dispatcher and handlers

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Table Identifiers
// ============================================================================

/// Schema-qualified table name
///
/// Parsed from `name`, `schema.name` or bracketed parts such as
/// `[sales].[order.lines]` (a literal `]` is written `]]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableIdentifier {
    schema: Option<String>,
    name: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("table identifier is empty")]
    Empty,

    #[error("identifier part {0} is empty")]
    EmptyPart(usize),

    #[error("unterminated '[' in identifier")]
    Unterminated,

    #[error("unexpected character {0:?} in identifier")]
    Unexpected(char),

    #[error("identifier has {0} parts; expected `table` or `schema.table`")]
    TooManyParts(usize),
}

impl TableIdentifier {
    pub fn new(schema: Option<&str>, name: &str) -> Self {
        Self {
            schema: schema.map(str::to_string),
            name: name.to_string(),
        }
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bracket-quoted form for splicing into T-SQL
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_part(schema), quote_part(&self.name)),
            None => quote_part(&self.name),
        }
    }
}

fn quote_part(part: &str) -> String {
    format!("[{}]", part.replace(']', "]]"))
}

fn display_part(part: &str) -> String {
    if part.contains(['.', '[', ']']) || part.trim() != part {
        quote_part(part)
    } else {
        part.to_string()
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", display_part(schema), display_part(&self.name)),
            None => f.write_str(&display_part(&self.name)),
        }
    }
}

impl FromStr for TableIdentifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(IdentifierError::Empty);
        }

        let mut parts: Vec<String> = Vec::new();
        let mut chars = s.chars().peekable();

        loop {
            let mut part = String::new();
            if chars.peek() == Some(&'[') {
                chars.next();
                loop {
                    match chars.next() {
                        Some(']') if chars.peek() == Some(&']') => {
                            chars.next();
                            part.push(']');
                        }
                        Some(']') => break,
                        Some(c) => part.push(c),
                        None => return Err(IdentifierError::Unterminated),
                    }
                }
            } else {
                while let Some(&c) = chars.peek() {
                    match c {
                        '.' => break,
                        '[' | ']' => return Err(IdentifierError::Unexpected(c)),
                        _ => {
                            part.push(c);
                            chars.next();
                        }
                    }
                }
                part = part.trim().to_string();
            }

            if part.is_empty() {
                return Err(IdentifierError::EmptyPart(parts.len() + 1));
            }
            parts.push(part);

            match chars.next() {
                None => break,
                Some('.') => continue,
                Some(c) => return Err(IdentifierError::Unexpected(c)),
            }
        }

        match parts.len() {
            1 => Ok(Self {
                schema: None,
                name: parts.remove(0),
            }),
            2 => {
                let name = parts.remove(1);
                Ok(Self {
                    schema: Some(parts.remove(0)),
                    name,
                })
            }
            n => Err(IdentifierError::TooManyParts(n)),
        }
    }
}

impl Serialize for TableIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ============================================================================
// Result Sets
// ============================================================================

/// A single cell, coerced from the driver's native type
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScalarValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Text(value.to_string())
    }
}

/// Columns plus rows; every row has exactly `columns.len()` values
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ScalarValue>>,
    /// Set when rows beyond the requested cap were dropped
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl ResultSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            truncated: false,
        }
    }

    /// Keep at most `max` rows, flagging the set if any were dropped
    pub fn truncate(&mut self, max: usize) {
        if self.rows.len() > max {
            self.rows.truncate(max);
            self.truncated = true;
        }
    }
}

/// What a statement produced
#[derive(Debug, Clone, PartialEq)]
pub enum StatementOutcome {
    Rows(ResultSet),
    Affected { rows_affected: u64 },
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TableListResponse {
    pub count: usize,
    pub tables: Vec<TableIdentifier>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<ScalarValue>>,
    pub row_count: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl From<ResultSet> for QueryResponse {
    fn from(set: ResultSet) -> Self {
        Self {
            row_count: set.rows.len(),
            columns: set.columns,
            rows: set.rows,
            truncated: set.truncated,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AffectedResponse {
    pub rows_affected: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> TableIdentifier {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_plain_forms() {
        let id = parse("orders");
        assert_eq!(id.schema(), None);
        assert_eq!(id.name(), "orders");

        let id = parse("sales.orders");
        assert_eq!(id.schema(), Some("sales"));
        assert_eq!(id.name(), "orders");
    }

    #[test]
    fn test_parse_bracketed_parts() {
        let id = parse("[sales].[order.lines]");
        assert_eq!(id.schema(), Some("sales"));
        assert_eq!(id.name(), "order.lines");

        let id = parse("dbo.[odd]]name]");
        assert_eq!(id.name(), "odd]name");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!("".parse::<TableIdentifier>(), Err(IdentifierError::Empty));
        assert_eq!(
            "db.sales.orders".parse::<TableIdentifier>(),
            Err(IdentifierError::TooManyParts(3))
        );
        assert_eq!(
            "sales.".parse::<TableIdentifier>(),
            Err(IdentifierError::EmptyPart(2))
        );
        assert_eq!(
            "[sales".parse::<TableIdentifier>(),
            Err(IdentifierError::Unterminated)
        );
        assert_eq!(
            "sales]x".parse::<TableIdentifier>(),
            Err(IdentifierError::Unexpected(']'))
        );
    }

    #[test]
    fn test_quoted_escapes_brackets() {
        let id = TableIdentifier::new(Some("dbo"), "x]; DROP TABLE users; --");
        assert_eq!(id.quoted(), "[dbo].[x]]; DROP TABLE users; --]");
    }

    #[test]
    fn test_display_parses_back() {
        for id in [
            TableIdentifier::new(Some("dbo"), "orders"),
            TableIdentifier::new(Some("sales"), "order.lines"),
            TableIdentifier::new(None, "a]b"),
        ] {
            assert_eq!(parse(&id.to_string()), id);
        }
    }

    #[test]
    fn test_scalar_values_serialize_as_plain_json() {
        let row = vec![
            ScalarValue::Null,
            ScalarValue::Bool(true),
            ScalarValue::Int(1),
            ScalarValue::Float(1.5),
            ScalarValue::from("x"),
        ];
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json, serde_json::json!([null, true, 1, 1.5, "x"]));
    }

    #[test]
    fn test_truncate_flags_only_when_rows_dropped() {
        let mut set = ResultSet::new(vec!["n".to_string()]);
        set.rows = (0..5).map(|n| vec![ScalarValue::Int(n)]).collect();

        set.truncate(10);
        assert!(!set.truncated);

        set.truncate(3);
        assert_eq!(set.rows.len(), 3);
        assert!(set.truncated);
    }

    #[test]
    fn test_query_response_omits_false_truncated() {
        let mut set = ResultSet::new(vec!["x".to_string()]);
        set.rows.push(vec![ScalarValue::Int(1)]);

        let json = serde_json::to_value(QueryResponse::from(set)).unwrap();
        assert_eq!(json["row_count"], 1);
        assert!(json.get("truncated").is_none());
    }
}
