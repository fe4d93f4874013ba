//! Logical query values
//!
//! Values carried by comparison predicates. `Missing` is a distinguished
//! sentinel meaning "the field has no value at all" and lowers to NULL tests;
//! it is not the same thing as `Null`, which is unsatisfiable in every
//! comparison family.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A polygonal region described by its corner locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub locations: Vec<Location>,
}

impl Region {
    pub fn new(locations: Vec<Location>) -> Self {
        Self { locations }
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// A logical value appearing in a comparison predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryValue {
    Null,
    /// The missing-value sentinel: "this field is absent".
    Missing,
    Bool(bool),
    Number(f64),
    Text(String),
    Uuid(Uuid),
    Location(Location),
    Region(Region),
}

impl QueryValue {
    pub fn text(value: impl Into<String>) -> Self {
        QueryValue::Text(value.into())
    }

    pub fn number(value: f64) -> Self {
        QueryValue::Number(value)
    }

    /// Plain-text rendering used for LIKE patterns; geospatial values have
    /// no textual form.
    pub fn as_like_source(&self) -> Option<String> {
        match self {
            QueryValue::Text(s) => Some(s.clone()),
            QueryValue::Number(n) => Some(n.to_string()),
            QueryValue::Bool(b) => Some(b.to_string()),
            QueryValue::Uuid(u) => Some(u.to_string()),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for QueryValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => QueryValue::Null,
            serde_json::Value::Bool(b) => QueryValue::Bool(b),
            serde_json::Value::Number(n) => {
                n.as_f64().map_or(QueryValue::Null, QueryValue::Number)
            }
            serde_json::Value::String(s) => QueryValue::Text(s),
            // Structured JSON has no scalar index representation.
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => QueryValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(QueryValue::from(json!(null)), QueryValue::Null);
        assert_eq!(QueryValue::from(json!(true)), QueryValue::Bool(true));
        assert_eq!(QueryValue::from(json!(2.5)), QueryValue::Number(2.5));
        assert_eq!(QueryValue::from(json!("abc")), QueryValue::text("abc"));
    }

    #[test]
    fn test_from_json_structured_is_null() {
        assert_eq!(QueryValue::from(json!([1, 2])), QueryValue::Null);
        assert_eq!(QueryValue::from(json!({"a": 1})), QueryValue::Null);
    }

    #[test]
    fn test_like_source() {
        assert_eq!(QueryValue::text("x").as_like_source(), Some("x".into()));
        assert_eq!(QueryValue::Number(3.0).as_like_source(), Some("3".into()));
        assert_eq!(QueryValue::Missing.as_like_source(), None);
        assert_eq!(
            QueryValue::Location(Location::new(0.0, 0.0)).as_like_source(),
            None
        );
    }

    #[test]
    fn test_region_empty() {
        assert!(Region::new(Vec::new()).is_empty());
        assert!(!Region::new(vec![Location::new(1.0, 2.0)]).is_empty());
    }
}
