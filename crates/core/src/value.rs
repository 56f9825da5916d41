//! Scalar value types for archived records
//!
//! This module defines:
//! - Value: scalar attribute value carried by records and bundles
//! - Identity: hashable projection of a primary-key value
//!
//! ## Value Model
//!
//! Records are flat. An attribute holds exactly one of:
//! - Null, Bool, Int, Float, String, Timestamp
//!
//! ### Type Rules
//!
//! - No nested values: association structure lives in foreign-key attributes
//! - `Int(1) != Float(1.0)`: different types are never equal
//! - Float uses IEEE-754 equality: `NaN != NaN`, `-0.0 == 0.0`
//! - `Timestamp` is always UTC and serializes as RFC 3339
//!
//! ## Wire Form
//!
//! Values serialize untagged, so a bundle is plain JSON. Timestamps come back
//! from the wire as `String` and are re-typed by the rehydrator, which knows
//! the column kinds.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar attribute value
///
/// ## Type Equality
///
/// Different types are never equal, even if they contain the same "value":
/// - `Int(1) != Float(1.0)`
/// - `String("1") != Int(1)`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Float(f64),
    /// UTF-8 string
    String(String),
    /// UTC timestamp
    ///
    /// Never produced by deserialization; see module docs.
    Timestamp(DateTime<Utc>),
}

// Custom PartialEq implementation for IEEE-754 float semantics
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // IEEE-754: NaN != NaN, -0.0 == 0.0
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Timestamp(_) => "Timestamp",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as timestamp if this is a Timestamp value
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Project this value onto an [`Identity`]
    ///
    /// Only integers and non-empty strings can identify a row. Everything
    /// else (null included) yields `None`, which keeps the record out of
    /// any bundle.
    pub fn as_identity(&self) -> Option<Identity> {
        match self {
            Value::Int(i) => Some(Identity::Int(*i)),
            Value::String(s) if !s.is_empty() => Some(Identity::Text(s.clone())),
            _ => None,
        }
    }

    /// Coerce a timestamp-like value into a UTC timestamp
    ///
    /// Accepts:
    /// - `Timestamp` (returned as is)
    /// - RFC 3339 strings with any offset (`2024-03-01T10:00:00+02:00`)
    /// - naive `YYYY-MM-DD HH:MM:SS[.f]` / `YYYY-MM-DDTHH:MM:SS[.f]`, read as UTC
    /// - integers, read as seconds since the Unix epoch
    ///
    /// Returns `None` when the value cannot be interpreted.
    pub fn to_utc_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(t) => Some(*t),
            Value::Int(secs) => Utc.timestamp_opt(*secs, 0).single(),
            Value::String(s) => parse_timestamp(s),
            _ => None,
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S %z"] {
        if let Ok(t) = DateTime::parse_from_str(raw, fmt) {
            return Some(t.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    None
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

// ============================================================================
// Identity
// ============================================================================

/// Primary-key identity of a row
///
/// Unlike [`Value`], this is `Eq + Hash + Ord`, so it can key visited sets,
/// deletion plans and identity mappings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identity {
    /// Integer key (auto-increment style)
    Int(i64),
    /// Textual key (uuid, slug)
    Text(String),
}

impl Identity {
    /// Convert back into an attribute value
    pub fn to_value(&self) -> Value {
        match self {
            Identity::Int(i) => Value::Int(*i),
            Identity::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Int(i) => write!(f, "{}", i),
            Identity::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Identity {
    fn from(i: i64) -> Self {
        Identity::Int(i)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Identity::Text(s.to_string())
    }
}

impl From<Identity> for Value {
    fn from(id: Identity) -> Self {
        id.to_value()
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_different_types_never_equal() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::String("1".into()), Value::Int(1));
        assert_eq!(Value::Null, Value::Null);
    }

    #[test]
    fn test_float_ieee_semantics() {
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
    }

    #[test]
    fn test_identity_projection() {
        assert_eq!(Value::Int(10).as_identity(), Some(Identity::Int(10)));
        assert_eq!(
            Value::String("abc".into()).as_identity(),
            Some(Identity::Text("abc".into()))
        );
        assert_eq!(Value::String(String::new()).as_identity(), None);
        assert_eq!(Value::Null.as_identity(), None);
        assert_eq!(Value::Float(1.0).as_identity(), None);
        assert_eq!(Value::Bool(true).as_identity(), None);
    }

    #[test]
    fn test_untagged_json_wire_form() {
        let values = vec![
            Value::Null,
            Value::Bool(true),
            Value::Int(42),
            Value::Float(1.5),
            Value::String("hi".into()),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[null,true,42,1.5,"hi"]"#);

        let parsed: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, values);
    }

    #[test]
    fn test_timestamp_serializes_as_string() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let json = serde_json::to_string(&Value::Timestamp(t)).unwrap();
        assert_eq!(json, r#""2024-03-01T10:00:00Z""#);

        // Comes back as a string; the column kind decides re-typing.
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.as_str().is_some());
        assert_eq!(parsed.to_utc_timestamp(), Some(t));
    }

    #[test]
    fn test_timestamp_coercion_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

        let offset = Value::String("2024-03-01T10:00:00+02:00".into());
        assert_eq!(offset.to_utc_timestamp(), Some(expected));

        let naive = Value::String("2024-03-01 08:00:00".into());
        assert_eq!(naive.to_utc_timestamp(), Some(expected));

        let epoch = Value::Int(expected.timestamp());
        assert_eq!(epoch.to_utc_timestamp(), Some(expected));

        assert_eq!(Value::String("yesterday".into()).to_utc_timestamp(), None);
        assert_eq!(Value::Bool(false).to_utc_timestamp(), None);
    }

    #[test]
    fn test_identity_ordering_and_display() {
        let mut ids = vec![Identity::Int(3), Identity::Int(1), Identity::Int(2)];
        ids.sort();
        assert_eq!(ids, vec![Identity::Int(1), Identity::Int(2), Identity::Int(3)]);
        assert_eq!(Identity::Int(7).to_string(), "7");
        assert_eq!(Identity::from("x").to_value(), Value::String("x".into()));
    }

    #[test]
    fn test_option_into_value() {
        let none: Option<i64> = None;
        assert_eq!(Value::from(none), Value::Null);
        assert_eq!(Value::from(Some(5i64)), Value::Int(5));
    }
}
