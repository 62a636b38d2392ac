//! Scalar values read from records and their JSON rendering.

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use serde_json::Value;
use thiserror::Error;

/// Identifier of a record inside its collection.
pub type RecordId = i64;

/// Closed set of value kinds a provider can hand to the projection engine.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    DateTimeTz(DateTime<FixedOffset>),
    /// A related record; only its identifier is ever rendered.
    Reference(RecordId),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SerializeError {
    #[error("record has no field `{0}`")]
    UnknownField(String),

    #[error("field `{field}` holds a value with no JSON form: {kind}")]
    UnsupportedKind { field: String, kind: String },

    #[error("non-finite float cannot be rendered as JSON")]
    NonFiniteFloat,
}

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn format_naive(dt: &NaiveDateTime) -> String {
    let mut out = dt.format(DATETIME_FORMAT).to_string();
    let micros = dt.nanosecond() / 1_000;
    if micros != 0 {
        out.push_str(&format!(".{micros:06}"));
    }
    out
}

/// Render a value as a JSON primitive.
///
/// Dates become `YYYY-MM-DD`, naive date-times `YYYY-MM-DDTHH:MM:SS` (with
/// microseconds when present), zoned date-times get a `±HH:MM` suffix and
/// references collapse to the related identifier.
pub fn json_serialize(value: &FieldValue) -> Result<Value, SerializeError> {
    Ok(match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::Int(i) => Value::from(*i),
        FieldValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .ok_or(SerializeError::NonFiniteFloat)?,
        FieldValue::String(s) => Value::String(s.clone()),
        FieldValue::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
        FieldValue::DateTime(dt) => Value::String(format_naive(dt)),
        FieldValue::DateTimeTz(dt) => {
            let mut out = format_naive(&dt.naive_local());
            out.push_str(&dt.format("%:z").to_string());
            Value::String(out)
        }
        FieldValue::Reference(id) => Value::from(*id),
    })
}

impl FieldValue {
    /// Convert a JSON scalar into a field value. Arrays and objects have no
    /// scalar form and yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => FieldValue::Float(n.as_f64()?),
            },
            Value::String(s) => FieldValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => return None,
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) | FieldValue::Reference(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a raw query-string value into the same kind as `self`.
    ///
    /// Returns `None` when the text cannot be read as that kind.
    pub fn parse_like(&self, raw: &str) -> Option<FieldValue> {
        let raw = raw.trim();
        Some(match self {
            FieldValue::Null => return None,
            FieldValue::Bool(_) => FieldValue::Bool(parse_bool(raw)?),
            FieldValue::Int(_) => FieldValue::Int(raw.parse().ok()?),
            FieldValue::Reference(_) => FieldValue::Reference(raw.parse().ok()?),
            FieldValue::Float(_) => FieldValue::Float(raw.parse().ok()?),
            FieldValue::String(_) => FieldValue::String(raw.to_string()),
            FieldValue::Date(_) => FieldValue::Date(NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()?),
            FieldValue::DateTime(_) => FieldValue::DateTime(parse_naive_datetime(raw)?),
            FieldValue::DateTimeTz(_) => {
                FieldValue::DateTimeTz(DateTime::parse_from_rfc3339(raw).ok()?)
            }
        })
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Int(_) | FieldValue::Float(_) | FieldValue::Reference(_) => 2,
            FieldValue::String(_) => 3,
            FieldValue::Date(_) => 4,
            FieldValue::DateTime(_) => 5,
            FieldValue::DateTimeTz(_) => 6,
        }
    }

    /// Total order used by in-memory sorting and range filters.
    ///
    /// Nulls sort first; numbers compare across integer and float; values of
    /// unrelated kinds are ordered by kind.
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        use FieldValue as V;
        match (self, other) {
            (V::Bool(a), V::Bool(b)) => a.cmp(b),
            (V::Int(a) | V::Reference(a), V::Int(b) | V::Reference(b)) => a.cmp(b),
            (V::Float(a), V::Float(b)) => a.total_cmp(b),
            (V::Int(a) | V::Reference(a), V::Float(b)) => (*a as f64).total_cmp(b),
            (V::Float(a), V::Int(b) | V::Reference(b)) => a.total_cmp(&(*b as f64)),
            (V::String(a), V::String(b)) => a.cmp(b),
            (V::Date(a), V::Date(b)) => a.cmp(b),
            (V::DateTime(a), V::DateTime(b)) => a.cmp(b),
            (V::DateTimeTz(a), V::DateTimeTz(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

/// Accepts the spellings HTML forms and query strings use for booleans.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "on" | "yes" => Some(true),
        "false" | "f" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Accepts `T` or space separated ISO date-times, with optional fraction.
pub fn parse_naive_datetime(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(v: NaiveDate) -> Self {
        FieldValue::Date(v)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(v: NaiveDateTime) -> Self {
        FieldValue::DateTime(v)
    }
}

impl From<DateTime<FixedOffset>> for FieldValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        FieldValue::DateTimeTz(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}
