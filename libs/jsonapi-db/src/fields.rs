//! Column whitelist of an entity and the value kinds used to move data
//! between query strings, records and SeaORM.

use std::collections::HashMap;

use chrono::NaiveDate;
use jsonapi::validation::ID_FIELD;
use jsonapi::value::{parse_bool, parse_naive_datetime};
use jsonapi::{FieldValue, FormField, FormValidator, IdRule, SerializeError};
use sea_orm::sea_query::StringLen;
use sea_orm::{ColumnTrait, ColumnType, EntityTrait, IdenStatic, Iterable, Value};
use tracing::debug;

/// Whitelisted field kind, used to coerce raw strings and record values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    I32,
    I64,
    F64,
    Bool,
    Date,
    DateTime,
    /// Integer foreign key rendered as the related record's id.
    Reference,
}

impl FieldKind {
    /// Kind for a column type, `None` when the type is not exposed.
    pub fn of(column_type: &ColumnType) -> Option<Self> {
        Some(match column_type {
            ColumnType::String(_) | ColumnType::Char(_) | ColumnType::Text => Self::String,
            ColumnType::Integer => Self::I32,
            ColumnType::BigInteger => Self::I64,
            ColumnType::Double => Self::F64,
            ColumnType::Boolean => Self::Bool,
            ColumnType::Date => Self::Date,
            ColumnType::DateTime | ColumnType::Timestamp => Self::DateTime,
            _ => return None,
        })
    }

    pub fn is_text(self) -> bool {
        self == Self::String
    }

    /// Typed SQL NULL for this kind.
    pub fn null(self) -> Value {
        match self {
            Self::String => Value::String(None),
            Self::I32 => Value::Int(None),
            Self::I64 | Self::Reference => Value::BigInt(None),
            Self::F64 => Value::Double(None),
            Self::Bool => Value::Bool(None),
            Self::Date => Value::ChronoDate(None),
            Self::DateTime => Value::ChronoDateTime(None),
        }
    }

    /// Read a query-string operand as this kind.
    pub fn coerce(self, raw: &str) -> Option<Value> {
        let trimmed = raw.trim();
        Some(match self {
            Self::String => Value::String(Some(Box::new(raw.to_string()))),
            Self::I32 => Value::Int(Some(trimmed.parse().ok()?)),
            Self::I64 | Self::Reference => Value::BigInt(Some(trimmed.parse().ok()?)),
            Self::F64 => Value::Double(Some(trimmed.parse().ok()?)),
            Self::Bool => Value::Bool(Some(parse_bool(trimmed)?)),
            Self::Date => Value::ChronoDate(Some(Box::new(
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()?,
            ))),
            Self::DateTime => {
                Value::ChronoDateTime(Some(Box::new(parse_naive_datetime(trimmed)?)))
            }
        })
    }

    /// Convert a cleaned value for storage. The variant always matches the
    /// column's Rust type; `None` means the value cannot be stored here.
    pub fn to_sea(self, value: &FieldValue) -> Option<Value> {
        Some(match (self, value) {
            (kind, FieldValue::Null) => kind.null(),
            (Self::String, FieldValue::String(s)) => Value::String(Some(Box::new(s.clone()))),
            (Self::I32, FieldValue::Int(i)) => Value::Int(Some(i32::try_from(*i).ok()?)),
            (Self::I64 | Self::Reference, FieldValue::Int(i) | FieldValue::Reference(i)) => {
                Value::BigInt(Some(*i))
            }
            (Self::F64, FieldValue::Float(f)) => Value::Double(Some(*f)),
            (Self::F64, FieldValue::Int(i)) => Value::Double(Some(*i as f64)),
            (Self::Bool, FieldValue::Bool(b)) => Value::Bool(Some(*b)),
            (Self::Date, FieldValue::Date(d)) => Value::ChronoDate(Some(Box::new(*d))),
            (Self::DateTime, FieldValue::DateTime(dt)) => {
                Value::ChronoDateTime(Some(Box::new(*dt)))
            }
            _ => return None,
        })
    }

    /// Convert a stored value of column `field` into a record value.
    pub fn from_sea(self, field: &str, value: Value) -> Result<FieldValue, SerializeError> {
        let int = |i: Option<i64>| match (self, i) {
            (_, None) => FieldValue::Null,
            (Self::Reference, Some(i)) => FieldValue::Reference(i),
            (_, Some(i)) => FieldValue::Int(i),
        };
        Ok(match value {
            Value::String(s) => s.map_or(FieldValue::Null, |s| FieldValue::String(*s)),
            Value::Int(i) => int(i.map(i64::from)),
            Value::BigInt(i) => int(i),
            Value::Double(f) => f.map_or(FieldValue::Null, FieldValue::Float),
            Value::Float(f) => f.map_or(FieldValue::Null, |f| FieldValue::Float(f64::from(f))),
            Value::Bool(b) => b.map_or(FieldValue::Null, FieldValue::Bool),
            Value::ChronoDate(d) => d.map_or(FieldValue::Null, |d| FieldValue::Date(*d)),
            Value::ChronoDateTime(dt) => {
                dt.map_or(FieldValue::Null, |dt| FieldValue::DateTime(*dt))
            }
            Value::ChronoDateTimeWithTimeZone(dt) => {
                dt.map_or(FieldValue::Null, |dt| FieldValue::DateTimeTz(*dt))
            }
            Value::ChronoDateTimeUtc(dt) => {
                dt.map_or(FieldValue::Null, |dt| FieldValue::DateTimeTz(dt.fixed_offset()))
            }
            other => {
                return Err(SerializeError::UnsupportedKind {
                    field: field.to_string(),
                    kind: format!("{other:?}"),
                })
            }
        })
    }
}

#[derive(Clone)]
pub struct Field<E: EntityTrait> {
    pub col: E::Column,
    pub kind: FieldKind,
    pub nullable: bool,
    pub unique: bool,
    pub max_length: Option<usize>,
}

/// Exposed columns of `E` keyed by column name.
#[derive(Clone)]
pub struct FieldMap<E: EntityTrait> {
    map: HashMap<String, Field<E>>,
    order: Vec<String>,
}

impl<E: EntityTrait> Default for FieldMap<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityTrait> FieldMap<E> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Every column of the entity whose type has a [`FieldKind`].
    pub fn from_entity() -> Self {
        E::Column::iter().fold(Self::new(), |fmap, col| {
            let def = col.def();
            let column_type = def.get_column_type();
            let Some(kind) = FieldKind::of(column_type) else {
                debug!(column = col.as_str(), ?column_type, "column type not exposed");
                return fmap;
            };
            let max_length = match column_type {
                ColumnType::String(StringLen::N(n)) | ColumnType::Char(Some(n)) => {
                    Some(*n as usize)
                }
                _ => None,
            };
            fmap.field(
                col.as_str(),
                Field {
                    col,
                    kind,
                    nullable: def.is_null(),
                    unique: def.is_unique(),
                    max_length,
                },
            )
        })
    }

    pub fn insert(self, name: impl Into<String>, col: E::Column, kind: FieldKind) -> Self {
        self.field(
            name,
            Field {
                col,
                kind,
                nullable: false,
                unique: false,
                max_length: None,
            },
        )
    }

    pub fn field(mut self, name: impl Into<String>, field: Field<E>) -> Self {
        let name = name.into().to_lowercase();
        if self.map.insert(name.clone(), field).is_none() {
            self.order.push(name);
        }
        self
    }

    /// Mark an integer column as a reference to another collection.
    pub fn reference(mut self, name: &str) -> Self {
        if let Some(f) = self.map.get_mut(&name.to_lowercase()) {
            if matches!(f.kind, FieldKind::I32 | FieldKind::I64) {
                f.kind = FieldKind::Reference;
            }
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field<E>> {
        self.map.get(&name.to_lowercase())
    }

    /// Unique columns other than `id`, in declaration order.
    pub fn unique_fields(&self) -> impl Iterator<Item = (&str, &Field<E>)> {
        self.order
            .iter()
            .filter_map(|name| Some((name.as_str(), self.map.get(name)?)))
            .filter(|(name, f)| f.unique && *name != ID_FIELD)
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Form over the `editable` columns, shaped by their schema: nullable
    /// columns are optional and booleans never required.
    pub fn form(&self, editable: &[&str], id_rule: IdRule) -> FormValidator {
        let fields = editable.iter().filter_map(|name| {
            let Some(f) = self.get(name) else {
                debug!(field = name, "editable field not in schema");
                return None;
            };
            let field = match f.kind {
                FieldKind::String => FormField::char(*name, f.max_length),
                FieldKind::I32 => {
                    FormField::integer_in(*name, i32::MIN.into(), i32::MAX.into())
                }
                FieldKind::I64 | FieldKind::Reference => FormField::integer(*name),
                FieldKind::F64 => FormField::float(*name),
                FieldKind::Bool => FormField::boolean(*name).optional(),
                FieldKind::Date => FormField::date(*name),
                FieldKind::DateTime => FormField::datetime(*name),
            };
            Some(if f.nullable { field.optional() } else { field })
        });
        FormValidator::new(fields.collect::<Vec<_>>()).with_id_rule(id_rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_rejects_malformed_operands() {
        assert_eq!(FieldKind::I64.coerce(" 42 "), Some(Value::BigInt(Some(42))));
        assert_eq!(FieldKind::I64.coerce("forty"), None);
        assert_eq!(FieldKind::Bool.coerce("True"), Some(Value::Bool(Some(true))));
        assert_eq!(FieldKind::Date.coerce("2010-13-01"), None);
        assert_eq!(
            FieldKind::String.coerce(" Osaka "),
            Some(Value::String(Some(Box::new(" Osaka ".to_string()))))
        );
    }

    #[test]
    fn to_sea_matches_column_type() {
        assert_eq!(FieldKind::I32.to_sea(&FieldValue::Int(7)), Some(Value::Int(Some(7))));
        assert_eq!(FieldKind::I32.to_sea(&FieldValue::Int(i64::MAX)), None);
        assert_eq!(FieldKind::F64.to_sea(&FieldValue::Int(2)), Some(Value::Double(Some(2.0))));
        assert_eq!(FieldKind::Bool.to_sea(&FieldValue::Null), Some(Value::Bool(None)));
        assert_eq!(FieldKind::Bool.to_sea(&FieldValue::String("x".into())), None);
    }

    #[test]
    fn from_sea_marks_references() {
        assert_eq!(
            FieldKind::Reference.from_sea("prefecture_id", Value::BigInt(Some(27))),
            Ok(FieldValue::Reference(27))
        );
        assert_eq!(
            FieldKind::I64.from_sea("population", Value::BigInt(Some(27))),
            Ok(FieldValue::Int(27))
        );
        assert_eq!(
            FieldKind::String.from_sea("name", Value::String(None)),
            Ok(FieldValue::Null)
        );
        assert!(matches!(
            FieldKind::String.from_sea("blob", Value::Bytes(Some(Box::new(vec![1])))),
            Err(SerializeError::UnsupportedKind { .. })
        ));
    }
}
