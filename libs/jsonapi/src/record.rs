use std::collections::BTreeMap;

use serde_json::Value;

use crate::value::{FieldValue, RecordId, SerializeError};

/// Read access to a record's fields by name.
///
/// Implemented once per record kind; the projection engine never looks at
/// records any other way.
pub trait FieldSource {
    /// Value of `name`, or `SerializeError::UnknownField` when the record
    /// has no such field.
    fn field(&self, name: &str) -> Result<FieldValue, SerializeError>;

    /// Identifier of the record, read from its `id` field.
    fn record_id(&self) -> Option<RecordId> {
        self.field("id").ok().and_then(|v| v.as_i64())
    }
}

/// A plain mapping record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl MemoryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON object whose members are all scalars.
    pub fn from_json(value: &Value) -> Result<Self, SerializeError> {
        let Value::Object(map) = value else {
            return Err(SerializeError::UnsupportedKind {
                field: String::new(),
                kind: "non-object record".to_string(),
            });
        };
        let mut fields = BTreeMap::new();
        for (k, v) in map {
            let fv = FieldValue::from_json(v).ok_or_else(|| SerializeError::UnsupportedKind {
                field: k.clone(),
                kind: "nested JSON".to_string(),
            })?;
            fields.insert(k.clone(), fv);
        }
        Ok(Self { fields })
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

impl FieldSource for MemoryRecord {
    fn field(&self, name: &str) -> Result<FieldValue, SerializeError> {
        self.fields
            .get(name)
            .cloned()
            .ok_or_else(|| SerializeError::UnknownField(name.to_string()))
    }
}

impl<T: FieldSource + ?Sized> FieldSource for &T {
    fn field(&self, name: &str) -> Result<FieldValue, SerializeError> {
        (**self).field(name)
    }
}
