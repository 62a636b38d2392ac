use serde_json::{Map, Value};

use crate::descriptor::FieldSpec;
use crate::record::FieldSource;
use crate::value::{json_serialize, SerializeError};

/// Render a record into an ordered JSON object following `fields`.
pub fn project<R>(record: &R, fields: &[FieldSpec]) -> Result<Map<String, Value>, SerializeError>
where
    R: FieldSource + ?Sized,
{
    let mut out = Map::with_capacity(fields.len());
    for spec in fields {
        let value = record.field(&spec.source)?;
        out.insert(spec.output.clone(), json_serialize(&value)?);
    }
    Ok(out)
}

/// Project every record, stopping at the first failure.
pub fn project_all<R>(records: &[R], fields: &[FieldSpec]) -> Result<Vec<Value>, SerializeError>
where
    R: FieldSource,
{
    records
        .iter()
        .map(|r| project(r, fields).map(Value::Object))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MemoryRecord;
    use crate::value::FieldValue;
    use serde_json::json;

    fn osaka() -> MemoryRecord {
        MemoryRecord::new()
            .with("id", 27i64)
            .with("name", "大阪府")
            .with("capital", "大阪市")
            .with("is_od", true)
            .with("population", 8865245i64)
    }

    fn specs() -> Vec<FieldSpec> {
        vec![
            "id".into(),
            "name".into(),
            ("is_designated_by_ordinance", "is_od").into(),
        ]
    }

    #[test]
    fn output_follows_descriptor_order_and_aliases() {
        let out = project(&osaka(), &specs()).unwrap();
        let keys: Vec<_> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "name", "is_designated_by_ordinance"]);
        assert_eq!(
            Value::Object(out),
            json!({"id": 27, "name": "大阪府", "is_designated_by_ordinance": true})
        );
    }

    #[test]
    fn each_output_equals_serialized_source() {
        let record = osaka();
        let out = project(&record, &specs()).unwrap();
        for spec in specs() {
            let source = json_serialize(&record.field(&spec.source).unwrap()).unwrap();
            assert_eq!(out[&spec.output], source);
        }
    }

    #[test]
    fn projection_leaves_record_untouched() {
        let record = osaka();
        let before = record.clone();
        let _ = project(&record, &specs()).unwrap();
        assert_eq!(record, before);
    }

    #[test]
    fn missing_attribute_is_an_error() {
        let record = MemoryRecord::new().with("id", 1i64);
        let err = project(&record, &specs()).unwrap_err();
        assert_eq!(err, SerializeError::UnknownField("name".into()));
    }

    #[test]
    fn null_values_are_kept() {
        let record = MemoryRecord::new()
            .with("id", 1i64)
            .with("name", FieldValue::Null)
            .with("is_od", FieldValue::Null);
        let out = project(&record, &specs()).unwrap();
        assert_eq!(out["name"], Value::Null);
    }
}
