//! Validation gateway: cleans a raw payload or reports field errors.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::record::FieldSource;
use crate::value::{parse_bool, parse_naive_datetime, FieldValue};

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_INTEGER: &str = "Enter a whole number.";
pub const MSG_NUMBER: &str = "Enter a number.";
pub const MSG_DATE: &str = "Enter a valid date.";
pub const MSG_DATETIME: &str = "Enter a valid date/time.";
pub const MSG_TEXT: &str = "Enter a text value.";
pub const MSG_CANNOT_SET_ID: &str = "Cannot Set ID";
pub const MSG_CANNOT_CHANGE_ID: &str = "Cannot Change ID";

pub const ID_FIELD: &str = "id";

/// Cleaned field values keyed by field name.
pub type CleanedData = BTreeMap<String, FieldValue>;

/// Field name to error messages, serialized as a JSON object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn to_json(&self) -> Value {
        let map = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect::<Map<_, _>>();
        Value::Object(map)
    }
}

/// Turns a raw payload into cleaned data.
///
/// `existing` is the record being updated, `None` on create.
pub trait Validator: Send + Sync {
    fn validate(
        &self,
        payload: &Value,
        existing: Option<&dyn FieldSource>,
    ) -> Result<CleanedData, FieldErrors>;
}

/// How the `id` member of a payload is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IdRule {
    /// `id` is not looked at.
    #[default]
    Free,
    /// A non-zero `id` is rejected; the provider assigns one.
    Forbidden,
    /// `id` must equal the identifier of the record being updated.
    MustMatchExisting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormFieldKind {
    /// Inclusive bounds, `None` for unbounded.
    Integer { min: Option<i64>, max: Option<i64> },
    Float,
    Char { max_length: Option<usize> },
    Boolean,
    Date,
    DateTime,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub kind: FormFieldKind,
    pub required: bool,
}

impl FormField {
    pub fn new(name: impl Into<String>, kind: FormFieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FormFieldKind::Integer { min: None, max: None })
    }

    /// Integer limited to `min..=max`.
    pub fn integer_in(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self::new(
            name,
            FormFieldKind::Integer {
                min: Some(min),
                max: Some(max),
            },
        )
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FormFieldKind::Float)
    }

    pub fn char(name: impl Into<String>, max_length: Option<usize>) -> Self {
        Self::new(name, FormFieldKind::Char { max_length })
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FormFieldKind::Boolean)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FormFieldKind::Date)
    }

    pub fn datetime(name: impl Into<String>) -> Self {
        Self::new(name, FormFieldKind::DateTime)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Clean one raw member. `None` and JSON null both mean "not given".
    pub fn clean(&self, raw: Option<&Value>) -> Result<FieldValue, String> {
        let raw = raw.filter(|v| !v.is_null());
        if self.kind == FormFieldKind::Boolean {
            // false is a value, not an absence
            return match raw {
                None if self.required => Err(MSG_REQUIRED.to_string()),
                None => Ok(FieldValue::Null),
                Some(v) => Ok(FieldValue::Bool(truthy(v))),
            };
        }

        let empty = match raw {
            None => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        };
        if empty {
            if self.required {
                return Err(MSG_REQUIRED.to_string());
            }
            return Ok(match self.kind {
                FormFieldKind::Char { .. } => FieldValue::String(String::new()),
                _ => FieldValue::Null,
            });
        }
        let Some(raw) = raw else {
            return Ok(FieldValue::Null);
        };

        match self.kind {
            FormFieldKind::Integer { min, max } => {
                let Some(FieldValue::Int(i)) = clean_integer(raw) else {
                    return Err(MSG_INTEGER.to_string());
                };
                if let Some(max) = max.filter(|&m| i > m) {
                    return Err(format!("Ensure this value is less than or equal to {max}."));
                }
                if let Some(min) = min.filter(|&m| i < m) {
                    return Err(format!("Ensure this value is greater than or equal to {min}."));
                }
                Ok(FieldValue::Int(i))
            }
            FormFieldKind::Float => clean_float(raw).ok_or_else(|| MSG_NUMBER.to_string()),
            FormFieldKind::Char { max_length } => {
                let text = match raw {
                    Value::String(s) => s.trim().to_string(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => (if *b { "True" } else { "False" }).to_string(),
                    _ => return Err(MSG_TEXT.to_string()),
                };
                let len = text.chars().count();
                match max_length {
                    Some(max) if len > max => Err(format!(
                        "Ensure this value has at most {max} characters (it has {len})."
                    )),
                    _ => Ok(FieldValue::String(text)),
                }
            }
            FormFieldKind::Date => raw
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
                .map(FieldValue::Date)
                .ok_or_else(|| MSG_DATE.to_string()),
            FormFieldKind::DateTime => raw
                .as_str()
                .and_then(|s| clean_datetime(s.trim()))
                .ok_or_else(|| MSG_DATETIME.to_string()),
            FormFieldKind::Boolean => Ok(FieldValue::Bool(truthy(raw))),
        }
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => parse_bool(s).unwrap_or(!s.is_empty()),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn clean_integer(raw: &Value) -> Option<FieldValue> {
    match raw {
        Value::Number(n) => n.as_i64().map(FieldValue::Int),
        Value::String(s) => s.trim().parse::<i64>().ok().map(FieldValue::Int),
        _ => None,
    }
}

fn clean_float(raw: &Value) -> Option<FieldValue> {
    let f = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(FieldValue::Float(f))
}

fn clean_datetime(s: &str) -> Option<FieldValue> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(FieldValue::DateTimeTz(dt));
    }
    parse_naive_datetime(s).map(FieldValue::DateTime)
}

/// Schema-free structural validator over declared fields.
///
/// Every declared field ends up in the cleaned data; payload members that
/// are not declared are dropped.
#[derive(Clone, Debug, Default)]
pub struct FormValidator {
    fields: Vec<FormField>,
    id_rule: IdRule,
}

impl FormValidator {
    pub fn new(fields: impl IntoIterator<Item = FormField>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            id_rule: IdRule::Free,
        }
    }

    pub fn with_id_rule(mut self, rule: IdRule) -> Self {
        self.id_rule = rule;
        self
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn id_rule(&self) -> IdRule {
        self.id_rule
    }

    fn check_id(
        &self,
        payload: &Map<String, Value>,
        existing: Option<&dyn FieldSource>,
        cleaned: &mut CleanedData,
        errors: &mut FieldErrors,
    ) {
        let raw = payload.get(ID_FIELD).filter(|v| !v.is_null());
        match self.id_rule {
            IdRule::Free => {}
            IdRule::Forbidden => {
                let set = raw.is_some_and(|v| match clean_integer(v) {
                    Some(FieldValue::Int(0)) => false,
                    Some(_) => true,
                    None => truthy(v),
                });
                if set {
                    errors.add(ID_FIELD, MSG_CANNOT_SET_ID);
                }
                cleaned.remove(ID_FIELD);
            }
            IdRule::MustMatchExisting => {
                let given = raw.and_then(clean_integer).and_then(|v| v.as_i64());
                let current = existing.and_then(|r| r.record_id());
                match (given, current) {
                    (Some(g), Some(c)) if g == c => {
                        cleaned.insert(ID_FIELD.to_string(), FieldValue::Int(g));
                    }
                    _ => errors.add(ID_FIELD, MSG_CANNOT_CHANGE_ID),
                }
            }
        }
    }
}

impl Validator for FormValidator {
    fn validate(
        &self,
        payload: &Value,
        existing: Option<&dyn FieldSource>,
    ) -> Result<CleanedData, FieldErrors> {
        let empty = Map::new();
        // a non-object item is validated as an empty one
        let payload = payload.as_object().unwrap_or(&empty);

        let mut cleaned = CleanedData::new();
        let mut errors = FieldErrors::new();
        for field in &self.fields {
            if field.name == ID_FIELD && self.id_rule != IdRule::Free {
                continue;
            }
            match field.clean(payload.get(&field.name)) {
                Ok(v) => {
                    cleaned.insert(field.name.clone(), v);
                }
                Err(msg) => errors.add(field.name.clone(), msg),
            }
        }
        self.check_id(payload, existing, &mut cleaned, &mut errors);

        if errors.is_empty() {
            Ok(cleaned)
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::MemoryRecord;
    use serde_json::json;

    fn add_form() -> FormValidator {
        FormValidator::new([
            FormField::integer("id").optional(),
            FormField::char("name", Some(5)),
            FormField::char("capital", Some(50)),
            FormField::boolean("is_od").optional(),
            FormField::integer("population"),
        ])
        .with_id_rule(IdRule::Forbidden)
    }

    #[test]
    fn required_false_boolean_is_valid() {
        let form = FormValidator::new([FormField::boolean("val")]);
        let cleaned = form.validate(&json!({"val": false}), None).unwrap();
        assert_eq!(cleaned["val"], FieldValue::Bool(false));
    }

    #[test]
    fn required_true_boolean_is_valid() {
        let form = FormValidator::new([FormField::boolean("val")]);
        let cleaned = form.validate(&json!({"val": true}), None).unwrap();
        assert_eq!(cleaned["val"], FieldValue::Bool(true));
    }

    #[test]
    fn missing_required_boolean_is_invalid() {
        let form = FormValidator::new([FormField::boolean("val")]);
        let errors = form.validate(&json!({}), None).unwrap_err();
        assert_eq!(errors.get("val").unwrap(), [MSG_REQUIRED]);
    }

    #[test]
    fn missing_optional_boolean_is_null() {
        let form = FormValidator::new([FormField::boolean("val").optional()]);
        let cleaned = form.validate(&json!({}), None).unwrap();
        assert_eq!(cleaned["val"], FieldValue::Null);
    }

    #[test]
    fn add_form_cleans_valid_payload() {
        let cleaned = add_form()
            .validate(
                &json!({"name": "架空1県", "capital": "架空市", "is_od": true, "population": 100}),
                None,
            )
            .unwrap();
        assert_eq!(cleaned["name"], FieldValue::String("架空1県".into()));
        assert_eq!(cleaned["population"], FieldValue::Int(100));
        assert!(!cleaned.contains_key("id"));
    }

    #[test]
    fn add_form_reports_bad_integer_and_id() {
        let errors = add_form()
            .validate(
                &json!({"id": 3, "name": "架空2県", "capital": "架空市", "population": "deadbeaf"}),
                None,
            )
            .unwrap_err();
        assert_eq!(errors.get("population").unwrap(), [MSG_INTEGER]);
        assert_eq!(errors.get("id").unwrap(), [MSG_CANNOT_SET_ID]);
    }

    #[test]
    fn zero_id_counts_as_unset() {
        assert!(add_form()
            .validate(
                &json!({"id": 0, "name": "a", "capital": "b", "population": 1}),
                None
            )
            .is_ok());
    }

    #[test]
    fn max_length_is_counted_in_characters() {
        let errors = add_form()
            .validate(
                &json!({"name": "架空の長い県名", "capital": "x", "population": 1}),
                None,
            )
            .unwrap_err();
        assert_eq!(
            errors.get("name").unwrap(),
            ["Ensure this value has at most 5 characters (it has 7)."]
        );
    }

    #[test]
    fn change_form_requires_matching_id() {
        let form = add_form().with_id_rule(IdRule::MustMatchExisting);
        let record = MemoryRecord::new().with("id", 27i64);
        let existing: &dyn FieldSource = &record;
        let payload = json!({"id": 27, "name": "a", "capital": "b", "population": 1});
        let cleaned = form.validate(&payload, Some(existing)).unwrap();
        assert_eq!(cleaned["id"], FieldValue::Int(27));

        let moved = json!({"id": 28, "name": "a", "capital": "b", "population": 1});
        let errors = form.validate(&moved, Some(existing)).unwrap_err();
        assert_eq!(errors.get("id").unwrap(), [MSG_CANNOT_CHANGE_ID]);

        let missing = json!({"name": "a", "capital": "b", "population": 1});
        assert!(form.validate(&missing, Some(existing)).is_err());
    }

    #[test]
    fn non_object_payload_is_treated_as_empty() {
        let errors = add_form().validate(&json!("nope"), None).unwrap_err();
        assert_eq!(errors.get("name").unwrap(), [MSG_REQUIRED]);
        assert_eq!(errors.get("population").unwrap(), [MSG_REQUIRED]);
    }

    #[test]
    fn bounded_integer_reports_the_violated_limit() {
        let form = FormValidator::new([FormField::integer_in("n", -5, 10)]);
        assert_eq!(form.validate(&json!({"n": 10}), None).unwrap()["n"], FieldValue::Int(10));
        assert_eq!(form.validate(&json!({"n": "-5"}), None).unwrap()["n"], FieldValue::Int(-5));

        let errors = form.validate(&json!({"n": 11}), None).unwrap_err();
        assert_eq!(
            errors.get("n").unwrap(),
            ["Ensure this value is less than or equal to 10."]
        );
        let errors = form.validate(&json!({"n": -6}), None).unwrap_err();
        assert_eq!(
            errors.get("n").unwrap(),
            ["Ensure this value is greater than or equal to -5."]
        );
        // beyond i64 is not a whole number at all
        let errors = form.validate(&json!({"n": 1e30}), None).unwrap_err();
        assert_eq!(errors.get("n").unwrap(), [MSG_INTEGER]);
    }

    #[test]
    fn errors_serialize_as_object() {
        let mut errors = FieldErrors::new();
        errors.add("population", MSG_INTEGER);
        assert_eq!(errors.to_json(), json!({"population": [MSG_INTEGER]}));
        assert_eq!(serde_json::to_value(&errors).unwrap(), errors.to_json());
        assert_eq!(FieldErrors::new().to_json(), json!({}));
    }

    #[test]
    fn date_and_datetime_fields_parse_iso_text() {
        let form = FormValidator::new([FormField::date("d"), FormField::datetime("dt")]);
        let cleaned = form
            .validate(&json!({"d": "2014-10-12", "dt": "2014-09-20T15:02:04+09:00"}), None)
            .unwrap();
        assert!(matches!(cleaned["d"], FieldValue::Date(_)));
        assert!(matches!(cleaned["dt"], FieldValue::DateTimeTz(_)));

        let errors = form.validate(&json!({"d": "12/10/2014", "dt": "x"}), None).unwrap_err();
        assert_eq!(errors.get("d").unwrap(), [MSG_DATE]);
        assert_eq!(errors.get("dt").unwrap(), [MSG_DATETIME]);
    }
}
