//! Create and update forms of the prefecture collections.

use jsonapi::{FormField, FormValidator, IdRule};
use jsonapi_db::FieldMap;

use crate::infra::storage::entity::prefecture;

fn prefecture_fields() -> Vec<FormField> {
    vec![
        FormField::char("name", None),
        FormField::char("capital", None),
        FormField::boolean("is_od").optional(),
        FormField::integer("population"),
    ]
}

/// New in-memory prefecture; the id is assigned by the collection.
pub fn add_prefecture() -> FormValidator {
    FormValidator::new(prefecture_fields()).with_id_rule(IdRule::Forbidden)
}

/// Every field may change except the id.
pub fn change_prefecture() -> FormValidator {
    FormValidator::new(prefecture_fields()).with_id_rule(IdRule::MustMatchExisting)
}

pub fn model_add_prefecture(fields: &FieldMap<prefecture::Entity>) -> FormValidator {
    fields.form(
        &["name", "capital", "is_od", "population"],
        IdRule::Forbidden,
    )
}

/// The name and designation of a stored prefecture are fixed.
pub fn model_change_prefecture(fields: &FieldMap<prefecture::Entity>) -> FormValidator {
    fields.form(&["capital", "population"], IdRule::MustMatchExisting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonapi::{FieldValue, Validator};
    use serde_json::json;

    #[test]
    fn add_rejects_explicit_id() {
        let errors = add_prefecture()
            .validate(
                &json!({"id": 3, "name": "架空県", "capital": "架空市", "population": 1}),
                None,
            )
            .unwrap_err();
        assert_eq!(errors.get("id").unwrap(), ["Cannot Set ID"]);
    }

    #[test]
    fn add_requires_population() {
        let errors = add_prefecture()
            .validate(&json!({"name": "架空県", "capital": "架空市"}), None)
            .unwrap_err();
        assert_eq!(errors.get("population").unwrap(), ["This field is required."]);
        assert!(errors.get("is_od").is_none());
    }

    #[test]
    fn model_forms_follow_the_schema() {
        let fields = FieldMap::<prefecture::Entity>::from_entity();
        let errors = model_add_prefecture(&fields)
            .validate(
                &json!({"name": "とても長い県名", "capital": "市", "population": "many"}),
                None,
            )
            .unwrap_err();
        assert_eq!(
            errors.get("name").unwrap(),
            ["Ensure this value has at most 5 characters (it has 7)."]
        );
        assert_eq!(errors.get("population").unwrap(), ["Enter a whole number."]);

        let errors = model_change_prefecture(&fields)
            .validate(&json!({"name": "x", "capital": "市", "population": 3}), None)
            .unwrap_err();
        // no existing record to match
        assert_eq!(errors.get("id").unwrap(), ["Cannot Change ID"]);
    }

    #[test]
    fn change_form_drops_fixed_columns() {
        let fields = FieldMap::<prefecture::Entity>::from_entity();
        let form = model_change_prefecture(&fields);
        let names: Vec<_> = form.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["capital", "population"]);

        let existing = jsonapi::MemoryRecord::new().with("id", FieldValue::Int(27));
        let cleaned = form
            .validate(
                &json!({"id": 27, "name": "x", "capital": "市", "population": 3}),
                Some(&existing),
            )
            .unwrap();
        assert!(!cleaned.contains_key("name"));
        assert_eq!(cleaned["population"], FieldValue::Int(3));
    }
}
