//! Descriptors and resource construction for the three collections.

use jsonapi::{MemoryProvider, Resource, ResourceDescriptor};
use jsonapi_db::{FieldMap, SeaOrmProvider};
use sea_orm::DatabaseConnection;

use crate::config::PrefecturesConfig;
use crate::dataset;
use crate::forms;
use crate::infra::storage::entity::{prefecture, user};

pub type MemoryPrefectures = Resource<MemoryProvider>;
pub type ModelPrefectures = Resource<SeaOrmProvider<prefecture::ActiveModel>>;
pub type ModelUsers = Resource<SeaOrmProvider<user::ActiveModel>>;

fn prefecture_descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new("prefectures")
        .fields(["id", "name", "capital", "is_od", "population"])
        .fields([("is_designated_by_ordinance", "is_od")])
}

/// In-memory prefectures, loaded from the bundled dataset. Not filterable
/// or sortable.
pub fn memory_prefectures(cfg: &PrefecturesConfig) -> anyhow::Result<MemoryPrefectures> {
    let provider = MemoryProvider::from_json(&dataset::prefecture_json()?)?;
    let resource = Resource::new(prefecture_descriptor(), provider)
        .with_create_validator(forms::add_prefecture())
        .with_update_validator(forms::change_prefecture());
    resource.configure(|s| cfg.apply(s));
    Ok(resource)
}

pub fn model_prefectures(db: DatabaseConnection, cfg: &PrefecturesConfig) -> ModelPrefectures {
    let provider = SeaOrmProvider::<prefecture::ActiveModel>::new(db);
    let add = forms::model_add_prefecture(provider.fields());
    let change = forms::model_change_prefecture(provider.fields());
    let descriptor = prefecture_descriptor()
        .filters(["name"])
        .filters([("population_gte", "population__gte")])
        .order_fields(["population"])
        .order_fields([("od", "is_od")]);
    let resource = Resource::new(descriptor, provider)
        .with_create_validator(add)
        .with_update_validator(change);
    resource.configure(|s| cfg.apply(s));
    resource
}

/// Users are read-only apart from deletion: no validators are installed.
pub fn model_users(db: DatabaseConnection, cfg: &PrefecturesConfig) -> ModelUsers {
    let fields = FieldMap::<user::Entity>::from_entity()
        .reference("prefecture_id")
        .reference("carrier_id");
    let provider = SeaOrmProvider::<user::ActiveModel>::with_fields(db, fields);
    let descriptor = ResourceDescriptor::new("users")
        .fields([
            "id",
            "shimei",
            "shimei_kana",
            "email",
            "sex",
            "birthdate",
            "is_married",
            "blood_type",
        ])
        .fields([("prefecture", "prefecture_id")])
        .fields(["tel", "mobile"])
        .fields([("carrier", "carrier_id")])
        .filters(["sex", "blood_type"])
        .filters([
            ("prefecture", "prefecture_id"),
            ("born_after", "birthdate__gte"),
            ("kana", "shimei_kana__startswith"),
        ])
        .order_fields(["birthdate"])
        .order_fields([("kana", "shimei_kana")]);
    let resource = Resource::new(descriptor, provider);
    resource.configure(|s| cfg.apply(s));
    resource
}
