//! SeaORM collection provider for `jsonapi` resources.
//!
//! Whitelisted list parameters are compiled into `Select<E>` conditions and
//! ordering; records are read through a [`FieldMap`] derived from the entity
//! schema, which also yields create/update forms for model resources.

pub mod fields;
pub mod filter;
pub mod provider;
pub mod record;

pub use fields::{Field, FieldKind, FieldMap};
pub use filter::{filters_to_condition, predicate_to_condition, QuerySpecExt};
pub use provider::SeaOrmProvider;
pub use record::EntityRecord;
