use std::fmt;
use std::sync::Arc;

use jsonapi::{FieldSource, FieldValue, SerializeError};
use sea_orm::{EntityTrait, ModelTrait};

use crate::fields::FieldMap;

/// A fetched model exposing its whitelisted columns by name.
pub struct EntityRecord<E: EntityTrait> {
    pub model: E::Model,
    fmap: Arc<FieldMap<E>>,
}

impl<E: EntityTrait> EntityRecord<E> {
    pub fn new(model: E::Model, fmap: Arc<FieldMap<E>>) -> Self {
        Self { model, fmap }
    }

    pub fn into_model(self) -> E::Model {
        self.model
    }
}

impl<E: EntityTrait> fmt::Debug for EntityRecord<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityRecord").field(&self.model).finish()
    }
}

impl<E> FieldSource for EntityRecord<E>
where
    E: EntityTrait,
    E::Column: Copy,
{
    fn field(&self, name: &str) -> Result<FieldValue, SerializeError> {
        let f = self
            .fmap
            .get(name)
            .ok_or_else(|| SerializeError::UnknownField(name.to_string()))?;
        f.kind.from_sea(name, self.model.get(f.col))
    }
}
