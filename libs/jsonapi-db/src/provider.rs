use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use jsonapi::validation::ID_FIELD;
use jsonapi::{
    CleanedData, CollectionProvider, FieldErrors, FieldSource, FieldValue, FilterPredicate,
    PageRequest, QueryLog, RecordId, SortDirective,
};
use sea_orm::{
    sea_query::Expr, ActiveModelBehavior, ActiveModelTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QuerySelect, QueryTrait, Select,
};
use tracing::{debug, instrument};

use crate::fields::FieldMap;
use crate::filter::QuerySpecExt;
use crate::record::EntityRecord;

type EntityOf<A> = <A as ActiveModelTrait>::Entity;
type ModelOf<A> = <EntityOf<A> as EntityTrait>::Model;

/// Collection provider over one SeaORM entity, addressed through its
/// active model type.
pub struct SeaOrmProvider<A: ActiveModelTrait> {
    conn: DatabaseConnection,
    fmap: Arc<FieldMap<EntityOf<A>>>,
    _active: PhantomData<fn() -> A>,
}

impl<A: ActiveModelTrait> SeaOrmProvider<A>
where
    <EntityOf<A> as EntityTrait>::Column: Copy,
{
    /// Provider exposing every column whose type has a field kind.
    pub fn new(conn: DatabaseConnection) -> Self {
        Self::with_fields(conn, FieldMap::from_entity())
    }

    pub fn with_fields(conn: DatabaseConnection, fmap: FieldMap<EntityOf<A>>) -> Self {
        Self {
            conn,
            fmap: Arc::new(fmap),
            _active: PhantomData,
        }
    }

    pub fn fields(&self) -> &FieldMap<EntityOf<A>> {
        &self.fmap
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    fn record(&self, model: ModelOf<A>) -> EntityRecord<EntityOf<A>> {
        EntityRecord::new(model, self.fmap.clone())
    }

    fn id_column(&self) -> anyhow::Result<<EntityOf<A> as EntityTrait>::Column> {
        self.fmap
            .get(ID_FIELD)
            .map(|f| f.col)
            .ok_or_else(|| anyhow!("entity has no `{ID_FIELD}` column"))
    }

    /// Copy cleaned values onto the active model, leaving `id` to the
    /// database. A value the column cannot hold fails the whole write.
    fn assign(&self, active: &mut A, data: &CleanedData) -> anyhow::Result<()> {
        for (name, value) in data {
            if name == ID_FIELD {
                continue;
            }
            let Some(f) = self.fmap.get(name) else {
                debug!(field = %name, "cleaned field not in schema");
                continue;
            };
            if value == &FieldValue::Null && !f.nullable {
                debug!(field = %name, "null for non-nullable column left unset");
                continue;
            }
            let stored = f
                .kind
                .to_sea(value)
                .ok_or_else(|| anyhow!("value {value:?} does not fit column `{name}`"))?;
            active.set(f.col, stored);
        }
        Ok(())
    }
}

/// `is_od` becomes "Is od".
fn verbose_name(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl<A> CollectionProvider for SeaOrmProvider<A>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send + Sync + 'static,
    ModelOf<A>: IntoActiveModel<A> + Sync,
    <EntityOf<A> as EntityTrait>::Column: Copy,
{
    type Record = EntityRecord<EntityOf<A>>;
    type Selection = Select<EntityOf<A>>;

    async fn select(
        &self,
        filters: &[FilterPredicate],
        sort: Option<&SortDirective>,
        _log: &QueryLog,
    ) -> anyhow::Result<Self::Selection> {
        Ok(<EntityOf<A> as EntityTrait>::find()
            .apply_filters(filters, &self.fmap)
            .apply_sort(sort, &self.fmap))
    }

    #[instrument(name = "jsonapi_db.count", skip_all)]
    async fn count(&self, selection: &Self::Selection, log: &QueryLog) -> anyhow::Result<u64> {
        let started = Instant::now();
        let total = selection
            .clone()
            .count(&self.conn)
            .await
            .context("count query failed")?;
        let backend = self.conn.get_database_backend();
        log.record(
            || format!("SELECT COUNT(*) FROM ({})", selection.build(backend)),
            started.elapsed(),
        );
        Ok(total)
    }

    #[instrument(
        name = "jsonapi_db.paginate",
        skip_all,
        fields(page = page.page, per_page = page.per_page)
    )]
    async fn paginate(
        &self,
        selection: Self::Selection,
        page: &PageRequest,
        log: &QueryLog,
    ) -> anyhow::Result<Vec<Self::Record>> {
        let query = selection.offset(page.offset()).limit(page.per_page);
        let backend = self.conn.get_database_backend();
        let started = Instant::now();
        let rows = query
            .clone()
            .all(&self.conn)
            .await
            .context("page query failed")?;
        log.record(|| query.build(backend).to_string(), started.elapsed());
        Ok(rows.into_iter().map(|m| self.record(m)).collect())
    }

    async fn get_by_id(&self, id: RecordId) -> anyhow::Result<Option<Self::Record>> {
        let model = <EntityOf<A> as EntityTrait>::find()
            .filter(Expr::col(self.id_column()?).eq(id))
            .one(&self.conn)
            .await
            .with_context(|| format!("lookup of id {id} failed"))?;
        Ok(model.map(|m| self.record(m)))
    }

    #[instrument(name = "jsonapi_db.conflicts", skip_all)]
    async fn conflicts(
        &self,
        data: &CleanedData,
        pending: &[CleanedData],
        existing: Option<&Self::Record>,
    ) -> anyhow::Result<FieldErrors> {
        let exclude = existing.and_then(|r| r.record_id());
        let mut errors = FieldErrors::new();
        for (name, f) in self.fmap.unique_fields() {
            let Some(value) = data.get(name).filter(|v| **v != FieldValue::Null) else {
                continue;
            };
            let mut taken = pending.iter().any(|p| p.get(name) == Some(value));
            if !taken {
                let stored = f
                    .kind
                    .to_sea(value)
                    .ok_or_else(|| anyhow!("value {value:?} does not fit column `{name}`"))?;
                let mut query =
                    <EntityOf<A> as EntityTrait>::find().filter(Expr::col(f.col).eq(stored));
                if let Some(id) = exclude {
                    query = query.filter(Expr::col(self.id_column()?).ne(id));
                }
                taken = query
                    .count(&self.conn)
                    .await
                    .with_context(|| format!("uniqueness check of `{name}` failed"))?
                    > 0;
            }
            if taken {
                debug!(field = name, "unique value already taken");
                errors.add(
                    name,
                    format!("Record with this {} already exists.", verbose_name(name)),
                );
            }
        }
        Ok(errors)
    }

    #[instrument(name = "jsonapi_db.create", skip_all)]
    async fn create(&self, data: CleanedData) -> anyhow::Result<Self::Record> {
        let mut active = <A as ActiveModelTrait>::default();
        self.assign(&mut active, &data)?;
        let model = active.insert(&self.conn).await.context("insert failed")?;
        Ok(self.record(model))
    }

    #[instrument(name = "jsonapi_db.update", skip_all)]
    async fn update(
        &self,
        record: Self::Record,
        data: CleanedData,
    ) -> anyhow::Result<Self::Record> {
        let mut active: A = record.into_model().into_active_model();
        self.assign(&mut active, &data)?;
        let model = active.update(&self.conn).await.context("update failed")?;
        Ok(self.record(model))
    }

    #[instrument(name = "jsonapi_db.delete", skip_all)]
    async fn delete(&self, record: Self::Record) -> anyhow::Result<()> {
        let id = record
            .record_id()
            .ok_or_else(|| anyhow!("record has no integer `{ID_FIELD}`"))?;
        let result = <EntityOf<A> as EntityTrait>::delete_many()
            .filter(Expr::col(self.id_column()?).eq(id))
            .exec(&self.conn)
            .await
            .with_context(|| format!("delete of id {id} failed"))?;
        if result.rows_affected == 0 {
            return Err(anyhow!("record {id} vanished before delete"));
        }
        Ok(())
    }
}
