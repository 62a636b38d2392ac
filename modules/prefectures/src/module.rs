use std::sync::Arc;

use jsonapi::ResourceRouter;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::PrefecturesConfig;
use crate::infra::storage::{migrations::Migrator, seed};
use crate::resources::{self, MemoryPrefectures, ModelPrefectures, ModelUsers};

/// Database-backed collections, present once a connection is attached.
struct ModelResources {
    prefectures: Arc<ModelPrefectures>,
    users: Arc<ModelUsers>,
}

/// The prefecture collections and their routes.
///
/// `/prefectures` is always served from memory; `/models/prefectures` and
/// `/models/users` need a database.
pub struct Prefectures {
    cfg: PrefecturesConfig,
    memory: Arc<MemoryPrefectures>,
    models: Option<ModelResources>,
}

impl Prefectures {
    pub fn new(cfg: PrefecturesConfig) -> anyhow::Result<Self> {
        let memory = Arc::new(resources::memory_prefectures(&cfg)?);
        info!(
            default_per_page = cfg.default_per_page,
            debug = cfg.debug,
            "prefectures module initialized"
        );
        Ok(Self {
            cfg,
            memory,
            models: None,
        })
    }

    /// Create the tables and, when configured, load the bundled dataset.
    pub async fn migrate(&self, db: &DatabaseConnection) -> anyhow::Result<()> {
        info!("running prefectures database migrations");
        Migrator::up(db, None).await?;
        if self.cfg.seed {
            seed::seed(db).await?;
        }
        Ok(())
    }

    /// Attach a database and enable the model collections.
    pub fn with_database(mut self, db: DatabaseConnection) -> Self {
        self.models = Some(ModelResources {
            prefectures: Arc::new(resources::model_prefectures(db.clone(), &self.cfg)),
            users: Arc::new(resources::model_users(db, &self.cfg)),
        });
        self
    }

    pub fn memory_prefectures(&self) -> &Arc<MemoryPrefectures> {
        &self.memory
    }

    pub fn model_prefectures(&self) -> Option<&Arc<ModelPrefectures>> {
        self.models.as_ref().map(|m| &m.prefectures)
    }

    pub fn model_users(&self) -> Option<&Arc<ModelUsers>> {
        self.models.as_ref().map(|m| &m.users)
    }

    pub fn register_routes(&self, router: ResourceRouter) -> ResourceRouter {
        let router = router.resource("/prefectures", self.memory.clone());
        match &self.models {
            Some(models) => router
                .resource("/models/prefectures", models.prefectures.clone())
                .resource("/models/users", models.users.clone()),
            None => {
                info!("no database attached; model collections are not mounted");
                router
            }
        }
    }
}
