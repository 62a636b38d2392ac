use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::descriptor::ResourceDescriptor;
use crate::dispatcher::{ApiRequest, ApiResponse, Dispatcher};
use crate::provider::CollectionProvider;
use crate::validation::Validator;

pub const DEFAULT_PER_PAGE: u64 = 50;

/// Reassignable part of a resource's configuration.
///
/// A missing validator turns the matching write operation off (405).
#[derive(Clone)]
pub struct ResourceSettings {
    pub create_validator: Option<Arc<dyn Validator>>,
    pub update_validator: Option<Arc<dyn Validator>>,
    /// Merged into `meta` of list responses.
    pub metadata: Map<String, Value>,
    pub default_per_page: u64,
    /// Adds the executed query log to list responses.
    pub debug: bool,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            create_validator: None,
            update_validator: None,
            metadata: Map::new(),
            default_per_page: DEFAULT_PER_PAGE,
            debug: false,
        }
    }
}

impl fmt::Debug for ResourceSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSettings")
            .field("create_validator", &self.create_validator.is_some())
            .field("update_validator", &self.update_validator.is_some())
            .field("metadata", &self.metadata)
            .field("default_per_page", &self.default_per_page)
            .field("debug", &self.debug)
            .finish()
    }
}

/// A collection exposed over HTTP: descriptor, provider and settings.
pub struct Resource<P: CollectionProvider> {
    descriptor: ResourceDescriptor,
    provider: P,
    settings: RwLock<ResourceSettings>,
}

impl<P: CollectionProvider> Resource<P> {
    pub fn new(descriptor: ResourceDescriptor, provider: P) -> Self {
        Self {
            descriptor,
            provider,
            settings: RwLock::new(ResourceSettings::default()),
        }
    }

    pub fn with_settings(self, settings: ResourceSettings) -> Self {
        *self.settings.write() = settings;
        self
    }

    pub fn with_create_validator(self, v: impl Validator + 'static) -> Self {
        self.configure(|s| s.create_validator = Some(Arc::new(v)));
        self
    }

    pub fn with_update_validator(self, v: impl Validator + 'static) -> Self {
        self.configure(|s| s.update_validator = Some(Arc::new(v)));
        self
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Copy of the current settings.
    pub fn settings(&self) -> ResourceSettings {
        self.settings.read().clone()
    }

    /// Edit the settings in place; later requests see the change.
    pub fn configure(&self, f: impl FnOnce(&mut ResourceSettings)) {
        f(&mut self.settings.write());
    }

    pub async fn dispatch(&self, request: ApiRequest) -> ApiResponse {
        let settings = self.settings();
        Dispatcher::new(&self.descriptor, &self.provider, &settings)
            .dispatch(request)
            .await
    }
}

/// Object-safe handle used to mount resources of any provider type.
#[async_trait]
pub trait ResourceEndpoint: Send + Sync {
    fn name(&self) -> &str;
    async fn handle(&self, request: ApiRequest) -> ApiResponse;
}

#[async_trait]
impl<P: CollectionProvider + 'static> ResourceEndpoint for Resource<P> {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    async fn handle(&self, request: ApiRequest) -> ApiResponse {
        self.dispatch(request).await
    }
}
