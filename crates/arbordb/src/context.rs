//! The ownership root for a configured set of repositories.
//!
//! A context owns the default mapping registry, provider, serializer, and
//! identity property name, plus the repository cache that memoizes one
//! repository per configuration. Everything is explicit: no process-wide
//! statics, no implicit initialization order.

use arbordb_core::{
    cache::RepositoryCache,
    entity::Entity,
    error::Error,
    mapping::MappingRegistry,
    provider::{MemoryProvider, Provider},
    repository::Repository,
    scalar::Scalar,
    serialize::{Serializer, XmlSerializer},
};
use std::sync::Arc;

/// Identity property assumed when a configuration names none.
const DEFAULT_QUERY_PROPERTY: &str = "id";

///
/// Context
///

pub struct Context {
    registry: Arc<MappingRegistry>,
    provider: Arc<dyn Provider>,
    serializer: Arc<dyn Serializer>,
    query_property: String,
    cache: RepositoryCache,
}

impl Context {
    #[must_use]
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// The context's default mapping registry. Register explicit mappings
    /// here before a type's first repository use.
    #[must_use]
    pub const fn registry(&self) -> &Arc<MappingRegistry> {
        &self.registry
    }

    /// The repository cache, for configuration swaps on live instances.
    #[must_use]
    pub const fn cache(&self) -> &RepositoryCache {
        &self.cache
    }

    /// The repository for `E` keyed by the context defaults.
    pub fn repository<E: Entity, I: Scalar + 'static>(
        &self,
    ) -> Result<Arc<Repository<E, I>>, Error> {
        self.repository_with(RepositoryConfig::default())
    }

    /// The repository for `E` with per-repository overrides applied over
    /// the context defaults.
    pub fn repository_with<E: Entity, I: Scalar + 'static>(
        &self,
        config: RepositoryConfig,
    ) -> Result<Arc<Repository<E, I>>, Error> {
        let query_property = config
            .query_property
            .unwrap_or_else(|| self.query_property.clone());
        let registry = config.registry.unwrap_or_else(|| Arc::clone(&self.registry));
        let provider = config.provider.unwrap_or_else(|| Arc::clone(&self.provider));
        let serializer = config
            .serializer
            .unwrap_or_else(|| Arc::clone(&self.serializer));

        self.cache
            .get_or_open::<E, I>(&query_property, registry, provider, serializer)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::builder().build()
    }
}

///
/// ContextBuilder
///
/// Defaults: a fresh registry, an in-memory provider, the XML serializer,
/// and `"id"` as the identity property.
///

#[derive(Default)]
pub struct ContextBuilder {
    registry: Option<Arc<MappingRegistry>>,
    provider: Option<Arc<dyn Provider>>,
    serializer: Option<Arc<dyn Serializer>>,
    query_property: Option<String>,
}

impl ContextBuilder {
    #[must_use]
    pub fn registry(mut self, registry: Arc<MappingRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn provider(mut self, provider: impl Provider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Install an already-shared provider handle; lookups key on this
    /// exact instance.
    #[must_use]
    pub fn provider_handle(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn serializer(mut self, serializer: impl Serializer + 'static) -> Self {
        self.serializer = Some(Arc::new(serializer));
        self
    }

    #[must_use]
    pub fn query_property(mut self, property: impl Into<String>) -> Self {
        self.query_property = Some(property.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Context {
        Context {
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(MappingRegistry::new())),
            provider: self
                .provider
                .unwrap_or_else(|| Arc::new(MemoryProvider::new())),
            serializer: self
                .serializer
                .unwrap_or_else(|| Arc::new(XmlSerializer::new())),
            query_property: self
                .query_property
                .unwrap_or_else(|| DEFAULT_QUERY_PROPERTY.to_string()),
            cache: RepositoryCache::new(),
        }
    }
}

///
/// RepositoryConfig
///
/// Per-repository overrides of the context defaults.
///

#[derive(Default)]
pub struct RepositoryConfig {
    query_property: Option<String>,
    registry: Option<Arc<MappingRegistry>>,
    provider: Option<Arc<dyn Provider>>,
    serializer: Option<Arc<dyn Serializer>>,
}

impl RepositoryConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_query_property(mut self, property: impl Into<String>) -> Self {
        self.query_property = Some(property.into());
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<MappingRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl Provider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Use an already-shared provider handle.
    #[must_use]
    pub fn with_provider_handle(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn with_serializer(mut self, serializer: impl Serializer + 'static) -> Self {
        self.serializer = Some(Arc::new(serializer));
        self
    }
}
