//! Process-wide memoization of repository instances.
//!
//! Two lookups share a repository only when their whole configuration
//! matches, and for the mapping registry and provider that means the
//! *same object*, not an equivalent one. The pointer tokens below make
//! that reference identity explicit instead of leaning on incidental
//! map-key semantics.

use crate::{
    entity::Entity,
    error::Error,
    mapping::MappingRegistry,
    provider::Provider,
    repository::Repository,
    scalar::Scalar,
    serialize::Serializer,
    sync::lock,
};
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{Arc, Mutex},
};

///
/// RegistryToken
///
/// Identity of one mapping-registry instance.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct RegistryToken(usize);

impl RegistryToken {
    #[must_use]
    pub fn of(registry: &Arc<MappingRegistry>) -> Self {
        Self(Arc::as_ptr(registry) as usize)
    }
}

///
/// ProviderToken
///
/// Identity of one provider instance.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ProviderToken(usize);

impl ProviderToken {
    #[must_use]
    pub fn of(provider: &Arc<dyn Provider>) -> Self {
        Self(Arc::as_ptr(provider).cast::<()>() as usize)
    }
}

///
/// CacheKey
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct CacheKey {
    entity: TypeId,
    identity: TypeId,
    query_property: String,
    registry: RegistryToken,
    provider: ProviderToken,
}

impl CacheKey {
    fn new<E: Entity, I: 'static>(
        query_property: &str,
        registry: &Arc<MappingRegistry>,
        provider: &Arc<dyn Provider>,
    ) -> Self {
        Self {
            entity: TypeId::of::<E>(),
            identity: TypeId::of::<I>(),
            query_property: query_property.to_string(),
            registry: RegistryToken::of(registry),
            provider: ProviderToken::of(provider),
        }
    }
}

///
/// RepositoryCache
///
/// No eviction: entries live until the process ends or the key is
/// displaced by a configuration swap.
///

#[derive(Default)]
pub struct RepositoryCache {
    entries: Mutex<HashMap<CacheKey, Arc<dyn Any + Send + Sync>>>,
}

impl RepositoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    /// Return the repository for this configuration, opening and
    /// registering one on the first request. Repository construction (and
    /// its initial load) happens under the cache lock, serializing
    /// creation across the process.
    pub fn get_or_open<E: Entity, I: Scalar + 'static>(
        &self,
        query_property: &str,
        registry: Arc<MappingRegistry>,
        provider: Arc<dyn Provider>,
        serializer: Arc<dyn Serializer>,
    ) -> Result<Arc<Repository<E, I>>, Error> {
        let key = CacheKey::new::<E, I>(query_property, &registry, &provider);
        let mut entries = lock(&self.entries);

        if let Some(existing) = entries.get(&key) {
            if let Ok(repository) = Arc::clone(existing).downcast::<Repository<E, I>>() {
                return Ok(repository);
            }
        }

        let repository = Repository::open(query_property, registry, provider, serializer)?;
        entries.insert(
            key,
            Arc::clone(&repository) as Arc<dyn Any + Send + Sync>,
        );

        Ok(repository)
    }

    /// Swap a live repository's provider, re-keying the cache so lookups
    /// with the new configuration keep finding the same instance. Change
    /// subscriptions on the old provider go stale; the new provider is
    /// subscribed.
    pub fn swap_provider<E: Entity, I: Scalar + 'static>(
        &self,
        repository: &Arc<Repository<E, I>>,
        provider: Arc<dyn Provider>,
    ) {
        let mut entries = lock(&self.entries);

        let old_key = CacheKey::new::<E, I>(
            repository.query_property(),
            &repository.registry_handle(),
            &repository.provider_handle(),
        );
        entries.remove(&old_key);

        repository.replace_provider(Arc::clone(&provider));

        let new_key = CacheKey::new::<E, I>(
            repository.query_property(),
            &repository.registry_handle(),
            &provider,
        );
        entries.insert(
            new_key,
            Arc::clone(repository) as Arc<dyn Any + Send + Sync>,
        );
    }

    /// Swap a live repository's mapping registry, re-keying the cache.
    pub fn swap_registry<E: Entity, I: Scalar + 'static>(
        &self,
        repository: &Arc<Repository<E, I>>,
        registry: Arc<MappingRegistry>,
    ) {
        let mut entries = lock(&self.entries);

        let old_key = CacheKey::new::<E, I>(
            repository.query_property(),
            &repository.registry_handle(),
            &repository.provider_handle(),
        );
        entries.remove(&old_key);

        repository.replace_registry(Arc::clone(&registry));

        let new_key = CacheKey::new::<E, I>(
            repository.query_property(),
            &registry,
            &repository.provider_handle(),
        );
        entries.insert(
            new_key,
            Arc::clone(repository) as Arc<dyn Any + Send + Sync>,
        );
    }
}

///
/// TESTS
///
