//! Purely in-memory data source, mainly for tests and ephemeral use.

use crate::{
    provider::{ChangeListener, Provider, ProviderError},
    sync::lock,
};
use std::{collections::HashMap, sync::Mutex};

///
/// MemoryProvider
///
/// One text document per entity type name, held in memory. `notify` lets
/// a test (or an embedding application) simulate an external change to
/// the data source.
///

#[derive(Default)]
pub struct MemoryProvider {
    texts: Mutex<HashMap<String, String>>,
    listeners: Mutex<Vec<ChangeListener>>,
}

impl MemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider seeded with initial text for one entity type.
    #[must_use]
    pub fn seeded(entity_name: impl Into<String>, text: impl Into<String>) -> Self {
        let provider = Self::new();
        lock(&provider.texts).insert(entity_name.into(), text.into());

        provider
    }

    /// Replace the stored text for an entity type without going through a
    /// repository, as an external writer would.
    pub fn set_text(&self, entity_name: impl Into<String>, text: impl Into<String>) {
        lock(&self.texts).insert(entity_name.into(), text.into());
    }

    /// Current stored text, if any. Test inspection hook.
    #[must_use]
    pub fn text(&self, entity_name: &str) -> Option<String> {
        lock(&self.texts).get(entity_name).cloned()
    }

    /// Fire the change notification for an entity type.
    pub fn notify(&self, entity_name: &str) {
        for listener in lock(&self.listeners).iter() {
            listener(entity_name);
        }
    }
}

impl Provider for MemoryProvider {
    fn load(&self, entity_name: &str) -> Result<String, ProviderError> {
        Ok(lock(&self.texts)
            .get(entity_name)
            .cloned()
            .unwrap_or_default())
    }

    fn save(&self, entity_name: &str, text: &str) -> Result<(), ProviderError> {
        lock(&self.texts).insert(entity_name.to_string(), text.to_string());

        Ok(())
    }

    fn subscribe(&self, listener: ChangeListener) {
        lock(&self.listeners).push(listener);
    }
}

///
/// TESTS
///
