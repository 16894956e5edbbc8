//! Data source backed by caller-supplied load/save closures.

use crate::{
    provider::{ChangeListener, Provider, ProviderError},
    sync::lock,
};
use std::sync::Mutex;

///
/// DelegateProvider
///
/// Bridges the repository to whatever the embedding application uses for
/// storage. The closures receive the entity type name so one delegate
/// pair can serve several repositories.
///

pub struct DelegateProvider {
    load_fn: Box<dyn Fn(&str) -> String + Send + Sync>,
    save_fn: Box<dyn Fn(&str, &str) + Send + Sync>,
    listeners: Mutex<Vec<ChangeListener>>,
}

impl DelegateProvider {
    #[must_use]
    pub fn new(
        load_fn: impl Fn(&str) -> String + Send + Sync + 'static,
        save_fn: impl Fn(&str, &str) + Send + Sync + 'static,
    ) -> Self {
        Self {
            load_fn: Box::new(load_fn),
            save_fn: Box::new(save_fn),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Fire the change notification for an entity type, for delegates
    /// whose backing source changed out of band.
    pub fn notify(&self, entity_name: &str) {
        for listener in lock(&self.listeners).iter() {
            listener(entity_name);
        }
    }
}

impl Provider for DelegateProvider {
    fn load(&self, entity_name: &str) -> Result<String, ProviderError> {
        Ok((self.load_fn)(entity_name))
    }

    fn save(&self, entity_name: &str, text: &str) -> Result<(), ProviderError> {
        (self.save_fn)(entity_name, text);

        Ok(())
    }

    fn subscribe(&self, listener: ChangeListener) {
        lock(&self.listeners).push(listener);
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn delegates_see_entity_names_and_payloads() {
        let store: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&store);

        let provider = DelegateProvider::new(
            |entity_name| format!("<{entity_name} />"),
            move |_, text| {
                *sink.lock().unwrap() = Some(text.to_string());
            },
        );

        assert_eq!(provider.load("Person").unwrap(), "<Person />");
        provider.save("Person", "payload").unwrap();
        assert_eq!(store.lock().unwrap().as_deref(), Some("payload"));
    }
}
