//! File-per-entity data source with filesystem change notification.

use crate::{
    provider::{ChangeListener, Provider, ProviderError},
    sync::lock,
};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

///
/// FileProvider
///
/// Stores each entity type as `<EntityName>.<extension>` under one data
/// directory. A filesystem watcher raises change notifications carrying
/// the file stem (the entity type name), so a repository reloads when its
/// backing file is edited externally. The provider does not suppress
/// events for its own writes; a reload of just-saved content is harmless.
///

pub struct FileProvider {
    data_dir: PathBuf,
    extension: String,
    listeners: Arc<Mutex<Vec<ChangeListener>>>,
    // keeps the watch alive for the provider's lifetime
    _watcher: RecommendedWatcher,
}

impl FileProvider {
    /// Watch `data_dir` (created if missing) for `*.extension` changes.
    pub fn new(data_dir: impl Into<PathBuf>, extension: &str) -> Result<Self, ProviderError> {
        let data_dir = data_dir.into();
        let extension = extension.trim_start_matches('.').to_string();

        fs::create_dir_all(&data_dir).map_err(|source| ProviderError::Io {
            path: data_dir.clone(),
            source,
        })?;

        let listeners: Arc<Mutex<Vec<ChangeListener>>> = Arc::new(Mutex::new(Vec::new()));
        let handler_listeners = Arc::clone(&listeners);
        let handler_extension = extension.clone();

        let mut watcher =
            notify::recommended_watcher(move |result: Result<Event, notify::Error>| {
                match result {
                    Ok(event) => {
                        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                            return;
                        }

                        for path in &event.paths {
                            let Some(entity_name) = entity_name_of(path, &handler_extension)
                            else {
                                continue;
                            };

                            tracing::debug!(entity = entity_name, "data file changed");
                            for listener in lock(&handler_listeners).iter() {
                                listener(entity_name);
                            }
                        }
                    }
                    Err(err) => tracing::warn!("file watcher error: {err}"),
                }
            })?;

        watcher.watch(&data_dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            data_dir,
            extension,
            listeners,
            _watcher: watcher,
        })
    }

    fn data_file(&self, entity_name: &str) -> PathBuf {
        self.data_dir
            .join(format!("{entity_name}.{}", self.extension))
    }
}

/// File stem of a data file with the watched extension.
fn entity_name_of<'a>(path: &'a Path, extension: &str) -> Option<&'a str> {
    if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
        return None;
    }

    path.file_stem().and_then(|stem| stem.to_str())
}

impl Provider for FileProvider {
    fn load(&self, entity_name: &str) -> Result<String, ProviderError> {
        let path = self.data_file(entity_name);

        if !path.exists() {
            return Ok(String::new());
        }

        fs::read_to_string(&path).map_err(|source| ProviderError::Io { path, source })
    }

    fn save(&self, entity_name: &str, text: &str) -> Result<(), ProviderError> {
        let path = self.data_file(entity_name);

        fs::write(&path, text).map_err(|source| ProviderError::Io { path, source })
    }

    fn subscribe(&self, listener: ChangeListener) {
        lock(&self.listeners).push(listener);
    }
}

///
/// TESTS
///
