//! Raw persistence media.
//!
//! A provider stores one opaque text document per entity type name and
//! raises a change notification (with the entity type name) when the
//! backing source changes underneath the repository. Unseeded sources
//! load as the empty string; the repository turns blank text into an
//! empty root tree.

mod delegate;
mod file;
mod memory;

pub use delegate::DelegateProvider;
pub use file::FileProvider;
pub use memory::MemoryProvider;

use std::path::PathBuf;
use thiserror::Error as ThisError;

///
/// ProviderError
///

#[derive(Debug, ThisError)]
pub enum ProviderError {
    #[error("io error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("watcher error: {0}")]
    Watch(#[from] notify::Error),
}

/// Callback invoked with the affected entity type name when a data source
/// changes.
pub type ChangeListener = Box<dyn Fn(&str) + Send + Sync>;

///
/// Provider
///

pub trait Provider: Send + Sync {
    /// Load the raw text for an entity type. Unseeded sources yield the
    /// empty string.
    fn load(&self, entity_name: &str) -> Result<String, ProviderError>;

    /// Persist the raw text for an entity type.
    fn save(&self, entity_name: &str, text: &str) -> Result<(), ProviderError>;

    /// Register a change listener. Listeners live as long as the provider.
    fn subscribe(&self, listener: ChangeListener);
}
