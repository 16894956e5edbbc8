//! Central error type aggregating the per-module taxonomies.

use crate::{
    mapper::MapError,
    mapping::MappingError,
    provider::ProviderError,
    repository::{ConfigError, EntityNotFoundError},
    serialize::SerializeError,
};
use thiserror::Error as ThisError;

///
/// Error
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    NotFound(#[from] EntityNotFoundError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),
}
