//! arbordb: tree-document object persistence without a database.
//!
//! Entities (plain structs deriving [`Entity`]) are mapped bidirectionally
//! into a tree of named nodes, driven by a per-type mapping table that is
//! generated from the type's field descriptors and overridable through
//! [`MappingBuilder`]. A [`Context`] owns the default configuration and
//! hands out cached, transactional repositories:
//!
//! ```ignore
//! let ctx = Context::builder().build();
//! let people = ctx.repository::<Person, Ulid>()?;
//!
//! people.save_on_submit(&person)?;
//! people.submit_changes()?;
//! ```

extern crate self as arbordb;

mod builder;
mod context;

pub use builder::{FluentMapping, MappingBuilder};
pub use context::{Context, ContextBuilder, RepositoryConfig};

// core modules, re-exported at the paths generated code expects
pub use arbordb_core::{
    Error, MAX_MAP_DEPTH, cache, entity, error, mapper, mapping, node, provider, repository,
    scalar, scalar_enum, serialize,
};

pub use arbordb_core::entity::Entity;
pub use arbordb_derive::Entity;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        Context, ContextBuilder, Entity, MappingBuilder, RepositoryConfig,
        mapping::{MappingRegistry, Placement, PropertyMapping},
        node::Node,
        repository::Repository,
        scalar::{Scalar, Timestamp, Ulid},
    };
}
