//! The mapping model: where each property of an entity type is placed in
//! its node, and the registry that holds one ordered mapping table per
//! type.

mod registry;

pub use registry::MappingRegistry;

use crate::entity::Entity;
use std::fmt;
use thiserror::Error as ThisError;

///
/// MappingError
///

#[derive(Debug, ThisError)]
pub enum MappingError {
    #[error("entity '{entity}' has no property '{property}'")]
    UnknownProperty { entity: &'static str, property: String },

    #[error(
        "property '{property}' of entity '{entity}' is not scalar and cannot be placed as {placement}"
    )]
    NonScalarPlacement {
        entity: &'static str,
        property: &'static str,
        placement: Placement,
    },

    #[error(
        "entity '{entity}' already places '{existing}' as content; cannot also place '{property}'"
    )]
    DuplicateContent {
        entity: &'static str,
        existing: &'static str,
        property: &'static str,
    },
}

///
/// Placement
///
/// Where a property's value is written within its entity's node.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Placement {
    /// A child node carrying the value.
    #[default]
    Element,
    /// An attribute on the entity's node.
    Attribute,
    /// The entity node's own text.
    Content,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Element => "element",
            Self::Attribute => "attribute",
            Self::Content => "content",
        })
    }
}

///
/// ValueKind
///
/// Shape of a mapped property's value, snapshotted from its field
/// descriptor at mapping construction.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueKind {
    Scalar,
    Object,
    Collection,
}

///
/// PropertyMapping
///
/// One property of one entity type: its placement, its optional alias,
/// and its value shape. At most one mapping exists per (type, property)
/// pair in any table; the first registration wins.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PropertyMapping {
    entity: &'static str,
    property: &'static str,
    alias: Option<String>,
    placement: Placement,
    kind: ValueKind,
}

impl PropertyMapping {
    /// Build a mapping for a property of `E`, validating that the property
    /// exists. Placement rules are enforced at registration time.
    pub fn of<E: Entity>(
        property: &str,
        placement: Placement,
        alias: Option<&str>,
    ) -> Result<Self, MappingError> {
        let field = E::field(property).ok_or_else(|| MappingError::UnknownProperty {
            entity: E::NODE_NAME,
            property: property.to_string(),
        })?;

        Ok(Self {
            entity: E::NODE_NAME,
            property: field.name,
            alias: alias.map(str::to_string),
            placement,
            kind: field.kind.value_kind(),
        })
    }

    #[must_use]
    pub const fn entity(&self) -> &'static str {
        self.entity
    }

    #[must_use]
    pub const fn property(&self) -> &'static str {
        self.property
    }

    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn set_alias(&mut self, alias: impl Into<String>) {
        self.alias = Some(alias.into());
    }

    #[must_use]
    pub const fn placement(&self) -> Placement {
        self.placement
    }

    pub const fn set_placement(&mut self, placement: Placement) {
        self.placement = placement;
    }

    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    /// The name used in the tree: the alias when set, the property name
    /// otherwise.
    #[must_use]
    pub fn mapped_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(self.property)
    }
}
