//! Fluent construction of explicit property mappings.
//!
//! ```ignore
//! MappingBuilder::<Person>::new()
//!     .map("id")?.to_attribute()
//!     .map("last_name")?.to_element_as("surname")
//!     .register(ctx.registry())?;
//! ```
//!
//! Property names are checked against the entity's field table when `map`
//! is called, so a typo fails before it can silently produce an unmapped
//! table. Register explicit mappings before the type's first mapper use;
//! afterwards the generated defaults have claimed every property.

use arbordb_core::{
    entity::Entity,
    mapping::{MappingError, MappingRegistry, Placement, PropertyMapping},
};
use std::marker::PhantomData;

///
/// MappingBuilder
///

pub struct MappingBuilder<E: Entity> {
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity> MappingBuilder<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Start configuring a property. Element placement until changed.
    pub fn map(self, property: &str) -> Result<FluentMapping<E>, MappingError> {
        Ok(FluentMapping {
            done: Vec::new(),
            current: PropertyMapping::of::<E>(property, Placement::Element, None)?,
            _marker: PhantomData,
        })
    }
}

impl<E: Entity> Default for MappingBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

///
/// FluentMapping
///
/// One property under configuration, plus the ones already configured.
///

pub struct FluentMapping<E: Entity> {
    done: Vec<PropertyMapping>,
    current: PropertyMapping,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity> FluentMapping<E> {
    #[must_use]
    pub fn to_element(mut self) -> Self {
        self.current.set_placement(Placement::Element);
        self
    }

    #[must_use]
    pub fn to_element_as(mut self, alias: &str) -> Self {
        self.current.set_placement(Placement::Element);
        self.current.set_alias(alias);
        self
    }

    #[must_use]
    pub fn to_attribute(mut self) -> Self {
        self.current.set_placement(Placement::Attribute);
        self
    }

    #[must_use]
    pub fn to_attribute_as(mut self, alias: &str) -> Self {
        self.current.set_placement(Placement::Attribute);
        self.current.set_alias(alias);
        self
    }

    #[must_use]
    pub fn to_content(mut self) -> Self {
        self.current.set_placement(Placement::Content);
        self
    }

    /// Finish the current property and start the next one.
    pub fn map(mut self, property: &str) -> Result<Self, MappingError> {
        self.done.push(self.current);
        self.current = PropertyMapping::of::<E>(property, Placement::Element, None)?;

        Ok(self)
    }

    /// The configured mappings, in configuration order.
    #[must_use]
    pub fn build(mut self) -> Vec<PropertyMapping> {
        self.done.push(self.current);

        self.done
    }

    /// Register every configured mapping. Placement violations fail here;
    /// already-claimed properties are skipped (first registration wins).
    pub fn register(self, registry: &MappingRegistry) -> Result<(), MappingError> {
        for mapping in self.build() {
            registry.register(mapping)?;
        }

        Ok(())
    }
}

///
/// TESTS
///
