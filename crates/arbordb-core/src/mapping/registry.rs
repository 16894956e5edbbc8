//! Per-type mapping tables with lazy, gap-filling default generation.

use crate::{
    entity::Entity,
    mapping::{MappingError, Placement, PropertyMapping, ValueKind},
    sync::lock,
};
use std::{collections::HashMap, sync::Mutex};

///
/// MappingRegistry
///
/// Ordered mapping table per entity type. Defaults are generated lazily on
/// first use of a type and only fill gaps, so explicit mappings registered
/// beforehand always take precedence. Registering an explicit mapping
/// after a type's defaults have been generated only works for properties
/// no mapping has claimed yet, and by then there are none left; register
/// explicit mappings before the type's first mapper use.
///

#[derive(Debug, Default)]
pub struct MappingRegistry {
    tables: Mutex<HashMap<&'static str, Vec<PropertyMapping>>>,
}

impl MappingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the mapping table for `E`, generating defaults first if
    /// the type has unclaimed properties.
    #[must_use]
    pub fn mappings_for<E: Entity>(&self) -> Vec<PropertyMapping> {
        let mut tables = lock(&self.tables);
        Self::fill_defaults::<E>(&mut tables);

        tables.get(E::NODE_NAME).cloned().unwrap_or_default()
    }

    /// Generate default mappings for every property of `E` that has none
    /// yet: element placement, no alias, declaration order. Idempotent.
    pub fn register_defaults<E: Entity>(&self) {
        Self::fill_defaults::<E>(&mut lock(&self.tables));
    }

    /// Register an explicit mapping. A mapping for the same (type,
    /// property) pair is already present: silently ignored, first
    /// registration wins. Placement violations fail fast.
    pub fn register(&self, mapping: PropertyMapping) -> Result<(), MappingError> {
        let mut tables = lock(&self.tables);
        let table = tables.entry(mapping.entity()).or_default();

        if table
            .iter()
            .any(|existing| existing.property() == mapping.property())
        {
            return Ok(());
        }

        Self::validate_placement(table, &mapping)?;
        table.push(mapping);

        Ok(())
    }

    fn fill_defaults<E: Entity>(tables: &mut HashMap<&'static str, Vec<PropertyMapping>>) {
        let table = tables.entry(E::NODE_NAME).or_default();

        for field in E::FIELDS {
            if table.iter().any(|mapping| mapping.property() == field.name) {
                continue;
            }

            table.push(PropertyMapping {
                entity: E::NODE_NAME,
                property: field.name,
                alias: None,
                placement: Placement::Element,
                kind: field.kind.value_kind(),
            });
        }
    }

    fn validate_placement(
        table: &[PropertyMapping],
        mapping: &PropertyMapping,
    ) -> Result<(), MappingError> {
        if mapping.placement() != Placement::Element && mapping.kind() != ValueKind::Scalar {
            return Err(MappingError::NonScalarPlacement {
                entity: mapping.entity(),
                property: mapping.property(),
                placement: mapping.placement(),
            });
        }

        if mapping.placement() == Placement::Content {
            if let Some(existing) = table
                .iter()
                .find(|other| other.placement() == Placement::Content)
            {
                return Err(MappingError::DuplicateContent {
                    entity: mapping.entity(),
                    existing: existing.property(),
                    property: mapping.property(),
                });
            }
        }

        Ok(())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{Geek, Person};

    #[test]
    fn defaults_cover_every_property_in_declaration_order() {
        let registry = MappingRegistry::new();
        let mappings = registry.mappings_for::<Person>();

        let properties: Vec<&str> = mappings.iter().map(PropertyMapping::property).collect();
        assert_eq!(
            properties,
            ["id", "first_name", "last_name", "birthday", "geek", "geeks"]
        );
        assert!(
            mappings
                .iter()
                .all(|mapping| mapping.placement() == Placement::Element)
        );
    }

    #[test]
    fn defaults_are_idempotent() {
        let registry = MappingRegistry::new();
        registry.register_defaults::<Person>();
        registry.register_defaults::<Person>();

        assert_eq!(registry.mappings_for::<Person>().len(), 6);
    }

    #[test]
    fn explicit_mapping_before_defaults_takes_precedence() {
        let registry = MappingRegistry::new();
        let mapping =
            PropertyMapping::of::<Person>("id", Placement::Attribute, Some("key")).unwrap();
        registry.register(mapping).unwrap();

        let mappings = registry.mappings_for::<Person>();

        let id = mappings
            .iter()
            .find(|mapping| mapping.property() == "id")
            .unwrap();
        assert_eq!(id.placement(), Placement::Attribute);
        assert_eq!(id.mapped_name(), "key");
        // the explicit entry leads, defaults fill the rest
        assert_eq!(mappings[0].property(), "id");
        assert_eq!(mappings.len(), 6);
    }

    #[test]
    fn first_registration_wins_silently() {
        let registry = MappingRegistry::new();
        registry
            .register(PropertyMapping::of::<Geek>("alias", Placement::Attribute, None).unwrap())
            .unwrap();
        registry
            .register(
                PropertyMapping::of::<Geek>("alias", Placement::Content, Some("ignored")).unwrap(),
            )
            .unwrap();

        let mappings = registry.mappings_for::<Geek>();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].placement(), Placement::Attribute);
        assert_eq!(mappings[0].mapped_name(), "alias");
    }

    #[test]
    fn non_scalar_placements_are_rejected() {
        let registry = MappingRegistry::new();
        let mapping =
            PropertyMapping::of::<Person>("geeks", Placement::Attribute, None).unwrap();

        assert!(matches!(
            registry.register(mapping),
            Err(MappingError::NonScalarPlacement { .. })
        ));
    }

    #[test]
    fn second_content_mapping_is_rejected() {
        let registry = MappingRegistry::new();
        registry
            .register(
                PropertyMapping::of::<Person>("first_name", Placement::Content, None).unwrap(),
            )
            .unwrap();

        let second =
            PropertyMapping::of::<Person>("last_name", Placement::Content, None).unwrap();
        assert!(matches!(
            registry.register(second),
            Err(MappingError::DuplicateContent { .. })
        ));
    }

    #[test]
    fn unknown_property_is_rejected_at_construction() {
        assert!(matches!(
            PropertyMapping::of::<Person>("no_such_field", Placement::Element, None),
            Err(MappingError::UnknownProperty { .. })
        ));
    }
}
