//! The bidirectional entity/tree mapper.
//!
//! Converts an entity instance into a [`Node`] and back, driven entirely
//! by the mapping table the registry holds for the type. One asymmetry is
//! load-bearing and preserved deliberately: a present child *object* is
//! written under the child's own type name, while scalars, absent child
//! objects, and collection wrappers are written under the mapping's
//! `mapped_name`. Read-back of child objects therefore looks the child up
//! by its type name; an absent child leaves the property at its default.

use crate::{
    MAX_MAP_DEPTH,
    entity::{Entity, FieldKind},
    mapping::{MappingRegistry, Placement},
    node::Node,
    scalar::ScalarError,
};
use thiserror::Error as ThisError;

///
/// MapError
///

#[derive(Debug, ThisError)]
pub enum MapError {
    #[error("mapping depth limit of {limit} exceeded; entity graphs must be acyclic")]
    DepthExceeded { limit: usize },

    #[error("entity '{entity}' has no property '{property}'")]
    UnknownProperty { entity: &'static str, property: String },

    #[error("mapping for '{entity}.{property}' does not match the field's shape")]
    PlacementMismatch {
        entity: &'static str,
        property: &'static str,
    },

    #[error("cannot convert '{entity}.{property}': {source}")]
    Convert {
        entity: &'static str,
        property: &'static str,
        #[source]
        source: ScalarError,
    },
}

///
/// MapContext
///
/// Registry handle plus the current recursion depth.
///

pub struct MapContext<'a> {
    registry: &'a MappingRegistry,
    depth: usize,
}

impl<'a> MapContext<'a> {
    #[must_use]
    pub const fn new(registry: &'a MappingRegistry) -> Self {
        Self { registry, depth: 0 }
    }

    #[must_use]
    pub const fn registry(&self) -> &'a MappingRegistry {
        self.registry
    }

    const fn descend(&self) -> Result<Self, MapError> {
        if self.depth >= MAX_MAP_DEPTH {
            return Err(MapError::DepthExceeded {
                limit: MAX_MAP_DEPTH,
            });
        }

        Ok(Self {
            registry: self.registry,
            depth: self.depth + 1,
        })
    }
}

/// Map an entity to its node.
pub fn to_node<E: Entity>(entity: &E, registry: &MappingRegistry) -> Result<Node, MapError> {
    to_node_with(entity, &MapContext::new(registry))
}

/// Map a node back to an entity.
pub fn from_node<E: Entity>(node: &Node, registry: &MappingRegistry) -> Result<E, MapError> {
    from_node_with(node, &MapContext::new(registry))
}

/// Recursion step for [`to_node`]; nested-entity accessors call back into
/// this with the context they were handed.
pub fn to_node_with<E: Entity>(entity: &E, ctx: &MapContext<'_>) -> Result<Node, MapError> {
    let mappings = ctx.registry().mappings_for::<E>();
    let mut node = Node::new(E::NODE_NAME);

    for mapping in &mappings {
        let field = E::field(mapping.property()).ok_or_else(|| MapError::UnknownProperty {
            entity: E::NODE_NAME,
            property: mapping.property().to_string(),
        })?;

        match (mapping.placement(), &field.kind) {
            (Placement::Attribute, FieldKind::Scalar { get, .. }) => {
                node.set_attribute(mapping.mapped_name(), get(entity));
            }

            (Placement::Content, FieldKind::Scalar { get, .. }) => {
                let text = get(entity);
                if !text.is_empty() {
                    node.set_text(text);
                }
            }

            (Placement::Element, FieldKind::Scalar { get, .. }) => {
                let mut child = Node::new(mapping.mapped_name());
                let text = get(entity);
                if !text.is_empty() {
                    child.set_text(text);
                }
                node.push_child(child);
            }

            (Placement::Element, FieldKind::Object { to_node, .. }) => {
                let child_ctx = ctx.descend()?;
                match to_node(entity, &child_ctx)? {
                    Some(child) => node.push_child(child),
                    // absent child object: an empty node under the mapped name
                    None => node.push_child(Node::new(mapping.mapped_name())),
                }
            }

            (Placement::Element, FieldKind::Collection { to_nodes, .. }) => {
                let child_ctx = ctx.descend()?;
                let mut wrapper = Node::new(mapping.mapped_name());
                for item in to_nodes(entity, &child_ctx)? {
                    wrapper.push_child(item);
                }
                node.push_child(wrapper);
            }

            _ => {
                return Err(MapError::PlacementMismatch {
                    entity: E::NODE_NAME,
                    property: mapping.property(),
                });
            }
        }
    }

    Ok(node)
}

/// Recursion step for [`from_node`]. Structural absence is never an
/// error: a missing attribute, child, or wrapper leaves the property at
/// its default value.
pub fn from_node_with<E: Entity>(node: &Node, ctx: &MapContext<'_>) -> Result<E, MapError> {
    let mappings = ctx.registry().mappings_for::<E>();
    let mut entity = E::default();

    for mapping in &mappings {
        let field = E::field(mapping.property()).ok_or_else(|| MapError::UnknownProperty {
            entity: E::NODE_NAME,
            property: mapping.property().to_string(),
        })?;

        let convert = |source| MapError::Convert {
            entity: E::NODE_NAME,
            property: mapping.property(),
            source,
        };

        match (mapping.placement(), &field.kind) {
            (Placement::Attribute, FieldKind::Scalar { set, .. }) => {
                if let Some(text) = node.attribute(mapping.mapped_name()) {
                    set(&mut entity, text).map_err(convert)?;
                }
            }

            (Placement::Content, FieldKind::Scalar { set, .. }) => {
                if let Some(text) = node.text() {
                    set(&mut entity, text).map_err(convert)?;
                }
            }

            (Placement::Element, FieldKind::Scalar { set, .. }) => {
                if let Some(child) = node.child(mapping.mapped_name()) {
                    set(&mut entity, child.text().unwrap_or_default()).map_err(convert)?;
                }
            }

            (
                Placement::Element,
                FieldKind::Object {
                    node_name,
                    from_node,
                    ..
                },
            ) => {
                if let Some(child) = node.child(node_name) {
                    let child_ctx = ctx.descend()?;
                    from_node(&mut entity, child, &child_ctx)?;
                }
            }

            (Placement::Element, FieldKind::Collection { from_nodes, .. }) => {
                if let Some(wrapper) = node.child(mapping.mapped_name()) {
                    let child_ctx = ctx.descend()?;
                    from_nodes(&mut entity, wrapper.children(), &child_ctx)?;
                }
            }

            _ => {
                return Err(MapError::PlacementMismatch {
                    entity: E::NODE_NAME,
                    property: mapping.property(),
                });
            }
        }
    }

    Ok(entity)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        entity::FieldDescriptor,
        mapping::PropertyMapping,
        scalar::{Scalar, Timestamp, Ulid},
        test_fixtures::{Geek, Person},
    };
    use proptest::prelude::*;

    fn sample_person() -> Person {
        Person {
            id: Ulid::from_parts(1_700_000_000_000, 7),
            first_name: "Peter".to_string(),
            last_name: Some("Bucher".to_string()),
            birthday: Timestamp::from_seconds(435_196_800),
            geek: Some(Geek {
                alias: "Jackal".to_string(),
            }),
            geeks: vec![
                Geek {
                    alias: "first".to_string(),
                },
                Geek {
                    alias: "second".to_string(),
                },
            ],
        }
    }

    #[test]
    fn round_trips_nested_object_and_collection() {
        let registry = MappingRegistry::new();
        let person = sample_person();

        let node = to_node(&person, &registry).unwrap();
        let back: Person = from_node(&node, &registry).unwrap();

        assert_eq!(back, person);
        assert_eq!(back.geeks.len(), 2);
        assert_eq!(back.geeks[0].alias, "first");
    }

    #[test]
    fn present_child_object_is_named_by_its_type() {
        let registry = MappingRegistry::new();
        let node = to_node(&sample_person(), &registry).unwrap();

        // the present object child carries the type name, not the property name
        assert!(node.child("Geek").is_some());
        assert!(node.child("geek").is_none());
        // the collection wrapper carries the property name
        let wrapper = node.child("geeks").unwrap();
        assert_eq!(wrapper.children().len(), 2);
        assert!(wrapper.children().iter().all(|item| item.name() == "Geek"));
    }

    #[test]
    fn absent_child_object_writes_an_empty_element_and_reads_back_as_none() {
        let registry = MappingRegistry::new();
        let person = Person {
            geek: None,
            ..sample_person()
        };

        let node = to_node(&person, &registry).unwrap();
        let placeholder = node.child("geek").unwrap();
        assert!(!placeholder.has_children());
        assert!(placeholder.text().is_none());

        let back: Person = from_node(&node, &registry).unwrap();
        assert_eq!(back.geek, None);
    }

    #[test]
    fn absent_scalar_children_leave_defaults() {
        let registry = MappingRegistry::new();
        let node = Node::new("Person");

        let person: Person = from_node(&node, &registry).unwrap();

        assert_eq!(person, Person::default());
    }

    #[test]
    fn attribute_and_content_placements_are_honored() {
        let registry = MappingRegistry::new();
        registry
            .register(
                PropertyMapping::of::<Geek>("alias", crate::mapping::Placement::Attribute, None)
                    .unwrap(),
            )
            .unwrap();

        let geek = Geek {
            alias: "Jackal".to_string(),
        };
        let node = to_node(&geek, &registry).unwrap();

        assert_eq!(node.attribute("alias"), Some("Jackal"));
        assert!(node.child("alias").is_none());

        let back: Geek = from_node(&node, &registry).unwrap();
        assert_eq!(back, geek);
    }

    #[test]
    fn alias_renames_scalar_elements() {
        let registry = MappingRegistry::new();
        registry
            .register(
                PropertyMapping::of::<Geek>(
                    "alias",
                    crate::mapping::Placement::Element,
                    Some("handle"),
                )
                .unwrap(),
            )
            .unwrap();

        let geek = Geek {
            alias: "Jackal".to_string(),
        };
        let node = to_node(&geek, &registry).unwrap();

        assert_eq!(
            node.child("handle").and_then(Node::text),
            Some("Jackal")
        );

        let back: Geek = from_node(&node, &registry).unwrap();
        assert_eq!(back, geek);
    }

    #[test]
    fn content_placement_uses_the_nodes_own_text() {
        let registry = MappingRegistry::new();
        registry
            .register(
                PropertyMapping::of::<Counter>("count", crate::mapping::Placement::Content, None)
                    .unwrap(),
            )
            .unwrap();

        let counter = Counter { count: 5 };
        let node = to_node(&counter, &registry).unwrap();

        assert_eq!(node.text(), Some("5"));
        assert!(node.children().is_empty());

        let back: Counter = from_node(&node, &registry).unwrap();
        assert_eq!(back, counter);
    }

    #[test]
    fn strict_conversion_failures_carry_property_context() {
        let registry = MappingRegistry::new();
        let mut node = Node::new("Person");
        let mut birthday = Node::new("birthday");
        birthday.set_text("soon");
        node.push_child(birthday);

        // birthday is lenient; a bad value degrades to the epoch
        let person: Person = from_node(&node, &registry).unwrap();
        assert_eq!(person.birthday, Timestamp::EPOCH);

        // a strict scalar fails loudly
        let mut geek_node = Node::new("Counter");
        let mut count = Node::new("count");
        count.set_text("many");
        geek_node.push_child(count);

        let err = from_node::<Counter>(&geek_node, &registry).unwrap_err();
        assert!(matches!(
            err,
            MapError::Convert {
                entity: "Counter",
                property: "count",
                ..
            }
        ));
    }

    #[test]
    fn lenient_identifier_degrades_to_nil() {
        let registry = MappingRegistry::new();
        let mut node = Node::new("Person");
        let mut id = Node::new("id");
        id.set_text("definitely-not-a-ulid");
        node.push_child(id);

        let person: Person = from_node(&node, &registry).unwrap();
        assert_eq!(person.id, Ulid::nil());
    }

    #[test]
    fn depth_limit_stops_runaway_recursion() {
        let registry = MappingRegistry::new();

        let mut chain = Chain::default();
        for _ in 0..(MAX_MAP_DEPTH + 4) {
            chain = Chain {
                next: Some(Box::new(chain)),
            };
        }

        let err = to_node(&chain, &registry).unwrap_err();
        assert!(matches!(err, MapError::DepthExceeded { .. }));
    }

    proptest! {
        #[test]
        fn round_trip_holds_for_arbitrary_scalars(
            first in "[ -~]{0,24}",
            last in prop::option::of("[a-zA-Z0-9 ]{1,16}"),
            secs in any::<u64>(),
            random in any::<u128>(),
        ) {
            let registry = MappingRegistry::new();
            let person = Person {
                id: Ulid::from_parts(1_000, random),
                first_name: first,
                last_name: last,
                birthday: Timestamp::from_seconds(secs),
                geek: None,
                geeks: Vec::new(),
            };

            let node = to_node(&person, &registry).unwrap();
            let back: Person = from_node(&node, &registry).unwrap();

            prop_assert_eq!(back, person);
        }
    }

    ///
    /// Chain
    /// Hand-written self-referential entity for the depth-guard test.
    ///

    #[derive(Default)]
    struct Chain {
        next: Option<Box<Chain>>,
    }

    impl Entity for Chain {
        const NODE_NAME: &'static str = "Chain";
        const FIELDS: &'static [FieldDescriptor<Self>] = &[FieldDescriptor {
            name: "next",
            kind: FieldKind::Object {
                node_name: "Chain",
                to_node: |chain, ctx| {
                    chain
                        .next
                        .as_deref()
                        .map(|next| to_node_with(next, ctx))
                        .transpose()
                },
                from_node: |chain, node, ctx| {
                    chain.next = Some(Box::new(from_node_with(node, ctx)?));
                    Ok(())
                },
            },
        }];
    }

    ///
    /// Counter
    /// Hand-written entity with a strict scalar.
    ///

    #[derive(Debug, Default, PartialEq)]
    struct Counter {
        count: u32,
    }

    impl Entity for Counter {
        const NODE_NAME: &'static str = "Counter";
        const FIELDS: &'static [FieldDescriptor<Self>] = &[FieldDescriptor {
            name: "count",
            kind: FieldKind::Scalar {
                get: |counter| Scalar::render(&counter.count),
                set: |counter, text| {
                    counter.count = Scalar::parse_or_default(text)?;
                    Ok(())
                },
            },
        }];
    }
}
