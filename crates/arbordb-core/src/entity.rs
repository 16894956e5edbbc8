//! Typed field-descriptor tables.
//!
//! Instead of runtime reflection, every persistable type carries a static
//! table describing its fields: how to render and assign scalar leaves, and
//! how to recurse into nested entities and collections. The table is what
//! the mapping registry derives default mappings from and what the mapper
//! dispatches through. `#[derive(Entity)]` generates it.

use crate::{
    mapper::{MapContext, MapError},
    mapping::ValueKind,
    node::Node,
    scalar::ScalarError,
};

///
/// Entity
///
/// A plain data type the repository can persist. `Default` supplies the
/// zero-initialized instance deserialization starts from.
///

pub trait Entity: Default + 'static {
    /// The type's simple name; doubles as its node name in the tree.
    const NODE_NAME: &'static str;

    /// Field descriptors in declaration order.
    const FIELDS: &'static [FieldDescriptor<Self>];

    /// Rendered text of a scalar field, by property name.
    ///
    /// Returns `None` for unknown properties and for object/collection
    /// fields, which have no single text rendering.
    #[must_use]
    fn scalar_text(&self, property: &str) -> Option<String> {
        Self::FIELDS.iter().find_map(|field| match &field.kind {
            FieldKind::Scalar { get, .. } if field.name == property => Some(get(self)),
            _ => None,
        })
    }

    /// Descriptor for one property, by name.
    #[must_use]
    fn field(property: &str) -> Option<&'static FieldDescriptor<Self>> {
        Self::FIELDS.iter().find(|field| field.name == property)
    }
}

///
/// FieldDescriptor
///

pub struct FieldDescriptor<E: 'static> {
    pub name: &'static str,
    pub kind: FieldKind<E>,
}

///
/// FieldKind
///
/// Accessors are plain fn pointers so the whole table can live in a
/// `const`.
///

pub enum FieldKind<E: 'static> {
    /// A leaf value converted through `Scalar`.
    Scalar {
        get: fn(&E) -> String,
        set: fn(&mut E, &str) -> Result<(), ScalarError>,
    },

    /// A nested entity. `to_node` yields `None` for an absent value.
    Object {
        node_name: &'static str,
        to_node: fn(&E, &MapContext<'_>) -> Result<Option<Node>, MapError>,
        from_node: fn(&mut E, &Node, &MapContext<'_>) -> Result<(), MapError>,
    },

    /// A homogeneous sequence of nested entities.
    Collection {
        item_node_name: &'static str,
        to_nodes: fn(&E, &MapContext<'_>) -> Result<Vec<Node>, MapError>,
        from_nodes: fn(&mut E, &[Node], &MapContext<'_>) -> Result<(), MapError>,
    },
}

impl<E> FieldKind<E> {
    /// Collapse the accessor shape to the mapping-model value kind.
    #[must_use]
    pub const fn value_kind(&self) -> ValueKind {
        match self {
            Self::Scalar { .. } => ValueKind::Scalar,
            Self::Object { .. } => ValueKind::Object,
            Self::Collection { .. } => ValueKind::Collection,
        }
    }
}
