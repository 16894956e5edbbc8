//! Derive macro generating the static field-descriptor table every
//! persistable type carries.

use proc_macro::TokenStream;

mod entity;

/// Derive `Entity` for a struct with named fields.
///
/// Fields are scalars by default and convert through `Scalar`. A field
/// holding a nested entity (or a collection of them) is marked
/// `#[entity(child)]`; `Vec<T>`, `Option<T>`, `Option<Box<T>>`, `Box<T>`,
/// and plain `T` shapes are recognized.
#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    entity::derive_entity(input.into()).into()
}
