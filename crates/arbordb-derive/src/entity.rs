use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    Data, DeriveInput, Error, Field, Fields, GenericArgument, PathArguments, Result, Type,
};

// derive_entity
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    let ident = &input.ident;

    if !input.generics.params.is_empty() {
        let err = Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic types",
        );
        return err.to_compile_error();
    }

    let fields = if let Data::Struct(data) = &input.data {
        if let Fields::Named(named) = &data.fields {
            &named.named
        } else {
            let err = Error::new_spanned(
                &data.fields,
                "Entity can only be derived for structs with named fields",
            );
            return err.to_compile_error();
        }
    } else {
        let err = Error::new_spanned(
            &input.ident,
            "Entity can only be derived for structs with named fields",
        );
        return err.to_compile_error();
    };

    let mut descriptors = Vec::with_capacity(fields.len());
    for field in fields {
        match field_descriptor(field) {
            Ok(descriptor) => descriptors.push(descriptor),
            Err(err) => return err.to_compile_error(),
        }
    }

    let node_name = ident.to_string();

    quote! {
        impl ::arbordb::entity::Entity for #ident {
            const NODE_NAME: &'static str = #node_name;

            const FIELDS: &'static [::arbordb::entity::FieldDescriptor<Self>] = &[
                #(#descriptors),*
            ];
        }
    }
}

/// Shape of a `#[entity(child)]` field, recognized syntactically.
enum ChildShape {
    Bare(Type),
    Boxed(Type),
    Nullable(Type),
    NullableBoxed(Type),
    Collection(Type),
}

fn field_descriptor(field: &Field) -> Result<TokenStream> {
    let ident = field.ident.as_ref().expect("named field");
    let name = ident.to_string();

    if !is_child(field)? {
        return Ok(quote! {
            ::arbordb::entity::FieldDescriptor {
                name: #name,
                kind: ::arbordb::entity::FieldKind::Scalar {
                    get: |entity| ::arbordb::scalar::Scalar::render(&entity.#ident),
                    set: |entity, text| {
                        entity.#ident = ::arbordb::scalar::Scalar::parse_or_default(text)?;
                        Ok(())
                    },
                },
            }
        });
    }

    let descriptor = match child_shape(&field.ty) {
        ChildShape::Collection(item) => quote! {
            ::arbordb::entity::FieldDescriptor {
                name: #name,
                kind: ::arbordb::entity::FieldKind::Collection {
                    item_node_name: <#item as ::arbordb::entity::Entity>::NODE_NAME,
                    to_nodes: |entity, ctx| {
                        entity.#ident
                            .iter()
                            .map(|item| ::arbordb::mapper::to_node_with(item, ctx))
                            .collect()
                    },
                    from_nodes: |entity, nodes, ctx| {
                        entity.#ident = nodes
                            .iter()
                            .map(|node| ::arbordb::mapper::from_node_with(node, ctx))
                            .collect::<Result<_, _>>()?;
                        Ok(())
                    },
                },
            }
        },

        ChildShape::Nullable(item) => quote! {
            ::arbordb::entity::FieldDescriptor {
                name: #name,
                kind: ::arbordb::entity::FieldKind::Object {
                    node_name: <#item as ::arbordb::entity::Entity>::NODE_NAME,
                    to_node: |entity, ctx| match entity.#ident.as_ref() {
                        Some(value) => Ok(Some(::arbordb::mapper::to_node_with(value, ctx)?)),
                        None => Ok(None),
                    },
                    from_node: |entity, node, ctx| {
                        entity.#ident = Some(::arbordb::mapper::from_node_with(node, ctx)?);
                        Ok(())
                    },
                },
            }
        },

        ChildShape::NullableBoxed(item) => quote! {
            ::arbordb::entity::FieldDescriptor {
                name: #name,
                kind: ::arbordb::entity::FieldKind::Object {
                    node_name: <#item as ::arbordb::entity::Entity>::NODE_NAME,
                    to_node: |entity, ctx| match entity.#ident.as_deref() {
                        Some(value) => Ok(Some(::arbordb::mapper::to_node_with(value, ctx)?)),
                        None => Ok(None),
                    },
                    from_node: |entity, node, ctx| {
                        entity.#ident = Some(::std::boxed::Box::new(
                            ::arbordb::mapper::from_node_with(node, ctx)?,
                        ));
                        Ok(())
                    },
                },
            }
        },

        ChildShape::Boxed(item) => quote! {
            ::arbordb::entity::FieldDescriptor {
                name: #name,
                kind: ::arbordb::entity::FieldKind::Object {
                    node_name: <#item as ::arbordb::entity::Entity>::NODE_NAME,
                    to_node: |entity, ctx| {
                        Ok(Some(::arbordb::mapper::to_node_with(&*entity.#ident, ctx)?))
                    },
                    from_node: |entity, node, ctx| {
                        entity.#ident = ::std::boxed::Box::new(
                            ::arbordb::mapper::from_node_with(node, ctx)?,
                        );
                        Ok(())
                    },
                },
            }
        },

        ChildShape::Bare(item) => quote! {
            ::arbordb::entity::FieldDescriptor {
                name: #name,
                kind: ::arbordb::entity::FieldKind::Object {
                    node_name: <#item as ::arbordb::entity::Entity>::NODE_NAME,
                    to_node: |entity, ctx| {
                        Ok(Some(::arbordb::mapper::to_node_with(&entity.#ident, ctx)?))
                    },
                    from_node: |entity, node, ctx| {
                        entity.#ident = ::arbordb::mapper::from_node_with(node, ctx)?;
                        Ok(())
                    },
                },
            }
        },
    };

    Ok(descriptor)
}

/// Whether the field carries `#[entity(child)]`.
fn is_child(field: &Field) -> Result<bool> {
    for attr in &field.attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }

        let marker: syn::Ident = attr.parse_args()?;
        if marker == "child" {
            return Ok(true);
        }

        return Err(Error::new_spanned(
            attr,
            "unsupported entity attribute; expected #[entity(child)]",
        ));
    }

    Ok(false)
}

fn child_shape(ty: &Type) -> ChildShape {
    match wrapper_of(ty) {
        Some(("Vec", item)) => ChildShape::Collection(item.clone()),
        Some(("Box", item)) => ChildShape::Boxed(item.clone()),
        Some(("Option", item)) => match wrapper_of(item) {
            Some(("Box", inner)) => ChildShape::NullableBoxed(inner.clone()),
            _ => ChildShape::Nullable(item.clone()),
        },
        _ => ChildShape::Bare(ty.clone()),
    }
}

/// `Wrapper<T>` with a single type argument, as `("Wrapper", T)`.
fn wrapper_of(ty: &Type) -> Option<(&'static str, &Type)> {
    let Type::Path(path) = ty else {
        return None;
    };

    let segment = path.path.segments.last()?;
    let wrapper = ["Vec", "Option", "Box"]
        .into_iter()
        .find(|wrapper| segment.ident == *wrapper)?;

    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };

    if arguments.args.len() != 1 {
        return None;
    }

    match arguments.args.first()? {
        GenericArgument::Type(item) => Some((wrapper, item)),
        _ => None,
    }
}
