//! The transactional in-memory repository.
//!
//! A repository owns one tree of mapped entity nodes, loaded from its
//! provider at construction and written back on `submit_changes`. Writes
//! mutate only the in-memory tree and set the dirty flag; `discard_changes`
//! reloads from the provider and drops anything unsubmitted. A change
//! notification from the provider triggers the same reload: last writer
//! wins, and an uncommitted in-memory change lost to a concurrent reload
//! is logged, not surfaced as an error.

use crate::{
    entity::{Entity, FieldKind},
    error::Error,
    mapper,
    mapping::{MappingRegistry, Placement, PropertyMapping},
    node::Node,
    provider::Provider,
    scalar::Scalar,
    serialize::Serializer,
    sync::lock,
};
use std::{
    marker::PhantomData,
    sync::{
        Arc, Mutex, Weak,
        atomic::{AtomicU64, Ordering},
    },
};
use thiserror::Error as ThisError;

///
/// ConfigError
///
/// Fatal construction-time misconfiguration.
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("identity property '{property}' not found on entity '{entity}'")]
    IdentityNotFound {
        entity: &'static str,
        property: String,
    },

    #[error("identity property '{property}' on entity '{entity}' is not a scalar")]
    IdentityNotScalar {
        entity: &'static str,
        property: String,
    },
}

///
/// EntityNotFoundError
///
/// A uniqueness-expecting operation found zero or more than one match.
///

#[derive(Debug, ThisError)]
#[error("expected exactly one matching '{entity}' entity, found {matches}")]
pub struct EntityNotFoundError {
    pub entity: &'static str,
    pub matches: usize,
}

///
/// State
///

struct State {
    root: Node,
    dirty: bool,
}

///
/// Repository
///
/// Typed over the entity and the identity property's value type. All
/// operations are linearized by the instance lock; dropping the last
/// handle commits pending changes.
///

pub struct Repository<E: Entity, I: Scalar> {
    query_property: &'static str,
    identity_text: fn(&E) -> String,
    registry: Mutex<Arc<MappingRegistry>>,
    provider: Mutex<Arc<dyn Provider>>,
    serializer: Arc<dyn Serializer>,
    state: Mutex<State>,
    // bumped when the provider is swapped so stale change subscriptions
    // stop reloading this instance
    subscription: AtomicU64,
    _marker: PhantomData<fn() -> (E, I)>,
}

impl<E: Entity, I: Scalar> Repository<E, I> {
    /// Open a repository: validate the identity property, perform the
    /// initial load, and subscribe to the provider's change events.
    pub fn open(
        query_property: &str,
        registry: Arc<MappingRegistry>,
        provider: Arc<dyn Provider>,
        serializer: Arc<dyn Serializer>,
    ) -> Result<Arc<Self>, Error> {
        let field = E::field(query_property).ok_or_else(|| ConfigError::IdentityNotFound {
            entity: E::NODE_NAME,
            property: query_property.to_string(),
        })?;

        let FieldKind::Scalar { get, .. } = &field.kind else {
            return Err(ConfigError::IdentityNotScalar {
                entity: E::NODE_NAME,
                property: query_property.to_string(),
            }
            .into());
        };

        let repository = Arc::new(Self {
            query_property: field.name,
            identity_text: *get,
            registry: Mutex::new(registry),
            provider: Mutex::new(provider),
            serializer,
            state: Mutex::new(State {
                root: Node::root(),
                dirty: false,
            }),
            subscription: AtomicU64::new(0),
            _marker: PhantomData,
        });

        repository.discard_changes()?;
        repository.attach_to_provider();

        Ok(repository)
    }

    /// Name of the identity property queries and upserts key on.
    #[must_use]
    pub const fn query_property(&self) -> &'static str {
        self.query_property
    }

    /// Whether the in-memory tree has unsubmitted changes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        lock(&self.state).dirty
    }

    // ======================================================================
    // Queries
    // ======================================================================

    /// Load the entity with the given identity value. Exactly one match is
    /// required.
    pub fn load(&self, identity: &I) -> Result<E, Error> {
        let registry = lock(&self.registry).clone();
        let mapping = self.identity_mapping(&registry)?;
        let rendered = identity.render();

        let state = lock(&self.state);
        let matches: Vec<&Node> = state
            .root
            .children()
            .iter()
            .filter(|node| node_matches(node, &mapping, &rendered))
            .collect();

        if let [node] = matches.as_slice() {
            Ok(mapper::from_node::<E>(node, &registry)?)
        } else {
            Err(EntityNotFoundError {
                entity: E::NODE_NAME,
                matches: matches.len(),
            }
            .into())
        }
    }

    /// Load the entity matching the predicate. Exactly one match is
    /// required.
    pub fn load_by(&self, predicate: impl Fn(&E) -> bool) -> Result<E, Error> {
        let mut matches: Vec<E> = self
            .load_all()?
            .into_iter()
            .filter(|entity| predicate(entity))
            .collect();

        if matches.len() == 1 {
            Ok(matches.remove(0))
        } else {
            Err(EntityNotFoundError {
                entity: E::NODE_NAME,
                matches: matches.len(),
            }
            .into())
        }
    }

    /// Load every entity. An empty repository yields an empty list.
    pub fn load_all(&self) -> Result<Vec<E>, Error> {
        let registry = lock(&self.registry).clone();
        let state = lock(&self.state);

        state
            .root
            .children()
            .iter()
            .map(|node| mapper::from_node::<E>(node, &registry))
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    /// Load every entity matching the predicate.
    pub fn load_all_by(&self, predicate: impl Fn(&E) -> bool) -> Result<Vec<E>, Error> {
        Ok(self
            .load_all()?
            .into_iter()
            .filter(|entity| predicate(entity))
            .collect())
    }

    /// Load every entity with the given identity value. Zero matches is
    /// not an error.
    pub fn load_all_with(&self, identity: &I) -> Result<Vec<E>, Error> {
        let registry = lock(&self.registry).clone();
        let mapping = self.identity_mapping(&registry)?;
        let rendered = identity.render();

        let state = lock(&self.state);
        state
            .root
            .children()
            .iter()
            .filter(|node| node_matches(node, &mapping, &rendered))
            .map(|node| mapper::from_node::<E>(node, &registry))
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // ======================================================================
    // Writes
    // ======================================================================

    /// Upsert: remove any node with the entity's identity value, then
    /// append the freshly mapped node. Node order is not stable across
    /// updates.
    pub fn save_on_submit(&self, entity: &E) -> Result<(), Error> {
        let registry = lock(&self.registry).clone();
        let mapping = self.identity_mapping(&registry)?;
        let rendered = (self.identity_text)(entity);
        let node = mapper::to_node(entity, &registry)?;

        let mut state = lock(&self.state);
        state
            .root
            .retain_children(|child| !node_matches(child, &mapping, &rendered));
        state.root.push_child(node);
        state.dirty = true;

        Ok(())
    }

    /// Sequential upsert of several entities. Not atomic: a failure leaves
    /// the upserts before it applied.
    pub fn save_all_on_submit<'a>(
        &self,
        entities: impl IntoIterator<Item = &'a E>,
    ) -> Result<(), Error> {
        for entity in entities {
            self.save_on_submit(entity)?;
        }

        Ok(())
    }

    /// Delete by identity value. Zero matches is an error; several matches
    /// are all removed.
    pub fn delete_on_submit(&self, identity: &I) -> Result<(), Error> {
        let registry = lock(&self.registry).clone();
        let mapping = self.identity_mapping(&registry)?;
        let rendered = identity.render();

        let mut state = lock(&self.state);
        let removed = state
            .root
            .retain_children(|child| !node_matches(child, &mapping, &rendered));

        if removed == 0 {
            return Err(EntityNotFoundError {
                entity: E::NODE_NAME,
                matches: 0,
            }
            .into());
        }

        state.dirty = true;

        Ok(())
    }

    /// Delete every entity matching the predicate. Zero matches is not an
    /// error. A conversion failure deletes nothing.
    pub fn delete_on_submit_by(&self, predicate: impl Fn(&E) -> bool) -> Result<(), Error> {
        let registry = lock(&self.registry).clone();

        let mut state = lock(&self.state);
        let keep: Vec<bool> = state
            .root
            .children()
            .iter()
            .map(|child| {
                mapper::from_node::<E>(child, &registry).map(|entity| !predicate(&entity))
            })
            .collect::<Result<_, _>>()?;

        let mut keep = keep.into_iter();
        state.root.retain_children(|_| keep.next().unwrap_or(true));
        state.dirty = true;

        Ok(())
    }

    /// Delete every entity.
    pub fn delete_all_on_submit(&self) {
        let mut state = lock(&self.state);
        state.root.clear_children();
        state.dirty = true;
    }

    // ======================================================================
    // Transaction boundary
    // ======================================================================

    /// Serialize the tree and hand it to the provider. No-op when clean.
    pub fn submit_changes(&self) -> Result<(), Error> {
        let provider = lock(&self.provider).clone();
        let mut state = lock(&self.state);

        if !state.dirty {
            return Ok(());
        }

        let text = self.serializer.serialize(&state.root)?;
        provider.save(E::NODE_NAME, &text)?;
        state.dirty = false;

        tracing::debug!(entity = E::NODE_NAME, "changes submitted");

        Ok(())
    }

    /// Reload the tree from the provider, dropping unsubmitted changes.
    /// Blank provider text is an empty root.
    pub fn discard_changes(&self) -> Result<(), Error> {
        let provider = lock(&self.provider).clone();
        let text = provider.load(E::NODE_NAME)?;

        let root = if text.trim().is_empty() {
            Node::root()
        } else {
            self.serializer.deserialize(&text)?
        };

        let mut state = lock(&self.state);
        if state.dirty {
            tracing::warn!(
                entity = E::NODE_NAME,
                "discarding uncommitted in-memory changes"
            );
        }
        state.root = root;
        state.dirty = false;

        Ok(())
    }

    /// Clone of the current in-memory tree.
    #[must_use]
    pub fn snapshot(&self) -> Node {
        lock(&self.state).root.clone()
    }

    // ======================================================================
    // Cache plumbing
    // ======================================================================

    pub(crate) fn registry_handle(&self) -> Arc<MappingRegistry> {
        lock(&self.registry).clone()
    }

    pub(crate) fn provider_handle(&self) -> Arc<dyn Provider> {
        lock(&self.provider).clone()
    }

    pub(crate) fn replace_provider(self: &Arc<Self>, provider: Arc<dyn Provider>) {
        self.subscription.fetch_add(1, Ordering::SeqCst);
        *lock(&self.provider) = provider;
        self.attach_to_provider();
    }

    pub(crate) fn replace_registry(&self, registry: Arc<MappingRegistry>) {
        *lock(&self.registry) = registry;
    }

    // ======================================================================
    // Internals
    // ======================================================================

    fn identity_mapping(&self, registry: &MappingRegistry) -> Result<PropertyMapping, Error> {
        registry
            .mappings_for::<E>()
            .into_iter()
            .find(|mapping| mapping.property() == self.query_property)
            .ok_or_else(|| {
                ConfigError::IdentityNotFound {
                    entity: E::NODE_NAME,
                    property: self.query_property.to_string(),
                }
                .into()
            })
    }

    fn attach_to_provider(self: &Arc<Self>) {
        let generation = self.subscription.load(Ordering::SeqCst);
        let weak: Weak<Self> = Arc::downgrade(self);
        let provider = lock(&self.provider).clone();

        provider.subscribe(Box::new(move |entity_name| {
            if entity_name != E::NODE_NAME {
                return;
            }

            let Some(repository) = weak.upgrade() else {
                return;
            };
            if repository.subscription.load(Ordering::SeqCst) != generation {
                // the provider this subscription belongs to was swapped out
                return;
            }

            if let Err(err) = repository.discard_changes() {
                tracing::warn!(
                    entity = E::NODE_NAME,
                    "reload after data source change failed: {err}"
                );
            }
        }));
    }
}

impl<E: Entity, I: Scalar> Drop for Repository<E, I> {
    fn drop(&mut self) {
        if let Err(err) = self.submit_changes() {
            tracing::warn!(entity = E::NODE_NAME, "commit on drop failed: {err}");
        }
    }
}

/// Placement-aware identity comparison: the rendered identity value
/// against the text stored wherever the identity property is placed.
fn node_matches(node: &Node, mapping: &PropertyMapping, rendered: &str) -> bool {
    match mapping.placement() {
        Placement::Attribute => node.attribute(mapping.mapped_name()) == Some(rendered),
        Placement::Element => node
            .child(mapping.mapped_name())
            .map(|child| child.text().unwrap_or_default())
            == Some(rendered),
        Placement::Content => node.text().unwrap_or_default() == rendered,
    }
}

///
/// TESTS
///
