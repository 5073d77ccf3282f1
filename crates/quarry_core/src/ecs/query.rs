//! Multi-component queries
//!
//! A query names a tuple of component types, `(A,)` up to eight elements.
//! Running it resolves each type to its store, picks the smallest store as
//! the driving set, snapshots that store's owner array and keeps the entity
//! indices present in every other store. The world then hands each match to
//! the caller's callback together with `&mut` references to its components.
//!
//! Iteration order is the driving store's dense order at call time. It is
//! not stable across frames because removals swap values around.

use crate::ecs::storage::{ErasedStore, RawColumn};
use crate::ecs::{Component, ComponentId, ComponentRegistry, EcsError, EntityIndex, Result};

/// A tuple of component types that can be iterated together.
///
/// Implemented for `(A,)` through `(A, B, C, D, E, F, G, H)`.
pub trait Query {
    /// Raw per-store views captured once per query.
    type Fetch: Copy + Send + Sync;

    /// What the callback receives for one entity.
    type Item<'q>;

    /// Component ids in declaration order.
    fn component_ids(registry: &ComponentRegistry) -> Result<Vec<ComponentId>>;

    fn fetch(registry: &mut ComponentRegistry) -> Result<Self::Fetch>;

    /// # Safety
    /// `index` must be present in every fetched store, the stores must not
    /// have been structurally modified since `fetch`, and no other live
    /// reference to this entity's components may exist.
    unsafe fn item<'q>(fetch: &Self::Fetch, index: EntityIndex) -> Self::Item<'q>;
}

macro_rules! impl_query {
    ($($name:ident),+) => {
        impl<$($name: Component),+> Query for ($($name,)+) {
            type Fetch = ($(RawColumn<$name>,)+);
            type Item<'q> = ($(&'q mut $name,)+);

            fn component_ids(registry: &ComponentRegistry) -> Result<Vec<ComponentId>> {
                Ok(vec![$(registry.id_of::<$name>()?),+])
            }

            fn fetch(registry: &mut ComponentRegistry) -> Result<Self::Fetch> {
                Ok(($(registry.store_mut::<$name>()?.raw_column(),)+))
            }

            #[allow(non_snake_case)]
            unsafe fn item<'q>(fetch: &Self::Fetch, index: EntityIndex) -> Self::Item<'q> {
                let ($($name,)+) = fetch;
                // SAFETY: forwarded to the caller; the types are pairwise
                // distinct (checked by QueryPlan), so no two items alias.
                unsafe { ($($name.get(index),)+) }
            }
        }
    };
}

impl_query!(A);
impl_query!(A, B);
impl_query!(A, B, C);
impl_query!(A, B, C, D);
impl_query!(A, B, C, D, E);
impl_query!(A, B, C, D, E, F);
impl_query!(A, B, C, D, E, F, G);
impl_query!(A, B, C, D, E, F, G, H);

/// The resolved shape of one query call: which stores it touches, which of
/// them are tags, and the snapshot of matching entity indices.
pub(crate) struct QueryPlan {
    tags: Vec<ComponentId>,
    driving: ComponentId,
    matches: Vec<EntityIndex>,
}

impl QueryPlan {
    pub(crate) fn build<Q: Query>(registry: &ComponentRegistry) -> Result<Self> {
        let ids = Q::component_ids(registry)?;
        for (position, id) in ids.iter().enumerate() {
            if ids[..position].contains(id) {
                return Err(EcsError::ConflictingAccess {
                    component: component_name(registry, *id),
                });
            }
        }

        let stores: Vec<(ComponentId, &dyn ErasedStore)> = ids
            .iter()
            .filter_map(|&id| registry.erased(id).map(|store| (id, store)))
            .collect();
        debug_assert_eq!(stores.len(), ids.len());

        let (driving, driving_store) = match stores.iter().min_by_key(|(_, store)| store.len()) {
            Some(&(id, store)) => (id, store),
            None => {
                return Ok(Self {
                    tags: Vec::new(),
                    driving: ComponentId::MAX,
                    matches: Vec::new(),
                })
            }
        };

        let matches: Vec<EntityIndex> = driving_store
            .owners()
            .iter()
            .copied()
            .filter(|&index| {
                stores
                    .iter()
                    .all(|&(id, store)| id == driving || store.contains(index))
            })
            .collect();

        let tags = ids
            .iter()
            .copied()
            .filter(|&id| registry.info(id).is_some_and(|info| info.tag))
            .collect();

        tracing::trace!(
            width = ids.len(),
            driving = component_name(registry, driving),
            candidates = driving_store.len(),
            matched = matches.len(),
            "query planned"
        );

        Ok(Self {
            tags,
            driving,
            matches,
        })
    }

    pub(crate) fn matches(&self) -> &[EntityIndex] {
        &self.matches
    }

    pub(crate) fn tags(&self) -> &[ComponentId] {
        &self.tags
    }

    pub(crate) fn driving(&self) -> ComponentId {
        self.driving
    }

    pub(crate) fn len(&self) -> usize {
        self.matches.len()
    }
}

fn component_name(registry: &ComponentRegistry, id: ComponentId) -> &'static str {
    registry.info(id).map(|info| info.name).unwrap_or("<unknown>")
}
