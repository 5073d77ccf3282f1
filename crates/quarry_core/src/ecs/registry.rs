// registry.rs - Runtime component type registry
//
// Maps a Rust TypeId to the dense ComponentId handed out by
// `register`, and owns one type-erased store per registered type.

use crate::ecs::storage::{ErasedStore, SparseSet};
use crate::ecs::{Component, ComponentId, ComponentInfo, EcsError, EntityIndex, Result};
use std::any::TypeId;
use std::collections::HashMap;
use std::mem::size_of;

/// Per-world component registry. Ids are assigned in registration order
/// and are only meaningful within the world that assigned them.
#[derive(Default)]
pub struct ComponentRegistry {
    ids: HashMap<TypeId, ComponentId>,
    infos: Vec<ComponentInfo>,
    stores: Vec<Box<dyn ErasedStore>>,
    initial_capacity: usize,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores created by this registry pre-size their dense arrays.
    pub fn with_initial_capacity(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            ..Self::default()
        }
    }

    /// Check that `T` could be registered without registering it.
    pub fn can_register<T: Component>(&self) -> Result<()> {
        if self.ids.contains_key(&TypeId::of::<T>()) {
            return Err(EcsError::DuplicateRegistration { name: T::name() });
        }
        if T::TAG && size_of::<T>() != 0 {
            return Err(EcsError::NonZeroSizedTag {
                name: T::name(),
                size: size_of::<T>(),
            });
        }
        Ok(())
    }

    /// Assign `T` the next id and create its store.
    pub fn register<T: Component>(&mut self) -> Result<ComponentId> {
        self.can_register::<T>()?;

        let id = self.infos.len() as ComponentId;
        let info = ComponentInfo::of::<T>(id);
        tracing::debug!(component = info.name, id, tag = info.tag, "registered component");

        self.ids.insert(TypeId::of::<T>(), id);
        self.infos.push(info);
        self.stores
            .push(Box::new(SparseSet::<T>::with_capacity(self.initial_capacity)));
        Ok(id)
    }

    #[inline]
    pub fn id_of<T: Component>(&self) -> Result<ComponentId> {
        self.ids
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(EcsError::UnregisteredComponent { name: T::name() })
    }

    pub fn is_registered<T: Component>(&self) -> bool {
        self.ids.contains_key(&TypeId::of::<T>())
    }

    pub fn info(&self, id: ComponentId) -> Option<&ComponentInfo> {
        self.infos.get(id as usize)
    }

    pub fn infos(&self) -> &[ComponentInfo] {
        &self.infos
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn store<T: Component>(&self) -> Result<&SparseSet<T>> {
        let id = self.id_of::<T>()?;
        self.stores[id as usize]
            .as_any()
            .downcast_ref::<SparseSet<T>>()
            .ok_or(EcsError::UnregisteredComponent { name: T::name() })
    }

    pub fn store_mut<T: Component>(&mut self) -> Result<&mut SparseSet<T>> {
        let id = self.id_of::<T>()?;
        self.stores[id as usize]
            .as_any_mut()
            .downcast_mut::<SparseSet<T>>()
            .ok_or(EcsError::UnregisteredComponent { name: T::name() })
    }

    /// Type-erased store for an id handed out by this registry.
    pub fn erased(&self, id: ComponentId) -> Option<&dyn ErasedStore> {
        self.stores.get(id as usize).map(|store| store.as_ref())
    }

    pub fn erased_mut(&mut self, id: ComponentId) -> Option<&mut dyn ErasedStore> {
        match self.stores.get_mut(id as usize) {
            Some(store) => Some(store.as_mut()),
            None => None,
        }
    }

    /// Remove whatever `index` owns from every store. Returns how many
    /// components were dropped.
    pub fn remove_all(&mut self, index: EntityIndex) -> usize {
        self.stores
            .iter_mut()
            .filter_map(|store| store.remove_if_present(index).then_some(()))
            .count()
    }

    /// Drop every component of every type; registrations survive.
    pub fn clear_stores(&mut self) {
        for store in &mut self.stores {
            store.clear();
        }
    }
}
