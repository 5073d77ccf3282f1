// mod.rs - Component storage
//
// One SparseSet per registered component type. The registry only talks to
// stores through the ErasedStore capability interface; typed access goes
// through a downcast to the concrete SparseSet<T>.

mod sparse_set;

pub use sparse_set::{RawColumn, SparseSet};

use crate::ecs::EntityIndex;
use std::any::Any;
use thiserror::Error;

/// Storage-level failures. The world maps these onto [`EcsError`]
/// variants that carry the entity handle and component name.
///
/// [`EcsError`]: crate::ecs::EcsError
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("slot for entity index {index} is already occupied")]
    Occupied { index: EntityIndex },

    #[error("no component stored for entity index {index}")]
    Vacant { index: EntityIndex },

    #[error("sparse array cannot grow to hold entity index {index}")]
    CapacityExceeded { index: EntityIndex },
}

/// Non-generic view of a component store.
///
/// This is what the entity registry needs on destroy and what the query
/// engine needs to pick a driving set, without knowing the payload type.
pub trait ErasedStore: Any + Send + Sync {
    /// Remove the component owned by `index`, if any. Returns whether
    /// something was removed.
    fn remove_if_present(&mut self, index: EntityIndex) -> bool;

    fn contains(&self, index: EntityIndex) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Owning entity index of every dense slot, in dense order.
    fn owners(&self) -> &[EntityIndex];

    fn clear(&mut self);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
