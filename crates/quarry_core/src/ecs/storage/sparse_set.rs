// sparse_set.rs - Dense component storage keyed by entity index
//
// sparse[index] -> dense slot (or EMPTY)
// dense[slot]   -> component value, no holes
// owners[slot]  -> entity index owning that value

use super::{ErasedStore, StoreError};
use crate::ecs::{Component, EntityIndex};
use std::any::Any;
use std::marker::PhantomData;

const EMPTY: u32 = u32::MAX;

/// Sparse set storage for one component type.
///
/// Insert, remove and lookup are O(1); removal swaps the last value into the
/// vacated slot, so dense order is not stable across removals.
pub struct SparseSet<T> {
    sparse: Vec<u32>,
    dense: Vec<T>,
    owners: Vec<EntityIndex>,
}

impl<T> SparseSet<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Pre-size the dense arrays for `capacity` components.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::with_capacity(capacity),
            owners: Vec::with_capacity(capacity),
        }
    }

    /// Attach `value` to `index`. Fails if `index` already owns a value.
    pub fn insert(&mut self, index: EntityIndex, value: T) -> Result<(), StoreError> {
        let i = index as usize;
        if i >= self.sparse.len() {
            let grow = i + 1 - self.sparse.len();
            self.sparse
                .try_reserve(grow)
                .map_err(|_| StoreError::CapacityExceeded { index })?;
            self.sparse.resize(i + 1, EMPTY);
        } else if self.sparse[i] != EMPTY {
            return Err(StoreError::Occupied { index });
        }

        self.sparse[i] = self.dense.len() as u32;
        self.dense.push(value);
        self.owners.push(index);
        Ok(())
    }

    /// Detach and return the value owned by `index` (swap-and-pop).
    pub fn remove(&mut self, index: EntityIndex) -> Result<T, StoreError> {
        let slot = self.slot(index).ok_or(StoreError::Vacant { index })?;
        let last = self.dense.len() - 1;

        self.dense.swap(slot, last);
        self.owners.swap(slot, last);
        if slot != last {
            let moved = self.owners[slot];
            self.sparse[moved as usize] = slot as u32;
        }
        self.sparse[index as usize] = EMPTY;
        self.owners.pop();

        match self.dense.pop() {
            Some(value) => Ok(value),
            None => Err(StoreError::Vacant { index }),
        }
    }

    /// Like [`SparseSet::remove`] but absence is not an error.
    pub fn take(&mut self, index: EntityIndex) -> Option<T> {
        self.remove(index).ok()
    }

    #[inline]
    pub fn contains(&self, index: EntityIndex) -> bool {
        self.slot(index).is_some()
    }

    #[inline]
    pub fn get(&self, index: EntityIndex) -> Option<&T> {
        let slot = self.slot(index)?;
        self.dense.get(slot)
    }

    #[inline]
    pub fn get_mut(&mut self, index: EntityIndex) -> Option<&mut T> {
        let slot = self.slot(index)?;
        self.dense.get_mut(slot)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn owners(&self) -> &[EntityIndex] {
        &self.owners
    }

    pub fn values(&self) -> &[T] {
        &self.dense
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.dense
    }

    /// `(owner, value)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityIndex, &T)> {
        self.owners.iter().copied().zip(self.dense.iter())
    }

    pub fn clear(&mut self) {
        for &owner in &self.owners {
            self.sparse[owner as usize] = EMPTY;
        }
        self.dense.clear();
        self.owners.clear();
    }

    /// Verify `owners[sparse[i]] == i` for every occupied `i`, that every
    /// dense slot is reachable from `sparse`, and that the parallel arrays
    /// agree in length.
    pub fn check_invariants(&self) -> bool {
        if self.dense.len() != self.owners.len() {
            return false;
        }
        let mut occupied = 0;
        for (i, &slot) in self.sparse.iter().enumerate() {
            if slot == EMPTY {
                continue;
            }
            occupied += 1;
            match self.owners.get(slot as usize) {
                Some(&owner) if owner as usize == i => {}
                _ => return false,
            }
        }
        occupied == self.dense.len()
    }

    /// Raw pointer view used by the query engine. See [`RawColumn`].
    pub(crate) fn raw_column(&mut self) -> RawColumn<T> {
        RawColumn {
            sparse: self.sparse.as_ptr(),
            sparse_len: self.sparse.len(),
            dense: self.dense.as_mut_ptr(),
            _marker: PhantomData,
        }
    }

    #[inline]
    fn slot(&self, index: EntityIndex) -> Option<usize> {
        match self.sparse.get(index as usize) {
            Some(&slot) if slot != EMPTY => Some(slot as usize),
            _ => None,
        }
    }
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> ErasedStore for SparseSet<T> {
    fn remove_if_present(&mut self, index: EntityIndex) -> bool {
        self.take(index).is_some()
    }

    fn contains(&self, index: EntityIndex) -> bool {
        SparseSet::contains(self, index)
    }

    fn len(&self) -> usize {
        SparseSet::len(self)
    }

    fn owners(&self) -> &[EntityIndex] {
        SparseSet::owners(self)
    }

    fn clear(&mut self) {
        SparseSet::clear(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Unchecked view of a [`SparseSet`] used while a query is in flight.
///
/// A column is only valid while its store is neither resized nor dropped.
/// The query engine upholds this by never inserting into a queried store
/// during iteration, and by handing each entity index to exactly one
/// callback invocation at a time.
pub struct RawColumn<T> {
    sparse: *const u32,
    sparse_len: usize,
    dense: *mut T,
    _marker: PhantomData<*mut T>,
}

impl<T> Clone for RawColumn<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for RawColumn<T> {}

// SAFETY: a column only hands out `&mut T` for distinct entity indices, so
// sharing it across threads is sound whenever `T` itself may be sent and
// shared.
unsafe impl<T: Send + Sync> Send for RawColumn<T> {}
unsafe impl<T: Send + Sync> Sync for RawColumn<T> {}

impl<T> RawColumn<T> {
    /// # Safety
    /// The backing store must be alive and not structurally modified since
    /// this column was taken.
    #[inline]
    pub(crate) unsafe fn contains(&self, index: EntityIndex) -> bool {
        let i = index as usize;
        // SAFETY: bounds checked against the length captured with the pointer.
        i < self.sparse_len && unsafe { *self.sparse.add(i) } != EMPTY
    }

    /// # Safety
    /// Same as [`RawColumn::contains`]; additionally `index` must be present
    /// and no other live reference to its value may exist.
    #[inline]
    pub(crate) unsafe fn get<'a>(&self, index: EntityIndex) -> &'a mut T {
        debug_assert!(unsafe { self.contains(index) });
        // SAFETY: caller guarantees presence, so the slot is in bounds.
        unsafe {
            let slot = *self.sparse.add(index as usize) as usize;
            &mut *self.dense.add(slot)
        }
    }
}
