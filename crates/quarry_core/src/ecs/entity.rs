//! Entity handles with generational indices
//!
//! Entities are lightweight handles (4 bytes) that name a slot in the
//! [`EntityRegistry`]. The generation counter detects handles that outlived
//! the entity they referred to.

use crate::ecs::{EcsError, Result};
use std::collections::VecDeque;
use std::fmt;

/// Slot index of an entity, the key of every component store.
pub type EntityIndex = u32;

/// Per-slot reuse counter.
pub type Generation = u8;

const INDEX_BITS: u32 = 24;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;

/// Largest index [`EntityRegistry::create`] hands out. The all-ones index is
/// reserved for [`Entity::NULL`].
pub const ENTITY_INDEX_MAX: EntityIndex = INDEX_MASK - 1;

/// A slot is retired once its generation reaches this value.
pub const GENERATION_MAX: Generation = Generation::MAX;

const FIRST_GENERATION: Generation = 1;
const NOT_LIVE: u32 = u32::MAX;

/// Entity handle (generation-indexed for safety)
///
/// Format: [8-bit generation | 24-bit index]
/// - Index: slot in the entity registry and key into component stores
/// - Generation: incremented on entity destruction (prevents use-after-free)
///
/// Example:
/// ```ignore
/// let entity = world.create()?;
/// world.destroy(entity)?;
/// // entity handle is now invalid (generation mismatch)
/// assert!(!world.is_valid(entity));
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(u32);

impl Entity {
    /// "No entity". Never produced by [`EntityRegistry::create`].
    pub const NULL: Entity = Entity(u32::MAX);

    pub(crate) const fn new(index: EntityIndex, generation: Generation) -> Self {
        Self(((generation as u32) << INDEX_BITS) | (index & INDEX_MASK))
    }

    #[inline]
    pub const fn index(self) -> EntityIndex {
        self.0 & INDEX_MASK
    }

    #[inline]
    pub const fn generation(self) -> Generation {
        (self.0 >> INDEX_BITS) as Generation
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == u32::MAX
    }

    /// Packed wire representation.
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Entity(null)")
        } else {
            write!(f, "Entity({}v{})", self.index(), self.generation())
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "{}:{}", self.index(), self.generation())
        }
    }
}

/// Owns entity lifecycle: slot allocation, generations and the dense list of
/// live handles.
///
/// Slots are reused first-in first-out. A slot whose generation would
/// overflow on destroy is retired instead of recycled, so a handle can never
/// be revived by wrap-around.
pub struct EntityRegistry {
    generations: Vec<Generation>,
    free: VecDeque<EntityIndex>,
    live: Vec<Entity>,
    live_slot: Vec<u32>,
    max_entities: usize,
    retired: usize,
}

impl EntityRegistry {
    /// Registry that can address at most `max_entities` slots.
    pub fn new(max_entities: usize) -> Self {
        Self::with_capacity(max_entities, 0)
    }

    pub fn with_capacity(max_entities: usize, capacity: usize) -> Self {
        let max_entities = max_entities.min(ENTITY_INDEX_MAX as usize + 1);
        let capacity = capacity.min(max_entities);
        Self {
            generations: Vec::with_capacity(capacity),
            free: VecDeque::new(),
            live: Vec::with_capacity(capacity),
            live_slot: Vec::with_capacity(capacity),
            max_entities,
            retired: 0,
        }
    }

    /// Allocate a handle, reusing the oldest freed slot when one exists.
    pub fn create(&mut self) -> Result<Entity> {
        self.live
            .try_reserve(1)
            .map_err(|_| self.capacity_error())?;

        let entity = match self.free.pop_front() {
            Some(index) => Entity::new(index, self.generations[index as usize]),
            None => {
                let index = self.generations.len();
                if index >= self.max_entities {
                    return Err(self.capacity_error());
                }
                self.generations
                    .try_reserve(1)
                    .and_then(|_| self.live_slot.try_reserve(1))
                    .map_err(|_| self.capacity_error())?;
                self.generations.push(FIRST_GENERATION);
                self.live_slot.push(NOT_LIVE);
                Entity::new(index as EntityIndex, FIRST_GENERATION)
            }
        };

        self.live_slot[entity.index() as usize] = self.live.len() as u32;
        self.live.push(entity);
        Ok(entity)
    }

    /// Release a live handle: swap-remove it from the live list, bump the
    /// slot generation and recycle (or retire) the slot.
    ///
    /// Component cleanup is the caller's job; see `World::destroy`.
    pub fn destroy(&mut self, entity: Entity) -> Result<()> {
        if !self.is_valid(entity) {
            return Err(EcsError::StaleHandle { entity });
        }

        let index = entity.index() as usize;
        let slot = self.live_slot[index] as usize;
        self.live.swap_remove(slot);
        if let Some(moved) = self.live.get(slot) {
            self.live_slot[moved.index() as usize] = slot as u32;
        }
        self.live_slot[index] = NOT_LIVE;

        let generation = self.generations[index] + 1;
        self.generations[index] = generation;
        if generation == GENERATION_MAX {
            self.retired += 1;
        } else {
            self.free.push_back(entity.index());
        }
        Ok(())
    }

    /// Whether `entity` names a live slot at its current generation.
    #[inline]
    pub fn is_valid(&self, entity: Entity) -> bool {
        let index = entity.index() as usize;
        match (self.generations.get(index), self.live_slot.get(index)) {
            (Some(&generation), Some(&slot)) => {
                slot != NOT_LIVE && generation == entity.generation()
            }
            _ => false,
        }
    }

    /// Current handle for a slot, if the slot is live.
    pub fn entity_at(&self, index: EntityIndex) -> Option<Entity> {
        let slot = *self.live_slot.get(index as usize)?;
        if slot == NOT_LIVE {
            return None;
        }
        self.live.get(slot as usize).copied()
    }

    /// Generation of every allocated slot, indexed by [`EntityIndex`].
    pub(crate) fn generations(&self) -> &[Generation] {
        &self.generations
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Live handles in dense order. The order changes on destroy.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.live.iter().copied()
    }

    pub fn max_entities(&self) -> usize {
        self.max_entities
    }

    /// Slots that will never be handed out again.
    pub fn retired(&self) -> usize {
        self.retired
    }

    /// Destroy every entity. Generations survive so old handles stay stale.
    pub fn clear(&mut self) {
        for entity in std::mem::take(&mut self.live) {
            let index = entity.index() as usize;
            self.live_slot[index] = NOT_LIVE;
            let generation = self.generations[index] + 1;
            self.generations[index] = generation;
            if generation == GENERATION_MAX {
                self.retired += 1;
            } else {
                self.free.push_back(entity.index());
            }
        }
    }

    fn capacity_error(&self) -> EcsError {
        EcsError::CapacityExceeded {
            requested: self.generations.len() + 1,
            capacity: self.max_entities,
        }
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new(ENTITY_INDEX_MAX as usize + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_bit_layout() {
        let entity = Entity::new(0x12_3456, 7);
        assert_eq!(entity.index(), 0x12_3456);
        assert_eq!(entity.generation(), 7);
        assert_eq!(entity.to_bits(), 0x0712_3456);
        assert_eq!(Entity::from_bits(entity.to_bits()), entity);
        assert!(!entity.is_null());
        assert!(Entity::NULL.is_null());
        assert_eq!(Entity::NULL.index(), INDEX_MASK);
        assert_eq!(Entity::default(), Entity::NULL);
        assert_eq!(format!("{entity}"), "1193046:7");
        assert_eq!(format!("{}", Entity::NULL), "null");
    }

    #[test]
    fn test_create_starts_at_generation_one() {
        let mut registry = EntityRegistry::default();
        let a = registry.create().unwrap();
        let b = registry.create().unwrap();
        assert_eq!((a.index(), a.generation()), (0, 1));
        assert_eq!((b.index(), b.generation()), (1, 1));
        assert!(registry.is_valid(a));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_destroy_invalidates_and_reuses_with_newer_generation() {
        let mut registry = EntityRegistry::default();
        let a = registry.create().unwrap();
        registry.destroy(a).unwrap();
        assert!(!registry.is_valid(a));

        let b = registry.create().unwrap();
        assert_eq!(b.index(), a.index());
        assert!(b.generation() > a.generation());
        assert!(registry.is_valid(b));
        assert!(!registry.is_valid(a));
    }

    #[test]
    fn test_free_list_is_fifo() {
        let mut registry = EntityRegistry::default();
        let handles: Vec<_> = (0..4).map(|_| registry.create().unwrap()).collect();
        registry.destroy(handles[2]).unwrap();
        registry.destroy(handles[0]).unwrap();

        assert_eq!(registry.create().unwrap().index(), 2);
        assert_eq!(registry.create().unwrap().index(), 0);
        assert_eq!(registry.create().unwrap().index(), 4);
    }

    #[test]
    fn test_double_destroy_is_stale() {
        let mut registry = EntityRegistry::default();
        let a = registry.create().unwrap();
        registry.destroy(a).unwrap();
        assert!(matches!(
            registry.destroy(a),
            Err(EcsError::StaleHandle { entity }) if entity == a
        ));
        assert!(matches!(
            registry.destroy(Entity::NULL),
            Err(EcsError::StaleHandle { .. })
        ));
    }

    #[test]
    fn test_handle_to_freed_slot_is_stale() {
        let mut registry = EntityRegistry::default();
        let a = registry.create().unwrap();
        registry.destroy(a).unwrap();

        // Current generation of a slot sitting on the free list.
        let freed = Entity::new(a.index(), registry.generations()[a.index() as usize]);
        assert!(!registry.is_valid(freed));
        assert!(matches!(
            registry.destroy(freed),
            Err(EcsError::StaleHandle { .. })
        ));
        assert!(registry.is_empty());

        let b = registry.create().unwrap();
        assert_eq!(b, freed);
        assert!(registry.is_valid(b));
    }

    #[test]
    fn test_live_list_tracks_swap_remove() {
        let mut registry = EntityRegistry::default();
        let handles: Vec<_> = (0..5).map(|_| registry.create().unwrap()).collect();
        registry.destroy(handles[1]).unwrap();

        let mut live: Vec<_> = registry.iter().collect();
        live.sort();
        assert_eq!(live, vec![handles[0], handles[2], handles[3], handles[4]]);
        for &entity in &live {
            assert_eq!(registry.entity_at(entity.index()), Some(entity));
        }
        assert_eq!(registry.entity_at(handles[1].index()), None);
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut registry = EntityRegistry::new(2);
        registry.create().unwrap();
        let b = registry.create().unwrap();
        assert!(matches!(
            registry.create(),
            Err(EcsError::CapacityExceeded { capacity: 2, .. })
        ));

        registry.destroy(b).unwrap();
        assert!(registry.create().is_ok());
    }

    #[test]
    fn test_slot_retires_instead_of_wrapping() {
        let mut registry = EntityRegistry::new(1);
        let mut last = registry.create().unwrap();
        while registry.retired() == 0 {
            registry.destroy(last).unwrap();
            if registry.retired() == 0 {
                let next = registry.create().unwrap();
                assert!(next.generation() > last.generation());
                last = next;
            }
        }

        assert_eq!(last.generation(), GENERATION_MAX - 1);
        assert!(!registry.is_valid(last));
        assert!(matches!(
            registry.create(),
            Err(EcsError::CapacityExceeded { .. })
        ));
    }

    #[test]
    fn test_clear_invalidates_everything() {
        let mut registry = EntityRegistry::default();
        let a = registry.create().unwrap();
        let b = registry.create().unwrap();
        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.is_valid(a));
        assert!(!registry.is_valid(b));
        assert_eq!(registry.create().unwrap().index(), a.index());
    }
}
