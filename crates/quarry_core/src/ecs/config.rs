//! World configuration
//!
//! Loaded once at startup (the runtime reads it from its settings file) and
//! validated by `World::with_config`.

use crate::ecs::{EcsError, Result, ENTITY_INDEX_MAX};
use serde::{Deserialize, Serialize};

/// Tunables for a [`World`](crate::ecs::World).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Upper bound on simultaneously addressable entity slots.
    pub max_entities: usize,
    /// Dense capacity reserved up front in the entity registry and in every
    /// component store.
    pub initial_capacity: usize,
    /// Worker threads for parallel queries. 0 lets rayon decide.
    pub worker_threads: usize,
    /// Smallest number of entities handed to one parallel task.
    pub par_min_chunk: usize,
    /// Validate entity generations on every component operation. Destroy
    /// always validates.
    pub strict_handles: bool,
}

impl WorldConfig {
    pub fn validate(&self) -> Result<()> {
        let limit = ENTITY_INDEX_MAX as usize + 1;
        if self.max_entities == 0 || self.max_entities > limit {
            return Err(EcsError::InvalidConfig {
                reason: format!("max_entities must be in 1..={limit}, got {}", self.max_entities),
            });
        }
        if self.par_min_chunk == 0 {
            return Err(EcsError::InvalidConfig {
                reason: "par_min_chunk must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_entities: ENTITY_INDEX_MAX as usize + 1,
            initial_capacity: 1024,
            worker_threads: 0,
            par_min_chunk: 256,
            strict_handles: cfg!(debug_assertions),
        }
    }
}
