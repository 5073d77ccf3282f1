//! Quarry Core
//!
//! A sparse-set entity component system:
//! - Generational entity handles
//! - Per-type component stores with O(1) insert and swap-and-pop removal
//! - Sequential and data-parallel queries with consumable tag components
//! - Deferred structural changes through command buffers
//! - A lazily constructing system scheduler
//! - A fixed-step simulation clock

pub mod ecs;
pub mod time;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
