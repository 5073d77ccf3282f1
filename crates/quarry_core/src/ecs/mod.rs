//! Entity Component System core types.
//!
//! Components live in one sparse set per type, addressed by the index half
//! of a generational [`Entity`] handle. The [`World`] ties the entity
//! registry and the component stores together and runs queries over them;
//! structural changes requested mid-query are deferred through a
//! [`CommandBuffer`]. [`Scheduler`] drives [`System`]s against a world once
//! per frame.

mod bundle;
mod commands;
mod component;
mod config;
mod entity;
mod error;
mod query;
mod registry;
mod scheduler;
mod system;
pub mod storage;
mod world;

pub use bundle::ComponentBundle;
pub use commands::{Command, CommandBuffer, DeferredFn};
pub use component::{Component, ComponentId, ComponentInfo};
pub use config::WorldConfig;
pub use entity::{
    Entity, EntityIndex, EntityRegistry, Generation, ENTITY_INDEX_MAX, GENERATION_MAX,
};
pub use error::{EcsError, Result};
pub use query::Query;
pub use registry::ComponentRegistry;
pub use scheduler::Scheduler;
pub use system::System;
pub use world::World;

/// Spawn an entity carrying every listed component.
///
/// Expands to `world.spawn((a, b, ..))` and yields its `Result<Entity>`.
///
/// ```ignore
/// let entity = spawn!(world, Position { x: 1.0 }, Velocity { x: 0.5 })?;
/// ```
#[macro_export]
macro_rules! spawn {
    ($world:expr $(, $component:expr)+ $(,)?) => {
        $world.spawn(($($component,)+))
    };
}
