//! # Commands
//!
//! Deferred structural mutations recorded while a query is running.
//!
//! Query callbacks only get `&mut` access to the components they asked for;
//! anything that would insert into or remove from a store (destroying an
//! entity, attaching or detaching a component) is pushed into a
//! [`CommandBuffer`] instead and replayed against the world once iteration
//! has completed. Stores therefore never change shape under a running query.
//!
//! ## Playback
//! - Commands run in the order they were recorded. Parallel queries give
//!   every partition its own buffer and concatenate them in partition order.
//! - A command whose target entity is no longer valid when it runs (for
//!   instance an entity two partitions both asked to destroy) is skipped.
//! - Any other error stops playback; the remaining commands are dropped.

use crate::ecs::{Component, Entity, Result, World};
use std::fmt;

/// Deferred closure run against the world at playback time.
pub type DeferredFn = Box<dyn FnOnce(&mut World) -> Result<()> + Send>;

/// A recorded structural mutation.
pub enum Command {
    /// Destroy an entity and every component it owns.
    Destroy(Entity),

    /// Anything else, most commonly inserting or removing a component.
    Deferred(DeferredFn),
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Destroy(entity) => f.debug_tuple("Destroy").field(entity).finish(),
            Command::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// FIFO of [`Command`]s.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Request destruction of `entity` once iteration finishes.
    pub fn destroy(&mut self, entity: Entity) {
        self.push(Command::Destroy(entity));
    }

    /// Attach `value` to `entity` at playback. Skipped if the entity is gone
    /// by then.
    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) {
        self.run(move |world| {
            if !world.is_valid(entity) {
                tracing::debug!(%entity, component = T::name(), "skipping insert on stale entity");
                return Ok(());
            }
            world.add_component(entity, value)
        });
    }

    /// Detach `T` from `entity` at playback. Skipped if the entity is gone
    /// by then.
    pub fn remove<T: Component>(&mut self, entity: Entity) {
        self.run(move |world| {
            if !world.is_valid(entity) {
                tracing::debug!(%entity, component = T::name(), "skipping remove on stale entity");
                return Ok(());
            }
            world.remove_component::<T>(entity).map(drop)
        });
    }

    /// Record an arbitrary mutation.
    pub fn run<F>(&mut self, f: F)
    where
        F: FnOnce(&mut World) -> Result<()> + Send + 'static,
    {
        self.push(Command::Deferred(Box::new(f)));
    }

    /// Move every command of `other` to the end of this buffer.
    pub fn append(&mut self, other: &mut CommandBuffer) {
        self.commands.append(&mut other.commands);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Take every recorded command, leaving the buffer empty.
    pub(crate) fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }
}

impl FromIterator<CommandBuffer> for CommandBuffer {
    fn from_iter<I: IntoIterator<Item = CommandBuffer>>(iter: I) -> Self {
        let mut merged = CommandBuffer::new();
        for mut buffer in iter {
            merged.append(&mut buffer);
        }
        merged
    }
}
