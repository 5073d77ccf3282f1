//! # Scheduler
//!
//! Runs [`System`]s one at a time on the calling thread. A system is created
//! the first time it is run and lives until the scheduler is dropped. Every
//! update is timed and wrapped in a `tracing` span named after the system.

use crate::ecs::{EcsError, Result, System, World};
use quarry_metrics::SystemProfiler;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Default)]
pub struct Scheduler {
    systems: HashMap<TypeId, Box<dyn Any>>,
    profiler: SystemProfiler,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one update of `S`, constructing and initialising it first if this
    /// is its first run.
    ///
    /// If `init` fails the system is dropped again and the error returned;
    /// the next call starts over with a fresh instance.
    pub fn run_system<S: System>(
        &mut self,
        world: &mut World,
        dt: f32,
        args: S::Args,
    ) -> Result<()> {
        let type_id = TypeId::of::<S>();
        if !self.systems.contains_key(&type_id) {
            let mut system = S::default();
            system.init(world)?;
            tracing::debug!(system = S::name(), "system initialized");
            self.systems.insert(type_id, Box::new(system));
        }

        let system = self
            .systems
            .get_mut(&type_id)
            .and_then(|system| system.downcast_mut::<S>())
            .ok_or(EcsError::SystemMismatch { name: S::name() })?;

        let _span = tracing::trace_span!("system", name = S::name()).entered();
        self.profiler
            .time_system(S::name(), || system.update(world, dt, args))
    }

    pub fn is_initialized<S: System>(&self) -> bool {
        self.systems.contains_key(&TypeId::of::<S>())
    }

    /// The live instance of `S`, if it has run.
    pub fn system<S: System>(&self) -> Option<&S> {
        self.systems
            .get(&TypeId::of::<S>())
            .and_then(|system| system.downcast_ref::<S>())
    }

    pub fn system_mut<S: System>(&mut self) -> Option<&mut S> {
        self.systems
            .get_mut(&TypeId::of::<S>())
            .and_then(|system| system.downcast_mut::<S>())
    }

    /// Number of constructed systems.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Duration of the last update of `S`. Zero if it never ran or metrics
    /// are compiled out.
    pub fn timing<S: System>(&self) -> Duration {
        self.profiler.last(S::name())
    }

    /// Rolling average update time of `S`.
    pub fn average<S: System>(&self) -> Duration {
        self.profiler.average(S::name())
    }

    pub fn calls<S: System>(&self) -> u64 {
        self.profiler.calls(S::name())
    }

    pub fn profiler(&self) -> &SystemProfiler {
        &self.profiler
    }

    pub fn reset_timings(&mut self) {
        self.profiler.reset();
    }
}
