//! Demo simulation: particles that spawn, drift, expire and get "remeshed".
//!
//! Stands in for the engine systems that would normally drive the ECS
//! (terrain, physics, rendering) and exercises every query flavour.

use glam::Vec3;
use quarry_core::ecs::{Result, System, World};
use quarry_core::{define_component, define_tag, spawn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position(pub Vec3);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity(pub Vec3);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lifetime {
    pub remaining: f32,
}

define_component!(Position, Velocity, Lifetime);

/// Set on anything whose position changed since the last remesh.
#[derive(Debug, Default)]
pub struct NeedsRemesh;

/// Set on entities created this frame.
#[derive(Debug, Default)]
pub struct Spawned;

define_tag!(NeedsRemesh, Spawned);

pub fn register_components(world: &mut World) -> Result<()> {
    world.register_components::<(Position, Velocity, Lifetime, NeedsRemesh, Spawned)>()
}

#[derive(Debug, Clone, Copy)]
pub struct SpawnArgs {
    pub per_frame: usize,
    pub max_live: usize,
    pub lifetime: f32,
}

/// Spawns particles with pseudo-random velocities.
pub struct SpawnSystem {
    seed: u32,
    pub spawned: u64,
    pub arrived_last_frame: usize,
}

impl Default for SpawnSystem {
    fn default() -> Self {
        Self {
            seed: 0x9E37_79B9,
            spawned: 0,
            arrived_last_frame: 0,
        }
    }
}

impl SpawnSystem {
    // xorshift32
    fn next_unit(&mut self) -> f32 {
        self.seed ^= self.seed << 13;
        self.seed ^= self.seed >> 17;
        self.seed ^= self.seed << 5;
        (self.seed as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

impl System for SpawnSystem {
    type Args = SpawnArgs;

    fn name() -> &'static str {
        "spawn"
    }

    fn update(&mut self, world: &mut World, _dt: f32, args: SpawnArgs) -> Result<()> {
        let mut arrived = 0;
        world.for_each::<(Spawned,), _>(|_, _| arrived += 1)?;
        self.arrived_last_frame = arrived;

        let room = args.max_live.saturating_sub(world.len());
        for _ in 0..args.per_frame.min(room) {
            let velocity = Vec3::new(self.next_unit(), self.next_unit(), self.next_unit());
            spawn!(
                world,
                Position(Vec3::ZERO),
                Velocity(velocity * 4.0),
                Lifetime {
                    remaining: args.lifetime,
                },
                Spawned,
            )?;
            self.spawned += 1;
        }
        Ok(())
    }
}

/// Integrates velocities in parallel and flags moved entities for remeshing.
#[derive(Default)]
pub struct MovementSystem;

impl System for MovementSystem {
    type Args = ();

    fn name() -> &'static str {
        "movement"
    }

    fn update(&mut self, world: &mut World, dt: f32, _args: ()) -> Result<()> {
        world.par_for_each_tagging::<(Position, Velocity), NeedsRemesh, _>(
            |_, (position, velocity), _| {
                position.0 += velocity.0 * dt;
            },
        )
    }
}

/// Counts lifetimes down and destroys expired entities after iteration.
#[derive(Default)]
pub struct LifetimeSystem {
    pub expired: u64,
}

impl System for LifetimeSystem {
    type Args = ();

    fn name() -> &'static str {
        "lifetime"
    }

    fn update(&mut self, world: &mut World, dt: f32, _args: ()) -> Result<()> {
        let before = world.len();
        world.par_for_each::<(Lifetime,), _>(|entity, (lifetime,), commands| {
            lifetime.remaining -= dt;
            if lifetime.remaining <= 0.0 {
                commands.destroy(entity);
            }
        })?;
        self.expired += (before - world.len()) as u64;
        Ok(())
    }
}

/// Consumes `NeedsRemesh`; a renderer would rebuild geometry here.
#[derive(Default)]
pub struct RemeshSystem {
    pub last_frame: usize,
    pub total: u64,
    pub bounds: Vec3,
}

impl System for RemeshSystem {
    type Args = ();

    fn name() -> &'static str {
        "remesh"
    }

    fn update(&mut self, world: &mut World, _dt: f32, _args: ()) -> Result<()> {
        let mut count = 0;
        let mut bounds = Vec3::ZERO;
        world.for_each::<(Position, NeedsRemesh), _>(|_, (position, _)| {
            count += 1;
            bounds = bounds.max(position.0.abs());
        })?;
        self.last_frame = count;
        self.total += count as u64;
        self.bounds = bounds;
        Ok(())
    }
}
