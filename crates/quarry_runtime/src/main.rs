//! Quarry Runtime
//!
//! Demo binary that boots a world from the settings file and runs the
//! particle simulation for a fixed number of frames.

mod demo;
mod settings;

use anyhow::Result;
use demo::{LifetimeSystem, MovementSystem, RemeshSystem, SpawnArgs, SpawnSystem};
use quarry_core::ecs::{Scheduler, System, World};
use quarry_core::time::SimulationTime;
use quarry_metrics::{Counter, FrameTimer};
use settings::{settings_path, Settings};

fn main() -> Result<()> {
    // Initialize logging (honours RUST_LOG)
    tracing_subscriber::fmt::init();

    tracing::info!("Quarry v{}", quarry_core::VERSION);
    if !quarry_metrics::ENABLED {
        tracing::warn!("Built without metrics, timings will read zero");
    }
    let settings = Settings::load(settings_path().as_deref())?;
    let simulation = &settings.simulation;

    let mut world = World::with_config(settings.world.clone())?;
    demo::register_components(&mut world)?;

    let mut scheduler = Scheduler::new();
    let mut time = SimulationTime::with_tick_rate(simulation.tick_rate_hz);
    let mut frame_timer = FrameTimer::with_budget(120, time.tick_duration());
    let mut counters = Counter::new();
    let spawn_args = SpawnArgs {
        per_frame: simulation.spawn_per_frame,
        max_live: simulation.max_live,
        lifetime: simulation.lifetime_secs,
    };

    tracing::info!(
        frames = simulation.frames,
        tick_rate_hz = time.tick_rate_hz(),
        "Running simulation"
    );

    for _ in 0..simulation.frames {
        frame_timer.begin();
        let dt = time.dt();

        scheduler.run_system::<SpawnSystem>(&mut world, dt, spawn_args)?;
        scheduler.run_system::<MovementSystem>(&mut world, dt, ())?;
        scheduler.run_system::<LifetimeSystem>(&mut world, dt, ())?;
        scheduler.run_system::<RemeshSystem>(&mut world, dt, ())?;

        time.advance_tick();
        frame_timer.end();

        if let Some(remesh) = scheduler.system::<RemeshSystem>() {
            counters.record("remeshed", remesh.last_frame as u64);
        }
        counters.record("live", world.len() as u64);

        if time.tick_count() % u64::from(time.tick_rate_hz()) == 0 {
            let (min_ms, max_ms) = frame_timer.frame_time_range_ms();
            tracing::info!(
                tick = time.tick_count(),
                entities = world.len(),
                fps = frame_timer.fps(),
                frame_ms = frame_timer.frame_time_ms(),
                min_ms,
                max_ms,
                "Frame stats"
            );
        }
    }

    report(&scheduler, &world, &time);
    tracing::info!(
        frames = frame_timer.frames(),
        over_budget = frame_timer.over_budget(),
        "Frame budget"
    );
    for (name, tally) in counters.iter() {
        tracing::info!(
            counter = name,
            peak = tally.peak,
            mean = tally.mean(),
            total = tally.total,
            "Counter"
        );
    }

    Ok(())
}

fn report(scheduler: &Scheduler, world: &World, time: &SimulationTime) {
    tracing::info!(
        ticks = time.tick_count(),
        simulated_secs = time.total_time().as_secs_f32(),
        live = world.len(),
        retired_slots = world.entities().retired(),
        "Simulation finished"
    );

    if let Some(spawn) = scheduler.system::<SpawnSystem>() {
        tracing::info!(spawned = spawn.spawned, "spawn");
    }
    if let Some(lifetime) = scheduler.system::<LifetimeSystem>() {
        tracing::info!(expired = lifetime.expired, "lifetime");
    }
    if let Some(remesh) = scheduler.system::<RemeshSystem>() {
        tracing::info!(total = remesh.total, bounds = ?remesh.bounds, "remesh");
    }

    log_timing::<SpawnSystem>(scheduler);
    log_timing::<MovementSystem>(scheduler);
    log_timing::<LifetimeSystem>(scheduler);
    log_timing::<RemeshSystem>(scheduler);
}

fn log_timing<S: System>(scheduler: &Scheduler) {
    tracing::info!(
        system = S::name(),
        calls = scheduler.calls::<S>(),
        last = ?scheduler.timing::<S>(),
        average = ?scheduler.average::<S>(),
        "System timing"
    );
}
