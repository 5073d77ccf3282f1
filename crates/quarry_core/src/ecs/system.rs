//! Systems: per-frame units of game logic run by the [`Scheduler`].
//!
//! [`Scheduler`]: crate::ecs::Scheduler

use crate::ecs::{Result, World};

/// A unit of logic that runs against the world once per scheduler call.
///
/// Systems are constructed lazily through [`Default`] the first time they are
/// run, so any state they keep between frames lives in the implementing type.
///
/// ```ignore
/// #[derive(Default)]
/// struct Gravity;
///
/// impl System for Gravity {
///     type Args = f32;
///
///     fn update(&mut self, world: &mut World, dt: f32, g: f32) -> Result<()> {
///         world.par_for_each::<(Velocity,), _>(|_, (vel,), _| vel.y -= g * dt)
///     }
/// }
/// ```
pub trait System: Default + 'static {
    /// Extra per-call input passed through [`Scheduler::run_system`].
    ///
    /// [`Scheduler::run_system`]: crate::ecs::Scheduler::run_system
    type Args;

    /// Name used for timings and log spans.
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Called once, right after construction and before the first update.
    fn init(&mut self, _world: &mut World) -> Result<()> {
        Ok(())
    }

    fn update(&mut self, world: &mut World, dt: f32, args: Self::Args) -> Result<()>;
}
