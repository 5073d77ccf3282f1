// component.rs - Component trait and per-type metadata
//
// Components are identified by small dense ids handed out by the world's
// ComponentRegistry at registration time, never by instantiation order.

use std::any::type_name;
use std::mem::size_of;

/// Dense id assigned at registration; indexes the registry's store table.
pub type ComponentId = u32;

/// Trait for data that can be attached to an entity.
///
/// Components must be `Send + Sync` so queries can hand out disjoint
/// `&mut` references from worker threads.
///
/// Implement it with [`define_component!`](crate::define_component) or, for
/// one-shot markers, [`define_tag!`](crate::define_tag).
pub trait Component: 'static + Sized + Send + Sync {
    /// Tag components are removed from an entity right after a query that
    /// names them has visited it.
    const TAG: bool = false;

    /// Human-readable name for errors and logs.
    fn name() -> &'static str {
        type_name::<Self>()
    }
}

/// Metadata recorded when a component type is registered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentInfo {
    pub id: ComponentId,
    pub name: &'static str,
    pub tag: bool,
    pub size: usize,
}

impl ComponentInfo {
    pub(crate) fn of<T: Component>(id: ComponentId) -> Self {
        Self {
            id,
            name: T::name(),
            tag: T::TAG,
            size: size_of::<T>(),
        }
    }
}

/// Implement [`Component`] for a type.
///
/// # Example
/// ```ignore
/// #[derive(Clone, Copy)]
/// struct Position { x: f32, y: f32 }
///
/// define_component!(Position);
/// ```
#[macro_export]
macro_rules! define_component {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::ecs::Component for $ty {}
        )+
    };
}

/// Implement [`Component`] for a zero-sized marker that is consumed by the
/// first query naming it.
///
/// # Example
/// ```ignore
/// #[derive(Default)]
/// struct NeedsRemesh;
///
/// define_tag!(NeedsRemesh);
/// ```
#[macro_export]
macro_rules! define_tag {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::ecs::Component for $ty {
                const TAG: bool = true;
            }
        )+
    };
}
