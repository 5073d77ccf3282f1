//! Component bundles for registering and spawning several types at once

use std::any::TypeId;

use crate::ecs::{Component, ComponentRegistry, EcsError, Entity, Result, World};

/// A tuple of distinct component types handled as a unit.
///
/// Implemented for `(A,)` through `(A, B, C, D, E, F, G, H)`.
pub trait ComponentBundle: Send + 'static {
    /// Register every type, or none of them if any would fail.
    fn register_all(registry: &mut ComponentRegistry) -> Result<()>;

    /// Fail unless every type is registered and no type repeats.
    fn check(registry: &ComponentRegistry) -> Result<()>;

    /// Attach every value to `entity`.
    fn insert_into(self, world: &mut World, entity: Entity) -> Result<()>;
}

fn first_repeat(type_ids: &[(TypeId, &'static str)]) -> Option<&'static str> {
    type_ids
        .iter()
        .enumerate()
        .find(|(position, (id, _))| type_ids[..*position].iter().any(|(seen, _)| seen == id))
        .map(|(_, (_, name))| *name)
}

macro_rules! impl_bundle {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentBundle for ($($name,)+) {
            fn register_all(registry: &mut ComponentRegistry) -> Result<()> {
                let type_ids = [$((TypeId::of::<$name>(), $name::name())),+];
                if let Some(name) = first_repeat(&type_ids) {
                    return Err(EcsError::DuplicateRegistration { name });
                }
                $(registry.can_register::<$name>()?;)+
                $(registry.register::<$name>()?;)+
                Ok(())
            }

            fn check(registry: &ComponentRegistry) -> Result<()> {
                let type_ids = [$((TypeId::of::<$name>(), $name::name())),+];
                if let Some(component) = first_repeat(&type_ids) {
                    return Err(EcsError::ConflictingAccess { component });
                }
                $(registry.id_of::<$name>()?;)+
                Ok(())
            }

            #[allow(non_snake_case)]
            fn insert_into(self, world: &mut World, entity: Entity) -> Result<()> {
                let ($($name,)+) = self;
                $(world.add_component(entity, $name)?;)+
                Ok(())
            }
        }
    };
}

impl_bundle!(A);
impl_bundle!(A, B);
impl_bundle!(A, B, C);
impl_bundle!(A, B, C, D);
impl_bundle!(A, B, C, D, E);
impl_bundle!(A, B, C, D, E, F);
impl_bundle!(A, B, C, D, E, F, G);
impl_bundle!(A, B, C, D, E, F, G, H);
