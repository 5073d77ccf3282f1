use crate::ecs::Entity;
use thiserror::Error;

/// Result alias used throughout the ECS.
pub type Result<T, E = EcsError> = std::result::Result<T, E>;

/// Errors reported by the world and its registries.
///
/// Registration, configuration and capacity errors are configuration-time
/// failures; the per-entity variants indicate a caller touching state it
/// does not own.
#[derive(Debug, Error)]
pub enum EcsError {
    #[error("component '{name}' is already registered")]
    DuplicateRegistration { name: &'static str },

    #[error("component '{name}' is not registered")]
    UnregisteredComponent { name: &'static str },

    #[error("tag component '{name}' must be zero-sized (is {size} bytes)")]
    NonZeroSizedTag { name: &'static str, size: usize },

    #[error("entity {entity} already has component '{component}'")]
    DuplicateComponent {
        entity: Entity,
        component: &'static str,
    },

    #[error("entity {entity} has no component '{component}'")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },

    #[error("entity handle {entity} is stale")]
    StaleHandle { entity: Entity },

    #[error("entity limit reached ({requested} needed; capacity {capacity})")]
    CapacityExceeded { requested: usize, capacity: usize },

    #[error("component '{component}' appears more than once in a query")]
    ConflictingAccess { component: &'static str },

    #[error("invalid world configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("system '{name}' is stored under another type")]
    SystemMismatch { name: &'static str },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl EcsError {
    /// Whether the error stems from a per-entity misuse rather than from
    /// world setup.
    pub fn is_entity_error(&self) -> bool {
        matches!(
            self,
            EcsError::DuplicateComponent { .. }
                | EcsError::MissingComponent { .. }
                | EcsError::StaleHandle { .. }
        )
    }
}
