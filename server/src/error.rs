//! Error types for the simulation core.

use crate::entity::{EntityId, EntityType};
use thiserror::Error;

/// Failures surfaced by the world and its registries.
///
/// Most of these are programmer errors: asking for a component that was never
/// registered, spawning an entity that lacks what its type requires. They abort
/// the operation before anything is mutated.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("entity {entity} has no active {component} component")]
    MissingComponent {
        entity: EntityId,
        component: &'static str,
    },

    #[error("entity type {0} was never registered")]
    UnregisteredEntityType(EntityType),

    #[error("component {0} was never registered")]
    UnregisteredComponent(&'static str),

    #[error("component {component} is already present on entity {entity}")]
    DuplicateComponent {
        entity: EntityId,
        component: &'static str,
    },

    #[error("component {0} is registered twice")]
    ComponentAlreadyRegistered(&'static str),

    #[error("entity type {0} is registered twice")]
    EntityTypeAlreadyRegistered(EntityType),

    #[error("entity type {entity_type} requires a {component} component")]
    MissingRequiredComponent {
        entity_type: EntityType,
        component: &'static str,
    },

    #[error("invalid world config: {0}")]
    InvalidConfig(String),

    #[error("invalid tile data: {0}")]
    InvalidTileData(String),

    #[error("failed to encode component data: {0}")]
    Encode(#[from] bincode::Error),
}

pub type WorldResult<T> = Result<T, WorldError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_component_message() {
        let error = WorldError::MissingComponent {
            entity: EntityId::new(3, 1),
            component: "PhysicsComponent",
        };
        assert_eq!(
            error.to_string(),
            "entity 3v1 has no active PhysicsComponent component"
        );
    }

    #[test]
    fn test_unregistered_type_message() {
        let error = WorldError::UnregisteredEntityType(EntityType(12));
        assert_eq!(error.to_string(), "entity type #12 was never registered");
    }
}
