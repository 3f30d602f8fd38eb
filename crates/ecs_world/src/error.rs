//! World-level error types.

use ecs_component::Entity;

/// Errors raised by the world, its command buffers and its configuration.
///
/// `DuplicateResource` and `StaleComponent` describe programming errors:
/// the panicking entry points ([`World::set_resource`], the commit phase)
/// abort with this error's message, and `try_` variants hand it back.
///
/// [`World::set_resource`]: crate::World::set_resource
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// A resource of this type already exists (or is already staged).
    #[error("resource `{name}` already exists")]
    DuplicateResource {
        /// The resource type name.
        name: &'static str,
    },

    /// An entity referenced a pool slot that no longer holds its component.
    #[error("{entity} holds a stale handle for component `{component}`")]
    StaleComponent {
        /// The entity whose component record is broken.
        entity: Entity,
        /// The component type name.
        component: &'static str,
    },

    /// A configuration value could not be used.
    #[error("invalid value `{value}` for `{key}`")]
    InvalidConfig {
        /// The configuration key (environment variable name).
        key: &'static str,
        /// The rejected raw value.
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let dup = WorldError::DuplicateResource { name: "GameState" };
        assert_eq!(dup.to_string(), "resource `GameState` already exists");

        let stale = WorldError::StaleComponent {
            entity: Entity::from_raw(4),
            component: "Name",
        };
        assert_eq!(
            stale.to_string(),
            "Entity(4) holds a stale handle for component `Name`"
        );

        let config = WorldError::InvalidConfig {
            key: "ECS_TICK_RATE",
            value: "fast".to_string(),
        };
        assert_eq!(
            config.to_string(),
            "invalid value `fast` for `ECS_TICK_RATE`"
        );
    }
}
