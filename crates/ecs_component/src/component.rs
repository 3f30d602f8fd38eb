//! Core [`Component`] and [`Resource`] traits.
//!
//! Every piece of data attached to an entity must implement [`Component`];
//! every world-wide singleton must implement [`Resource`]. Both traits require
//! `Send + Sync + 'static` so the read-only run phase of a tick can in
//! principle be spread across threads.
//!
//! Implementing the trait is the whole contract: the runtime never looks
//! inside a component, it only routes values by type.

/// The core component trait.
///
/// # Examples
///
/// ```rust
/// use ecs_component::Component;
///
/// #[derive(Debug, Clone)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {}
/// ```
pub trait Component: Send + Sync + 'static {
    /// A human-readable name for this component type, used in logs and
    /// panic messages.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A process-wide singleton value, keyed by its type.
///
/// At most one value of each resource type lives in a world at a time.
///
/// ```rust
/// use ecs_component::Resource;
///
/// struct GameState {
///     round: u32,
/// }
///
/// impl Resource for GameState {
///     fn type_name() -> &'static str {
///         "GameState"
///     }
/// }
/// ```
pub trait Resource: Send + Sync + 'static {
    /// A human-readable name for this resource type.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}
