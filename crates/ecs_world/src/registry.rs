//! System registry: the startup and update systems of a world, in
//! registration order.

use std::fmt;

use crate::commands::Commands;
use crate::query::Queryer;
use crate::resources::Resources;

/// A boxed startup system.
pub type StartupSystem = Box<dyn FnMut(&mut Commands<'_>) + Send>;

/// A boxed update system.
pub type UpdateSystem = Box<dyn FnMut(&mut Commands<'_>, Queryer<'_>, Resources<'_>) + Send>;

/// When a system runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Once, from `World::startup`.
    Startup,
    /// On every `World::update`.
    Update,
}

/// Information about a registered system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    /// The system's human-readable name.
    pub name: String,
    /// Which phase runs it.
    pub stage: Stage,
    /// Position within its stage; commands are committed in this order.
    pub order: usize,
}

pub(crate) struct Registered<S> {
    pub(crate) info: SystemInfo,
    pub(crate) system: S,
}

/// Registry of every system known to a world.
#[derive(Default)]
pub struct SystemRegistry {
    startup: Vec<Registered<StartupSystem>>,
    update: Vec<Registered<UpdateSystem>>,
}

impl SystemRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a startup system.
    pub fn add_startup(&mut self, name: impl Into<String>, system: StartupSystem) -> &SystemInfo {
        let info = SystemInfo {
            name: name.into(),
            stage: Stage::Startup,
            order: self.startup.len(),
        };
        self.startup.push(Registered { info, system });
        &self.startup[self.startup.len() - 1].info
    }

    /// Appends an update system.
    pub fn add_update(&mut self, name: impl Into<String>, system: UpdateSystem) -> &SystemInfo {
        let info = SystemInfo {
            name: name.into(),
            stage: Stage::Update,
            order: self.update.len(),
        };
        self.update.push(Registered { info, system });
        &self.update[self.update.len() - 1].info
    }

    /// Returns the first system registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SystemInfo> {
        self.iter().find(|info| info.name == name)
    }

    /// Iterates over startup systems, then update systems, each in
    /// registration order.
    pub fn iter(&self) -> impl Iterator<Item = &SystemInfo> {
        self.startup
            .iter()
            .map(|r| &r.info)
            .chain(self.update.iter().map(|r| &r.info))
    }

    /// Returns the number of startup systems.
    #[must_use]
    pub fn startup_count(&self) -> usize {
        self.startup.len()
    }

    /// Returns the number of update systems.
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.update.len()
    }

    /// Returns the total number of systems.
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.startup.len() + self.update.len()
    }

    pub(crate) fn startup_mut(&mut self) -> &mut [Registered<StartupSystem>] {
        &mut self.startup
    }

    pub(crate) fn update_mut(&mut self) -> &mut [Registered<UpdateSystem>] {
        &mut self.update
    }
}

impl fmt::Debug for SystemRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_startup() -> StartupSystem {
        Box::new(|_commands: &mut Commands<'_>| {})
    }

    fn noop_update() -> UpdateSystem {
        Box::new(
            |_commands: &mut Commands<'_>, _queryer: Queryer<'_>, _resources: Resources<'_>| {},
        )
    }

    #[test]
    fn test_register_in_order() {
        let mut registry = SystemRegistry::new();
        registry.add_update("physics", noop_update());
        registry.add_startup("spawn", noop_startup());
        registry.add_update("render", noop_update());

        assert_eq!(registry.startup_count(), 1);
        assert_eq!(registry.update_count(), 2);
        assert_eq!(registry.system_count(), 3);

        let names: Vec<&str> = registry.iter().map(|info| info.name.as_str()).collect();
        assert_eq!(names, vec!["spawn", "physics", "render"]);
    }

    #[test]
    fn test_order_is_per_stage() {
        let mut registry = SystemRegistry::new();
        let first = registry.add_update("a", noop_update()).order;
        let startup = registry.add_startup("b", noop_startup()).order;
        let second = registry.add_update("c", noop_update()).order;
        assert_eq!((first, startup, second), (0, 0, 1));
    }

    #[test]
    fn test_get_by_name() {
        let mut registry = SystemRegistry::new();
        registry.add_update("physics", noop_update());
        let info = registry.get("physics").unwrap();
        assert_eq!(info.stage, Stage::Update);
        assert!(registry.get("ai").is_none());
    }

    #[test]
    fn test_duplicate_names_are_kept() {
        let mut registry = SystemRegistry::new();
        registry.add_update("physics", noop_update());
        registry.add_update("physics", noop_update());
        assert_eq!(registry.update_count(), 2);
        assert_eq!(registry.get("physics").map(|info| info.order), Some(0));
    }
}
