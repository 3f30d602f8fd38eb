//! World configuration.

/// Configuration for a [`World`](crate::World).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldConfig {
    /// Human-readable world name, attached to log records.
    pub name: String,
    /// Slots reserved up front in every newly registered component pool.
    pub pool_capacity: usize,
}

impl WorldConfig {
    /// Create a new world config with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pool_capacity: 0,
        }
    }

    /// Override the world name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Reserve `capacity` slots in each component pool when it is created.
    #[must_use]
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self::new("world")
    }
}
