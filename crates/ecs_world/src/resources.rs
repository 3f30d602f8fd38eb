//! Resource storage: at most one value per resource type.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use ecs_component::{Resource, ResourceSpace, ResourceTypeId, TypeRegistry};

use crate::error::WorldError;

/// Holds the world's resources, keyed by their registered type id.
#[derive(Default)]
pub struct ResourceStore {
    registry: TypeRegistry<ResourceSpace>,
    values: HashMap<ResourceTypeId, Box<dyn Any + Send + Sync>>,
}

impl ResourceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `T`, registering it on first use.
    pub fn register<T: Resource>(&mut self) -> ResourceTypeId {
        self.registry.register::<T>(T::type_name())
    }

    /// Returns the id of `T` if it has been registered.
    #[must_use]
    pub fn resource_id<T: Resource>(&self) -> Option<ResourceTypeId> {
        self.registry.get::<T>()
    }

    /// Returns `true` if a `T` is present.
    #[must_use]
    pub fn contains<T: Resource>(&self) -> bool {
        self.resource_id::<T>()
            .is_some_and(|id| self.values.contains_key(&id))
    }

    /// Returns the present `T`.
    #[must_use]
    pub fn get<T: Resource>(&self) -> Option<&T> {
        let id = self.resource_id::<T>()?;
        self.values.get(&id)?.downcast_ref::<T>()
    }

    /// Returns the present `T` mutably.
    pub fn get_mut<T: Resource>(&mut self) -> Option<&mut T> {
        let id = self.resource_id::<T>()?;
        self.values.get_mut(&id)?.downcast_mut::<T>()
    }

    /// Stores `value`, failing if a `T` is already present.
    pub fn insert<T: Resource>(&mut self, value: T) -> Result<(), WorldError> {
        let id = self.register::<T>();
        if self.values.contains_key(&id) {
            return Err(WorldError::DuplicateResource {
                name: T::type_name(),
            });
        }
        self.values.insert(id, Box::new(value));
        Ok(())
    }

    /// Stores `value` unconditionally and returns the previous `T`, if any.
    pub fn replace<T: Resource>(&mut self, value: T) -> Option<T> {
        let id = self.register::<T>();
        self.values
            .insert(id, Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    /// Removes and returns the present `T`.
    pub fn remove<T: Resource>(&mut self) -> Option<T> {
        let id = self.resource_id::<T>()?;
        self.values
            .remove(&id)?
            .downcast::<T>()
            .ok()
            .map(|value| *value)
    }

    /// Returns the number of present resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no resource is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drops every resource and forgets every type registration.
    pub fn clear(&mut self) {
        self.values.clear();
        self.registry.clear();
    }
}

impl fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceStore")
            .field("registry", &self.registry)
            .field("present", &self.values.len())
            .finish()
    }
}

/// Read-only access to the world's resources during the run phase.
#[derive(Clone, Copy)]
pub struct Resources<'w> {
    store: &'w ResourceStore,
}

impl<'w> Resources<'w> {
    pub(crate) fn new(store: &'w ResourceStore) -> Self {
        Self { store }
    }

    /// Returns `true` if a `T` is present.
    #[must_use]
    pub fn has<T: Resource>(&self) -> bool {
        self.store.contains::<T>()
    }

    /// Returns the present `T`.
    #[must_use]
    pub fn get<T: Resource>(&self) -> Option<&'w T> {
        self.store.get::<T>()
    }

    /// Returns the number of present resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if no resource is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl fmt::Debug for Resources<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.store, f)
    }
}
