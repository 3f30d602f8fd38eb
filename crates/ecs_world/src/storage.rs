//! Component storage for the world.
//!
//! [`ComponentStorage`] owns three structures that are kept as mirror images
//! of each other at every committed state:
//!
//! - the **entity store**: live entity → (component type id → pool handle);
//! - one [`ObjectPool`] per component type, holding the values;
//! - one [`SparseSet`] per component type, holding the member entities.
//!
//! An entity has component `T` exactly when its entity-store record holds a
//! handle for `T`'s id, the handle is live in `T`'s pool, and the entity is a
//! member of `T`'s sparse set. Every mutator below keeps all three in step.
//! Mutation only happens while commands are being committed.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use ecs_component::{
    Component, ComponentSpace, ComponentTypeId, Entity, ObjectPool, PoolHandle, SparseSet,
    TypeRegistry,
};

use crate::error::WorldError;

/// The component handles owned by one entity, keyed by component type.
pub type ComponentSet = BTreeMap<ComponentTypeId, PoolHandle>;

/// Type-erased operations on an `ObjectPool<T>`, bound once per component
/// type when the type is registered.
trait ErasedPool: Send + Sync {
    /// Drops the object behind `handle`. Returns `false` if it was not live.
    fn release(&mut self, handle: PoolHandle) -> bool;
    fn len(&self) -> usize;
    fn clear(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedPool for ObjectPool<T> {
    fn release(&mut self, handle: PoolHandle) -> bool {
        ObjectPool::release(self, handle).is_some()
    }

    fn len(&self) -> usize {
        ObjectPool::len(self)
    }

    fn clear(&mut self) {
        ObjectPool::clear(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn typed_pool_mut<T: Component>(
    pools: &mut [Box<dyn ErasedPool>],
    id: ComponentTypeId,
) -> &mut ObjectPool<T> {
    match pools
        .get_mut(id.index())
        .and_then(|pool| pool.as_any_mut().downcast_mut::<ObjectPool<T>>())
    {
        Some(pool) => pool,
        None => panic!("pool for {id} does not store `{}`", T::type_name()),
    }
}

/// Entity store, per-type pools and per-type membership indices.
pub struct ComponentStorage {
    /// Component type ids, assigned on first use.
    registry: TypeRegistry<ComponentSpace>,
    /// One pool per registered type, indexed by type id.
    pools: Vec<Box<dyn ErasedPool>>,
    /// One membership index per registered type, indexed by type id.
    indices: Vec<SparseSet>,
    /// Live entities and the handles of the components they own.
    entities: HashMap<Entity, ComponentSet>,
    /// Slots reserved in each pool when it is created.
    pool_capacity: usize,
}

impl ComponentStorage {
    /// Create empty storage. New pools reserve `pool_capacity` slots.
    #[must_use]
    pub fn new(pool_capacity: usize) -> Self {
        Self {
            registry: TypeRegistry::new(),
            pools: Vec::new(),
            indices: Vec::new(),
            entities: HashMap::new(),
            pool_capacity,
        }
    }

    /// Returns the id of `T`, registering it (and creating its pool and
    /// index) on first use.
    pub fn register<T: Component>(&mut self) -> ComponentTypeId {
        if let Some(id) = self.registry.get::<T>() {
            return id;
        }

        let id = self.registry.register::<T>(T::type_name());
        self.pools
            .push(Box::new(ObjectPool::<T>::with_capacity(self.pool_capacity)));
        self.indices.push(SparseSet::new());
        id
    }

    /// Returns the id of `T` if it has been registered.
    #[must_use]
    pub fn component_id<T: Component>(&self) -> Option<ComponentTypeId> {
        self.registry.get::<T>()
    }

    /// Returns the name registered for a component id.
    #[must_use]
    pub fn component_name(&self, id: ComponentTypeId) -> &'static str {
        self.registry.name(id).unwrap_or("<unregistered>")
    }

    /// Returns the number of registered component types.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    /// Makes `entity` live with no components. Returns `false` if it already was.
    pub fn spawn(&mut self, entity: Entity) -> bool {
        if self.entities.contains_key(&entity) {
            return false;
        }
        self.entities.insert(entity, ComponentSet::new());
        true
    }

    /// Attaches `value` to a live entity, overwriting an existing `T` in place.
    ///
    /// Returns `false` (dropping `value`) if the entity is not live.
    pub fn insert<T: Component>(&mut self, entity: Entity, value: T) -> bool {
        let id = self.register::<T>();
        let Some(components) = self.entities.get_mut(&entity) else {
            return false;
        };

        let pool = typed_pool_mut::<T>(&mut self.pools, id);
        match components.get(&id) {
            Some(&handle) => {
                if pool.replace(handle, value).is_none() {
                    self.stale(entity, id);
                }
            }
            None => {
                let handle = pool.allocate(value);
                components.insert(id, handle);
                self.indices[id.index()].insert(entity);
            }
        }
        true
    }

    /// Detaches and returns the `T` owned by `entity`.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        let id = self.component_id::<T>()?;
        let handle = self.entities.get_mut(&entity)?.remove(&id)?;
        self.indices[id.index()].remove(entity);

        let value = typed_pool_mut::<T>(&mut self.pools, id).release(handle);
        if value.is_none() {
            self.stale(entity, id);
        }
        value
    }

    /// Detaches and drops the component `id` owned by `entity`.
    ///
    /// Returns `false` if the entity is not live or has no such component.
    pub fn remove_by_id(&mut self, entity: Entity, id: ComponentTypeId) -> bool {
        let Some(handle) = self
            .entities
            .get_mut(&entity)
            .and_then(|components| components.remove(&id))
        else {
            return false;
        };

        self.indices[id.index()].remove(entity);
        if !self.pools[id.index()].release(handle) {
            self.stale(entity, id);
        }
        true
    }

    /// Removes `entity`, returning every component slot to its pool and
    /// dropping it from every membership index.
    ///
    /// Returns `false` if the entity was not live.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        let Some(components) = self.entities.remove(&entity) else {
            return false;
        };

        for (id, handle) in components {
            self.indices[id.index()].remove(entity);
            if !self.pools[id.index()].release(handle) {
                self.stale(entity, id);
            }
        }
        true
    }

    /// Returns the `T` owned by `entity`.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        let id = self.component_id::<T>()?;
        let handle = *self.entities.get(&entity)?.get(&id)?;
        self.pools
            .get(id.index())?
            .as_any()
            .downcast_ref::<ObjectPool<T>>()?
            .get(handle)
    }

    /// Returns `true` if `entity` owns a `T`.
    #[must_use]
    pub fn contains<T: Component>(&self, entity: Entity) -> bool {
        self.component_id::<T>()
            .is_some_and(|id| self.contains_id(entity, id))
    }

    /// Returns `true` if `entity` owns a component with the given id.
    #[must_use]
    pub fn contains_id(&self, entity: Entity, id: ComponentTypeId) -> bool {
        self.indices
            .get(id.index())
            .is_some_and(|index| index.contains(entity))
    }

    /// Returns the membership index of a component type.
    #[must_use]
    pub fn index(&self, id: ComponentTypeId) -> Option<&SparseSet> {
        self.indices.get(id.index())
    }

    /// Returns the component handles owned by `entity`.
    #[must_use]
    pub fn components_of(&self, entity: Entity) -> Option<&ComponentSet> {
        self.entities.get(&entity)
    }

    /// Returns `true` if `entity` is live.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Returns the number of live objects in a component type's pool.
    #[must_use]
    pub fn pool_len(&self, id: ComponentTypeId) -> usize {
        self.pools.get(id.index()).map_or(0, |pool| pool.len())
    }

    /// Drops every entity and component and forgets every type registration.
    pub fn clear(&mut self) {
        self.entities.clear();
        for pool in &mut self.pools {
            pool.clear();
        }
        self.pools.clear();
        self.indices.clear();
        self.registry.clear();
    }

    /// Checks that the entity store, pools and indices mirror each other.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        let mut owned = vec![0usize; self.indices.len()];
        for (&entity, components) in &self.entities {
            for &id in components.keys() {
                if !self.contains_id(entity, id) {
                    return false;
                }
                owned[id.index()] += 1;
            }
        }
        self.indices.iter().enumerate().all(|(i, index)| {
            index.len() == owned[i]
                && self.pools[i].len() == owned[i]
                && index.iter().all(|entity| {
                    self.entities
                        .get(&entity)
                        .is_some_and(|components| components.contains_key(&ComponentTypeId::from_raw(i as u32)))
                })
        })
    }

    fn stale(&self, entity: Entity, id: ComponentTypeId) -> ! {
        panic!(
            "{}",
            WorldError::StaleComponent {
                entity,
                component: self.component_name(id),
            }
        )
    }
}

impl Default for ComponentStorage {
    fn default() -> Self {
        Self::new(0)
    }
}

impl fmt::Debug for ComponentStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentStorage")
            .field("registry", &self.registry)
            .field("entities", &self.entities.len())
            .field(
                "pool_lens",
                &self.pools.iter().map(|pool| pool.len()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
