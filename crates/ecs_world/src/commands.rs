//! Deferred mutation buffers.
//!
//! Systems never touch world state directly. Each system gets its own
//! [`Commands`], stages spawns, destroys, component edits and resource
//! writes into it, and the world applies every buffer once all systems of
//! the tick have returned.

use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

use ecs_component::{Component, Entity, EntityAllocator, Resource};
use tracing::debug;

use crate::error::WorldError;
use crate::resources::ResourceStore;
use crate::storage::ComponentStorage;

/// A component value waiting to be written into storage.
///
/// Implemented internally for every [`Component`]; used by [`Bundle`].
#[doc(hidden)]
pub trait StagedComponent: Send {
    /// Writes the value onto `entity`. Returns `false` if the entity is not live.
    fn write(self: Box<Self>, storage: &mut ComponentStorage, entity: Entity) -> bool;
}

struct Staged<T>(T);

impl<T: Component> StagedComponent for Staged<T> {
    fn write(self: Box<Self>, storage: &mut ComponentStorage, entity: Entity) -> bool {
        storage.insert(entity, self.0)
    }
}

/// A set of components spawned together.
///
/// Implemented for `()` and for tuples of up to eight components.
pub trait Bundle: Send + 'static {
    #[doc(hidden)]
    fn stage(self, out: &mut Vec<Box<dyn StagedComponent>>);
}

impl Bundle for () {
    fn stage(self, _out: &mut Vec<Box<dyn StagedComponent>>) {}
}

macro_rules! impl_bundle {
    ($($name:ident),+) => {
        impl<$($name: Component),+> Bundle for ($($name,)+) {
            #[allow(non_snake_case)]
            fn stage(self, out: &mut Vec<Box<dyn StagedComponent>>) {
                let ($($name,)+) = self;
                $(out.push(Box::new(Staged($name)));)+
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

/// A resource operation waiting to be applied.
trait ResourceCommand: Send {
    /// Applies the operation. Returns `true` if the store changed.
    fn apply(self: Box<Self>, store: &mut ResourceStore) -> bool;
}

struct SetResource<T>(T);

impl<T: Resource> ResourceCommand for SetResource<T> {
    fn apply(self: Box<Self>, store: &mut ResourceStore) -> bool {
        if let Err(err) = store.insert(self.0) {
            panic!("{err}");
        }
        true
    }
}

struct ReplaceResource<T>(T);

impl<T: Resource> ResourceCommand for ReplaceResource<T> {
    fn apply(self: Box<Self>, store: &mut ResourceStore) -> bool {
        store.replace(self.0);
        true
    }
}

struct RemoveResource<T>(PhantomData<fn() -> T>);

impl<T: Resource> ResourceCommand for RemoveResource<T> {
    fn apply(self: Box<Self>, store: &mut ResourceStore) -> bool {
        store.remove::<T>().is_some()
    }
}

struct PendingSpawn {
    entity: Entity,
    components: Vec<Box<dyn StagedComponent>>,
}

enum ComponentCommand {
    Insert {
        entity: Entity,
        component: Box<dyn StagedComponent>,
    },
    Remove {
        entity: Entity,
        remove: fn(&mut ComponentStorage, Entity) -> bool,
    },
}

/// Counters reported by [`CommandBuffer::apply`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CommitStats {
    pub resources_removed: usize,
    pub destroyed: usize,
    pub spawned: usize,
    pub components_inserted: usize,
    pub components_removed: usize,
    pub resources_written: usize,
    /// Commands dropped because their target entity was not live.
    pub skipped: usize,
}

impl CommitStats {
    /// Adds another buffer's counters to these.
    pub fn merge(&mut self, other: CommitStats) {
        self.resources_removed += other.resources_removed;
        self.destroyed += other.destroyed;
        self.spawned += other.spawned;
        self.components_inserted += other.components_inserted;
        self.components_removed += other.components_removed;
        self.resources_written += other.resources_written;
        self.skipped += other.skipped;
    }
}

/// The owned, staged output of one system's [`Commands`].
#[derive(Default)]
pub struct CommandBuffer {
    resource_removals: Vec<Box<dyn ResourceCommand>>,
    destroys: Vec<Entity>,
    spawns: Vec<PendingSpawn>,
    component_ops: Vec<ComponentCommand>,
    resource_writes: Vec<Box<dyn ResourceCommand>>,
    /// Resource types with a staged set or replace.
    pending_writes: HashSet<TypeId>,
    /// Resource types with a staged removal.
    pending_removals: HashSet<TypeId>,
}

impl CommandBuffer {
    /// Returns the number of staged operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resource_removals.len()
            + self.destroys.len()
            + self.spawns.len()
            + self.component_ops.len()
            + self.resource_writes.len()
    }

    /// Returns `true` if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies the staged operations in commit order: resource removals,
    /// destroys, spawns, component edits, then resource writes.
    ///
    /// # Panics
    ///
    /// Panics if a staged `set_resource` finds the resource already present.
    pub fn apply(
        self,
        storage: &mut ComponentStorage,
        resources: &mut ResourceStore,
    ) -> CommitStats {
        let mut stats = CommitStats::default();

        for op in self.resource_removals {
            if op.apply(resources) {
                stats.resources_removed += 1;
            }
        }

        let mut spawns = self.spawns;
        for entity in self.destroys {
            if storage.despawn(entity) {
                stats.destroyed += 1;
            } else if let Some(pending) = spawns.iter().position(|s| s.entity == entity) {
                // Spawned and destroyed by the same buffer: it never materializes.
                spawns.remove(pending);
                stats.destroyed += 1;
            } else {
                debug!(%entity, "destroy skipped: entity is not alive");
                stats.skipped += 1;
            }
        }

        for spawn in spawns {
            storage.spawn(spawn.entity);
            for component in spawn.components {
                component.write(storage, spawn.entity);
            }
            stats.spawned += 1;
        }

        for op in self.component_ops {
            match op {
                ComponentCommand::Insert { entity, component } => {
                    if component.write(storage, entity) {
                        stats.components_inserted += 1;
                    } else {
                        debug!(%entity, "insert skipped: entity is not alive");
                        stats.skipped += 1;
                    }
                }
                ComponentCommand::Remove { entity, remove } => {
                    if remove(storage, entity) {
                        stats.components_removed += 1;
                    }
                }
            }
        }

        for op in self.resource_writes {
            op.apply(resources);
            stats.resources_written += 1;
        }

        stats
    }
}

impl fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("resource_removals", &self.resource_removals.len())
            .field("destroys", &self.destroys)
            .field(
                "spawns",
                &self.spawns.iter().map(|s| s.entity).collect::<Vec<_>>(),
            )
            .field("component_ops", &self.component_ops.len())
            .field("resource_writes", &self.resource_writes.len())
            .finish()
    }
}

/// Per-system mutation buffer handed to every system during a tick.
///
/// Reads the world only to hand out entity ids and to check resource
/// presence; everything else is staged and applied at commit.
pub struct Commands<'w> {
    allocator: &'w EntityAllocator,
    resources: &'w ResourceStore,
    buffer: CommandBuffer,
}

impl<'w> Commands<'w> {
    pub(crate) fn new(allocator: &'w EntityAllocator, resources: &'w ResourceStore) -> Self {
        Self {
            allocator,
            resources,
            buffer: CommandBuffer::default(),
        }
    }

    /// Stages a new entity carrying `bundle`.
    ///
    /// The id is assigned immediately so it can be referenced by other
    /// commands in the same tick; the entity itself appears at commit.
    pub fn spawn<B: Bundle>(&mut self, bundle: B) -> Entity {
        let entity = self.allocator.allocate();
        let mut components = Vec::new();
        bundle.stage(&mut components);
        self.buffer.spawns.push(PendingSpawn { entity, components });
        entity
    }

    /// Stages the destruction of `entity` and all its components.
    pub fn destroy(&mut self, entity: Entity) -> &mut Self {
        self.buffer.destroys.push(entity);
        self
    }

    /// Stages attaching `component` to `entity`, overwriting any existing `T`.
    pub fn insert<T: Component>(&mut self, entity: Entity, component: T) -> &mut Self {
        self.buffer.component_ops.push(ComponentCommand::Insert {
            entity,
            component: Box::new(Staged(component)),
        });
        self
    }

    /// Stages detaching `T` from `entity`. A missing component is a no-op.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> &mut Self {
        let remove: fn(&mut ComponentStorage, Entity) -> bool =
            |storage, entity| storage.remove::<T>(entity).is_some();
        self.buffer
            .component_ops
            .push(ComponentCommand::Remove { entity, remove });
        self
    }

    /// Stages creating resource `T`.
    ///
    /// # Panics
    ///
    /// Panics if a `T` already exists or is already staged in this buffer.
    /// Use [`try_set_resource`](Self::try_set_resource) to get the error
    /// instead.
    #[track_caller]
    pub fn set_resource<T: Resource>(&mut self, value: T) -> &mut Self {
        if let Err(err) = self.stage_set(value) {
            panic!("{err}");
        }
        self
    }

    /// Stages creating resource `T`, failing if a `T` already exists.
    ///
    /// A removal of `T` staged earlier in this buffer frees the slot.
    pub fn try_set_resource<T: Resource>(&mut self, value: T) -> Result<&mut Self, WorldError> {
        self.stage_set(value)?;
        Ok(self)
    }

    /// Stages overwriting resource `T`, creating it if absent.
    pub fn replace_resource<T: Resource>(&mut self, value: T) -> &mut Self {
        self.buffer.pending_writes.insert(TypeId::of::<T>());
        self.buffer
            .resource_writes
            .push(Box::new(ReplaceResource(value)));
        self
    }

    /// Stages dropping resource `T`. A missing resource is a no-op.
    pub fn remove_resource<T: Resource>(&mut self) -> &mut Self {
        self.buffer.pending_removals.insert(TypeId::of::<T>());
        self.buffer
            .resource_removals
            .push(Box::new(RemoveResource::<T>(PhantomData)));
        self
    }

    /// Returns the number of staged operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns `true` if nothing has been staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consumes the commands, keeping only the staged operations.
    #[must_use]
    pub fn into_buffer(self) -> CommandBuffer {
        self.buffer
    }

    fn stage_set<T: Resource>(&mut self, value: T) -> Result<(), WorldError> {
        let key = TypeId::of::<T>();
        let present =
            self.resources.contains::<T>() && !self.buffer.pending_removals.contains(&key);
        if present || self.buffer.pending_writes.contains(&key) {
            return Err(WorldError::DuplicateResource {
                name: T::type_name(),
            });
        }

        self.buffer.pending_writes.insert(key);
        self.buffer.resource_writes.push(Box::new(SetResource(value)));
        Ok(())
    }
}

impl fmt::Debug for Commands<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Commands")
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}
