//! The world and its two-phase tick.
//!
//! A [`World`] owns every entity, component, resource and system. Each call
//! to [`World::startup`] or [`World::update`] is one tick:
//!
//! 1. **Run.** Every system of the stage runs in registration order against
//!    the state committed by the previous tick. Systems only read the world
//!    and write into their own [`Commands`].
//! 2. **Commit.** Every system's buffer is applied, again in registration
//!    order. Nothing staged during a tick is visible until the next one.
//!
//! The run phase holds `&World` and the commit phase `&mut World`, so the
//! borrow checker enforces that systems never observe a half-applied tick.

use tracing::{debug, info, trace};

use ecs_component::{Component, ComponentTypeId, Entity, EntityAllocator, Resource, ResourceTypeId};

use crate::commands::{CommandBuffer, Commands, CommitStats};
use crate::config::WorldConfig;
use crate::error::WorldError;
use crate::query::Queryer;
use crate::registry::{Stage, SystemRegistry};
use crate::resources::{ResourceStore, Resources};
use crate::storage::ComponentStorage;

/// Owns all entity, component and resource state plus the registered
/// systems, and drives the run/commit tick.
#[derive(Debug)]
pub struct World {
    /// Name and storage tuning.
    config: WorldConfig,
    /// Entity ID allocator. Shared with every `Commands` during a tick.
    allocator: EntityAllocator,
    /// Entity store, pools and membership indices.
    components: ComponentStorage,
    /// World-wide singletons.
    resources: ResourceStore,
    /// Startup and update systems.
    systems: SystemRegistry,
    /// Number of completed `update` calls.
    tick_id: u64,
}

impl World {
    /// Create a new empty world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Create a new empty world.
    #[must_use]
    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            components: ComponentStorage::new(config.pool_capacity),
            config,
            allocator: EntityAllocator::new(),
            resources: ResourceStore::new(),
            systems: SystemRegistry::new(),
            tick_id: 0,
        }
    }

    /// Returns the world's configuration.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Registers a system run once by [`startup`](Self::startup).
    pub fn add_startup_system<F>(&mut self, system: F) -> &mut Self
    where
        F: FnMut(&mut Commands<'_>) + Send + 'static,
    {
        self.add_named_startup_system(std::any::type_name::<F>(), system)
    }

    /// Registers a named system run once by [`startup`](Self::startup).
    pub fn add_named_startup_system<F>(&mut self, name: impl Into<String>, system: F) -> &mut Self
    where
        F: FnMut(&mut Commands<'_>) + Send + 'static,
    {
        self.systems.add_startup(name, Box::new(system));
        self
    }

    /// Registers a system run by every [`update`](Self::update).
    pub fn add_system<F>(&mut self, system: F) -> &mut Self
    where
        F: FnMut(&mut Commands<'_>, Queryer<'_>, Resources<'_>) + Send + 'static,
    {
        self.add_named_system(std::any::type_name::<F>(), system)
    }

    /// Registers a named system run by every [`update`](Self::update).
    pub fn add_named_system<F>(&mut self, name: impl Into<String>, system: F) -> &mut Self
    where
        F: FnMut(&mut Commands<'_>, Queryer<'_>, Resources<'_>) + Send + 'static,
    {
        self.systems.add_update(name, Box::new(system));
        self
    }

    /// Returns the registered systems.
    #[must_use]
    pub fn systems(&self) -> &SystemRegistry {
        &self.systems
    }

    /// Creates resource `T` immediately.
    ///
    /// # Panics
    ///
    /// Panics if a `T` already exists.
    #[track_caller]
    pub fn set_resource<T: Resource>(&mut self, value: T) -> &mut Self {
        if let Err(err) = self.resources.insert(value) {
            panic!("{err}");
        }
        self
    }

    /// Creates resource `T` immediately, failing if a `T` already exists.
    pub fn try_set_resource<T: Resource>(&mut self, value: T) -> Result<&mut Self, WorldError> {
        self.resources.insert(value)?;
        Ok(self)
    }

    /// Overwrites (or creates) resource `T`, returning the previous value.
    pub fn replace_resource<T: Resource>(&mut self, value: T) -> Option<T> {
        self.resources.replace(value)
    }

    /// Drops resource `T`, returning it.
    pub fn remove_resource<T: Resource>(&mut self) -> Option<T> {
        self.resources.remove::<T>()
    }

    /// Returns resource `T`.
    #[must_use]
    pub fn resource<T: Resource>(&self) -> Option<&T> {
        self.resources.get::<T>()
    }

    /// Returns resource `T` mutably.
    pub fn resource_mut<T: Resource>(&mut self) -> Option<&mut T> {
        self.resources.get_mut::<T>()
    }

    /// Assigns `T` its component id (and creates its pool and index) now
    /// rather than at first commit.
    pub fn register_component<T: Component>(&mut self) -> ComponentTypeId {
        self.components.register::<T>()
    }

    /// Assigns `T` its resource id now rather than at first use.
    pub fn register_resource<T: Resource>(&mut self) -> ResourceTypeId {
        self.resources.register::<T>()
    }

    /// Returns a query executor over the committed state.
    #[must_use]
    pub fn queryer(&self) -> Queryer<'_> {
        Queryer::new(&self.components)
    }

    /// Returns a read-only view of the resources.
    #[must_use]
    pub fn resources(&self) -> Resources<'_> {
        Resources::new(&self.resources)
    }

    /// Runs every startup system, then commits their commands.
    pub fn startup(&mut self) -> CommitStats {
        info!(
            world = %self.config.name,
            systems = self.systems.startup_count(),
            "world startup"
        );

        let buffers = self.run_startup();
        self.commit(Stage::Startup, buffers)
    }

    /// Runs every update system, then commits their commands.
    pub fn update(&mut self) -> CommitStats {
        self.tick_id += 1;
        let buffers = self.run_update();
        self.commit(Stage::Update, buffers)
    }

    /// Drops every entity, component and resource and forgets all type ids.
    /// Registered systems are kept.
    pub fn shutdown(&mut self) {
        info!(
            world = %self.config.name,
            entities = self.components.entity_count(),
            resources = self.resources.len(),
            ticks = self.tick_id,
            "world shutdown"
        );

        self.components.clear();
        self.resources.clear();
    }

    /// Returns the number of completed updates.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.components.entity_count()
    }

    /// Returns `true` if `entity` is live.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.components.is_alive(entity)
    }

    fn run_startup(&mut self) -> Vec<CommandBuffer> {
        let Self {
            allocator,
            resources,
            systems,
            ..
        } = self;

        let mut buffers = Vec::with_capacity(systems.startup_count());
        for registered in systems.startup_mut() {
            let mut commands = Commands::new(allocator, resources);
            (registered.system)(&mut commands);
            trace!(system = %registered.info.name, staged = commands.len(), "system ran");
            buffers.push(commands.into_buffer());
        }
        buffers
    }

    fn run_update(&mut self) -> Vec<CommandBuffer> {
        let Self {
            allocator,
            components,
            resources,
            systems,
            ..
        } = self;

        let mut buffers = Vec::with_capacity(systems.update_count());
        for registered in systems.update_mut() {
            let mut commands = Commands::new(allocator, resources);
            (registered.system)(
                &mut commands,
                Queryer::new(components),
                Resources::new(resources),
            );
            trace!(system = %registered.info.name, staged = commands.len(), "system ran");
            buffers.push(commands.into_buffer());
        }
        buffers
    }

    fn commit(&mut self, stage: Stage, buffers: Vec<CommandBuffer>) -> CommitStats {
        let mut stats = CommitStats::default();
        for buffer in buffers {
            stats.merge(buffer.apply(&mut self.components, &mut self.resources));
        }

        debug!(
            world = %self.config.name,
            tick_id = self.tick_id,
            ?stage,
            spawned = stats.spawned,
            destroyed = stats.destroyed,
            inserted = stats.components_inserted,
            removed = stats.components_removed,
            resource_writes = stats.resources_written,
            resource_removals = stats.resources_removed,
            skipped = stats.skipped,
            entities = self.components.entity_count(),
            "commit complete"
        );
        stats
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Name(String);
    impl Component for Name {}

    #[derive(Debug, Clone, PartialEq)]
    struct Id(u32);
    impl Component for Id {}

    #[derive(Debug, Clone, PartialEq)]
    struct Tag;
    impl Component for Tag {}

    #[derive(Debug, PartialEq)]
    struct GameState {
        round: u32,
    }
    impl Resource for GameState {
        fn type_name() -> &'static str {
            "GameState"
        }
    }

    fn name(s: &str) -> Name {
        Name(s.to_string())
    }

    #[test]
    fn test_query_pair_excludes_missing_third_type() {
        let mut world = World::new();
        world.add_startup_system(|commands| {
            commands.spawn((name("ab"), Id(1)));
            commands.spawn((name("abc"), Id(2), Tag));
        });
        world.startup();

        let queryer = world.queryer();
        let ab = queryer.query::<(Name, Id)>();
        let abc = queryer.query::<(Name, Id, Tag)>();
        assert_eq!(ab.len(), 2);
        assert_eq!(abc.len(), 1);
        assert_eq!(queryer.get::<Name>(abc[0]), Some(&name("abc")));
        assert!(world.components.is_consistent());
    }

    #[test]
    fn test_concrete_scenario() {
        let seen: Arc<Mutex<Vec<(Vec<Entity>, Vec<Entity>)>>> = Arc::default();
        let spawned: Arc<Mutex<Vec<Entity>>> = Arc::default();

        let mut world = World::new();
        let out = Arc::clone(&spawned);
        world.add_startup_system(move |commands| {
            let e0 = commands.spawn((name("A"),));
            let e1 = commands.spawn((name("A"), Id(1)));
            out.lock().unwrap().extend([e0, e1]);
        });
        let out = Arc::clone(&seen);
        world.add_system(move |_commands, queryer, _resources| {
            out.lock()
                .unwrap()
                .push((queryer.query::<(Name,)>(), queryer.query::<(Name, Id)>()));
        });

        world.startup();
        world.update();

        let spawned = spawned.lock().unwrap().clone();
        let (e0, e1) = (spawned[0], spawned[1]);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[(vec![e0, e1], vec![e1])]);
    }

    #[test]
    fn test_round_trip_values() {
        let mut world = World::new();
        let spawned: Arc<Mutex<Option<Entity>>> = Arc::default();
        let out = Arc::clone(&spawned);
        world.add_startup_system(move |commands| {
            *out.lock().unwrap() = Some(commands.spawn((name("X"), Id(1))));
        });
        world.startup();

        let e = spawned.lock().unwrap().unwrap();
        let queryer = world.queryer();
        assert_eq!(queryer.get::<Name>(e).map(|n| n.0.as_str()), Some("X"));
        assert_eq!(queryer.get::<Id>(e).map(|id| id.0), Some(1));
    }

    #[test]
    fn test_mutations_visible_next_tick_only() {
        let observed: Arc<Mutex<Vec<usize>>> = Arc::default();

        let mut world = World::new();
        let mut done = false;
        world.add_named_system("spawner", move |commands, _queryer, _resources| {
            if !done {
                commands.spawn((name("X"),));
                done = true;
            }
        });
        let out = Arc::clone(&observed);
        world.add_named_system("observer", move |_commands, queryer, _resources| {
            out.lock().unwrap().push(queryer.query::<(Name,)>().len());
        });

        world.update();
        world.update();
        assert_eq!(*observed.lock().unwrap(), vec![0, 1]);
        assert_eq!(world.tick_id(), 2);
    }

    #[test]
    fn test_destroyed_entity_leaves_every_query() {
        let mut world = World::new();
        let spawned: Arc<Mutex<Vec<Entity>>> = Arc::default();
        let out = Arc::clone(&spawned);
        world.add_startup_system(move |commands| {
            out.lock().unwrap().push(commands.spawn((name("old"), Id(7))));
        });
        world.startup();
        let old = spawned.lock().unwrap()[0];

        let mut destroyed = false;
        world.add_system(move |commands, queryer, _resources| {
            if !destroyed {
                for entity in queryer.query::<(Name,)>() {
                    commands.destroy(entity);
                }
                destroyed = true;
            } else if queryer.entity_count() == 0 {
                commands.spawn((name("new"), Id(8)));
            }
        });

        let stats = world.update();
        assert_eq!(stats.destroyed, 1);
        assert!(!world.is_alive(old));
        assert!(world.queryer().query::<(Name,)>().is_empty());
        assert!(world.queryer().query::<(Id,)>().is_empty());

        world.update();
        let queryer = world.queryer();
        let fresh = queryer.query::<(Name, Id)>();
        assert_eq!(fresh.len(), 1);
        assert_ne!(fresh[0], old);
        assert!(queryer.get::<Name>(old).is_none());
        assert_eq!(queryer.get::<Name>(fresh[0]), Some(&name("new")));
        assert!(world.components.is_consistent());
    }

    #[test]
    #[should_panic(expected = "resource `GameState` already exists")]
    fn test_set_resource_twice_panics() {
        let mut world = World::new();
        world
            .set_resource(GameState { round: 1 })
            .set_resource(GameState { round: 2 });
    }

    #[test]
    #[should_panic(expected = "resource `GameState` already exists")]
    fn test_set_resource_from_two_systems_panics_at_commit() {
        let mut world = World::new();
        world.add_system(|commands, _queryer, _resources| {
            commands.set_resource(GameState { round: 1 });
        });
        world.add_system(|commands, _queryer, _resources| {
            commands.set_resource(GameState { round: 2 });
        });
        world.update();
    }

    #[test]
    fn test_set_after_remove_is_allowed() {
        let mut world = World::new();
        world.set_resource(GameState { round: 1 });
        assert!(world.try_set_resource(GameState { round: 9 }).is_err());

        assert_eq!(world.remove_resource::<GameState>(), Some(GameState { round: 1 }));
        assert!(world.try_set_resource(GameState { round: 2 }).is_ok());
        assert_eq!(world.resource::<GameState>().map(|s| s.round), Some(2));
    }

    #[test]
    fn test_systems_read_resources_and_replace_them() {
        let mut world = World::new();
        world.set_resource(GameState { round: 0 });
        world.add_system(|commands, _queryer, resources| {
            let round = resources.get::<GameState>().map_or(0, |s| s.round);
            commands.replace_resource(GameState { round: round + 1 });
        });

        for _ in 0..3 {
            world.update();
        }
        assert_eq!(world.resource::<GameState>().map(|s| s.round), Some(3));

        world.resource_mut::<GameState>().unwrap().round = 10;
        assert_eq!(world.resources().get::<GameState>().map(|s| s.round), Some(10));
    }

    #[test]
    fn test_later_system_wins_resource_replace() {
        #[derive(Debug, PartialEq)]
        struct Val(u32);
        impl Resource for Val {}

        let mut world = World::new();
        world.add_system(|commands, _queryer, _resources| {
            commands.replace_resource(Val(1));
        });
        world.add_system(|commands, _queryer, _resources| {
            commands.replace_resource(Val(2));
        });

        world.update();
        assert_eq!(world.resource::<Val>(), Some(&Val(2)));
        world.update();
        assert_eq!(world.resource::<Val>(), Some(&Val(2)));
    }

    #[test]
    fn test_later_system_wins_component_insert() {
        let mut world = World::new();
        world.add_startup_system(|commands| {
            commands.spawn((Id(0),));
        });
        world.add_system(|commands, queryer, _resources| {
            for entity in queryer.query::<(Id,)>() {
                commands.insert(entity, Id(1));
            }
        });
        world.add_system(|commands, queryer, _resources| {
            for entity in queryer.query::<(Id,)>() {
                commands.insert(entity, Id(2));
            }
        });

        world.startup();
        world.update();
        let rows = world.queryer().query_components::<(Id,)>();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.0, &Id(2));
        assert!(world.components.is_consistent());
    }

    #[test]
    fn test_spawn_then_destroy_in_one_system_leaves_nothing() {
        #[derive(Debug)]
        struct Mark;
        impl Component for Mark {}

        let mut world = World::new();
        world.add_startup_system(|commands| {
            let entity = commands.spawn((Mark,));
            commands.destroy(entity);
        });
        world.add_system(|commands, _queryer, _resources| {
            let entity = commands.spawn((Mark,));
            commands.destroy(entity);
        });

        world.startup();
        assert_eq!(world.entity_count(), 0);
        let stats = world.update();
        assert_eq!((stats.spawned, stats.destroyed), (0, 1));
        assert_eq!(world.entity_count(), 0);
        assert!(world.queryer().query::<(Mark,)>().is_empty());
    }

    #[test]
    fn test_component_edits_through_commands() {
        let mut world = World::new();
        world.add_startup_system(|commands| {
            commands.spawn((Id(1),));
        });
        world.add_system(|commands, queryer, _resources| {
            for (entity, (id,)) in queryer.query_components::<(Id,)>() {
                commands.insert(entity, Id(id.0 * 2));
                if id.0 >= 4 {
                    commands.insert(entity, Tag).remove::<Id>(entity);
                }
            }
        });

        world.startup();
        world.update();
        world.update();
        assert_eq!(world.queryer().query_components::<(Id,)>()[0].1.0, &Id(4));
        world.update();
        assert!(world.queryer().query::<(Id,)>().is_empty());
        assert_eq!(world.queryer().query::<(Tag,)>().len(), 1);
        assert!(world.components.is_consistent());
    }

    #[test]
    fn test_shutdown_clears_state_and_ids() {
        let mut world = World::new();
        world.set_resource(GameState { round: 1 });
        world.add_startup_system(|commands| {
            commands.spawn((name("a"), Id(1)));
        });
        world.startup();
        assert_eq!(world.entity_count(), 1);

        world.shutdown();
        assert_eq!(world.entity_count(), 0);
        assert!(world.resource::<GameState>().is_none());
        assert_eq!(world.register_component::<Id>().raw(), 0);
        assert_eq!(world.systems().startup_count(), 1);
    }

    #[test]
    fn test_explicit_registration_order() {
        let mut world = World::with_config(WorldConfig::new("ids").with_pool_capacity(8));
        let id = world.register_component::<Id>();
        let name_id = world.register_component::<Name>();
        let state = world.register_resource::<GameState>();
        assert_eq!((id.raw(), name_id.raw(), state.raw()), (0, 1, 0));
        assert_eq!(world.register_component::<Id>(), id);
        assert_eq!(world.config().name, "ids");
    }

    #[test]
    fn test_system_names() {
        let mut world = World::new();
        world.add_named_startup_system("spawn", |_commands| {});
        world.add_system(|_commands, _queryer, _resources| {});
        let names: Vec<String> = world.systems().iter().map(|info| info.name.clone()).collect();
        assert_eq!(names[0], "spawn");
        assert!(names[1].contains("test_system_names"));
    }
}
