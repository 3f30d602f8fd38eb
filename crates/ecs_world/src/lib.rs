//! # ecs_world
//!
//! The world of the entity/component runtime and its two-phase tick.
//!
//! Systems run against the state committed by the previous tick and stage
//! their mutations in [`Commands`]; the [`World`] applies every buffer, in
//! system-registration order, once all systems of the tick have returned.
//!
//! ```rust
//! use ecs_component::Component;
//! use ecs_world::World;
//!
//! struct Name(&'static str);
//! impl Component for Name {}
//!
//! let mut world = World::new();
//! world.add_startup_system(|commands| {
//!     commands.spawn((Name("a"),));
//! });
//! world.startup();
//! assert_eq!(world.queryer().query::<(Name,)>().len(), 1);
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod query;
pub mod registry;
pub mod resources;
pub mod storage;
pub mod tick;
pub mod world;

pub use commands::{Bundle, CommandBuffer, Commands, CommitStats};
pub use config::WorldConfig;
pub use error::WorldError;
pub use query::{QueryData, Queryer};
pub use registry::{Stage, SystemInfo, SystemRegistry};
pub use resources::{ResourceStore, Resources};
pub use storage::ComponentStorage;
pub use tick::{Clock, MAX_TICKS_ENV, TICK_RATE_ENV, TickConfig, TickLoop};
pub use world::World;
