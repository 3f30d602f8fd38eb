//! # ecs_demo
//!
//! Drives a small world through the tick loop:
//!
//! 1. Startup spawns two named entities (`e0` with a name, `e1` with a name
//!    and an id), a handful of movers, and the game state.
//! 2. Every update moves the movers, bumps the round counter, and replaces
//!    any mover that left the arena with a fresh one.
//! 3. After the last tick the world is shut down.
//!
//! `ECS_TICK_RATE` and `ECS_MAX_TICKS` tune the loop. The demo stops after
//! 120 ticks unless `ECS_MAX_TICKS` is set; `ECS_MAX_TICKS=0` runs forever.

use anyhow::Result;
use glam::Vec3;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ecs_component::{Component, Resource};
use ecs_world::{Clock, Commands, MAX_TICKS_ENV, TickConfig, TickLoop, World, WorldConfig};

/// Ticks to run when `ECS_MAX_TICKS` is unset.
const DEFAULT_DEMO_TICKS: u64 = 120;

#[derive(Debug, Clone)]
struct Name(String);
impl Component for Name {}

#[derive(Debug, Clone, Copy)]
struct Id(u32);
impl Component for Id {}

/// Marks a mover; the value is its spawn seed.
#[derive(Debug, Clone, Copy)]
struct Mover(u32);
impl Component for Mover {}

#[derive(Debug, Clone, Copy)]
struct Position(Vec3);
impl Component for Position {}

#[derive(Debug, Clone, Copy)]
struct Velocity(Vec3);
impl Component for Velocity {}

#[derive(Debug, Clone, Copy)]
struct GameState {
    round: u32,
    arena_radius: f32,
}

impl Resource for GameState {
    fn type_name() -> &'static str {
        "GameState"
    }
}

/// Spawns a mover whose seed and heading derive from its entity id.
fn spawn_mover(commands: &mut Commands<'_>) {
    let entity = commands.spawn((Position(Vec3::ZERO),));
    let seed = entity.id() as u32;
    let angle = seed as f32 * 0.7;
    let velocity = Vec3::new(angle.cos(), angle.sin(), 0.25) * (1.0 + (seed % 3) as f32);
    commands
        .insert(entity, Velocity(velocity))
        .insert(entity, Mover(seed));
}

fn build_world() -> World {
    let mut world = World::with_config(WorldConfig::new("demo").with_pool_capacity(64));
    world.add_named_startup_system("spawn_initial", |commands| {
        let e0 = commands.spawn((Name("A".to_string()),));
        let e1 = commands.spawn((Name("A".to_string()), Id(1)));
        info!(%e0, %e1, "staged named entities");
        for _ in 0..6 {
            spawn_mover(commands);
        }
        commands.set_resource(GameState {
            round: 0,
            arena_radius: 10.0,
        });
    });

    world.add_named_system("report", |_commands, queryer, resources| {
        let Some(clock) = resources.get::<Clock>() else {
            return;
        };
        if clock.tick == 1 {
            let named: Vec<String> = queryer
                .query_components::<(Name,)>()
                .iter()
                .map(|(entity, (name,))| format!("{entity}={}", name.0))
                .collect();
            let with_id: Vec<String> = queryer
                .query_components::<(Name, Id)>()
                .iter()
                .map(|(entity, (_, id))| format!("{entity}#{}", id.0))
                .collect();
            info!(?named, ?with_id, "initial queries");
        }
        if clock.tick % 30 == 0 {
            let round = resources.get::<GameState>().map_or(0, |state| state.round);
            info!(
                tick = clock.tick,
                round,
                entities = queryer.entity_count(),
                movers = queryer.query::<(Position, Velocity)>().len(),
                "status"
            );
        }
    });

    world.add_named_system("movement", |commands, queryer, resources| {
        let dt = resources
            .get::<Clock>()
            .map_or(0.0, |clock| clock.delta_seconds as f32);
        for (entity, (position, velocity)) in queryer.query_components::<(Position, Velocity)>() {
            commands.insert(entity, Position(position.0 + velocity.0 * dt));
        }
    });

    world.add_named_system("round_counter", |commands, _queryer, resources| {
        if let Some(state) = resources.get::<GameState>() {
            commands.replace_resource(GameState {
                round: state.round + 1,
                ..*state
            });
        }
    });

    world.add_named_system("cull", |commands, queryer, resources| {
        let Some(state) = resources.get::<GameState>() else {
            return;
        };
        for (entity, (position, mover)) in queryer.query_components::<(Position, Mover)>() {
            if position.0.length() > state.arena_radius {
                info!(%entity, seed = mover.0, "mover left the arena");
                commands.destroy(entity);
                spawn_mover(commands);
            }
        }
    });

    world
}

fn main() -> Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ecs_demo=info".parse()?))
        .init();

    let mut config = TickConfig::from_env()?;
    if std::env::var_os(MAX_TICKS_ENV).is_none() {
        config.max_ticks = DEFAULT_DEMO_TICKS;
    }

    info!(
        tick_rate = config.tick_rate,
        max_ticks = config.max_ticks,
        "ecs demo starting"
    );

    let mut tick_loop = TickLoop::new(config, build_world());
    tick_loop.run();

    let mut world = tick_loop.into_world();
    let round = world.resource::<GameState>().map_or(0, |state| state.round);
    info!(
        ticks = world.tick_id(),
        round,
        entities = world.entity_count(),
        "simulation finished"
    );
    world.shutdown();

    info!("ecs demo shut down");
    Ok(())
}
