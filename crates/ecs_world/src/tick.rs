//! Fixed-rate tick loop.
//!
//! Drives a [`World`] through its lifecycle:
//!
//! 1. Run `startup()` once, before the first update.
//! 2. Publish a [`Clock`] resource for the coming tick.
//! 3. Run `update()`.
//! 4. Sleep off the rest of the tick budget, or warn if it was exceeded.

use std::time::{Duration, Instant};

use ecs_component::Resource;
use tracing::{debug, info, warn};

use crate::commands::CommitStats;
use crate::error::WorldError;
use crate::world::World;

/// Environment variable overriding [`TickConfig::tick_rate`].
pub const TICK_RATE_ENV: &str = "ECS_TICK_RATE";
/// Environment variable overriding [`TickConfig::max_ticks`].
pub const MAX_TICKS_ENV: &str = "ECS_MAX_TICKS";

/// Configuration for the tick loop.
#[derive(Debug, Clone, PartialEq)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

impl TickConfig {
    /// Reads `ECS_TICK_RATE` and `ECS_MAX_TICKS`, keeping the defaults for
    /// unset variables.
    pub fn from_env() -> Result<Self, WorldError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, WorldError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(TICK_RATE_ENV) {
            config.tick_rate = match raw.trim().parse::<f64>() {
                Ok(rate) if rate.is_finite() && rate > 0.0 => rate,
                _ => {
                    return Err(WorldError::InvalidConfig {
                        key: TICK_RATE_ENV,
                        value: raw,
                    });
                }
            };
        }

        if let Some(raw) = lookup(MAX_TICKS_ENV) {
            config.max_ticks = match raw.trim().parse::<u64>() {
                Ok(ticks) => ticks,
                Err(_) => {
                    return Err(WorldError::InvalidConfig {
                        key: MAX_TICKS_ENV,
                        value: raw,
                    });
                }
            };
        }

        Ok(config)
    }

    /// Returns the time budget of one tick.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate)
    }
}

/// Tick counter and fixed timestep, replaced before every update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    /// 1-based number of the update being run.
    pub tick: u64,
    /// Fixed timestep in seconds.
    pub delta_seconds: f64,
}

impl Resource for Clock {
    fn type_name() -> &'static str {
        "Clock"
    }
}

/// Runs a world at a fixed rate.
#[derive(Debug)]
pub struct TickLoop {
    /// Tick configuration.
    config: TickConfig,
    /// The world being driven.
    world: World,
    /// Whether `startup()` has run.
    started: bool,
}

impl TickLoop {
    /// Create a new tick loop around `world`.
    #[must_use]
    pub fn new(config: TickConfig, world: World) -> Self {
        Self {
            config,
            world,
            started: false,
        }
    }

    /// Returns the tick configuration.
    #[must_use]
    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    /// Returns the number of completed updates.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.world.tick_id()
    }

    /// Returns a reference to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Consumes the loop, returning the world.
    #[must_use]
    pub fn into_world(self) -> World {
        self.world
    }

    /// Runs one tick without sleeping. The first call also runs startup.
    pub fn step(&mut self) -> CommitStats {
        if !self.started {
            self.world.startup();
            self.started = true;
        }

        let clock = Clock {
            tick: self.world.tick_id() + 1,
            delta_seconds: self.config.tick_duration().as_secs_f64(),
        };
        self.world.replace_resource(clock);

        let stats = self.world.update();
        debug!(
            tick_id = self.world.tick_id(),
            entities = self.world.entity_count(),
            "tick complete"
        );
        stats
    }

    /// Runs ticks at the configured rate until `max_ticks` is reached, or
    /// forever when it is 0.
    pub fn run(&mut self) {
        let tick_duration = self.config.tick_duration();
        let mut tick_count = 0u64;

        info!(
            world = %self.world.config().name,
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();
            self.step();

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(ticks = tick_count, "tick loop complete");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.world.tick_id(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
    }
}
