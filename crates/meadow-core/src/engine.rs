//! Simulation engine - main entry point for running the simulation

use hecs::{Entity, World};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::*;
use crate::genetics::DnaPool;
use crate::grid::{GridEntry, SpatialGrid};
use crate::systems::{bee_system, bird_system, reproduction_system};

/// Base bucket size of the bee neighbor grid, scaled by world scale.
pub const BEE_GRID_CELL: f32 = 50.0;
/// Base bucket size of the bird neighbor grid, scaled by world scale.
pub const BIRD_GRID_CELL: f32 = 75.0;
/// Per-tick petal nectar regeneration.
pub const FLOWER_REGEN_RATE: f32 = 0.002;

/// One read-only telemetry snapshot of the population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationStats {
    pub tick: u64,
    pub live_bees: usize,
    pub live_birds: usize,
    pub flowers: usize,
    pub hives: usize,
    pub nests: usize,
    pub total_hive_nectar: f32,
    /// Per-trait averages over the living population, None when empty.
    pub bee_traits: Option<crate::genetics::Dna>,
    pub bird_traits: Option<crate::genetics::Dna>,
}

/// Main simulation: the ECS world of agents plus the engine-owned habitat
/// registries, stepped one fixed tick at a time.
pub struct Simulation {
    /// ECS world containing all agents
    pub world: World,
    /// Flower registry (petal claims resolve into it)
    pub flowers: Flowers,
    /// Hive registry
    pub hives: Hives,
    /// Nest registry
    pub nests: Nests,
    /// World rectangle and ground band
    pub bounds: WorldBounds,

    bee_grid: SpatialGrid,
    bird_grid: SpatialGrid,
    world_scale: f32,
    tick: u64,
}

impl Simulation {
    /// Create an empty simulation over the given bounds. `world_scale`
    /// multiplies speed-like and range-like settings once at every spawn.
    pub fn new(bounds: WorldBounds, world_scale: f32) -> Self {
        Self {
            world: World::new(),
            flowers: Flowers::new(),
            hives: Hives::new(),
            nests: Nests::new(),
            bee_grid: SpatialGrid::new(bounds.width, bounds.height, BEE_GRID_CELL * world_scale),
            bird_grid: SpatialGrid::new(bounds.width, bounds.height, BIRD_GRID_CELL * world_scale),
            bounds,
            world_scale,
            tick: 0,
        }
    }

    pub fn world_scale(&self) -> f32 {
        self.world_scale
    }

    /// Ticks elapsed since the simulation started.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Advance one tick with ambient randomness.
    pub fn tick(&mut self) {
        let mut rng = rand::thread_rng();
        self.tick_with_rng(&mut rng);
    }

    /// Advance one tick: rebuild the neighbor grids, regenerate flowers, run
    /// the bee and bird systems, then reproduction, then remove agents whose
    /// corpses finished fading this tick.
    pub fn tick_with_rng(&mut self, rng: &mut impl Rng) {
        self.tick += 1;

        self.rebuild_grids();
        self.flowers.regenerate(FLOWER_REGEN_RATE);

        let live_bees = self.live_bee_count();
        let live_birds = self.live_bird_count();

        bee_system(
            &mut self.world,
            &self.bee_grid,
            &self.bird_grid,
            &mut self.flowers,
            &mut self.hives,
            &self.bounds,
            live_bees,
            rng,
        );

        bird_system(
            &mut self.world,
            &self.bird_grid,
            &self.bee_grid,
            &mut self.flowers,
            &mut self.hives,
            &mut self.nests,
            &self.bounds,
            live_birds,
            rng,
        );

        let live_bees = self.live_bee_count();
        reproduction_system(
            &mut self.world,
            &mut self.hives,
            &mut self.nests,
            live_bees,
            self.world_scale,
            rng,
        );

        self.cull_vanished();
    }

    /// Snapshot every living agent into its species grid. Grids hold
    /// kinematic copies, so systems read neighbors without touching the
    /// world; positions are one tick stale by construction.
    fn rebuild_grids(&mut self) {
        self.bee_grid.clear();
        self.bird_grid.clear();
        for (entity, boid) in self.world.query::<&Boid>().iter() {
            if !boid.alive {
                continue;
            }
            let entry = GridEntry {
                entity,
                position: boid.position,
                velocity: boid.velocity,
            };
            match boid.kind {
                AgentKind::Bee => self.bee_grid.insert(entry),
                AgentKind::Bird => self.bird_grid.insert(entry),
            }
        }
    }

    fn cull_vanished(&mut self) {
        let gone: Vec<Entity> = self
            .world
            .query::<&Boid>()
            .iter()
            .filter(|(_, b)| b.vanished)
            .map(|(e, _)| e)
            .collect();
        for entity in gone {
            let _ = self.world.despawn(entity);
        }
    }

    /// Living bees (corpses still falling are excluded).
    pub fn live_bee_count(&self) -> usize {
        self.world
            .query::<(&Boid, &Bee)>()
            .iter()
            .filter(|(_, (b, _))| b.alive)
            .count()
    }

    /// Living birds.
    pub fn live_bird_count(&self) -> usize {
        self.world
            .query::<(&Boid, &Bird)>()
            .iter()
            .filter(|(_, (b, _))| b.alive)
            .count()
    }

    /// Total agents in the world, corpses included.
    pub fn agent_count(&self) -> usize {
        self.world.query::<&Boid>().iter().count()
    }

    /// Telemetry snapshot: counts and per-trait DNA averages.
    pub fn stats(&self) -> PopulationStats {
        let mut bee_pool = DnaPool::new();
        let mut bird_pool = DnaPool::new();
        for (_, boid) in self.world.query::<&Boid>().iter() {
            if !boid.alive {
                continue;
            }
            match boid.kind {
                AgentKind::Bee => bee_pool.accumulate(&boid.dna),
                AgentKind::Bird => bird_pool.accumulate(&boid.dna),
            }
        }

        PopulationStats {
            tick: self.tick,
            live_bees: bee_pool.contributors as usize,
            live_birds: bird_pool.contributors as usize,
            flowers: self.flowers.len(),
            hives: self.hives.len(),
            nests: self.nests.len(),
            total_hive_nectar: self.hives.iter().map(|(_, h)| h.nectar).sum(),
            bee_traits: bee_pool.average(AgentKind::Bee),
            bird_traits: bird_pool.average(AgentKind::Bird),
        }
    }

    /// Telemetry snapshot as a JSON line.
    pub fn stats_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.stats())
    }
}
