//! World generation: seeding a meadow with hives, nests, flowers, and the
//! founding agent populations.

use rand::Rng;
use std::f32::consts::TAU;

use crate::components::{
    AgentKind, Bee, Bird, Boid, HiveId, NestId, Vec2, WorldBounds,
};
use crate::engine::Simulation;
use crate::genetics::{resolve_color, Dna, Genes, Rgb};
use hecs::Entity;

/// Plumage palette, resolved from hex at seeding time. Bad entries fall back
/// with a warning instead of failing generation.
pub const PASTEL_COLORS: [&str; 8] = [
    "#ffadad", "#ffd6a5", "#fdffb6", "#caffbf", "#9bf6ff", "#a0c4ff", "#bdb2ff", "#ffc6ff",
];

/// Radius of the petal ring around a flower anchor, before world scale.
const PETAL_RING_RADIUS: f32 = 7.0;
/// Scatter radius for founding agents around their home structure.
const SPAWN_SCATTER: f32 = 30.0;

pub fn pastel_palette() -> Vec<Rgb> {
    PASTEL_COLORS.iter().map(|hex| resolve_color(hex)).collect()
}

/// Seeding parameters for a fresh meadow.
#[derive(Debug, Clone)]
pub struct MeadowConfig {
    pub bounds: WorldBounds,
    pub world_scale: f32,
    pub hives: usize,
    pub nests: usize,
    pub flowers: usize,
    pub petals_per_flower: usize,
    pub bees_per_hive: usize,
    pub birds: usize,
}

impl Default for MeadowConfig {
    fn default() -> Self {
        Self {
            bounds: WorldBounds::new(1600.0, 900.0, 120.0),
            world_scale: 1.0,
            hives: 2,
            nests: 3,
            flowers: 8,
            petals_per_flower: 5,
            bees_per_hive: 15,
            birds: 6,
        }
    }
}

/// Build a populated simulation from a config. Structures go into the airy
/// middle band of the world; flowers sit just above the ground.
pub fn generate_meadow(config: &MeadowConfig, rng: &mut impl Rng) -> Simulation {
    let mut sim = Simulation::new(config.bounds, config.world_scale);
    let bounds = config.bounds;
    let ground = bounds.ground_level();
    let palette = pastel_palette();

    let mut hive_ids = Vec::new();
    for _ in 0..config.hives {
        let position = Vec2::new(
            rng.gen_range(bounds.width * 0.1..bounds.width * 0.9),
            rng.gen_range(bounds.height * 0.2..bounds.height * 0.5),
        );
        hive_ids.push(sim.hives.add(position));
    }

    let mut nest_ids = Vec::new();
    for _ in 0..config.nests {
        let position = Vec2::new(
            rng.gen_range(bounds.width * 0.1..bounds.width * 0.9),
            rng.gen_range(bounds.height * 0.15..bounds.height * 0.45),
        );
        nest_ids.push(sim.nests.add(position));
    }

    for _ in 0..config.flowers {
        let anchor = Vec2::new(
            rng.gen_range(bounds.width * 0.05..bounds.width * 0.95),
            rng.gen_range(ground - 120.0 * config.world_scale..ground - 20.0),
        );
        add_flower(&mut sim, anchor, config.petals_per_flower);
    }

    for &hive in &hive_ids {
        let home = match sim.hives.get(hive) {
            Some(h) => h.position,
            None => continue,
        };
        for _ in 0..config.bees_per_hive {
            let position = home + scatter(rng, config.world_scale);
            let dna = Dna::random(AgentKind::Bee, rng);
            spawn_bee(&mut sim, hive, position, dna, rng);
        }
    }

    for i in 0..config.birds {
        let home = nest_ids.get(i % nest_ids.len().max(1)).copied();
        let position = match home.and_then(|n| sim.nests.get(n)) {
            Some(nest) => nest.position + scatter(rng, config.world_scale),
            None => Vec2::new(
                rng.gen_range(0.0..bounds.width),
                rng.gen_range(bounds.height * 0.1..bounds.height * 0.5),
            ),
        };
        let dna = Dna::random(AgentKind::Bird, rng);
        let genes = Genes::random(&palette, rng);
        spawn_bird(&mut sim, genes, home, position, dna, rng);
    }

    sim
}

/// Add one flower with its petals arranged in a ring around the anchor.
pub fn add_flower(sim: &mut Simulation, anchor: Vec2, petals: usize) -> crate::components::FlowerId {
    let radius = PETAL_RING_RADIUS * sim.world_scale();
    let positions: Vec<Vec2> = (0..petals.max(1))
        .map(|i| {
            let angle = TAU * i as f32 / petals.max(1) as f32;
            anchor + Vec2::from_angle(angle) * radius
        })
        .collect();
    sim.flowers.add(anchor, &positions)
}

/// Spawn one bee belonging to `hive`, with a small random initial velocity.
pub fn spawn_bee(
    sim: &mut Simulation,
    hive: HiveId,
    position: Vec2,
    dna: Dna,
    rng: &mut impl Rng,
) -> Entity {
    let velocity = Vec2::from_angle(rng.gen_range(0.0..TAU));
    let boid = Boid::new(AgentKind::Bee, position, velocity, dna, sim.world_scale());
    sim.world.spawn((boid, Bee::new(hive)))
}

/// Spawn one bird with the given visual genes.
pub fn spawn_bird(
    sim: &mut Simulation,
    genes: Genes,
    home_nest: Option<NestId>,
    position: Vec2,
    dna: Dna,
    rng: &mut impl Rng,
) -> Entity {
    let velocity = Vec2::from_angle(rng.gen_range(0.0..TAU));
    let boid = Boid::new(AgentKind::Bird, position, velocity, dna, sim.world_scale());
    sim.world.spawn((boid, Bird::new(genes, home_nest)))
}

fn scatter(rng: &mut impl Rng, world_scale: f32) -> Vec2 {
    Vec2::from_angle(rng.gen_range(0.0..TAU)) * rng.gen_range(0.0..SPAWN_SCATTER * world_scale)
}
