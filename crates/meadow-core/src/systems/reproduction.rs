//! Reproduction: nest clutches for birds and hive broods for bees.
//!
//! Both paths defer their spawns to the end of the pass so new agents never
//! act on the tick they are born.

use hecs::World;
use rand::Rng;
use std::f32::consts::TAU;

use crate::components::{
    AgentKind, Bee, Bird, BirdState, Boid, Hives, NestId, Nests, Vec2, HATCHING_TICKS,
    NESTING_TICKS,
};
use crate::genetics::{Dna, Genes};

/// Nectar a hive spends to raise one new bee.
pub const HIVE_BROOD_COST: f32 = 10.0;
/// Foragers that must have contributed DNA before a brood can start.
pub const HIVE_MIN_CONTRIBUTORS: u32 = 3;
/// Bee population cap; hives stop brooding at or above it.
pub const MAX_BEES: usize = 120;

const HATCHLING_SPEED: f32 = 0.5;

/// Advance every nest and hive one tick: count down clutches, hatch chicks,
/// and raise hive broods from the pooled forager DNA.
pub fn reproduction_system(
    world: &mut World,
    hives: &mut Hives,
    nests: &mut Nests,
    live_bees: usize,
    world_scale: f32,
    rng: &mut impl Rng,
) {
    advance_nests(world, nests, world_scale, rng);
    advance_hives(world, hives, live_bees, world_scale, rng);
}

fn advance_nests(world: &mut World, nests: &mut Nests, world_scale: f32, rng: &mut impl Rng) {
    let mut hatchlings: Vec<(NestId, Vec2, Dna, Genes)> = Vec::new();
    let mut released: Vec<hecs::Entity> = Vec::new();

    for (nest_id, nest) in nests.iter_mut() {
        if nest.has_egg {
            nest.hatching_countdown = nest.hatching_countdown.saturating_sub(1);
            if nest.hatching_countdown == 0 {
                if let (Some((dna_a, dna_b)), Some((genes_a, genes_b))) =
                    (nest.parent_dna.take(), nest.parent_genes.take())
                {
                    let dna = Dna::inherit(AgentKind::Bird, &dna_a, &dna_b, rng);
                    let genes = Genes::inherit(&genes_a, &genes_b, rng);
                    hatchlings.push((nest_id, nest.position, dna, genes));
                }
                nest.has_egg = false;
                nest.available = true;
                nest.nesting_countdown = NESTING_TICKS;
            }
            continue;
        }

        // The clutch only progresses with both parents settled in
        if nest.occupants.len() >= 2 {
            nest.nesting_countdown = nest.nesting_countdown.saturating_sub(1);
            if nest.nesting_countdown == 0 {
                let a = nest.occupants[0];
                let b = nest.occupants[1];
                let dna_a = world.get::<&Boid>(a).map(|x| x.dna).ok();
                let dna_b = world.get::<&Boid>(b).map(|x| x.dna).ok();
                let genes_a = world.get::<&Bird>(a).map(|x| x.genes.clone()).ok();
                let genes_b = world.get::<&Bird>(b).map(|x| x.genes.clone()).ok();
                if let (Some(da), Some(db), Some(ga), Some(gb)) =
                    (dna_a, dna_b, genes_a, genes_b)
                {
                    // Snapshot the parents at laying time; the chick inherits
                    // from these even if a parent dies before it hatches
                    nest.parent_dna = Some((da, db));
                    nest.parent_genes = Some((ga, gb));
                    nest.has_egg = true;
                    nest.hatching_countdown = HATCHING_TICKS;
                    released.extend(nest.occupants.drain(..));
                } else {
                    // A parent disappeared at the last moment: no clutch
                    nest.occupants.clear();
                    nest.available = true;
                    nest.nesting_countdown = NESTING_TICKS;
                }
            }
        }
    }

    for parent in released {
        if let Ok(mut bird) = world.get::<&mut Bird>(parent) {
            bird.state = BirdState::Hunting;
            bird.partner = None;
            bird.mating_nest = None;
            bird.bees_caught = 0;
        }
    }

    for (nest_id, position, dna, genes) in hatchlings {
        log::debug!("chick hatched at nest {:?}", nest_id);
        let velocity = Vec2::from_angle(rng.gen_range(0.0..TAU)) * HATCHLING_SPEED;
        let boid = Boid::new(AgentKind::Bird, position, velocity, dna, world_scale);
        world.spawn((boid, Bird::new(genes, Some(nest_id))));
    }
}

fn advance_hives(
    world: &mut World,
    hives: &mut Hives,
    live_bees: usize,
    world_scale: f32,
    rng: &mut impl Rng,
) {
    let mut brood = Vec::new();
    let mut population = live_bees;

    for (hive_id, hive) in hives.iter_mut() {
        if population >= MAX_BEES {
            break;
        }
        if hive.nectar < HIVE_BROOD_COST || hive.dna_pool.contributors < HIVE_MIN_CONTRIBUTORS {
            continue;
        }
        let Some(average) = hive.dna_pool.average(AgentKind::Bee) else {
            continue;
        };
        let mut dna = average;
        dna.mutate(AgentKind::Bee, rng);
        hive.nectar -= HIVE_BROOD_COST;
        hive.dna_pool.reset();
        brood.push((hive_id, hive.position, dna));
        population += 1;
    }

    for (hive_id, position, dna) in brood {
        log::debug!("hive {:?} raised a new bee", hive_id);
        let velocity = Vec2::from_angle(rng.gen_range(0.0..TAU)) * HATCHLING_SPEED;
        let boid = Boid::new(AgentKind::Bee, position, velocity, dna, world_scale);
        world.spawn((boid, Bee::new(hive_id)));
    }
}
