//! Bee behavior system: the forage / gather / return state machine layered
//! on the shared life-cycle and flocking base, with hive-shared flower
//! memory and constant predator evasion.

use hecs::{Entity, World};
use rand::Rng;

use crate::components::{
    Bee, BeeState, Boid, Flowers, HiveId, Hives, Vec2, WorldBounds,
};
use crate::grid::SpatialGrid;
use crate::systems::{flocking, lifecycle};

/// Distance at which a bee settles onto its claimed petal.
pub const PETAL_ARRIVAL_RADIUS: f32 = 2.0;
/// Distance at which a returning bee deposits at the hive.
pub const HIVE_ARRIVAL_RADIUS: f32 = 10.0;
/// Approach speed tapers inside this distance of the claimed petal.
pub const PETAL_TAPER_RADIUS: f32 = 50.0;
/// Length of one gathering session.
pub const GATHER_TICKS: u32 = 45;
/// Max nectar transferred per tick while gathering.
pub const NECTAR_PER_TICK: f32 = 0.05;
/// Petals below this are not worth claiming.
pub const MIN_PETAL_NECTAR: f32 = 0.2;
/// Energy replenished per unit of nectar gathered.
pub const NECTAR_ENERGY: f32 = 25.0;
/// Max bees foraging one flower at a time.
pub const FLOWER_OCCUPANCY_CAP: usize = 3;
/// Below this many live bees, returning bees just pick the nearest hive;
/// above it they load-balance.
pub const HIVE_CHOICE_POP_THRESHOLD: usize = 20;
/// Weight of nearby predators in the load-balanced hive score.
pub const HIVE_DANGER_WEIGHT: f32 = 2.0;

const FLOWER_SEEK_WEIGHT: f32 = 0.1;
const HIVE_SEEK_WEIGHT: f32 = 0.05;

/// Advance every bee one tick: life-cycle, flocking, evasion, then the
/// foraging state machine. Bees killed this tick release their petal and
/// hive reservations before the tick ends.
pub fn bee_system(
    world: &mut World,
    bee_grid: &SpatialGrid,
    bird_grid: &SpatialGrid,
    flowers: &mut Flowers,
    hives: &mut Hives,
    bounds: &WorldBounds,
    live_bees: usize,
    rng: &mut impl Rng,
) {
    let entities: Vec<Entity> = world
        .query::<(&Boid, &Bee)>()
        .iter()
        .map(|(e, _)| e)
        .collect();

    for entity in entities {
        let mut boid = match world.get::<&Boid>(entity) {
            Ok(b) => *b,
            Err(_) => continue,
        };

        let was_alive = boid.alive;
        if !lifecycle::advance(&mut boid, bounds) {
            // A death this tick must free every held resource immediately
            if was_alive && !boid.alive {
                if let Ok(mut bee) = world.get::<&mut Bee>(entity) {
                    release_bee_resources(&mut bee, flowers, hives);
                }
            }
            write_back(world, entity, boid);
            continue;
        }

        let gathering = matches!(
            world.get::<&Bee>(entity).map(|b| b.state),
            Ok(BeeState::GatheringNectar)
        );

        if gathering {
            // Hold position on the petal; evasion below is the only steering
            boid.velocity = Vec2::ZERO;
        } else {
            let neighbors = bee_grid.query(boid.position);
            flocking::apply_flock_forces(&mut boid, entity, &neighbors);
        }

        // Evasion runs every tick, independent of state
        let predators = bird_grid.query(boid.position);
        let evade =
            flocking::evade_vector(boid.position, boid.settings.visual_range, &predators);
        boid.velocity += evade * boid.settings.evade_factor;

        if let Ok(mut bee) = world.get::<&mut Bee>(entity) {
            update_state(
                &mut bee, &mut boid, flowers, hives, bird_grid, live_bees, rng,
            );
        }

        flocking::limit_speed(&mut boid);
        flocking::avoid_edges(&mut boid, bounds);
        boid.position += boid.velocity;

        write_back(world, entity, boid);
    }
}

fn write_back(world: &mut World, entity: Entity, boid: Boid) {
    if let Ok(mut slot) = world.get::<&mut Boid>(entity) {
        *slot = boid;
    }
}

/// Surrender every shared resource this bee holds: its petal claim and its
/// inbound-hive reservation. Called on every exit path, including death and
/// predation, so a dead bee can never starve a petal or a hive counter.
pub fn release_bee_resources(bee: &mut Bee, flowers: &mut Flowers, hives: &mut Hives) {
    if let Some(claim) = bee.target_petal.take() {
        flowers.release(claim);
    }
    if let Some(hive) = bee.target_hive.take() {
        hives.clear_inbound(hive);
    }
    bee.target_flower = None;
}

fn update_state(
    bee: &mut Bee,
    boid: &mut Boid,
    flowers: &mut Flowers,
    hives: &mut Hives,
    bird_grid: &SpatialGrid,
    live_bees: usize,
    rng: &mut impl Rng,
) {
    match bee.state {
        BeeState::SeekingFlower => seek_flower(bee, boid, flowers, hives, rng),
        BeeState::GatheringNectar => gather_nectar(bee, boid, flowers),
        BeeState::ReturnToHive => return_to_hive(bee, boid, hives, bird_grid, live_bees, rng),
    }
}

fn seek_flower(
    bee: &mut Bee,
    boid: &mut Boid,
    flowers: &mut Flowers,
    hives: &Hives,
    rng: &mut impl Rng,
) {
    // Drop a target that vanished or ran dry, releasing any claimed petal
    if let Some(fid) = bee.target_flower {
        let depleted = flowers
            .get(fid)
            .map(|f| f.total_nectar() < MIN_PETAL_NECTAR)
            .unwrap_or(true);
        if depleted {
            if let Some(claim) = bee.target_petal.take() {
                flowers.release(claim);
            }
            bee.target_flower = None;
        }
    }

    if bee.target_flower.is_none() {
        bee.target_flower = best_visible_flower(boid, flowers, bee.last_visited_flower)
            .or_else(|| {
                // Nothing in sight: fall back to the colony's shared memory
                hives
                    .get(bee.hive)
                    .and_then(|h| h.random_known_flower(rng))
            });
    }

    let Some(fid) = bee.target_flower else {
        flocking::wander(boid, rng);
        return;
    };

    if bee.target_petal.is_none() {
        bee.target_petal = flowers.claim(fid, MIN_PETAL_NECTAR);
        if bee.target_petal.is_none() {
            // Every worthwhile petal is taken: abandon this flower
            bee.target_flower = None;
            flocking::wander(boid, rng);
            return;
        }
    }

    let target = bee
        .target_petal
        .as_ref()
        .and_then(|claim| flowers.petal_position(claim));
    let Some(target) = target else {
        if let Some(claim) = bee.target_petal.take() {
            flowers.release(claim);
        }
        bee.target_flower = None;
        return;
    };

    if boid.position.distance(&target) < PETAL_ARRIVAL_RADIUS {
        boid.velocity = Vec2::ZERO;
        bee.state = BeeState::GatheringNectar;
        bee.gather_countdown = GATHER_TICKS;
    } else {
        flocking::seek(boid, target, FLOWER_SEEK_WEIGHT, PETAL_TAPER_RADIUS);
    }
}

/// Best flower in sight by `total nectar / (distance² + 1)`, skipping
/// crowded flowers and the one visited last (discourages revisits).
fn best_visible_flower(
    boid: &Boid,
    flowers: &Flowers,
    last_visited: Option<crate::components::FlowerId>,
) -> Option<crate::components::FlowerId> {
    let range_sq = boid.settings.visual_range * boid.settings.visual_range;
    let mut best = None;
    let mut best_score = 0.0f32;
    for (id, flower) in flowers.iter() {
        if Some(id) == last_visited {
            continue;
        }
        if flower.occupant_count() >= FLOWER_OCCUPANCY_CAP {
            continue;
        }
        let dist_sq = boid.position.distance_squared(&flower.position);
        if dist_sq > range_sq {
            continue;
        }
        let score = flower.total_nectar() / (dist_sq + 1.0);
        if score > best_score {
            best = Some(id);
            best_score = score;
        }
    }
    best
}

fn gather_nectar(bee: &mut Bee, boid: &mut Boid, flowers: &mut Flowers) {
    bee.gather_countdown = bee.gather_countdown.saturating_sub(1);

    if bee.target_petal.is_none() {
        bee.state = BeeState::SeekingFlower;
        return;
    }

    let capacity_left = (boid.settings.nectar_capacity - bee.nectar).max(0.0);
    let mut petal_empty = true;
    if let Some(claim) = bee.target_petal.as_ref() {
        let taken = flowers.take_nectar(claim, NECTAR_PER_TICK.min(capacity_left));
        bee.nectar += taken;
        boid.feed(taken * NECTAR_ENERGY);
        petal_empty = flowers.petal_nectar(claim) <= 0.0;
    }

    let full = bee.nectar >= boid.settings.nectar_capacity - 1e-6;
    if bee.gather_countdown == 0 || full || petal_empty {
        if let Some(claim) = bee.target_petal.take() {
            flowers.release(claim);
        }
        // Remember the spot for the waggle dance back home
        bee.last_visited_flower = bee.target_flower.take();
        bee.state = if full {
            BeeState::ReturnToHive
        } else {
            BeeState::SeekingFlower
        };
    }
}

fn return_to_hive(
    bee: &mut Bee,
    boid: &mut Boid,
    hives: &mut Hives,
    bird_grid: &SpatialGrid,
    live_bees: usize,
    rng: &mut impl Rng,
) {
    // Commit to a destination once per trip
    if bee.target_hive.is_none() {
        if let Some(chosen) = choose_hive(boid.position, hives, bird_grid, live_bees) {
            hives.mark_inbound(chosen);
            bee.target_hive = Some(chosen);
        }
    }

    let Some(hive_id) = bee.target_hive else {
        flocking::wander(boid, rng);
        return;
    };
    let Some(hive_pos) = hives.get(hive_id).map(|h| h.position) else {
        bee.target_hive = None;
        return;
    };

    if boid.position.distance(&hive_pos) < HIVE_ARRIVAL_RADIUS {
        if let Some(hive) = hives.get_mut(hive_id) {
            hive.nectar += bee.nectar;
            hive.dna_pool.accumulate(&boid.dna);
            if let Some(flower) = bee.last_visited_flower {
                hive.remember_flower(flower);
            }
        }
        bee.nectar = 0.0;
        hives.clear_inbound(hive_id);
        bee.target_hive = None;
        bee.state = BeeState::SeekingFlower;
    } else {
        flocking::seek(boid, hive_pos, HIVE_SEEK_WEIGHT, 0.0);
    }
}

/// Pick a destination hive. Small populations go to the nearest; larger ones
/// balance distance against inbound load and nearby predators.
fn choose_hive(
    position: Vec2,
    hives: &Hives,
    bird_grid: &SpatialGrid,
    live_bees: usize,
) -> Option<HiveId> {
    if live_bees < HIVE_CHOICE_POP_THRESHOLD {
        return hives
            .iter()
            .min_by(|(_, a), (_, b)| {
                a.position
                    .distance_squared(&position)
                    .partial_cmp(&b.position.distance_squared(&position))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(id, _)| id);
    }

    let mut best = None;
    let mut best_score = f32::NEG_INFINITY;
    for (id, hive) in hives.iter() {
        let dist = position.distance(&hive.position);
        let nearby_birds = bird_grid.query(hive.position).len() as f32;
        let score = 1.0 / (dist + 1.0)
            * (1.0 / (1.0 + hive.bees_en_route as f32))
            * (1.0 / (1.0 + nearby_birds * HIVE_DANGER_WEIGHT));
        if score > best_score {
            best = Some(id);
            best_score = score;
        }
    }
    best
}
