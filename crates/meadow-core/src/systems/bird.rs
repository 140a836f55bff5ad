//! Bird behavior system: hunting, mate seeking, and the trip to the nest.
//!
//! Pair bonds are mutual and maintained in one place: pairing sets both
//! sides, and every failure path funnels through [`reset_mating`], which
//! clears both sides and abandons the nest reservation.

use hecs::{Entity, World};
use rand::Rng;

use crate::components::{
    Bee, Bird, BirdState, Boid, DeathCause, Flowers, Hives, Nests, Vec2, WorldBounds,
};
use crate::grid::SpatialGrid;
use crate::systems::{bee, flocking, lifecycle};

/// Energy gained from one successful catch.
pub const CATCH_ENERGY: f32 = 40.0;
/// Catches required before a bird becomes eligible to seek a mate.
pub const BEES_CAUGHT_TO_MATE: u32 = 3;
/// Population cap; at or above it, eligible birds stay hunting and their
/// catch counter resets.
pub const MAX_BIRDS: usize = 40;
/// Distance at which a nesting bird counts as arrived.
pub const NEST_ARRIVAL_RADIUS: f32 = 15.0;
/// Approach speed tapers inside this distance of the nest.
pub const NEST_TAPER_RADIUS: f32 = 60.0;

const NEST_SEEK_WEIGHT: f32 = 0.05;
const PARTNER_COHESION_WEIGHT: f32 = 0.01;

/// Advance every bird one tick: life-cycle, flocking, then the hunting and
/// mating state machine. At most one kill per bird per tick. A bird that
/// dies this tick releases its partner and nest reservation immediately.
pub fn bird_system(
    world: &mut World,
    bird_grid: &SpatialGrid,
    bee_grid: &SpatialGrid,
    flowers: &mut Flowers,
    hives: &mut Hives,
    nests: &mut Nests,
    bounds: &WorldBounds,
    live_birds: usize,
    rng: &mut impl Rng,
) {
    let entities: Vec<Entity> = world
        .query::<(&Boid, &Bird)>()
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
            // Death releases the pair bond and nest from the dying side
            if was_alive && !boid.alive {
                reset_mating(world, entity, nests);
            }
            write_back(world, entity, boid);
            continue;
        }

        let neighbors = bird_grid.query(boid.position);
        flocking::apply_flock_forces(&mut boid, entity, &neighbors);

        let state = match world.get::<&Bird>(entity) {
            Ok(b) => b.state,
            Err(_) => continue,
        };
        match state {
            BirdState::Hunting => {
                hunt(
                    world, entity, &mut boid, bee_grid, flowers, hives, live_birds, rng,
                );
            }
            BirdState::SeekingMate => {
                seek_mate(world, entity, &mut boid, &neighbors, nests, rng);
            }
            BirdState::GoToNest => {
                go_to_nest(world, entity, &mut boid, nests);
            }
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

/// Dissolve this bird's pair bond and nest reservation. Symmetric but
/// single-hop: the partner's own fields are cleared here, so a later call
/// from the partner's side finds nothing left to undo.
pub fn reset_mating(world: &mut World, me: Entity, nests: &mut Nests) {
    let (partner, nest) = match world.get::<&mut Bird>(me) {
        Ok(mut bird) => {
            let partner = bird.partner.take();
            let nest = bird.mating_nest.take();
            bird.state = BirdState::Hunting;
            bird.bees_caught = 0;
            (partner, nest)
        }
        Err(_) => (None, None),
    };

    if let Some(nest_id) = nest {
        nests.abandon(nest_id, me, partner);
    }

    if let Some(other) = partner {
        if let Ok(mut bird) = world.get::<&mut Bird>(other) {
            if bird.partner == Some(me) {
                bird.partner = None;
                bird.mating_nest = None;
                bird.state = BirdState::Hunting;
                bird.bees_caught = 0;
            }
        }
    }
}

fn hunt(
    world: &mut World,
    entity: Entity,
    boid: &mut Boid,
    bee_grid: &SpatialGrid,
    flowers: &mut Flowers,
    hives: &mut Hives,
    live_birds: usize,
    rng: &mut impl Rng,
) {
    // Nearest living bee among the grid candidates. The snapshot may include
    // bees another bird killed earlier this tick, so liveness is re-checked
    // against the world.
    let visual_sq = boid.settings.visual_range * boid.settings.visual_range;
    let mut nearest: Option<(Entity, Vec2, f32)> = None;
    for candidate in bee_grid.query(boid.position) {
        let dist_sq = boid.position.distance_squared(&candidate.position);
        if dist_sq >= visual_sq {
            continue;
        }
        let alive = world
            .get::<&Boid>(candidate.entity)
            .map(|b| b.alive)
            .unwrap_or(false);
        if !alive {
            continue;
        }
        if nearest.map(|(_, _, d)| dist_sq < d).unwrap_or(true) {
            nearest = Some((candidate.entity, candidate.position, dist_sq));
        }
    }

    let Some((prey, prey_pos, dist_sq)) = nearest else {
        flocking::wander(boid, rng);
        return;
    };

    // Raw pursuit: no normalization, so closer prey pulls harder
    boid.velocity += (prey_pos - boid.position) * boid.settings.hunt_factor;

    // A fast pass extends the reach of the strike
    let reach = boid.settings.kill_range + boid.speed();
    if dist_sq < reach * reach {
        if let Ok(mut prey_boid) = world.get::<&mut Boid>(prey) {
            prey_boid.die(DeathCause::Predation);
        }
        if let Ok(mut prey_bee) = world.get::<&mut Bee>(prey) {
            bee::release_bee_resources(&mut prey_bee, flowers, hives);
        }
        boid.feed(CATCH_ENERGY);

        if let Ok(mut bird) = world.get::<&mut Bird>(entity) {
            bird.bees_caught += 1;
            if bird.bees_caught >= BEES_CAUGHT_TO_MATE {
                if live_birds < MAX_BIRDS {
                    bird.state = BirdState::SeekingMate;
                } else {
                    // At the cap the urge passes unfulfilled
                    bird.bees_caught = 0;
                }
            }
        }
    }
}

fn seek_mate(
    world: &mut World,
    entity: Entity,
    boid: &mut Boid,
    neighbors: &[crate::grid::GridEntry],
    nests: &mut Nests,
    rng: &mut impl Rng,
) {
    let visual_sq = boid.settings.visual_range * boid.settings.visual_range;

    let mut candidate = None;
    for other in neighbors {
        if other.entity == entity {
            continue;
        }
        if boid.position.distance_squared(&other.position) >= visual_sq {
            continue;
        }
        let eligible = world
            .get::<&Bird>(other.entity)
            .map(|b| b.state == BirdState::SeekingMate && b.partner.is_none())
            .unwrap_or(false);
        let alive = world
            .get::<&Boid>(other.entity)
            .map(|b| b.alive)
            .unwrap_or(false);
        if eligible && alive {
            candidate = Some((other.entity, other.position));
            break;
        }
    }

    let Some((mate, mate_pos)) = candidate else {
        flocking::wander(boid, rng);
        return;
    };

    // No nest, no pairing: both keep seeking
    let midpoint = (boid.position + mate_pos) * 0.5;
    let Some(nest) = nests.claim_nearest_available(midpoint) else {
        flocking::wander(boid, rng);
        return;
    };

    if let Ok(mut bird) = world.get::<&mut Bird>(entity) {
        bird.partner = Some(mate);
        bird.mating_nest = Some(nest);
        bird.state = BirdState::GoToNest;
    }
    if let Ok(mut bird) = world.get::<&mut Bird>(mate) {
        bird.partner = Some(entity);
        bird.mating_nest = Some(nest);
        bird.state = BirdState::GoToNest;
    }
}

fn go_to_nest(world: &mut World, entity: Entity, boid: &mut Boid, nests: &mut Nests) {
    let (partner, nest_id) = match world.get::<&Bird>(entity) {
        Ok(bird) => (bird.partner, bird.mating_nest),
        Err(_) => return,
    };

    let partner_pos = partner.and_then(|p| {
        world
            .get::<&Boid>(p)
            .ok()
            .filter(|b| b.alive)
            .map(|b| b.position)
    });

    // Partner gone, reservation lost, or egg already laid: call it off
    let nest_ok = nest_id
        .and_then(|id| nests.get(id))
        .map(|n| !n.has_egg)
        .unwrap_or(false);
    if partner_pos.is_none() || !nest_ok {
        reset_mating(world, entity, nests);
        return;
    }

    let nest_id = match nest_id {
        Some(id) => id,
        None => return,
    };
    let nest_pos = match nests.get(nest_id) {
        Some(n) => n.position,
        None => return,
    };

    flocking::seek(boid, nest_pos, NEST_SEEK_WEIGHT, NEST_TAPER_RADIUS);
    if let Some(pos) = partner_pos {
        // Light pull keeps the pair flying together
        boid.velocity += (pos - boid.position) * PARTNER_COHESION_WEIGHT;
    }

    if boid.position.distance(&nest_pos) < NEST_ARRIVAL_RADIUS {
        if let Some(nest) = nests.get_mut(nest_id) {
            if !nest.occupants.contains(&entity) {
                nest.occupants.push(entity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::AgentKind;
    use crate::genetics::{Dna, Genes};
    use crate::grid::GridEntry;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const BOUNDS: WorldBounds = WorldBounds {
        width: 800.0,
        height: 600.0,
        ground_height: 80.0,
    };

    struct Fixture {
        world: World,
        flowers: Flowers,
        hives: Hives,
        nests: Nests,
        bird_grid: SpatialGrid,
        bee_grid: SpatialGrid,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                world: World::new(),
                flowers: Flowers::new(),
                hives: Hives::new(),
                nests: Nests::new(),
                bird_grid: SpatialGrid::new(800.0, 600.0, 75.0),
                bee_grid: SpatialGrid::new(800.0, 600.0, 50.0),
            }
        }

        fn spawn_bird(&mut self, position: Vec2) -> Entity {
            let boid = Boid::new(
                AgentKind::Bird,
                position,
                Vec2::ZERO,
                Dna::preset(AgentKind::Bird),
                1.0,
            );
            let mut rng = StdRng::seed_from_u64(7);
            let genes = Genes::random(&[], &mut rng);
            self.world.spawn((boid, Bird::new(genes, None)))
        }

        fn spawn_bee(&mut self, position: Vec2) -> Entity {
            let mut hives = Hives::new();
            let hive = hives.add(Vec2::ZERO);
            let boid = Boid::new(
                AgentKind::Bee,
                position,
                Vec2::ZERO,
                Dna::preset(AgentKind::Bee),
                1.0,
            );
            self.world.spawn((boid, Bee::new(hive)))
        }

        fn rebuild_grids(&mut self) {
            self.bird_grid.clear();
            self.bee_grid.clear();
            let mut entries = Vec::new();
            for (e, boid) in self.world.query::<&Boid>().iter() {
                if boid.alive {
                    entries.push((
                        boid.kind,
                        GridEntry {
                            entity: e,
                            position: boid.position,
                            velocity: boid.velocity,
                        },
                    ));
                }
            }
            for (kind, entry) in entries {
                match kind {
                    AgentKind::Bird => self.bird_grid.insert(entry),
                    AgentKind::Bee => self.bee_grid.insert(entry),
                }
            }
        }

        fn run(&mut self) {
            self.rebuild_grids();
            let live = self
                .world
                .query::<(&Boid, &Bird)>()
                .iter()
                .filter(|(_, (b, _))| b.alive)
                .count();
            let mut rng = StdRng::seed_from_u64(3);
            bird_system(
                &mut self.world,
                &self.bird_grid,
                &self.bee_grid,
                &mut self.flowers,
                &mut self.hives,
                &mut self.nests,
                &BOUNDS,
                live,
                &mut rng,
            );
        }
    }

    #[test]
    fn test_catch_within_reach_vanishes_bee_and_feeds() {
        let mut fx = Fixture::new();
        let bird = fx.spawn_bird(Vec2::new(100.0, 100.0));
        let bee = fx.spawn_bee(Vec2::new(103.0, 100.0));
        let energy_before = fx.world.get::<&Boid>(bird).unwrap().energy;

        fx.run();

        let prey = fx.world.get::<&Boid>(bee).unwrap();
        assert!(!prey.alive);
        assert!(prey.vanished, "predation leaves no corpse");
        let hunter = fx.world.get::<&Bird>(bird).unwrap();
        assert_eq!(hunter.bees_caught, 1);
        assert!(fx.world.get::<&Boid>(bird).unwrap().energy > energy_before);
    }

    #[test]
    fn test_one_kill_per_bird_per_tick() {
        let mut fx = Fixture::new();
        fx.spawn_bird(Vec2::new(100.0, 100.0));
        let b1 = fx.spawn_bee(Vec2::new(102.0, 100.0));
        let b2 = fx.spawn_bee(Vec2::new(98.0, 100.0));

        fx.run();

        let dead = [b1, b2]
            .iter()
            .filter(|e| !fx.world.get::<&Boid>(**e).unwrap().alive)
            .count();
        assert_eq!(dead, 1);
    }

    #[test]
    fn test_catch_threshold_triggers_mate_seeking() {
        let mut fx = Fixture::new();
        let bird = fx.spawn_bird(Vec2::new(100.0, 100.0));
        fx.world.get::<&mut Bird>(bird).unwrap().bees_caught = BEES_CAUGHT_TO_MATE - 1;
        fx.spawn_bee(Vec2::new(103.0, 100.0));

        fx.run();

        let hunter = fx.world.get::<&Bird>(bird).unwrap();
        assert_eq!(hunter.state, BirdState::SeekingMate);
        assert_eq!(hunter.bees_caught, BEES_CAUGHT_TO_MATE);
    }

    #[test]
    fn test_population_cap_resets_counter_instead() {
        let mut fx = Fixture::new();
        let bird = fx.spawn_bird(Vec2::new(100.0, 100.0));
        fx.world.get::<&mut Bird>(bird).unwrap().bees_caught = BEES_CAUGHT_TO_MATE - 1;
        fx.spawn_bee(Vec2::new(103.0, 100.0));
        // Pad the population to the cap
        for i in 0..MAX_BIRDS {
            fx.spawn_bird(Vec2::new(500.0 + (i % 10) as f32 * 8.0, 300.0));
        }

        fx.run();

        let hunter = fx.world.get::<&Bird>(bird).unwrap();
        assert_eq!(hunter.state, BirdState::Hunting);
        assert_eq!(hunter.bees_caught, 0);
    }

    #[test]
    fn test_pairing_is_mutual_and_claims_nest() {
        let mut fx = Fixture::new();
        let nest = fx.nests.add(Vec2::new(150.0, 200.0));
        let a = fx.spawn_bird(Vec2::new(100.0, 100.0));
        let b = fx.spawn_bird(Vec2::new(110.0, 100.0));
        fx.world.get::<&mut Bird>(a).unwrap().state = BirdState::SeekingMate;
        fx.world.get::<&mut Bird>(b).unwrap().state = BirdState::SeekingMate;

        fx.run();

        let bird_a = fx.world.get::<&Bird>(a).unwrap();
        let bird_b = fx.world.get::<&Bird>(b).unwrap();
        assert_eq!(bird_a.partner, Some(b));
        assert_eq!(bird_b.partner, Some(a));
        assert_eq!(bird_a.mating_nest, Some(nest));
        assert_eq!(bird_b.mating_nest, Some(nest));
        assert_eq!(bird_a.state, BirdState::GoToNest);
        assert_eq!(bird_b.state, BirdState::GoToNest);
        assert!(!fx.nests.get(nest).unwrap().available);
    }

    #[test]
    fn test_no_nest_means_no_pairing() {
        let mut fx = Fixture::new();
        let a = fx.spawn_bird(Vec2::new(100.0, 100.0));
        let b = fx.spawn_bird(Vec2::new(110.0, 100.0));
        fx.world.get::<&mut Bird>(a).unwrap().state = BirdState::SeekingMate;
        fx.world.get::<&mut Bird>(b).unwrap().state = BirdState::SeekingMate;

        fx.run();

        assert!(fx.world.get::<&Bird>(a).unwrap().partner.is_none());
        assert!(fx.world.get::<&Bird>(b).unwrap().partner.is_none());
    }

    #[test]
    fn test_partner_death_resets_both_sides_and_frees_nest() {
        let mut fx = Fixture::new();
        let nest = fx.nests.add(Vec2::new(400.0, 300.0));
        let a = fx.spawn_bird(Vec2::new(100.0, 100.0));
        let b = fx.spawn_bird(Vec2::new(110.0, 100.0));
        let claimed = fx.nests.claim_nearest_available(Vec2::new(105.0, 100.0));
        assert_eq!(claimed, Some(nest));
        for (me, other) in [(a, b), (b, a)] {
            let mut bird = fx.world.get::<&mut Bird>(me).unwrap();
            bird.partner = Some(other);
            bird.mating_nest = Some(nest);
            bird.state = BirdState::GoToNest;
        }

        // Partner starves this tick; survivor notices and resets
        fx.world.get::<&mut Boid>(b).unwrap().energy = 0.001;
        fx.run();

        let survivor = fx.world.get::<&Bird>(a).unwrap();
        assert_eq!(survivor.state, BirdState::Hunting);
        assert!(survivor.partner.is_none());
        assert!(survivor.mating_nest.is_none());
        assert!(fx.nests.get(nest).unwrap().available);
    }

    #[test]
    fn test_arrival_joins_nest_occupants() {
        let mut fx = Fixture::new();
        let nest_pos = Vec2::new(200.0, 200.0);
        let nest = fx.nests.add(nest_pos);
        let a = fx.spawn_bird(nest_pos + Vec2::new(5.0, 0.0));
        let b = fx.spawn_bird(nest_pos - Vec2::new(5.0, 0.0));
        assert!(fx.nests.claim_nearest_available(nest_pos).is_some());
        for (me, other) in [(a, b), (b, a)] {
            let mut bird = fx.world.get::<&mut Bird>(me).unwrap();
            bird.partner = Some(other);
            bird.mating_nest = Some(nest);
            bird.state = BirdState::GoToNest;
        }

        fx.run();

        let occupants = &fx.nests.get(nest).unwrap().occupants;
        assert!(occupants.contains(&a));
        assert!(occupants.contains(&b));
    }
}
