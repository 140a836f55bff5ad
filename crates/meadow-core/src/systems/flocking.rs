//! Steering math: the three classical flocking forces plus speed limiting,
//! boundary handling, targeted seeking, and the wander fallback.
//!
//! Separation, alignment, and cohesion share one pass over the neighbor
//! candidate set and use squared distances in the hot path. Boundary
//! handling wraps horizontally and repels softly from the top margin and the
//! ground band, with a hard clamp-and-bounce fail-safe against tunneling.

use hecs::Entity;
use rand::Rng;

use crate::components::{Boid, Vec2, WorldBounds};
use crate::grid::GridEntry;

/// Soft-repulsion margin below the top of the world.
pub const TOP_MARGIN: f32 = 50.0;
/// Soft-repulsion band above the ground; repulsion ramps linearly inside it.
pub const GROUND_MARGIN: f32 = 70.0;
const GROUND_REPULSION_MULT: f32 = 2.5;
const BOUNCE_DAMPING: f32 = -0.5;

const WANDER_JITTER: f32 = 0.3;
const WANDER_STRENGTH: f32 = 0.08;

/// Apply separation, alignment, and cohesion from the neighbor candidate set
/// in a single pass. Each force is independently zero when it has no
/// qualifying neighbors.
pub fn apply_flock_forces(boid: &mut Boid, me: Entity, neighbors: &[GridEntry]) {
    let visual_sq = boid.settings.visual_range * boid.settings.visual_range;
    let sep_sq = boid.settings.separation_distance * boid.settings.separation_distance;

    let mut sep = Vec2::ZERO;
    let mut ali = Vec2::ZERO;
    let mut coh = Vec2::ZERO;
    let mut sep_count = 0u32;
    let mut flock_count = 0u32;

    for other in neighbors {
        if other.entity == me {
            continue;
        }
        let dist_sq = boid.position.distance_squared(&other.position);
        if dist_sq <= 0.0 || dist_sq >= visual_sq {
            continue;
        }
        coh += other.position;
        ali += other.velocity;
        flock_count += 1;
        if dist_sq < sep_sq {
            let dist = dist_sq.sqrt();
            sep += (boid.position - other.position) * (1.0 / dist);
            sep_count += 1;
        }
    }

    if sep_count > 0 {
        let avg = sep * (1.0 / sep_count as f32);
        boid.velocity += avg * boid.settings.separation_factor;
    }

    if flock_count > 0 {
        let inv = 1.0 / flock_count as f32;

        let mean_vel = ali * inv;
        if mean_vel.length_squared() > 0.0 {
            let target = mean_vel.normalize() * boid.settings.max_speed;
            boid.velocity += (target - boid.velocity) * boid.settings.alignment_factor;
        }

        let centroid = coh * inv;
        let toward = centroid - boid.position;
        if toward.length_squared() > 0.0 {
            let target = toward.normalize() * boid.settings.max_speed;
            boid.velocity += (target - boid.velocity) * boid.settings.cohesion_factor;
        }
    }
}

/// Clamp velocity magnitude to `max_speed`. The common case compares squared
/// magnitudes and takes no square root.
pub fn limit_speed(boid: &mut Boid) {
    let max = boid.settings.max_speed;
    let speed_sq = boid.velocity.length_squared();
    if speed_sq > max * max {
        let ratio = max / speed_sq.sqrt();
        boid.velocity = boid.velocity * ratio;
    }
}

/// Boundary handling: horizontal wrap-around, soft top/ground repulsion, and
/// a hard ground clamp with a velocity-reversal bounce as a fail-safe.
pub fn avoid_edges(boid: &mut Boid, bounds: &WorldBounds) {
    if boid.position.x > bounds.width {
        boid.position.x = 0.0;
    } else if boid.position.x < 0.0 {
        boid.position.x = bounds.width;
    }

    if boid.position.y < TOP_MARGIN {
        boid.velocity.y += boid.settings.turn_factor;
    }

    let ground_level = bounds.ground_level();
    if boid.position.y > ground_level - GROUND_MARGIN {
        // Repulsion strengthens linearly as the agent nears the ground
        let depth = boid.position.y - (ground_level - GROUND_MARGIN);
        let repulsion =
            (depth / GROUND_MARGIN) * boid.settings.turn_factor * GROUND_REPULSION_MULT;
        boid.velocity.y -= repulsion;
    }

    if boid.position.y >= ground_level {
        boid.position.y = ground_level;
        boid.velocity.y *= BOUNCE_DAMPING;
    }
}

/// Steer toward a target point. `taper_radius` scales the desired speed down
/// linearly inside that distance so arrivals settle instead of orbiting;
/// pass 0.0 for full-speed pursuit.
pub fn seek(boid: &mut Boid, target: Vec2, weight: f32, taper_radius: f32) {
    let toward = target - boid.position;
    let dist = toward.length();
    if dist <= 0.0 {
        return;
    }
    let speed_scale = if taper_radius > 0.0 {
        (dist / taper_radius).min(1.0)
    } else {
        1.0
    };
    let desired = toward * (1.0 / dist) * (boid.settings.max_speed * speed_scale);
    boid.velocity += (desired - boid.velocity) * weight;
}

/// Smoothly-varying random heading, not pure noise: the wander angle drifts
/// by a bounded jitter each tick and nudges the velocity along it.
pub fn wander(boid: &mut Boid, rng: &mut impl Rng) {
    boid.wander_angle += rng.gen_range(-WANDER_JITTER..=WANDER_JITTER);
    boid.velocity += Vec2::from_angle(boid.wander_angle) * WANDER_STRENGTH;
}

/// Aggregate repulsion from every predator within visual range: the sum of
/// raw relative positions, scaled later by the agent's evade factor.
pub fn evade_vector(position: Vec2, visual_range: f32, predators: &[GridEntry]) -> Vec2 {
    let range_sq = visual_range * visual_range;
    let mut steering = Vec2::ZERO;
    for predator in predators {
        if position.distance_squared(&predator.position) < range_sq {
            steering += position - predator.position;
        }
    }
    steering
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::AgentKind;
    use crate::genetics::Dna;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn boid_at(pos: Vec2, vel: Vec2) -> Boid {
        Boid::new(AgentKind::Bee, pos, vel, Dna::preset(AgentKind::Bee), 1.0)
    }

    fn neighbor(pos: Vec2, vel: Vec2) -> GridEntry {
        GridEntry {
            entity: Entity::DANGLING,
            position: pos,
            velocity: vel,
        }
    }

    #[test]
    fn test_no_neighbors_no_force() {
        let mut boid = boid_at(Vec2::new(100.0, 100.0), Vec2::new(1.0, 0.0));
        apply_flock_forces(&mut boid, Entity::DANGLING, &[]);
        assert_eq!(boid.velocity, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_self_is_not_a_neighbor() {
        let mut boid = boid_at(Vec2::new(100.0, 100.0), Vec2::new(1.0, 0.0));
        let own_entry = neighbor(boid.position, boid.velocity);
        apply_flock_forces(&mut boid, Entity::DANGLING, &[own_entry]);
        // Same entity id: skipped entirely
        assert_eq!(boid.velocity, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_separation_pushes_apart() {
        let mut boid = boid_at(Vec2::new(100.0, 100.0), Vec2::ZERO);
        // Crowding neighbor just to the right, inside separation distance
        let crowder = neighbor(Vec2::new(104.0, 100.0), Vec2::ZERO);
        let mut world = hecs::World::new();
        let me = world.spawn(());
        apply_flock_forces(&mut boid, me, &[crowder]);
        assert!(boid.velocity.x < 0.0, "should be pushed left, away from the crowder");
    }

    #[test]
    fn test_alignment_steers_toward_flock_heading() {
        let mut world = hecs::World::new();
        let me = world.spawn(());
        let mut boid = boid_at(Vec2::new(100.0, 100.0), Vec2::ZERO);
        let flock = [
            neighbor(Vec2::new(130.0, 100.0), Vec2::new(2.0, 0.0)),
            neighbor(Vec2::new(100.0, 130.0), Vec2::new(2.0, 0.0)),
        ];
        apply_flock_forces(&mut boid, me, &flock);
        assert!(boid.velocity.x > 0.0, "should pick up the flock's +x heading");
    }

    #[test]
    fn test_limit_speed_clamps() {
        let mut boid = boid_at(Vec2::new(100.0, 100.0), Vec2::new(30.0, 40.0));
        limit_speed(&mut boid);
        assert!(boid.speed() <= boid.settings.max_speed + 1e-4);

        // Under the limit: untouched
        let mut slow = boid_at(Vec2::new(100.0, 100.0), Vec2::new(0.1, 0.1));
        let before = slow.velocity;
        limit_speed(&mut slow);
        assert_eq!(slow.velocity, before);
    }

    #[test]
    fn test_horizontal_wrap() {
        let bounds = WorldBounds::new(800.0, 600.0, 80.0);
        let mut boid = boid_at(Vec2::new(805.0, 300.0), Vec2::new(1.0, 0.0));
        avoid_edges(&mut boid, &bounds);
        assert_eq!(boid.position.x, 0.0);

        let mut boid = boid_at(Vec2::new(-2.0, 300.0), Vec2::new(-1.0, 0.0));
        avoid_edges(&mut boid, &bounds);
        assert_eq!(boid.position.x, 800.0);
    }

    #[test]
    fn test_ground_clamp_bounces() {
        let bounds = WorldBounds::new(800.0, 600.0, 80.0);
        let mut boid = boid_at(Vec2::new(400.0, 590.0), Vec2::new(0.0, 3.0));
        avoid_edges(&mut boid, &bounds);
        assert_eq!(boid.position.y, bounds.ground_level());
        assert!(boid.velocity.y < 0.0, "bounce reverses vertical velocity");
    }

    #[test]
    fn test_top_margin_repels_downward() {
        let bounds = WorldBounds::new(800.0, 600.0, 80.0);
        let mut boid = boid_at(Vec2::new(400.0, 10.0), Vec2::new(0.0, -1.0));
        let before = boid.velocity.y;
        avoid_edges(&mut boid, &bounds);
        assert!(boid.velocity.y > before);
    }

    #[test]
    fn test_seek_tapers_near_target() {
        let target = Vec2::new(130.0, 100.0);
        let mut far = boid_at(Vec2::new(10.0, 100.0), Vec2::ZERO);
        let mut near = boid_at(Vec2::new(125.0, 100.0), Vec2::ZERO);
        seek(&mut far, target, 1.0, 50.0);
        seek(&mut near, target, 1.0, 50.0);
        assert!(far.velocity.length() > near.velocity.length());
        assert!(near.velocity.x > 0.0);
    }

    #[test]
    fn test_wander_is_smooth() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut boid = boid_at(Vec2::new(100.0, 100.0), Vec2::ZERO);
        let mut last_angle = boid.wander_angle;
        for _ in 0..100 {
            wander(&mut boid, &mut rng);
            assert!((boid.wander_angle - last_angle).abs() <= WANDER_JITTER + 1e-6);
            last_angle = boid.wander_angle;
        }
    }

    #[test]
    fn test_evade_points_away_from_predators() {
        let pos = Vec2::new(100.0, 100.0);
        let predators = [
            neighbor(Vec2::new(120.0, 100.0), Vec2::ZERO),
            neighbor(Vec2::new(100.0, 130.0), Vec2::ZERO),
            // Out of range: ignored
            neighbor(Vec2::new(400.0, 400.0), Vec2::ZERO),
        ];
        let v = evade_vector(pos, 50.0, &predators);
        assert!(v.x < 0.0 && v.y < 0.0);
    }
}
