//! Shared agent life-cycle: aging, energy depletion, death, and the
//! post-death fall/fade before the corpse vanishes.

use crate::components::{Boid, DeathCause, Vec2, WorldBounds};

/// Downward acceleration applied to a falling corpse each tick.
pub const GRAVITY: f32 = 0.15;
/// Horizontal drag multiplier while falling.
pub const FALL_DRAG: f32 = 0.95;
/// Ticks a grounded corpse persists before vanishing.
pub const FADE_TICKS: u32 = 120;

/// Advance the shared life-cycle one tick. Returns true when the agent is
/// alive and should run its subtype behavior this tick; dead and vanished
/// agents return false and are skipped by callers, but stay in the master
/// list until vanished.
pub fn advance(boid: &mut Boid, bounds: &WorldBounds) -> bool {
    if boid.vanished {
        return false;
    }
    if !boid.alive {
        fall(boid, bounds);
        return false;
    }

    boid.age += 1;
    boid.energy -= boid.settings.energy_depletion;

    // Age is checked first: an ancient agent dies of old age even if it
    // starved on the same tick.
    if boid.age > boid.settings.max_lifetime {
        boid.die(DeathCause::OldAge);
        return false;
    }
    if boid.energy <= 0.0 {
        boid.die(DeathCause::Starvation);
        return false;
    }
    true
}

/// Fall under gravity with horizontal drag until the ground, then fade out.
fn fall(boid: &mut Boid, bounds: &WorldBounds) {
    let ground = bounds.ground_level();
    if boid.position.y < ground {
        boid.velocity.y += GRAVITY;
        boid.velocity.x *= FALL_DRAG;
        boid.position += boid.velocity;
        if boid.position.y >= ground {
            boid.position.y = ground;
            boid.velocity = Vec2::ZERO;
        }
    } else {
        boid.velocity = Vec2::ZERO;
        boid.death_timer += 1;
        if boid.death_timer > FADE_TICKS {
            boid.vanished = true;
        }
    }
}
