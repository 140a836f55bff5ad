//! The shared agent record: kinematics, resolved settings, heritable DNA,
//! and the alive/falling/vanished life-cycle state common to birds and bees.

use serde::{Deserialize, Serialize};

use crate::components::common::Vec2;
use crate::genetics::{Dna, Trait};

/// Which species an agent belongs to. State-machine behavior dispatches on
/// this tag; the shared life-cycle and flocking code never needs it beyond
/// settings resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Bird,
    Bee,
}

/// Why an agent died. Predation is a distinct terminal path: eaten agents
/// vanish immediately instead of falling and fading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    OldAge,
    Starvation,
    Predation,
}

/// Resolved parameter bundle: heritable traits pulled from DNA plus the
/// non-heritable species constants, scaled by the world-scale factor once at
/// spawn and fixed thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub max_speed: f32,
    pub visual_range: f32,
    pub separation_distance: f32,
    pub separation_factor: f32,
    pub alignment_factor: f32,
    pub cohesion_factor: f32,
    pub turn_factor: f32,
    pub evade_factor: f32,
    pub hunt_factor: f32,
    pub max_lifetime: u32,
    pub initial_energy: f32,
    pub energy_depletion: f32,
    pub nectar_capacity: f32,
    pub kill_range: f32,
}

impl Settings {
    /// Resolve settings from DNA for the given kind. Speed-like and
    /// range-like values pick up the world-scale factor here; force weights
    /// and lifetimes are scale-free.
    pub fn from_dna(kind: AgentKind, dna: &Dna, world_scale: f32) -> Self {
        let (initial_energy, energy_depletion, nectar_capacity, kill_range) = match kind {
            AgentKind::Bee => (100.0, 0.02, 3.0, 0.0),
            AgentKind::Bird => (120.0, 0.015, 0.0, 5.0 * world_scale),
        };
        Self {
            max_speed: dna.get(Trait::MaxSpeed) * world_scale,
            visual_range: dna.get(Trait::VisualRange) * world_scale,
            separation_distance: dna.get(Trait::SeparationDistance) * world_scale,
            separation_factor: dna.get(Trait::SeparationFactor),
            alignment_factor: dna.get(Trait::AlignmentFactor),
            cohesion_factor: dna.get(Trait::CohesionFactor),
            turn_factor: dna.get(Trait::TurnFactor),
            evade_factor: dna.get(Trait::EvadeFactor),
            hunt_factor: dna.get(Trait::HuntFactor),
            max_lifetime: dna.get(Trait::MaxLifetime) as u32,
            initial_energy,
            energy_depletion,
            nectar_capacity,
            kill_range,
        }
    }
}

/// Shared agent component. Bird- and bee-specific state lives in the
/// [`crate::components::Bird`] and [`crate::components::Bee`] components
/// attached alongside this one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boid {
    pub kind: AgentKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub settings: Settings,
    pub dna: Dna,
    /// False once dead; the corpse keeps falling until it vanishes.
    pub alive: bool,
    /// True once the corpse has fully decayed and must leave all collections.
    pub vanished: bool,
    /// Ticks since spawn.
    pub age: u32,
    pub energy: f32,
    /// Ticks since the corpse touched the ground; drives the fade-out.
    pub death_timer: u32,
    /// Smoothly-varying heading for the wander fallback.
    pub wander_angle: f32,
}

impl Boid {
    pub fn new(kind: AgentKind, position: Vec2, velocity: Vec2, dna: Dna, world_scale: f32) -> Self {
        let settings = Settings::from_dna(kind, &dna, world_scale);
        Self {
            kind,
            position,
            velocity,
            settings,
            dna,
            alive: true,
            vanished: false,
            age: 0,
            energy: settings.initial_energy,
            death_timer: 0,
            wander_angle: 0.0,
        }
    }

    /// Kill the agent. Natural deaths keep the current velocity so the body
    /// carries its trajectory into the fall phase; predation removes the
    /// agent immediately (no corpse).
    pub fn die(&mut self, cause: DeathCause) {
        if !self.alive {
            return;
        }
        self.alive = false;
        if cause == DeathCause::Predation {
            self.vanished = true;
        }
    }

    /// Replenish energy from feeding or a successful catch.
    pub fn feed(&mut self, amount: f32) {
        self.energy += amount;
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }
}
