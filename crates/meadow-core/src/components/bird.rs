//! Bird-specific state: predation, pair-bonding, and nesting fields.

use hecs::Entity;
use serde::{Deserialize, Serialize};

use crate::components::habitat::NestId;
use crate::genetics::Genes;

/// Bird behavior states. Transitions are driven by
/// [`crate::systems::bird_system`] each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BirdState {
    Hunting,
    SeekingMate,
    GoToNest,
}

/// Bird component, attached alongside [`crate::components::Boid`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bird {
    /// Nest this bird hatched at, if any.
    pub home_nest: Option<NestId>,
    /// Nest reserved for the current mating attempt.
    pub mating_nest: Option<NestId>,
    /// Mutual: if A's partner is B then B's partner is A. Maintained by the
    /// pairing and reset routines, never written directly elsewhere.
    #[serde(skip)]
    pub partner: Option<Entity>,
    /// Catches since the last mating cycle; gates mate-seeking eligibility.
    pub bees_caught: u32,
    pub state: BirdState,
    /// Heritable visual description, distinct from the numeric DNA.
    pub genes: Genes,
}

impl Bird {
    pub fn new(genes: Genes, home_nest: Option<NestId>) -> Self {
        Self {
            home_nest,
            mating_nest: None,
            partner: None,
            bees_caught: 0,
            state: BirdState::Hunting,
            genes,
        }
    }
}
