//! Bee-specific state: foraging state machine fields and hive membership.

use serde::{Deserialize, Serialize};

use crate::components::habitat::{FlowerId, HiveId, PetalClaim};

/// Bee behavior states. Transitions are driven by
/// [`crate::systems::bee_system`] each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeeState {
    SeekingFlower,
    GatheringNectar,
    ReturnToHive,
}

/// Bee component, attached alongside [`crate::components::Boid`].
#[derive(Debug, Serialize, Deserialize)]
pub struct Bee {
    /// Birth colony; the shared flower memory consulted while foraging.
    pub hive: HiveId,
    pub state: BeeState,
    /// Carried nectar, capped at `settings.nectar_capacity`.
    pub nectar: f32,
    pub target_flower: Option<FlowerId>,
    /// Occupancy token for the claimed petal. Move-only: surrendered back to
    /// the flower registry on every exit path, including death.
    #[serde(skip)]
    pub target_petal: Option<PetalClaim>,
    /// Destination for the current return trip; may differ from the birth
    /// hive under load balancing.
    pub target_hive: Option<HiveId>,
    /// Fed into the hive's shared knowledge on arrival (waggle dance).
    pub last_visited_flower: Option<FlowerId>,
    /// Remaining ticks of the current gathering session.
    pub gather_countdown: u32,
}

impl Bee {
    pub fn new(hive: HiveId) -> Self {
        Self {
            hive,
            state: BeeState::SeekingFlower,
            nectar: 0.0,
            target_flower: None,
            target_petal: None,
            target_hive: None,
            last_visited_flower: None,
            gather_countdown: 0,
        }
    }
}
