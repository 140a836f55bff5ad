//! Hives, nests, flowers, and petals: the shared mutable resources agents
//! claim and release. Petal occupancy is guarded by a move-only claim token
//! so every claim has exactly one matching release.

use hecs::Entity;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::components::common::Vec2;
use crate::genetics::{Dna, DnaPool, Genes};

/// How many flower locations a hive's shared memory retains.
pub const KNOWN_FLOWER_CAP: usize = 6;
/// Ticks a paired couple spends at the nest before the egg is laid.
pub const NESTING_TICKS: u32 = 300;
/// Ticks from egg to hatchling.
pub const HATCHING_TICKS: u32 = 600;

/// Stable handle into the flower registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowerId(pub usize);

/// Stable handle into the hive registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HiveId(pub usize);

/// Stable handle into the nest registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NestId(pub usize);

/// An individually-claimable nectar source within a flower.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Petal {
    pub position: Vec2,
    /// Regenerates continuously up to 1.0.
    pub nectar: f32,
    /// At most one bee may target a petal at a time.
    pub occupied: bool,
}

impl Petal {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            nectar: 1.0,
            occupied: false,
        }
    }
}

/// A flower owns multiple petal points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flower {
    pub position: Vec2,
    pub petals: Vec<Petal>,
}

impl Flower {
    pub fn total_nectar(&self) -> f32 {
        self.petals.iter().map(|p| p.nectar).sum()
    }

    pub fn occupant_count(&self) -> usize {
        self.petals.iter().filter(|p| p.occupied).count()
    }
}

/// Proof of petal occupancy. Not cloneable: the token is surrendered back to
/// [`Flowers::release`], so a claim cannot leak through a copied handle.
#[derive(Debug, PartialEq, Eq)]
pub struct PetalClaim {
    pub flower: FlowerId,
    petal: usize,
}

/// Flower registry. Flowers persist for the simulation's duration; bees hold
/// [`FlowerId`]s and [`PetalClaim`]s into it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Flowers {
    entries: Vec<Flower>,
}

impl Flowers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, position: Vec2, petal_positions: &[Vec2]) -> FlowerId {
        let petals = petal_positions.iter().map(|p| Petal::new(*p)).collect();
        self.entries.push(Flower { position, petals });
        FlowerId(self.entries.len() - 1)
    }

    pub fn get(&self, id: FlowerId) -> Option<&Flower> {
        self.entries.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FlowerId, &Flower)> {
        self.entries.iter().enumerate().map(|(i, f)| (FlowerId(i), f))
    }

    /// Claim the first unoccupied petal with at least `min_nectar`. The
    /// returned token must be passed back to [`Flowers::release`].
    pub fn claim(&mut self, id: FlowerId, min_nectar: f32) -> Option<PetalClaim> {
        let flower = self.entries.get_mut(id.0)?;
        let idx = flower
            .petals
            .iter()
            .position(|p| !p.occupied && p.nectar >= min_nectar)?;
        flower.petals[idx].occupied = true;
        Some(PetalClaim {
            flower: id,
            petal: idx,
        })
    }

    /// Release a claimed petal, consuming the token.
    pub fn release(&mut self, claim: PetalClaim) {
        if let Some(flower) = self.entries.get_mut(claim.flower.0) {
            if let Some(petal) = flower.petals.get_mut(claim.petal) {
                petal.occupied = false;
            }
        }
    }

    pub fn petal_position(&self, claim: &PetalClaim) -> Option<Vec2> {
        self.entries
            .get(claim.flower.0)
            .and_then(|f| f.petals.get(claim.petal))
            .map(|p| p.position)
    }

    pub fn petal_nectar(&self, claim: &PetalClaim) -> f32 {
        self.entries
            .get(claim.flower.0)
            .and_then(|f| f.petals.get(claim.petal))
            .map(|p| p.nectar)
            .unwrap_or(0.0)
    }

    /// Drain up to `amount` nectar from the claimed petal, returning the
    /// amount actually transferred.
    pub fn take_nectar(&mut self, claim: &PetalClaim, amount: f32) -> f32 {
        if let Some(petal) = self
            .entries
            .get_mut(claim.flower.0)
            .and_then(|f| f.petals.get_mut(claim.petal))
        {
            let taken = amount.min(petal.nectar).max(0.0);
            petal.nectar -= taken;
            taken
        } else {
            0.0
        }
    }

    /// Per-tick petal regeneration toward 1.0.
    pub fn regenerate(&mut self, rate: f32) {
        for flower in &mut self.entries {
            for petal in &mut flower.petals {
                petal.nectar = (petal.nectar + rate).min(1.0);
            }
        }
    }
}

/// A bee colony: nectar stockpile, shared flower memory, and the DNA pool of
/// returning foragers that seeds the next brood.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hive {
    pub position: Vec2,
    pub nectar: f32,
    pub dna_pool: DnaPool,
    pub known_flowers: VecDeque<FlowerId>,
    /// Bees currently inbound; used for load-balancing hive choice.
    pub bees_en_route: u32,
}

impl Hive {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            nectar: 0.0,
            dna_pool: DnaPool::new(),
            known_flowers: VecDeque::new(),
            bees_en_route: 0,
        }
    }

    /// Waggle dance: share a profitable flower with the colony. Bounded FIFO;
    /// duplicates are not re-added.
    pub fn remember_flower(&mut self, flower: FlowerId) {
        if self.known_flowers.contains(&flower) {
            return;
        }
        self.known_flowers.push_back(flower);
        if self.known_flowers.len() > KNOWN_FLOWER_CAP {
            self.known_flowers.pop_front();
        }
    }

    pub fn random_known_flower(&self, rng: &mut impl Rng) -> Option<FlowerId> {
        if self.known_flowers.is_empty() {
            None
        } else {
            Some(self.known_flowers[rng.gen_range(0..self.known_flowers.len())])
        }
    }
}

/// Hive registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hives {
    entries: Vec<Hive>,
}

impl Hives {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, position: Vec2) -> HiveId {
        self.entries.push(Hive::new(position));
        HiveId(self.entries.len() - 1)
    }

    pub fn get(&self, id: HiveId) -> Option<&Hive> {
        self.entries.get(id.0)
    }

    pub fn get_mut(&mut self, id: HiveId) -> Option<&mut Hive> {
        self.entries.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (HiveId, &Hive)> {
        self.entries.iter().enumerate().map(|(i, h)| (HiveId(i), h))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (HiveId, &mut Hive)> {
        self.entries
            .iter_mut()
            .enumerate()
            .map(|(i, h)| (HiveId(i), h))
    }

    /// A bee committed to this hive for its return trip.
    pub fn mark_inbound(&mut self, id: HiveId) {
        if let Some(hive) = self.entries.get_mut(id.0) {
            hive.bees_en_route += 1;
        }
    }

    /// The inbound bee arrived, died, or abandoned the trip.
    pub fn clear_inbound(&mut self, id: HiveId) {
        if let Some(hive) = self.entries.get_mut(id.0) {
            hive.bees_en_route = hive.bees_en_route.saturating_sub(1);
        }
    }
}

/// A nesting site for a paired couple of birds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nest {
    pub position: Vec2,
    /// Paired birds that have physically arrived (at most 2).
    #[serde(skip)]
    pub occupants: Vec<Entity>,
    pub has_egg: bool,
    pub hatching_countdown: u32,
    pub nesting_countdown: u32,
    pub available: bool,
    /// Snapshotted at the moment the egg is laid, so the chick inherits from
    /// the parents as they were even if one dies before hatching.
    pub parent_genes: Option<(Genes, Genes)>,
    pub parent_dna: Option<(Dna, Dna)>,
}

impl Nest {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            occupants: Vec::new(),
            has_egg: false,
            hatching_countdown: 0,
            nesting_countdown: NESTING_TICKS,
            available: true,
            parent_genes: None,
            parent_dna: None,
        }
    }
}

/// Nest registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Nests {
    entries: Vec<Nest>,
}

impl Nests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, position: Vec2) -> NestId {
        self.entries.push(Nest::new(position));
        NestId(self.entries.len() - 1)
    }

    pub fn get(&self, id: NestId) -> Option<&Nest> {
        self.entries.get(id.0)
    }

    pub fn get_mut(&mut self, id: NestId) -> Option<&mut Nest> {
        self.entries.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NestId, &Nest)> {
        self.entries.iter().enumerate().map(|(i, n)| (NestId(i), n))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NestId, &mut Nest)> {
        self.entries
            .iter_mut()
            .enumerate()
            .map(|(i, n)| (NestId(i), n))
    }

    /// Claim the nearest available nest, marking it unavailable and resetting
    /// its nesting countdown. None when every nest is taken.
    pub fn claim_nearest_available(&mut self, position: Vec2) -> Option<NestId> {
        let id = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, n)| n.available && !n.has_egg)
            .min_by(|(_, a), (_, b)| {
                a.position
                    .distance_squared(&position)
                    .partial_cmp(&b.position.distance_squared(&position))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| NestId(i))?;
        let nest = &mut self.entries[id.0];
        nest.available = false;
        nest.nesting_countdown = NESTING_TICKS;
        Some(id)
    }

    /// Abandon a reservation: only frees the nest if no egg has been laid,
    /// so an in-progress clutch is never discarded.
    pub fn abandon(&mut self, id: NestId, bird_a: Entity, partner: Option<Entity>) {
        if let Some(nest) = self.entries.get_mut(id.0) {
            nest.occupants
                .retain(|e| *e != bird_a && Some(*e) != partner);
            if !nest.has_egg {
                nest.available = true;
                nest.nesting_countdown = NESTING_TICKS;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn one_flower() -> (Flowers, FlowerId) {
        let mut flowers = Flowers::new();
        let id = flowers.add(
            Vec2::new(100.0, 100.0),
            &[
                Vec2::new(98.0, 98.0),
                Vec2::new(102.0, 98.0),
                Vec2::new(100.0, 104.0),
            ],
        );
        (flowers, id)
    }

    #[test]
    fn test_petal_single_occupancy() {
        let (mut flowers, id) = one_flower();

        let c1 = flowers.claim(id, 0.2).unwrap();
        let c2 = flowers.claim(id, 0.2).unwrap();
        let c3 = flowers.claim(id, 0.2).unwrap();
        assert_ne!(c1, c2);
        assert_ne!(c2, c3);
        // All petals taken
        assert!(flowers.claim(id, 0.2).is_none());
        assert_eq!(flowers.get(id).unwrap().occupant_count(), 3);

        flowers.release(c2);
        assert_eq!(flowers.get(id).unwrap().occupant_count(), 2);
        // The freed petal can be claimed again
        assert!(flowers.claim(id, 0.2).is_some());
        flowers.release(c1);
        flowers.release(c3);
    }

    #[test]
    fn test_claim_respects_min_nectar() {
        let (mut flowers, id) = one_flower();
        let c = flowers.claim(id, 0.2).unwrap();
        let drained = flowers.take_nectar(&c, 10.0);
        assert!((drained - 1.0).abs() < 1e-6);
        assert_eq!(flowers.petal_nectar(&c), 0.0);
        flowers.release(c);

        // First petal is empty now; claiming skips it for a nectar-bearing one
        let c2 = flowers.claim(id, 0.2).unwrap();
        assert!(flowers.petal_nectar(&c2) >= 0.2);
        flowers.release(c2);
    }

    #[test]
    fn test_nectar_never_negative_and_regen_caps() {
        let (mut flowers, id) = one_flower();
        let c = flowers.claim(id, 0.0).unwrap();
        flowers.take_nectar(&c, 5.0);
        flowers.take_nectar(&c, 5.0);
        assert!(flowers.petal_nectar(&c) >= 0.0);

        for _ in 0..10_000 {
            flowers.regenerate(0.002);
        }
        assert!(flowers.get(id).unwrap().petals.iter().all(|p| p.nectar <= 1.0));
        flowers.release(c);
    }

    #[test]
    fn test_hive_flower_memory_bounded() {
        let mut hive = Hive::new(Vec2::ZERO);
        for i in 0..10 {
            hive.remember_flower(FlowerId(i));
        }
        assert_eq!(hive.known_flowers.len(), KNOWN_FLOWER_CAP);
        // Oldest evicted first
        assert!(!hive.known_flowers.contains(&FlowerId(0)));
        assert!(hive.known_flowers.contains(&FlowerId(9)));

        // Duplicates don't grow the list
        hive.remember_flower(FlowerId(9));
        assert_eq!(hive.known_flowers.len(), KNOWN_FLOWER_CAP);

        let mut rng = StdRng::seed_from_u64(1);
        assert!(hive.random_known_flower(&mut rng).is_some());
    }

    #[test]
    fn test_nest_claim_and_abandon() {
        let mut nests = Nests::new();
        let far = nests.add(Vec2::new(500.0, 100.0));
        let near = nests.add(Vec2::new(120.0, 100.0));

        let claimed = nests.claim_nearest_available(Vec2::new(100.0, 100.0));
        assert_eq!(claimed, Some(near));
        assert!(!nests.get(near).unwrap().available);

        // Second claim takes the remaining nest, third finds none
        assert_eq!(nests.claim_nearest_available(Vec2::ZERO), Some(far));
        assert!(nests.claim_nearest_available(Vec2::ZERO).is_none());

        nests.abandon(near, hecs::Entity::DANGLING, None);
        assert!(nests.get(near).unwrap().available);

        // A nest holding an egg is not freed by abandonment
        nests.get_mut(far).unwrap().has_egg = true;
        nests.abandon(far, hecs::Entity::DANGLING, None);
        assert!(!nests.get(far).unwrap().available);
    }
}
