//! Meadow Core - Ecosystem Simulation Engine
//!
//! An ECS-based simulation of a small meadow ecosystem: flocking bees that
//! forage nectar for their hives, and birds that hunt them, pair up, and
//! raise chicks in nests. Traits evolve across generations through numeric
//! DNA and heritable visual genes.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: Birds and bees
//! - **Components**: Pure data attached to agents (Boid, Bee, Bird)
//! - **Systems**: Logic that queries and updates components each tick
//!
//! Hives, nests, and flowers live in engine-owned registries addressed by
//! index handles; bees and birds reference them through those handles rather
//! than entity ids.
//!
//! # Example
//!
//! ```rust,no_run
//! use meadow_core::prelude::*;
//! use meadow_core::generation::{generate_meadow, MeadowConfig};
//!
//! let mut rng = rand::thread_rng();
//! let mut sim = generate_meadow(&MeadowConfig::default(), &mut rng);
//!
//! // Run simulation
//! loop {
//!     sim.tick();
//! }
//! ```

pub mod components;
pub mod engine;
pub mod generation;
pub mod genetics;
pub mod grid;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::{PopulationStats, Simulation};
    pub use crate::genetics::{Dna, Genes, Trait};
}
