//! Per-tick simulation systems, run in a fixed order by the engine:
//! bees, birds, then reproduction.

pub mod bee;
pub mod bird;
pub mod flocking;
pub mod lifecycle;
pub mod reproduction;

pub use bee::bee_system;
pub use bird::bird_system;
pub use reproduction::reproduction_system;
