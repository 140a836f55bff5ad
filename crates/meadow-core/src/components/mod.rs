//! Components - pure data attached to agents and habitat entities

mod bee;
mod bird;
mod boid;
mod common;
mod habitat;

pub use bee::*;
pub use bird::*;
pub use boid::*;
pub use common::*;
pub use habitat::*;
