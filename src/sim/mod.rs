//! Deterministic simulation module
//!
//! Everything that moves particles lives here. This module must stay pure
//! and deterministic:
//! - Fixed timestep only
//! - Stable iteration order (by arena index)
//! - No rendering or platform dependencies

pub mod builder;
pub mod collision;
pub mod constraint;
pub mod field;
pub mod grid;
pub mod obstacle;
pub mod particle;
pub mod solver;

pub use builder::{Body, BuildContext, Composite};
pub use collision::{Contact, particle_contact, resolve_pair, solve_collisions_naive, solve_grid_collisions};
pub use constraint::{Constraint, ConstraintHandle, ConstraintStore};
pub use field::{Wind, apply_gravity, apply_push};
pub use grid::{CellCoord, CollisionCell, CollisionGrid};
pub use obstacle::{Direction, Obstacle, ObstacleHandle};
pub use particle::{Particle, ParticleHandle, ParticleRange, ParticleStore};
pub use solver::{Container, Solver};
