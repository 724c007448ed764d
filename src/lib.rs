//! Verlet Sandbox - A real-time 2D particle physics engine
//!
//! Core modules:
//! - `sim`: Deterministic simulation (particles, constraints, collisions, fields)
//! - `settings`: Serializable solver configuration and precision presets
//!
//! Windowing, rendering, menus and level layouts are left to the host game;
//! they drive the engine through [`sim::Solver`].

pub mod settings;
pub mod sim;

pub use settings::{PrecisionPreset, SolverSettings};
pub use sim::Solver;

use glam::Vec2;

/// Engine configuration constants
pub mod consts {
    use glam::Vec2;

    /// Default frame rate the solver is stepped at
    pub const DEFAULT_FRAMERATE: u32 = 60;
    /// Default sub-steps per frame
    pub const DEFAULT_SUB_STEPS: u32 = 8;
    /// Downward gravity (screen coordinates, y grows downward)
    pub const DEFAULT_GRAVITY: Vec2 = Vec2::new(0.0, 1000.0);

    /// Maximum particles tracked by one grid cell per rebuild
    pub const CELL_CAPACITY: usize = 10;

    /// Ball counts as arrived when this close to the destination
    pub const DESTINATION_REACH_DISTANCE: f32 = 15.0;
    /// Ball counts as hit when this close to an obstacle particle
    pub const OBSTACLE_HIT_DISTANCE: f32 = 10.0;

    /// Slack used by placement queries
    pub const POSITION_EPSILON: f32 = 0.01;

    /// Ring offset of the "far" spoke in soft circles
    pub const CIRCLE_FAR_NEIGHBOR_OFFSET: usize = 5;
}

/// Unit vector from `b` to `a` and the distance between them.
///
/// Returns `None` for coincident points so callers can skip the degenerate case.
#[inline]
pub fn separation(a: Vec2, b: Vec2) -> Option<(Vec2, f32)> {
    let delta = a - b;
    let distance = delta.length();
    if distance > 0.0 && distance.is_finite() {
        Some((delta / distance, distance))
    } else {
        None
    }
}

/// Componentwise clamp of `pos` into the box `[min, max]`.
///
/// Unlike `Vec2::clamp` this tolerates `min > max` (world smaller than a
/// particle), collapsing to the box center on that axis.
#[inline]
pub fn clamp_to_box(pos: Vec2, min: Vec2, max: Vec2) -> Vec2 {
    let axis = |v: f32, lo: f32, hi: f32| {
        if lo > hi {
            (lo + hi) * 0.5
        } else {
            v.clamp(lo, hi)
        }
    };
    Vec2::new(axis(pos.x, min.x, max.x), axis(pos.y, min.y, max.y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separation_unit_and_distance() {
        let (unit, dist) = separation(Vec2::new(3.0, 4.0), Vec2::ZERO).unwrap();
        assert!((dist - 5.0).abs() < 1e-6);
        assert!((unit.length() - 1.0).abs() < 1e-6);
        assert!((unit.x - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_separation_coincident() {
        assert!(separation(Vec2::new(1.0, 1.0), Vec2::new(1.0, 1.0)).is_none());
    }

    #[test]
    fn test_clamp_to_box_inverted_axis() {
        let p = clamp_to_box(Vec2::new(50.0, 3.0), Vec2::new(5.0, 6.0), Vec2::new(4.0, 10.0));
        assert!((p.x - 4.5).abs() < 1e-6);
        assert!((p.y - 6.0).abs() < 1e-6);
    }
}
