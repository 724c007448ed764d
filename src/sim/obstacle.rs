//! Kinematic obstacles that ping-pong between travel bounds
//!
//! An obstacle is a rigid group of particles moved by shared translation.
//! Membership is stored as handles resolved when the obstacle is created, so
//! later insertions into the arena cannot change which particles it drives.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::solve_members_against_grid;
use super::grid::CollisionGrid;
use super::particle::{ParticleHandle, ParticleRange, ParticleStore};

/// Handle to an obstacle owned by the solver
///
/// Tagged with the scene generation it was created in, so handles taken
/// before a scene clear never resolve to a later obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObstacleHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ObstacleHandle {
    /// Handle that never resolves to an obstacle
    pub const NULL: Self = Self {
        index: u32::MAX,
        generation: u32::MAX,
    };

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl Default for ObstacleHandle {
    fn default() -> Self {
        Self::NULL
    }
}

/// Travel direction along the movement axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Toward the upper bound (+1)
    Forward,
    /// Toward the lower bound (-1)
    Backward,
}

impl Direction {
    /// Anything non-negative counts as forward
    pub fn from_sign(sign: i32) -> Self {
        if sign < 0 { Direction::Backward } else { Direction::Forward }
    }

    pub fn sign(&self) -> f32 {
        match self {
            Direction::Forward => 1.0,
            Direction::Backward => -1.0,
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// A moving rigid group of particles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    range: ParticleRange,
    members: Vec<ParticleHandle>,
    pub direction: Direction,
    /// Move along x, otherwise along y
    pub move_horizontal: bool,
    /// (min, max) x travel limits
    pub horizontal_bound: (f32, f32),
    /// (min, max) y travel limits
    pub vertical_bound: (f32, f32),
    /// Units per second
    pub moving_speed: f32,
}

impl Obstacle {
    /// Resolve `range` into member handles; indices past the arena are ignored
    pub fn new(
        particles: &ParticleStore,
        direction: Direction,
        move_horizontal: bool,
        range: ParticleRange,
        horizontal_bound: (f32, f32),
        vertical_bound: (f32, f32),
        moving_speed: f32,
    ) -> Self {
        let members: Vec<ParticleHandle> = if range.is_empty() {
            Vec::new()
        } else {
            range.indices().filter_map(|i| particles.handle_at(i)).collect()
        };
        if members.len() != range.len() {
            log::debug!(
                "Obstacle range {}..={} only partially exists ({} of {} particles)",
                range.start,
                range.end,
                members.len(),
                range.len()
            );
        }
        Self {
            range,
            members,
            direction,
            move_horizontal,
            horizontal_bound,
            vertical_bound,
            moving_speed,
        }
    }

    /// Index range the obstacle was created from
    pub fn range(&self) -> ParticleRange {
        self.range
    }

    pub fn members(&self) -> &[ParticleHandle] {
        &self.members
    }

    fn bound(&self) -> (f32, f32) {
        if self.move_horizontal { self.horizontal_bound } else { self.vertical_bound }
    }

    fn axis(&self, position: Vec2) -> f32 {
        if self.move_horizontal { position.x } else { position.y }
    }

    /// Min and max member coordinate along the movement axis
    pub fn extent(&self, particles: &ParticleStore) -> Option<(f32, f32)> {
        self.members
            .iter()
            .filter_map(|&h| particles.get(h))
            .map(|p| self.axis(p.current_position))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Reverse when the leading edge has reached its bound; returns true on a flip
    pub fn update_direction(&mut self, particles: &ParticleStore) -> bool {
        let Some((lo, hi)) = self.extent(particles) else {
            return false;
        };
        let (min_bound, max_bound) = self.bound();
        let flip = match self.direction {
            Direction::Forward => hi >= max_bound,
            Direction::Backward => lo <= min_bound,
        };
        if flip {
            self.direction = self.direction.flipped();
            log::debug!(
                "Obstacle {}..={} reversed to {:?} at [{:.1}, {:.1}]",
                self.range.start,
                self.range.end,
                self.direction,
                lo,
                hi
            );
        }
        flip
    }

    /// Per-step displacement shared by every member
    pub fn step_delta(&self, dt: f32) -> Vec2 {
        let amount = self.direction.sign() * self.moving_speed * dt;
        if self.move_horizontal {
            Vec2::new(amount, 0.0)
        } else {
            Vec2::new(0.0, amount)
        }
    }

    /// One kinematic step
    ///
    /// Collides members against the grid first so pushed particles cannot
    /// slip through, then reflects at the bounds, then translates the group.
    pub fn advance(&mut self, particles: &mut ParticleStore, grid: &CollisionGrid, dt: f32) {
        solve_members_against_grid(grid, particles, &self.members);
        self.update_direction(particles);
        let delta = self.step_delta(dt);
        for &member in &self.members {
            if let Some(p) = particles.get_mut(member) {
                p.translate(delta);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(particles: &mut ParticleStore, x: f32, y: f32, count: usize) -> ParticleRange {
        let start = particles.len();
        for i in 0..count {
            particles.add(Vec2::new(x + 10.0 * i as f32, y), 5.0, true);
        }
        ParticleRange::new(start, particles.len() - 1)
    }

    #[test]
    fn test_flips_after_reaching_upper_bound() {
        let mut particles = ParticleStore::new();
        let range = bar(&mut particles, 90.0, 50.0, 1);
        let grid = CollisionGrid::new(200.0, 200.0, 10.0);
        let mut obstacle = Obstacle::new(
            &particles,
            Direction::Forward,
            true,
            range,
            (0.0, 100.0),
            (0.0, 0.0),
            50.0,
        );

        let mut steps = 0;
        while obstacle.extent(&particles).unwrap().1 < 100.0 {
            obstacle.advance(&mut particles, &grid, 0.1);
            assert_eq!(obstacle.direction, Direction::Forward);
            steps += 1;
            assert!(steps < 10);
        }
        let before = particles.as_slice()[0].current_position.x;
        obstacle.advance(&mut particles, &grid, 0.1);
        assert_eq!(obstacle.direction, Direction::Backward);
        assert!(particles.as_slice()[0].current_position.x < before);
    }

    #[test]
    fn test_flips_on_leading_edge_not_centroid() {
        let mut particles = ParticleStore::new();
        // Spans x = 40..=80; lower bound 45 is already passed by the left edge
        let range = bar(&mut particles, 40.0, 50.0, 5);
        let mut obstacle = Obstacle::new(
            &particles,
            Direction::Backward,
            true,
            range,
            (45.0, 500.0),
            (0.0, 0.0),
            10.0,
        );
        assert!(obstacle.update_direction(&particles));
        assert_eq!(obstacle.direction, Direction::Forward);
    }

    #[test]
    fn test_vertical_motion_moves_every_member() {
        let mut particles = ParticleStore::new();
        let range = bar(&mut particles, 20.0, 50.0, 3);
        let grid = CollisionGrid::new(200.0, 200.0, 10.0);
        let mut obstacle = Obstacle::new(
            &particles,
            Direction::from_sign(1),
            false,
            range,
            (0.0, 0.0),
            (0.0, 150.0),
            20.0,
        );
        obstacle.advance(&mut particles, &grid, 0.5);
        for p in particles.iter() {
            assert!((p.current_position.y - 60.0).abs() < 1e-5);
            // kinematic: no implied velocity
            assert_eq!(p.current_position, p.prev_position);
        }
    }

    #[test]
    fn test_members_survive_later_insertions() {
        let mut particles = ParticleStore::new();
        let range = bar(&mut particles, 20.0, 20.0, 2);
        let obstacle = Obstacle::new(
            &particles,
            Direction::Forward,
            true,
            range,
            (0.0, 100.0),
            (0.0, 0.0),
            1.0,
        );
        particles.add(Vec2::new(150.0, 150.0), 5.0, false);
        assert_eq!(obstacle.members().len(), 2);
        assert_eq!(obstacle.extent(&particles), Some((20.0, 30.0)));
    }

    #[test]
    fn test_out_of_range_indices_ignored() {
        let particles = ParticleStore::new();
        let obstacle = Obstacle::new(
            &particles,
            Direction::Forward,
            true,
            ParticleRange::new(3, 7),
            (0.0, 100.0),
            (0.0, 0.0),
            1.0,
        );
        assert!(obstacle.members().is_empty());
        assert_eq!(obstacle.extent(&particles), None);
    }
}
