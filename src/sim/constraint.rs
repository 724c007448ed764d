//! Distance constraints and their relaxation

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::particle::{ParticleHandle, ParticleStore};
use crate::separation;

/// Stable reference to a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstraintHandle {
    index: u32,
    generation: u32,
}

impl ConstraintHandle {
    /// Handle that never resolves to a constraint
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

impl Default for ConstraintHandle {
    fn default() -> Self {
        Self::NULL
    }
}

/// Keeps two particles `length` apart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub p1: ParticleHandle,
    pub p2: ParticleHandle,
    /// Rest distance
    pub length: f32,
    /// Fraction of the error corrected per relaxation, in (0, 1]
    pub strength: f32,
}

impl Constraint {
    /// Relax once; stale handles and coincident endpoints are skipped
    ///
    /// Returns the absolute length error before the correction.
    pub fn relax(&self, particles: &mut ParticleStore) -> Option<f32> {
        let (a, b) = particles.get_pair_mut(self.p1, self.p2)?;
        let (unit, distance) = separation(a.current_position, b.current_position)?;
        let delta = self.strength * 0.5 * (self.length - distance);
        a.shift(unit * delta);
        b.shift(-unit * delta);
        Some((self.length - distance).abs())
    }

    /// Current endpoint positions, if both particles still exist
    pub fn endpoints(&self, particles: &ParticleStore) -> Option<(Vec2, Vec2)> {
        let a = particles.get(self.p1)?;
        let b = particles.get(self.p2)?;
        Some((a.current_position, b.current_position))
    }
}

/// Growable constraint arena
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintStore {
    constraints: Vec<Constraint>,
    generation: u32,
}

impl ConstraintStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link two particles
    ///
    /// A missing or negative `length` means "keep the current separation".
    /// Strength is clamped into (0, 1].
    pub fn add(
        &mut self,
        particles: &ParticleStore,
        p1: ParticleHandle,
        p2: ParticleHandle,
        length: Option<f32>,
        strength: f32,
    ) -> ConstraintHandle {
        let length = match length {
            Some(l) if l >= 0.0 => l,
            _ => match (particles.get(p1), particles.get(p2)) {
                (Some(a), Some(b)) => a.current_position.distance(b.current_position),
                _ => 0.0,
            },
        };
        let strength = if strength > 0.0 { strength.min(1.0) } else { 1.0 };
        let index = self.constraints.len() as u32;
        self.constraints.push(Constraint {
            p1,
            p2,
            length,
            strength,
        });
        ConstraintHandle {
            index,
            generation: self.generation,
        }
    }

    pub fn clear(&mut self) {
        self.constraints.clear();
        self.generation = self.generation.wrapping_add(1);
        if self.generation == ConstraintHandle::NULL.generation {
            self.generation = 0;
        }
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn get(&self, handle: ConstraintHandle) -> Option<&Constraint> {
        if handle.generation == self.generation {
            self.constraints.get(handle.index())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: ConstraintHandle) -> Option<&mut Constraint> {
        if handle.generation == self.generation {
            self.constraints.get_mut(handle.index())
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Constraint> {
        self.constraints.iter()
    }

    /// One relaxation pass over every constraint, in creation order
    ///
    /// Returns the largest length error seen before correction.
    pub fn relax(&self, particles: &mut ParticleStore) -> f32 {
        self.constraints
            .iter()
            .filter_map(|c| c.relax(particles))
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_length_from_separation() {
        let mut particles = ParticleStore::new();
        let a = particles.add(Vec2::new(0.0, 0.0), 1.0, false);
        let b = particles.add(Vec2::new(3.0, 4.0), 1.0, false);
        let mut constraints = ConstraintStore::new();
        let c = constraints.add(&particles, a, b, None, 1.0);
        assert!((constraints.get(c).unwrap().length - 5.0).abs() < 1e-6);

        let c = constraints.add(&particles, a, b, Some(-1.0), 1.0);
        assert!((constraints.get(c).unwrap().length - 5.0).abs() < 1e-6);

        let c = constraints.add(&particles, a, b, Some(2.0), 0.0);
        let constraint = constraints.get(c).unwrap();
        assert_eq!(constraint.length, 2.0);
        assert_eq!(constraint.strength, 1.0);
    }

    #[test]
    fn test_full_strength_relax_hits_length() {
        let mut particles = ParticleStore::new();
        let a = particles.add(Vec2::new(0.0, 0.0), 1.0, false);
        let b = particles.add(Vec2::new(20.0, 0.0), 1.0, false);
        let mut constraints = ConstraintStore::new();
        constraints.add(&particles, a, b, Some(10.0), 1.0);
        let err = constraints.relax(&mut particles);
        assert!((err - 10.0).abs() < 1e-5);
        let pa = particles.get(a).unwrap().current_position;
        let pb = particles.get(b).unwrap().current_position;
        assert!((pa.x - 5.0).abs() < 1e-5);
        assert!((pb.x - 15.0).abs() < 1e-5);
    }

    #[test]
    fn test_pinned_endpoint_only_other_moves() {
        let mut particles = ParticleStore::new();
        let a = particles.add(Vec2::new(0.0, 0.0), 1.0, true);
        let b = particles.add(Vec2::new(20.0, 0.0), 1.0, false);
        let mut constraints = ConstraintStore::new();
        constraints.add(&particles, a, b, Some(10.0), 1.0);
        constraints.relax(&mut particles);
        assert_eq!(particles.get(a).unwrap().current_position, Vec2::ZERO);
        assert!((particles.get(b).unwrap().current_position.x - 15.0).abs() < 1e-5);
    }

    #[test]
    fn test_converges_monotonically() {
        let mut particles = ParticleStore::new();
        let a = particles.add(Vec2::new(0.0, 0.0), 1.0, true);
        let b = particles.add(Vec2::new(40.0, 0.0), 1.0, false);
        let mut constraints = ConstraintStore::new();
        constraints.add(&particles, a, b, Some(10.0), 1.0);
        let mut last = f32::MAX;
        for _ in 0..30 {
            let err = constraints.relax(&mut particles);
            assert!(err <= last);
            last = err;
        }
        let d = particles.get(b).unwrap().current_position.x;
        assert!((d - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_coincident_endpoints_skipped() {
        let mut particles = ParticleStore::new();
        let a = particles.add(Vec2::new(5.0, 5.0), 1.0, false);
        let b = particles.add(Vec2::new(5.0, 5.0), 1.0, false);
        let mut constraints = ConstraintStore::new();
        constraints.add(&particles, a, b, Some(10.0), 1.0);
        assert_eq!(constraints.relax(&mut particles), 0.0);
        assert!(particles.get(a).unwrap().current_position.is_finite());
    }

    #[test]
    fn test_stale_particles_are_noop() {
        let mut particles = ParticleStore::new();
        let a = particles.add(Vec2::new(0.0, 0.0), 1.0, false);
        let b = particles.add(Vec2::new(20.0, 0.0), 1.0, false);
        let mut constraints = ConstraintStore::new();
        constraints.add(&particles, a, b, Some(10.0), 1.0);
        constraints.add(&particles, a, ParticleHandle::NULL, Some(10.0), 1.0);
        particles.clear();
        particles.add(Vec2::new(0.0, 0.0), 1.0, false);
        particles.add(Vec2::new(20.0, 0.0), 1.0, false);
        assert_eq!(constraints.relax(&mut particles), 0.0);
        assert_eq!(particles.as_slice()[1].current_position, Vec2::new(20.0, 0.0));
    }

    #[test]
    fn test_cleared_handle_resolves_to_none() {
        let particles = ParticleStore::new();
        let mut constraints = ConstraintStore::new();
        let c = constraints.add(&particles, ParticleHandle::NULL, ParticleHandle::NULL, Some(1.0), 1.0);
        constraints.clear();
        assert!(constraints.get(c).is_none());
        assert!(constraints.get(ConstraintHandle::NULL).is_none());
    }
}
