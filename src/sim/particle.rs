//! Particle arena with stable handles
//!
//! Particles are only ever appended; the arena is emptied as a whole by
//! [`ParticleStore::clear`]. Handles carry the arena generation so a handle
//! taken before a clear dereferences to `None` afterwards instead of aliasing
//! whatever particle later occupies the same slot.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Stable reference to a particle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticleHandle {
    index: u32,
    generation: u32,
}

impl ParticleHandle {
    /// Handle that never resolves to a particle
    pub const NULL: Self = Self {
        index: u32::MAX,
        generation: u32::MAX,
    };

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Slot index in the arena
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl Default for ParticleHandle {
    fn default() -> Self {
        Self::NULL
    }
}

/// Inclusive index range `[start, end]` of particles created together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticleRange {
    pub start: usize,
    pub end: usize,
}

impl ParticleRange {
    /// Range containing nothing
    pub const EMPTY: Self = Self { start: 1, end: 0 };

    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Range covering a single particle
    pub fn single(index: usize) -> Self {
        Self { start: index, end: index }
    }

    pub fn len(&self) -> usize {
        if self.end < self.start { 0 } else { self.end - self.start + 1 }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index <= self.end
    }

    pub fn indices(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

impl Default for ParticleRange {
    fn default() -> Self {
        ParticleRange::EMPTY
    }
}

/// A point mass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Particle {
    /// Arena-local id (the slot index)
    pub id: u32,
    pub current_position: Vec2,
    pub prev_position: Vec2,
    /// Accumulated acceleration, consumed by the next integration
    pub acceleration: Vec2,
    pub mass: f32,
    pub radius: f32,
    /// Excluded from integration, collision response and constraint relaxation
    pub pinned: bool,
    /// Rendering tag (color), ignored by the physics
    pub color: u32,
}

impl Particle {
    pub fn new(id: u32, position: Vec2, radius: f32, pinned: bool) -> Self {
        Self {
            id,
            current_position: position,
            prev_position: position,
            acceleration: Vec2::ZERO,
            mass: 1.0,
            radius,
            pinned,
            color: 0,
        }
    }

    /// Displacement since the previous step (implied velocity * dt)
    pub fn displacement(&self) -> Vec2 {
        self.current_position - self.prev_position
    }

    /// Shift the particle unless pinned
    pub fn shift(&mut self, delta: Vec2) {
        if !self.pinned {
            self.current_position += delta;
        }
    }

    /// Rigidly move both positions, pinned or not (kinematic motion)
    pub fn translate(&mut self, delta: Vec2) {
        self.current_position += delta;
        self.prev_position += delta;
    }

    /// Teleport, dropping any implied velocity
    pub fn reset_position(&mut self, position: Vec2) {
        self.current_position = position;
        self.prev_position = position;
    }

    /// Set the implied velocity for a step of length `dt`
    pub fn init_velocity(&mut self, velocity: Vec2, dt: f32) {
        self.prev_position = self.current_position - velocity * dt;
    }

    /// F = m * a
    pub fn apply_force(&mut self, force: Vec2) {
        self.acceleration += force / self.mass;
    }

    /// Verlet step: x' = x + (x - x_prev) + a * dt^2
    pub fn integrate(&mut self, dt: f32) {
        if self.pinned {
            self.acceleration = Vec2::ZERO;
            return;
        }
        let displacement = self.displacement();
        let new_position = self.current_position + displacement + self.acceleration * dt * dt;
        self.prev_position = self.current_position;
        self.current_position = new_position;
        self.acceleration = Vec2::ZERO;
    }
}

/// Growable particle arena
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticleStore {
    particles: Vec<Particle>,
    generation: u32,
}

impl ParticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a particle and return its handle
    pub fn add(&mut self, position: Vec2, radius: f32, pinned: bool) -> ParticleHandle {
        let index = self.particles.len() as u32;
        self.particles.push(Particle::new(index, position, radius.max(f32::MIN_POSITIVE), pinned));
        ParticleHandle {
            index,
            generation: self.generation,
        }
    }

    /// Drop every particle; outstanding handles become stale
    pub fn clear(&mut self) {
        self.particles.clear();
        self.generation = self.generation.wrapping_add(1);
        if self.generation == ParticleHandle::NULL.generation {
            self.generation = 0;
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn is_valid(&self, handle: ParticleHandle) -> bool {
        handle.generation == self.generation && handle.index() < self.particles.len()
    }

    /// Handle for the particle at `index`, if it exists
    pub fn handle_at(&self, index: usize) -> Option<ParticleHandle> {
        (index < self.particles.len()).then_some(ParticleHandle {
            index: index as u32,
            generation: self.generation,
        })
    }

    pub fn get(&self, handle: ParticleHandle) -> Option<&Particle> {
        if self.is_valid(handle) { self.particles.get(handle.index()) } else { None }
    }

    pub fn get_mut(&mut self, handle: ParticleHandle) -> Option<&mut Particle> {
        if self.is_valid(handle) { self.particles.get_mut(handle.index()) } else { None }
    }

    /// Mutable access to two distinct particles at once
    pub fn get_pair_mut(
        &mut self,
        a: ParticleHandle,
        b: ParticleHandle,
    ) -> Option<(&mut Particle, &mut Particle)> {
        if !self.is_valid(a) || !self.is_valid(b) || a.index == b.index {
            return None;
        }
        let (i, j) = (a.index(), b.index());
        if i < j {
            let (left, right) = self.particles.split_at_mut(j);
            Some((&mut left[i], &mut right[0]))
        } else {
            let (left, right) = self.particles.split_at_mut(i);
            Some((&mut right[0], &mut left[j]))
        }
    }

    /// Shift a particle unless pinned; stale handles are ignored
    pub fn shift(&mut self, handle: ParticleHandle, delta: Vec2) {
        if let Some(p) = self.get_mut(handle) {
            p.shift(delta);
        }
    }

    pub fn apply_force(&mut self, handle: ParticleHandle, force: Vec2) {
        if let Some(p) = self.get_mut(handle) {
            p.apply_force(force);
        }
    }

    /// Particles of an index range, clipped to the arena
    pub fn range(&self, range: ParticleRange) -> &[Particle] {
        let len = self.particles.len();
        if range.is_empty() || range.start >= len {
            return &[];
        }
        &self.particles[range.start..=range.end.min(len - 1)]
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Particle> {
        self.particles.iter_mut()
    }
}
