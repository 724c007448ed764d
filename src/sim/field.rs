//! Force fields: gravity, wind zones and the radial push

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::particle::ParticleStore;

/// Add a constant acceleration (times mass) to every particle
pub fn apply_gravity(particles: &mut ParticleStore, gravity: Vec2) {
    for particle in particles.iter_mut() {
        let force = gravity * particle.mass;
        particle.apply_force(force);
    }
}

/// Radial impulse centered at `center`
///
/// Particles closer than `radius` receive `strength * (radius - d) * (p - center)`,
/// so the push grows toward the center and with the offset itself.
/// Returns the number of particles affected.
pub fn apply_push(particles: &mut ParticleStore, center: Vec2, radius: f32, strength: f32) -> usize {
    let mut touched = 0;
    for particle in particles.iter_mut() {
        let direction = particle.current_position - center;
        let distance = direction.length();
        if distance < radius {
            particle.apply_force(strength * (radius - distance) * direction);
            touched += 1;
        }
    }
    touched
}

/// A horizontally drifting rectangle that blows on particles inside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// Top-left corner
    pub position: Vec2,
    pub size: Vec2,
    /// Drift speed of the zone along x (units per second)
    pub speed: f32,
    /// Force magnitude applied to particles inside the zone
    pub strength: f32,
}

impl Wind {
    pub fn new(position: Vec2, size: Vec2, speed: f32, strength: f32) -> Self {
        Self {
            position,
            size: size.abs(),
            speed,
            strength,
        }
    }

    /// Force exerted on particles inside the zone (blows along the drift)
    pub fn force(&self) -> Vec2 {
        let dir = if self.speed < 0.0 { -1.0 } else { 1.0 };
        Vec2::new(self.strength * dir, 0.0)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.position.x
            && point.y >= self.position.y
            && point.x < self.position.x + self.size.x
            && point.y < self.position.y + self.size.y
    }

    /// Drift the zone, wrapping around the world's horizontal extent
    pub fn advance(&mut self, dt: f32, world_width: f32) {
        self.position.x += self.speed * dt;
        if self.position.x > world_width {
            self.position.x = -self.size.x;
        } else if self.position.x + self.size.x < 0.0 {
            self.position.x = world_width;
        }
    }

    /// Blow on every particle inside the zone; returns how many were inside
    pub fn apply(&self, particles: &mut ParticleStore) -> usize {
        let force = self.force();
        let mut touched = 0;
        for particle in particles.iter_mut() {
            if self.contains(particle.current_position) {
                particle.apply_force(force);
                touched += 1;
            }
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gravity_accumulates_until_integration() {
        let mut store = ParticleStore::new();
        let h = store.add(Vec2::ZERO, 1.0, false);
        apply_gravity(&mut store, Vec2::new(0.0, 10.0));
        apply_gravity(&mut store, Vec2::new(0.0, 10.0));
        assert_eq!(store.get(h).unwrap().acceleration, Vec2::new(0.0, 20.0));
    }

    #[test]
    fn test_push_only_inside_radius() {
        let mut store = ParticleStore::new();
        let near = store.add(Vec2::new(3.0, 0.0), 1.0, false);
        let far = store.add(Vec2::new(30.0, 0.0), 1.0, false);
        assert_eq!(apply_push(&mut store, Vec2::ZERO, 10.0, 1.0), 1);
        // (10 - 3) * (3, 0)
        assert_eq!(store.get(near).unwrap().acceleration, Vec2::new(21.0, 0.0));
        assert_eq!(store.get(far).unwrap().acceleration, Vec2::ZERO);
    }

    #[test]
    fn test_wind_wraps_at_world_width() {
        let mut wind = Wind::new(Vec2::new(95.0, 0.0), Vec2::new(20.0, 20.0), 10.0, 5.0);
        wind.advance(1.0, 100.0);
        assert_eq!(wind.position.x, -20.0);

        let mut wind = Wind::new(Vec2::new(-15.0, 0.0), Vec2::new(20.0, 20.0), -10.0, 5.0);
        wind.advance(1.0, 100.0);
        assert_eq!(wind.position.x, 100.0);
    }

    #[test]
    fn test_wind_blows_inside_zone_only() {
        let mut store = ParticleStore::new();
        let inside = store.add(Vec2::new(5.0, 5.0), 1.0, false);
        let outside = store.add(Vec2::new(50.0, 5.0), 1.0, false);
        let wind = Wind::new(Vec2::ZERO, Vec2::new(10.0, 10.0), -2.0, 3.0);
        assert_eq!(wind.apply(&mut store), 1);
        assert_eq!(store.get(inside).unwrap().acceleration, Vec2::new(-3.0, 0.0));
        assert_eq!(store.get(outside).unwrap().acceleration, Vec2::ZERO);
    }
}
