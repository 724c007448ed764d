//! Procedural construction of compound bodies
//!
//! Lattices (rectangles, triangles) only add particles and report the index
//! range they occupy, ready to be grouped into an obstacle. Cubes, circles and
//! chains also wire constraints and report them in a [`Body`].

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::constraint::{ConstraintHandle, ConstraintStore};
use super::particle::{ParticleHandle, ParticleRange, ParticleStore};
use crate::consts::CIRCLE_FAR_NEIGHBOR_OFFSET;

/// What the caller's build mode produces at a point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Composite {
    /// A single particle
    Particle { pinned: bool },
    /// 3x3 braced cluster
    Cube { stiffness: f32 },
    /// Ring of `segments` particles around a center particle
    Circle { segments: usize, stiffness: f32 },
    /// Rope between two existing particles (the build point is ignored)
    Chain { from: ParticleHandle, to: ParticleHandle },
}

/// Particles and constraints created by one builder call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub particles: ParticleRange,
    pub constraints: Vec<ConstraintHandle>,
}

/// Shared parameters for one builder invocation
pub struct BuildContext<'a> {
    pub particles: &'a mut ParticleStore,
    pub constraints: &'a mut ConstraintStore,
    /// Radius of every particle created
    pub radius: f32,
    /// Rendering tag stamped on created particles
    pub color: u32,
}

impl BuildContext<'_> {
    fn add(&mut self, position: Vec2, pinned: bool) -> ParticleHandle {
        let handle = self.particles.add(position, self.radius, pinned);
        if let Some(p) = self.particles.get_mut(handle) {
            p.color = self.color;
        }
        handle
    }

    fn link(&mut self, a: ParticleHandle, b: ParticleHandle, strength: f32) -> ConstraintHandle {
        self.constraints.add(&*self.particles, a, b, None, strength)
    }

    fn range_since(&self, start: usize) -> ParticleRange {
        if self.particles.len() > start {
            ParticleRange::new(start, self.particles.len() - 1)
        } else {
            ParticleRange::EMPTY
        }
    }

    /// `cols x rows` grid of particles, centered on `center`
    pub fn rectangle(&mut self, center: Vec2, cols: usize, rows: usize, spacing: f32, pinned: bool) -> ParticleRange {
        let start = self.particles.len();
        let origin = center - Vec2::new(cols.saturating_sub(1) as f32, rows.saturating_sub(1) as f32) * spacing * 0.5;
        for row in 0..rows {
            for col in 0..cols {
                self.add(origin + Vec2::new(col as f32, row as f32) * spacing, pinned);
            }
        }
        self.range_since(start)
    }

    /// Isosceles triangle, apex up, `rows` rows (row r holds r + 1 particles)
    ///
    /// Rows are offset by half a spacing and packed at `spacing * sqrt(3) / 2`,
    /// giving a hexagonal lattice.
    pub fn triangle(&mut self, center: Vec2, rows: usize, spacing: f32, pinned: bool) -> ParticleRange {
        let start = self.particles.len();
        let row_height = spacing * 3f32.sqrt() * 0.5;
        let top = center.y - rows.saturating_sub(1) as f32 * row_height * 0.5;
        for row in 0..rows {
            let y = top + row as f32 * row_height;
            let left = center.x - row as f32 * spacing * 0.5;
            for i in 0..=row {
                self.add(Vec2::new(left + i as f32 * spacing, y), pinned);
            }
        }
        self.range_since(start)
    }

    /// Right triangle with the right angle at the bottom-left
    ///
    /// Row r (from the top) holds r + 1 particles, left aligned on a square lattice.
    pub fn right_triangle(&mut self, center: Vec2, rows: usize, spacing: f32, pinned: bool) -> ParticleRange {
        let start = self.particles.len();
        let half = rows.saturating_sub(1) as f32 * spacing * 0.5;
        let origin = center - Vec2::new(half, half);
        for row in 0..rows {
            for col in 0..=row {
                self.add(origin + Vec2::new(col as f32, row as f32) * spacing, pinned);
            }
        }
        self.range_since(start)
    }

    /// 3x3 cluster braced along every edge and both diagonals of each cell
    pub fn cube(&mut self, center: Vec2, stiffness: f32) -> Body {
        let spacing = self.radius * 2.0;
        let start = self.particles.len();
        let mut grid = [[ParticleHandle::NULL; 3]; 3];
        for (row, line) in grid.iter_mut().enumerate() {
            for (col, slot) in line.iter_mut().enumerate() {
                let offset = Vec2::new(col as f32 - 1.0, row as f32 - 1.0) * spacing;
                *slot = self.add(center + offset, false);
            }
        }

        let mut constraints = Vec::with_capacity(20);
        for row in 0..3 {
            for col in 0..3 {
                if col + 1 < 3 {
                    constraints.push(self.link(grid[row][col], grid[row][col + 1], stiffness));
                }
                if row + 1 < 3 {
                    constraints.push(self.link(grid[row][col], grid[row + 1][col], stiffness));
                }
                if row + 1 < 3 && col + 1 < 3 {
                    constraints.push(self.link(grid[row][col], grid[row + 1][col + 1], stiffness));
                    constraints.push(self.link(grid[row][col + 1], grid[row + 1][col], stiffness));
                }
            }
        }
        Body {
            particles: self.range_since(start),
            constraints,
        }
    }

    /// Ring of `segments` particles plus a center, adjacent ring particles
    /// touching
    ///
    /// Each ring particle is linked to the center, to its next neighbor and
    /// to the neighbor five places on, which resists both stretching and
    /// shearing. The center is created last.
    pub fn circle(&mut self, center: Vec2, segments: usize, stiffness: f32) -> Body {
        let segments = segments.max(3);
        let ring_radius = self.radius / (PI / segments as f32).sin();
        let start = self.particles.len();

        let ring: Vec<ParticleHandle> = (0..segments)
            .map(|i| {
                let theta = TAU * i as f32 / segments as f32 - FRAC_PI_2;
                self.add(center + Vec2::from_angle(theta) * ring_radius, false)
            })
            .collect();
        let hub = self.add(center, false);

        let mut constraints = Vec::with_capacity(segments * 3);
        for i in 0..segments {
            constraints.push(self.link(ring[i], hub, stiffness));
            constraints.push(self.link(ring[i], ring[(i + 1) % segments], stiffness));
            let far = (i + CIRCLE_FAR_NEIGHBOR_OFFSET) % segments;
            // Rings of offset + 1 or fewer would wrap the far spoke onto itself
            // or an adjacent particle; at exactly twice the offset each spoke
            // would be wired from both ends
            let braces = segments > CIRCLE_FAR_NEIGHBOR_OFFSET + 1;
            let mirrored = segments == 2 * CIRCLE_FAR_NEIGHBOR_OFFSET;
            if braces && (!mirrored || i < far) {
                constraints.push(self.link(ring[i], ring[far], stiffness));
            }
        }
        Body {
            particles: self.range_since(start),
            constraints,
        }
    }

    /// Pin both endpoints and hang a rope of touching particles between them
    ///
    /// Interior particles are spread evenly, about one diameter apart. Stale
    /// endpoints produce an empty body.
    pub fn chain(&mut self, from: ParticleHandle, to: ParticleHandle) -> Body {
        let (Some(a), Some(b)) = (self.particles.get(from), self.particles.get(to)) else {
            log::debug!("Chain requested between missing particles");
            return Body::default();
        };
        let (pa, pb) = (a.current_position, b.current_position);
        for h in [from, to] {
            if let Some(p) = self.particles.get_mut(h) {
                p.pinned = true;
            }
        }

        let spacing = self.radius * 2.0;
        let segments = ((pa.distance(pb) / spacing).round() as usize).max(1);
        let start = self.particles.len();
        let mut constraints = Vec::with_capacity(segments);
        let mut prev = from;
        for i in 1..segments {
            let t = i as f32 / segments as f32;
            let next = self.add(pa.lerp(pb, t), false);
            constraints.push(self.link(prev, next, 1.0));
            prev = next;
        }
        constraints.push(self.link(prev, to, 1.0));

        Body {
            particles: self.range_since(start),
            constraints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stores() -> (ParticleStore, ConstraintStore) {
        (ParticleStore::new(), ConstraintStore::new())
    }

    #[test]
    fn test_rectangle_centered_with_range() {
        let (mut particles, mut constraints) = stores();
        particles.add(Vec2::ZERO, 5.0, false);
        let mut ctx = BuildContext {
            particles: &mut particles,
            constraints: &mut constraints,
            radius: 5.0,
            color: 7,
        };
        let range = ctx.rectangle(Vec2::new(100.0, 100.0), 3, 2, 10.0, true);
        assert_eq!(range, ParticleRange::new(1, 6));
        let placed = particles.range(range);
        let centroid = placed.iter().map(|p| p.current_position).sum::<Vec2>() / placed.len() as f32;
        assert!(centroid.distance(Vec2::new(100.0, 100.0)) < 1e-4);
        assert!(placed.iter().all(|p| p.pinned && p.color == 7));
        assert!(constraints.is_empty());
    }

    #[test]
    fn test_empty_rectangle_has_empty_range() {
        let (mut particles, mut constraints) = stores();
        let mut ctx = BuildContext {
            particles: &mut particles,
            constraints: &mut constraints,
            radius: 5.0,
            color: 0,
        };
        assert!(ctx.rectangle(Vec2::ZERO, 0, 4, 10.0, false).is_empty());
    }

    #[test]
    fn test_triangles_row_counts() {
        let (mut particles, mut constraints) = stores();
        let mut ctx = BuildContext {
            particles: &mut particles,
            constraints: &mut constraints,
            radius: 5.0,
            color: 0,
        };
        assert_eq!(ctx.triangle(Vec2::new(50.0, 50.0), 4, 10.0, true).len(), 10);
        assert_eq!(ctx.right_triangle(Vec2::new(150.0, 50.0), 3, 10.0, true).len(), 6);

        // Neighbors in the hexagonal lattice sit exactly one spacing apart
        let tri = particles.range(ParticleRange::new(0, 2));
        assert!((tri[0].current_position.distance(tri[1].current_position) - 10.0).abs() < 1e-4);
        assert!((tri[1].current_position.distance(tri[2].current_position) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_cube_wiring() {
        let (mut particles, mut constraints) = stores();
        let mut ctx = BuildContext {
            particles: &mut particles,
            constraints: &mut constraints,
            radius: 5.0,
            color: 0,
        };
        let body = ctx.cube(Vec2::new(50.0, 50.0), 1.0);
        assert_eq!(body.particles.len(), 9);
        // 12 edges + 8 cell diagonals
        assert_eq!(body.constraints.len(), 20);
        assert_eq!(constraints.len(), 20);
        let diagonal = constraints.get(body.constraints[2]).unwrap();
        assert!((diagonal.length - 200f32.sqrt()).abs() < 1e-4);
    }

    #[test]
    fn test_circle_topology() {
        let (mut particles, mut constraints) = stores();
        let mut ctx = BuildContext {
            particles: &mut particles,
            constraints: &mut constraints,
            radius: 5.0,
            color: 0,
        };
        let body = ctx.circle(Vec2::new(100.0, 100.0), 16, 0.5);
        assert_eq!(body.particles.len(), 17);
        assert_eq!(body.constraints.len(), 48);
        let ring = particles.range(body.particles);
        // adjacent ring particles touch
        assert!((ring[0].current_position.distance(ring[1].current_position) - 10.0).abs() < 1e-3);
        assert_eq!(ring[16].current_position, Vec2::new(100.0, 100.0));
        assert!(constraints.iter().all(|c| (c.strength - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_small_circle_skips_far_spokes() {
        let (mut particles, mut constraints) = stores();
        let mut ctx = BuildContext {
            particles: &mut particles,
            constraints: &mut constraints,
            radius: 5.0,
            color: 0,
        };
        let body = ctx.circle(Vec2::new(100.0, 100.0), 6, 1.0);
        assert_eq!(body.constraints.len(), 12);
    }

    #[test]
    fn test_mid_sized_circles_get_far_spokes() {
        let (mut particles, mut constraints) = stores();
        let mut ctx = BuildContext {
            particles: &mut particles,
            constraints: &mut constraints,
            radius: 5.0,
            color: 0,
        };
        assert_eq!(ctx.circle(Vec2::new(100.0, 100.0), 7, 1.0).constraints.len(), 21);
        assert_eq!(ctx.circle(Vec2::new(200.0, 100.0), 8, 1.0).constraints.len(), 24);
        assert_eq!(ctx.circle(Vec2::new(300.0, 100.0), 9, 1.0).constraints.len(), 27);
        assert_eq!(ctx.circle(Vec2::new(100.0, 200.0), 12, 1.0).constraints.len(), 36);

        // spokes across a 10-ring are diameters, wired once each
        let body = ctx.circle(Vec2::new(200.0, 200.0), 10, 1.0);
        assert_eq!(body.constraints.len(), 25);
        let ring: Vec<ParticleHandle> = (0..10)
            .map(|i| particles.handle_at(body.particles.start + i).unwrap())
            .collect();
        let mut pairs: Vec<(usize, usize)> = constraints
            .iter()
            .skip(constraints.len() - 25)
            .filter(|c| ring.contains(&c.p1) && ring.contains(&c.p2))
            .map(|c| {
                let (a, b) = (c.p1.index(), c.p2.index());
                (a.min(b), a.max(b))
            })
            .collect();
        let before = pairs.len();
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), before);
    }

    #[test]
    fn test_chain_between_pins() {
        let (mut particles, mut constraints) = stores();
        let a = particles.add(Vec2::new(0.0, 0.0), 5.0, false);
        let b = particles.add(Vec2::new(100.0, 0.0), 5.0, false);
        let mut ctx = BuildContext {
            particles: &mut particles,
            constraints: &mut constraints,
            radius: 5.0,
            color: 0,
        };
        let body = ctx.chain(a, b);
        assert_eq!(body.particles, ParticleRange::new(2, 10));
        assert_eq!(body.constraints.len(), 10);
        assert!(particles.get(a).unwrap().pinned);
        assert!(particles.get(b).unwrap().pinned);
        for c in constraints.iter() {
            assert!((c.length - 10.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_chain_with_stale_endpoint() {
        let (mut particles, mut constraints) = stores();
        let a = particles.add(Vec2::ZERO, 5.0, false);
        let mut ctx = BuildContext {
            particles: &mut particles,
            constraints: &mut constraints,
            radius: 5.0,
            color: 0,
        };
        let body = ctx.chain(a, ParticleHandle::NULL);
        assert!(body.particles.is_empty());
        assert!(body.constraints.is_empty());
        assert!(!particles.get(a).unwrap().pinned);
    }
}
