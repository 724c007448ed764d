//! Narrow-phase collision detection and response between particles
//!
//! Response is symmetric and mass-agnostic: each side of an overlapping pair
//! is pushed out by half the overlap along the separating axis. Pinned
//! particles stay put. The grid pass revisits pairs several times per
//! sub-step, which is harmless since a resolved pair has zero overlap.

use glam::Vec2;

use super::grid::{CellCoord, CollisionGrid};
use super::particle::{Particle, ParticleHandle, ParticleRange, ParticleStore};
use crate::separation;

/// Result of a pair overlap check
#[derive(Debug, Clone)]
pub struct Contact {
    /// Unit vector from the second particle toward the first
    pub normal: Vec2,
    /// Overlap depth (sum of radii minus center distance)
    pub penetration: f32,
}

/// Check two particles for overlap
///
/// Coincident centers have no separating axis and report no contact.
pub fn particle_contact(a: &Particle, b: &Particle) -> Option<Contact> {
    let min_distance = a.radius + b.radius;
    let (normal, distance) = separation(a.current_position, b.current_position)?;
    if distance < min_distance {
        Some(Contact {
            normal,
            penetration: min_distance - distance,
        })
    } else {
        None
    }
}

/// Push an overlapping pair apart; returns true if anything overlapped
pub fn resolve_pair(a: &mut Particle, b: &mut Particle) -> bool {
    match particle_contact(a, b) {
        Some(contact) => {
            let push = contact.normal * (0.5 * contact.penetration);
            a.shift(push);
            b.shift(-push);
            true
        }
        None => false,
    }
}

fn resolve_handles(particles: &mut ParticleStore, a: ParticleHandle, b: ParticleHandle) -> bool {
    match particles.get_pair_mut(a, b) {
        Some((pa, pb)) => resolve_pair(pa, pb),
        None => false,
    }
}

/// Resolve every distinct pair drawn from two cells
///
/// When both coordinates name the same cell each unordered pair is visited once.
pub fn solve_cell_pair(
    grid: &CollisionGrid,
    particles: &mut ParticleStore,
    first: CellCoord,
    second: CellCoord,
) -> usize {
    let mut hits = 0;
    let a = grid.cell(first).handles();
    let b = grid.cell(second).handles();
    if first == second {
        for (i, &p1) in a.iter().enumerate() {
            for &p2 in &a[i + 1..] {
                hits += resolve_handles(particles, p1, p2) as usize;
            }
        }
    } else {
        for &p1 in a {
            for &p2 in b {
                if p1 != p2 {
                    hits += resolve_handles(particles, p1, p2) as usize;
                }
            }
        }
    }
    hits
}

/// Grid broad phase plus narrow phase over the whole world
///
/// Every cell is tested against its 3x3 neighborhood; missing neighbors at the
/// border are replaced by the cell itself. Returns the number of resolved
/// contacts (pairs visited more than once count each time).
pub fn solve_grid_collisions(grid: &CollisionGrid, particles: &mut ParticleStore) -> usize {
    let mut hits = 0;
    for coord in grid.coords() {
        if grid.cell(coord).is_empty() {
            continue;
        }
        for neighbor in grid.neighborhood(coord) {
            hits += solve_cell_pair(grid, particles, coord, neighbor);
        }
    }
    hits
}

/// Collide the given members against whatever the grid holds around them
///
/// Used for kinematic groups so a moving obstacle shoves particles aside
/// instead of sweeping through them.
pub fn solve_members_against_grid(
    grid: &CollisionGrid,
    particles: &mut ParticleStore,
    members: &[ParticleHandle],
) -> usize {
    let mut hits = 0;
    for &member in members {
        let Some(position) = particles.get(member).map(|p| p.current_position) else {
            continue;
        };
        let others: Vec<ParticleHandle> = grid.nearby(position).filter(|&h| h != member).collect();
        for other in others {
            hits += resolve_handles(particles, member, other) as usize;
        }
    }
    hits
}

/// Brute-force O(n^2) pass with the same response as the grid pass
pub fn solve_collisions_naive(particles: &mut ParticleStore) -> usize {
    let mut hits = 0;
    let len = particles.len();
    for i in 0..len {
        for j in i + 1..len {
            if let (Some(a), Some(b)) = (particles.handle_at(i), particles.handle_at(j)) {
                hits += resolve_handles(particles, a, b) as usize;
            }
        }
    }
    hits
}

/// True if any particle of `range` lies within `distance` of `target`
pub fn range_within(particles: &ParticleStore, range: ParticleRange, target: Vec2, distance: f32) -> bool {
    particles
        .range(range)
        .iter()
        .any(|p| p.current_position.distance(target) <= distance)
}
