//! Solver orchestrator
//!
//! Owns every arena plus the collision grid and advances them with a fixed
//! sub-step sequence. The host game creates bodies between `update()` calls
//! and reads positions back afterwards; it only ever holds handles, never
//! references, across an update.

use glam::Vec2;

use super::builder::{Body, BuildContext, Composite};
use super::collision::{range_within, solve_collisions_naive, solve_grid_collisions};
use super::constraint::{Constraint, ConstraintHandle, ConstraintStore};
use super::field::{Wind, apply_gravity, apply_push};
use super::grid::CollisionGrid;
use super::obstacle::{Direction, Obstacle, ObstacleHandle};
use super::particle::{Particle, ParticleHandle, ParticleRange, ParticleStore};
use crate::consts::*;
use crate::settings::SolverSettings;
use crate::{clamp_to_box, separation};

/// Optional circular container particles are kept inside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Container {
    pub center: Vec2,
    pub radius: f32,
}

/// The physics engine
#[derive(Debug, Clone)]
pub struct Solver {
    settings: SolverSettings,
    world_size: Vec2,
    particle_radius: f32,
    particles: ParticleStore,
    constraints: ConstraintStore,
    grid: CollisionGrid,
    obstacles: Vec<Obstacle>,
    winds: Vec<Wind>,
    container: Option<Container>,
    /// Bumped on scene clear to retire obstacle handles
    obstacle_generation: u32,
    /// Simulated seconds since creation or the last scene clear
    elapsed_time: f32,
}

impl Solver {
    /// Create a solver with default settings
    pub fn new(world_size: Vec2, particle_radius: f32, cell_size: f32) -> Self {
        Self::with_settings(world_size, particle_radius, cell_size, SolverSettings::default())
    }

    pub fn with_settings(world_size: Vec2, particle_radius: f32, cell_size: f32, settings: SolverSettings) -> Self {
        let particle_radius = if particle_radius > 0.0 { particle_radius } else { 1.0 };
        let grid = CollisionGrid::new(world_size.x, world_size.y, cell_size);
        log::info!(
            "Solver created: world {}x{}, radius {}, grid {}x{} cells",
            world_size.x,
            world_size.y,
            particle_radius,
            grid.rows(),
            grid.cols()
        );
        Self {
            settings,
            world_size,
            particle_radius,
            particles: ParticleStore::new(),
            constraints: ConstraintStore::new(),
            grid,
            obstacles: Vec::new(),
            winds: Vec::new(),
            container: None,
            obstacle_generation: 0,
            elapsed_time: 0.0,
        }
    }

    // === Timing ===

    /// Set the frame rate one `update()` corresponds to
    pub fn set_frame_dt(&mut self, framerate: u32) {
        self.settings.frame_rate = framerate.max(1);
    }

    pub fn set_sub_steps(&mut self, sub_steps: u32) {
        self.settings.sub_steps = sub_steps.max(1);
    }

    pub fn frame_dt(&self) -> f32 {
        self.settings.frame_dt()
    }

    pub fn step_dt(&self) -> f32 {
        self.settings.step_dt()
    }

    pub fn sub_steps(&self) -> u32 {
        self.settings.sub_steps.max(1)
    }

    pub fn elapsed_time(&self) -> f32 {
        self.elapsed_time
    }

    // === Settings ===

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.settings.gravity = gravity;
    }

    pub fn set_wind_enabled(&mut self, enabled: bool) {
        self.settings.wind_enabled = enabled;
    }

    pub fn wind_enabled(&self) -> bool {
        self.settings.wind_enabled
    }

    /// Keep free particles inside a circle (in addition to the world box)
    pub fn set_container(&mut self, center: Vec2, radius: f32) {
        self.container = Some(Container { center, radius });
    }

    pub fn clear_container(&mut self) {
        self.container = None;
    }

    // === Scene ===

    /// Drop every particle, constraint, obstacle and wind zone
    ///
    /// Handles taken before the clear resolve to nothing afterwards.
    pub fn clear_scene(&mut self) {
        log::info!(
            "Clearing scene ({} particles, {} constraints, {} obstacles, {} winds)",
            self.particles.len(),
            self.constraints.len(),
            self.obstacles.len(),
            self.winds.len()
        );
        self.particles.clear();
        self.constraints.clear();
        self.obstacles.clear();
        self.obstacle_generation = self.obstacle_generation.wrapping_add(1);
        if self.obstacle_generation == ObstacleHandle::NULL.generation {
            self.obstacle_generation = 0;
        }
        self.winds.clear();
        self.grid.clear();
        self.elapsed_time = 0.0;
    }

    /// Add a particle with the solver's default radius
    pub fn add_particle(&mut self, position: Vec2, pinned: bool) -> ParticleHandle {
        self.particles.add(position, self.particle_radius, pinned)
    }

    pub fn add_particle_with_radius(&mut self, position: Vec2, radius: f32, pinned: bool) -> ParticleHandle {
        self.particles.add(position, radius, pinned)
    }

    /// Link two particles
    ///
    /// `None` (or a negative) length keeps the current separation; `None`
    /// strength uses the configured default. Returns a null handle if either
    /// particle does not exist.
    pub fn add_constraint(
        &mut self,
        p1: ParticleHandle,
        p2: ParticleHandle,
        length: Option<f32>,
        strength: Option<f32>,
    ) -> ConstraintHandle {
        if !self.particles.is_valid(p1) || !self.particles.is_valid(p2) {
            log::debug!("Ignoring constraint between missing particles");
            return ConstraintHandle::NULL;
        }
        let strength = strength.unwrap_or(self.settings.constraint_strength);
        self.constraints.add(&self.particles, p1, p2, length, strength)
    }

    pub fn add_wind(&mut self, position: Vec2, size: Vec2, speed: f32, strength: f32) {
        self.winds.push(Wind::new(position, size, speed, strength));
    }

    /// Turn the particles of `range` into a kinematic obstacle
    pub fn add_obstacle(
        &mut self,
        direction: Direction,
        move_horizontal: bool,
        range: ParticleRange,
        horizontal_bound: (f32, f32),
        vertical_bound: (f32, f32),
        speed: f32,
    ) -> ObstacleHandle {
        let obstacle = Obstacle::new(
            &self.particles,
            direction,
            move_horizontal,
            range,
            horizontal_bound,
            vertical_bound,
            speed,
        );
        let index = self.obstacles.len() as u32;
        self.obstacles.push(obstacle);
        ObstacleHandle {
            index,
            generation: self.obstacle_generation,
        }
    }

    fn builder(&mut self, color: u32) -> BuildContext<'_> {
        BuildContext {
            particles: &mut self.particles,
            constraints: &mut self.constraints,
            radius: self.particle_radius,
            color,
        }
    }

    /// `cols x rows` lattice centered on `position`
    pub fn add_rectangle(
        &mut self,
        position: Vec2,
        cols: usize,
        rows: usize,
        spacing: f32,
        pinned: bool,
        color: u32,
    ) -> ParticleRange {
        let range = self.builder(color).rectangle(position, cols, rows, spacing, pinned);
        log::debug!("Rectangle {}x{} -> particles {:?}", cols, rows, range);
        range
    }

    pub fn add_triangle(&mut self, position: Vec2, rows: usize, spacing: f32, pinned: bool, color: u32) -> ParticleRange {
        let range = self.builder(color).triangle(position, rows, spacing, pinned);
        log::debug!("Triangle of {} rows -> particles {:?}", rows, range);
        range
    }

    pub fn add_right_triangle(
        &mut self,
        position: Vec2,
        rows: usize,
        spacing: f32,
        pinned: bool,
        color: u32,
    ) -> ParticleRange {
        let range = self.builder(color).right_triangle(position, rows, spacing, pinned);
        log::debug!("Right triangle of {} rows -> particles {:?}", rows, range);
        range
    }

    pub fn add_cube(&mut self, position: Vec2, stiffness: f32, color: u32) -> Body {
        let body = self.builder(color).cube(position, stiffness);
        log::debug!("Cube -> {} particles, {} constraints", body.particles.len(), body.constraints.len());
        body
    }

    pub fn add_circle(&mut self, position: Vec2, segments: usize, stiffness: f32, color: u32) -> Body {
        let body = self.builder(color).circle(position, segments, stiffness);
        log::debug!("Circle -> {} particles, {} constraints", body.particles.len(), body.constraints.len());
        body
    }

    /// Pin both particles and fill the gap with a rope
    pub fn add_chain(&mut self, p1: ParticleHandle, p2: ParticleHandle, color: u32) -> Body {
        let body = self.builder(color).chain(p1, p2);
        log::debug!("Chain -> {} particles, {} constraints", body.particles.len(), body.constraints.len());
        body
    }

    /// Build whatever the caller's current build mode asks for
    pub fn build(&mut self, position: Vec2, composite: Composite, color: u32) -> Body {
        match composite {
            Composite::Particle { pinned } => {
                let handle = self.add_particle(position, pinned);
                if let Some(p) = self.particles.get_mut(handle) {
                    p.color = color;
                }
                Body {
                    particles: ParticleRange::single(handle.index()),
                    constraints: Vec::new(),
                }
            }
            Composite::Cube { stiffness } => self.add_cube(position, stiffness, color),
            Composite::Circle { segments, stiffness } => self.add_circle(position, segments, stiffness, color),
            Composite::Chain { from, to } => self.add_chain(from, to, color),
        }
    }

    // === External manipulation ===

    /// Radial push around `position`; returns how many particles it reached
    pub fn apply_force(&mut self, radius: f32, position: Vec2) -> usize {
        apply_push(&mut self.particles, position, radius, self.settings.push_strength)
    }

    /// Accumulate a force on a single particle
    pub fn apply_force_to(&mut self, handle: ParticleHandle, force: Vec2) {
        self.particles.apply_force(handle, force);
    }

    /// Drift every wind zone one sub-step and blow on the particles inside
    pub fn apply_wind(&mut self) {
        let dt = self.step_dt();
        for wind in &mut self.winds {
            wind.advance(dt, self.world_size.x);
            wind.apply(&mut self.particles);
        }
    }

    /// Give a particle an initial velocity (units per second)
    pub fn init_velocity(&mut self, handle: ParticleHandle, velocity: Vec2) {
        let dt = self.step_dt();
        match self.particles.get_mut(handle) {
            Some(p) => p.init_velocity(velocity, dt),
            None => log::debug!("init_velocity on missing particle {:?}", handle),
        }
    }

    /// Teleport a particle (pinned or not), dropping its velocity
    pub fn set_particle_position(&mut self, handle: ParticleHandle, position: Vec2) {
        match self.particles.get_mut(handle) {
            Some(p) => p.reset_position(position),
            None => log::debug!("set_particle_position on missing particle {:?}", handle),
        }
    }

    pub fn set_pinned(&mut self, handle: ParticleHandle, pinned: bool) {
        match self.particles.get_mut(handle) {
            Some(p) => p.pinned = pinned,
            None => log::debug!("set_pinned on missing particle {:?}", handle),
        }
    }

    // === Queries ===

    pub fn particles(&self) -> &[Particle] {
        self.particles.as_slice()
    }

    pub fn particle(&self, handle: ParticleHandle) -> Option<&Particle> {
        self.particles.get(handle)
    }

    /// Handle of the particle at an arena index
    pub fn particle_handle(&self, index: usize) -> ParticleHandle {
        self.particles.handle_at(index).unwrap_or(ParticleHandle::NULL)
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn constraints(&self) -> &[Constraint] {
        self.constraints.as_slice()
    }

    pub fn constraint(&self, handle: ConstraintHandle) -> Option<&Constraint> {
        self.constraints.get(handle)
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn obstacle(&self, handle: ObstacleHandle) -> Option<&Obstacle> {
        if handle.generation == self.obstacle_generation {
            self.obstacles.get(handle.index())
        } else {
            None
        }
    }

    pub fn winds(&self) -> &[Wind] {
        &self.winds
    }

    pub fn container(&self) -> Option<Container> {
        self.container
    }

    /// World width, height and the wall margin (the default particle radius)
    pub fn world(&self) -> (f32, f32, f32) {
        (self.world_size.x, self.world_size.y, self.particle_radius)
    }

    pub fn particle_radius(&self) -> f32 {
        self.particle_radius
    }

    /// Grid as of the last sub-step, for debug overlays
    pub fn grid(&self) -> &CollisionGrid {
        &self.grid
    }

    /// True if a default-sized particle could be placed at `position`
    ///
    /// Fails when any particle center is closer than `2 * radius - epsilon`.
    pub fn is_valid_position(&self, position: Vec2) -> bool {
        let min_distance = 2.0 * self.particle_radius - POSITION_EPSILON;
        !self
            .particles
            .iter()
            .any(|p| p.current_position.distance(position) < min_distance)
    }

    /// Particle under the cursor (nearest one whose disc contains `position`)
    pub fn clicked_particle(&self, position: Vec2) -> ParticleHandle {
        self.nearest_where(position, |p, d| d <= p.radius)
    }

    /// Nearest particle to `position`, null if the scene is empty
    pub fn nearest_particle(&self, position: Vec2) -> ParticleHandle {
        self.nearest_where(position, |_, _| true)
    }

    fn nearest_where(&self, position: Vec2, accept: impl Fn(&Particle, f32) -> bool) -> ParticleHandle {
        self.particles
            .iter()
            .enumerate()
            .map(|(i, p)| (i, p, p.current_position.distance(position)))
            .filter(|(_, p, d)| accept(*p, *d))
            .min_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
            .and_then(|(i, _, _)| self.particles.handle_at(i))
            .unwrap_or(ParticleHandle::NULL)
    }

    /// True if any particle of the ball is within reach of the destination
    pub fn is_ball_reach_destination(&self, ball: ParticleRange, target: Vec2) -> bool {
        range_within(&self.particles, ball, target, DESTINATION_REACH_DISTANCE)
    }

    /// True if any particle of the ball is close to any obstacle particle
    pub fn is_ball_collide_obstacle(&self, ball: ParticleRange, obstacles: &[ParticleRange]) -> bool {
        obstacles.iter().any(|&obstacle| {
            self.particles
                .range(obstacle)
                .iter()
                .any(|o| range_within(&self.particles, ball, o.current_position, OBSTACLE_HIT_DISTANCE))
        })
    }

    /// Same as [`Self::is_ball_collide_obstacle`] against every registered obstacle
    pub fn is_ball_collide_any_obstacle(&self, ball: ParticleRange) -> bool {
        self.obstacles.iter().any(|obstacle| {
            obstacle
                .members()
                .iter()
                .filter_map(|&h| self.particles.get(h))
                .any(|o| range_within(&self.particles, ball, o.current_position, OBSTACLE_HIT_DISTANCE))
        })
    }

    // === Stepping ===

    /// Rebuild the grid from current positions
    pub fn fill_collision_grid(&mut self) {
        self.grid.rebuild(&self.particles);
        if self.grid.dropped() > 0 {
            log::trace!("{} particles missed the grid this sub-step", self.grid.dropped());
        }
    }

    /// Rebuild the grid and resolve overlaps through it
    pub fn solve_grid_collision(&mut self) -> usize {
        self.fill_collision_grid();
        solve_grid_collisions(&self.grid, &mut self.particles)
    }

    /// Brute-force overlap resolution, same response as the grid pass
    pub fn solve_collisions_naive(&mut self) -> usize {
        solve_collisions_naive(&mut self.particles)
    }

    /// One relaxation pass over all constraints; returns the largest error seen
    pub fn relax_constraints(&mut self) -> f32 {
        self.constraints.relax(&mut self.particles)
    }

    fn advance_obstacles(&mut self, dt: f32) {
        for obstacle in &mut self.obstacles {
            obstacle.advance(&mut self.particles, &self.grid, dt);
        }
    }

    fn integrate_particles(&mut self, dt: f32) {
        let (w, h) = (self.world_size.x, self.world_size.y);
        for particle in self.particles.iter_mut() {
            particle.integrate(dt);
            if particle.pinned {
                continue;
            }
            let r = Vec2::splat(particle.radius);
            particle.current_position = clamp_to_box(particle.current_position, r, Vec2::new(w, h) - r);

            if let Some(container) = self.container {
                let limit = container.radius - particle.radius;
                if let Some((outward, distance)) = separation(particle.current_position, container.center) {
                    if distance > limit {
                        particle.current_position = container.center + outward * limit.max(0.0);
                    }
                }
            }
        }
    }

    fn sub_step(&mut self, dt: f32) {
        apply_gravity(&mut self.particles, self.settings.gravity);
        if self.settings.wind_enabled {
            self.apply_wind();
        }
        self.solve_grid_collision();
        self.advance_obstacles(dt);
        self.integrate_particles(dt);
        self.relax_constraints();
    }

    /// Advance one frame (`sub_steps` fixed sub-steps)
    pub fn update(&mut self) {
        self.elapsed_time += self.frame_dt();
        let dt = self.step_dt();
        for _ in 0..self.sub_steps() {
            self.sub_step(dt);
        }
    }
}
