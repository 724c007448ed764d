//! Verlet Sandbox headless demo
//!
//! Builds a small scene (rope, soft bodies, a moving bar and a wind gust),
//! runs it for a few seconds and logs what happened. Set `RUST_LOG=debug`
//! to see per-body construction and obstacle reversals.

fn main() {
    use glam::Vec2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;
    use verlet_sandbox::SolverSettings;
    use verlet_sandbox::sim::{Composite, Direction, Solver};

    env_logger::init();
    log::info!("Verlet Sandbox (headless) starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(json) => SolverSettings::load_or_default(&json),
            Err(e) => {
                log::warn!("Could not read settings file {}: {}", path, e);
                SolverSettings::default()
            }
        },
        None => SolverSettings::default(),
    };

    let world = Vec2::new(800.0, 600.0);
    let radius = 5.0;
    let mut solver = Solver::with_settings(world, radius, 2.0 * radius, settings);

    // Rope across the top with a soft ball dropped onto it
    let left = solver.add_particle(Vec2::new(200.0, 150.0), true);
    let right = solver.add_particle(Vec2::new(600.0, 150.0), true);
    solver.add_chain(left, right, 0x88_88_88);
    let ball = solver.add_circle(Vec2::new(400.0, 60.0), 16, 1.0, 0xff_80_20).particles;

    solver.build(Vec2::new(150.0, 400.0), Composite::Cube { stiffness: 1.0 }, 0x20_80_ff);
    solver.add_triangle(Vec2::new(650.0, 500.0), 5, 2.0 * radius, false, 0x40_c0_40);

    // Bar sweeping the lower half
    let bar = solver.add_rectangle(Vec2::new(100.0, 520.0), 1, 6, 2.0 * radius, true, 0xc0_c0_c0);
    solver.add_obstacle(Direction::Forward, true, bar, (20.0, 780.0), (0.0, world.y), 150.0);

    solver.add_wind(Vec2::new(0.0, 250.0), Vec2::new(200.0, 150.0), 120.0, 800.0);
    solver.set_wind_enabled(true);

    // Seeded confetti so runs are reproducible
    let mut rng = Pcg32::seed_from_u64(0x5eed);
    let mut spawned = 0;
    for _ in 0..200 {
        let position = Vec2::new(rng.random_range(20.0..780.0), rng.random_range(200.0..450.0));
        if solver.is_valid_position(position) {
            let size = rng.random_range(3.0..radius);
            let handle = solver.add_particle_with_radius(position, size, false);
            solver.init_velocity(handle, Vec2::new(rng.random_range(-200.0..200.0), 0.0));
            spawned += 1;
        }
    }
    log::info!("Spawned {} loose particles", spawned);

    let frames = 5 * solver.settings().frame_rate;
    for frame in 0..frames {
        if frame == 60 {
            solver.apply_force(80.0, Vec2::new(400.0, 400.0));
        }
        solver.update();
        if solver.is_ball_collide_any_obstacle(ball) {
            log::debug!("Ball touched the bar at t={:.2}s", solver.elapsed_time());
        }
    }

    let hub = solver.particles()[ball.end].current_position;
    log::info!(
        "Simulated {:.2}s: {} particles, {} constraints, ball hub at ({:.1}, {:.1}), dropped from grid: {}",
        solver.elapsed_time(),
        solver.particle_count(),
        solver.constraint_count(),
        hub.x,
        hub.y,
        solver.grid().dropped()
    );
    println!(
        "{} particles, {} constraints after {:.2}s",
        solver.particle_count(),
        solver.constraint_count(),
        solver.elapsed_time()
    );
}
