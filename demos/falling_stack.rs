//! Falling stack demo
//!
//! Drops a small tower of cubes and a spinning capsule onto the ground and
//! prints where everything ends up. Run with `RUST_LOG=pe_physics=debug` to see
//! the per-step contact counters.

use pe_physics::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("pe-physics - Falling Stack Demo");
    println!("===============================\n");

    let mut world = World::try_new(WorldConfig {
        gravity: Vec3::new(0.0, 0.0, -9.81),
        ..WorldConfig::default()
    })?;

    let ground = world.create_body(BodyDesc::fixed().with_position(Vec3::new(0.0, 0.0, -1.0)));
    world.attach_shape(ground, Shape::cuboid(Vec3::new(10.0, 10.0, 1.0)))?;
    println!("Created ground (top face at z = 0)");

    let mut cubes = Vec::new();
    for i in 0..5 {
        let cube = world.create_body(BodyDesc::dynamic().with_position(Vec3::new(0.0, 0.0, 0.5 + i as f32 * 1.05)));
        world.attach_shape(cube, Shape::cuboid(Vec3::splat(0.5)))?;
        cubes.push(cube);
    }
    println!("Created a stack of {} cubes", cubes.len());

    let capsule = world.create_body(
        BodyDesc::dynamic()
            .with_position(Vec3::new(3.0, 0.0, 4.0))
            .with_angular_velocity(Vec3::new(5.0, 0.0, 0.0))
            .with_inertia_from_shapes(),
    );
    world.attach_shape(capsule, Shape::Capsule(Capsule::with_length(2.0, 0.5)))?;
    println!("Created a spinning capsule\n");

    let dt = 1.0 / 60.0;
    let steps = 600;
    println!("Simulating {} steps at {}Hz...\n", steps, 1.0 / dt);

    for i in 0..steps {
        world.update(dt)?;

        if i % 60 == 0 {
            let (used, unused) = world.contact_stats();
            println!(
                "t={:.1}s: manifolds={} awake={} warm-start used={} unused={}",
                i as f32 * dt,
                world.contact_manifolds().len(),
                world.awake_bodies(),
                used,
                unused
            );
        }
    }

    println!();
    for (i, &cube) in cubes.iter().enumerate() {
        if let Some(body) = world.body(cube) {
            let p = body.position();
            println!(
                "cube {}: ({:.3}, {:.3}, {:.3}) sleeping={}",
                i,
                p.x,
                p.y,
                p.z,
                body.is_sleeping()
            );
        }
    }
    if let Some(body) = world.body(capsule) {
        let p = body.position();
        println!("capsule: ({:.3}, {:.3}, {:.3}) sleeping={}", p.x, p.y, p.z, body.is_sleeping());
    }
    Ok(())
}
