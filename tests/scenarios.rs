//! End-to-end scenarios driven through the public `World` API.
//!
//! The ground used throughout is a static cube of half extent 1 centred at
//! z = -1, so its top face is the plane z = 0.

use approx::assert_abs_diff_eq;
use pe_physics::prelude::*;

const DT: f32 = 1.0 / 60.0;

// ============================================================================
// Helpers
// ============================================================================

fn z_up() -> WorldConfig {
    WorldConfig {
        gravity: Vec3::new(0.0, 0.0, -9.81),
        ..WorldConfig::default()
    }
}

fn zero_gravity() -> WorldConfig {
    WorldConfig {
        gravity: Vec3::ZERO,
        ..WorldConfig::default()
    }
}

fn with_material(mut shape: Shape, e: f32, mu: f32) -> Shape {
    shape.set_material(Material::new(e, mu));
    shape
}

fn add_ground(world: &mut World, material: Material) -> BodyHandle {
    let ground = world.create_body(BodyDesc::fixed().with_position(Vec3::new(0.0, 0.0, -1.0)));
    let mut shape = Shape::cuboid(Vec3::ONE);
    shape.set_material(material);
    world.attach_shape(ground, shape).unwrap();
    ground
}

fn run(world: &mut World, steps: usize) {
    for _ in 0..steps {
        world.update(DT).unwrap();
    }
}

fn position(world: &World, handle: BodyHandle) -> Vec3 {
    world.body(handle).unwrap().position()
}

// ============================================================================
// Scenario 1: overlapping spheres separate
// ============================================================================

#[test]
fn test_overlapping_spheres_separate() {
    let mut world = World::new(zero_gravity());
    let a = world.create_body(BodyDesc::dynamic());
    let b = world.create_body(BodyDesc::dynamic().with_position(Vec3::new(1.9, 0.0, 0.0)));
    for handle in [a, b] {
        world.attach_shape(handle, with_material(Shape::sphere(Vec3::ZERO, 1.0), 0.0, 0.0)).unwrap();
    }

    let depth = |world: &World| 2.0 - (position(world, b) - position(world, a)).length();

    world.update(DT).unwrap();
    assert_eq!(world.contact_manifolds().len(), 1);
    assert!(world.contact_manifolds()[0].max_depth() > 0.09);
    assert!(depth(&world) < 0.1, "depth after one step: {}", depth(&world));

    run(&mut world, 9);
    assert!(depth(&world) <= 0.01, "depth after ten steps: {}", depth(&world));

    // Equal masses push apart symmetrically.
    assert_abs_diff_eq!(position(&world, a).x + position(&world, b).x, 1.9, epsilon = 1e-3);
}

// ============================================================================
// Scenario 2: a sphere falls asleep on the ground
// ============================================================================

#[test]
fn test_sphere_falls_asleep_on_ground() {
    let mut world = World::new(z_up());
    add_ground(&mut world, Material::default());
    let ball = world.create_body(BodyDesc::dynamic().with_position(Vec3::new(0.0, 0.0, 5.0)));
    world.attach_shape(ball, Shape::sphere(Vec3::ZERO, 1.0)).unwrap();

    run(&mut world, 240);

    let body = world.body(ball).unwrap();
    assert!(body.is_sleeping(), "sphere is still awake: v = {:?}", body.velocity());
    let z = body.position().z;
    assert!((0.95..=1.05).contains(&z), "resting height {z}");
}

// ============================================================================
// Scenario 3: a five cube stack settles and sleeps
// ============================================================================

#[test]
fn test_cube_stack_settles() {
    let mut world = World::new(z_up());
    add_ground(&mut world, Material::new(0.0, 1.0));

    let cubes: Vec<_> = (0..5)
        .map(|i| {
            let cube = world.create_body(BodyDesc::dynamic().with_position(Vec3::new(0.0, 0.0, 0.5 + i as f32)));
            world
                .attach_shape(cube, with_material(Shape::cuboid(Vec3::splat(0.5)), 0.0, 1.0))
                .unwrap();
            cube
        })
        .collect();

    run(&mut world, 300);

    let slop = world.config().solver.slop;
    for (i, &cube) in cubes.iter().enumerate() {
        let body = world.body(cube).unwrap();
        assert!(body.is_sleeping(), "cube {i} is awake");

        // Every resting contact keeps one slop of overlap, so cube i sits
        // below its nominal height by the i + 1 contacts beneath it.
        let expected = 0.5 + i as f32 - slop * (i + 1) as f32;
        let z = body.position().z;
        assert!((z - expected).abs() <= 0.02, "cube {i} at z = {z}, expected {expected}");
        assert!(body.position().x.abs() < 0.02 && body.position().y.abs() < 0.02);
    }
    assert_eq!(world.awake_bodies(), 0);
}

// ============================================================================
// Scenario 4: elastic head-on impact against a static cube
// ============================================================================

#[test]
fn test_elastic_impact_reverses_velocity() {
    let config = WorldConfig {
        damping: 1.0,
        ..zero_gravity()
    };
    let mut world = World::new(config);

    let wall = world.create_body(BodyDesc::fixed());
    world.attach_shape(wall, with_material(Shape::cuboid(Vec3::splat(0.5)), 1.0, 0.0)).unwrap();

    let cube = world.create_body(
        BodyDesc::dynamic()
            .with_position(Vec3::new(-1.3, 0.0, 0.0))
            .with_velocity(Vec3::new(5.0, 0.0, 0.0)),
    );
    world.attach_shape(cube, with_material(Shape::cuboid(Vec3::splat(0.5)), 1.0, 0.0)).unwrap();

    let mut steps = 0;
    while world.contact_manifolds().is_empty() {
        world.update(DT).unwrap();
        steps += 1;
        assert!(steps < 30, "cube never reached the wall");
    }

    let vx = world.body(cube).unwrap().velocity().x;
    assert!(vx <= -4.9, "rebound velocity {vx}");
    assert_eq!(position(&world, wall), Vec3::ZERO);
}

#[test]
fn test_slow_elastic_impact_reverses_velocity() {
    let config = WorldConfig {
        damping: 1.0,
        ..zero_gravity()
    };
    let mut world = World::new(config);

    let wall = world.create_body(BodyDesc::fixed());
    world.attach_shape(wall, with_material(Shape::cuboid(Vec3::splat(0.5)), 1.0, 0.0)).unwrap();

    let cube = world.create_body(
        BodyDesc::dynamic()
            .with_position(Vec3::new(-1.03, 0.0, 0.0))
            .with_velocity(Vec3::new(0.5, 0.0, 0.0)),
    );
    world.attach_shape(cube, with_material(Shape::cuboid(Vec3::splat(0.5)), 1.0, 0.0)).unwrap();

    let mut steps = 0;
    while world.contact_manifolds().is_empty() {
        world.update(DT).unwrap();
        steps += 1;
        assert!(steps < 30, "cube never reached the wall");
    }

    // Contacts shallower than the slop give back a little of the rebound.
    let vx = world.body(cube).unwrap().velocity().x;
    assert!(vx <= -0.4, "rebound velocity {vx}");
}

// ============================================================================
// Scenario 5: a spinning capsule lands and lies flat
// ============================================================================

#[test]
fn test_spinning_capsule_lies_flat() {
    let mut world = World::new(z_up());
    add_ground(&mut world, Material::default());

    let capsule = world.create_body(
        BodyDesc::dynamic()
            .with_position(Vec3::new(0.0, 0.0, 5.0))
            .with_angular_velocity(Vec3::new(5.0, 0.0, 0.0))
            .with_inertia_from_shapes(),
    );
    world.attach_shape(capsule, Shape::Capsule(Capsule::with_length(2.0, 0.5))).unwrap();

    run(&mut world, 600);

    let body = world.body(capsule).unwrap();
    let Shape::Capsule(shape) = &body.shapes()[0] else {
        panic!("capsule shape expected");
    };
    assert!(shape.dir().dot(Vec3::Z).abs() < 0.05, "axis {:?}", shape.dir());
    assert!(body.velocity().in_bound(world.config().sleep_velocity));
    assert!(body.angular_velocity().in_bound(world.config().sleep_angular_velocity));
    assert_abs_diff_eq!(body.position().z, 0.5, epsilon = 0.05);
}

// ============================================================================
// Scenario 6: registering and removing bodies
// ============================================================================

#[test]
fn test_remove_every_other_body() {
    let mut world = World::new(z_up());
    for i in 0..100 {
        let handle = world.create_body(BodyDesc::dynamic().with_position(Vec3::new(i as f32 * 3.0, 0.0, 0.0)));
        world.attach_shape(handle, Shape::sphere(Vec3::ZERO, 1.0)).unwrap();
    }

    // Each removal shifts the rest down, so the next odd original sits one
    // slot further along.
    for k in 0..50u32 {
        let removed = world.remove_body(BodyHandle::new(k + 1)).unwrap();
        assert_eq!(removed.shapes().len(), 1);
        assert!(!removed.handle().is_valid());
    }

    assert_eq!(world.num_bodies(), 50);
    for (i, body) in world.bodies().iter().enumerate() {
        assert_eq!(body.index(), i);
        assert_eq!(body.handle(), BodyHandle::new(i as u32));
        assert_eq!(body.position().x, (2 * i) as f32 * 3.0);
        assert_eq!(body.shapes().len(), 1);
    }

    assert!(world.remove_body(BodyHandle::new(50)).is_err());
    run(&mut world, 3);
}
