use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_abs_diff_eq;
use impulse2d::prelude::*;

fn world_without_gravity() -> World {
    World::new(SimulationConfig::builder().gravity(Vec2::ZERO).build().unwrap()).unwrap()
}

fn room() -> StaticShape {
    StaticShape::closed_loop(
        &[Vec2::new(-5.0, -5.0), Vec2::new(5.0, -5.0), Vec2::new(5.0, 5.0), Vec2::new(-5.0, 5.0)],
        Material::new(1.0, 0.0),
    )
}

#[test]
fn fast_ball_stays_inside_a_room() {
    // Fine enough sampling that one sample never carries the ball past a corner
    let config = SimulationConfig::builder()
        .gravity(Vec2::ZERO)
        .root_finder(RootFinderConfig { samples: 64, ..RootFinderConfig::default() })
        .build()
        .unwrap();
    let mut world = World::new(config).unwrap();
    world.add_shape(room());
    let ball = world.add_body(Body::circle(0.2, 1.0).unwrap().with_velocity(Vec2::new(600.0, 250.0)));
    world.add_collider(Collider::new(ball, 0.2).with_material(Material::new(1.0, 0.0)).continuous()).unwrap();

    for _ in 0..120 {
        world.tick(1.0/60.0).unwrap();
        let position = world.body(ball).unwrap().position();
        assert!(position.x.abs() < 5.0 && position.y.abs() < 5.0, "escaped to {position:?}");
    }
}

#[test]
fn falling_ball_comes_to_rest_on_the_floor() {
    let mut world = World::new(SimulationConfig::default()).unwrap();
    world.add_shape(StaticShape::polyline(&[Vec2::new(-10.0, 0.0), Vec2::new(10.0, 0.0)], Material::new(0.0, 0.5)));
    let ball = world.add_body(Body::circle(0.5, 1.0).unwrap().with_position(Vec2::new(0.0, -3.0)));
    world.add_circle(ball, 0.5, false).unwrap();

    assert_eq!(world.advance(3.01).unwrap(), 180);

    let body = world.body(ball).unwrap();
    assert_abs_diff_eq!(body.position().y, -0.5, epsilon = 0.06);
    assert!(body.velocity().y.abs() < 0.2);
    assert_eq!(world.steps(), 180);
}

#[test]
fn listeners_see_every_contact_once_per_tick() {
    let mut world = world_without_gravity();
    world.add_shape(StaticShape::polyline(
        &[Vec2::new(-10.0, 0.0), Vec2::new(0.0, 0.0), Vec2::new(0.0, -10.0)],
        Material::default(),
    ));
    let ball = world.add_body(Body::circle(1.0, 1.0).unwrap().with_position(Vec2::new(-0.5, -0.5)));
    world.add_circle(ball, 1.0, false).unwrap();

    let count = Rc::new(RefCell::new(0usize));
    let seen = count.clone();
    world.add_listener(move |contact: &CollisionData, remaining: f32| {
        assert_eq!(remaining, 0.02);
        assert!(contact.penetration >= 0.0);
        *seen.borrow_mut() += 1;
    });

    world.tick(0.02).unwrap();

    // Corner: one contact per penetrated segment
    assert_eq!(world.contacts().len(), 2);
    assert_eq!(*count.borrow(), 2);
}

#[test]
fn spring_pulls_bodies_together() {
    let mut world = world_without_gravity();
    let a = world.add_body(Body::new(1.0, 1.0).unwrap());
    let b = world.add_body(Body::new(1.0, 1.0).unwrap().with_position(Vec2::new(4.0, 0.0)));
    world.add_constrainer(Box::new(Spring {
        body_a: a,
        local_a: Vec2::ZERO,
        body_b: Some(b),
        local_b: Vec2::ZERO,
        rest_length: 1.0,
        stiffness: 10.0,
        damping: 0.0,
    }));

    world.tick(0.1).unwrap();

    // Impulse 10 * 3 * 0.1 = 3 on each body, toward the other
    assert_abs_diff_eq!(world.body(a).unwrap().velocity().x, 3.0, epsilon = 1e-5);
    assert_abs_diff_eq!(world.body(b).unwrap().velocity().x, -3.0, epsilon = 1e-5);
    assert_abs_diff_eq!(world.bodies().total_momentum().x, 0.0, epsilon = 1e-5);
}

#[test]
fn pin_holds_a_swinging_body() {
    let mut world = World::new(SimulationConfig::builder().gravity(Vec2::new(0.0, 10.0)).build().unwrap()).unwrap();
    let bob = world.add_body(Body::new(1.0, 1.0).unwrap().with_position(Vec2::new(0.0, 2.0)));
    world.add_constrainer(Box::new(Pin {
        body: bob,
        local_point: Vec2::ZERO,
        anchor: Vec2::new(0.0, 2.0),
        correction: 0.2,
        max_force: 1e4,
    }));

    for _ in 0..60 {
        world.tick(1.0/60.0).unwrap();
    }

    let position = world.body(bob).unwrap().position();
    assert_abs_diff_eq!(position.x, 0.0, epsilon = 1e-3);
    assert_abs_diff_eq!(position.y, 2.0, epsilon = 1e-2);
}

#[test]
fn seeker_arrives_at_its_target() {
    let mut world = world_without_gravity();
    let drone = world.add_body(Body::new(1.0, 1.0).unwrap());
    world.add_constrainer(Box::new(Seeker { body: drone, target: Vec2::new(3.0, 4.0), speed: 5.0, max_force: 1000.0 }));

    for _ in 0..120 {
        world.tick(1.0/60.0).unwrap();
    }

    let position = world.body(drone).unwrap().position();
    assert_abs_diff_eq!(position.x, 3.0, epsilon = 1e-2);
    assert_abs_diff_eq!(position.y, 4.0, epsilon = 1e-2);
}

#[test]
fn invalid_input_is_reported() {
    let mut world = world_without_gravity();
    assert_eq!(world.tick(-1.0), Err(Error::NegativeTimeDelta(-1.0)));
    assert!(matches!(Body::new(0.0, 1.0), Err(Error::NonPositiveMass(_))));
    assert!(matches!(Body::new(1.0, -2.0), Err(Error::NonPositiveInertia(_))));
    assert!(matches!(
        SimulationConfig::builder().time_step(0.0).build(),
        Err(Error::InvalidConfig(_))
    ));
}
