/*******************************************************************************************
*
*   impulse2d - Hello physics
*
*   Drops a slow ball and a fast, continuously swept ball onto a thin floor and prints their
*   heights once per simulated tenth of a second. Run with RUST_LOG=impulse2d=trace to see the
*   contacts and impacts as they happen.
*
********************************************************************************************/

use impulse2d::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialization
    //--------------------------------------------------------------------------------------
    let mut world = World::new(SimulationConfig::builder().solver_iterations(10).build()?)?;

    // Floor line 4 units below the origin (y grows downward)
    world.add_shape(StaticShape::polyline(
        &[Vec2::new(-20.0, 4.0), Vec2::new(20.0, 4.0)],
        Material::new(0.6, 0.3),
    ));

    let slow = world.add_body(Body::circle(0.5, 1.0)?.with_position(Vec2::new(-2.0, 0.0)));
    world.add_collider(Collider::new(slow, 0.5).with_material(Material::new(0.6, 0.3)))?;

    let fast = world.add_body(Body::circle(0.25, 1.0)?.with_position(Vec2::new(2.0, 0.0)).with_velocity(Vec2::new(0.0, 400.0)));
    world.add_collider(Collider::new(fast, 0.25).with_material(Material::new(0.6, 0.3)).continuous())?;

    world.add_listener(|contact: &CollisionData, remaining: f32| {
        if contact.penetration <= 0.0 {
            println!("  impact with {:.4}s left in the tick", remaining);
        }
    });
    //--------------------------------------------------------------------------------------

    // Main loop
    for frame in 0..30 {
        world.advance(0.1)?;

        let slow_y = world.body(slow).map_or(f32::NAN, |body| body.position().y);
        let fast_y = world.body(fast).map_or(f32::NAN, |body| body.position().y);
        println!("t={:>4.1}s  slow y={slow_y:>7.3}  fast y={fast_y:>7.3}", (frame + 1) as f32*0.1);
    }

    Ok(())
}
