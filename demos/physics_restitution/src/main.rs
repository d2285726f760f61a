/*******************************************************************************************
*
*   impulse2d - Physics restitution
*
*   Three balls with different bounce coefficients fall onto the same floor.
*
********************************************************************************************/

use raylib::prelude::*;
use impulse2d::prelude::{Body, Collider, Material, SimulationConfig, StaticShape, World};
use tracing_subscriber::EnvFilter;

const PIXELS_PER_UNIT: f32 = 40.0;

fn main() -> impulse2d::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialization
    //--------------------------------------------------------------------------------------
    let screen_width = 800;
    let screen_height = 450;

    let (mut rl, thread) = raylib::init()
        .size(screen_width, screen_height)
        .title("[impulse2d] - Restitution demo")
        .build();

    let width = screen_width as f32/PIXELS_PER_UNIT;
    let height = screen_height as f32/PIXELS_PER_UNIT;

    let mut world = World::new(SimulationConfig::default())?;

    // Floor and side walls
    let floor = world.add_shape(StaticShape::polyline(
        &[
            impulse2d::Vec2::new(0.0, 0.0),
            impulse2d::Vec2::new(0.0, height - 1.0),
            impulse2d::Vec2::new(width, height - 1.0),
            impulse2d::Vec2::new(width, 0.0),
        ],
        Material::new(0.9, 0.4),
    ));

    let mut balls = Vec::new();
    for (fraction, restitution, label) in [(0.25, 0.0, "0%"), (0.5, 0.5, "50%"), (0.75, 0.9, "90%")] {
        let handle = world.add_body(Body::circle(0.75, 1.0)?.with_position(impulse2d::Vec2::new(width*fraction, height/2.0)));
        world.add_collider(Collider::new(handle, 0.75).with_material(Material::new(restitution, 0.4)))?;
        balls.push((handle, label));
    }

    rl.set_target_fps(60);
    //--------------------------------------------------------------------------------------

    // Main game loop
    while !rl.window_should_close() {
        // Update
        //----------------------------------------------------------------------------------
        world.advance(rl.get_frame_time())?;
        //----------------------------------------------------------------------------------

        // Draw
        //----------------------------------------------------------------------------------
        let mut d = rl.begin_drawing(&thread);

        d.clear_background(Color::BLACK);
        d.draw_fps(screen_width - 90, screen_height - 30);

        for segment in world.shapes()[floor].segments() {
            let start: Vector2 = (segment.start*PIXELS_PER_UNIT).into();
            let end: Vector2 = (segment.end*PIXELS_PER_UNIT).into();
            d.draw_line_v(start, end, Color::GREEN);
        }

        for (handle, label) in &balls {
            if let Some(body) = world.body(*handle) {
                let center: Vector2 = (body.position()*PIXELS_PER_UNIT).into();
                d.draw_circle_lines(center.x as i32, center.y as i32, 0.75*PIXELS_PER_UNIT, Color::GREEN);
                d.draw_text(label, center.x as i32 - d.measure_text(label, 20)/2, center.y as i32 - 7, 20, Color::WHITE);
            }
        }

        d.draw_text("Restitution amount", (screen_width - d.measure_text("Restitution amount", 30))/2, 75, 30, Color::WHITE);
        //----------------------------------------------------------------------------------
    }

    Ok(())
}
