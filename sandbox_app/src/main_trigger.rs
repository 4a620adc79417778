//! Trigger Zone Demo
//!
//! Headless run of the trigger sample scene:
//! - Balls bounce around a walled arena at random speeds
//! - A rectangular and a triangular trigger zone report balls entering and leaving
//! - Balls collide with each other as solids
//! - A summary of contact events and quadtree shape is printed at the end

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rand::Rng;
use rigid2d::foundation::logging;
use rigid2d::prelude::*;

// Arena settings
const ARENA_WIDTH: f32 = 800.0;
const ARENA_HEIGHT: f32 = 600.0;

// Ball settings
const NUM_BALLS: usize = 40;
const BALL_RADIUS: f32 = 6.0;
const MAX_BALL_SPEED: f32 = 120.0;

// Simulation settings
const FRAME_TIME: f32 = 1.0 / 60.0;
const NUM_FRAMES: usize = 60 * 20;

/// Occupancy bookkeeping shared between the listener and the scene
#[derive(Debug, Default)]
struct ZoneStats {
    occupants: HashMap<ColliderRef, usize>,
    entered: usize,
    exited: usize,
    collisions: usize,
}

struct ZoneListener {
    zones: Vec<ColliderRef>,
    stats: Rc<RefCell<ZoneStats>>,
}

impl ZoneListener {
    /// Zone of the pair, if any, and the other collider
    fn split(&self, a: ColliderRef, b: ColliderRef) -> Option<(ColliderRef, ColliderRef)> {
        if self.zones.contains(&a) {
            Some((a, b))
        } else if self.zones.contains(&b) {
            Some((b, a))
        } else {
            None
        }
    }
}

impl ContactListener for ZoneListener {
    fn on_trigger_enter(&mut self, a: ColliderRef, b: ColliderRef) {
        if let Some((zone, ball)) = self.split(a, b) {
            let mut stats = self.stats.borrow_mut();
            *stats.occupants.entry(zone).or_default() += 1;
            stats.entered += 1;
            log::debug!("{:?} entered {:?}", ball, zone);
        }
    }

    fn on_trigger_exit(&mut self, a: ColliderRef, b: ColliderRef) {
        if let Some((zone, ball)) = self.split(a, b) {
            let mut stats = self.stats.borrow_mut();
            if let Some(count) = stats.occupants.get_mut(&zone) {
                *count = count.saturating_sub(1);
            }
            stats.exited += 1;
            log::debug!("{:?} left {:?}", ball, zone);
        }
    }

    fn on_collision_enter(&mut self, _a: ColliderRef, _b: ColliderRef) {
        self.stats.borrow_mut().collisions += 1;
    }
}

struct TriggerScene {
    world: World,
    balls: Vec<BodyRef>,
    stats: Rc<RefCell<ZoneStats>>,
}

impl TriggerScene {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let mut world = World::with_bounds(Rect::new(vec2(0.0, 0.0), vec2(ARENA_WIDTH, ARENA_HEIGHT)))?;

        let square_body = world.create_body();
        world.get_body_mut(square_body)?.set_position(vec2(250.0, 300.0));
        let square = world.create_collider(square_body)?;
        world.get_collider_mut(square)?.set_rectangle(160.0, 160.0).set_trigger(true);

        let triangle_body = world.create_body();
        world.get_body_mut(triangle_body)?.set_position(vec2(560.0, 300.0));
        let triangle = world.create_collider(triangle_body)?;
        world
            .get_collider_mut(triangle)?
            .set_polygon(vec![vec2(-90.0, 80.0), vec2(90.0, 80.0), vec2(0.0, -90.0)])?
            .set_trigger(true);

        let mut rng = rand::thread_rng();
        let mut balls = Vec::with_capacity(NUM_BALLS);
        for _ in 0..NUM_BALLS {
            let body = world.create_body();
            world
                .get_body_mut(body)?
                .set_position(vec2(
                    rng.gen_range(BALL_RADIUS..ARENA_WIDTH - BALL_RADIUS),
                    rng.gen_range(BALL_RADIUS..ARENA_HEIGHT - BALL_RADIUS),
                ))
                .set_velocity(vec2(
                    rng.gen_range(-MAX_BALL_SPEED..MAX_BALL_SPEED),
                    rng.gen_range(-MAX_BALL_SPEED..MAX_BALL_SPEED),
                ));
            let collider = world.create_collider(body)?;
            world
                .get_collider_mut(collider)?
                .set_circle(BALL_RADIUS)
                .set_bounciness(0.9)
                .set_friction(0.1);
            balls.push(body);
        }

        let stats = Rc::new(RefCell::new(ZoneStats::default()));
        world.set_contact_listener(Box::new(ZoneListener {
            zones: vec![square, triangle],
            stats: Rc::clone(&stats),
        }));

        log::info!("Trigger scene ready: {} balls, 2 zones", balls.len());
        Ok(Self { world, balls, stats })
    }

    /// Reflect balls off the arena walls
    fn bounce_off_walls(&mut self) -> Result<(), PhysicsError> {
        for &ball in &self.balls {
            let body = self.world.get_body_mut(ball)?;
            let (mut position, mut velocity) = (body.position(), body.velocity());

            if position.x < BALL_RADIUS || position.x > ARENA_WIDTH - BALL_RADIUS {
                velocity.x = -velocity.x;
                position.x = position.x.clamp(BALL_RADIUS, ARENA_WIDTH - BALL_RADIUS);
            }
            if position.y < BALL_RADIUS || position.y > ARENA_HEIGHT - BALL_RADIUS {
                velocity.y = -velocity.y;
                position.y = position.y.clamp(BALL_RADIUS, ARENA_HEIGHT - BALL_RADIUS);
            }
            body.set_position(position).set_velocity(velocity);
        }
        Ok(())
    }

    fn run(&mut self) -> Result<(), PhysicsError> {
        for frame in 0..NUM_FRAMES {
            self.world.update(FRAME_TIME);
            self.bounce_off_walls()?;

            if frame % 120 == 0 {
                let stats = self.world.frame_stats();
                log::info!(
                    "frame {:>5}: {} candidates, {} overlaps, {} quadtree nodes",
                    frame,
                    stats.candidate_pairs,
                    stats.overlapping_pairs,
                    self.world.quad_tree().node_count()
                );
            }
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_default("info");

    println!("=== Trigger Zone Demo ===");
    println!("{} balls for {} frames", NUM_BALLS, NUM_FRAMES);
    println!();

    let mut scene = TriggerScene::new()?;
    scene.run()?;

    let stats = scene.stats.borrow();
    println!("Zone entries:     {}", stats.entered);
    println!("Zone exits:       {}", stats.exited);
    println!("Ball collisions:  {}", stats.collisions);
    for (zone, count) in &stats.occupants {
        println!("Still inside {:?}: {}", zone, count);
    }
    println!("Quadtree nodes:   {}", scene.world.get_quad_tree_boundaries().len());
    println!("Deepest node:     {}", scene.world.quad_tree().depth_of_deepest_node());
    Ok(())
}
