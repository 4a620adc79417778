//! Planet Gravity Demo
//!
//! Headless run of the planet sample scene. A heavy planet pulls a ring of
//! moons with an inverse-square force applied each frame; moons that touch
//! collide as solids. Pass a `.toml` or `.ron` world configuration as the
//! first argument to override the defaults.

use rigid2d::foundation::logging;
use rigid2d::physics::listener::{count_events, EventLog};
use rigid2d::prelude::*;

const PLANET_MASS: f32 = 5_000.0;
const PLANET_RADIUS: f32 = 40.0;
const GRAVITY: f32 = 230.0;

const NUM_MOONS: usize = 12;
const MOON_RADIUS: f32 = 6.0;
const ORBIT_RADIUS: f32 = 180.0;

const FRAME_TIME: f32 = 1.0 / 60.0;
const NUM_FRAMES: usize = 60 * 30;

struct PlanetScene {
    world: World,
    planet: BodyRef,
    moons: Vec<BodyRef>,
    events: EventLog,
}

impl PlanetScene {
    fn new(config: WorldConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let mut world = World::new(config)?;
        let center = world.config().bounds.center();

        let planet = world.create_body();
        world.get_body_mut(planet)?.set_position(center).set_mass(PLANET_MASS);
        let planet_collider = world.create_collider(planet)?;
        world
            .get_collider_mut(planet_collider)?
            .set_circle(PLANET_RADIUS)
            .set_bounciness(0.3);

        let mut moons = Vec::with_capacity(NUM_MOONS);
        for i in 0..NUM_MOONS {
            let angle = i as f32 / NUM_MOONS as f32 * std::f32::consts::TAU;
            let direction = vec2(angle.cos(), angle.sin());
            // Two orbit shells, inner moons overtake outer ones
            let radius = ORBIT_RADIUS + if i % 2 == 0 { 0.0 } else { 25.0 };
            let speed = (GRAVITY * PLANET_MASS / radius).sqrt();

            let moon = world.create_body();
            world
                .get_body_mut(moon)?
                .set_position(center + direction * radius)
                .set_velocity(vec2(-direction.y, direction.x) * speed);
            let collider = world.create_collider(moon)?;
            world.get_collider_mut(collider)?.set_circle(MOON_RADIUS);
            moons.push(moon);
        }

        let (recorder, events) = ContactRecorder::new();
        world.set_contact_listener(Box::new(recorder));
        log::info!("Planet scene ready: {} moons", moons.len());
        Ok(Self {
            world,
            planet,
            moons,
            events,
        })
    }

    /// Inverse-square attraction towards the planet
    fn apply_gravity(&mut self) -> Result<(), PhysicsError> {
        let center = self.world.get_body(self.planet)?.position();
        for &moon in &self.moons {
            let body = self.world.get_body_mut(moon)?;
            let offset = center - body.position();
            let distance_squared = offset.magnitude_squared().max(PLANET_RADIUS * PLANET_RADIUS);
            let Some(direction) = offset.try_normalize(f32::EPSILON) else {
                continue;
            };
            body.apply_force(direction * (GRAVITY * PLANET_MASS * body.mass() / distance_squared));
        }
        Ok(())
    }

    fn run(&mut self) -> Result<(), PhysicsError> {
        for frame in 0..NUM_FRAMES {
            self.apply_gravity()?;
            self.world.update(FRAME_TIME);

            if frame % 300 == 0 {
                let planet = self.world.get_body(self.planet)?.position();
                let spread: f32 = self
                    .moons
                    .iter()
                    .filter_map(|&moon| self.world.get_body(moon).ok())
                    .map(|body| (body.position() - planet).magnitude())
                    .sum::<f32>()
                    / self.moons.len() as f32;
                log::info!("frame {:>5}: mean orbit radius {:.1}", frame, spread);
            }
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_default("info");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading world configuration from {}", path);
            WorldConfig::load_from_file(&path)?
        }
        None => WorldConfig::default(),
    };

    println!("=== Planet Gravity Demo ===");
    println!("{} moons for {} frames", NUM_MOONS, NUM_FRAMES);
    println!();

    let mut scene = PlanetScene::new(config)?;
    scene.run()?;

    let planet = scene.world.get_body(scene.planet)?;
    println!("Planet drifted to {:?}", planet.position());
    println!("Frame stats: {:?}", scene.world.frame_stats());
    println!("Impacts: {}", count_events(&scene.events, ContactKind::CollisionEnter));
    Ok(())
}
