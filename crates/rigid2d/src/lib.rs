//! # rigid2d
//!
//! A 2D rigid-body physics and collision engine.
//!
//! ## Features
//!
//! - **Generational Handles**: bodies and colliders are addressed through
//!   `BodyRef`/`ColliderRef` handles that stop resolving once destroyed
//! - **Quadtree Broad Phase**: flat-arena quadtree rebuilt every frame
//! - **Narrow Phase**: circle, rectangle and convex polygon overlap tests
//! - **Contact Resolution**: restitution and friction impulses with
//!   positional correction
//! - **Contact Events**: trigger and collision enter/stay/exit callbacks
//! - **Custom Allocators**: linear, stack, free-list, heap and proxy allocators
//!
//! ## Quick Start
//!
//! ```rust
//! use rigid2d::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut world = World::with_bounds(Rect::new(vec2(0.0, 0.0), vec2(100.0, 100.0)))?;
//!     let (recorder, events) = ContactRecorder::new();
//!     world.set_contact_listener(Box::new(recorder));
//!
//!     let ball = world.create_body();
//!     world.get_body_mut(ball)?.set_position(vec2(10.0, 50.0)).set_velocity(vec2(20.0, 0.0));
//!     let ball_collider = world.create_collider(ball)?;
//!     world.get_collider_mut(ball_collider)?.set_circle(2.0);
//!
//!     let zone = world.create_body();
//!     world.get_body_mut(zone)?.set_position(vec2(50.0, 50.0));
//!     let zone_collider = world.create_collider(zone)?;
//!     world.get_collider_mut(zone_collider)?.set_rectangle(10.0, 10.0).set_trigger(true);
//!
//!     for _ in 0..120 {
//!         world.update(1.0 / 60.0);
//!     }
//!     assert!(!events.borrow().is_empty());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod error;
pub mod foundation;
pub mod geometry;
pub mod handle;
pub mod physics;
pub mod spatial;
pub mod world;

#[cfg(test)]
mod tests;

pub use error::{GeometryError, PhysicsError, Result};
pub use world::{FrameStats, World};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{Config, ConfigError, QuadTreeConfig, SolverConfig, WorldConfig},
        error::{GeometryError, PhysicsError},
        foundation::{
            math::{vec2, Vec2},
            memory::Allocator,
        },
        geometry::{Circle, Polygon, Rect},
        physics::{
            BodyRef, ColliderRef, ContactEvent, ContactKind, ContactListener, ContactRecorder, ShapeType,
        },
        world::{FrameStats, World},
    };
}
