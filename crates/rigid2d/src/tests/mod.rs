//! End-to-end scenarios driving a [`World`](crate::world::World)


use crate::foundation::math::{vec2, Vec2};
use crate::geometry::Rect;
use crate::physics::{BodyRef, ColliderRef};
use crate::world::World;

pub(crate) fn arena_world() -> World {
    World::with_bounds(Rect::new(vec2(0.0, 0.0), vec2(100.0, 100.0))).unwrap()
}

pub(crate) fn spawn_circle(world: &mut World, position: Vec2, radius: f32) -> (BodyRef, ColliderRef) {
    let body = world.create_body();
    world.get_body_mut(body).unwrap().set_position(position);
    let collider = world.create_collider(body).unwrap();
    world.get_collider_mut(collider).unwrap().set_circle(radius);
    (body, collider)
}

pub(crate) fn spawn_box(world: &mut World, position: Vec2, width: f32, height: f32) -> (BodyRef, ColliderRef) {
    let body = world.create_body();
    world.get_body_mut(body).unwrap().set_position(position);
    let collider = world.create_collider(body).unwrap();
    world.get_collider_mut(collider).unwrap().set_rectangle(width, height);
    (body, collider)
}
