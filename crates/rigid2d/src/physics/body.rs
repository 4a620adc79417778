//! Point-mass rigid bodies
//!
//! A body carries position, velocity, accumulated force and mass. A mass of
//! zero or less marks the slot as disabled and free for reuse by the store.

use crate::foundation::math::Vec2;
use crate::handle::{Ref, RefTag, Slot};

/// Tag for body handles
#[derive(Debug)]
pub struct BodyTag;

impl RefTag for BodyTag {
    const KIND: &'static str = "Body";
}

/// Handle to a body in a [`World`](crate::world::World)
pub type BodyRef = Ref<BodyTag>;

/// Mass assigned to a freshly enabled body
pub const DEFAULT_MASS: f32 = 1.0;

/// Mass marking a disabled body
const DISABLED_MASS: f32 = -1.0;

/// Point-mass body integrated with semi-implicit Euler
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    position: Vec2,
    velocity: Vec2,
    force: Vec2,
    mass: f32,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            position: Vec2::zeros(),
            velocity: Vec2::zeros(),
            force: Vec2::zeros(),
            mass: DISABLED_MASS,
        }
    }
}

impl Body {
    /// Bring the body into use: unit mass, kinematic state cleared
    pub(crate) fn enable(&mut self) {
        self.position = Vec2::zeros();
        self.velocity = Vec2::zeros();
        self.force = Vec2::zeros();
        self.mass = DEFAULT_MASS;
    }

    /// Zero every field and mark the body disabled
    ///
    /// Only the body store calls this, when the slot is destroyed.
    pub(crate) fn disable(&mut self) {
        *self = Self::default();
    }

    /// Whether the body takes part in the simulation
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.mass > 0.0
    }

    /// Advance the body by `dt` seconds and clear the accumulated force
    ///
    /// Disabled bodies are left untouched.
    pub fn update(&mut self, dt: f32) {
        if !self.is_enabled() {
            return;
        }
        self.velocity += (self.force / self.mass) * dt;
        self.position += self.velocity * dt;
        self.force = Vec2::zeros();
    }

    /// Accumulate a force applied over the next update
    pub fn apply_force(&mut self, force: Vec2) {
        if self.is_enabled() {
            self.force += force;
        }
    }

    /// Change velocity immediately by `impulse / mass`
    pub fn apply_impulse(&mut self, impulse: Vec2) {
        self.velocity += impulse * self.inverse_mass();
    }

    /// `1 / mass`, or zero for a disabled body
    #[inline]
    pub fn inverse_mass(&self) -> f32 {
        if self.is_enabled() {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    /// Current position
    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Move the body without affecting velocity
    pub fn set_position(&mut self, position: Vec2) -> &mut Self {
        self.position = position;
        self
    }

    /// Current velocity
    #[inline]
    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Overwrite the velocity
    pub fn set_velocity(&mut self, velocity: Vec2) -> &mut Self {
        self.velocity = velocity;
        self
    }

    /// Force accumulated since the last update
    #[inline]
    pub fn force(&self) -> Vec2 {
        self.force
    }

    /// Current mass; zero or negative when disabled
    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Set a positive mass
    ///
    /// Non-positive values are rejected; a body is only disabled by destroying it.
    pub fn set_mass(&mut self, mass: f32) -> &mut Self {
        if mass > 0.0 && mass.is_finite() {
            self.mass = mass;
        } else {
            log::warn!("Body::set_mass ignored non-positive mass {}", mass);
        }
        self
    }
}

impl Slot for Body {
    fn is_free(&self) -> bool {
        !self.is_enabled()
    }

    fn acquire(&mut self) {
        self.enable();
    }

    fn release(&mut self) {
        self.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::vec2;
    use approx::assert_relative_eq;

    fn enabled() -> Body {
        let mut body = Body::default();
        body.enable();
        body
    }

    #[test]
    fn test_default_is_disabled() {
        let body = Body::default();
        assert!(!body.is_enabled());
        assert!(body.is_free());
        assert_eq!(body.mass(), -1.0);
        assert_eq!(body.inverse_mass(), 0.0);
    }

    #[test]
    fn test_force_integration() {
        let mut body = enabled();
        body.apply_force(vec2(10.0, 0.0));
        body.update(1.0);

        assert_relative_eq!(body.velocity(), vec2(10.0, 0.0));
        assert_relative_eq!(body.position(), vec2(10.0, 0.0));
        assert_eq!(body.force(), Vec2::zeros());
    }

    #[test]
    fn test_mass_scales_acceleration() {
        let mut body = enabled();
        body.set_mass(4.0);
        body.apply_force(vec2(0.0, 8.0));
        body.apply_force(vec2(0.0, 8.0));
        body.update(0.5);

        assert_relative_eq!(body.velocity(), vec2(0.0, 2.0));
        assert_relative_eq!(body.position(), vec2(0.0, 1.0));
    }

    #[test]
    fn test_disabled_body_is_inert() {
        let mut body = Body::default();
        body.apply_force(vec2(5.0, 5.0));
        body.apply_impulse(vec2(5.0, 5.0));
        body.update(1.0);
        assert_eq!(body, Body::default());
    }

    #[test]
    fn test_disable_zeroes_state() {
        let mut body = enabled();
        body.set_position(vec2(3.0, 4.0)).set_velocity(vec2(1.0, 1.0));
        body.disable();

        assert_eq!(body.position(), Vec2::zeros());
        assert_eq!(body.velocity(), Vec2::zeros());
        assert_eq!(body.mass(), -1.0);
    }

    #[test]
    fn test_set_mass_rejects_non_positive() {
        let mut body = enabled();
        body.set_mass(0.0).set_mass(-3.0);
        assert_eq!(body.mass(), DEFAULT_MASS);
        assert!(body.is_enabled());
    }

    #[test]
    fn test_apply_impulse() {
        let mut body = enabled();
        body.set_mass(2.0);
        body.apply_impulse(vec2(4.0, -2.0));
        assert_relative_eq!(body.velocity(), vec2(2.0, -1.0));
    }
}
