//! Bodies, colliders and contact handling
//!
//! Bodies are point masses integrated with semi-implicit Euler. Colliders
//! attach a shape to a body; the contact resolver turns overlapping solid
//! pairs into impulses and the listener reports every transition.

pub mod body;
pub mod collider;
pub mod contact;
pub mod listener;

pub use body::{Body, BodyRef, BodyTag};
pub use collider::{Collider, ColliderFlags, ColliderRef, ColliderTag, Shape, ShapeType, WorldShape};
pub use contact::{ColliderPair, Contact, ContactMaterial, ContactResolver};
pub use listener::{ContactEvent, ContactKind, ContactListener, ContactRecorder, EventLog};
