//! Contact event sink
//!
//! The world reports trigger and collision transitions to a single
//! [`ContactListener`]. Every callback has a no-op default so implementors
//! only override what they care about.

use std::cell::RefCell;
use std::rc::Rc;

use crate::physics::collider::ColliderRef;

/// Receives contact transitions from [`World::update`](crate::world::World::update)
pub trait ContactListener {
    /// Two colliders, at least one a trigger, started overlapping
    fn on_trigger_enter(&mut self, _a: ColliderRef, _b: ColliderRef) {}

    /// A trigger overlap continued into this frame
    fn on_trigger_stay(&mut self, _a: ColliderRef, _b: ColliderRef) {}

    /// A trigger overlap ended
    fn on_trigger_exit(&mut self, _a: ColliderRef, _b: ColliderRef) {}

    /// Two solid colliders started overlapping and were resolved
    fn on_collision_enter(&mut self, _a: ColliderRef, _b: ColliderRef) {}

    /// A solid overlap continued into this frame and was resolved
    fn on_collision_stay(&mut self, _a: ColliderRef, _b: ColliderRef) {}

    /// A solid overlap ended
    fn on_collision_exit(&mut self, _a: ColliderRef, _b: ColliderRef) {}
}

/// Which callback an event corresponds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactKind {
    /// `on_trigger_enter`
    TriggerEnter,
    /// `on_trigger_stay`
    TriggerStay,
    /// `on_trigger_exit`
    TriggerExit,
    /// `on_collision_enter`
    CollisionEnter,
    /// `on_collision_stay`
    CollisionStay,
    /// `on_collision_exit`
    CollisionExit,
}

/// Recorded contact callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    /// Callback kind
    pub kind: ContactKind,
    /// First collider as passed to the callback
    pub a: ColliderRef,
    /// Second collider as passed to the callback
    pub b: ColliderRef,
}

/// Shared log of recorded events
pub type EventLog = Rc<RefCell<Vec<ContactEvent>>>;

/// Listener that appends every callback to a shared [`EventLog`]
#[derive(Debug, Default, Clone)]
pub struct ContactRecorder {
    events: EventLog,
}

impl ContactRecorder {
    /// Create a recorder and the log it writes to
    pub fn new() -> (Self, EventLog) {
        let recorder = Self::default();
        let events = Rc::clone(&recorder.events);
        (recorder, events)
    }

    fn record(&mut self, kind: ContactKind, a: ColliderRef, b: ColliderRef) {
        self.events.borrow_mut().push(ContactEvent { kind, a, b });
    }
}

impl ContactListener for ContactRecorder {
    fn on_trigger_enter(&mut self, a: ColliderRef, b: ColliderRef) {
        self.record(ContactKind::TriggerEnter, a, b);
    }

    fn on_trigger_stay(&mut self, a: ColliderRef, b: ColliderRef) {
        self.record(ContactKind::TriggerStay, a, b);
    }

    fn on_trigger_exit(&mut self, a: ColliderRef, b: ColliderRef) {
        self.record(ContactKind::TriggerExit, a, b);
    }

    fn on_collision_enter(&mut self, a: ColliderRef, b: ColliderRef) {
        self.record(ContactKind::CollisionEnter, a, b);
    }

    fn on_collision_stay(&mut self, a: ColliderRef, b: ColliderRef) {
        self.record(ContactKind::CollisionStay, a, b);
    }

    fn on_collision_exit(&mut self, a: ColliderRef, b: ColliderRef) {
        self.record(ContactKind::CollisionExit, a, b);
    }
}

/// Count the events of one kind in a log
pub fn count_events(log: &EventLog, kind: ContactKind) -> usize {
    log.borrow().iter().filter(|event| event.kind == kind).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnterOnly(usize);

    impl ContactListener for EnterOnly {
        fn on_trigger_enter(&mut self, _a: ColliderRef, _b: ColliderRef) {
            self.0 += 1;
        }
    }

    #[test]
    fn test_default_callbacks_are_no_ops() {
        let mut listener = EnterOnly(0);
        let a = ColliderRef::new(0, 0);
        let b = ColliderRef::new(1, 0);

        listener.on_trigger_stay(a, b);
        listener.on_collision_exit(a, b);
        listener.on_trigger_enter(a, b);
        assert_eq!(listener.0, 1);
    }

    #[test]
    fn test_recorder_shares_its_log() {
        let (mut recorder, log) = ContactRecorder::new();
        let a = ColliderRef::new(0, 0);
        let b = ColliderRef::new(1, 0);

        recorder.on_collision_enter(a, b);
        recorder.on_collision_stay(a, b);
        recorder.on_collision_stay(a, b);

        assert_eq!(log.borrow().len(), 3);
        assert_eq!(log.borrow()[0], ContactEvent { kind: ContactKind::CollisionEnter, a, b });
        assert_eq!(count_events(&log, ContactKind::CollisionStay), 2);
    }
}
