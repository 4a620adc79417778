//! Simulation world
//!
//! Owns the body and collider stores, the quadtree and the contact state.
//! Scene code holds only [`BodyRef`]/[`ColliderRef`] handles and calls
//! [`World::update`] once per frame.
//!
//! A frame runs these phases in order:
//!
//! 1. integrate every enabled body,
//! 2. rebuild the quadtree from the bounds of every usable collider,
//! 3. query it per collider and run the narrow phase once per candidate pair,
//! 4. classify overlapping pairs against the previous frame, resolving solid
//!    pairs and reporting every transition to the [`ContactListener`].
//!
//! The buffers of phases 3 and 4 are carved out of the world's allocators:
//! per-query scratch from the linear frame arena, pair lists and events from
//! a free-list arena that gets every block back by the end of the update.

use std::collections::HashMap;

use crate::config::ConfigError;
use crate::core::config::WorldConfig;
use crate::error::Result;
use crate::foundation::memory::{FreeListAllocator, LinearAllocator, ProxyAllocator, ScratchScope, ScratchVec};
use crate::geometry::Rect;
use crate::handle::Pool;
use crate::physics::body::{Body, BodyRef, BodyTag};
use crate::physics::collider::{Collider, ColliderRef, ColliderTag, WorldShape};
use crate::physics::contact::{ColliderPair, ContactMaterial, ContactResolver};
use crate::physics::listener::{ContactEvent, ContactKind, ContactListener};
use crate::spatial::quadtree::{QuadTree, SimplifiedCollider};

/// Per-frame scratch allocator shared by the broad phase and scene code
pub type FrameArena = ProxyAllocator<LinearAllocator>;

/// Free-list allocator holding the pair buffers built during an update
pub type PairArena = ProxyAllocator<FreeListAllocator>;

/// Counters describing the last [`World::update`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Enabled bodies integrated
    pub bodies_integrated: usize,
    /// Colliders inserted into the quadtree
    pub colliders_indexed: usize,
    /// Unique candidate pairs returned by the broad phase
    pub candidate_pairs: usize,
    /// Pairs that passed the narrow phase
    pub overlapping_pairs: usize,
    /// Solid pairs whose contact was resolved
    pub contacts_resolved: usize,
    /// Listener callbacks issued
    pub events_dispatched: usize,
    /// Bytes the update requested from the frame and pair arenas
    pub scratch_bytes: usize,
    /// Bookkeeping buffers that outgrew their arena and moved to the heap
    pub scratch_spills: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PairMode {
    Trigger,
    Solid,
}

impl PairMode {
    fn enter(self) -> ContactKind {
        match self {
            Self::Trigger => ContactKind::TriggerEnter,
            Self::Solid => ContactKind::CollisionEnter,
        }
    }

    fn stay(self) -> ContactKind {
        match self {
            Self::Trigger => ContactKind::TriggerStay,
            Self::Solid => ContactKind::CollisionStay,
        }
    }

    fn exit(self) -> ContactKind {
        match self {
            Self::Trigger => ContactKind::TriggerExit,
            Self::Solid => ContactKind::CollisionExit,
        }
    }
}

/// Collider snapshot taken while building the quadtree
struct Indexed {
    body: BodyRef,
    shape: WorldShape,
    is_trigger: bool,
}

/// 2D rigid-body world
pub struct World {
    config: WorldConfig,
    bodies: Pool<Body, BodyTag>,
    colliders: Pool<Collider, ColliderTag>,
    quad_tree: QuadTree,
    resolver: ContactResolver,
    listener: Option<Box<dyn ContactListener>>,
    active_pairs: HashMap<ColliderPair, PairMode>,
    frame_arena: FrameArena,
    pair_arena: PairArena,
    stats: FrameStats,
}

impl World {
    /// Create a world from a validated configuration
    pub fn new(config: WorldConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        log::info!(
            "Creating world: bounds {:?}, quadtree depth {} capacity {}",
            config.bounds,
            config.quadtree.max_depth,
            config.quadtree.max_capacity
        );

        Ok(Self {
            bodies: Pool::with_growth(config.pool_growth),
            colliders: Pool::with_growth(config.pool_growth),
            quad_tree: QuadTree::new(config.bounds, config.quadtree),
            resolver: ContactResolver::new(config.solver),
            listener: None,
            active_pairs: HashMap::new(),
            frame_arena: ProxyAllocator::new("frame", LinearAllocator::new(config.frame_arena_size)),
            pair_arena: ProxyAllocator::new("pairs", FreeListAllocator::new(config.pair_arena_size)),
            stats: FrameStats::default(),
            config,
        })
    }

    /// Create a world with default tunables covering `bounds`
    pub fn with_bounds(bounds: Rect) -> std::result::Result<Self, ConfigError> {
        Self::new(WorldConfig::with_bounds(bounds))
    }

    /// Configuration the world was built with
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    // ---- bodies ----

    /// Create an enabled body at the origin with unit mass
    pub fn create_body(&mut self) -> BodyRef {
        self.bodies.create()
    }

    /// Destroy a body
    ///
    /// Colliders attached to it are not destroyed; the pipeline skips them
    /// until they are.
    pub fn destroy_body(&mut self, body: BodyRef) -> Result<()> {
        self.bodies.destroy(body)
    }

    /// Access a body
    pub fn get_body(&self, body: BodyRef) -> Result<&Body> {
        self.bodies.get(body)
    }

    /// Access a body mutably
    pub fn get_body_mut(&mut self, body: BodyRef) -> Result<&mut Body> {
        self.bodies.get_mut(body)
    }

    /// Live bodies with their handles
    pub fn bodies(&self) -> impl Iterator<Item = (BodyRef, &Body)> + '_ {
        self.bodies.iter()
    }

    /// Number of live bodies
    pub fn body_count(&self) -> usize {
        self.bodies.live_count()
    }

    // ---- colliders ----

    /// Create an enabled collider without a shape, owned by `body`
    pub fn create_collider(&mut self, body: BodyRef) -> Result<ColliderRef> {
        self.bodies.get(body)?;
        let collider = self.colliders.create();
        self.colliders.get_mut(collider)?.attach(body);
        Ok(collider)
    }

    /// Destroy a collider, forgetting its contacts without callbacks
    pub fn destroy_collider(&mut self, collider: ColliderRef) -> Result<()> {
        self.colliders.destroy(collider)?;
        self.active_pairs.retain(|pair, _| !pair.contains(collider));
        Ok(())
    }

    /// Access a collider
    pub fn get_collider(&self, collider: ColliderRef) -> Result<&Collider> {
        self.colliders.get(collider)
    }

    /// Access a collider mutably
    pub fn get_collider_mut(&mut self, collider: ColliderRef) -> Result<&mut Collider> {
        self.colliders.get_mut(collider)
    }

    /// Live colliders with their handles
    pub fn colliders(&self) -> impl Iterator<Item = (ColliderRef, &Collider)> + '_ {
        self.colliders.iter()
    }

    /// Number of live colliders
    pub fn collider_count(&self) -> usize {
        self.colliders.live_count()
    }

    /// Whether two colliders overlapped at the end of the last update
    pub fn are_touching(&self, a: ColliderRef, b: ColliderRef) -> bool {
        self.active_pairs.contains_key(&ColliderPair::new(a, b))
    }

    // ---- listener ----

    /// Install the contact listener, replacing any previous one
    pub fn set_contact_listener(&mut self, listener: Box<dyn ContactListener>) {
        self.listener = Some(listener);
    }

    /// Remove and return the contact listener
    pub fn take_contact_listener(&mut self) -> Option<Box<dyn ContactListener>> {
        self.listener.take()
    }

    // ---- spatial ----

    /// Node boundaries of the quadtree, root first
    pub fn get_quad_tree_boundaries(&self) -> Vec<Rect> {
        self.quad_tree.get_boundaries()
    }

    /// Quadtree as built by the last update
    pub fn quad_tree(&self) -> &QuadTree {
        &self.quad_tree
    }

    /// Resize the region covered by the quadtree
    ///
    /// Rectangles without a positive area are ignored.
    pub fn set_bounds(&mut self, bounds: Rect) {
        if !bounds.is_valid() {
            log::warn!("World::set_bounds ignored invalid bounds {:?}", bounds);
            return;
        }
        self.config.bounds = bounds;
        self.quad_tree.update_boundary(bounds);
    }

    // ---- frame ----

    /// Scratch allocator cleared at the start of every update
    pub fn frame_arena_mut(&mut self) -> &mut FrameArena {
        &mut self.frame_arena
    }

    /// Allocator behind the pair bookkeeping; every block is returned by the
    /// end of an update
    pub fn pair_arena(&self) -> &PairArena {
        &self.pair_arena
    }

    /// Counters from the last update
    pub fn frame_stats(&self) -> FrameStats {
        self.stats
    }

    /// Advance the simulation by `dt` seconds
    pub fn update(&mut self, dt: f32) {
        self.frame_arena.inner_mut().clear();
        self.frame_arena.reset_stats();
        self.pair_arena.reset_stats();
        self.stats = FrameStats::default();

        self.integrate(dt);
        let indexed = self.rebuild_quad_tree();

        // Broad-phase scratch comes from the frame arena, pair buffers from
        // the free list
        {
            let frame = ScratchScope::new(&mut self.frame_arena);
            let pairs = ScratchScope::new(&mut self.pair_arena);
            let mut contacts = ContactPhase {
                bodies: &mut self.bodies,
                colliders: &self.colliders,
                quad_tree: &self.quad_tree,
                resolver: &self.resolver,
                active_pairs: &mut self.active_pairs,
                stats: &mut self.stats,
            };
            let overlapping = contacts.find_overlaps(&frame, &pairs, &indexed);
            let events = contacts.process_pairs(&pairs, &indexed, &overlapping);

            self.stats.events_dispatched = dispatch(&mut self.listener, &events);
            self.stats.scratch_spills = frame.spills() + pairs.spills();
        }
        self.stats.scratch_bytes =
            self.frame_arena.stats().bytes_requested + self.pair_arena.stats().bytes_requested;

        log::trace!("World frame: {:?}", self.stats);
    }

    fn integrate(&mut self, dt: f32) {
        for (_, body) in self.bodies.iter_mut() {
            body.update(dt);
            self.stats.bodies_integrated += 1;
        }
    }

    fn rebuild_quad_tree(&mut self) -> HashMap<ColliderRef, Indexed> {
        self.quad_tree.clear_colliders();
        let mut indexed = HashMap::new();

        for (handle, collider) in self.colliders.iter() {
            if !collider.is_usable() {
                continue;
            }
            let Ok(body) = self.bodies.get(collider.body()) else {
                continue;
            };
            let Some(shape) = collider.world_shape(body.position()) else {
                continue;
            };

            let record = SimplifiedCollider {
                collider: handle,
                bounds: shape.bounds(),
            };
            if self.quad_tree.insert(record) {
                self.stats.colliders_indexed += 1;
                indexed.insert(
                    handle,
                    Indexed {
                        body: collider.body(),
                        shape,
                        is_trigger: collider.is_trigger(),
                    },
                );
            }
        }
        indexed
    }
}

/// World state borrowed by the broad phase, narrow phase and resolver
struct ContactPhase<'w> {
    bodies: &'w mut Pool<Body, BodyTag>,
    colliders: &'w Pool<Collider, ColliderTag>,
    quad_tree: &'w QuadTree,
    resolver: &'w ContactResolver,
    active_pairs: &'w mut HashMap<ColliderPair, PairMode>,
    stats: &'w mut FrameStats,
}

impl ContactPhase<'_> {
    /// Overlapping pairs in discovery order
    fn find_overlaps<'s, 'a>(
        &mut self,
        frame: &ScratchScope<'_>,
        pairs: &'s ScratchScope<'a>,
        indexed: &HashMap<ColliderRef, Indexed>,
    ) -> ScratchVec<'s, 'a, ColliderPair> {
        // Walk colliders in handle order so discovery order is reproducible
        let mut order = frame.vec_with_capacity::<ColliderRef>(indexed.len());
        order.extend(indexed.keys().copied());
        order.sort_unstable();

        // Every candidate tagged with its discovery index, duplicates included
        let mut found = frame.vec::<ColliderRef>();
        let mut candidates = pairs.vec::<(usize, ColliderPair)>();
        for &handle in order.iter() {
            found.clear();
            self.quad_tree.query_into(&indexed[&handle].shape.bounds(), &mut found);
            for &other in found.iter() {
                if other == handle || !indexed.contains_key(&other) {
                    continue;
                }
                let discovered = candidates.len();
                candidates.push((discovered, ColliderPair::new(handle, other)));
            }
        }

        // Keep the first sighting of each pair, then restore discovery order
        candidates.sort_unstable_by_key(|&(discovered, pair)| (pair, discovered));
        let mut unique = pairs.vec_with_capacity::<(usize, ColliderPair)>(candidates.len());
        let mut previous = None;
        for &(discovered, pair) in candidates.iter() {
            if previous != Some(pair) {
                unique.push((discovered, pair));
                previous = Some(pair);
            }
        }
        unique.sort_unstable_by_key(|&(discovered, _)| discovered);
        self.stats.candidate_pairs = unique.len();

        let mut overlapping = pairs.vec::<ColliderPair>();
        for &(_, pair) in unique.iter() {
            let (a, b) = (&indexed[&pair.first()], &indexed[&pair.second()]);
            if a.body != b.body && a.shape.intersects(&b.shape) {
                overlapping.push(pair);
            }
        }

        self.stats.overlapping_pairs = overlapping.len();
        overlapping
    }

    fn process_pairs<'s, 'a>(
        &mut self,
        pairs: &'s ScratchScope<'a>,
        indexed: &HashMap<ColliderRef, Indexed>,
        overlapping: &[ColliderPair],
    ) -> ScratchVec<'s, 'a, ContactEvent> {
        let mut events = pairs.vec_with_capacity(overlapping.len());
        let mut current = HashMap::with_capacity(overlapping.len());

        for &pair in overlapping {
            let (a, b) = (&indexed[&pair.first()], &indexed[&pair.second()]);
            let mode = if a.is_trigger || b.is_trigger {
                PairMode::Trigger
            } else {
                PairMode::Solid
            };

            let kind = match self.active_pairs.get(&pair) {
                None => mode.enter(),
                Some(&previous) if previous == mode => mode.stay(),
                Some(&previous) => {
                    // Trigger flag flipped mid-contact
                    events.push(event(previous.exit(), pair));
                    mode.enter()
                }
            };

            if mode == PairMode::Solid {
                self.resolve(pair, a, b);
            }
            events.push(event(kind, pair));
            current.insert(pair, mode);
        }

        let mut ended = pairs.vec::<(ColliderPair, PairMode)>();
        ended.extend(
            self.active_pairs
                .iter()
                .filter(|(pair, _)| !current.contains_key(*pair))
                .map(|(&pair, &mode)| (pair, mode)),
        );
        ended.sort_unstable_by_key(|&(pair, _)| pair);
        events.extend(ended.iter().map(|&(pair, mode)| event(mode.exit(), pair)));

        *self.active_pairs = current;
        events
    }

    fn resolve(&mut self, pair: ColliderPair, a: &Indexed, b: &Indexed) {
        let contact = match self.resolver.setup_contact(&a.shape, &b.shape) {
            Ok(contact) => contact,
            Err(error) => {
                log::debug!("Skipping resolution of {:?}: {}", pair, error);
                return;
            }
        };

        let material = match (self.colliders.get(pair.first()), self.colliders.get(pair.second())) {
            (Ok(first), Ok(second)) => ContactMaterial::combine(first, second),
            _ => return,
        };

        match self.bodies.get_pair_mut(a.body, b.body) {
            Ok(Some((body_a, body_b))) => {
                self.resolver.resolve_collision(&contact, body_a, body_b, material);
                self.resolver.resolve_position(&contact, body_a, body_b);
                self.stats.contacts_resolved += 1;
            }
            Ok(None) => {}
            Err(error) => log::debug!("Skipping resolution of {:?}: {}", pair, error),
        }
    }
}

/// Report `events` to the listener, if any; returns the callbacks issued
fn dispatch(listener: &mut Option<Box<dyn ContactListener>>, events: &[ContactEvent]) -> usize {
    let Some(mut current) = listener.take() else {
        return 0;
    };

    for e in events {
        match e.kind {
            ContactKind::TriggerEnter => current.on_trigger_enter(e.a, e.b),
            ContactKind::TriggerStay => current.on_trigger_stay(e.a, e.b),
            ContactKind::TriggerExit => current.on_trigger_exit(e.a, e.b),
            ContactKind::CollisionEnter => current.on_collision_enter(e.a, e.b),
            ContactKind::CollisionStay => current.on_collision_stay(e.a, e.b),
            ContactKind::CollisionExit => current.on_collision_exit(e.a, e.b),
        }
    }

    *listener = Some(current);
    events.len()
}

fn event(kind: ContactKind, pair: ColliderPair) -> ContactEvent {
    ContactEvent {
        kind,
        a: pair.first(),
        b: pair.second(),
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("bodies", &self.bodies.live_count())
            .field("colliders", &self.colliders.live_count())
            .field("active_pairs", &self.active_pairs.len())
            .field("quad_tree_nodes", &self.quad_tree.node_count())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}
