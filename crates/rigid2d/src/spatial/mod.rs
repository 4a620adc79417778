//! Spatial partitioning data structures
//!
//! Provides the quadtree used by the broad phase to find candidate pairs.

pub mod quadtree;

pub use quadtree::{QuadNode, QuadTree, SimplifiedCollider, MAX_CAPACITY, MAX_DEPTH};
