//! # World Configuration
//!
//! Tunables for the simulation, grouped per subsystem. Every structure has a
//! `Default` matching the engine constants and serializes to TOML or RON
//! through the [`Config`] trait.
//!
//! ```toml
//! pool_growth = 16
//! frame_arena_size = 65536
//! pair_arena_size = 65536
//!
//! [bounds]
//! min = [0.0, 0.0]
//! max = [1280.0, 720.0]
//!
//! [quadtree]
//! max_depth = 5
//! max_capacity = 8
//!
//! [solver]
//! correction_percent = 0.4
//! slop = 0.01
//! ```

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};
use crate::foundation::math::Vec2;
use crate::geometry::Rect;
use crate::handle::POOL_GROWTH;
use crate::spatial::quadtree::{MAX_CAPACITY, MAX_DEPTH};

/// Default size in bytes of the per-frame scratch arena
pub const FRAME_ARENA_SIZE: usize = 64 * 1024;

/// Default size in bytes of the free-list arena holding pair bookkeeping
pub const PAIR_ARENA_SIZE: usize = 64 * 1024;

/// # QuadTree Configuration
///
/// Bounds the recursion depth and the number of records a node keeps before
/// it subdivides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadTreeConfig {
    /// Depth at which nodes stop subdividing (root is depth 0)
    pub max_depth: usize,
    /// Records a node holds before it subdivides
    pub max_capacity: usize,
}

impl Default for QuadTreeConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            max_capacity: MAX_CAPACITY,
        }
    }
}

/// # Solver Configuration
///
/// Positional correction applied after impulse resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Fraction of the penetration removed per frame
    pub correction_percent: f32,
    /// Penetration tolerated without correction
    pub slop: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            correction_percent: 0.4,
            slop: 0.01,
        }
    }
}

/// # World Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Region covered by the quadtree
    pub bounds: Rect,
    /// Spatial index limits
    pub quadtree: QuadTreeConfig,
    /// Contact solver tunables
    pub solver: SolverConfig,
    /// Slots added when a body or collider store is full
    pub pool_growth: usize,
    /// Size in bytes of the per-frame scratch arena
    pub frame_arena_size: usize,
    /// Size in bytes of the free-list arena holding pair bookkeeping
    pub pair_arena_size: usize,
}

impl WorldConfig {
    /// Default configuration covering `bounds`
    pub fn with_bounds(bounds: Rect) -> Self {
        Self {
            bounds,
            ..Self::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bounds.is_valid() {
            return Err(ConfigError::Invalid(format!(
                "bounds must have a positive area, got {:?}",
                self.bounds
            )));
        }
        if self.quadtree.max_capacity == 0 {
            return Err(ConfigError::Invalid("quadtree max_capacity must be at least 1".to_string()));
        }
        if self.pool_growth == 0 {
            return Err(ConfigError::Invalid("pool_growth must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.solver.correction_percent) || self.solver.slop < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "solver tunables out of range: {:?}",
                self.solver
            )));
        }
        Ok(())
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            bounds: Rect::new(Vec2::zeros(), Vec2::new(1280.0, 720.0)),
            quadtree: QuadTreeConfig::default(),
            solver: SolverConfig::default(),
            pool_growth: POOL_GROWTH,
            frame_arena_size: FRAME_ARENA_SIZE,
            pair_arena_size: PAIR_ARENA_SIZE,
        }
    }
}

impl Config for WorldConfig {}
