//! # Core Engine Module
//!
//! Shared configuration for the simulation subsystems.

pub mod config;

pub use config::{Config, ConfigError, QuadTreeConfig, SolverConfig, WorldConfig};
