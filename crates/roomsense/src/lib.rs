//! # roomsense - headless spatial queries for an embodied agent
//!
//! Loads scenes and scenarios from RON, layers configuration from files and
//! the environment, and runs reachability, visibility and motion queries
//! through [`roomsense_core`].

pub mod config;
pub mod scenario;

// Re-export core modules for convenience
pub use roomsense_core::controller;
pub use roomsense_core::navigation;
pub use roomsense_core::perception;
pub use roomsense_core::world;

pub use config::AppConfig;
pub use scenario::{Query, Scenario, ScenarioReport, ScenarioRunner};
