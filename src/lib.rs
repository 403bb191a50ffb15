//! Tactical Swarm Simulation Library
//!
//! A real-time flocking engine for thousands of tracks on a 2D tactical
//! plane, with an asynchronous behavior-tree intent layer for the opposing
//! force and per-tick swarm telemetry.

pub mod config;
pub mod util;
pub mod sim;
pub mod metrics;
