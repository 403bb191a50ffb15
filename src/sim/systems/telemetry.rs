//! Swarm telemetry
//!
//! Reduces the swarm to a handful of collective-motion scalars, recomputed
//! from scratch every tick.

use serde::Serialize;

use crate::sim::agent::Agent;
use crate::sim::constants::telemetry::COHESION_RADIUS;
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    /// Alignment of headings, 1.0 = all agents moving the same way
    pub polarization: f64,
    /// Rotation about the centroid, 0.0 = none
    pub milling: f64,
    /// Spatial tightness, 1.0 = colocated
    pub cohesion: f64,
    pub center_of_mass: Vec2,
    pub active_count: usize,
}

#[inline]
fn unit(x: f64, y: f64) -> (f64, f64) {
    let len = (x * x + y * y).sqrt();
    if len > 0.0 {
        (x / len, y / len)
    } else {
        (0.0, 0.0)
    }
}

/// Analyze the swarm members among `agents`. An empty swarm yields all zeros.
pub fn analyze<'a>(agents: impl IntoIterator<Item = &'a Agent>) -> TelemetrySnapshot {
    let swarm: Vec<(f64, f64, f64, f64)> = agents
        .into_iter()
        .filter(|a| a.swarm_member)
        .map(|a| {
            (
                a.position.x as f64,
                a.position.y as f64,
                a.velocity.x as f64,
                a.velocity.y as f64,
            )
        })
        .collect();

    if swarm.is_empty() {
        return TelemetrySnapshot::default();
    }
    let n = swarm.len() as f64;

    let (sum_x, sum_y) = swarm
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &(x, y, _, _)| (sx + x, sy + y));
    let (cx, cy) = (sum_x / n, sum_y / n);

    let mut heading_x = 0.0;
    let mut heading_y = 0.0;
    let mut milling = 0.0;
    let mut spread = 0.0;

    for &(x, y, vx, vy) in &swarm {
        let (ux, uy) = unit(vx, vy);
        heading_x += ux;
        heading_y += uy;

        let (rx, ry) = (x - cx, y - cy);
        spread += (rx * rx + ry * ry).sqrt();

        let (rux, ruy) = unit(rx, ry);
        milling += (rux * uy - ruy * ux).abs();
    }

    TelemetrySnapshot {
        polarization: (heading_x * heading_x + heading_y * heading_y).sqrt() / n,
        milling: milling / n,
        cohesion: (1.0 - (spread / n) / COHESION_RADIUS).max(0.0),
        center_of_mass: Vec2::new(cx as f32, cy as f32),
        active_count: swarm.len(),
    }
}
