//! Scripted drift for non-swarm tracks
//!
//! Each track wobbles around its anchor on a slow Lissajous path and spins in
//! place. No neighbor interaction.

use crate::sim::agent::Agent;
use crate::sim::constants::clock::MIN_SPIN_MOTION;
use crate::sim::constants::drift::*;
use crate::sim::store::EntityStore;
use crate::util::vec2::Vec2;

/// Offset from the anchor at simulation time `t`
#[inline]
pub fn drift_offset(agent: &Agent, t: f32) -> Vec2 {
    let amplitude = if agent.reported_speed > 0.0 {
        MOVING_AMPLITUDE
    } else {
        STATIC_AMPLITUDE
    } * AMPLITUDE_SCALE;

    Vec2::new(
        (t * FREQUENCY_X + agent.phase).sin(),
        (t * FREQUENCY_Y + agent.phase).cos(),
    ) * amplitude
}

/// Place every non-swarm agent for simulation time `t`
pub fn update(store: &mut EntityStore, t: f64, motion: f32) {
    let t = t as f32;
    let spin = t * SPIN_RATE * motion.max(MIN_SPIN_MOTION);

    for agent in store.agents_mut().iter_mut().filter(|a| !a.swarm_member) {
        agent.position = agent.anchor + drift_offset(agent, t);
        agent.heading = spin + agent.phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::agent::{AgentId, Faction};

    const EPSILON: f32 = 1e-5;

    fn track(reported_speed: f32, phase: f32) -> Agent {
        Agent::new(AgentId(1), "TK-4071", Faction::Hostile, Vec2::new(-12.0, 8.0))
            .with_drift(phase, reported_speed)
    }

    #[test]
    fn test_moving_track_amplitude() {
        let agent = track(22.0, 0.0);
        // t = 0: sin(0) = 0, cos(0) = 1
        assert!(drift_offset(&agent, 0.0).approx_eq(Vec2::new(0.0, 0.9), EPSILON));
    }

    #[test]
    fn test_static_track_barely_moves() {
        let agent = track(0.0, std::f32::consts::FRAC_PI_2);
        let offset = drift_offset(&agent, 0.0);
        assert!(offset.approx_eq(Vec2::new(0.15, 0.0), EPSILON));
        for step in 0..100 {
            assert!(drift_offset(&agent, step as f32 * 0.7).length() <= 0.15 * 2f32.sqrt() + EPSILON);
        }
    }

    #[test]
    fn test_update_moves_only_non_swarm() {
        let mut store = EntityStore::new();
        store
            .load(vec![
                track(22.0, 0.0),
                Agent::new(AgentId(2), "SW-1000", Faction::Friendly, Vec2::new(5.0, 5.0)).swarm(Vec2::ZERO),
            ])
            .unwrap();

        update(&mut store, 0.0, 1.0);

        let named = store.get(AgentId(1)).unwrap();
        assert!(named.position.approx_eq(Vec2::new(-12.0, 8.9), EPSILON));
        assert_eq!(named.anchor, Vec2::new(-12.0, 8.0));
        assert_eq!(store.get(AgentId(2)).unwrap().position, Vec2::new(5.0, 5.0));
    }

    #[test]
    fn test_spin_has_motion_floor() {
        let mut store = EntityStore::new();
        store.load(vec![track(0.0, 0.5)]).unwrap();

        update(&mut store, 10.0, 0.0);
        let heading = store.get(AgentId(1)).unwrap().heading;
        assert!((heading - (10.0 * 0.8 * 0.08 + 0.5)).abs() < EPSILON);
    }
}
