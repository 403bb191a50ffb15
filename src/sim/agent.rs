//! Agent definitions
//!
//! An agent is one simulated track on the tactical plane. Swarm members take
//! part in flocking and the tactical intent layer; everything else follows a
//! scripted drift around its anchor.

use serde::{Deserialize, Serialize};

use crate::util::vec2::Vec2;

/// Stable agent handle
///
/// Ids are carried through the f64 transfer buffers, so every `u32` value
/// round-trips exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl AgentId {
    /// Decode an id from a transfer buffer slot
    pub fn from_wire(value: f64) -> Option<Self> {
        if value.is_finite() && value >= 0.0 && value <= u32::MAX as f64 && value.fract() == 0.0 {
            Some(Self(value as u32))
        } else {
            None
        }
    }

    #[inline]
    pub fn to_wire(self) -> f64 {
        self.0 as f64
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Hostile,
    Friendly,
    Neutral,
}

impl Faction {
    /// Whether the two factions pursue each other
    #[inline]
    pub fn opposes(self, other: Faction) -> bool {
        matches!(
            (self, other),
            (Faction::Hostile, Faction::Friendly) | (Faction::Friendly, Faction::Hostile)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
}

/// Countdown to an externally observed event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatCountdown {
    pub level: ThreatLevel,
    /// Seconds remaining, floored at zero
    pub time_to_event: f32,
    /// Set once the one-shot alert has been emitted
    pub alerted: bool,
}

impl ThreatCountdown {
    pub fn new(level: ThreatLevel, time_to_event: f32) -> Self {
        Self {
            level,
            time_to_event: time_to_event.max(0.0),
            alerted: false,
        }
    }
}

/// Simulated agent. Owned exclusively by the entity store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    // === Kinematics (touched every tick) ===
    pub position: Vec2,
    pub velocity: Vec2,
    /// Facing angle in radians, including the mesh forward offset
    pub heading: f32,
    /// Last steering bias delivered by the tactical layer; zero if none yet
    pub intent: Vec2,
    /// Simulation seconds since `intent` was last delivered
    pub intent_age: f32,

    // === Identity ===
    pub id: AgentId,
    pub callsign: String,
    pub faction: Faction,
    pub subtype: String,
    pub swarm_member: bool,

    // === Scripted drift (non-swarm only) ===
    pub anchor: Vec2,
    pub phase: f32,
    pub reported_speed: f32,

    pub threat: Option<ThreatCountdown>,
}

impl Agent {
    pub fn new(id: AgentId, callsign: impl Into<String>, faction: Faction, position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            heading: 0.0,
            intent: Vec2::ZERO,
            intent_age: 0.0,
            id,
            callsign: callsign.into(),
            faction,
            subtype: String::new(),
            swarm_member: false,
            anchor: position,
            phase: 0.0,
            reported_speed: 0.0,
            threat: None,
        }
    }

    /// Builder: mark as a flocking swarm member with an initial velocity
    pub fn swarm(mut self, velocity: Vec2) -> Self {
        self.swarm_member = true;
        self.velocity = velocity;
        self
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = subtype.into();
        self
    }

    pub fn with_drift(mut self, phase: f32, reported_speed: f32) -> Self {
        self.phase = phase;
        self.reported_speed = reported_speed;
        self
    }

    pub fn with_threat(mut self, threat: ThreatCountdown) -> Self {
        self.threat = Some(threat);
        self
    }

    pub fn is_hostile(&self) -> bool {
        self.faction == Faction::Hostile
    }

    pub fn is_friendly(&self) -> bool {
        self.faction == Faction::Friendly
    }

    /// Replace the tactical intent and reset its age
    pub fn set_intent(&mut self, intent: Vec2) {
        self.intent = intent;
        self.intent_age = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_wire_round_trip() {
        for raw in [0u32, 1, 4071, 16_777_217, u32::MAX] {
            let id = AgentId(raw);
            assert_eq!(AgentId::from_wire(id.to_wire()), Some(id));
        }
    }

    #[test]
    fn test_agent_id_rejects_garbage() {
        assert_eq!(AgentId::from_wire(-1.0), None);
        assert_eq!(AgentId::from_wire(1.5), None);
        assert_eq!(AgentId::from_wire(f64::NAN), None);
        assert_eq!(AgentId::from_wire(f64::INFINITY), None);
        assert_eq!(AgentId::from_wire(u32::MAX as f64 + 1.0), None);
    }

    #[test]
    fn test_faction_opposition() {
        assert!(Faction::Hostile.opposes(Faction::Friendly));
        assert!(Faction::Friendly.opposes(Faction::Hostile));
        assert!(!Faction::Hostile.opposes(Faction::Hostile));
        assert!(!Faction::Neutral.opposes(Faction::Hostile));
        assert!(!Faction::Friendly.opposes(Faction::Neutral));
    }

    #[test]
    fn test_new_agent_defaults() {
        let agent = Agent::new(AgentId(7), "SW-1007", Faction::Hostile, Vec2::new(1.0, 2.0));
        assert!(!agent.swarm_member);
        assert_eq!(agent.intent, Vec2::ZERO);
        assert_eq!(agent.anchor, Vec2::new(1.0, 2.0));
        assert!(agent.threat.is_none());
    }

    #[test]
    fn test_threat_countdown_floors_at_zero() {
        let threat = ThreatCountdown::new(ThreatLevel::High, -5.0);
        assert_eq!(threat.time_to_event, 0.0);
        assert!(!threat.alerted);
    }

    #[test]
    fn test_set_intent_resets_age() {
        let mut agent = Agent::new(AgentId(1), "SW-1001", Faction::Hostile, Vec2::ZERO);
        agent.intent_age = 3.0;
        agent.set_intent(Vec2::new(1.0, 0.0));
        assert_eq!(agent.intent_age, 0.0);
        assert_eq!(agent.intent, Vec2::new(1.0, 0.0));
    }
}
