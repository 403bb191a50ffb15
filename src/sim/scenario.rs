//! Scenario profiles and bulk agent generation

use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::sim::agent::{Agent, AgentId, Faction, ThreatCountdown, ThreatLevel};
use crate::sim::constants::flocking::MAX_SPEED;
use crate::sim::constants::scenario::{
    FRIENDLY_ROLL, HOSTILE_ROLL, MAX_REPORTED_SPEED, SPAWN_RADIUS, SWARM_CALLSIGN_BASE, SWARM_COUNT,
};
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ScenarioError {
    #[error("Unknown scenario profile '{0}' (expected clear, theater or skirmish)")]
    UnknownProfile(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScenarioProfile {
    /// Empty agent set
    Clear,
    /// Named theater tracks plus the full drone swarm
    Theater,
    /// Three hostile and three friendly swarm members
    Skirmish,
}

impl ScenarioProfile {
    pub fn name(self) -> &'static str {
        match self {
            ScenarioProfile::Clear => "clear",
            ScenarioProfile::Theater => "theater",
            ScenarioProfile::Skirmish => "skirmish",
        }
    }

    /// Generate the agent set. The same seed always yields the same agents.
    pub fn generate(self, seed: u64) -> Vec<Agent> {
        let mut rng = StdRng::seed_from_u64(seed);
        match self {
            ScenarioProfile::Clear => Vec::new(),
            ScenarioProfile::Theater => theater(&mut rng),
            ScenarioProfile::Skirmish => skirmish(),
        }
    }
}

impl FromStr for ScenarioProfile {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clear" => Ok(ScenarioProfile::Clear),
            "theater" => Ok(ScenarioProfile::Theater),
            "skirmish" => Ok(ScenarioProfile::Skirmish),
            _ => Err(ScenarioError::UnknownProfile(s.to_string())),
        }
    }
}

impl fmt::Display for ScenarioProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const HOSTILE_SUBTYPES: &[&str] = &["ARMOR", "MECH INF", "ADA", "MLRS", "LOG", "C2", "UAS SWARM"];
const FRIENDLY_SUBTYPES: &[&str] = &["MEU", "CAV", "SOF", "FIRES", "UAS SWARM"];
const NEUTRAL_SUBTYPES: &[&str] = &["CONVOY", "ROTARY", "CIV", "UAS SWARM"];

fn subtypes_for(faction: Faction) -> &'static [&'static str] {
    match faction {
        Faction::Hostile => HOSTILE_SUBTYPES,
        Faction::Friendly => FRIENDLY_SUBTYPES,
        Faction::Neutral => NEUTRAL_SUBTYPES,
    }
}

struct NamedTrack {
    callsign: &'static str,
    faction: Faction,
    subtype: &'static str,
    x: f32,
    y: f32,
    speed: f32,
}

const NAMED_TRACKS: [NamedTrack; 6] = [
    NamedTrack { callsign: "TK-4071", faction: Faction::Hostile, subtype: "ARMOR", x: -12.0, y: 8.0, speed: 22.0 },
    NamedTrack { callsign: "TK-4072", faction: Faction::Hostile, subtype: "MECH INF", x: 15.0, y: -5.0, speed: 35.0 },
    NamedTrack { callsign: "TK-4073", faction: Faction::Hostile, subtype: "ADA", x: -5.0, y: -18.0, speed: 0.0 },
    NamedTrack { callsign: "TK-4074", faction: Faction::Hostile, subtype: "MLRS", x: 18.0, y: 12.0, speed: 0.0 },
    NamedTrack { callsign: "BF-1001", faction: Faction::Friendly, subtype: "MEU", x: -8.0, y: 20.0, speed: 15.0 },
    NamedTrack { callsign: "UK-7001", faction: Faction::Neutral, subtype: "CONVOY", x: 25.0, y: -15.0, speed: 55.0 },
];

/// Countdown seconds for moving named hostiles, in track order
const HIGH_THREAT_ETA: [f32; 2] = [75.0, 140.0];
const MEDIUM_THREAT_ETA: f32 = 300.0;
const LOW_THREAT_ETA_RANGE: std::ops::Range<f32> = 180.0..900.0;

fn theater(rng: &mut StdRng) -> Vec<Agent> {
    let mut agents = Vec::with_capacity(NAMED_TRACKS.len() + SWARM_COUNT);
    let mut moving_hostiles = 0;

    for (i, track) in NAMED_TRACKS.iter().enumerate() {
        let mut agent = Agent::new(
            AgentId(i as u32),
            track.callsign,
            track.faction,
            Vec2::new(track.x, track.y),
        )
        .with_subtype(track.subtype)
        .with_drift(rng.gen_range(0.0..TAU), track.speed);

        if track.faction == Faction::Hostile {
            let threat = if track.speed > 0.0 {
                let eta = HIGH_THREAT_ETA[moving_hostiles % HIGH_THREAT_ETA.len()];
                moving_hostiles += 1;
                ThreatCountdown::new(ThreatLevel::High, eta)
            } else {
                ThreatCountdown::new(ThreatLevel::Medium, MEDIUM_THREAT_ETA)
            };
            agent = agent.with_threat(threat);
        }
        agents.push(agent);
    }

    for i in 0..SWARM_COUNT {
        let roll: f64 = rng.gen();
        let faction = if roll > FRIENDLY_ROLL {
            Faction::Friendly
        } else if roll > HOSTILE_ROLL {
            Faction::Hostile
        } else {
            Faction::Neutral
        };
        let subtype = subtypes_for(faction).choose(rng).copied().unwrap_or("UAS SWARM");
        let angle = rng.gen_range(0.0..TAU);
        let radius = rng.gen_range(0.0..SPAWN_RADIUS);
        let heading = rng.gen_range(0.0..TAU);
        let speed = rng.gen_range(0.0..MAX_SPEED);

        let mut agent = Agent::new(
            AgentId(agents.len() as u32),
            format!("SW-{}", SWARM_CALLSIGN_BASE + i),
            faction,
            Vec2::from_angle(angle) * radius,
        )
        .with_subtype(subtype)
        .with_drift(0.0, rng.gen_range(0.0..MAX_REPORTED_SPEED))
        .swarm(Vec2::from_angle(heading) * speed);

        if faction == Faction::Hostile {
            agent = agent.with_threat(ThreatCountdown::new(
                ThreatLevel::Low,
                rng.gen_range(LOW_THREAT_ETA_RANGE),
            ));
        }
        agents.push(agent);
    }

    agents
}

/// Two lines of three facing each other across the origin
fn skirmish() -> Vec<Agent> {
    let mut agents = Vec::with_capacity(6);
    for (side, faction, x, vx) in [
        (0u32, Faction::Hostile, -20.0f32, 1.0f32),
        (1, Faction::Friendly, 20.0, -1.0),
    ] {
        for row in 0..3u32 {
            let index = side * 3 + row;
            let y = (row as f32 - 1.0) * 4.0;
            agents.push(
                Agent::new(
                    AgentId(index),
                    format!("SW-{}", SWARM_CALLSIGN_BASE + index as usize),
                    faction,
                    Vec2::new(x, y),
                )
                .with_subtype("UAS SWARM")
                .swarm(Vec2::new(vx, 0.0)),
            );
        }
    }
    agents
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashSet;

    #[test]
    fn test_profile_parsing() {
        assert_eq!("clear".parse::<ScenarioProfile>(), Ok(ScenarioProfile::Clear));
        assert_eq!(" Theater ".parse::<ScenarioProfile>(), Ok(ScenarioProfile::Theater));
        assert_eq!("SKIRMISH".parse::<ScenarioProfile>(), Ok(ScenarioProfile::Skirmish));
        assert_eq!(
            "siege".parse::<ScenarioProfile>(),
            Err(ScenarioError::UnknownProfile("siege".to_string()))
        );
        assert_eq!(ScenarioProfile::Theater.to_string(), "theater");
    }

    #[test]
    fn test_clear_is_empty() {
        assert!(ScenarioProfile::Clear.generate(1).is_empty());
    }

    #[test]
    fn test_theater_population() {
        let agents = ScenarioProfile::Theater.generate(42);
        assert_eq!(agents.len(), 6 + SWARM_COUNT);

        let ids: HashSet<_> = agents.iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), agents.len(), "ids must be unique");

        let named: Vec<_> = agents.iter().filter(|a| !a.swarm_member).collect();
        assert_eq!(named.len(), 6);
        assert_eq!(named[0].callsign, "TK-4071");
        assert_eq!(named[5].faction, Faction::Neutral);

        let swarm: Vec<_> = agents.iter().filter(|a| a.swarm_member).collect();
        assert_eq!(swarm[0].callsign, "SW-1000");
        assert_eq!(swarm[SWARM_COUNT - 1].callsign, "SW-2499");
        for agent in &swarm {
            assert!(agent.position.length() <= SPAWN_RADIUS + 1e-3);
            assert!(agent.velocity.length() <= MAX_SPEED + 1e-3);
            assert!(subtypes_for(agent.faction).contains(&agent.subtype.as_str()));
        }
    }

    #[test]
    fn test_theater_faction_split() {
        let agents = ScenarioProfile::Theater.generate(7);
        let swarm = agents.iter().filter(|a| a.swarm_member);
        let friendly = swarm.clone().filter(|a| a.is_friendly()).count() as f64;
        let hostile = swarm.clone().filter(|a| a.is_hostile()).count() as f64;
        let n = SWARM_COUNT as f64;
        assert!((friendly / n - 0.4).abs() < 0.06);
        assert!((hostile / n - 0.3).abs() < 0.06);
    }

    #[test]
    fn test_theater_threat_levels() {
        let agents = ScenarioProfile::Theater.generate(3);
        let high: Vec<_> = agents
            .iter()
            .filter(|a| matches!(&a.threat, Some(t) if t.level == ThreatLevel::High))
            .map(|a| a.callsign.as_str())
            .collect();
        assert_eq!(high, vec!["TK-4071", "TK-4072"]);
        assert!(agents.iter().filter(|a| !a.is_hostile()).all(|a| a.threat.is_none()));
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let a = ScenarioProfile::Theater.generate(99);
        let b = ScenarioProfile::Theater.generate(99);
        assert!(a
            .iter()
            .zip(&b)
            .all(|(x, y)| x.position == y.position && x.faction == y.faction));
    }

    #[test]
    fn test_skirmish_layout() {
        let agents = ScenarioProfile::Skirmish.generate(0);
        assert_eq!(agents.len(), 6);
        assert_eq!(agents.iter().filter(|a| a.is_hostile()).count(), 3);
        assert_eq!(agents.iter().filter(|a| a.is_friendly()).count(), 3);
        assert!(agents.iter().all(|a| a.swarm_member));
    }
}
