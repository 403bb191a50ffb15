//! Flattened transfer buffers between the simulation and the intent worker
//!
//! Both buffers are owned values that move across the channel; once sent the
//! sender has no way back into them.
//!
//! Outbound layout: `[x, y, z, id, allegiance]` per swarm agent.
//! Inbound layout: `[id, vx, vy, vz]` per evaluated hostile.

use crate::sim::agent::{Agent, AgentId, Faction};
use crate::sim::constants::tactical::{
    ALLEGIANCE_FRIENDLY, ALLEGIANCE_HOSTILE, ALLEGIANCE_NEUTRAL, RESPONSE_STRIDE, SNAPSHOT_STRIDE,
};
use crate::util::vec2::Vec2;

fn faction_to_wire(faction: Faction) -> f64 {
    match faction {
        Faction::Friendly => ALLEGIANCE_FRIENDLY,
        Faction::Hostile => ALLEGIANCE_HOSTILE,
        Faction::Neutral => ALLEGIANCE_NEUTRAL,
    }
}

fn faction_from_wire(value: f64) -> Option<Faction> {
    if value == ALLEGIANCE_FRIENDLY {
        Some(Faction::Friendly)
    } else if value == ALLEGIANCE_HOSTILE {
        Some(Faction::Hostile)
    } else if value == ALLEGIANCE_NEUTRAL {
        Some(Faction::Neutral)
    } else {
        None
    }
}

/// One decoded snapshot slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotEntry {
    pub id: AgentId,
    pub position: Vec2,
    pub faction: Faction,
}

/// Positions of all swarm agents at one schedule point
#[derive(Debug, Clone)]
pub struct TacticalSnapshot {
    generation: u64,
    data: Box<[f64]>,
}

impl TacticalSnapshot {
    /// Pack every swarm member of `agents`
    pub fn capture<'a>(generation: u64, agents: impl IntoIterator<Item = &'a Agent>) -> Self {
        let mut data = Vec::new();
        for agent in agents.into_iter().filter(|a| a.swarm_member) {
            data.extend_from_slice(&[
                agent.position.x as f64,
                agent.position.y as f64,
                0.0,
                agent.id.to_wire(),
                faction_to_wire(agent.faction),
            ]);
        }
        Self {
            generation,
            data: data.into_boxed_slice(),
        }
    }

    /// Wrap an already-flattened buffer
    pub fn from_raw(generation: u64, data: Vec<f64>) -> Self {
        Self {
            generation,
            data: data.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of complete slots
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / SNAPSHOT_STRIDE
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Decode slots, skipping any with a bad id, allegiance, or position
    pub fn entries(&self) -> impl Iterator<Item = SnapshotEntry> + '_ {
        self.data.chunks_exact(SNAPSHOT_STRIDE).filter_map(|slot| {
            let id = AgentId::from_wire(slot[3])?;
            let faction = faction_from_wire(slot[4])?;
            let position = Vec2::new(slot[0] as f32, slot[1] as f32);
            position.is_finite().then_some(SnapshotEntry {
                id,
                position,
                faction,
            })
        })
    }
}

/// One decoded response slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentEntry {
    pub id: AgentId,
    pub desired: Vec2,
}

/// Desired steering vectors for the hostiles of one snapshot
#[derive(Debug, Clone)]
pub struct IntentResponse {
    generation: u64,
    data: Box<[f64]>,
}

impl IntentResponse {
    pub fn from_entries(generation: u64, entries: impl IntoIterator<Item = IntentEntry>) -> Self {
        let mut data = Vec::new();
        for entry in entries {
            data.extend_from_slice(&[
                entry.id.to_wire(),
                entry.desired.x as f64,
                entry.desired.y as f64,
                0.0,
            ]);
        }
        Self {
            generation,
            data: data.into_boxed_slice(),
        }
    }

    pub fn from_raw(generation: u64, data: Vec<f64>) -> Self {
        Self {
            generation,
            data: data.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / RESPONSE_STRIDE
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Trailing values that do not form a full slot
    #[inline]
    pub fn remainder(&self) -> usize {
        self.data.len() % RESPONSE_STRIDE
    }

    /// Decode slots, skipping any with a bad id or a non-finite vector
    pub fn entries(&self) -> impl Iterator<Item = IntentEntry> + '_ {
        self.data.chunks_exact(RESPONSE_STRIDE).filter_map(|slot| {
            let id = AgentId::from_wire(slot[0])?;
            let desired = Vec2::new(slot[1] as f32, slot[2] as f32);
            desired.is_finite().then_some(IntentEntry { id, desired })
        })
    }
}
