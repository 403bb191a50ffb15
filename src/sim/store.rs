//! Entity store
//!
//! Sole owner of agent state for a simulation session. Other passes borrow it
//! for the duration of one tick and keep nothing afterwards.

use hashbrown::HashMap;
use serde::Serialize;
use tracing::debug;

use crate::sim::agent::{Agent, AgentId, Faction};
use crate::sim::tactical::buffer::{IntentResponse, TacticalSnapshot};
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum StoreError {
    #[error("Duplicate agent id {0}")]
    DuplicateId(AgentId),
    #[error("Agent {0} has non-finite initial kinematics")]
    NonFinite(AgentId),
}

/// Outcome of merging one intent response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntentMerge {
    /// Agents whose intent was replaced
    pub applied: usize,
    /// Entries naming agents not in the store
    pub unknown: usize,
    /// Whole response discarded because its generation is outdated
    pub stale: bool,
}

/// Agent counts by faction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Population {
    pub hostile: usize,
    pub friendly: usize,
    pub neutral: usize,
    /// Swarm members across all factions
    pub swarm: usize,
}

impl Population {
    pub fn total(&self) -> usize {
        self.hostile + self.friendly + self.neutral
    }
}

#[derive(Debug, Default)]
pub struct EntityStore {
    agents: Vec<Agent>,
    index: HashMap<AgentId, usize>,
    /// Bumped on every bulk load or clear
    generation: u64,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole agent set. On error the store is left untouched.
    pub fn load(&mut self, agents: Vec<Agent>) -> Result<(), StoreError> {
        let mut index = HashMap::with_capacity(agents.len());
        for (i, agent) in agents.iter().enumerate() {
            if !agent.position.is_finite() || !agent.velocity.is_finite() {
                return Err(StoreError::NonFinite(agent.id));
            }
            if index.insert(agent.id, i).is_some() {
                return Err(StoreError::DuplicateId(agent.id));
            }
        }

        self.agents = agents;
        self.index = index;
        self.generation += 1;
        Ok(())
    }

    /// Remove every agent
    pub fn clear(&mut self) {
        self.agents.clear();
        self.index.clear();
        self.generation += 1;
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.index.get(&id).map(|&i| &self.agents[i])
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.index.get(&id).map(|&i| &mut self.agents[i])
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.index.contains_key(&id)
    }

    #[inline]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Mutable access to agent state. The slice cannot grow or shrink, so the
    /// id index stays valid.
    #[inline]
    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    pub fn swarm(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter().filter(|a| a.swarm_member)
    }

    pub fn population(&self) -> Population {
        let mut population = Population::default();
        for agent in &self.agents {
            match agent.faction {
                Faction::Hostile => population.hostile += 1,
                Faction::Friendly => population.friendly += 1,
                Faction::Neutral => population.neutral += 1,
            }
            if agent.swarm_member {
                population.swarm += 1;
            }
        }
        population
    }

    /// Copy every swarm member into an owned buffer for the intent worker
    pub fn tactical_snapshot(&self) -> TacticalSnapshot {
        TacticalSnapshot::capture(self.generation, &self.agents)
    }

    /// Merge worker output keyed by id. Agents without an entry keep their
    /// previous intent; entries for unknown ids are dropped.
    pub fn apply_intents(&mut self, response: &IntentResponse) -> IntentMerge {
        if response.generation() != self.generation {
            debug!(
                "Dropping intent response for generation {} (current {})",
                response.generation(),
                self.generation
            );
            return IntentMerge {
                stale: true,
                ..IntentMerge::default()
            };
        }

        let mut merge = IntentMerge::default();
        for entry in response.entries() {
            match self.index.get(&entry.id) {
                Some(&i) => {
                    self.agents[i].set_intent(entry.desired);
                    merge.applied += 1;
                }
                None => merge.unknown += 1,
            }
        }
        merge
    }

    /// Age every delivered intent by `dt` and clear those older than `ttl`.
    /// Returns the number cleared.
    pub fn expire_intents(&mut self, dt: f32, ttl: Option<f32>) -> usize {
        let mut expired = 0;
        for agent in self.agents.iter_mut().filter(|a| !a.intent.is_zero()) {
            agent.intent_age += dt;
            if let Some(ttl) = ttl {
                if agent.intent_age > ttl {
                    agent.intent = Vec2::ZERO;
                    agent.intent_age = 0.0;
                    expired += 1;
                }
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::tactical::buffer::IntentEntry;

    fn swarm_agent(id: u32, faction: Faction) -> Agent {
        Agent::new(AgentId(id), format!("SW-{}", id), faction, Vec2::new(id as f32, 0.0))
            .swarm(Vec2::ZERO)
    }

    fn loaded_store() -> EntityStore {
        let mut store = EntityStore::new();
        store
            .load(vec![
                swarm_agent(1, Faction::Hostile),
                swarm_agent(2, Faction::Hostile),
                swarm_agent(3, Faction::Friendly),
            ])
            .unwrap();
        store
    }

    #[test]
    fn test_load_indexes_agents() {
        let store = loaded_store();
        assert_eq!(store.len(), 3);
        assert_eq!(store.generation(), 1);
        assert_eq!(store.get(AgentId(3)).map(|a| a.faction), Some(Faction::Friendly));
        assert!(store.get(AgentId(9)).is_none());
    }

    #[test]
    fn test_population_counts() {
        let mut store = loaded_store();
        assert_eq!(
            store.population(),
            Population { hostile: 2, friendly: 1, neutral: 0, swarm: 3 }
        );
        store.clear();
        assert_eq!(store.population().total(), 0);
    }

    #[test]
    fn test_duplicate_id_rejected_without_side_effects() {
        let mut store = loaded_store();
        let result = store.load(vec![swarm_agent(5, Faction::Hostile), swarm_agent(5, Faction::Friendly)]);
        assert_eq!(result, Err(StoreError::DuplicateId(AgentId(5))));
        assert_eq!(store.len(), 3);
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_non_finite_agent_rejected() {
        let mut store = EntityStore::new();
        let mut agent = swarm_agent(1, Faction::Hostile);
        agent.velocity = Vec2::new(f32::NAN, 0.0);
        assert_eq!(store.load(vec![agent]), Err(StoreError::NonFinite(AgentId(1))));
    }

    #[test]
    fn test_clear_bumps_generation() {
        let mut store = loaded_store();
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.generation(), 2);
        assert!(!store.contains(AgentId(1)));
    }

    #[test]
    fn test_snapshot_carries_generation() {
        let store = loaded_store();
        let snapshot = store.tactical_snapshot();
        assert_eq!(snapshot.generation(), 1);
        assert_eq!(snapshot.len(), 3);
    }

    #[test]
    fn test_apply_intents_updates_only_listed_agents() {
        let mut store = loaded_store();
        store.get_mut(AgentId(2)).unwrap().set_intent(Vec2::new(0.0, -1.0));

        let response = IntentResponse::from_entries(
            1,
            [
                IntentEntry { id: AgentId(1), desired: Vec2::new(1.0, 0.0) },
                IntentEntry { id: AgentId(77), desired: Vec2::new(1.0, 0.0) },
            ],
        );
        let merge = store.apply_intents(&response);

        assert_eq!(merge, IntentMerge { applied: 1, unknown: 1, stale: false });
        assert_eq!(store.get(AgentId(1)).unwrap().intent, Vec2::new(1.0, 0.0));
        // Absent from the response: keeps its previous intent
        assert_eq!(store.get(AgentId(2)).unwrap().intent, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn test_stale_generation_ignored() {
        let mut store = loaded_store();
        let response = IntentResponse::from_entries(
            0,
            [IntentEntry { id: AgentId(1), desired: Vec2::new(1.0, 0.0) }],
        );
        let merge = store.apply_intents(&response);
        assert!(merge.stale);
        assert_eq!(merge.applied, 0);
        assert_eq!(store.get(AgentId(1)).unwrap().intent, Vec2::ZERO);
    }

    #[test]
    fn test_intents_never_expire_without_ttl() {
        let mut store = loaded_store();
        store.get_mut(AgentId(1)).unwrap().set_intent(Vec2::new(1.0, 0.0));
        assert_eq!(store.expire_intents(1000.0, None), 0);
        assert_eq!(store.get(AgentId(1)).unwrap().intent, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_intents_expire_after_ttl() {
        let mut store = loaded_store();
        store.get_mut(AgentId(1)).unwrap().set_intent(Vec2::new(1.0, 0.0));
        assert_eq!(store.expire_intents(0.5, Some(1.0)), 0);
        assert_eq!(store.expire_intents(0.6, Some(1.0)), 1);
        assert_eq!(store.get(AgentId(1)).unwrap().intent, Vec2::ZERO);
    }
}
