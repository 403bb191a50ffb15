//! Threat countdowns and one-shot alerts

use serde::Serialize;
use tracing::debug;

use crate::sim::agent::{AgentId, ThreatLevel};
use crate::sim::constants::alerts::THRESHOLD_SECS;
use crate::sim::store::EntityStore;

/// Emitted once per agent when a high-threat hostile's countdown drops below
/// the alert threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreatAlert {
    pub id: AgentId,
    pub callsign: String,
    pub time_to_event: f32,
}

/// Tick every countdown down by `dt`, floored at zero, and collect new alerts
pub fn update(store: &mut EntityStore, dt: f32) -> Vec<ThreatAlert> {
    let mut alerts = Vec::new();

    for agent in store.agents_mut() {
        let hostile = agent.is_hostile();
        let Some(threat) = agent.threat.as_mut() else {
            continue;
        };
        threat.time_to_event = (threat.time_to_event - dt).max(0.0);

        if hostile
            && threat.level == ThreatLevel::High
            && !threat.alerted
            && threat.time_to_event < THRESHOLD_SECS
        {
            threat.alerted = true;
            debug!(
                "Threat alert: {} {} event in {:.1}s",
                agent.id, agent.callsign, threat.time_to_event
            );
            alerts.push(ThreatAlert {
                id: agent.id,
                callsign: agent.callsign.clone(),
                time_to_event: threat.time_to_event,
            });
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::agent::{Agent, Faction, ThreatCountdown};
    use crate::util::vec2::Vec2;

    fn store_with(agents: Vec<Agent>) -> EntityStore {
        let mut store = EntityStore::new();
        store.load(agents).unwrap();
        store
    }

    fn threatened(id: u32, faction: Faction, level: ThreatLevel, eta: f32) -> Agent {
        Agent::new(AgentId(id), format!("TK-{}", id), faction, Vec2::ZERO)
            .with_threat(ThreatCountdown::new(level, eta))
    }

    #[test]
    fn test_alert_fires_once_on_crossing() {
        let mut store = store_with(vec![threatened(1, Faction::Hostile, ThreatLevel::High, 61.0)]);

        assert!(update(&mut store, 0.5).is_empty());
        let alerts = update(&mut store, 0.6);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, AgentId(1));
        assert_eq!(alerts[0].callsign, "TK-1");
        assert!(alerts[0].time_to_event < 60.0);

        for _ in 0..100 {
            assert!(update(&mut store, 1.0).is_empty());
        }
    }

    #[test]
    fn test_only_high_threat_hostiles_alert() {
        let mut store = store_with(vec![
            threatened(1, Faction::Hostile, ThreatLevel::Medium, 30.0),
            threatened(2, Faction::Friendly, ThreatLevel::High, 30.0),
            threatened(3, Faction::Hostile, ThreatLevel::High, 30.0),
        ]);
        let alerts = update(&mut store, 0.1);
        assert_eq!(alerts.iter().map(|a| a.id).collect::<Vec<_>>(), vec![AgentId(3)]);
    }

    #[test]
    fn test_countdown_floors_at_zero() {
        let mut store = store_with(vec![threatened(1, Faction::Hostile, ThreatLevel::Low, 1.0)]);
        update(&mut store, 5.0);
        let threat = store.get(AgentId(1)).unwrap().threat.as_ref().unwrap();
        assert_eq!(threat.time_to_event, 0.0);
    }

    #[test]
    fn test_zero_dt_leaves_countdown() {
        let mut store = store_with(vec![threatened(1, Faction::Hostile, ThreatLevel::High, 90.0)]);
        assert!(update(&mut store, 0.0).is_empty());
        assert_eq!(store.get(AgentId(1)).unwrap().threat.as_ref().unwrap().time_to_event, 90.0);
    }
}
