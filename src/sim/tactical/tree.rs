//! Opposing-force behavior tree
//!
//! The tree is static, so nodes are a closed enum dispatched by `match`.
//! Leaves read the shared tactical picture and write the hostile's desired
//! vector; nothing is retained between evaluations.

use crate::sim::agent::{AgentId, Faction};
use crate::sim::constants::tactical::{APPROACH_THRESHOLD, LETHAL_RADIUS, SCATTER_WEIGHT};
use crate::sim::tactical::buffer::TacticalSnapshot;
use crate::util::vec2::Vec2;

/// Result of evaluating a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Nearest friendly inside the lethal radius
    IsUnderAttack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Flee the nearest friendly with a perpendicular scatter
    ExecuteEvasiveManeuver,
    /// Approach the friendly centroid, then orbit it
    FlankBlueForce,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// First child that does not fail wins
    Selector(Vec<Node>),
    /// Stops at the first child that does not succeed
    Sequence(Vec<Node>),
    Condition(Condition),
    Action(Action),
}

/// A hostile being evaluated
#[derive(Debug, Clone, PartialEq)]
pub struct HostileTrack {
    pub id: AgentId,
    pub position: Vec2,
    pub desired: Vec2,
}

/// Friendly picture shared by every hostile's evaluation
#[derive(Debug, Clone, Default)]
pub struct TacticalState {
    pub friendlies: Vec<Vec2>,
    /// Centroid of `friendlies`, `None` when there are none
    pub friendly_centroid: Option<Vec2>,
}

impl TacticalState {
    pub fn new(friendlies: Vec<Vec2>) -> Self {
        let friendly_centroid = if friendlies.is_empty() {
            None
        } else {
            let sum: Vec2 = friendlies.iter().copied().sum();
            Some(sum / friendlies.len() as f32)
        };
        Self {
            friendlies,
            friendly_centroid,
        }
    }

    /// Split a snapshot into the hostiles to evaluate and the friendly picture.
    /// Neutral slots are ignored.
    pub fn parse(snapshot: &TacticalSnapshot) -> (Vec<HostileTrack>, TacticalState) {
        let mut hostiles = Vec::new();
        let mut friendlies = Vec::new();
        for entry in snapshot.entries() {
            match entry.faction {
                Faction::Hostile => hostiles.push(HostileTrack {
                    id: entry.id,
                    position: entry.position,
                    desired: Vec2::ZERO,
                }),
                Faction::Friendly => friendlies.push(entry.position),
                Faction::Neutral => {}
            }
        }
        (hostiles, TacticalState::new(friendlies))
    }

    /// Nearest friendly position and its squared distance
    pub fn nearest_friendly(&self, position: Vec2) -> Option<(Vec2, f32)> {
        self.friendlies
            .iter()
            .map(|&f| (f, f.distance_sq_to(position)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }
}

impl Node {
    pub fn evaluate(&self, track: &mut HostileTrack, state: &TacticalState) -> Status {
        match self {
            Node::Selector(children) => {
                for child in children {
                    let status = child.evaluate(track, state);
                    if status != Status::Failure {
                        return status;
                    }
                }
                Status::Failure
            }
            Node::Sequence(children) => {
                for child in children {
                    let status = child.evaluate(track, state);
                    if status != Status::Success {
                        return status;
                    }
                }
                Status::Success
            }
            Node::Condition(condition) => condition.check(track, state),
            Node::Action(action) => action.execute(track, state),
        }
    }
}

impl Condition {
    fn check(self, track: &HostileTrack, state: &TacticalState) -> Status {
        match self {
            Condition::IsUnderAttack => match state.nearest_friendly(track.position) {
                Some((_, dist_sq)) if dist_sq < LETHAL_RADIUS * LETHAL_RADIUS => Status::Success,
                _ => Status::Failure,
            },
        }
    }
}

impl Action {
    fn execute(self, track: &mut HostileTrack, state: &TacticalState) -> Status {
        track.desired = match self {
            Action::ExecuteEvasiveManeuver => evasive_vector(track.position, state),
            Action::FlankBlueForce => flank_vector(track.position, state),
        };
        Status::Success
    }
}

fn evasive_vector(position: Vec2, state: &TacticalState) -> Vec2 {
    let Some((threat, _)) = state.nearest_friendly(position) else {
        return Vec2::ZERO;
    };
    let away = (position - threat).normalize();
    // Clockwise perpendicular at half weight scatters the flee direction
    away + Vec2::new(away.y, -away.x) * SCATTER_WEIGHT
}

fn flank_vector(position: Vec2, state: &TacticalState) -> Vec2 {
    let Some(centroid) = state.friendly_centroid else {
        return Vec2::ZERO;
    };
    let to_centroid = centroid - position;
    let dist = to_centroid.length();
    if dist <= 0.0 {
        return Vec2::ZERO;
    }
    if dist > APPROACH_THRESHOLD {
        to_centroid / dist
    } else {
        to_centroid.perpendicular() / dist
    }
}

/// Survive first, otherwise flank the blue force
pub fn opfor_brain() -> Node {
    Node::Selector(vec![
        Node::Sequence(vec![
            Node::Condition(Condition::IsUnderAttack),
            Node::Action(Action::ExecuteEvasiveManeuver),
        ]),
        Node::Action(Action::FlankBlueForce),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn hostile_at(x: f32, y: f32) -> HostileTrack {
        HostileTrack {
            id: AgentId(1),
            position: Vec2::new(x, y),
            desired: Vec2::new(9.0, 9.0),
        }
    }

    #[test]
    fn test_selector_returns_first_non_failure() {
        let state = TacticalState::default();
        let mut track = hostile_at(0.0, 0.0);
        let tree = Node::Selector(vec![
            Node::Condition(Condition::IsUnderAttack),
            Node::Action(Action::FlankBlueForce),
        ]);
        assert_eq!(tree.evaluate(&mut track, &state), Status::Success);
    }

    #[test]
    fn test_selector_all_fail() {
        let state = TacticalState::default();
        let mut track = hostile_at(0.0, 0.0);
        let tree = Node::Selector(vec![Node::Condition(Condition::IsUnderAttack)]);
        assert_eq!(tree.evaluate(&mut track, &state), Status::Failure);
    }

    #[test]
    fn test_sequence_stops_on_failure() {
        let state = TacticalState::default();
        let mut track = hostile_at(0.0, 0.0);
        let tree = Node::Sequence(vec![
            Node::Condition(Condition::IsUnderAttack),
            Node::Action(Action::ExecuteEvasiveManeuver),
        ]);
        assert_eq!(tree.evaluate(&mut track, &state), Status::Failure);
        // The action never ran, so the desired vector is untouched
        assert_eq!(track.desired, Vec2::new(9.0, 9.0));
    }

    #[test]
    fn test_under_attack_radius() {
        let state = TacticalState::new(vec![Vec2::new(19.0, 0.0)]);
        assert_eq!(
            Condition::IsUnderAttack.check(&hostile_at(0.0, 0.0), &state),
            Status::Success
        );
        let state = TacticalState::new(vec![Vec2::new(21.0, 0.0)]);
        assert_eq!(
            Condition::IsUnderAttack.check(&hostile_at(0.0, 0.0), &state),
            Status::Failure
        );
    }

    #[test]
    fn test_brain_evades_when_under_attack() {
        let state = TacticalState::new(vec![Vec2::new(10.0, 0.0), Vec2::new(100.0, 0.0)]);
        let mut track = hostile_at(0.0, 0.0);
        assert_eq!(opfor_brain().evaluate(&mut track, &state), Status::Success);
        // Away from (10,0) is -X; clockwise perpendicular of (-1,0) is (0,1)
        assert!(track.desired.approx_eq(Vec2::new(-1.0, 0.5), EPSILON));
    }

    #[test]
    fn test_brain_approaches_distant_blue_force() {
        let state = TacticalState::new(vec![Vec2::new(100.0, 0.0), Vec2::new(100.0, 20.0)]);
        let mut track = hostile_at(0.0, 10.0);
        opfor_brain().evaluate(&mut track, &state);
        assert!(track.desired.approx_eq(Vec2::new(1.0, 0.0), EPSILON));
    }

    #[test]
    fn test_brain_orbits_close_blue_force() {
        // Centroid of (25,30) and (35,30) is (30,30); hostile sits 30 below it
        let state = TacticalState::new(vec![Vec2::new(25.0, 30.0), Vec2::new(35.0, 30.0)]);
        let mut track = hostile_at(30.0, 0.0);
        opfor_brain().evaluate(&mut track, &state);
        assert!(track.desired.approx_eq(Vec2::new(-1.0, 0.0), EPSILON));
        assert!((track.desired.length() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_no_friendlies_yields_zero_vectors() {
        let state = TacticalState::new(Vec::new());
        assert!(state.friendly_centroid.is_none());

        let mut track = hostile_at(3.0, 4.0);
        assert_eq!(
            Action::ExecuteEvasiveManeuver.execute(&mut track, &state),
            Status::Success
        );
        assert_eq!(track.desired, Vec2::ZERO);

        let mut track = hostile_at(3.0, 4.0);
        assert_eq!(Action::FlankBlueForce.execute(&mut track, &state), Status::Success);
        assert_eq!(track.desired, Vec2::ZERO);
        assert!(track.desired.is_finite());
    }

    #[test]
    fn test_coincident_positions_stay_finite() {
        let state = TacticalState::new(vec![Vec2::new(5.0, 5.0)]);
        let mut track = hostile_at(5.0, 5.0);
        opfor_brain().evaluate(&mut track, &state);
        assert_eq!(track.desired, Vec2::ZERO);
    }

    #[test]
    fn test_parse_ignores_neutrals() {
        let snapshot = TacticalSnapshot::from_raw(
            0,
            vec![
                1.0, 1.0, 0.0, 1.0, 1.0, //
                2.0, 2.0, 0.0, 2.0, 0.0, //
                3.0, 3.0, 0.0, 3.0, 2.0,
            ],
        );
        let (hostiles, state) = TacticalState::parse(&snapshot);
        assert_eq!(hostiles.len(), 1);
        assert_eq!(hostiles[0].id, AgentId(1));
        assert_eq!(state.friendlies, vec![Vec2::new(2.0, 2.0)]);
        assert_eq!(state.friendly_centroid, Some(Vec2::new(2.0, 2.0)));
    }
}
