//! Flocking engine
//!
//! Every swarm member steers from the start-of-tick state of its neighbors:
//! a pre-tick [`Body`] list is captured, new kinematics are computed in
//! parallel against it, then written back in one sequential pass.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::sim::agent::Faction;
use crate::sim::constants::boundary::{CORRECTIVE_FORCE, MAP_LIMIT};
use crate::sim::constants::flocking::*;
use crate::sim::spatial::SpatialHashGrid;
use crate::sim::store::EntityStore;
use crate::util::vec2::Vec2;

/// Tunable steering model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlockingParams {
    pub max_speed: f32,
    pub max_force: f32,
    pub cell_size: f32,
    /// Topological neighbor count for alignment and cohesion
    pub neighbor_count: usize,
    pub alignment_weight: f32,
    pub cohesion_weight: f32,
    pub separation_weight: f32,
    pub hunt_weight: f32,
    pub intent_weight: f32,
    pub noise_min: f32,
    pub noise_max: f32,
    pub map_limit: f32,
    pub boundary_force: f32,
    pub heading_offset: f32,
}

impl Default for FlockingParams {
    fn default() -> Self {
        Self {
            max_speed: MAX_SPEED,
            max_force: MAX_FORCE,
            cell_size: CELL_SIZE,
            neighbor_count: NEIGHBOR_COUNT,
            alignment_weight: ALIGNMENT_WEIGHT,
            cohesion_weight: COHESION_WEIGHT,
            separation_weight: SEPARATION_WEIGHT,
            hunt_weight: HUNT_WEIGHT,
            intent_weight: INTENT_WEIGHT,
            noise_min: NOISE_MIN,
            noise_max: NOISE_MAX,
            map_limit: MAP_LIMIT,
            boundary_force: CORRECTIVE_FORCE,
            heading_offset: HEADING_OFFSET,
        }
    }
}

impl FlockingParams {
    /// Metric radius of the separation neighborhood
    #[inline]
    pub fn separation_radius(&self) -> f32 {
        self.cell_size * SEPARATION_RADIUS_FACTOR
    }

    /// Velocity change toward `desired` at full speed. No direction, no steer.
    #[inline]
    fn steer_to(&self, desired: Vec2, velocity: Vec2) -> Vec2 {
        if desired.length_sq() <= SELF_EPSILON_SQ {
            Vec2::ZERO
        } else {
            desired.with_length(self.max_speed) - velocity
        }
    }
}

/// Start-of-tick copy of one swarm member
#[derive(Debug, Clone, Copy)]
pub struct Body {
    /// Index into the entity store
    pub slot: usize,
    pub position: Vec2,
    pub velocity: Vec2,
    pub faction: Faction,
    pub intent: Vec2,
}

/// Unweighted steering terms for one agent
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringTerms {
    pub alignment: Vec2,
    pub cohesion: Vec2,
    pub separation: Vec2,
    pub hunt: Vec2,
    pub boundary: Vec2,
    pub intent: Vec2,
}

impl SteeringTerms {
    /// Weighted sum plus the boundary push, clamped to `max_force`
    pub fn combine(&self, params: &FlockingParams) -> Vec2 {
        let force = self.alignment * params.alignment_weight
            + self.cohesion * params.cohesion_weight
            + self.separation * params.separation_weight
            + self.hunt * params.hunt_weight
            + self.intent * params.intent_weight
            + self.boundary;

        force.clamp_length(params.max_force)
    }
}

/// Compute the steering terms for `bodies[i]`
pub fn steering_terms<R: Rng>(
    i: usize,
    bodies: &[Body],
    grid: &SpatialHashGrid,
    params: &FlockingParams,
    rng: &mut R,
) -> SteeringTerms {
    let me = bodies[i];
    let separation_radius_sq = params.separation_radius() * params.separation_radius();
    let hunt_radius_sq = params.cell_size * params.cell_size;

    let mut flockmates: SmallVec<[(f32, usize); 32]> = SmallVec::new();
    let mut separation_sum = Vec2::ZERO;
    let mut separation_count = 0usize;
    let mut prey_sum = Vec2::ZERO;
    let mut prey_count = 0usize;

    for j in grid.neighbors_of(i, me.position) {
        let other = &bodies[j];
        let offset = me.position - other.position;
        let dist_sq = offset.length_sq();
        if dist_sq <= SELF_EPSILON_SQ {
            continue;
        }

        if other.faction == me.faction {
            flockmates.push((dist_sq, j));
        }

        // Metric neighborhood, any faction
        if dist_sq < separation_radius_sq {
            separation_sum += offset / dist_sq;
            separation_count += 1;
        }

        if me.faction.opposes(other.faction) && dist_sq <= hunt_radius_sq {
            prey_sum += other.position;
            prey_count += 1;
        }
    }

    flockmates.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
    flockmates.truncate(params.neighbor_count);

    let mut terms = SteeringTerms::default();

    if !flockmates.is_empty() {
        let n = flockmates.len() as f32;
        let mut heading_sum = Vec2::ZERO;
        let mut center_sum = Vec2::ZERO;
        for &(_, j) in &flockmates {
            let noise = rng.gen_range(params.noise_min..=params.noise_max);
            heading_sum += bodies[j].velocity * noise;
            center_sum += bodies[j].position;
        }
        terms.alignment = params.steer_to(heading_sum / n, me.velocity);
        terms.cohesion = params.steer_to(center_sum / n - me.position, me.velocity);
    }

    if separation_count > 0 {
        terms.separation = params.steer_to(separation_sum / separation_count as f32, me.velocity);
    }

    if prey_count > 0 {
        terms.hunt = params.steer_to(prey_sum / prey_count as f32 - me.position, me.velocity);
    }

    terms.boundary = boundary_force(me.position, params);
    terms.intent = params.steer_to(me.intent, me.velocity);
    terms
}

/// Constant inward push on each axis beyond the map limit
pub fn boundary_force(position: Vec2, params: &FlockingParams) -> Vec2 {
    let axis = |v: f32| {
        if v > params.map_limit {
            -params.boundary_force
        } else if v < -params.map_limit {
            params.boundary_force
        } else {
            0.0
        }
    };
    Vec2::new(axis(position.x), axis(position.y))
}

/// Summary of one flocking pass
#[derive(Debug, Clone, Copy, Default)]
pub struct FlockingReport {
    pub agents: usize,
    /// Largest steering force applied this pass
    pub peak_force: f32,
}

struct Integrated {
    slot: usize,
    position: Vec2,
    velocity: Vec2,
    heading: Option<f32>,
    force: f32,
}

/// Advance every swarm member by `dt` seconds
pub fn update(
    store: &mut EntityStore,
    grid: &mut SpatialHashGrid,
    params: &FlockingParams,
    dt: f32,
) -> FlockingReport {
    let bodies: Vec<Body> = store
        .agents()
        .iter()
        .enumerate()
        .filter(|(_, a)| a.swarm_member)
        .map(|(slot, a)| Body {
            slot,
            position: a.position,
            velocity: a.velocity,
            faction: a.faction,
            intent: a.intent,
        })
        .collect();

    if grid.cell_size() != params.cell_size {
        *grid = SpatialHashGrid::new(params.cell_size);
    }
    grid.rebuild(bodies.iter().enumerate().map(|(i, b)| (i, b.position)));

    let grid: &SpatialHashGrid = grid;
    let results: Vec<Integrated> = (0..bodies.len())
        .into_par_iter()
        .map(|i| {
            let mut rng = rand::thread_rng();
            let body = &bodies[i];
            let force = steering_terms(i, &bodies, grid, params, &mut rng).combine(params);

            let mut velocity = (body.velocity + force).clamp_length(params.max_speed);
            if !velocity.is_finite() {
                velocity = Vec2::ZERO;
            }
            Integrated {
                slot: body.slot,
                position: body.position + velocity * dt,
                velocity,
                heading: (!velocity.is_zero()).then(|| velocity.angle() + params.heading_offset),
                force: force.length(),
            }
        })
        .collect();

    let mut report = FlockingReport {
        agents: results.len(),
        peak_force: 0.0,
    };
    let agents = store.agents_mut();
    for result in results {
        let agent = &mut agents[result.slot];
        agent.position = result.position;
        agent.velocity = result.velocity;
        if let Some(heading) = result.heading {
            agent.heading = heading;
        }
        report.peak_force = report.peak_force.max(result.force);
    }
    report
}
