/// Flocking constants - the reference steering model
pub mod flocking {
    /// Maximum agent speed (world units per second)
    pub const MAX_SPEED: f32 = 3.0;
    /// Maximum steering force applied to velocity per tick
    pub const MAX_FORCE: f32 = 0.15;
    /// Spatial hash cell size; also the hunt radius
    pub const CELL_SIZE: f32 = 5.0;
    /// Topological neighbor count for alignment/cohesion
    pub const NEIGHBOR_COUNT: usize = 7;
    /// Separation radius as a fraction of the cell size
    pub const SEPARATION_RADIUS_FACTOR: f32 = 0.4;
    pub const ALIGNMENT_WEIGHT: f32 = 0.8;
    pub const COHESION_WEIGHT: f32 = 0.5;
    pub const SEPARATION_WEIGHT: f32 = 1.8;
    pub const HUNT_WEIGHT: f32 = 1.2;
    /// Roughly double the strongest flocking term
    pub const INTENT_WEIGHT: f32 = 2.0;
    /// Multiplicative sensory noise on neighbor velocities
    pub const NOISE_MIN: f32 = 0.8;
    pub const NOISE_MAX: f32 = 1.2;
    /// Squared distance below which a neighbor is treated as self
    pub const SELF_EPSILON_SQ: f32 = 1e-8;
    /// Offset from `atan2(vy, vx)` to the mesh forward axis (triangle tip points -Y)
    pub const HEADING_OFFSET: f32 = std::f32::consts::FRAC_PI_2;
}

/// Map boundary constants
pub mod boundary {
    /// Symmetric coordinate limit on both axes
    pub const MAP_LIMIT: f32 = 45.0;
    /// Constant inward force per axis once outside the limit. Larger than
    /// the weighted sum of all other terms at full strength (6.3 * 2 * MAX_SPEED).
    pub const CORRECTIVE_FORCE: f32 = 40.0;
}

/// Tactical intent layer constants
pub mod tactical {
    /// Nearest friendly within this distance means "under attack"
    pub const LETHAL_RADIUS: f32 = 20.0;
    /// Farther than this from the friendly centroid: approach; closer: orbit
    pub const APPROACH_THRESHOLD: f32 = 50.0;
    /// Weight of the perpendicular scatter component when evading
    pub const SCATTER_WEIGHT: f32 = 0.5;
    /// Wall-time cadence of worker dispatches in milliseconds
    pub const EVALUATION_INTERVAL_MS: u64 = 500;
    /// Outbound stride: x, y, z, id, allegiance
    pub const SNAPSHOT_STRIDE: usize = 5;
    /// Inbound stride: id, vx, vy, vz
    pub const RESPONSE_STRIDE: usize = 4;
    /// Allegiance codes in the snapshot buffer
    pub const ALLEGIANCE_FRIENDLY: f64 = 0.0;
    pub const ALLEGIANCE_HOSTILE: f64 = 1.0;
    pub const ALLEGIANCE_NEUTRAL: f64 = 2.0;
}

/// Telemetry constants
pub mod telemetry {
    /// Average centroid distance at which cohesion saturates to zero
    pub const COHESION_RADIUS: f64 = 20.0;
}

/// Simulation clock constants
pub mod clock {
    /// Upper bound on a single tick's wall delta (seconds)
    pub const MAX_DT: f32 = 0.1;
    /// Motion multiplier while the view is hidden
    pub const HIDDEN_SCALE: f32 = 0.25;
    /// Motion multiplier with reduced-motion preference
    pub const REDUCED_MOTION_SCALE: f32 = 0.45;
    /// Floor on motion used for non-swarm facing animation
    pub const MIN_SPIN_MOTION: f32 = 0.08;
    /// Default headless tick rate in Hz
    pub const TICK_RATE: u32 = 60;
}

/// Threat countdown constants
pub mod alerts {
    /// High-threat hostiles alert once when time-to-event drops below this (seconds)
    pub const THRESHOLD_SECS: f32 = 60.0;
}

/// Non-swarm drift constants
pub mod drift {
    pub const MOVING_AMPLITUDE: f32 = 0.3;
    pub const STATIC_AMPLITUDE: f32 = 0.05;
    pub const AMPLITUDE_SCALE: f32 = 3.0;
    pub const FREQUENCY_X: f32 = 0.3;
    pub const FREQUENCY_Y: f32 = 0.25;
    pub const SPIN_RATE: f32 = 0.8;
}

/// Scenario generation constants
pub mod scenario {
    /// Swarm members in the theater profile
    pub const SWARM_COUNT: usize = 1500;
    /// First swarm callsign number (SW-1000)
    pub const SWARM_CALLSIGN_BASE: usize = 1000;
    /// Swarm members spawn uniformly in angle and radius within this disc
    pub const SPAWN_RADIUS: f32 = 40.0;
    /// Upper bound on reported track speed
    pub const MAX_REPORTED_SPEED: f32 = 120.0;
    /// Faction split: roll above FRIENDLY_ROLL is friendly, above HOSTILE_ROLL hostile
    pub const FRIENDLY_ROLL: f64 = 0.6;
    pub const HOSTILE_ROLL: f64 = 0.3;
}
