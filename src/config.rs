use std::str::FromStr;
use std::time::Duration;

use crate::sim::constants::clock::{MAX_DT, TICK_RATE};
use crate::sim::constants::tactical::EVALUATION_INTERVAL_MS;
use crate::sim::scenario::ScenarioProfile;
use crate::sim::systems::flocking::FlockingParams;

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Headless loop frequency in Hz
    pub tick_rate: u32,
    /// Upper bound on a single tick's wall delta (seconds)
    pub max_dt: f32,
    /// Wall-time cadence of tactical worker dispatches
    pub intent_interval: Duration,
    /// Clear intents not refreshed within this many simulation seconds.
    /// `None` keeps stale intents forever.
    pub intent_ttl: Option<Duration>,
    /// Profile loaded at startup
    pub scenario: ScenarioProfile,
    /// Scenario seed; `None` draws from entropy
    pub seed: Option<u64>,
    pub reduced_motion: bool,
    /// Metrics HTTP port, 0 disables the endpoint
    pub metrics_port: u16,
    /// How often the headless driver logs a telemetry summary
    pub telemetry_log_interval: Duration,
    pub flocking: FlockingParams,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            max_dt: MAX_DT,
            intent_interval: Duration::from_millis(EVALUATION_INTERVAL_MS),
            intent_ttl: None,
            scenario: ScenarioProfile::Theater,
            seed: None,
            reduced_motion: false,
            metrics_port: 9090,
            telemetry_log_interval: Duration::from_secs(5),
            flocking: FlockingParams::default(),
        }
    }
}

/// Parse `name` from the environment, warning and returning `None` when it
/// is set but invalid
fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", name, raw);
            None
        }
    }
}

fn env_weight(name: &str, target: &mut f32) {
    if let Some(weight) = env_parse::<f32>(name) {
        if weight.is_finite() && weight >= 0.0 {
            *target = weight;
        } else {
            tracing::warn!("{} must be a non-negative number, using default", name);
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl SimConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Some(rate) = env_parse::<u32>("TICK_RATE") {
            if (1..=1000).contains(&rate) {
                config.tick_rate = rate;
            } else {
                tracing::warn!("TICK_RATE must be 1-1000, using default");
            }
        }

        if let Some(max_dt) = env_parse::<f32>("MAX_DT_SECS") {
            if max_dt.is_finite() && max_dt > 0.0 && max_dt <= 1.0 {
                config.max_dt = max_dt;
            } else {
                tracing::warn!("MAX_DT_SECS must be in (0, 1], using default");
            }
        }

        if let Some(ms) = env_parse::<u64>("INTENT_INTERVAL_MS") {
            if ms > 0 {
                config.intent_interval = Duration::from_millis(ms);
            } else {
                tracing::warn!("INTENT_INTERVAL_MS must be > 0, using default");
            }
        }

        if let Some(ms) = env_parse::<u64>("INTENT_TTL_MS") {
            if ms > 0 {
                config.intent_ttl = Some(Duration::from_millis(ms));
            } else {
                tracing::warn!("INTENT_TTL_MS must be > 0, intents will not expire");
            }
        }

        if let Ok(name) = std::env::var("SCENARIO") {
            match name.parse::<ScenarioProfile>() {
                Ok(profile) => config.scenario = profile,
                Err(e) => tracing::warn!("{}, using default", e),
            }
        }

        config.seed = env_parse::<u64>("SCENARIO_SEED");

        if let Ok(raw) = std::env::var("REDUCED_MOTION") {
            match parse_bool(&raw) {
                Some(value) => config.reduced_motion = value,
                None => tracing::warn!("Invalid REDUCED_MOTION '{}', using default", raw),
            }
        }

        if let Some(port) = env_parse::<u16>("METRICS_PORT") {
            config.metrics_port = port;
        }

        if let Some(secs) = env_parse::<u64>("TELEMETRY_LOG_INTERVAL_SECS") {
            if secs > 0 {
                config.telemetry_log_interval = Duration::from_secs(secs);
            } else {
                tracing::warn!("TELEMETRY_LOG_INTERVAL_SECS must be > 0, using default");
            }
        }

        env_weight("FLOCK_ALIGNMENT_WEIGHT", &mut config.flocking.alignment_weight);
        env_weight("FLOCK_COHESION_WEIGHT", &mut config.flocking.cohesion_weight);
        env_weight("FLOCK_SEPARATION_WEIGHT", &mut config.flocking.separation_weight);
        env_weight("FLOCK_HUNT_WEIGHT", &mut config.flocking.hunt_weight);
        env_weight("FLOCK_INTENT_WEIGHT", &mut config.flocking.intent_weight);

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_rate == 0 {
            return Err("tick_rate must be at least 1".to_string());
        }
        if !(self.max_dt.is_finite() && self.max_dt > 0.0) {
            return Err("max_dt must be positive".to_string());
        }
        if self.intent_interval.is_zero() {
            return Err("intent_interval cannot be zero".to_string());
        }
        let flocking = &self.flocking;
        if !(flocking.max_speed > 0.0 && flocking.max_force > 0.0) {
            return Err("max_speed and max_force must be positive".to_string());
        }
        if !(flocking.cell_size.is_finite() && flocking.cell_size > 0.0) {
            return Err("cell_size must be positive".to_string());
        }
        if flocking.neighbor_count == 0 {
            return Err("neighbor_count must be at least 1".to_string());
        }
        if flocking.noise_min > flocking.noise_max {
            return Err("noise_min cannot exceed noise_max".to_string());
        }
        Ok(())
    }

    /// Wall-time period of the headless loop
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}
