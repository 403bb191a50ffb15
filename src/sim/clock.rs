//! Simulation clock
//!
//! Turns wall-clock frame deltas into a bounded, motion-scaled simulation dt.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sim::constants::clock::{HIDDEN_SCALE, MAX_DT, REDUCED_MOTION_SCALE};

/// Viewer-side motion preferences
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotionState {
    /// The view is backgrounded
    pub hidden: bool,
    /// Reduced-motion accessibility preference
    pub reduced_motion: bool,
    /// Direct multiplier, replaces the derived scale when set
    pub override_scale: Option<f32>,
}

impl MotionState {
    pub fn new(hidden: bool, reduced_motion: bool) -> Self {
        Self {
            hidden,
            reduced_motion,
            override_scale: None,
        }
    }

    /// Fixed multiplier regardless of visibility
    pub fn scaled(scale: f32) -> Self {
        Self {
            override_scale: Some(scale),
            ..Self::default()
        }
    }

    /// Effective dt multiplier, never negative
    pub fn effective(&self) -> f32 {
        let scale = match self.override_scale {
            Some(scale) => scale,
            None => {
                let hidden = if self.hidden { HIDDEN_SCALE } else { 1.0 };
                let reduced = if self.reduced_motion { REDUCED_MOTION_SCALE } else { 1.0 };
                hidden * reduced
            }
        };
        if scale.is_finite() {
            scale.max(0.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimClock {
    max_dt: f32,
    motion: MotionState,
    paused: bool,
    /// Accumulated simulation seconds
    sim_time: f64,
    tick: u64,
}

impl SimClock {
    pub fn new(max_dt: f32) -> Self {
        Self {
            max_dt,
            motion: MotionState::default(),
            paused: false,
            sim_time: 0.0,
            tick: 0,
        }
    }

    /// Consume one frame's wall delta and return the simulation dt for this tick.
    /// Zero while paused.
    pub fn advance(&mut self, wall: Duration) -> f32 {
        self.tick += 1;

        let dt = if self.paused {
            0.0
        } else {
            (wall.as_secs_f32()).min(self.max_dt) * self.motion.effective()
        };
        self.sim_time += dt as f64;
        dt
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_motion(&mut self, motion: MotionState) {
        self.motion = motion;
    }

    #[inline]
    pub fn motion(&self) -> MotionState {
        self.motion
    }

    /// Start over at t = 0, keeping motion and pause settings
    pub fn reset(&mut self) {
        self.sim_time = 0.0;
        self.tick = 0;
    }

    #[inline]
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(MAX_DT)
    }
}
