//! Simulation clock
//!
//! Actors are advanced on a fixed tick. The clock accumulates real frame time
//! and hands out whole ticks; level time only moves forward in tick-sized
//! steps so every timer in the AI layer is deterministic.

use serde::{Deserialize, Serialize};

/// Configuration for the simulation clock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeConfig {
    /// How many simulated seconds pass per real second
    pub time_scale: f32,
    /// Length of one simulation tick (in seconds)
    pub fixed_timestep: f32,
    /// Maximum delta time accepted per frame to prevent a spiral of death
    pub max_delta_time: f32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            fixed_timestep: 0.05,
            max_delta_time: 0.25,
        }
    }
}

/// Errors raised when configuring the clock
#[derive(Debug, Clone, thiserror::Error)]
pub enum TimeError {
    #[error("Fixed timestep must be positive, got {0}")]
    InvalidTimestep(f32),

    #[error("Time scale must not be negative, got {0}")]
    InvalidScale(f32),
}

/// Fixed-tick simulation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimTime {
    /// Configuration
    pub config: TimeConfig,
    /// Level time in seconds (advances by whole ticks)
    pub level_time: f32,
    /// Number of ticks simulated so far
    pub tick_count: u64,
    /// Whether the simulation is paused
    pub paused: bool,
    /// Accumulated real time not yet consumed by ticks
    #[serde(skip)]
    accumulator: f32,
}

impl Default for SimTime {
    fn default() -> Self {
        Self {
            config: TimeConfig::default(),
            level_time: 0.0,
            tick_count: 0,
            paused: false,
            accumulator: 0.0,
        }
    }
}

impl SimTime {
    /// Create a clock with a validated config
    pub fn new(config: TimeConfig) -> Result<Self, TimeError> {
        if config.fixed_timestep <= 0.0 {
            return Err(TimeError::InvalidTimestep(config.fixed_timestep));
        }
        if config.time_scale < 0.0 {
            return Err(TimeError::InvalidScale(config.time_scale));
        }
        Ok(Self {
            config,
            ..Default::default()
        })
    }

    /// Length of one tick in seconds
    pub fn frame_time(&self) -> f32 {
        self.config.fixed_timestep
    }

    /// Feed real elapsed time and return how many ticks are due
    pub fn accumulate(&mut self, raw_delta: f32) -> u32 {
        if self.paused {
            return 0;
        }
        let delta = raw_delta.clamp(0.0, self.config.max_delta_time) * self.config.time_scale;
        self.accumulator += delta;

        let mut steps = 0;
        while self.accumulator >= self.config.fixed_timestep {
            self.accumulator -= self.config.fixed_timestep;
            steps += 1;
        }
        steps
    }

    /// Advance level time by exactly one tick
    pub fn step(&mut self) {
        self.tick_count += 1;
        self.level_time = self.tick_count as f32 * self.config.fixed_timestep;
    }

    /// Pause the simulation
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume the simulation
    pub fn resume(&mut self) {
        self.paused = false;
    }
}
