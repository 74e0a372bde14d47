//! Tunables for actor decision making and movement

use serde::{Deserialize, Serialize};

/// Every AI tunable in one place. Loaded from the `[ai]` table of the
/// settings file; missing keys fall back to these defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    // Range buckets (distances, compared squared)
    pub melee_range: f32,
    pub near_range: f32,
    pub mid_range: f32,

    // Target scoring
    /// Enemies below this health count as weak
    pub weak_health: f32,
    pub weak_weight: f32,
    pub stronger_weight: f32,
    pub visible_weight: f32,
    pub newest_weight: f32,

    /// Candidates closer than this (squared) to the enemy are only used
    /// when nothing better exists
    pub desperate_distance_sq: f32,

    // Steering
    pub seek_damping: f32,
    pub chase_replan_interval: f32,
    /// Re-plan interval right after recovering from a wander
    pub chase_replan_wander_interval: f32,
    pub avoid_interval: f32,
    pub wander_distance: f32,
    /// Consecutive failed moves before a chase starts wandering
    pub chase_stuck_ticks: u32,
    pub jump_interval: f32,

    // Reactions and searches
    pub sound_cooldown: f32,
    pub node_reservation_time: f32,
    pub research_interval: f32,

    // Movement
    pub gravity: f32,
    pub step_height: f32,
    pub turn_speed: f32,
    pub lean_limit_air: f32,
    pub lean_limit_ground: f32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            melee_range: 120.0,
            near_range: 500.0,
            mid_range: 1000.0,
            weak_health: 25.0,
            weak_weight: 0.5,
            stronger_weight: 0.9,
            visible_weight: 0.5,
            newest_weight: 0.75,
            desperate_distance_sq: 64.0 * 64.0,
            seek_damping: 0.4,
            chase_replan_interval: 1.0,
            chase_replan_wander_interval: 2.0,
            avoid_interval: 0.1,
            wander_distance: 128.0,
            chase_stuck_ticks: 2,
            jump_interval: 3.0,
            sound_cooldown: 3.0,
            node_reservation_time: 10.0,
            research_interval: 5.0,
            gravity: 800.0,
            step_height: 18.0,
            turn_speed: 30.0,
            lean_limit_air: 2.0,
            lean_limit_ground: 5.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_table_uses_defaults() {
        let config: AiConfig = serde_json::from_str(r#"{ "melee_range": 96.0 }"#).unwrap();
        assert_eq!(config.melee_range, 96.0);
        assert_eq!(config.near_range, 500.0);
        assert_eq!(config.chase_stuck_ticks, 2);
    }
}
