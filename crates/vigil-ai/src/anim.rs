//! Animation lookup
//!
//! Animations drive movement: a cycle's net displacement over its duration
//! is the speed an actor moves at while it plays.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Timing and displacement of one animation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimInfo {
    pub index: u32,
    /// Cycle length in seconds
    pub duration: f32,
    /// Net displacement of one cycle
    pub delta: Vec3,
}

impl AnimInfo {
    /// Movement speed implied by the cycle
    pub fn speed(&self) -> f32 {
        if self.duration > 0.0 {
            self.delta.length() / self.duration
        } else {
            0.0
        }
    }
}

/// Animation catalogue collaborator
pub trait AnimationSet {
    /// Look up animation `name` of `model`
    fn find(&self, model: &str, name: &str) -> Option<AnimInfo>;
}

/// Animation catalogue backed by plain tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnimationTable {
    models: BTreeMap<String, BTreeMap<String, AnimInfo>>,
}

impl AnimationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an animation, assigning it the next index of its model
    pub fn add(&mut self, model: &str, name: &str, duration: f32, delta: Vec3) {
        let anims = self.models.entry(model.to_string()).or_default();
        let index = anims.len() as u32;
        anims.insert(name.to_string(), AnimInfo { index, duration, delta });
    }

    /// A humanoid set: idle, walk, run, fire, melee and friends
    pub fn humanoid(model: &str) -> Self {
        let mut table = Self::new();
        table.add(model, "idle", 1.0, Vec3::ZERO);
        table.add(model, "walk", 1.0, Vec3::new(64.0, 0.0, 0.0));
        table.add(model, "run", 1.0, Vec3::new(200.0, 0.0, 0.0));
        table.add(model, "strafe_left", 0.5, Vec3::new(0.0, 48.0, 0.0));
        table.add(model, "strafe_right", 0.5, Vec3::new(0.0, -48.0, 0.0));
        table.add(model, "swim", 1.0, Vec3::new(96.0, 0.0, 0.0));
        table.add(model, "fly", 1.0, Vec3::new(160.0, 0.0, 0.0));
        table.add(model, "aim", 0.5, Vec3::ZERO);
        table.add(model, "fire", 0.25, Vec3::ZERO);
        table.add(model, "melee", 0.5, Vec3::ZERO);
        table.add(model, "jump", 0.5, Vec3::ZERO);
        table.add(model, "pain", 0.3, Vec3::ZERO);
        table
    }
}

impl AnimationSet for AnimationTable {
    fn find(&self, model: &str, name: &str) -> Option<AnimInfo> {
        self.models.get(model)?.get(name).copied()
    }
}

/// Animation an actor is currently playing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimState {
    pub name: String,
    pub info: Option<AnimInfo>,
    /// Level time the current cycle started
    pub started: f32,
    /// Completed cycles since the animation was set
    pub cycles: u32,
    /// Action dispatched when the first cycle completes
    pub on_done: Option<String>,
}

impl AnimState {
    pub fn is_done(&self) -> bool {
        self.cycles > 0
    }

    pub fn speed(&self) -> f32 {
        self.info.map_or(0.0, |info| info.speed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_speed() {
        let table = AnimationTable::humanoid("guard");
        let run = table.find("guard", "run").unwrap();
        assert_eq!(run.speed(), 200.0);
        assert_eq!(table.find("guard", "idle").unwrap().speed(), 0.0);
        assert!(table.find("guard", "dance").is_none());
        assert!(table.find("dog", "run").is_none());
    }
}
