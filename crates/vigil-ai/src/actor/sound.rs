use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::Actor;
use crate::context::SimContext;

/// Kinds of noise an actor can react to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stimulus {
    Weapon,
    Movement,
    Pain,
    Death,
    Breaking,
    Door,
    Voice,
    Machine,
    Radio,
}

impl Stimulus {
    pub fn action_name(self) -> &'static str {
        match self {
            Stimulus::Weapon => "heard_weapon",
            Stimulus::Movement => "heard_movement",
            Stimulus::Pain => "heard_pain",
            Stimulus::Death => "heard_death",
            Stimulus::Breaking => "heard_breaking",
            Stimulus::Door => "heard_door",
            Stimulus::Voice => "heard_voice",
            Stimulus::Machine => "heard_machine",
            Stimulus::Radio => "heard_radio",
        }
    }
}

impl Actor {
    /// React to a noise at `position`. Ignored while fighting, dead, or
    /// within the cooldown of the last reaction.
    pub fn hear(&mut self, stimulus: Stimulus, position: Vec3, ctx: &mut SimContext<'_>) -> bool {
        if self.dead || self.current_enemy.is_some() || ctx.time < self.next_sound_time {
            return false;
        }
        self.noise_position = Some(position);
        self.next_sound_time = ctx.time + ctx.config.sound_cooldown;
        self.do_action(stimulus.action_name(), false, ctx)
    }
}
