//! Behaviors that keep the actor in place

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::BehaviorState;
use crate::actor::Actor;
use crate::context::SimContext;
use crate::steering::{Steering, Turn, TurnGoal};

/// Cancel this tick's displacement
fn hold_position(actor: &mut Actor) {
    actor.movement.frame_delta = Some(Vec3::ZERO);
}

/// Stand still indefinitely
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Idle {
    /// Level time the actor started idling
    pub since: f32,
}

impl BehaviorState for Idle {
    fn begin(&mut self, _actor: &mut Actor, ctx: &mut SimContext<'_>) {
        self.since = ctx.time;
    }

    fn evaluate(&mut self, actor: &mut Actor, _ctx: &mut SimContext<'_>) -> bool {
        hold_position(actor);
        true
    }

    fn show_info(&self) -> String {
        format!("idle since {:.2}", self.since)
    }
}

/// Rotate in place to a goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnTo {
    turn: Turn,
}

impl TurnTo {
    pub fn new(goal: TurnGoal) -> Self {
        Self { turn: Turn::new(goal) }
    }

    pub fn set_tolerance(&mut self, degrees: f32) {
        self.turn.tolerance = degrees.max(0.0);
    }
}

impl BehaviorState for TurnTo {
    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        hold_position(actor);
        if !self.turn.evaluate(actor, ctx) {
            return false;
        }
        actor.accelerate(self.turn.force, ctx);
        true
    }

    fn show_info(&self) -> String {
        self.turn.show_info()
    }
}

/// Play one cycle of an animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayAnim {
    pub anim: String,
    started: bool,
}

impl PlayAnim {
    pub fn new(anim: impl Into<String>) -> Self {
        Self {
            anim: anim.into(),
            started: false,
        }
    }

    fn finished(&self, actor: &Actor) -> bool {
        !self.started || actor.anim.name != self.anim || actor.anim.is_done()
    }
}

impl BehaviorState for PlayAnim {
    fn begin(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        self.started = actor.set_anim(&self.anim, ctx);
    }

    fn evaluate(&mut self, actor: &mut Actor, _ctx: &mut SimContext<'_>) -> bool {
        hold_position(actor);
        !self.finished(actor)
    }

    fn show_info(&self) -> String {
        format!("playing '{}'", self.anim)
    }
}

/// Play an animation while turning to keep the enemy in front
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayAnimSeekEnemy {
    play: PlayAnim,
}

impl PlayAnimSeekEnemy {
    pub fn new(anim: impl Into<String>) -> Self {
        Self {
            play: PlayAnim::new(anim),
        }
    }
}

impl BehaviorState for PlayAnimSeekEnemy {
    fn begin(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        self.play.begin(actor, ctx);
        if actor.enemy().is_none() {
            warn!("Actor '{}' plays '{}' with no enemy to seek", actor.name, self.play.anim);
        }
    }

    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        if !self.play.evaluate(actor, ctx) {
            return false;
        }
        if let Some(enemy) = actor.live_enemy(ctx) {
            let mut turn = Turn::new(TurnGoal::Point(enemy.origin));
            if turn.evaluate(actor, ctx) {
                actor.accelerate(turn.force, ctx);
            }
        }
        true
    }

    fn show_info(&self) -> String {
        format!("{} at enemy", self.play.show_info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;
    use crate::testing::TestWorld;

    #[test]
    fn test_play_anim_finishes_after_one_cycle() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        {
            let mut ctx = world.ctx();
            actor.set_behavior(Behavior::PlayAnim(PlayAnim::new("pain")), None, &mut ctx);
        }
        world.run(&mut actor, 3);
        assert!(actor.is_behavior_active());
        world.run(&mut actor, 5);
        assert!(!actor.is_behavior_active());
    }

    #[test]
    fn test_missing_anim_completes_immediately() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        {
            let mut ctx = world.ctx();
            actor.set_behavior(Behavior::PlayAnim(PlayAnim::new("dance")), None, &mut ctx);
        }
        world.run(&mut actor, 1);
        assert!(!actor.is_behavior_active());
    }

    #[test]
    fn test_idle_holds_position() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        {
            let mut ctx = world.ctx();
            actor.set_anim("run", &ctx);
            actor.set_behavior(Behavior::idle(), None, &mut ctx);
        }
        world.run(&mut actor, 5);
        assert_eq!(actor.origin, Vec3::ZERO);
    }
}
