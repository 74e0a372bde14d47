use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::BehaviorState;
use crate::actor::Actor;
use crate::context::SimContext;

/// Seconds the actor stays crouched after touching down
pub const LAND_PAUSE: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JumpMode {
    Launch = 0,
    Airborne = 1,
    Grounded = 2,
    Landing = 3,
}

/// Ballistic jump to a point. Without an explicit target the actor's
/// pending jump target (set by path following) is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jump {
    pub target: Option<Vec3>,
    mode: JumpMode,
    end_time: f32,
}

impl Jump {
    pub fn toward(target: Option<Vec3>) -> Self {
        Self {
            target,
            mode: JumpMode::Launch,
            end_time: 0.0,
        }
    }

    pub fn mode(&self) -> JumpMode {
        self.mode
    }
}

impl BehaviorState for Jump {
    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        if self.mode == JumpMode::Launch {
            let Some(target) = self.target.or_else(|| actor.jump_target.take()) else {
                debug!("Actor '{}' has nowhere to jump", actor.name);
                return false;
            };
            self.target = Some(target);
            if actor.has_anim("jump", ctx) {
                actor.set_anim("jump", ctx);
            }
            actor.face(target);
            actor.launch(target, ctx);
            self.mode = JumpMode::Airborne;
            return true;
        }

        if self.mode == JumpMode::Airborne {
            if !actor.movement.on_ground {
                return true;
            }
            self.mode = JumpMode::Grounded;
            self.end_time = ctx.time + LAND_PAUSE;
        }

        match self.mode {
            JumpMode::Grounded => {
                actor.movement.frame_delta = Some(Vec3::ZERO);
                if ctx.time < self.end_time {
                    return true;
                }
                if !actor.has_anim("land", ctx) {
                    return false;
                }
                actor.set_anim("land", ctx);
                self.mode = JumpMode::Landing;
                true
            }
            JumpMode::Landing => {
                actor.movement.frame_delta = Some(Vec3::ZERO);
                !actor.anim.is_done()
            }
            JumpMode::Launch | JumpMode::Airborne => true,
        }
    }

    fn end(&mut self, actor: &mut Actor, _ctx: &mut SimContext<'_>) {
        actor.jump_target = None;
    }

    fn show_info(&self) -> String {
        format!("{:?} toward {:?}", self.mode, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;
    use crate::testing::TestWorld;

    #[test]
    fn test_jump_lands_without_land_anim() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        let target = Vec3::new(120.0, 0.0, 0.0);
        {
            let mut ctx = world.ctx();
            actor.set_behavior(Behavior::jump_to(target), None, &mut ctx);
        }
        world.run(&mut actor, 1);
        assert!(!actor.movement.on_ground);

        world.run(&mut actor, 60);
        assert!(actor.movement.on_ground);
        assert!(!actor.is_behavior_active());
        assert!((actor.origin.x - 120.0).abs() < 20.0);
    }

    #[test]
    fn test_land_animation_extends_jump() {
        let mut world = TestWorld::new();
        world.anims.add("guard", "land", 0.5, Vec3::ZERO);
        let mut actor = world.actor(1, Vec3::ZERO);
        actor.jump_target = Some(Vec3::new(60.0, 0.0, 0.0));
        {
            let mut ctx = world.ctx();
            actor.set_behavior(Behavior::Jump(Jump::toward(None)), None, &mut ctx);
        }
        let mut saw_landing = false;
        for _ in 0..80 {
            world.run(&mut actor, 1);
            match &actor.behavior {
                Some(Behavior::Jump(jump)) if jump.mode() == JumpMode::Landing => saw_landing = true,
                Some(_) => {}
                None => break,
            }
        }
        assert!(saw_landing);
        assert!(!actor.is_behavior_active());
    }

    #[test]
    fn test_grounded_waits_before_finishing() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        {
            let mut ctx = world.ctx();
            actor.set_behavior(Behavior::jump_to(Vec3::new(80.0, 0.0, 0.0)), None, &mut ctx);
        }
        let mut landed_at = None;
        let mut ended_at = None;
        for _ in 0..80 {
            world.run(&mut actor, 1);
            match &actor.behavior {
                Some(Behavior::Jump(jump)) if jump.mode() == JumpMode::Grounded => {
                    landed_at.get_or_insert(world.time);
                    assert!(actor.movement.on_ground);
                }
                Some(_) => {}
                None => {
                    ended_at = Some(world.time);
                    break;
                }
            }
        }
        let landed_at = landed_at.expect("jump never reached the ground");
        let ended_at = ended_at.expect("jump never finished");
        assert!(ended_at - landed_at >= LAND_PAUSE - 0.06);
    }
}
