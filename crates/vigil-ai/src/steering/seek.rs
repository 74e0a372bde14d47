use glam::Vec3;
use serde::{Deserialize, Serialize};
use vigil_core::angles::{angle_delta, horizontal_length_sq, vec_to_angles};

use super::Steering;
use crate::actor::Actor;
use crate::context::SimContext;

/// Head straight for a point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Seek {
    pub target: Vec3,
    /// Velocity of a moving target, used to lead it
    pub target_velocity: Vec3,
    pub force: Vec3,
}

impl Seek {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            ..Default::default()
        }
    }

    pub fn set_target(&mut self, target: Vec3, velocity: Vec3) {
        self.target = target;
        self.target_velocity = velocity;
    }
}

impl Steering for Seek {
    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        self.force = Vec3::ZERO;
        let speed = actor.movement.speed;
        let mut delta = self.target - actor.origin;
        if self.target_velocity != Vec3::ZERO && speed > 0.0 {
            let travel_time = delta.length() / speed;
            delta += self.target_velocity * travel_time;
        }

        let free = actor.movement.move_type.is_free();
        let step = speed * ctx.frame_time;
        if horizontal_length_sq(delta) <= step * step {
            // close enough to land on the target this tick
            let z = if free { delta.z } else { 0.0 };
            actor.movement.frame_delta = Some(Vec3::new(delta.x, delta.y, z));
            return false;
        }

        let desired = vec_to_angles(delta);
        let yaw = angle_delta(desired.y, actor.angles.y);
        let pitch = if free {
            angle_delta(desired.x, actor.angles.x)
        } else {
            0.0
        };
        self.force = Vec3::new(pitch, yaw, 0.0) * ctx.config.seek_damping;
        true
    }

    fn force(&self) -> Vec3 {
        self.force
    }

    fn show_info(&self) -> String {
        format!("seek {:.0} {:.0} {:.0}", self.target.x, self.target.y, self.target.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestWorld;

    #[test]
    fn test_seek_turns_toward_target() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        actor.movement.speed = 200.0;
        let mut seek = Seek::new(Vec3::new(0.0, 500.0, 0.0));

        let mut ctx = world.ctx();
        assert!(seek.evaluate(&mut actor, &mut ctx));
        assert!((seek.force.y - 36.0).abs() < 1e-3);
        assert_eq!(seek.force.x, 0.0);
    }

    #[test]
    fn test_arrival_lands_exactly_and_stays() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        actor.movement.speed = 200.0;
        let target = Vec3::new(5.0, 0.0, 0.0);
        let mut seek = Seek::new(target);

        let mut ctx = world.ctx();
        assert!(!seek.evaluate(&mut actor, &mut ctx));
        assert_eq!(actor.movement.frame_delta, Some(target));
        actor.move_step(&ctx);
        assert!((actor.origin.x - 5.0).abs() < 0.05);

        assert!(!seek.evaluate(&mut actor, &mut ctx));
        actor.move_step(&ctx);
        assert!((actor.origin.x - 5.0).abs() < 0.05);
        assert_eq!(seek.force, Vec3::ZERO);
    }
}
