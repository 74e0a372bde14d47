use glam::Vec3;
use serde::{Deserialize, Serialize};
use vigil_core::angles::angle_delta;
use vigil_core::EntityId;

use super::Steering;
use crate::actor::Actor;
use crate::context::SimContext;

/// What to face
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TurnGoal {
    Yaw(f32),
    Point(Vec3),
    Entity(EntityId),
}

/// Rotate in place until facing the goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub goal: TurnGoal,
    /// Degrees of error accepted as facing
    pub tolerance: f32,
    pub force: Vec3,
}

impl Turn {
    pub fn new(goal: TurnGoal) -> Self {
        Self {
            goal,
            tolerance: 1.0,
            force: Vec3::ZERO,
        }
    }

    fn desired_yaw(&self, actor: &Actor, ctx: &SimContext<'_>) -> Option<f32> {
        match self.goal {
            TurnGoal::Yaw(yaw) => Some(yaw),
            TurnGoal::Point(point) => Some(actor.yaw_to(point)),
            TurnGoal::Entity(id) => ctx.world.get(id).map(|e| actor.yaw_to(e.origin)),
        }
    }
}

impl Steering for Turn {
    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        self.force = Vec3::ZERO;
        let Some(yaw) = self.desired_yaw(actor, ctx) else {
            return false;
        };
        let diff = angle_delta(yaw, actor.angles.y);
        if diff.abs() <= self.tolerance {
            return false;
        }
        self.force = Vec3::new(0.0, diff, 0.0);
        true
    }

    fn force(&self) -> Vec3 {
        self.force
    }

    fn show_info(&self) -> String {
        format!("turn {:?} (tolerance {:.1})", self.goal, self.tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestWorld;

    #[test]
    fn test_turn_reaches_yaw() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        let mut turn = Turn::new(TurnGoal::Yaw(-90.0));

        let mut ctx = world.ctx();
        let mut ticks = 0;
        while turn.evaluate(&mut actor, &mut ctx) {
            actor.accelerate(turn.force, &ctx);
            ticks += 1;
            assert!(ticks < 10);
        }
        assert_eq!(ticks, 3);
        assert!((actor.angles.y - 270.0).abs() < 1e-3);
    }
}
