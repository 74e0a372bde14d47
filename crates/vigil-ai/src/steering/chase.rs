//! Composite pursuit: path following, direct seeking, stuck recovery and
//! obstacle avoidance

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vigil_core::angles::{angle_mod, yaw_to_dir};
use vigil_core::EntityId;
use vigil_nav::NodeId;
use vigil_physics::ContentMask;

use super::{FollowPath, ObstacleAvoidance, Seek, Steering};
use crate::actor::Actor;
use crate::context::SimContext;

/// Directions tried by a wander sweep, relative to the facing
const WANDER_SWEEP: [f32; 7] = [0.0, 30.0, -30.0, 60.0, -60.0, 90.0, -90.0];

/// Where a chase is headed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ChaseGoal {
    Point(Vec3),
    Node(NodeId),
    Entity(EntityId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chase {
    pub goal: ChaseGoal,
    pub force: Vec3,
    follow: FollowPath,
    seek: Seek,
    avoid: ObstacleAvoidance,
    next_replan: f32,
    next_avoid: f32,
    /// Consecutive ticks whose move failed
    stuck_ticks: u32,
    /// Destination of the current wander, if recovering from being stuck
    wander: Option<Vec3>,
    wander_started: f32,
    /// Use the slower re-plan cadence once
    recovering: bool,
}

impl Chase {
    pub fn new(goal: ChaseGoal) -> Self {
        Self {
            goal,
            force: Vec3::ZERO,
            follow: FollowPath::new(),
            seek: Seek::default(),
            avoid: ObstacleAvoidance::default(),
            next_replan: 0.0,
            next_avoid: 0.0,
            stuck_ticks: 0,
            wander: None,
            wander_started: 0.0,
            recovering: false,
        }
    }

    /// Retarget and force a re-plan on the next evaluation
    pub fn set_goal(&mut self, goal: ChaseGoal) {
        if self.goal != goal {
            self.goal = goal;
            self.next_replan = 0.0;
        }
    }

    pub fn is_wandering(&self) -> bool {
        self.wander.is_some()
    }

    /// Current world position of the goal
    pub fn goal_position(&self, ctx: &SimContext<'_>) -> Option<Vec3> {
        match self.goal {
            ChaseGoal::Point(point) => Some(point),
            ChaseGoal::Node(id) => ctx.nav.node(id).map(|n| n.origin),
            ChaseGoal::Entity(id) => ctx.world.get(id).map(|e| e.origin),
        }
    }

    fn goal_velocity(&self, ctx: &SimContext<'_>) -> Vec3 {
        match self.goal {
            ChaseGoal::Entity(id) => ctx.world.get(id).map_or(Vec3::ZERO, |e| e.velocity),
            _ => Vec3::ZERO,
        }
    }

    fn replan(&mut self, actor: &mut Actor, goal: Vec3, ctx: &SimContext<'_>) {
        let planned = match self.goal {
            ChaseGoal::Node(id) => ctx.nav.find_path_to_node(actor.origin, id, Some(actor.id), Some(ctx.tracer)),
            _ => ctx.nav.find_path(actor.origin, goal, Some(actor.id), Some(ctx.tracer)),
        };
        match planned {
            Ok(path) => actor.path = Some(path),
            Err(err) => {
                debug!("Actor '{}' chases directly: {}", actor.name, err);
                actor.path = None;
            }
        }
    }

    /// Sweep half a circle around the facing and head for the most open
    /// direction
    fn start_wander(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        let flip = if ctx.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let distance = ctx.config.wander_distance;
        let lift = Vec3::Z * ctx.config.step_height;
        let start = actor.origin + lift;

        let mut best: Option<(f32, Vec3)> = None;
        for offset in WANDER_SWEEP {
            let dir = yaw_to_dir(angle_mod(actor.angles.y + offset * flip));
            let tr = ctx.tracer.trace(
                start,
                actor.bounds,
                start + dir * distance,
                Some(actor.id),
                ContentMask::MASK_MONSTER_SOLID,
            );
            if tr.start_solid {
                continue;
            }
            if best.map_or(true, |(f, _)| tr.fraction > f) {
                best = Some((tr.fraction, tr.end_pos - lift));
            }
        }

        let dest = match best {
            Some((fraction, dest)) if fraction > 0.1 => dest,
            _ => actor.origin - yaw_to_dir(actor.angles.y) * distance,
        };
        debug!("Actor '{}' is stuck, wandering", actor.name);
        actor.path = None;
        self.wander = Some(dest);
        self.wander_started = ctx.time;
        self.stuck_ticks = 0;
    }

    fn stop_wander(&mut self, actor: &mut Actor, goal: Vec3, ctx: &SimContext<'_>) {
        self.wander = None;
        self.stuck_ticks = 0;
        self.recovering = true;
        self.next_replan = ctx.time;
        actor.face(goal);
    }
}

impl Steering for Chase {
    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        self.force = Vec3::ZERO;
        let Some(goal) = self.goal_position(ctx) else {
            return false;
        };

        if actor.movement.last_result.failed() {
            self.stuck_ticks += 1;
        } else {
            self.stuck_ticks = 0;
        }

        if self.wander.is_none() && self.stuck_ticks >= ctx.config.chase_stuck_ticks {
            self.start_wander(actor, ctx);
        }

        if let Some(dest) = self.wander {
            self.seek.set_target(dest, Vec3::ZERO);
            let blocked_again = self.stuck_ticks > 0 && ctx.time > self.wander_started;
            if !self.seek.evaluate(actor, ctx) || blocked_again {
                self.stop_wander(actor, goal, ctx);
            } else {
                self.force = self.seek.force;
                return true;
            }
        }

        if ctx.time >= self.next_replan {
            self.replan(actor, goal, ctx);
            let interval = if self.recovering {
                ctx.config.chase_replan_wander_interval
            } else {
                ctx.config.chase_replan_interval
            };
            self.recovering = false;
            self.next_replan = ctx.time + interval;
        }

        let following = actor.path.as_ref().is_some_and(|p| !p.is_finished())
            && self.follow.evaluate(actor, ctx);
        if following {
            self.force = self.follow.force;
        } else {
            // path exhausted or unavailable: go straight for it
            self.seek.set_target(goal, self.goal_velocity(ctx));
            if !self.seek.evaluate(actor, ctx) {
                return false;
            }
            self.force = self.seek.force;
        }

        if ctx.time >= self.next_avoid {
            self.next_avoid = ctx.time + ctx.config.avoid_interval;
            if self.avoid.evaluate(actor, ctx) {
                self.force += self.avoid.force;
            }
        }
        true
    }

    fn force(&self) -> Vec3 {
        self.force
    }

    fn show_info(&self) -> String {
        let mode = if self.is_wandering() { "wandering" } else { "chasing" };
        format!("{} {:?} (stuck {})", mode, self.goal, self.stuck_ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::MoveResult;
    use crate::testing::TestWorld;

    #[test]
    fn test_two_failed_moves_start_wander() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        actor.movement.speed = 200.0;
        let mut chase = Chase::new(ChaseGoal::Point(Vec3::new(1000.0, 0.0, 0.0)));

        let mut ctx = world.ctx();
        assert!(chase.evaluate(&mut actor, &mut ctx));
        actor.movement.last_result = MoveResult::BlockedByWall;
        assert!(!chase.is_wandering());

        assert!(chase.evaluate(&mut actor, &mut ctx));
        actor.movement.last_result = MoveResult::BlockedByWall;
        assert!(!chase.is_wandering());

        assert!(chase.evaluate(&mut actor, &mut ctx));
        assert!(chase.is_wandering());
    }

    #[test]
    fn test_chase_reaches_point() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        actor.movement.speed = 200.0;
        let goal = Vec3::new(0.0, 300.0, 0.0);
        let mut chase = Chase::new(ChaseGoal::Point(goal));

        let mut arrived = false;
        for _ in 0..200 {
            let mut ctx = world.ctx();
            let running = chase.evaluate(&mut actor, &mut ctx);
            if running {
                actor.accelerate(chase.force, &ctx);
            }
            // the arrival tick still carries the landing step
            actor.move_step(&ctx);
            if !running {
                arrived = true;
                break;
            }
            drop(ctx);
            world.time += 0.05;
        }
        assert!(arrived);
        assert!(actor.origin.distance(goal) < 1.0);
    }

    #[test]
    fn test_missing_entity_goal_finishes() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        let mut chase = Chase::new(ChaseGoal::Entity(EntityId(99)));
        let mut ctx = world.ctx();
        assert!(!chase.evaluate(&mut actor, &mut ctx));
    }
}
