use glam::Vec3;
use serde::{Deserialize, Serialize};
use vigil_core::angles::horizontal_length_sq;
use vigil_nav::{Path, PathPoint};

use super::{Seek, Steering};
use crate::actor::Actor;
use crate::context::SimContext;

/// Walk the actor's current path waypoint by waypoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FollowPath {
    seek: Seek,
    pub force: Vec3,
}

impl FollowPath {
    pub fn new() -> Self {
        Self::default()
    }

    fn current(actor: &Actor) -> Option<PathPoint> {
        actor.path.as_ref().and_then(Path::current).copied()
    }

    fn advance(actor: &mut Actor) {
        if let Some(path) = actor.path.as_mut() {
            path.advance();
        }
    }

    /// Ask for the scripted jump toward a jump-linked waypoint
    fn request_jump(actor: &mut Actor, target: Vec3, ctx: &SimContext<'_>) {
        if let Some(last) = actor.movement.last_jump_time {
            if ctx.time < last + ctx.config.jump_interval {
                return;
            }
        }
        actor.jump_target = Some(target);
        actor.movement.last_jump_time = Some(ctx.time);
        actor.queue_action("jump", false);
    }
}

impl Steering for FollowPath {
    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        self.force = Vec3::ZERO;

        let skip_start = match actor.path.as_ref() {
            Some(path) if path.cursor() == 0 => path.peek(1).copied(),
            Some(_) => None,
            None => return false,
        };
        if let Some(second) = skip_start {
            if !second.jump && actor.can_walk_to(second.origin, ctx) {
                Self::advance(actor);
            }
        }

        let step = actor.movement.speed * ctx.frame_time;
        let mut point = loop {
            let Some(point) = Self::current(actor) else {
                return false;
            };
            let is_last = actor.path.as_ref().is_some_and(|p| p.remaining() == 1);
            if is_last || horizontal_length_sq(point.origin - actor.origin) >= step * step {
                break point;
            }
            Self::advance(actor);
        };

        if point.jump {
            Self::request_jump(actor, point.origin, ctx);
        }

        self.seek.target = point.origin;
        if !self.seek.evaluate(actor, ctx) {
            Self::advance(actor);
            match Self::current(actor) {
                Some(next) => point = next,
                None => return false,
            }
            self.seek.target = point.origin;
        }
        self.force = self.seek.force;
        true
    }

    fn force(&self) -> Vec3 {
        self.force
    }

    fn show_info(&self) -> String {
        format!("follow path toward {:.0?}", self.seek.target)
    }
}
