use glam::Vec3;
use serde::{Deserialize, Serialize};
use vigil_core::angles::angles_to_vectors;
use vigil_physics::ContentMask;

use super::Steering;
use crate::actor::Actor;
use crate::context::SimContext;

/// Shortest forward look-ahead
const MIN_LOOK_AHEAD: f32 = 64.0;

/// Look ahead along `dir`; on a hit returns the turn sign (+1 left,
/// -1 right) and the urgency (1 - fraction)
fn look_ahead(actor: &Actor, dir: Vec3, avoid_walls: bool, ctx: &SimContext<'_>) -> Option<(f32, f32)> {
    if dir == Vec3::ZERO {
        return None;
    }
    let distance = actor.movement.speed.max(MIN_LOOK_AHEAD);
    let lift = if actor.movement.move_type.is_free() {
        Vec3::ZERO
    } else {
        Vec3::Z * ctx.config.step_height
    };
    let start = actor.origin + lift;
    let tr = ctx.tracer.trace(
        start,
        actor.bounds,
        start + dir * distance,
        Some(actor.id),
        ContentMask::MASK_MONSTER_SOLID,
    );
    if !tr.hit() || tr.start_solid {
        return None;
    }

    let (_, right, _) = angles_to_vectors(actor.angles);
    let obstacle = tr.entity.filter(|e| !e.is_world()).and_then(|e| ctx.world.get(e));
    let sign = match obstacle {
        // obstacle on our right: go left
        Some(info) => {
            if right.dot(info.origin - actor.origin) > 0.0 {
                1.0
            } else {
                -1.0
            }
        }
        None => {
            if !avoid_walls {
                return None;
            }
            // a surface facing right is on our left
            if right.dot(tr.plane_normal) > 0.0 {
                -1.0
            } else {
                1.0
            }
        }
    };
    Some((sign, 1.0 - tr.fraction))
}

/// Ground avoidance: swerve up to 90 degrees away from what is ahead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleAvoidance {
    /// When false only entities are avoided
    pub avoid_walls: bool,
    pub force: Vec3,
}

impl Default for ObstacleAvoidance {
    fn default() -> Self {
        Self {
            avoid_walls: true,
            force: Vec3::ZERO,
        }
    }
}

impl ObstacleAvoidance {
    pub fn entities_only() -> Self {
        Self {
            avoid_walls: false,
            ..Default::default()
        }
    }
}

impl Steering for ObstacleAvoidance {
    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        self.force = Vec3::ZERO;
        let dir = actor.movement.move_dir;
        let dir = Vec3::new(dir.x, dir.y, 0.0).normalize_or_zero();
        let Some((sign, urgency)) = look_ahead(actor, dir, self.avoid_walls, ctx) else {
            return false;
        };
        self.force = Vec3::new(0.0, sign * 90.0 * urgency, 0.0);
        true
    }

    fn force(&self) -> Vec3 {
        self.force
    }

    fn show_info(&self) -> String {
        format!("avoid (walls: {}) {:.1}", self.avoid_walls, self.force.y)
    }
}

/// Flight and swim avoidance: a gentler correction that also climbs. It
/// always turns the same way, whichever side the obstacle is on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleAvoidance2 {
    pub avoid_walls: bool,
    pub force: Vec3,
}

impl Default for ObstacleAvoidance2 {
    fn default() -> Self {
        Self {
            avoid_walls: true,
            force: Vec3::ZERO,
        }
    }
}

impl Steering for ObstacleAvoidance2 {
    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        self.force = Vec3::ZERO;
        let dir = actor.facing_dir();
        let Some((_, urgency)) = look_ahead(actor, dir, self.avoid_walls, ctx) else {
            return false;
        };
        self.force = Vec3::new(15.0 * urgency, 45.0 * urgency, 0.0);
        true
    }

    fn force(&self) -> Vec3 {
        self.force
    }

    fn show_info(&self) -> String {
        format!("avoid2 (walls: {}) {:.1}", self.avoid_walls, self.force.y)
    }
}
