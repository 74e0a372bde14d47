//! Turning and moving an actor through the world

use glam::Vec3;
use serde::{Deserialize, Serialize};
use vigil_core::angles::{angle_mod, angles_to_dir, yaw_to_dir};
use vigil_physics::ContentMask;

use super::Actor;
use crate::context::SimContext;

/// How an actor moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MoveType {
    #[default]
    Walk,
    Fly,
    Swim,
}

impl MoveType {
    /// Whether pitch steers the movement direction
    pub fn is_free(self) -> bool {
        matches!(self, MoveType::Fly | MoveType::Swim)
    }
}

/// Outcome of the last movement step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MoveResult {
    #[default]
    Ok,
    BlockedByWall,
    BlockedByFall,
    BlockedByWater,
    Stuck,
}

impl MoveResult {
    pub fn failed(self) -> bool {
        self != MoveResult::Ok
    }
}

/// Movement state of an actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locomotion {
    pub move_type: MoveType,
    /// Units per second, taken from the playing animation
    pub speed: f32,
    pub move_dir: Vec3,
    /// Net displacement of the current animation cycle
    pub total_delta: Vec3,
    /// Exact displacement for this tick, overriding speed and direction
    pub frame_delta: Option<Vec3>,
    /// Displacement actually applied last tick
    pub last_delta: Vec3,
    pub last_result: MoveResult,
    /// 0 dry, 1 feet, 2 waist, 3 submerged
    pub water_level: u8,
    /// Maximum degrees turned per tick
    pub turn_speed: f32,
    pub on_ground: bool,
    /// Ballistic velocity while airborne
    pub velocity: Vec3,
    /// Level time of the last jump, if any
    pub last_jump_time: Option<f32>,
}

impl Default for Locomotion {
    fn default() -> Self {
        Self {
            move_type: MoveType::Walk,
            speed: 0.0,
            move_dir: Vec3::X,
            total_delta: Vec3::ZERO,
            frame_delta: None,
            last_delta: Vec3::ZERO,
            last_result: MoveResult::Ok,
            water_level: 0,
            turn_speed: 30.0,
            on_ground: true,
            velocity: Vec3::ZERO,
            last_jump_time: None,
        }
    }
}

impl Actor {
    fn movement_mask(&self) -> ContentMask {
        ContentMask::MASK_MONSTER_SOLID
    }

    /// Apply a steering force: x turns pitch, y turns yaw
    pub fn accelerate(&mut self, force: Vec3, ctx: &SimContext<'_>) {
        let turn = self.movement.turn_speed;
        let yaw_change = force.y.clamp(-turn, turn);
        self.angles.y = angle_mod(self.angles.y + yaw_change);

        let free = self.movement.move_type.is_free();
        if free {
            let pitch_change = force.x.clamp(-turn, turn);
            self.angles.x = (self.angles.x + pitch_change).clamp(-80.0, 80.0);
        }

        let lean = if free {
            ctx.config.lean_limit_air
        } else {
            ctx.config.lean_limit_ground
        };
        self.angles.z = (-yaw_change).clamp(-lean, lean);
        self.movement.move_dir = self.facing_dir();
    }

    /// Direction movement goes for the current angles and move type
    pub fn facing_dir(&self) -> Vec3 {
        if self.movement.move_type.is_free() {
            angles_to_dir(self.angles.x, self.angles.y)
        } else {
            yaw_to_dir(self.angles.y)
        }
    }

    /// Integrate one tick of movement
    pub fn move_step(&mut self, ctx: &SimContext<'_>) {
        self.movement.move_dir = self.facing_dir();
        let start = self.origin;

        let result = if !self.movement.on_ground && self.movement.move_type == MoveType::Walk {
            self.movement.frame_delta = None;
            self.airborne_move(ctx)
        } else {
            let delta = match self.movement.frame_delta.take() {
                Some(delta) => delta,
                None => self.movement.move_dir * self.movement.speed * ctx.frame_time,
            };
            if delta.length_squared() <= f32::EPSILON {
                MoveResult::Ok
            } else if self.movement.move_type == MoveType::Walk {
                self.walk_move(delta, ctx)
            } else {
                self.free_move(delta, ctx)
            }
        };

        self.movement.last_delta = self.origin - start;
        self.movement.last_result = result;
    }

    /// Step-up, move, step-down along the ground
    fn walk_move(&mut self, delta: Vec3, ctx: &SimContext<'_>) -> MoveResult {
        let mask = self.movement_mask();
        let up = Vec3::Z * ctx.config.step_height;
        let flat = Vec3::new(delta.x, delta.y, 0.0);

        let raised = ctx.tracer.trace(self.origin, self.bounds, self.origin + up, Some(self.id), mask);
        if raised.all_solid {
            return MoveResult::Stuck;
        }

        let start = raised.end_pos;
        let forward = ctx.tracer.trace(start, self.bounds, start + flat, Some(self.id), mask);
        if forward.start_solid {
            return MoveResult::Stuck;
        }
        if forward.hit() {
            return MoveResult::BlockedByWall;
        }

        let drop = ctx.tracer.trace(
            forward.end_pos,
            self.bounds,
            forward.end_pos - up * 2.0,
            Some(self.id),
            mask,
        );
        if drop.start_solid {
            return MoveResult::Stuck;
        }
        if !drop.hit() {
            return MoveResult::BlockedByFall;
        }

        let dest = drop.end_pos;
        if self.movement.water_level < 2 && self.water_level_at(dest, ctx) >= 2 {
            return MoveResult::BlockedByWater;
        }

        self.origin = dest;
        MoveResult::Ok
    }

    /// Straight-line move for flyers and swimmers
    fn free_move(&mut self, delta: Vec3, ctx: &SimContext<'_>) -> MoveResult {
        let tr = ctx.tracer.trace(
            self.origin,
            self.bounds,
            self.origin + delta,
            Some(self.id),
            self.movement_mask(),
        );
        if tr.start_solid {
            return MoveResult::Stuck;
        }
        if self.movement.move_type == MoveType::Swim && self.water_level_at(tr.end_pos, ctx) < 2 {
            return MoveResult::BlockedByWater;
        }

        self.origin = tr.end_pos;
        if tr.hit() {
            MoveResult::BlockedByWall
        } else {
            MoveResult::Ok
        }
    }

    /// Ballistic flight after a jump or a fall
    fn airborne_move(&mut self, ctx: &SimContext<'_>) -> MoveResult {
        let dt = ctx.frame_time;
        let velocity = self.movement.velocity;
        let next = velocity - Vec3::Z * ctx.config.gravity * dt;
        let delta = (velocity + next) * 0.5 * dt;

        let tr = ctx.tracer.trace(
            self.origin,
            self.bounds,
            self.origin + delta,
            Some(self.id),
            self.movement_mask(),
        );
        if tr.start_solid {
            return MoveResult::Stuck;
        }

        self.origin = tr.end_pos;
        self.movement.velocity = next;
        if tr.hit() {
            if tr.plane_normal.z > 0.7 {
                self.movement.on_ground = true;
                self.movement.velocity = Vec3::ZERO;
            } else {
                self.movement.velocity.x = 0.0;
                self.movement.velocity.y = 0.0;
                return MoveResult::BlockedByWall;
            }
        }
        MoveResult::Ok
    }

    /// Leave the ground on an arc that lands on `target`
    pub fn launch(&mut self, target: Vec3, ctx: &SimContext<'_>) {
        let delta = target - self.origin;
        let flat = Vec3::new(delta.x, delta.y, 0.0);
        let distance = flat.length();
        let horizontal_speed = self.movement.speed.max(200.0);
        let flight_time = (distance / horizontal_speed).max(0.3);
        let gravity = ctx.config.gravity;

        let vertical = (delta.z + 0.5 * gravity * flight_time * flight_time) / flight_time;
        self.movement.velocity = flat / flight_time + Vec3::Z * vertical;
        self.movement.on_ground = false;
        self.movement.last_jump_time = Some(ctx.time);
    }

    /// Whether a straight walk to `dest` is unobstructed
    pub fn can_walk_to(&self, dest: Vec3, ctx: &SimContext<'_>) -> bool {
        let up = Vec3::Z * ctx.config.step_height;
        let tr = ctx.tracer.trace(
            self.origin + up,
            self.bounds,
            Vec3::new(dest.x, dest.y, self.origin.z) + up,
            Some(self.id),
            self.movement_mask(),
        );
        !tr.hit() && !tr.start_solid
    }

    /// How deep in liquid an actor standing at `pos` is
    pub fn water_level_at(&self, pos: Vec3, ctx: &SimContext<'_>) -> u8 {
        let liquid = |p: Vec3| ctx.tracer.point_contents(p).intersects(ContentMask::MASK_WATER);
        if !liquid(pos + Vec3::Z * (self.bounds.mins.z + 1.0)) {
            return 0;
        }
        if !liquid(pos + self.bounds.center()) {
            return 1;
        }
        if !liquid(pos + self.perception.eye_offset) {
            return 2;
        }
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestWorld;

    #[test]
    fn test_turn_clamped_and_lean_limited() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        let ctx = world.ctx();

        actor.accelerate(Vec3::new(45.0, 90.0, 0.0), &ctx);
        assert_eq!(actor.angles.y, 30.0);
        assert_eq!(actor.angles.x, 0.0);
        assert_eq!(actor.angles.z, -5.0);

        actor.movement.move_type = MoveType::Fly;
        actor.accelerate(Vec3::new(45.0, -10.0, 0.0), &ctx);
        assert_eq!(actor.angles.y, 20.0);
        assert_eq!(actor.angles.x, 30.0);
        assert_eq!(actor.angles.z, 2.0);
    }

    #[test]
    fn test_walk_on_floor_and_into_wall() {
        let mut world = TestWorld::new();
        world
            .tracer
            .add_solid(Vec3::new(60.0, -100.0, 0.0), Vec3::new(80.0, 100.0, 200.0));
        let mut actor = world.actor(1, Vec3::ZERO);
        actor.movement.speed = 200.0;

        let ctx = world.ctx();
        actor.move_step(&ctx);
        assert_eq!(actor.movement.last_result, MoveResult::Ok);
        assert!((actor.origin.x - 10.0).abs() < 1e-3);
        assert!(actor.origin.z.abs() < 0.1);

        for _ in 0..5 {
            actor.move_step(&ctx);
        }
        assert_eq!(actor.movement.last_result, MoveResult::BlockedByWall);
        assert!(actor.origin.x <= 44.0);
    }

    #[test]
    fn test_ledge_blocks_walkers() {
        let mut world = TestWorld::empty();
        world
            .tracer
            .add_solid(Vec3::new(-100.0, -100.0, -64.0), Vec3::new(20.0, 100.0, 0.0));
        let mut actor = world.actor(1, Vec3::ZERO);
        actor.movement.speed = 200.0;

        let ctx = world.ctx();
        for _ in 0..6 {
            actor.move_step(&ctx);
        }
        assert_eq!(actor.movement.last_result, MoveResult::BlockedByFall);
        assert!(actor.origin.x <= 36.0);
    }

    #[test]
    fn test_jump_arc_lands() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        let ctx = world.ctx();

        actor.launch(Vec3::new(100.0, 0.0, 0.0), &ctx);
        assert!(!actor.movement.on_ground);
        for _ in 0..40 {
            actor.move_step(&ctx);
            if actor.movement.on_ground {
                break;
            }
        }
        assert!(actor.movement.on_ground);
        assert!((actor.origin.x - 100.0).abs() < 15.0);
    }

    #[test]
    fn test_water_level() {
        let mut world = TestWorld::new();
        world
            .tracer
            .add_water(Vec3::new(-500.0, -500.0, -100.0), Vec3::new(500.0, 500.0, 50.0));
        let actor = world.actor(1, Vec3::ZERO);
        let ctx = world.ctx();
        assert_eq!(actor.water_level_at(Vec3::ZERO, &ctx), 2);
        assert_eq!(actor.water_level_at(Vec3::new(0.0, 0.0, 100.0), &ctx), 0);
        assert_eq!(actor.water_level_at(Vec3::new(0.0, 0.0, -40.0), &ctx), 3);
    }
}
