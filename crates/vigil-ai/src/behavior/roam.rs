//! Free roaming for walkers, flyers and swimmers

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use vigil_core::angles::angles_to_dir;
use vigil_physics::ContentMask;

use super::aim::Aim;
use super::BehaviorState;
use crate::actor::{Actor, MoveType};
use crate::context::SimContext;
use crate::steering::{ObstacleAvoidance, ObstacleAvoidance2, Seek, Steering};

/// How far ahead the cached direction is projected
const ROAM_LOOKAHEAD: f32 = 256.0;
/// Direction picks tried before settling for the best one
const ROAM_PICKS: usize = 8;

/// Roam in random reachable directions. The close-attack variants stop as
/// soon as a clear shot exists with the weapon ready.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roam {
    pub medium: MoveType,
    pub close_attack: bool,
    /// Cached heading
    pub dir: Vec3,
    next_pick: f32,
    seek: Seek,
    avoid: ObstacleAvoidance,
    avoid_free: ObstacleAvoidance2,
}

impl Roam {
    pub fn new(medium: MoveType, close_attack: bool) -> Self {
        Self {
            medium,
            close_attack,
            dir: Vec3::ZERO,
            next_pick: 0.0,
            seek: Seek::default(),
            avoid: ObstacleAvoidance::default(),
            avoid_free: ObstacleAvoidance2::default(),
        }
    }

    fn anim(&self) -> &'static str {
        match self.medium {
            MoveType::Walk => "walk",
            MoveType::Fly => "fly",
            MoveType::Swim => "swim",
        }
    }

    /// Try random headings and keep the most open one
    fn pick_direction(&mut self, actor: &Actor, ctx: &mut SimContext<'_>) {
        let free = self.medium.is_free();
        let mut best: Option<(f32, Vec3)> = None;
        for _ in 0..ROAM_PICKS {
            let yaw = ctx.rng.gen_range(0.0..360.0);
            let pitch = if free { ctx.rng.gen_range(-30.0..30.0) } else { 0.0 };
            let dir = angles_to_dir(pitch, yaw);
            let start = actor.origin + Vec3::Z * if free { 0.0 } else { ctx.config.step_height };
            let tr = ctx.tracer.trace(
                start,
                actor.bounds,
                start + dir * ROAM_LOOKAHEAD,
                Some(actor.id),
                ContentMask::MASK_MONSTER_SOLID,
            );
            if tr.start_solid {
                continue;
            }
            let mut score = tr.fraction;
            if self.medium == MoveType::Swim && actor.water_level_at(tr.end_pos, ctx) < 2 {
                score *= 0.25;
            }
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, dir));
            }
            if score >= 1.0 {
                break;
            }
        }
        if let Some((_, dir)) = best {
            self.dir = dir;
        }
        self.next_pick = ctx.time + 2.0 + ctx.rng.gen_range(0.0..2.0);
    }

    /// Close-attack check: Some(finished) when the enemy decides this tick
    fn attack_check(&self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> Option<bool> {
        let enemy = actor.live_enemy(ctx)?;
        let range = actor.combat.attack_range;
        if actor.origin.distance_squared(enemy.origin) > range * range || !actor.can_see(enemy, ctx) {
            return None;
        }
        if actor.weapon_ready(ctx) {
            return Some(true);
        }
        // hold position until the weapon comes back
        actor.movement.frame_delta = Some(Vec3::ZERO);
        Aim::default().track(actor, enemy.origin, ctx);
        Some(false)
    }
}

impl BehaviorState for Roam {
    fn begin(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        actor.movement.move_type = self.medium;
        actor.set_anim(self.anim(), ctx);
        if self.dir == Vec3::ZERO {
            self.dir = actor.facing_dir();
        }
    }

    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        if self.close_attack {
            match self.attack_check(actor, ctx) {
                Some(true) => return false,
                Some(false) => return true,
                None => {}
            }
        }

        if actor.movement.last_result.failed() || ctx.time >= self.next_pick {
            self.pick_direction(actor, ctx);
        }

        self.seek.set_target(actor.origin + self.dir * ROAM_LOOKAHEAD, Vec3::ZERO);
        let mut force = Vec3::ZERO;
        if self.seek.evaluate(actor, ctx) {
            force = self.seek.force;
        }
        if self.medium.is_free() {
            if self.avoid_free.evaluate(actor, ctx) {
                force += self.avoid_free.force;
            }
        } else if self.avoid.evaluate(actor, ctx) {
            force += self.avoid.force;
        }
        actor.accelerate(force, ctx);
        true
    }

    fn show_info(&self) -> String {
        format!(
            "{:?} roam{} toward {:.2?}",
            self.medium,
            if self.close_attack { " (close attack)" } else { "" },
            self.dir
        )
    }
}

#[cfg(test)]
mod tests {
    use vigil_core::EntityId;

    use super::*;
    use crate::behavior::Behavior;
    use crate::testing::TestWorld;

    #[test]
    fn test_swimmer_stays_in_water() {
        let mut world = TestWorld::new();
        world
            .tracer
            .add_water(Vec3::new(-400.0, -400.0, 0.0), Vec3::new(400.0, 400.0, 300.0));
        let mut actor = world.actor(1, Vec3::new(0.0, 0.0, 100.0));
        actor.perception.eye_offset = Vec3::new(0.0, 0.0, 32.0);
        {
            let mut ctx = world.ctx();
            actor.set_behavior(Behavior::Swim(Roam::new(MoveType::Swim, false)), None, &mut ctx);
        }
        world.run(&mut actor, 100);

        assert_eq!(actor.movement.move_type, MoveType::Swim);
        assert!(actor.is_behavior_active());
        let ctx = world.ctx();
        assert!(actor.water_level_at(actor.origin, &ctx) >= 2);
    }

    #[test]
    fn test_close_attack_stops_with_shot_ready() {
        let mut world = TestWorld::new();
        world.add_player(2, Vec3::new(300.0, 0.0, 0.0));
        let mut actor = world.actor(1, Vec3::ZERO);
        actor.attack(EntityId(2));
        actor.combat.next_fire_time = 0.5;
        {
            let mut ctx = world.ctx();
            actor.set_behavior(Behavior::WanderCloseAttack(Roam::new(MoveType::Walk, true)), None, &mut ctx);
        }
        world.run(&mut actor, 5);
        assert!(actor.is_behavior_active());
        assert_eq!(actor.origin, Vec3::ZERO);

        world.run(&mut actor, 10);
        assert!(!actor.is_behavior_active());
    }
}
