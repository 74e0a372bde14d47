//! Aiming and firing

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vigil_core::angles::angle_delta;

use super::BehaviorState;
use crate::actor::Actor;
use crate::context::SimContext;
use crate::steering::{Chase, ChaseGoal, Steering, Turn, TurnGoal};
use crate::world::EntityInfo;

/// Default aim error accepted before shooting, in degrees
pub(crate) const AIM_TOLERANCE: f32 = 5.0;

/// Whether `target` is visible and within weapon range
pub(super) fn has_shot(actor: &Actor, target: &EntityInfo, ctx: &SimContext<'_>) -> bool {
    let range = actor.combat.attack_range;
    actor.origin.distance_squared(target.origin) <= range * range && actor.can_see(target, ctx)
}

/// Keep facing the current enemy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aim {
    pub tolerance: f32,
}

impl Aim {
    pub fn new(tolerance: f32) -> Self {
        Self { tolerance }
    }

    /// Whether the facing is within tolerance of `target`
    pub fn is_aligned(&self, actor: &Actor, target: Vec3) -> bool {
        angle_delta(actor.yaw_to(target), actor.yaw()).abs() <= self.tolerance
    }

    /// Turn toward `target` for one tick
    pub fn track(&self, actor: &mut Actor, target: Vec3, ctx: &mut SimContext<'_>) {
        let mut turn = Turn::new(TurnGoal::Point(target));
        turn.tolerance = self.tolerance * 0.5;
        if turn.evaluate(actor, ctx) {
            actor.accelerate(turn.force, ctx);
        }
    }
}

impl Default for Aim {
    fn default() -> Self {
        Self::new(AIM_TOLERANCE)
    }
}

impl BehaviorState for Aim {
    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        let Some(enemy) = actor.live_enemy(ctx) else {
            return false;
        };
        actor.movement.frame_delta = Some(Vec3::ZERO);
        self.track(actor, enemy.origin, ctx);
        true
    }

    fn show_info(&self) -> String {
        format!("aim (tolerance {:.1})", self.tolerance)
    }
}

/// FireOnSight sub-modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FireMode {
    StartChase = 0,
    Chasing = 1,
    Aiming = 2,
    Firing = 3,
}

/// Chase the enemy until a shot exists, then aim and fire repeatedly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireOnSight {
    mode: FireMode,
    chase: Option<Chase>,
    aim: Aim,
}

impl FireOnSight {
    pub fn new() -> Self {
        Self {
            mode: FireMode::StartChase,
            chase: None,
            aim: Aim::default(),
        }
    }

    pub fn mode(&self) -> FireMode {
        self.mode
    }

    fn set_mode(&mut self, actor: &Actor, mode: FireMode) {
        debug!("Actor '{}' fire-on-sight {:?} -> {:?}", actor.name, self.mode, mode);
        self.mode = mode;
    }
}

impl Default for FireOnSight {
    fn default() -> Self {
        Self::new()
    }
}

impl BehaviorState for FireOnSight {
    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        let Some(enemy) = actor.live_enemy(ctx) else {
            return false;
        };

        match self.mode {
            FireMode::StartChase => {
                actor.set_anim("run", ctx);
                self.chase = Some(Chase::new(ChaseGoal::Entity(enemy.id)));
                self.set_mode(actor, FireMode::Chasing);
            }
            FireMode::Chasing => {
                if has_shot(actor, enemy, ctx) {
                    actor.set_anim("aim", ctx);
                    self.set_mode(actor, FireMode::Aiming);
                    actor.movement.frame_delta = Some(Vec3::ZERO);
                    return true;
                }
                let chase = self
                    .chase
                    .get_or_insert_with(|| Chase::new(ChaseGoal::Entity(enemy.id)));
                chase.set_goal(ChaseGoal::Entity(enemy.id));
                if chase.evaluate(actor, ctx) {
                    actor.accelerate(chase.force, ctx);
                }
            }
            FireMode::Aiming => {
                actor.movement.frame_delta = Some(Vec3::ZERO);
                if !has_shot(actor, enemy, ctx) {
                    actor.set_anim("run", ctx);
                    self.set_mode(actor, FireMode::Chasing);
                    return true;
                }
                self.aim.track(actor, enemy.origin, ctx);
                if self.aim.is_aligned(actor, enemy.origin) && actor.weapon_ready(ctx) {
                    self.set_mode(actor, FireMode::Firing);
                }
            }
            FireMode::Firing => {
                actor.movement.frame_delta = Some(Vec3::ZERO);
                if !has_shot(actor, enemy, ctx) {
                    actor.set_anim("aim", ctx);
                    self.set_mode(actor, FireMode::Aiming);
                    return true;
                }
                self.aim.track(actor, enemy.origin, ctx);
                if actor.weapon_ready(ctx) {
                    actor.fire(enemy, ctx);
                    actor.set_anim("fire", ctx);
                }
            }
        }
        true
    }

    fn end(&mut self, actor: &mut Actor, _ctx: &mut SimContext<'_>) {
        actor.path = None;
    }

    fn show_info(&self) -> String {
        match &self.chase {
            Some(chase) if self.mode == FireMode::Chasing => {
                format!("{:?}: {}", self.mode, chase.show_info())
            }
            _ => format!("{:?}", self.mode),
        }
    }
}

/// AimAndShoot sub-modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShootMode {
    Check = 0,
    WaitReady = 1,
    Aiming = 2,
    Firing = 3,
}

/// Fire a fixed number of shots at the current enemy from where we stand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AimAndShoot {
    mode: ShootMode,
    pub shots_left: u32,
    aim: Aim,
}

impl AimAndShoot {
    pub fn new(shots: u32) -> Self {
        Self {
            mode: ShootMode::Check,
            shots_left: shots.max(1),
            aim: Aim::default(),
        }
    }

    pub fn mode(&self) -> ShootMode {
        self.mode
    }
}

impl BehaviorState for AimAndShoot {
    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        let Some(enemy) = actor.live_enemy(ctx) else {
            return false;
        };
        actor.movement.frame_delta = Some(Vec3::ZERO);

        if self.mode == ShootMode::Check {
            if !actor.combat.has_weapon {
                return false;
            }
            if actor.has_anim("aim", ctx) {
                actor.set_anim("aim", ctx);
            }
            self.mode = ShootMode::WaitReady;
            // falls through on the same tick
        }

        match self.mode {
            ShootMode::Check | ShootMode::WaitReady => {
                if actor.weapon_ready(ctx) {
                    self.mode = ShootMode::Aiming;
                }
            }
            ShootMode::Aiming => {
                self.aim.track(actor, enemy.origin, ctx);
                if self.aim.is_aligned(actor, enemy.origin) && actor.can_see(enemy, ctx) {
                    self.mode = ShootMode::Firing;
                }
            }
            ShootMode::Firing => {
                actor.fire(enemy, ctx);
                actor.set_anim("fire", ctx);
                self.shots_left = self.shots_left.saturating_sub(1);
                if self.shots_left == 0 {
                    return false;
                }
                self.mode = ShootMode::WaitReady;
            }
        }
        true
    }

    fn show_info(&self) -> String {
        format!("{:?}, {} shots left", self.mode, self.shots_left)
    }
}

#[cfg(test)]
mod tests {
    use vigil_core::EntityId;

    use super::*;
    use crate::behavior::Behavior;
    use crate::testing::TestWorld;
    use crate::world::ActorEvent;

    #[test]
    fn test_aim_and_shoot_falls_through_to_wait() {
        let mut world = TestWorld::new();
        world.add_player(2, Vec3::new(300.0, 0.0, 0.0));
        let mut actor = world.actor(1, Vec3::ZERO);
        actor.attack(EntityId(2));
        actor.combat.next_fire_time = 10.0;

        let mut shoot = AimAndShoot::new(1);
        let mut ctx = world.ctx();
        assert!(shoot.evaluate(&mut actor, &mut ctx));
        assert_eq!(shoot.mode(), ShootMode::WaitReady);
        assert_eq!(actor.anim.name, "aim");
    }

    #[test]
    fn test_aim_and_shoot_fires_and_completes() {
        let mut world = TestWorld::new();
        world.add_player(2, Vec3::new(300.0, 0.0, 0.0));
        let mut actor = world.actor(1, Vec3::ZERO);
        actor.attack(EntityId(2));
        {
            let mut ctx = world.ctx();
            actor.set_behavior(Behavior::AimAndShoot(AimAndShoot::new(1)), None, &mut ctx);
        }
        world.run(&mut actor, 4);

        assert!(!actor.is_behavior_active());
        let shots = world
            .events
            .iter()
            .filter(|e| matches!(e, ActorEvent::Fire { target, .. } if *target == EntityId(2)))
            .count();
        assert_eq!(shots, 1);
    }

    #[test]
    fn test_aim_turns_toward_enemy() {
        let mut world = TestWorld::new();
        world.add_player(2, Vec3::new(0.0, 300.0, 0.0));
        let mut actor = world.actor(1, Vec3::ZERO);
        actor.perception.set_fov(360.0);
        actor.attack(EntityId(2));
        {
            let mut ctx = world.ctx();
            actor.set_behavior(Behavior::Aim(Aim::default()), None, &mut ctx);
        }
        world.run(&mut actor, 4);
        assert!((actor.yaw() - 90.0).abs() <= AIM_TOLERANCE);
    }
}
