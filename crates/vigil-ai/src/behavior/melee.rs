//! Close combat and thrown objects

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;
use vigil_core::EntityId;

use super::aim::Aim;
use super::BehaviorState;
use crate::actor::Actor;
use crate::context::SimContext;
use crate::steering::{Chase, ChaseGoal, Steering};
use crate::world::ActorEvent;

/// Knockback speed of a repelling blow
pub(crate) const REPEL_KNOCKBACK: f32 = 300.0;
/// Launch speed of a thrown object
const THROW_SPEED: f32 = 600.0;
/// Extra upward speed so throws arc
const THROW_LOFT: f32 = 150.0;

fn in_melee_range(actor: &Actor, target: Vec3) -> bool {
    let reach = actor.combat.melee_range;
    actor.origin.distance_squared(target) <= reach * reach
}

/// One swing of the melee animation; the blow lands when the cycle ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Melee {
    pub knockback: f32,
    swinging: bool,
}

impl Melee {
    pub fn new() -> Self {
        Self::with_knockback(0.0)
    }

    pub fn with_knockback(knockback: f32) -> Self {
        Self {
            knockback,
            swinging: false,
        }
    }

    pub fn is_swinging(&self) -> bool {
        self.swinging
    }
}

impl Default for Melee {
    fn default() -> Self {
        Self::new()
    }
}

impl BehaviorState for Melee {
    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        actor.movement.frame_delta = Some(Vec3::ZERO);
        if !self.swinging {
            if !actor.set_anim("melee", ctx) {
                warn!("Actor '{}' cannot melee without a melee animation", actor.name);
                return false;
            }
            self.swinging = true;
            if let Some(enemy) = actor.live_enemy(ctx) {
                actor.face(enemy.origin);
            }
            return true;
        }

        if actor.anim.name != "melee" {
            return false;
        }
        if !actor.anim.is_done() {
            return true;
        }
        if let Some(enemy) = actor.live_enemy(ctx) {
            if in_melee_range(actor, enemy.origin) {
                actor.strike(enemy, self.knockback, ctx);
            }
        }
        false
    }

    fn show_info(&self) -> String {
        if self.swinging {
            "swinging".to_string()
        } else {
            "ready to swing".to_string()
        }
    }
}

/// Turn to the enemy, then swing once it is in reach and in front
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AimAndMelee {
    aim: Aim,
    melee: Option<Melee>,
}

impl AimAndMelee {
    pub fn new() -> Self {
        Self {
            aim: Aim::new(15.0),
            melee: None,
        }
    }
}

impl Default for AimAndMelee {
    fn default() -> Self {
        Self::new()
    }
}

impl BehaviorState for AimAndMelee {
    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        if let Some(melee) = self.melee.as_mut() {
            return melee.evaluate(actor, ctx);
        }

        let Some(enemy) = actor.live_enemy(ctx) else {
            return false;
        };
        if !in_melee_range(actor, enemy.origin) {
            return false;
        }
        actor.movement.frame_delta = Some(Vec3::ZERO);
        self.aim.track(actor, enemy.origin, ctx);
        if self.aim.is_aligned(actor, enemy.origin) {
            let mut melee = Melee::new();
            let swinging = melee.evaluate(actor, ctx);
            self.melee = Some(melee);
            return swinging;
        }
        true
    }

    fn show_info(&self) -> String {
        match &self.melee {
            Some(melee) => melee.show_info(),
            None => "aiming".to_string(),
        }
    }
}

/// Wait for the enemy to come close, then knock it back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repel {
    melee: Melee,
}

impl Repel {
    pub fn new(knockback: f32) -> Self {
        Self {
            melee: Melee::with_knockback(knockback),
        }
    }
}

impl BehaviorState for Repel {
    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        if self.melee.is_swinging() {
            return self.melee.evaluate(actor, ctx);
        }
        let Some(enemy) = actor.live_enemy(ctx) else {
            return false;
        };
        actor.movement.frame_delta = Some(Vec3::ZERO);
        if in_melee_range(actor, enemy.origin) {
            return self.melee.evaluate(actor, ctx);
        }
        Aim::default().track(actor, enemy.origin, ctx);
        true
    }

    fn show_info(&self) -> String {
        format!("repel (knockback {:.0}), {}", self.melee.knockback, self.melee.show_info())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThrowMode {
    Approach,
    Pickup,
    Aim,
    Throw,
}

/// Walk to an object, pick it up and hurl it at the enemy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupAndThrow {
    pub object: EntityId,
    mode: ThrowMode,
    chase: Option<Chase>,
    aim: Aim,
}

impl PickupAndThrow {
    pub fn new(object: EntityId) -> Self {
        Self {
            object,
            mode: ThrowMode::Approach,
            chase: None,
            aim: Aim::new(10.0),
        }
    }

    pub fn mode(&self) -> ThrowMode {
        self.mode
    }
}

impl BehaviorState for PickupAndThrow {
    fn begin(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        actor.set_anim("walk", ctx);
    }

    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        match self.mode {
            ThrowMode::Approach => {
                let world = ctx.world;
                let Some(object) = world.get(self.object) else {
                    return false;
                };
                if !in_melee_range(actor, object.origin) {
                    let chase = self
                        .chase
                        .get_or_insert_with(|| Chase::new(ChaseGoal::Entity(object.id)));
                    if chase.evaluate(actor, ctx) {
                        actor.accelerate(chase.force, ctx);
                        return true;
                    }
                }
                self.mode = ThrowMode::Pickup;
                actor.movement.frame_delta = Some(Vec3::ZERO);
                true
            }
            ThrowMode::Pickup => {
                actor.movement.frame_delta = Some(Vec3::ZERO);
                if ctx.world.get(self.object).is_none() {
                    return false;
                }
                ctx.events.push(ActorEvent::Pickup {
                    actor: actor.id,
                    object: self.object,
                });
                actor.held_object = Some(self.object);
                actor.set_anim("idle", ctx);
                self.mode = ThrowMode::Aim;
                true
            }
            ThrowMode::Aim => {
                actor.movement.frame_delta = Some(Vec3::ZERO);
                let Some(enemy) = actor.live_enemy(ctx) else {
                    return false;
                };
                self.aim.track(actor, enemy.origin, ctx);
                if self.aim.is_aligned(actor, enemy.origin) {
                    self.mode = ThrowMode::Throw;
                }
                true
            }
            ThrowMode::Throw => {
                let Some(enemy) = actor.live_enemy(ctx) else {
                    return false;
                };
                let dir = (enemy.center() - actor.eye_pos()).normalize_or_zero();
                ctx.events.push(ActorEvent::Throw {
                    actor: actor.id,
                    object: self.object,
                    velocity: dir * THROW_SPEED + Vec3::Z * THROW_LOFT,
                });
                actor.held_object = None;
                actor.set_anim("melee", ctx);
                false
            }
        }
    }

    fn end(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        // drop whatever is still held
        if let Some(object) = actor.held_object.take() {
            ctx.events.push(ActorEvent::Throw {
                actor: actor.id,
                object,
                velocity: Vec3::ZERO,
            });
        }
        actor.path = None;
    }

    fn show_info(&self) -> String {
        format!("{:?} object {}", self.mode, self.object)
    }
}

#[cfg(test)]
mod tests {
    use vigil_core::Bounds;

    use super::*;
    use crate::anim::AnimationTable;
    use crate::behavior::Behavior;
    use crate::testing::TestWorld;
    use crate::world::EntityInfo;

    #[test]
    fn test_melee_strikes_when_swing_ends() {
        let mut world = TestWorld::new();
        world.add_player(2, Vec3::new(60.0, 0.0, 0.0));
        let mut actor = world.actor(1, Vec3::ZERO);
        actor.attack(EntityId(2));
        {
            let mut ctx = world.ctx();
            actor.set_behavior(Behavior::Melee(Melee::new()), None, &mut ctx);
        }
        world.run(&mut actor, 14);

        assert!(!actor.is_behavior_active());
        let hits: Vec<_> = world
            .events
            .iter()
            .filter(|e| matches!(e, ActorEvent::MeleeHit { .. }))
            .collect();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_melee_without_animation_is_noop() {
        let mut world = TestWorld::new();
        world.anims = AnimationTable::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        {
            let mut ctx = world.ctx();
            actor.set_behavior(Behavior::Melee(Melee::new()), None, &mut ctx);
        }
        world.run(&mut actor, 1);
        assert!(!actor.is_behavior_active());
        assert!(world.events.is_empty());
    }

    #[test]
    fn test_pickup_and_throw() {
        let mut world = TestWorld::new();
        world.add_player(2, Vec3::new(400.0, 0.0, 0.0));
        world.table.insert(EntityInfo::prop(
            EntityId(3),
            "crate",
            Vec3::new(50.0, 0.0, 0.0),
            Bounds::new(Vec3::splat(-8.0), Vec3::splat(8.0)),
        ));
        let mut actor = world.actor(1, Vec3::ZERO);
        actor.attack(EntityId(2));
        {
            let mut ctx = world.ctx();
            actor.set_behavior(Behavior::PickupAndThrow(PickupAndThrow::new(EntityId(3))), None, &mut ctx);
        }
        world.run(&mut actor, 10);

        assert!(!actor.is_behavior_active());
        assert!(actor.held_object.is_none());
        assert!(world
            .events
            .iter()
            .any(|e| matches!(e, ActorEvent::Pickup { object, .. } if *object == EntityId(3))));
        assert!(world.events.iter().any(
            |e| matches!(e, ActorEvent::Throw { velocity, .. } if velocity.x > 0.0)
        ));
    }
}
