//! Actor: the AI-controlled entity and its decision state
//!
//! An actor owns at most one active behavior, a stack of suspended states,
//! its enemy list and its action → script response table. [`Actor::think`]
//! runs once per tick.

mod disposition;
mod locomotion;
mod sound;
mod state_stack;
mod state_table;
mod targeting;

pub use disposition::Disposition;
pub use locomotion::{Locomotion, MoveResult, MoveType};
pub use sound::Stimulus;
pub use state_stack::ActorState;
pub use state_table::{ActionResponse, StateTable};
pub use targeting::{EnemySet, RangeBucket};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vigil_core::angles::{angle_mod, vec_to_yaw};
use vigil_core::{Bounds, EntityId};
use vigil_nav::Path;

use crate::anim::AnimState;
use crate::behavior::Behavior;
use crate::context::SimContext;
use crate::script::{ScriptValue, ThreadId};
use crate::world::{ActorEvent, ActorInfo, EntityFlags, EntityInfo, EntityTable};

/// Perception tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perception {
    /// Full field of view in degrees
    pub fov: f32,
    /// Cosine of half the field of view
    pub fov_dot: f32,
    pub vision_distance: f32,
    /// Eye position relative to the origin
    pub eye_offset: Vec3,
}

impl Perception {
    pub fn set_fov(&mut self, degrees: f32) {
        self.fov = degrees.clamp(1.0, 360.0);
        self.fov_dot = (self.fov * 0.5).to_radians().cos();
    }
}

impl Default for Perception {
    fn default() -> Self {
        let mut perception = Self {
            fov: 0.0,
            fov_dot: 0.0,
            vision_distance: 2048.0,
            eye_offset: Vec3::new(0.0, 0.0, 64.0),
        };
        perception.set_fov(90.0);
        perception
    }
}

/// Weapon and melee parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatParams {
    pub has_weapon: bool,
    pub attack_range: f32,
    pub melee_range: f32,
    pub melee_damage: f32,
    /// Seconds between shots
    pub fire_interval: f32,
    pub next_fire_time: f32,
}

impl Default for CombatParams {
    fn default() -> Self {
        Self {
            has_weapon: true,
            attack_range: 1024.0,
            melee_range: 96.0,
            melee_damage: 10.0,
            fire_interval: 1.0,
            next_fire_time: 0.0,
        }
    }
}

/// An action waiting to be dispatched once the current evaluation is over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub name: String,
    pub force: bool,
}

/// An AI-controlled entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: EntityId,
    pub name: String,
    /// Model whose animations this actor plays
    pub model: String,
    pub origin: Vec3,
    /// (pitch, yaw, roll) in degrees
    pub angles: Vec3,
    pub bounds: Bounds,
    pub health: f32,
    pub max_health: f32,
    pub dead: bool,
    pub disposition: Disposition,
    pub perception: Perception,
    pub combat: CombatParams,

    // Targeting
    pub enemies: EnemySet,
    pub current_enemy: Option<EntityId>,
    /// The current enemy has been confirmed by a sighting dispatch
    pub seen_enemy: bool,
    pub last_range: RangeBucket,
    pub last_enemy: Option<EntityId>,
    /// Number of candidate scorings performed (diagnostics)
    pub targets_scored: u64,

    // Execution
    pub behavior: Option<Behavior>,
    pub state_name: String,
    pub state_stack: Vec<ActorState>,
    pub actions: StateTable,
    /// Script thread bound to this actor
    pub thread: Option<ThreadId>,
    /// Thread waiting for the active behavior to complete
    pub behavior_thread: Option<ThreadId>,
    pub pending: Vec<PendingAction>,
    #[serde(skip)]
    dispatch_depth: u32,

    // Body
    pub anim: AnimState,
    pub movement: Locomotion,
    pub path: Option<Path>,

    // Reactions
    pub noise_position: Option<Vec3>,
    pub next_sound_time: f32,
    pub jump_target: Option<Vec3>,
    pub held_object: Option<EntityId>,
}

impl Actor {
    pub fn new(id: EntityId, name: impl Into<String>, model: impl Into<String>, origin: Vec3) -> Self {
        Self {
            id,
            name: name.into(),
            model: model.into(),
            origin,
            angles: Vec3::ZERO,
            bounds: Bounds::humanoid(),
            health: 100.0,
            max_health: 100.0,
            dead: false,
            disposition: Disposition::Enemy,
            perception: Perception::default(),
            combat: CombatParams::default(),
            enemies: EnemySet::default(),
            current_enemy: None,
            seen_enemy: false,
            last_range: RangeBucket::Far,
            last_enemy: None,
            targets_scored: 0,
            behavior: None,
            state_name: String::new(),
            state_stack: Vec::new(),
            actions: StateTable::default(),
            thread: None,
            behavior_thread: None,
            pending: Vec::new(),
            dispatch_depth: 0,
            anim: AnimState::default(),
            movement: Locomotion::default(),
            path: None,
            noise_position: None,
            next_sound_time: 0.0,
            jump_target: None,
            held_object: None,
        }
    }

    /// Advance this actor by one tick
    pub fn think(&mut self, ctx: &mut SimContext<'_>) {
        if self.dead {
            return;
        }
        self.movement.frame_delta = None;
        self.movement.water_level = self.water_level_at(self.origin, ctx);

        self.update_enemies(ctx);
        self.advance_anim(ctx);
        self.flush_pending(ctx);

        self.evaluate_behavior(ctx);
        self.flush_pending(ctx);

        self.move_step(ctx);
        self.flush_pending(ctx);
    }

    /// What other actors observe about this one
    pub fn info(&self) -> EntityInfo {
        EntityInfo {
            id: self.id,
            name: self.name.clone(),
            origin: self.origin,
            velocity: self.movement.last_delta,
            bounds: self.bounds,
            yaw: self.angles.y,
            health: self.health,
            max_health: self.max_health,
            flags: EntityFlags::SENTIENT,
            actor: Some(ActorInfo {
                disposition: self.disposition,
                enemy: self.confirmed_enemy(),
            }),
        }
    }

    pub fn yaw(&self) -> f32 {
        self.angles.y
    }

    pub fn eye_pos(&self) -> Vec3 {
        self.origin + self.perception.eye_offset
    }

    /// Yaw that faces `point`
    pub fn yaw_to(&self, point: Vec3) -> f32 {
        vec_to_yaw(point - self.origin)
    }

    /// Snap the facing toward `point`
    pub fn face(&mut self, point: Vec3) {
        self.angles.y = angle_mod(self.yaw_to(point));
    }

    pub fn is_behavior_active(&self) -> bool {
        self.behavior.is_some()
    }

    pub fn behavior_kind(&self) -> Option<&'static str> {
        self.behavior.as_ref().map(|b| b.kind())
    }

    // Enemy helpers

    /// Current enemy, confirmed or tentative
    pub fn enemy(&self) -> Option<EntityId> {
        self.current_enemy
    }

    /// Current enemy once a sighting has been dispatched
    pub fn confirmed_enemy(&self) -> Option<EntityId> {
        self.current_enemy.filter(|_| self.seen_enemy)
    }

    pub fn enemy_info<'w>(&self, ctx: &SimContext<'w>) -> Option<&'w EntityInfo> {
        let world: &'w EntityTable = ctx.world;
        self.current_enemy.and_then(|id| world.get(id))
    }

    /// The current enemy if it still exists and is alive
    pub fn live_enemy<'w>(&self, ctx: &SimContext<'w>) -> Option<&'w EntityInfo> {
        self.enemy_info(ctx).filter(|e| e.is_alive())
    }

    // Animation

    pub fn has_anim(&self, name: &str, ctx: &SimContext<'_>) -> bool {
        ctx.anims.find(&self.model, name).is_some()
    }

    /// Start playing `name`; the movement speed follows the animation
    pub fn set_anim(&mut self, name: &str, ctx: &SimContext<'_>) -> bool {
        self.set_anim_with(name, None, ctx)
    }

    /// Start playing `name`, dispatching `on_done` when its first cycle ends
    pub fn set_anim_with(&mut self, name: &str, on_done: Option<String>, ctx: &SimContext<'_>) -> bool {
        let Some(info) = ctx.anims.find(&self.model, name) else {
            warn!("Actor '{}' has no animation '{}'", self.name, name);
            return false;
        };
        self.anim = AnimState {
            name: name.to_string(),
            info: Some(info),
            started: ctx.time,
            cycles: 0,
            on_done,
        };
        self.movement.speed = info.speed();
        self.movement.total_delta = info.delta;
        true
    }

    fn advance_anim(&mut self, ctx: &SimContext<'_>) {
        let Some(info) = self.anim.info else {
            return;
        };
        if info.duration <= 0.0 || ctx.time < self.anim.started + info.duration {
            return;
        }
        self.anim.cycles += 1;
        self.anim.started = ctx.time;
        if let Some(action) = self.anim.on_done.take() {
            self.queue_action(&action, false);
        }
    }

    /// Dispatch `name` after the current evaluation
    pub fn queue_action(&mut self, name: &str, force: bool) {
        self.pending.push(PendingAction {
            name: name.to_string(),
            force,
        });
    }

    // Combat

    pub fn weapon_ready(&self, ctx: &SimContext<'_>) -> bool {
        self.combat.has_weapon && ctx.time >= self.combat.next_fire_time
    }

    /// Fire at `target` and start the refire timer
    pub fn fire(&mut self, target: &EntityInfo, ctx: &mut SimContext<'_>) {
        let origin = self.eye_pos();
        let direction = (target.center() - origin).normalize_or_zero();
        ctx.events.push(ActorEvent::Fire {
            shooter: self.id,
            target: target.id,
            origin,
            direction,
        });
        self.combat.next_fire_time = ctx.time + self.combat.fire_interval;
    }

    /// Land a melee blow on `target`
    pub fn strike(&mut self, target: &EntityInfo, knockback: f32, ctx: &mut SimContext<'_>) {
        let push = (target.origin - self.origin).normalize_or_zero() * knockback;
        ctx.events.push(ActorEvent::MeleeHit {
            attacker: self.id,
            target: target.id,
            damage: self.combat.melee_damage,
            knockback: push,
        });
    }

    // Damage

    /// Take damage; dies at zero health
    pub fn pain(&mut self, damage: f32, attacker: Option<EntityId>, ctx: &mut SimContext<'_>) {
        if self.dead {
            return;
        }
        self.health -= damage;
        if self.health <= 0.0 {
            self.kill(ctx);
            return;
        }
        if let Some(info) = attacker.and_then(|id| ctx.world.get(id)) {
            if self.hates(info) {
                self.enemies.add(info.id);
            }
        }
        self.do_action("pain", false, ctx);
    }

    /// Die: drop every suspended state, end the behavior and run `death`
    pub fn kill(&mut self, ctx: &mut SimContext<'_>) {
        if self.dead {
            return;
        }
        info!("Actor '{}' ({}) died", self.name, self.id);
        self.dead = true;
        self.health = self.health.min(0.0);
        self.clear_state_stack(ctx);
        self.end_behavior(None, ctx);
        self.clear_enemies();
        self.path = None;
        ctx.nav.release_all(self.id);
        self.do_action("death", true, ctx);
    }

    /// Publish actor state to its script thread before a dispatch
    fn export_vars(&self, thread: ThreadId, ctx: &mut SimContext<'_>) {
        let scripts = &mut *ctx.scripts;
        scripts.set_var(thread, "self", ScriptValue::Entity(Some(self.id)));
        scripts.set_var(thread, "origin", ScriptValue::Vector(self.origin));
        scripts.set_var(thread, "yaw", ScriptValue::Float(self.angles.y));
        scripts.set_var(thread, "health", ScriptValue::Float(self.health));
        scripts.set_var(thread, "enemy", ScriptValue::Entity(self.current_enemy));
        scripts.set_var(thread, "state", ScriptValue::Str(self.state_name.clone()));
        scripts.set_var(
            thread,
            "range",
            ScriptValue::Str(self.last_range.name().to_string()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestWorld;

    #[test]
    fn test_fov_dot_cached() {
        let mut perception = Perception::default();
        perception.set_fov(180.0);
        assert!(perception.fov_dot.abs() < 1e-6);
        perception.set_fov(720.0);
        assert_eq!(perception.fov, 360.0);
    }

    #[test]
    fn test_anim_completion_queues_action() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        world.scripts.define("guard::fired", vec![]);
        actor.actions.define("fire_done", "guard::fired");

        {
            let ctx = world.ctx();
            assert!(actor.set_anim_with("fire", Some("fire_done".to_string()), &ctx));
        }
        assert_eq!(actor.movement.speed, 0.0);

        world.run(&mut actor, 7);
        assert_eq!(world.scripts.dispatch_count("guard::fired"), 1);
        assert_eq!(actor.state_name, "fire_done");
        // the dispatch suspended the firing state and went idle
        assert_eq!(actor.anim.name, "idle");
        assert_eq!(actor.state_stack.len(), 1);
        assert_eq!(actor.state_stack[0].anim, "fire");
        assert_eq!(actor.state_stack[0].anim_done, None);

        world.run(&mut actor, 6);
        assert_eq!(world.scripts.dispatch_count("guard::fired"), 1);
    }

    #[test]
    fn test_kill_clears_stack_and_runs_death() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        world.scripts.define("guard::alert", vec![]);
        world.scripts.define("guard::death", vec![]);
        actor.actions.define("alert", "guard::alert");
        actor.actions.define("death", "guard::death");

        let mut ctx = world.ctx();
        assert!(actor.do_action("alert", false, &mut ctx));
        assert_eq!(actor.state_stack.len(), 1);

        actor.kill(&mut ctx);
        assert!(actor.dead);
        // the death dispatch itself pushes one fresh state
        assert_eq!(actor.state_stack.len(), 1);
        assert_eq!(actor.state_name, "death");
        drop(ctx);
        assert_eq!(world.scripts.dispatch_count("guard::death"), 1);
    }

    #[test]
    fn test_pain_adds_hated_attacker() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        world.add_player(2, Vec3::new(300.0, 0.0, 0.0));

        let mut ctx = world.ctx();
        actor.pain(10.0, Some(EntityId(2)), &mut ctx);
        assert_eq!(actor.health, 90.0);
        assert!(actor.enemies.contains(EntityId(2)));

        actor.pain(200.0, None, &mut ctx);
        assert!(actor.dead);
    }
}
