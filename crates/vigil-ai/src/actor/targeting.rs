//! Enemy tracking: perception, target choice and range announcements

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vigil_core::angles::yaw_to_dir;
use vigil_core::EntityId;

use super::{Actor, Disposition};
use crate::config::AiConfig;
use crate::context::SimContext;
use crate::world::{ActorEvent, EntityFlags, EntityInfo};

/// Distance class of the current enemy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RangeBucket {
    Melee,
    Near,
    Mid,
    Far,
}

impl RangeBucket {
    pub fn from_dist_sq(dist_sq: f32, config: &AiConfig) -> Self {
        if dist_sq < config.melee_range * config.melee_range {
            Self::Melee
        } else if dist_sq < config.near_range * config.near_range {
            Self::Near
        } else if dist_sq < config.mid_range * config.mid_range {
            Self::Mid
        } else {
            Self::Far
        }
    }

    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Melee => "melee",
            Self::Near => "near",
            Self::Mid => "mid",
            Self::Far => "far",
        }
    }

    /// Action dispatched when the enemy enters this bucket
    pub fn action_name(self) -> &'static str {
        match self {
            Self::Melee => "range_melee",
            Self::Near => "range_near",
            Self::Mid => "range_mid",
            Self::Far => "range_far",
        }
    }
}

/// Known hostile entities, in the order they were first noticed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnemySet {
    members: Vec<EntityId>,
    newest: Option<EntityId>,
}

impl EnemySet {
    /// Add an enemy; returns false if it was already known
    pub fn add(&mut self, id: EntityId) -> bool {
        if self.members.contains(&id) {
            return false;
        }
        self.members.push(id);
        self.newest = Some(id);
        true
    }

    pub fn remove(&mut self, id: EntityId) {
        self.members.retain(|m| *m != id);
        if self.newest == Some(id) {
            self.newest = None;
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(EntityId) -> bool) {
        self.members.retain(|m| keep(*m));
        if self.newest.is_some_and(|n| !self.members.contains(&n)) {
            self.newest = None;
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }

    /// Most recently added enemy
    pub fn newest(&self) -> Option<EntityId> {
        self.newest
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.members.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn clear(&mut self) {
        self.members.clear();
        self.newest = None;
    }
}

impl Actor {
    /// Range bucket of an entity
    pub fn range_to(&self, other: &EntityInfo, config: &AiConfig) -> RangeBucket {
        RangeBucket::from_dist_sq(self.origin.distance_squared(other.origin), config)
    }

    /// Vision distance, field of view and line of sight
    pub fn can_see(&self, other: &EntityInfo, ctx: &SimContext<'_>) -> bool {
        let eye = self.eye_pos();
        let target = other.center();
        let delta = target - eye;
        let vision = self.perception.vision_distance;
        if delta.length_squared() > vision * vision {
            return false;
        }

        if self.perception.fov < 360.0 {
            let flat = Vec3::new(delta.x, delta.y, 0.0).normalize_or_zero();
            if flat != Vec3::ZERO && yaw_to_dir(self.angles.y).dot(flat) < self.perception.fov_dot {
                return false;
            }
        }

        ctx.tracer.sight(eye, target, self.id, Some(other.id))
    }

    /// Forget every enemy
    pub fn clear_enemies(&mut self) {
        self.enemies.clear();
        self.current_enemy = None;
        self.seen_enemy = false;
        self.last_enemy = None;
    }

    /// Make `target` the confirmed current enemy
    pub fn attack(&mut self, target: EntityId) {
        self.enemies.add(target);
        self.current_enemy = Some(target);
        self.seen_enemy = true;
    }

    /// Scan the world for new enemies and adopt the enemies of allies
    pub fn get_visible_targets(&mut self, ctx: &mut SimContext<'_>) {
        let world = ctx.world;
        let confirmed = self.confirmed_enemy();

        for other in world.iter() {
            if other.id == self.id || !other.flags.contains(EntityFlags::SENTIENT) {
                continue;
            }
            if other.flags.intersects(EntityFlags::NOTARGET | EntityFlags::HIDDEN) {
                continue;
            }
            if other
                .actor
                .is_some_and(|a| a.disposition == Disposition::Inanimate)
            {
                continue;
            }

            if other.is_alive()
                && Some(other.id) != confirmed
                && !self.enemies.contains(other.id)
                && self.hates(other)
                && self.can_see(other, ctx)
            {
                debug!("Actor '{}' spotted {}", self.name, other.id);
                self.enemies.add(other.id);
            }

            if !self.likes(other) {
                continue;
            }
            let Some(ally_enemy) = other.actor.and_then(|a| a.enemy) else {
                continue;
            };
            let Some(threat) = world.get(ally_enemy) else {
                continue;
            };
            if threat.is_alive() && self.hates(threat) {
                if self.enemies.add(threat.id) {
                    debug!("Actor '{}' alerted to {} by {}", self.name, threat.id, other.id);
                }
                if !other.is_alive() {
                    ctx.events.push(ActorEvent::ClearEnemies(other.id));
                }
            }
        }
    }

    /// Pick the enemy to engage, pruning dead or missing ones on the way
    pub fn best_target(&mut self, ctx: &SimContext<'_>) -> Option<EntityId> {
        let world = ctx.world;
        self.enemies
            .retain(|id| world.get(id).is_some_and(|e| e.is_alive()));

        if self.enemies.len() == 1 {
            return self.enemies.iter().next();
        }

        let config = ctx.config;
        let newest = self.enemies.newest();
        let candidates: Vec<EntityId> = self.enemies.iter().collect();
        let mut best: Option<(f32, EntityId)> = None;

        for id in candidates {
            let Some(info) = world.get(id) else {
                continue;
            };
            self.targets_scored += 1;

            let mut score = (self.range_to(info, config).index() + 1) as f32;
            if info.health < config.weak_health {
                score *= config.weak_weight;
            }
            if info.health > self.health {
                score *= config.stronger_weight;
            }
            if self.can_see(info, ctx) {
                score *= config.visible_weight;
            }
            if newest == Some(id) {
                score *= config.newest_weight;
            }

            if best.map_or(true, |(s, _)| score < s) {
                best = Some((score, id));
            }
        }

        best.map(|(_, id)| id)
    }

    /// Per-tick targeting: perceive, choose, confirm and announce range changes
    pub fn update_enemies(&mut self, ctx: &mut SimContext<'_>) {
        if self.dead {
            return;
        }
        self.get_visible_targets(ctx);

        let Some(best) = self.best_target(ctx) else {
            self.current_enemy = None;
            self.seen_enemy = false;
            self.last_enemy = None;
            return;
        };

        if self.current_enemy != Some(best) {
            debug!("Actor '{}' now targets {}", self.name, best);
            self.current_enemy = Some(best);
            self.seen_enemy = false;
        }

        if !self.seen_enemy && self.do_action("sightenemy", false, ctx) {
            self.seen_enemy = true;
        }

        let Some(info) = ctx.world.get(best) else {
            return;
        };
        let range = self.range_to(info, ctx.config);
        // a freshly chosen enemy takes its bucket silently
        if self.last_enemy == Some(best) && range != self.last_range {
            self.do_action(range.action_name(), false, ctx);
        }
        self.last_enemy = Some(best);
        self.last_range = range;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestWorld;

    #[test]
    fn test_bucket_thresholds() {
        let config = AiConfig::default();
        assert_eq!(RangeBucket::from_dist_sq(100.0 * 100.0, &config), RangeBucket::Melee);
        assert_eq!(RangeBucket::from_dist_sq(120.0 * 120.0, &config), RangeBucket::Near);
        assert_eq!(RangeBucket::from_dist_sq(700.0 * 700.0, &config), RangeBucket::Mid);
        assert_eq!(RangeBucket::from_dist_sq(1000.0 * 1000.0, &config), RangeBucket::Far);
    }

    #[test]
    fn test_single_enemy_bypasses_scoring() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        world.add_player(2, Vec3::new(300.0, 0.0, 0.0));
        actor.enemies.add(EntityId(2));

        let ctx = world.ctx();
        assert_eq!(actor.best_target(&ctx), Some(EntityId(2)));
        assert_eq!(actor.targets_scored, 0);
    }

    #[test]
    fn test_scoring_prefers_close_weak_enemy() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        world.add_player(2, Vec3::new(800.0, 0.0, 0.0));
        world.add_player(3, Vec3::new(300.0, 0.0, 0.0));
        world.table.get_mut(EntityId(3)).unwrap().health = 10.0;
        actor.enemies.add(EntityId(3));
        actor.enemies.add(EntityId(2));

        let ctx = world.ctx();
        // far one: mid (3) * visible 0.5 * newest 0.75 = 1.125
        // near one: near (2) * weak 0.5 * visible 0.5 = 0.5
        assert_eq!(actor.best_target(&ctx), Some(EntityId(3)));
        assert_eq!(actor.targets_scored, 2);
        assert_eq!(actor.best_target(&ctx), Some(EntityId(3)));
    }

    #[test]
    fn test_dead_enemies_pruned() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        world.add_player(2, Vec3::new(300.0, 0.0, 0.0));
        world.add_player(3, Vec3::new(400.0, 0.0, 0.0));
        world.table.get_mut(EntityId(2)).unwrap().health = 0.0;
        actor.enemies.add(EntityId(2));
        actor.enemies.add(EntityId(3));
        actor.enemies.add(EntityId(4));

        let ctx = world.ctx();
        assert_eq!(actor.best_target(&ctx), Some(EntityId(3)));
        assert_eq!(actor.enemies.len(), 1);
    }

    #[test]
    fn test_sight_respects_fov_and_walls() {
        let mut world = TestWorld::new();
        let actor = world.actor(1, Vec3::ZERO);
        world.add_player(2, Vec3::new(300.0, 0.0, 0.0));
        world.add_player(3, Vec3::new(-300.0, 0.0, 0.0));
        world
            .tracer
            .add_solid(Vec3::new(150.0, 50.0, 0.0), Vec3::new(250.0, 150.0, 200.0));
        world.add_player(4, Vec3::new(400.0, 200.0, 0.0));

        let ctx = world.ctx();
        assert!(actor.can_see(ctx.world.get(EntityId(2)).unwrap(), &ctx));
        assert!(!actor.can_see(ctx.world.get(EntityId(3)).unwrap(), &ctx));
        assert!(!actor.can_see(ctx.world.get(EntityId(4)).unwrap(), &ctx));
    }

    #[test]
    fn test_ally_alarm_propagates() {
        let mut world = TestWorld::new();
        let mut actor = world.actor(1, Vec3::ZERO);
        // behind the actor, so it cannot see the player itself
        world.add_player(3, Vec3::new(-500.0, 0.0, 0.0));

        let mut ally = world.actor(2, Vec3::new(100.0, 0.0, 0.0));
        ally.attack(EntityId(3));
        ally.health = 0.0;
        world.table.insert(ally.info());

        let mut ctx = world.ctx();
        actor.get_visible_targets(&mut ctx);
        assert!(actor.enemies.contains(EntityId(3)));
        assert_eq!(ctx.events.as_slice(), &[ActorEvent::ClearEnemies(EntityId(2))]);
    }
}
