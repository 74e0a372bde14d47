//! Simulation driver
//!
//! Owns every actor and the collaborators they share, advances actors once
//! per tick in id order and applies the events they emit.

use std::collections::BTreeMap;

use rand::SeedableRng;
use tracing::{debug, info, warn};
use vigil_core::{EntityId, SimTime};
use vigil_nav::NavGraph;
use vigil_physics::{BodyWorld, PhysicsWorld};

use crate::actor::Actor;
use crate::anim::AnimationTable;
use crate::commands::ActorCommand;
use crate::config::AiConfig;
use crate::context::{SimContext, SimRng};
use crate::error::AiError;
use crate::save::{SimulationArchive, ARCHIVE_VERSION};
use crate::script::{ScriptBook, ScriptHost};
use crate::world::{ActorEvent, EntityInfo, EntityTable};

/// Build a [`SimContext`] from disjoint borrows of a simulation's fields
macro_rules! sim_context {
    ($sim:expr, $table:expr) => {
        SimContext {
            time: $sim.time.level_time,
            frame_time: $sim.time.frame_time(),
            config: &$sim.config,
            world: $table,
            tracer: &$sim.world,
            nav: &mut $sim.nav,
            scripts: &mut $sim.scripts,
            anims: &$sim.anims,
            rng: &mut $sim.rng,
            events: &mut $sim.events,
        }
    };
}

/// A level full of actors
pub struct Simulation<W: BodyWorld = PhysicsWorld> {
    actors: BTreeMap<EntityId, Actor>,
    /// Players and props
    entities: BTreeMap<EntityId, EntityInfo>,
    pub world: W,
    pub nav: NavGraph,
    pub scripts: ScriptBook,
    pub anims: AnimationTable,
    pub config: AiConfig,
    pub time: SimTime,
    rng: SimRng,
    events: Vec<ActorEvent>,
    /// Events applied during the last tick
    applied: Vec<ActorEvent>,
    next_id: u64,
}

impl<W: BodyWorld> Simulation<W> {
    pub fn new(world: W, config: AiConfig, seed: u64) -> Self {
        Self {
            actors: BTreeMap::new(),
            entities: BTreeMap::new(),
            world,
            nav: NavGraph::new(),
            scripts: ScriptBook::new(),
            anims: AnimationTable::new(),
            config,
            time: SimTime::default(),
            rng: SimRng::seed_from_u64(seed),
            events: Vec::new(),
            applied: Vec::new(),
            next_id: 1,
        }
    }

    /// Reserve a fresh entity id
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a player or prop
    pub fn add_entity(&mut self, info: EntityInfo) {
        self.next_id = self.next_id.max(info.id.0 + 1);
        self.world.sync_body(info.id, info.bounds, info.origin);
        self.entities.insert(info.id, info);
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityInfo> {
        self.entities.get(&id)
    }

    /// Mutable access to a non-actor entity. Call [`Simulation::sync_entity`]
    /// after moving it.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut EntityInfo> {
        self.entities.get_mut(&id)
    }

    /// Push an entity's current position into the collision world
    pub fn sync_entity(&mut self, id: EntityId) {
        if let Some(info) = self.entities.get(&id) {
            self.world.sync_body(info.id, info.bounds, info.origin);
        }
    }

    pub fn actor(&self, id: EntityId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn actor_mut(&mut self, id: EntityId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    /// Events applied during the last tick, in order
    pub fn last_events(&self) -> &[ActorEvent] {
        &self.applied
    }

    /// Snapshot of every entity as actors see it
    fn entity_table(&self) -> EntityTable {
        let mut table = EntityTable::new();
        for info in self.entities.values() {
            table.insert(info.clone());
        }
        for actor in self.actors.values() {
            table.insert(actor.info());
        }
        table
    }

    /// Add an actor and bind its base script. An actor whose script cannot
    /// bind is removed again.
    pub fn spawn_actor(&mut self, mut actor: Actor, script: Option<&str>) -> Result<EntityId, AiError> {
        let id = actor.id;
        self.next_id = self.next_id.max(id.0 + 1);
        self.world.sync_body(id, actor.bounds, actor.origin);

        if let Some(label) = script {
            let mut table = self.entity_table();
            table.insert(actor.info());
            let bound = {
                let mut ctx = sim_context!(self, &table);
                actor.bind_script(label, &mut ctx)
            };
            if let Err(err) = bound {
                warn!("Removing actor '{}' ({}): {}", actor.name, id, err);
                self.world.remove_body(id);
                self.scripts.remove_threads(id);
                self.events.clear();
                return Err(err);
            }
        }

        info!("Spawned actor '{}' ({}) at {:?}", actor.name, id, actor.origin);
        self.actors.insert(id, actor);
        Ok(id)
    }

    /// Remove an actor and everything it holds
    pub fn remove_actor(&mut self, id: EntityId) -> Option<Actor> {
        let actor = self.actors.remove(&id)?;
        self.world.remove_body(id);
        self.scripts.remove_threads(id);
        self.nav.release_all(id);
        info!("Removed actor '{}' ({})", actor.name, id);
        Some(actor)
    }

    /// Apply script commands to an actor from outside any script thread
    pub fn command(&mut self, id: EntityId, commands: Vec<ActorCommand>) {
        let table = self.entity_table();
        let Some(mut actor) = self.actors.remove(&id) else {
            warn!("No actor {} to command", id);
            return;
        };
        {
            let mut ctx = sim_context!(self, &table);
            actor.apply_commands(None, commands, &mut ctx);
        }
        self.actors.insert(id, actor);
        let mut table = table;
        self.apply_events(&mut table);
    }

    /// Advance every actor by one tick
    pub fn tick(&mut self) {
        self.applied.clear();
        let ids: Vec<EntityId> = self.actors.keys().copied().collect();
        let mut table = self.entity_table();

        for id in ids {
            let Some(mut actor) = self.actors.remove(&id) else {
                continue;
            };
            {
                let mut ctx = sim_context!(self, &table);
                actor.think(&mut ctx);
            }
            self.world.sync_body(id, actor.bounds, actor.origin);
            table.insert(actor.info());
            self.actors.insert(id, actor);
            self.apply_events(&mut table);
        }

        self.time.step();
    }

    /// Feed real elapsed time and run the ticks that are due
    pub fn advance(&mut self, delta: f32) -> u32 {
        let steps = self.time.accumulate(delta);
        for _ in 0..steps {
            self.tick();
        }
        steps
    }

    fn apply_events(&mut self, table: &mut EntityTable) {
        while !self.events.is_empty() {
            let events = std::mem::take(&mut self.events);
            for event in events {
                self.apply_event(&event, table);
                self.applied.push(event);
            }
        }
    }

    fn apply_event(&mut self, event: &ActorEvent, table: &mut EntityTable) {
        match *event {
            ActorEvent::Remove(id) => {
                self.remove_actor(id);
                table.remove(id);
            }
            ActorEvent::ClearEnemies(id) => {
                if let Some(actor) = self.actors.get_mut(&id) {
                    actor.clear_enemies();
                }
            }
            ActorEvent::MeleeHit {
                attacker,
                target,
                damage,
                ..
            } => {
                if let Some(mut victim) = self.actors.remove(&target) {
                    {
                        let mut ctx = sim_context!(self, &*table);
                        victim.pain(damage, Some(attacker), &mut ctx);
                    }
                    table.insert(victim.info());
                    self.actors.insert(target, victim);
                } else if let Some(info) = self.entities.get_mut(&target) {
                    info.health -= damage;
                    table.insert(info.clone());
                }
            }
            ActorEvent::Throw { object, velocity, .. } => {
                if let Some(info) = self.entities.get_mut(&object) {
                    info.velocity = velocity;
                }
            }
            ActorEvent::Fire { shooter, target, .. } => {
                debug!("{} fired at {}", shooter, target);
            }
            ActorEvent::Pickup { .. } => {}
        }
    }

    /// Capture the whole simulation state
    pub fn save(&self) -> Result<SimulationArchive, AiError> {
        Ok(SimulationArchive {
            version: ARCHIVE_VERSION,
            time: self.time.clone(),
            next_id: self.next_id,
            actors: self.actors.values().cloned().collect(),
            entities: self.entities.values().cloned().collect(),
            nav: self.nav.clone(),
            threads: self.scripts.save_threads()?,
            rng_seed: self.rng.get_seed(),
            rng_word_pos: self.rng.get_word_pos(),
        })
    }

    /// Replace the simulation state with an archive. Script labels, animations
    /// and level geometry are content and stay as they are.
    pub fn restore(&mut self, archive: SimulationArchive) -> Result<(), AiError> {
        if archive.version != ARCHIVE_VERSION {
            return Err(AiError::ArchiveVersion {
                found: archive.version,
                expected: ARCHIVE_VERSION,
            });
        }
        self.scripts.load_threads(archive.threads)?;

        for id in self.actors.keys().chain(self.entities.keys()) {
            self.world.remove_body(*id);
        }
        self.actors = archive.actors.into_iter().map(|a| (a.id, a)).collect();
        self.entities = archive.entities.into_iter().map(|e| (e.id, e)).collect();
        for actor in self.actors.values() {
            self.world.sync_body(actor.id, actor.bounds, actor.origin);
        }
        for info in self.entities.values() {
            self.world.sync_body(info.id, info.bounds, info.origin);
        }

        self.nav = archive.nav;
        self.time = archive.time;
        self.next_id = archive.next_id;
        self.rng = SimRng::from_seed(archive.rng_seed);
        self.rng.set_word_pos(archive.rng_word_pos);
        self.events.clear();
        self.applied.clear();
        info!("Restored {} actors at t={:.2}", self.actors.len(), self.time.level_time);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{Behavior, FireMode};
    use crate::script::ScriptStep;
    use glam::Vec3;
    use vigil_physics::BoxWorld;

    const PLAYER: EntityId = EntityId(2);

    fn level<W: BodyWorld>(world: W) -> Simulation<W> {
        let mut sim = Simulation::new(world, AiConfig::default(), 11);
        sim.anims = AnimationTable::humanoid("guard");
        sim
    }

    fn sim() -> Simulation<BoxWorld> {
        level(BoxWorld::with_floor(0.0))
    }

    fn physics_level() -> Simulation<PhysicsWorld> {
        let mut world = PhysicsWorld::new();
        world.create_floor(0.0);
        world.refresh_queries();
        level(world)
    }

    fn guard(id: u64, origin: Vec3) -> Actor {
        Actor::new(EntityId(id), format!("guard{id}"), "guard", origin)
    }

    #[test]
    fn test_unbound_script_removes_actor() {
        let mut sim = sim();
        let result = sim.spawn_actor(guard(1, Vec3::ZERO), Some("guard::missing"));
        assert!(matches!(result, Err(AiError::UnresolvedScript { .. })));
        assert!(sim.actor(EntityId(1)).is_none());
    }

    #[test]
    fn test_range_change_dispatches_once() {
        let mut sim = sim();
        sim.scripts.define(
            "guard::main",
            vec![
                ScriptStep::Command(ActorCommand::DefineResponse {
                    action: "range_far".into(),
                    label: "guard::far".into(),
                }),
                ScriptStep::Command(ActorCommand::DefineResponse {
                    action: "range_near".into(),
                    label: "guard::near".into(),
                }),
                ScriptStep::Stop,
            ],
        );
        sim.scripts.define("guard::far", vec![ScriptStep::Command(ActorCommand::PopState)]);
        sim.scripts.define("guard::near", vec![ScriptStep::Command(ActorCommand::PopState)]);
        sim.add_entity(EntityInfo::player(PLAYER, Vec3::new(300.0, 0.0, 0.0)));
        let id = sim.spawn_actor(guard(1, Vec3::ZERO), Some("guard::main")).unwrap();

        for _ in 0..5 {
            sim.tick();
        }
        assert_eq!(sim.actor(id).unwrap().enemy(), Some(PLAYER));
        assert_eq!(sim.scripts.dispatch_count("guard::near"), 0);
        assert_eq!(sim.scripts.dispatch_count("guard::far"), 0);

        sim.entity_mut(PLAYER).unwrap().origin = Vec3::new(1200.0, 0.0, 0.0);
        sim.sync_entity(PLAYER);
        for _ in 0..5 {
            sim.tick();
        }
        assert_eq!(sim.scripts.dispatch_count("guard::far"), 1);
        assert_eq!(sim.scripts.dispatch_count("guard::near"), 0);
        assert!(sim.actor(id).unwrap().state_stack.is_empty());
    }

    /// Run FireOnSight against a player out of range and check the mode
    /// sequence, the shots fired and the finish once the player is dead
    fn fire_on_sight_sequence<W: BodyWorld>(mut sim: Simulation<W>) {
        // beyond the 1024 attack range, inside vision distance
        sim.add_entity(EntityInfo::player(PLAYER, Vec3::new(1300.0, 0.0, 0.0)));
        let id = sim.spawn_actor(guard(1, Vec3::ZERO), None).unwrap();
        sim.actor_mut(id).unwrap().attack(PLAYER);
        sim.command(id, vec![ActorCommand::behavior("FireOnSight", &[])]);

        let mode = |sim: &Simulation<W>| match &sim.actor(id).unwrap().behavior {
            Some(Behavior::FireOnSight(b)) => Some(b.mode()),
            _ => None,
        };
        let mut visited = vec![mode(&sim).unwrap()];
        let mut shots = 0;
        for _ in 0..120 {
            sim.tick();
            shots += sim
                .last_events()
                .iter()
                .filter(|e| matches!(e, ActorEvent::Fire { target, .. } if *target == PLAYER))
                .count();
            let current = mode(&sim).unwrap();
            if visited.last() != Some(&current) {
                visited.push(current);
            }
        }
        assert_eq!(
            visited,
            vec![FireMode::StartChase, FireMode::Chasing, FireMode::Aiming, FireMode::Firing]
        );
        assert!(shots >= 2);

        sim.entity_mut(PLAYER).unwrap().health = 0.0;
        sim.tick();
        assert!(!sim.actor(id).unwrap().is_behavior_active());
    }

    #[test]
    fn test_fire_on_sight_modes_in_order() {
        fire_on_sight_sequence(sim());
    }

    #[test]
    fn test_fire_on_sight_over_colliders() {
        fire_on_sight_sequence(physics_level());
    }

    #[test]
    fn test_collider_wall_hides_player_until_removed() {
        let mut sim = physics_level();
        let wall = sim
            .world
            .create_solid_box(Vec3::new(10.0, 200.0, 150.0), Vec3::new(300.0, 0.0, 150.0));
        sim.world.refresh_queries();
        sim.scripts.define(
            "guard::main",
            vec![
                ScriptStep::Command(ActorCommand::DefineResponse {
                    action: "sightenemy".into(),
                    label: "guard::seen".into(),
                }),
                ScriptStep::Stop,
            ],
        );
        sim.scripts.define("guard::seen", vec![ScriptStep::Command(ActorCommand::PopState)]);
        sim.add_entity(EntityInfo::player(PLAYER, Vec3::new(600.0, 0.0, 0.0)));
        let id = sim.spawn_actor(guard(1, Vec3::ZERO), Some("guard::main")).unwrap();

        for _ in 0..5 {
            sim.tick();
        }
        assert_eq!(sim.actor(id).unwrap().enemy(), None);
        assert_eq!(sim.scripts.dispatch_count("guard::seen"), 0);

        sim.world.remove_collider(wall);
        sim.world.refresh_queries();
        for _ in 0..5 {
            sim.tick();
        }
        assert_eq!(sim.actor(id).unwrap().enemy(), Some(PLAYER));
        assert_eq!(sim.scripts.dispatch_count("guard::seen"), 1);
        // standing still on the collider floor
        let guard = sim.actor(id).unwrap();
        assert!(guard.movement.on_ground);
        assert!(guard.origin.z.abs() < 1.0);
    }

    #[test]
    fn test_melee_hit_hurts_actor_target() {
        let mut sim = sim();
        let a = sim.spawn_actor(guard(1, Vec3::ZERO), None).unwrap();
        let b = sim.spawn_actor(guard(2, Vec3::new(50.0, 0.0, 0.0)), None).unwrap();
        sim.events.push(ActorEvent::MeleeHit {
            attacker: a,
            target: b,
            damage: 30.0,
            knockback: Vec3::ZERO,
        });
        let mut table = sim.entity_table();
        sim.apply_events(&mut table);
        let victim = sim.actor(b).unwrap();
        assert_eq!(victim.health, 70.0);
        // guards do not hate each other
        assert!(!victim.enemies.contains(a));
    }

    #[test]
    fn test_remove_event_drops_actor() {
        let mut sim = sim();
        let id = sim.spawn_actor(guard(1, Vec3::ZERO), None).unwrap();
        sim.events.push(ActorEvent::Remove(id));
        sim.tick();
        assert!(sim.actor(id).is_none());
        assert!(sim.last_events().contains(&ActorEvent::Remove(id)));
    }
}
