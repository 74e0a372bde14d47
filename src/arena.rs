//! Demo arena
//!
//! A walled yard with crates for cover, a pond, a patrol route and a player
//! who walks a fixed loop. Guards patrol, engage and take cover; civilians
//! wander and run for the exits when hurt; fish swim in the pond.

use anyhow::{Context, Result};
use glam::Vec3;
use tracing::info;
use vigil_ai::{
    Actor, ActorCommand, ActorEvent, AnimationTable, Disposition, EntityInfo, ScriptStep, Simulation,
    SimulationArchive,
};
use vigil_core::{Bounds, EntityId, SimTime};
use vigil_nav::{NodeFlags, NodeId};
use vigil_physics::{ContentMask, PhysicsWorld, Tracer};

use crate::settings::VigilSettings;

pub const LEVEL_NAME: &str = "yard";

const HALF_SIZE: f32 = 1000.0;
const WALL_HEIGHT: f32 = 256.0;
const NODE_SPACING: f32 = 250.0;
const PLAYER_SPEED: f32 = 150.0;
const SHOT_DAMAGE: f32 = 4.0;

/// Crates: (center, half extents)
const CRATES: [(Vec3, Vec3); 4] = [
    (Vec3::new(-300.0, 300.0, 48.0), Vec3::new(48.0, 48.0, 48.0)),
    (Vec3::new(300.0, 300.0, 48.0), Vec3::new(48.0, 48.0, 48.0)),
    (Vec3::new(-300.0, -300.0, 48.0), Vec3::new(48.0, 48.0, 48.0)),
    (Vec3::new(0.0, 0.0, 64.0), Vec3::new(96.0, 32.0, 64.0)),
];

/// The player's walking loop
const PLAYER_LOOP: [Vec3; 4] = [
    Vec3::new(-700.0, -700.0, 0.0),
    Vec3::new(700.0, -700.0, 0.0),
    Vec3::new(700.0, 700.0, 0.0),
    Vec3::new(-700.0, 700.0, 0.0),
];

const POND_MINS: Vec3 = Vec3::new(450.0, -900.0, 0.0);
const POND_MAXS: Vec3 = Vec3::new(900.0, -450.0, 160.0);

pub struct Arena {
    pub sim: Simulation,
    pub player: EntityId,
    waypoint: usize,
    pub shots_taken: u32,
}

impl Arena {
    pub fn build(settings: &VigilSettings) -> Result<Self> {
        let mut sim = Simulation::new(build_geometry(), settings.ai.clone(), settings.simulation.seed);
        sim.time = SimTime::new(settings.simulation.time_config()).context("Invalid clock settings")?;
        sim.anims = AnimationTable::humanoid("guard");
        add_fish_anims(&mut sim.anims);
        build_nav(&mut sim)?;
        define_scripts(&mut sim);

        let player = sim.next_id();
        sim.add_entity(EntityInfo::player(player, PLAYER_LOOP[0]));

        let mut arena = Self {
            sim,
            player,
            waypoint: 1,
            shots_taken: 0,
        };
        arena.populate()?;
        Ok(arena)
    }

    /// Rebuild the level and continue from a saved archive
    pub fn resume(settings: &VigilSettings, archive: SimulationArchive) -> Result<Self> {
        let mut arena = Self::build(settings)?;
        arena.sim.restore(archive).context("Failed to restore simulation")?;
        if let Some(player) = arena.sim.entity(arena.player) {
            let origin = player.origin;
            let nearest = PLAYER_LOOP
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.distance_squared(origin).total_cmp(&b.distance_squared(origin)))
                .map_or(0, |(i, _)| i);
            arena.waypoint = (nearest + 1) % PLAYER_LOOP.len();
        }
        Ok(arena)
    }

    fn populate(&mut self) -> Result<()> {
        let sim = &mut self.sim;

        for (i, origin) in [Vec3::new(-600.0, 0.0, 0.0), Vec3::new(600.0, 200.0, 0.0)]
            .into_iter()
            .enumerate()
        {
            let id = sim.next_id();
            let mut guard = Actor::new(id, format!("guard{}", i + 1), "guard", origin);
            guard.disposition = Disposition::Enemy;
            sim.spawn_actor(guard, Some("guard::main"))?;
        }

        for (i, origin) in [Vec3::new(-100.0, 500.0, 0.0), Vec3::new(100.0, -500.0, 0.0)]
            .into_iter()
            .enumerate()
        {
            let id = sim.next_id();
            let mut civilian = Actor::new(id, format!("civilian{}", i + 1), "guard", origin);
            civilian.disposition = Disposition::Civilian;
            civilian.combat.has_weapon = false;
            sim.spawn_actor(civilian, Some("civilian::main"))?;
        }

        let id = sim.next_id();
        let mut fish = Actor::new(id, "fish", "fish", Vec3::new(675.0, -675.0, 60.0));
        fish.disposition = Disposition::Animal;
        fish.bounds = Bounds::new(Vec3::new(-8.0, -8.0, 0.0), Vec3::new(8.0, 8.0, 16.0));
        fish.perception.eye_offset = Vec3::new(0.0, 0.0, 8.0);
        fish.combat.has_weapon = false;
        sim.spawn_actor(fish, Some("fish::main"))?;
        Ok(())
    }

    /// Walk the player one tick along its loop, then tick the simulation
    pub fn step(&mut self) {
        self.move_player();
        self.sim.tick();

        let hits = self
            .sim
            .last_events()
            .iter()
            .filter(|e| matches!(e, ActorEvent::Fire { target, .. } if *target == self.player))
            .count() as u32;
        if hits > 0 {
            self.shots_taken += hits;
            self.hurt_player(hits as f32 * SHOT_DAMAGE);
        }
    }

    fn move_player(&mut self) {
        let step = PLAYER_SPEED * self.sim.time.frame_time();
        let Some(player) = self.sim.entity_mut(self.player) else {
            return;
        };
        if !player.is_alive() {
            return;
        }
        let goal = PLAYER_LOOP[self.waypoint];
        let delta = goal - player.origin;
        if delta.length() <= step {
            player.origin = goal;
            self.waypoint = (self.waypoint + 1) % PLAYER_LOOP.len();
        } else {
            player.origin += delta.normalize() * step;
        }
        player.yaw = vigil_core::angles::vec_to_yaw(delta);
        self.sim.sync_entity(self.player);
    }

    fn hurt_player(&mut self, damage: f32) {
        let Some(player) = self.sim.entity_mut(self.player) else {
            return;
        };
        if !player.is_alive() {
            return;
        }
        player.health -= damage;
        if !player.is_alive() {
            info!("Player went down after {} hits", self.shots_taken);
        }
    }

    /// One status line per actor
    pub fn report(&self) {
        let time = self.sim.time.level_time;
        if let Some(player) = self.sim.entity(self.player) {
            info!("[{:7.2}] player at {:?} health {:.0}", time, player.origin, player.health);
        }
        for actor in self.sim.actors() {
            let doing = actor
                .behavior
                .as_ref()
                .map(|b| b.show_info())
                .unwrap_or_else(|| "nothing".to_string());
            info!(
                "[{:7.2}] {} state '{}' stack {} at ({:.0}, {:.0}, {:.0}): {}",
                time,
                actor.name,
                actor.state_name,
                actor.state_stack.len(),
                actor.origin.x,
                actor.origin.y,
                actor.origin.z,
                doing
            );
        }
    }
}

fn build_geometry() -> PhysicsWorld {
    let mut world = PhysicsWorld::new();
    world.create_floor(0.0);
    let h = HALF_SIZE;
    let t = 16.0;
    let z = WALL_HEIGHT * 0.5;
    for (half, center) in [
        (Vec3::new(h + 2.0 * t, t, z), Vec3::new(0.0, -h - t, z)),
        (Vec3::new(h + 2.0 * t, t, z), Vec3::new(0.0, h + t, z)),
        (Vec3::new(t, h, z), Vec3::new(-h - t, 0.0, z)),
        (Vec3::new(t, h, z), Vec3::new(h + t, 0.0, z)),
    ] {
        world.create_solid_box(half, center);
    }
    for (center, half) in CRATES {
        world.create_solid_box(half, center);
    }
    let pond_half = (POND_MAXS - POND_MINS) * 0.5;
    world.create_volume(pond_half, POND_MINS + pond_half, ContentMask::WATER);
    world.refresh_queries();
    world
}

fn add_fish_anims(anims: &mut AnimationTable) {
    anims.add("fish", "idle", 1.0, Vec3::ZERO);
    anims.add("fish", "swim", 1.0, Vec3::new(80.0, 0.0, 0.0));
}

/// Grid of path nodes, cover nodes behind the crates and flee nodes in the
/// corners, linked where they can see each other
fn build_nav(sim: &mut Simulation) -> Result<()> {
    let tracer = &sim.world;
    let nav = &mut sim.nav;
    let blocked = |p: Vec3| {
        tracer
            .point_contents(p + Vec3::new(0.0, 0.0, 36.0))
            .intersects(ContentMask::SOLID | ContentMask::WATER)
    };

    let mut nodes: Vec<NodeId> = Vec::new();
    let steps = (HALF_SIZE / NODE_SPACING) as i32;
    for ix in -steps + 1..steps {
        for iy in -steps + 1..steps {
            let p = Vec3::new(ix as f32 * NODE_SPACING, iy as f32 * NODE_SPACING, 0.0);
            if blocked(p) {
                continue;
            }
            let corner = ix.abs() == steps - 1 && iy.abs() == steps - 1;
            let flags = if corner { NodeFlags::FLEE } else { NodeFlags::empty() };
            nodes.push(nav.add_node(p, flags));
        }
    }
    for (center, half) in CRATES {
        for side in [-1.0, 1.0] {
            let p = Vec3::new(center.x, center.y + side * (half.y + 40.0), 0.0);
            if !blocked(p) {
                nodes.push(nav.add_node(p, NodeFlags::COVER));
            }
        }
    }

    let eye = Vec3::new(0.0, 0.0, 40.0);
    let reach_sq = (NODE_SPACING * 1.5) * (NODE_SPACING * 1.5);
    for (i, &a) in nodes.iter().enumerate() {
        for &b in &nodes[i + 1..] {
            let (Some(pa), Some(pb)) = (nav.node(a).map(|n| n.origin), nav.node(b).map(|n| n.origin)) else {
                continue;
            };
            if pa.distance_squared(pb) > reach_sq {
                continue;
            }
            let tr = tracer.trace(pa + eye, Bounds::POINT, pb + eye, None, ContentMask::MASK_SOLID);
            if !tr.hit() {
                nav.connect(a, b);
            }
        }
    }

    let post_a = nav
        .nearest_node(Vec3::new(-500.0, -500.0, 0.0), None, None)
        .context("Arena has no path nodes")?;
    let post_b = nav
        .nearest_node(Vec3::new(500.0, 500.0, 0.0), None, None)
        .context("Arena has no path nodes")?;
    nav.set_target_name(post_a, "post_a")?;
    nav.set_target_name(post_b, "post_b")?;
    info!("Arena nav: {} nodes", nav.len());
    Ok(())
}

fn command(cmd: ActorCommand) -> ScriptStep {
    ScriptStep::Command(cmd)
}

fn respond(action: &str, label: &str) -> ScriptStep {
    command(ActorCommand::DefineResponse {
        action: action.to_string(),
        label: label.to_string(),
    })
}

fn run_behavior(name: &str, args: &[&str]) -> [ScriptStep; 2] {
    [command(ActorCommand::behavior(name, args)), ScriptStep::WaitBehavior]
}

fn define_scripts(sim: &mut Simulation) {
    let scripts = &mut sim.scripts;

    let mut main = vec![
        respond("sightenemy", "guard::attack"),
        respond("pain", "guard::pain"),
        respond("range_far", "guard::far"),
        respond("death", "guard::death"),
    ];
    main.push(ScriptStep::Goto("guard::patrol".to_string()));
    scripts.define("guard::main", main);

    let mut patrol = Vec::new();
    patrol.extend(run_behavior("GotoPathNode", &["post_a", "walk"]));
    patrol.extend(run_behavior("TurnTo", &["90"]));
    patrol.extend(run_behavior("GotoPathNode", &["post_b", "walk"]));
    patrol.extend(run_behavior("TurnTo", &["270"]));
    patrol.push(ScriptStep::Goto("guard::patrol".to_string()));
    scripts.define("guard::patrol", patrol);

    let mut attack = Vec::from(run_behavior("FireOnSight", &[]));
    attack.push(command(ActorCommand::PopState));
    scripts.define("guard::attack", attack);

    let mut pain = Vec::from(run_behavior("PlayAnimSeekEnemy", &["pain"]));
    pain.push(command(ActorCommand::PopState));
    scripts.define("guard::pain", pain);

    let mut far = Vec::from(run_behavior("FindCover", &[]));
    far.extend(run_behavior("AimAndShoot", &["2"]));
    far.push(command(ActorCommand::PopState));
    scripts.define("guard::far", far);

    scripts.define("guard::death", vec![ScriptStep::Stop]);

    let mut civilian = vec![respond("pain", "civilian::flee")];
    civilian.extend(run_behavior("Wander", &[]));
    scripts.define("civilian::main", civilian);

    let mut flee = Vec::from(run_behavior("FleeAndRemove", &[]));
    flee.push(command(ActorCommand::PopState));
    scripts.define("civilian::flee", flee);

    scripts.define("fish::main", Vec::from(run_behavior("Swim", &[])));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_builds_and_runs() {
        let settings = VigilSettings::default();
        let mut arena = Arena::build(&settings).unwrap();
        assert_eq!(arena.sim.actors().count(), 5);
        assert!(arena.sim.nav.find_by_name("post_a").is_some());

        for _ in 0..100 {
            arena.step();
        }
        assert_eq!(arena.sim.time.tick_count, 100);
        let fish = arena.sim.actors().find(|a| a.name == "fish").unwrap();
        assert_eq!(fish.movement.move_type, vigil_ai::MoveType::Swim);
    }

    #[test]
    fn test_actors_stay_inside_walls() {
        let settings = VigilSettings::default();
        let mut arena = Arena::build(&settings).unwrap();
        let crate_top = Vec3::new(0.0, 0.0, 200.0);
        let tr = arena
            .sim
            .world
            .trace(crate_top, Bounds::POINT, Vec3::ZERO, None, ContentMask::MASK_SOLID);
        assert!(tr.hit());
        assert!((tr.end_pos.z - 128.0).abs() < 0.5);

        for _ in 0..300 {
            arena.step();
        }
        for actor in arena.sim.actors() {
            assert!(actor.origin.x.abs() < HALF_SIZE, "{} left the yard", actor.name);
            assert!(actor.origin.y.abs() < HALF_SIZE, "{} left the yard", actor.name);
            if actor.movement.move_type == vigil_ai::MoveType::Walk && actor.movement.on_ground {
                assert!(actor.origin.z.abs() < 1.0, "{} is off the floor", actor.name);
            }
        }
    }

    #[test]
    fn test_resume_continues_from_archive() {
        let settings = VigilSettings::default();
        let mut arena = Arena::build(&settings).unwrap();
        for _ in 0..30 {
            arena.step();
        }
        let archive = arena.sim.save().unwrap();
        let resumed = Arena::resume(&settings, archive).unwrap();
        assert_eq!(resumed.sim.time.tick_count, 30);
        assert_eq!(resumed.sim.actors().count(), arena.sim.actors().count());
    }

    #[test]
    fn test_guards_bind_patrol() {
        let settings = VigilSettings::default();
        let arena = Arena::build(&settings).unwrap();
        for guard in arena.sim.actors().filter(|a| a.name.starts_with("guard")) {
            assert_eq!(guard.behavior_kind(), Some("GotoPathNode"));
            assert!(guard.actions.contains("sightenemy"));
        }
    }
}
