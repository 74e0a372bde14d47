//! Save archives
//!
//! Everything that changes while a level runs: actors (with their state
//! stacks and behaviors), non-actor entities, node occupancy, script thread
//! state, the clock and the RNG position. Content such as script labels,
//! animations and geometry is reloaded from the level instead.

use serde::{Deserialize, Serialize};
use vigil_core::SimTime;
use vigil_nav::NavGraph;

use crate::actor::Actor;
use crate::error::AiError;
use crate::world::EntityInfo;

pub const ARCHIVE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationArchive {
    pub version: u32,
    pub time: SimTime,
    pub next_id: u64,
    pub actors: Vec<Actor>,
    pub entities: Vec<EntityInfo>,
    pub nav: NavGraph,
    pub threads: serde_json::Value,
    pub rng_seed: [u8; 32],
    pub rng_word_pos: u128,
}

impl SimulationArchive {
    pub fn to_json(&self) -> Result<String, AiError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, AiError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::AnimationTable;
    use crate::behavior::{Behavior, Roam};
    use crate::commands::ActorCommand;
    use crate::config::AiConfig;
    use crate::script::ScriptStep;
    use crate::sim::Simulation;
    use crate::testing::TestWorld;
    use glam::Vec3;
    use vigil_core::EntityId;
    use vigil_physics::BoxWorld;

    use crate::actor::MoveType;

    #[test]
    fn test_fresh_actor_round_trip() {
        let actor = Actor::new(EntityId(4), "guard4", "guard", Vec3::new(10.0, 20.0, 0.0));
        assert_eq!(actor.movement.last_jump_time, None);
        let json = serde_json::to_string(&actor).unwrap();
        let restored: Actor = serde_json::from_str(&json).unwrap();
        assert_eq!(serde_json::to_value(&restored).unwrap(), serde_json::to_value(&actor).unwrap());
    }

    #[test]
    fn test_jump_time_survives_round_trip() {
        let mut actor = Actor::new(EntityId(4), "guard4", "guard", Vec3::ZERO);
        actor.movement.last_jump_time = Some(2.5);
        let json = serde_json::to_string(&actor).unwrap();
        let restored: Actor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.movement.last_jump_time, Some(2.5));
    }

    #[test]
    fn test_actor_round_trip_mid_behavior() {
        let mut world = TestWorld::new();
        world.scripts.define(
            "guard::alert",
            vec![ScriptStep::Command(ActorCommand::behavior("TurnTo", &["90"]))],
        );
        let mut actor = world.actor(1, Vec3::ZERO);
        actor.actions.define("alert", "guard::alert");
        {
            let mut ctx = world.ctx();
            actor.set_behavior(Behavior::Wander(Roam::new(MoveType::Walk, false)), None, &mut ctx);
        }
        world.run(&mut actor, 5);
        {
            let mut ctx = world.ctx();
            assert!(actor.do_action("alert", false, &mut ctx));
        }
        assert_eq!(actor.state_stack.len(), 1);
        assert_eq!(actor.behavior_kind(), Some("TurnTo"));

        let json = serde_json::to_string(&actor).unwrap();
        let restored: Actor = serde_json::from_str(&json).unwrap();
        assert_eq!(serde_json::to_value(&restored).unwrap(), serde_json::to_value(&actor).unwrap());
        assert_eq!(restored.state_stack.len(), 1);
        assert_eq!(restored.state_stack[0].behavior, actor.state_stack[0].behavior);
        assert!(matches!(restored.state_stack[0].behavior, Some(Behavior::Wander(_))));
        assert_eq!(restored.state_stack[0].marker, actor.state_stack[0].marker);
        assert_eq!(restored.behavior, actor.behavior);
        assert_eq!(restored.origin, actor.origin);
    }

    fn level() -> Simulation<BoxWorld> {
        let mut sim = Simulation::new(BoxWorld::with_floor(0.0), AiConfig::default(), 3);
        sim.anims = AnimationTable::humanoid("guard");
        sim.scripts.define(
            "guard::main",
            vec![
                ScriptStep::Command(ActorCommand::behavior("Wander", &[])),
                ScriptStep::WaitBehavior,
            ],
        );
        sim
    }

    #[test]
    fn test_simulation_resumes_identically() {
        let mut sim = level();
        for id in 1..=3 {
            let actor = Actor::new(EntityId(id), format!("guard{id}"), "guard", Vec3::new(id as f32 * 200.0, 0.0, 0.0));
            sim.spawn_actor(actor, Some("guard::main")).unwrap();
        }
        for _ in 0..20 {
            sim.tick();
        }

        let json = sim.save().unwrap().to_json().unwrap();
        let mut copy = level();
        copy.restore(SimulationArchive::from_json(&json).unwrap()).unwrap();

        for _ in 0..40 {
            sim.tick();
            copy.tick();
        }
        for actor in sim.actors() {
            let twin = copy.actor(actor.id).unwrap();
            assert!(actor.origin.abs_diff_eq(twin.origin, 1e-3));
            assert_eq!(actor.behavior, twin.behavior);
        }
        assert_eq!(sim.time.tick_count, copy.time.tick_count);
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let sim = level();
        let mut archive = sim.save().unwrap();
        archive.version += 1;
        let mut copy = level();
        assert!(matches!(copy.restore(archive), Err(AiError::ArchiveVersion { .. })));
    }
}
