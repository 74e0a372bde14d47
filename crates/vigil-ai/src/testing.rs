//! Shared fixtures for unit tests

use glam::Vec3;
use rand::SeedableRng;
use vigil_core::EntityId;
use vigil_nav::NavGraph;
use vigil_physics::BoxWorld;

use crate::actor::Actor;
use crate::anim::AnimationTable;
use crate::config::AiConfig;
use crate::context::{SimContext, SimRng};
use crate::script::ScriptBook;
use crate::world::{ActorEvent, EntityInfo, EntityTable};

pub(crate) const FRAME_TIME: f32 = 0.05;

/// Everything a [`SimContext`] borrows, owned in one place
pub(crate) struct TestWorld {
    pub config: AiConfig,
    pub table: EntityTable,
    pub tracer: BoxWorld,
    pub nav: NavGraph,
    pub scripts: ScriptBook,
    pub anims: AnimationTable,
    pub rng: SimRng,
    pub events: Vec<ActorEvent>,
    pub time: f32,
}

impl TestWorld {
    /// Flat floor at z = 0
    pub fn new() -> Self {
        Self {
            tracer: BoxWorld::with_floor(0.0),
            ..Self::empty()
        }
    }

    /// No geometry at all
    pub fn empty() -> Self {
        Self {
            config: AiConfig::default(),
            table: EntityTable::new(),
            tracer: BoxWorld::new(),
            nav: NavGraph::new(),
            scripts: ScriptBook::new(),
            anims: AnimationTable::humanoid("guard"),
            rng: SimRng::seed_from_u64(7),
            events: Vec::new(),
            time: 0.0,
        }
    }

    /// A guard actor; not inserted into the entity table
    pub fn actor(&self, id: u64, origin: Vec3) -> Actor {
        Actor::new(EntityId(id), format!("guard{id}"), "guard", origin)
    }

    pub fn add_player(&mut self, id: u64, origin: Vec3) {
        self.table.insert(EntityInfo::player(EntityId(id), origin));
    }

    pub fn ctx(&mut self) -> SimContext<'_> {
        SimContext {
            time: self.time,
            frame_time: FRAME_TIME,
            config: &self.config,
            world: &self.table,
            tracer: &self.tracer,
            nav: &mut self.nav,
            scripts: &mut self.scripts,
            anims: &self.anims,
            rng: &mut self.rng,
            events: &mut self.events,
        }
    }

    /// Think `ticks` times, advancing the clock after each one
    pub fn run(&mut self, actor: &mut Actor, ticks: u32) {
        for _ in 0..ticks {
            let mut ctx = self.ctx();
            actor.think(&mut ctx);
            self.time += FRAME_TIME;
        }
    }
}
