//! Per-tick context threaded through actors, behaviors and steering

use rand_chacha::ChaCha8Rng;
use vigil_nav::NavGraph;
use vigil_physics::Tracer;

use crate::anim::AnimationSet;
use crate::config::AiConfig;
use crate::script::ScriptHost;
use crate::world::{ActorEvent, EntityTable};

/// Deterministic random source shared by all actors
pub type SimRng = ChaCha8Rng;

/// Everything an actor may consult or touch while it thinks
pub struct SimContext<'a> {
    /// Level time in seconds
    pub time: f32,
    /// Length of this tick
    pub frame_time: f32,
    pub config: &'a AiConfig,
    pub world: &'a EntityTable,
    pub tracer: &'a dyn Tracer,
    pub nav: &'a mut NavGraph,
    pub scripts: &'a mut dyn ScriptHost,
    pub anims: &'a dyn AnimationSet,
    pub rng: &'a mut SimRng,
    pub events: &'a mut Vec<ActorEvent>,
}
