//! Vigil AI - Actors, behaviors and steering
//!
//! Provides the per-tick NPC decision layer:
//! - [`Actor`]: targeting, scripted action dispatch and the state stack
//! - [`Behavior`]: resumable strategies (chasing, aiming, fleeing, cover...)
//! - [`steering`]: force-producing primitives behaviors compose
//! - [`Simulation`]: a driver owning actors and their collaborators

pub mod actor;
pub mod anim;
pub mod behavior;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod save;
pub mod script;
pub mod sim;
pub mod steering;
pub mod world;

#[cfg(test)]
mod testing;

pub use actor::{Actor, ActorState, Disposition, MoveResult, MoveType, RangeBucket, StateTable};
pub use anim::{AnimInfo, AnimationSet, AnimationTable};
pub use behavior::{Behavior, BehaviorState};
pub use commands::{ActorCommand, CommandTarget};
pub use config::AiConfig;
pub use context::{SimContext, SimRng};
pub use error::AiError;
pub use save::SimulationArchive;
pub use script::{ScriptBook, ScriptHost, ScriptStep, ThreadId};
pub use sim::Simulation;
pub use steering::Steering;
pub use world::{ActorEvent, EntityFlags, EntityInfo, EntityTable};
