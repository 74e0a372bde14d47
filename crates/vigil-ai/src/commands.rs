//! Commands scripts issue to their actor

use glam::Vec3;
use serde::{Deserialize, Serialize};
use vigil_core::EntityId;

use crate::actor::Disposition;

/// Something a movement command can aim at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandTarget {
    Entity(EntityId),
    Point(Vec3),
    /// Path node by script name
    Node(String),
}

/// The script-facing command surface of an actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ActorCommand {
    /// Run a behavior by name; the issuing thread is woken when it completes
    Behavior { name: String, args: Vec<String> },
    EndBehavior,
    PopState,
    /// Dispatch an action as if it had been triggered
    SetState { action: String },
    SetAnim { name: String, on_done: Option<String> },
    DefineResponse { action: String, label: String },
    CopyResponse { from: String, to: String },
    EnableResponse { action: String },
    DisableResponse { action: String },
    ClearResponses,
    SetDisposition { disposition: Disposition },
    SetVision { distance: f32 },
    SetFov { degrees: f32 },
    SetAttackRange { range: f32 },
    SetMeleeRange { range: f32 },
    SetTurnSpeed { degrees: f32 },
    SetEyeOffset { offset: Vec3 },
    ClearEnemies,
    LookAt { target: CommandTarget },
    TurnTo { target: CommandTarget },
    WalkTo { target: CommandTarget },
    RunTo { target: CommandTarget },
    JumpTo { target: CommandTarget },
    Attack { target: EntityId },
    AttackPlayer,
}

impl ActorCommand {
    /// Shorthand for a behavior command
    pub fn behavior(name: &str, args: &[&str]) -> Self {
        Self::Behavior {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}
