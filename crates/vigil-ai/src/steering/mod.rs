//! Steering primitives
//!
//! Each primitive turns a goal into a per-tick force laid out like an angle
//! vector: `x` is a pitch change, `y` a yaw change, `z` unused. Behaviors
//! combine forces and hand the sum to [`Actor::accelerate`].
//!
//! [`Actor::accelerate`]: crate::actor::Actor::accelerate

mod avoidance;
mod chase;
mod follow_path;
mod seek;
mod turn;

pub use avoidance::{ObstacleAvoidance, ObstacleAvoidance2};
pub use chase::{Chase, ChaseGoal};
pub use follow_path::FollowPath;
pub use seek::Seek;
pub use turn::{Turn, TurnGoal};

use glam::Vec3;

use crate::actor::Actor;
use crate::context::SimContext;

/// A force-producing primitive
pub trait Steering {
    /// Compute this tick's force. Returns false once there is nothing left
    /// to steer toward.
    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool;

    /// Force computed by the last evaluation
    fn force(&self) -> Vec3;

    fn show_info(&self) -> String;
}
