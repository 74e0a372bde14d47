//! Vigil Core - Shared types and utilities for the Vigil NPC engine
//!
//! This crate provides the foundational types used by every other crate:
//! - Mathematical primitives (re-exported from glam)
//! - Entity ids and axis-aligned bounds
//! - Angle helpers for the Z-up, degrees-based convention used by actors
//! - The fixed-tick simulation clock

pub mod angles;
pub mod time;
pub mod types;

pub use glam::{Vec2, Vec3};
pub use time::{SimTime, TimeConfig, TimeError};
pub use types::{Bounds, EntityId};
