//! Core types used throughout the Vigil engine

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Unique identifier for a simulated entity.
///
/// Entity references held by actors (enemies, allies, path node holders) are
/// always stored as ids and re-resolved on use, so a removed entity simply
/// stops resolving instead of dangling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// The world itself (structural geometry)
    pub const WORLD: EntityId = EntityId(0);

    /// Whether this id refers to the world rather than an entity
    pub fn is_world(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Axis-aligned extents relative to an entity origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::POINT
    }
}

impl Bounds {
    /// Zero-size bounds, used for line traces
    pub const POINT: Bounds = Bounds {
        mins: Vec3::ZERO,
        maxs: Vec3::ZERO,
    };

    /// Create bounds from explicit extents
    pub const fn new(mins: Vec3, maxs: Vec3) -> Self {
        Self { mins, maxs }
    }

    /// Standing humanoid: origin at the feet, 32 wide, 72 tall
    pub fn humanoid() -> Self {
        Self::new(Vec3::new(-16.0, -16.0, 0.0), Vec3::new(16.0, 16.0, 72.0))
    }

    /// Size along each axis
    pub fn size(&self) -> Vec3 {
        self.maxs - self.mins
    }

    /// Center offset from the origin
    pub fn center(&self) -> Vec3 {
        (self.mins + self.maxs) * 0.5
    }

    /// Whether these are zero-size bounds
    pub fn is_point(&self) -> bool {
        self.mins == Vec3::ZERO && self.maxs == Vec3::ZERO
    }

    /// World-space (mins, maxs) for an entity at `origin`
    pub fn at(&self, origin: Vec3) -> (Vec3, Vec3) {
        (origin + self.mins, origin + self.maxs)
    }
}
