//! Trace queries
//!
//! Everything the AI layer knows about world geometry comes through a
//! [`Tracer`]: swept-box traces, point contents and line-of-sight checks.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use vigil_core::{Bounds, EntityId};

/// Distance a trace backs off from the surface it hit
pub(crate) const DIST_EPSILON: f32 = 0.031_25;

bitflags::bitflags! {
    /// Content classification of a volume
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ContentMask: u32 {
        const SOLID = 1 << 0;
        const WINDOW = 1 << 1;
        const LAVA = 1 << 3;
        const SLIME = 1 << 4;
        const WATER = 1 << 5;
        const PLAYER_CLIP = 1 << 16;
        const MONSTER_CLIP = 1 << 17;
        const BODY = 1 << 25;
        const CORPSE = 1 << 26;

        /// Anything a moving body can't pass through
        const MASK_SOLID = Self::SOLID.bits() | Self::WINDOW.bits();
        /// What blocks a walking player
        const MASK_PLAYER_SOLID = Self::SOLID.bits()
            | Self::PLAYER_CLIP.bits()
            | Self::WINDOW.bits()
            | Self::BODY.bits();
        /// What blocks a walking monster
        const MASK_MONSTER_SOLID = Self::SOLID.bits()
            | Self::MONSTER_CLIP.bits()
            | Self::WINDOW.bits()
            | Self::BODY.bits();
        /// Any liquid
        const MASK_WATER = Self::WATER.bits() | Self::LAVA.bits() | Self::SLIME.bits();
        /// What blocks sight
        const MASK_OPAQUE = Self::SOLID.bits() | Self::SLIME.bits() | Self::LAVA.bits();
        /// What stops a bullet
        const MASK_SHOT = Self::SOLID.bits()
            | Self::BODY.bits()
            | Self::WINDOW.bits()
            | Self::CORPSE.bits();
    }
}

impl Default for ContentMask {
    fn default() -> Self {
        ContentMask::empty()
    }
}

/// Result of sweeping a box from a start to an end point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trace {
    /// Portion of the move completed, 1.0 when nothing was hit
    pub fraction: f32,
    /// Where the box stopped
    pub end_pos: Vec3,
    /// Normal of the surface that was hit, zero when nothing was hit
    pub plane_normal: Vec3,
    /// What was hit; `EntityId::WORLD` for structural geometry
    pub entity: Option<EntityId>,
    /// The box started inside something solid
    pub start_solid: bool,
    /// The box never left solid space
    pub all_solid: bool,
}

impl Trace {
    /// A trace that reached its end unobstructed
    pub fn clear(end: Vec3) -> Self {
        Self {
            fraction: 1.0,
            end_pos: end,
            plane_normal: Vec3::ZERO,
            entity: None,
            start_solid: false,
            all_solid: false,
        }
    }

    /// Whether the move was cut short
    pub fn hit(&self) -> bool {
        self.fraction < 1.0
    }

    /// Whether the obstruction was structural geometry
    pub fn hit_world(&self) -> bool {
        self.entity.is_some_and(|e| e.is_world())
    }
}

/// World geometry queries used by perception, locomotion and navigation
pub trait Tracer {
    /// Sweep `bounds` from `start` to `end`, ignoring the entity `ignore`
    /// and anything whose contents don't intersect `mask`
    fn trace(
        &self,
        start: Vec3,
        bounds: Bounds,
        end: Vec3,
        ignore: Option<EntityId>,
        mask: ContentMask,
    ) -> Trace;

    /// Contents at a single point
    fn point_contents(&self, point: Vec3) -> ContentMask;

    /// Unobstructed line of sight from `from` to `to`. Hitting `target`
    /// itself counts as seeing it.
    fn sight(&self, from: Vec3, to: Vec3, viewer: EntityId, target: Option<EntityId>) -> bool {
        let tr = self.trace(from, Bounds::POINT, to, Some(viewer), ContentMask::MASK_OPAQUE);
        !tr.hit() || (target.is_some() && tr.entity == target)
    }
}

/// A tracer whose entity bodies can be moved as entities move
pub trait BodyWorld: Tracer {
    /// Insert or move the body of an entity
    fn sync_body(&mut self, entity: EntityId, bounds: Bounds, origin: Vec3);

    /// Remove the body of an entity
    fn remove_body(&mut self, entity: EntityId);
}

/// Pack an entity id and its contents into collider user data
pub(crate) fn pack_user_data(entity: EntityId, contents: ContentMask) -> u128 {
    ((contents.bits() as u128) << 64) | entity.0 as u128
}

/// Inverse of [`pack_user_data`]
pub(crate) fn unpack_user_data(data: u128) -> (EntityId, ContentMask) {
    let entity = EntityId(data as u64);
    let contents = ContentMask::from_bits_truncate((data >> 64) as u32);
    (entity, contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_compose() {
        assert!(ContentMask::MASK_MONSTER_SOLID.contains(ContentMask::BODY));
        assert!(!ContentMask::MASK_OPAQUE.intersects(ContentMask::WATER));
        assert!(ContentMask::MASK_WATER.contains(ContentMask::SLIME));
    }

    #[test]
    fn test_user_data_packing() {
        let data = pack_user_data(EntityId(42), ContentMask::BODY);
        assert_eq!(unpack_user_data(data), (EntityId(42), ContentMask::BODY));
    }
}
