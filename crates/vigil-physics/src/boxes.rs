//! Axis-aligned box world
//!
//! A deterministic [`Tracer`] over a flat list of boxes. Unit tests use it
//! where a rapier world is more than the scene needs; levels run on
//! [`crate::PhysicsWorld`].

use glam::Vec3;
use vigil_core::{Bounds, EntityId};

use crate::trace::{BodyWorld, ContentMask, Trace, Tracer, DIST_EPSILON};

/// Tolerance for treating a parallel move as outside a slab
const PARALLEL_EPSILON: f32 = 1e-4;

/// One box in the world
#[derive(Debug, Clone, PartialEq)]
pub struct SolidBox {
    pub entity: EntityId,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub contents: ContentMask,
}

/// A world built from axis-aligned boxes
#[derive(Debug, Clone, Default)]
pub struct BoxWorld {
    boxes: Vec<SolidBox>,
}

struct SlabHit {
    enter: f32,
    exit: f32,
    normal: Vec3,
}

impl BoxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// A world with a large solid floor whose top surface sits at `z`
    pub fn with_floor(z: f32) -> Self {
        let mut world = Self::new();
        world.add_solid(
            Vec3::new(-65_536.0, -65_536.0, z - 64.0),
            Vec3::new(65_536.0, 65_536.0, z),
        );
        world
    }

    /// Add structural solid geometry
    pub fn add_solid(&mut self, mins: Vec3, maxs: Vec3) {
        self.add_box(EntityId::WORLD, mins, maxs, ContentMask::SOLID);
    }

    /// Add a water volume
    pub fn add_water(&mut self, mins: Vec3, maxs: Vec3) {
        self.add_box(EntityId::WORLD, mins, maxs, ContentMask::WATER);
    }

    pub fn add_box(&mut self, entity: EntityId, mins: Vec3, maxs: Vec3, contents: ContentMask) {
        self.boxes.push(SolidBox {
            entity,
            mins: mins.min(maxs),
            maxs: mins.max(maxs),
            contents,
        });
    }

    /// Insert or move the body box of an entity
    pub fn set_entity_box(&mut self, entity: EntityId, bounds: Bounds, origin: Vec3) {
        let (mins, maxs) = bounds.at(origin);
        match self.boxes.iter_mut().find(|b| b.entity == entity && !entity.is_world()) {
            Some(existing) => {
                existing.mins = mins;
                existing.maxs = maxs;
            }
            None => self.add_box(entity, mins, maxs, ContentMask::BODY),
        }
    }

    /// Remove every box owned by an entity
    pub fn remove_entity(&mut self, entity: EntityId) {
        if !entity.is_world() {
            self.boxes.retain(|b| b.entity != entity);
        }
    }

    pub fn boxes(&self) -> &[SolidBox] {
        &self.boxes
    }

    /// Slab test of a moving point against an (already expanded) box.
    /// Faces are open: sliding along a surface does not count as touching it.
    fn slab(start: Vec3, delta: Vec3, mins: Vec3, maxs: Vec3) -> Option<SlabHit> {
        let mut enter = f32::NEG_INFINITY;
        let mut exit = f32::INFINITY;
        let mut normal = Vec3::ZERO;

        for axis in 0..3 {
            let p = start[axis];
            let d = delta[axis];
            let lo = mins[axis];
            let hi = maxs[axis];

            if d.abs() < f32::EPSILON {
                if p <= lo + PARALLEL_EPSILON || p >= hi - PARALLEL_EPSILON {
                    return None;
                }
                continue;
            }

            let t0 = (lo - p) / d;
            let t1 = (hi - p) / d;
            let mut face = Vec3::ZERO;
            let (near, far) = if t0 < t1 {
                face[axis] = -1.0;
                (t0, t1)
            } else {
                face[axis] = 1.0;
                (t1, t0)
            };

            if near > enter {
                enter = near;
                normal = face;
            }
            exit = exit.min(far);
        }

        if enter >= exit || exit <= 0.0 || enter > 1.0 {
            return None;
        }
        Some(SlabHit { enter, exit, normal })
    }
}

impl Tracer for BoxWorld {
    fn trace(
        &self,
        start: Vec3,
        bounds: Bounds,
        end: Vec3,
        ignore: Option<EntityId>,
        mask: ContentMask,
    ) -> Trace {
        let delta = end - start;
        let length = delta.length();
        let mut result = Trace::clear(end);

        for b in &self.boxes {
            if !b.contents.intersects(mask) {
                continue;
            }
            if !b.entity.is_world() && Some(b.entity) == ignore {
                continue;
            }

            // Minkowski sum: sweep a point against the box grown by the bounds
            let mins = b.mins - bounds.maxs;
            let maxs = b.maxs - bounds.mins;
            let Some(hit) = Self::slab(start, delta, mins, maxs) else {
                continue;
            };

            if hit.enter < 0.0 {
                result.start_solid = true;
                result.fraction = 0.0;
                result.end_pos = start;
                result.entity = Some(b.entity);
                if hit.exit >= 1.0 {
                    result.all_solid = true;
                }
                continue;
            }

            let backoff = if length > 0.0 { DIST_EPSILON / length } else { 0.0 };
            let fraction = (hit.enter - backoff).max(0.0);
            if fraction < result.fraction {
                result.fraction = fraction;
                result.end_pos = start + delta * fraction;
                result.plane_normal = hit.normal;
                result.entity = Some(b.entity);
            }
        }

        result
    }

    fn point_contents(&self, point: Vec3) -> ContentMask {
        self.boxes
            .iter()
            .filter(|b| point.cmpge(b.mins).all() && point.cmple(b.maxs).all())
            .fold(ContentMask::empty(), |acc, b| acc | b.contents)
    }
}

impl BodyWorld for BoxWorld {
    fn sync_body(&mut self, entity: EntityId, bounds: Bounds, origin: Vec3) {
        self.set_entity_box(entity, bounds, origin);
    }

    fn remove_body(&mut self, entity: EntityId) {
        self.remove_entity(entity);
    }
}
