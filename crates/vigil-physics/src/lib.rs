//! Vigil Physics - World geometry queries
//!
//! Provides the [`Tracer`] interface the AI layer perceives and moves
//! through, a rapier3d-backed [`PhysicsWorld`] implementing it, and a plain
//! [`BoxWorld`] for lightweight tests.

mod boxes;
mod trace;

pub use boxes::{BoxWorld, SolidBox};
pub use trace::{BodyWorld, ContentMask, Trace, Tracer};

use std::collections::HashMap;

use glam::Vec3;
use nalgebra::{Isometry3, Unit};
use rapier3d::parry::query::{ShapeCastOptions, ShapeCastStatus};
use rapier3d::parry::shape::Cuboid;
use rapier3d::prelude::*;
use vigil_core::{Bounds, EntityId};

use trace::{pack_user_data, unpack_user_data, DIST_EPSILON};

/// Amount a swept box is shrunk so resting contact is not reported as a hit
const SKIN: f32 = 0.0625;

/// Collider-backed world geometry
pub struct PhysicsWorld {
    /// Rigid body storage
    pub rigid_body_set: RigidBodySet,
    /// Collider storage
    pub collider_set: ColliderSet,

    /// Island manager
    island_manager: IslandManager,
    /// Query pipeline for raycasts and shape casts
    query_pipeline: QueryPipeline,
    /// Body collider per entity
    entity_colliders: HashMap<EntityId, ColliderHandle>,
}

impl PhysicsWorld {
    /// Create an empty world
    pub fn new() -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            island_manager: IslandManager::new(),
            query_pipeline: QueryPipeline::new(),
            entity_colliders: HashMap::new(),
        }
    }

    /// Rebuild the query acceleration structure after colliders changed
    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Add a static collider tagged with its owner and contents
    pub fn add_static_collider(
        &mut self,
        mut collider: Collider,
        owner: EntityId,
        contents: ContentMask,
    ) -> ColliderHandle {
        collider.user_data = pack_user_data(owner, contents);
        self.collider_set.insert(collider)
    }

    /// Remove a collider
    pub fn remove_collider(&mut self, handle: ColliderHandle) {
        self.collider_set
            .remove(handle, &mut self.island_manager, &mut self.rigid_body_set, true);
    }

    /// Get a collider by handle
    pub fn get_collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.collider_set.get(handle)
    }

    /// Create a solid floor whose surface is the plane z = `z`
    pub fn create_floor(&mut self, z: f32) -> ColliderHandle {
        let normal = Unit::new_normalize(vector![0.0, 0.0, 1.0]);
        let floor = ColliderBuilder::halfspace(normal)
            .translation(vector![0.0, 0.0, z])
            .build();
        self.add_static_collider(floor, EntityId::WORLD, ContentMask::SOLID)
    }

    /// Create structural solid geometry
    pub fn create_solid_box(&mut self, half_extents: Vec3, position: Vec3) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(vector![position.x, position.y, position.z])
            .build();
        self.add_static_collider(collider, EntityId::WORLD, ContentMask::SOLID)
    }

    /// Create a liquid volume; only visible to point contents and liquid masks
    pub fn create_volume(
        &mut self,
        half_extents: Vec3,
        position: Vec3,
        contents: ContentMask,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(vector![position.x, position.y, position.z])
            .sensor(true)
            .build();
        self.add_static_collider(collider, EntityId::WORLD, contents)
    }

    /// Insert or move the body collider of an entity
    pub fn set_entity_body(&mut self, entity: EntityId, bounds: Bounds, origin: Vec3) {
        let center = origin + bounds.center();
        if let Some(collider) = self
            .entity_colliders
            .get(&entity)
            .and_then(|handle| self.collider_set.get_mut(*handle))
        {
            collider.set_translation(vector![center.x, center.y, center.z]);
            return;
        }

        let half = bounds.size() * 0.5;
        let collider = ColliderBuilder::cuboid(half.x, half.y, half.z)
            .translation(vector![center.x, center.y, center.z])
            .build();
        let handle = self.add_static_collider(collider, entity, ContentMask::BODY);
        self.entity_colliders.insert(entity, handle);
    }

    /// Remove the body collider of an entity
    pub fn remove_entity(&mut self, entity: EntityId) {
        if let Some(handle) = self.entity_colliders.remove(&entity) {
            self.remove_collider(handle);
        }
    }

    fn trace_ray(&self, start: Vec3, end: Vec3, filter: QueryFilter) -> Trace {
        let delta = end - start;
        let length = delta.length();
        if length <= f32::EPSILON {
            return Trace::clear(end);
        }
        let dir = delta / length;
        let ray = Ray::new(point![start.x, start.y, start.z], vector![dir.x, dir.y, dir.z]);

        let Some((handle, hit)) = self.query_pipeline.cast_ray_and_get_normal(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            length,
            true,
            filter,
        ) else {
            return Trace::clear(end);
        };

        let fraction = ((hit.time_of_impact - DIST_EPSILON) / length).clamp(0.0, 1.0);
        Trace {
            fraction,
            end_pos: start + delta * fraction,
            plane_normal: Vec3::new(hit.normal.x, hit.normal.y, hit.normal.z),
            entity: self.owner(handle),
            start_solid: hit.time_of_impact <= 0.0,
            all_solid: false,
        }
    }

    fn trace_box(&self, start: Vec3, bounds: Bounds, end: Vec3, filter: QueryFilter) -> Trace {
        let delta = end - start;
        let half = (bounds.size() * 0.5 - Vec3::splat(SKIN)).max(Vec3::splat(SKIN));
        let center = start + bounds.center();
        let shape = Cuboid::new(vector![half.x, half.y, half.z]);
        let shape_pos = Isometry3::translation(center.x, center.y, center.z);
        let options = ShapeCastOptions {
            max_time_of_impact: 1.0,
            target_distance: 0.0,
            stop_at_penetration: true,
            compute_impact_geometry_on_penetration: true,
        };

        let Some((handle, hit)) = self.query_pipeline.cast_shape(
            &self.rigid_body_set,
            &self.collider_set,
            &shape_pos,
            &vector![delta.x, delta.y, delta.z],
            &shape,
            options,
            filter,
        ) else {
            return Trace::clear(end);
        };

        let start_solid = hit.status == ShapeCastStatus::PenetratingOrWithinTargetDist;
        let backoff = DIST_EPSILON / delta.length().max(DIST_EPSILON);
        let fraction = (hit.time_of_impact - backoff).clamp(0.0, 1.0);
        let normal = self
            .collider_set
            .get(handle)
            .map(|c| c.position().rotation * hit.normal1.into_inner())
            .map(|n| Vec3::new(n.x, n.y, n.z))
            .unwrap_or(Vec3::ZERO);

        Trace {
            fraction,
            end_pos: start + delta * fraction,
            plane_normal: normal,
            entity: self.owner(handle),
            start_solid,
            all_solid: start_solid && fraction <= 0.0,
        }
    }

    fn owner(&self, handle: ColliderHandle) -> Option<EntityId> {
        self.collider_set
            .get(handle)
            .map(|c| unpack_user_data(c.user_data).0)
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer for PhysicsWorld {
    fn trace(
        &self,
        start: Vec3,
        bounds: Bounds,
        end: Vec3,
        ignore: Option<EntityId>,
        mask: ContentMask,
    ) -> Trace {
        let predicate = |_handle: ColliderHandle, collider: &Collider| {
            let (owner, contents) = unpack_user_data(collider.user_data);
            contents.intersects(mask) && (owner.is_world() || Some(owner) != ignore)
        };
        let filter = QueryFilter::default().predicate(&predicate);

        if bounds.is_point() {
            self.trace_ray(start, end, filter)
        } else {
            self.trace_box(start, bounds, end, filter)
        }
    }

    fn point_contents(&self, point: Vec3) -> ContentMask {
        let mut contents = ContentMask::empty();
        self.query_pipeline.intersections_with_point(
            &self.rigid_body_set,
            &self.collider_set,
            &point![point.x, point.y, point.z],
            QueryFilter::default(),
            |handle| {
                if let Some(collider) = self.collider_set.get(handle) {
                    contents |= unpack_user_data(collider.user_data).1;
                }
                true
            },
        );
        contents
    }
}

impl BodyWorld for PhysicsWorld {
    fn sync_body(&mut self, entity: EntityId, bounds: Bounds, origin: Vec3) {
        self.set_entity_body(entity, bounds, origin);
        self.refresh_queries();
    }

    fn remove_body(&mut self, entity: EntityId) {
        self.remove_entity(entity);
        self.refresh_queries();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> PhysicsWorld {
        let mut world = PhysicsWorld::new();
        world.create_floor(0.0);
        world.create_solid_box(Vec3::new(10.0, 100.0, 100.0), Vec3::new(200.0, 0.0, 100.0));
        world.create_volume(
            Vec3::new(50.0, 50.0, 20.0),
            Vec3::new(0.0, 500.0, 20.0),
            ContentMask::WATER,
        );
        world.refresh_queries();
        world
    }

    #[test]
    fn test_floor_creation() {
        let mut world = PhysicsWorld::new();
        let floor = world.create_floor(0.0);
        assert!(world.get_collider(floor).is_some());
    }

    #[test]
    fn test_ray_hits_wall() {
        let world = arena();
        let tr = world.trace(
            Vec3::new(0.0, 0.0, 50.0),
            Bounds::POINT,
            Vec3::new(400.0, 0.0, 50.0),
            None,
            ContentMask::MASK_SOLID,
        );
        assert!(tr.hit());
        assert!(tr.hit_world());
        assert!((tr.end_pos.x - 190.0).abs() < 0.5);
    }

    #[test]
    fn test_box_trace_lands_on_floor() {
        let world = arena();
        let tr = world.trace(
            Vec3::new(0.0, -300.0, 40.0),
            Bounds::humanoid(),
            Vec3::new(0.0, -300.0, -40.0),
            None,
            ContentMask::MASK_MONSTER_SOLID,
        );
        assert!(tr.hit());
        assert!(tr.end_pos.z.abs() < 1.0);
    }

    #[test]
    fn test_box_resting_on_floor_can_rise() {
        let world = arena();
        let landed = world.trace(
            Vec3::new(0.0, -300.0, 40.0),
            Bounds::humanoid(),
            Vec3::new(0.0, -300.0, -40.0),
            None,
            ContentMask::MASK_MONSTER_SOLID,
        );
        let rise = world.trace(
            landed.end_pos,
            Bounds::humanoid(),
            landed.end_pos + Vec3::new(0.0, 0.0, 18.0),
            None,
            ContentMask::MASK_MONSTER_SOLID,
        );
        assert!(!rise.start_solid);
        assert!(!rise.hit());
    }

    #[test]
    fn test_entity_body_ignored_by_owner() {
        let mut world = arena();
        world.set_entity_body(EntityId(5), Bounds::humanoid(), Vec3::new(100.0, 0.0, 0.0));
        world.refresh_queries();

        let start = Vec3::new(0.0, 0.0, 30.0);
        let end = Vec3::new(150.0, 0.0, 30.0);
        let blocked = world.trace(start, Bounds::POINT, end, None, ContentMask::MASK_SHOT);
        assert_eq!(blocked.entity, Some(EntityId(5)));

        let ignored = world.trace(start, Bounds::POINT, end, Some(EntityId(5)), ContentMask::MASK_SHOT);
        assert!(!ignored.hit());
    }

    #[test]
    fn test_water_volume_contents() {
        let world = arena();
        assert!(world
            .point_contents(Vec3::new(0.0, 500.0, 10.0))
            .contains(ContentMask::WATER));
        // sight passes through water
        assert!(world.sight(
            Vec3::new(0.0, 400.0, 10.0),
            Vec3::new(0.0, 600.0, 10.0),
            EntityId(1),
            None
        ));
    }
}
