//! Read-only view of the entities an actor can perceive
//!
//! Each tick the simulation snapshots every entity (players, props and the
//! actors themselves) into an [`EntityTable`]. Actors resolve the ids they
//! hold against it, so a removed entity simply stops resolving.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use vigil_core::{Bounds, EntityId};

use crate::actor::Disposition;

bitflags::bitflags! {
    /// Classification flags of a perceivable entity
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct EntityFlags: u8 {
        const PLAYER = 1 << 0;
        /// Can be sensed at all
        const SENTIENT = 1 << 1;
        /// Ignored by targeting
        const NOTARGET = 1 << 2;
        /// Cloaked
        const HIDDEN = 1 << 3;
        /// A mutated player that enemy actors treat as one of their own
        const MUTANT = 1 << 4;
    }
}

/// What other actors can observe about an actor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActorInfo {
    pub disposition: Disposition,
    /// Confirmed current enemy
    pub enemy: Option<EntityId>,
}

/// Snapshot of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub id: EntityId,
    pub name: String,
    pub origin: Vec3,
    pub velocity: Vec3,
    pub bounds: Bounds,
    pub yaw: f32,
    pub health: f32,
    pub max_health: f32,
    pub flags: EntityFlags,
    pub actor: Option<ActorInfo>,
}

impl EntityInfo {
    /// A standing player
    pub fn player(id: EntityId, origin: Vec3) -> Self {
        Self {
            id,
            name: "player".to_string(),
            origin,
            velocity: Vec3::ZERO,
            bounds: Bounds::humanoid(),
            yaw: 0.0,
            health: 100.0,
            max_health: 100.0,
            flags: EntityFlags::PLAYER | EntityFlags::SENTIENT,
            actor: None,
        }
    }

    /// A non-sentient prop (throwable objects, doors)
    pub fn prop(id: EntityId, name: impl Into<String>, origin: Vec3, bounds: Bounds) -> Self {
        Self {
            id,
            name: name.into(),
            origin,
            velocity: Vec3::ZERO,
            bounds,
            yaw: 0.0,
            health: 0.0,
            max_health: 0.0,
            flags: EntityFlags::empty(),
            actor: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }

    pub fn is_player(&self) -> bool {
        self.flags.contains(EntityFlags::PLAYER)
    }

    /// Center of the bounding box in world space
    pub fn center(&self) -> Vec3 {
        self.origin + self.bounds.center()
    }
}

/// All entities visible to actors this tick
#[derive(Debug, Clone, Default)]
pub struct EntityTable {
    entities: BTreeMap<EntityId, EntityInfo>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, info: EntityInfo) {
        self.entities.insert(info.id, info);
    }

    pub fn remove(&mut self, id: EntityId) -> Option<EntityInfo> {
        self.entities.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityInfo> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityInfo> {
        self.entities.get_mut(&id)
    }

    /// Entities in id order
    pub fn iter(&self) -> impl Iterator<Item = &EntityInfo> {
        self.entities.values()
    }

    /// First live player
    pub fn player(&self) -> Option<&EntityInfo> {
        self.iter().find(|e| e.is_player() && e.is_alive())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Effects an actor has on the rest of the world, applied by the simulation
/// after the emitting actor's think
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActorEvent {
    /// A shot was fired
    Fire {
        shooter: EntityId,
        target: EntityId,
        origin: Vec3,
        direction: Vec3,
    },
    /// A melee or repel strike connected
    MeleeHit {
        attacker: EntityId,
        target: EntityId,
        damage: f32,
        knockback: Vec3,
    },
    /// An object was picked up
    Pickup { actor: EntityId, object: EntityId },
    /// A held object was thrown
    Throw {
        actor: EntityId,
        object: EntityId,
        velocity: Vec3,
    },
    /// The actor asks to be removed from the level
    Remove(EntityId),
    /// A dead ally's enemy list should be cleared
    ClearEnemies(EntityId),
}
