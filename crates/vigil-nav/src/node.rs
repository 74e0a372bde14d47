//! Path nodes and their reservations

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use vigil_core::EntityId;

/// Index of a node in its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

bitflags::bitflags! {
    /// What a node is good for
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct NodeFlags: u8 {
        /// Hides an actor from the direction it was placed against
        const COVER = 1 << 0;
        /// Valid destination when running away
        const FLEE = 1 << 1;
        /// Has at least one outgoing jump link
        const JUMP = 1 << 2;
        /// Already tested and rejected by the current search
        const REJECTED = 1 << 3;
    }
}

/// Directed connection to another node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeLink {
    pub to: NodeId,
    pub cost: f32,
    /// Crossing this link requires a jump
    pub jump: bool,
}

/// Advisory, time-limited claim on a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Occupancy {
    pub holder: Option<EntityId>,
    /// Level time at which the claim lapses
    pub until: f32,
}

impl Occupancy {
    /// Whether `who` may use the node at time `now`. The holder always may;
    /// anyone else once the claim has expired.
    pub fn is_available(&self, who: EntityId, now: f32) -> bool {
        match self.holder {
            None => true,
            Some(holder) if holder == who => true,
            Some(_) => now >= self.until,
        }
    }

    pub fn reserve(&mut self, who: EntityId, until: f32) {
        self.holder = Some(who);
        self.until = until;
    }

    /// Drop the claim if `who` holds it
    pub fn release(&mut self, who: EntityId) {
        if self.holder == Some(who) {
            *self = Self::default();
        }
    }
}

/// A navigation node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathNode {
    pub id: NodeId,
    pub origin: Vec3,
    pub flags: NodeFlags,
    /// Name scripts use to refer to this node
    pub target_name: Option<String>,
    pub links: Vec<NodeLink>,
    pub occupancy: Occupancy,
}

impl PathNode {
    pub fn new(id: NodeId, origin: Vec3, flags: NodeFlags) -> Self {
        Self {
            id,
            origin,
            flags,
            target_name: None,
            links: Vec::new(),
            occupancy: Occupancy::default(),
        }
    }

    pub fn is_available(&self, who: EntityId, now: f32) -> bool {
        self.occupancy.is_available(who, now)
    }

    pub fn link_to(&self, to: NodeId) -> Option<&NodeLink> {
        self.links.iter().find(|link| link.to == to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupancy_expiry() {
        let x = EntityId(1);
        let y = EntityId(2);
        let mut occupancy = Occupancy::default();
        assert!(occupancy.is_available(y, 0.0));

        occupancy.reserve(x, 10.0);
        assert!(occupancy.is_available(x, 5.0));
        assert!(!occupancy.is_available(y, 9.95));
        assert!(occupancy.is_available(y, 10.0));
        assert!(occupancy.is_available(y, 12.0));
    }

    #[test]
    fn test_release_only_by_holder() {
        let mut occupancy = Occupancy::default();
        occupancy.reserve(EntityId(1), 10.0);
        occupancy.release(EntityId(2));
        assert_eq!(occupancy.holder, Some(EntityId(1)));
        occupancy.release(EntityId(1));
        assert!(occupancy.is_available(EntityId(2), 0.0));
    }
}
