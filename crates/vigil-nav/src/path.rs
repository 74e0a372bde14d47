//! Ordered route an actor walks

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::node::NodeId;

/// One waypoint of a path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    /// Node this point came from; `None` for a free end point
    pub node: Option<NodeId>,
    pub origin: Vec3,
    /// Reaching this point from the previous one requires a jump
    pub jump: bool,
}

impl PathPoint {
    pub fn at(origin: Vec3) -> Self {
        Self {
            node: None,
            origin,
            jump: false,
        }
    }
}

/// A finite waypoint sequence with a cursor. Paths only move forward;
/// a finished path is discarded and re-planned rather than rewound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    points: Vec<PathPoint>,
    cursor: usize,
}

impl Path {
    pub fn new(points: Vec<PathPoint>) -> Self {
        Self { points, cursor: 0 }
    }

    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Waypoint currently being walked toward
    pub fn current(&self) -> Option<&PathPoint> {
        self.points.get(self.cursor)
    }

    /// Waypoint `offset` steps past the cursor
    pub fn peek(&self, offset: usize) -> Option<&PathPoint> {
        self.points.get(self.cursor + offset)
    }

    /// Final waypoint
    pub fn goal(&self) -> Option<&PathPoint> {
        self.points.last()
    }

    /// Move the cursor to the next waypoint
    pub fn advance(&mut self) {
        if self.cursor < self.points.len() {
            self.cursor += 1;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.points.len()
    }

    pub fn remaining(&self) -> usize {
        self.points.len().saturating_sub(self.cursor)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
