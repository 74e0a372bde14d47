//! Vigil Nav - Path node graph
//!
//! Actors navigate between hand-placed path nodes. This crate owns the nodes
//! (position, flags, reservations, links), the ordered [`Path`] an actor
//! walks, and the graph searches behaviors use to pick cover, flee spots and
//! routes.

mod error;
mod graph;
mod node;
mod path;
mod search;

pub use error::NavError;
pub use graph::NavGraph;
pub use node::{NodeFlags, NodeId, NodeLink, Occupancy, PathNode};
pub use path::{Path, PathPoint};
pub use search::{ReachNode, SearchGoal};
