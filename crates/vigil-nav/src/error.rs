use glam::Vec3;

use crate::node::NodeId;

/// Errors raised by graph queries
#[derive(Debug, Clone, thiserror::Error)]
pub enum NavError {
    #[error("Unknown path node {0}")]
    UnknownNode(NodeId),

    #[error("No path node near {0}")]
    NoNodeNear(Vec3),

    #[error("No route from {from} to {to}")]
    NoRoute { from: NodeId, to: NodeId },
}
