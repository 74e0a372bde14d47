//! The node graph and its routing queries

use glam::Vec3;
use serde::{Deserialize, Serialize};
use vigil_core::{Bounds, EntityId};
use vigil_physics::{ContentMask, Tracer};

use crate::error::NavError;
use crate::node::{NodeFlags, NodeId, NodeLink, PathNode};
use crate::path::{Path, PathPoint};
use crate::search::ReachNode;

/// Height above a node origin used for visibility checks
const NODE_EYE_HEIGHT: f32 = 16.0;

/// All path nodes of a level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavGraph {
    nodes: Vec<PathNode>,
}

impl NavGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add_node(&mut self, origin: Vec3, flags: NodeFlags) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(PathNode::new(id, origin, flags));
        id
    }

    /// Give a node a name scripts can refer to
    pub fn set_target_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), NavError> {
        self.node_mut(id).ok_or(NavError::UnknownNode(id))?.target_name = Some(name.into());
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&PathNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut PathNode> {
        self.nodes.get_mut(id.0 as usize)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &PathNode> {
        self.nodes.iter()
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|n| n.target_name.as_deref() == Some(name))
            .map(|n| n.id)
    }

    fn add_link(&mut self, from: NodeId, to: NodeId, jump: bool) {
        let Some(target) = self.node(to).map(|n| n.origin) else {
            return;
        };
        let Some(node) = self.node_mut(from) else {
            return;
        };
        let cost = node.origin.distance(target);
        node.links.retain(|l| l.to != to);
        node.links.push(NodeLink { to, cost, jump });
        if jump {
            node.flags |= NodeFlags::JUMP;
        }
    }

    /// Two-way walkable connection
    pub fn connect(&mut self, a: NodeId, b: NodeId) {
        self.add_link(a, b, false);
        self.add_link(b, a, false);
    }

    /// One-way link that has to be jumped
    pub fn link_jump(&mut self, from: NodeId, to: NodeId) {
        self.add_link(from, to, true);
    }

    /// Closest node to `pos`. With a tracer, only nodes in clear line of
    /// sight from `pos` qualify.
    pub fn nearest_node(
        &self,
        pos: Vec3,
        ignore: Option<EntityId>,
        tracer: Option<&dyn Tracer>,
    ) -> Option<NodeId> {
        let mut best: Option<(f32, NodeId)> = None;
        for node in &self.nodes {
            let dist_sq = node.origin.distance_squared(pos);
            if best.is_some_and(|(d, _)| dist_sq >= d) {
                continue;
            }
            if let Some(tracer) = tracer {
                let eye = Vec3::new(0.0, 0.0, NODE_EYE_HEIGHT);
                let tr = tracer.trace(pos + eye, Bounds::POINT, node.origin + eye, ignore, ContentMask::MASK_SOLID);
                if tr.hit() {
                    continue;
                }
            }
            best = Some((dist_sq, node.id));
        }
        best.map(|(_, id)| id)
    }

    /// Turn a node route into a walkable path
    pub fn route_to_path(&self, route: &[NodeId]) -> Path {
        let mut points = Vec::with_capacity(route.len());
        let mut previous: Option<&PathNode> = None;
        for id in route {
            let Some(node) = self.node(*id) else {
                continue;
            };
            let jump = previous
                .and_then(|p| p.link_to(*id))
                .is_some_and(|link| link.jump);
            points.push(PathPoint {
                node: Some(*id),
                origin: node.origin,
                jump,
            });
            previous = Some(node);
        }
        Path::new(points)
    }

    /// Shortest node route between two nodes
    pub fn route(&self, from: NodeId, to: NodeId) -> Result<Vec<NodeId>, NavError> {
        let target = self.node(to).ok_or(NavError::UnknownNode(to))?;
        self.node(from).ok_or(NavError::UnknownNode(from))?;
        let mut goal = ReachNode {
            target: to,
            target_origin: target.origin,
        };
        self.search(from, &mut goal).ok_or(NavError::NoRoute { from, to })
    }

    /// Path from a world position to a node
    pub fn find_path_to_node(
        &self,
        from: Vec3,
        to: NodeId,
        ignore: Option<EntityId>,
        tracer: Option<&dyn Tracer>,
    ) -> Result<Path, NavError> {
        let start = self
            .nearest_node(from, ignore, tracer)
            .ok_or(NavError::NoNodeNear(from))?;
        let route = self.route(start, to)?;
        Ok(self.route_to_path(&route))
    }

    /// Path between two world positions, ending exactly at `to`
    pub fn find_path(
        &self,
        from: Vec3,
        to: Vec3,
        ignore: Option<EntityId>,
        tracer: Option<&dyn Tracer>,
    ) -> Result<Path, NavError> {
        let start = self
            .nearest_node(from, ignore, tracer)
            .ok_or(NavError::NoNodeNear(from))?;
        let end = self
            .nearest_node(to, ignore, tracer)
            .ok_or(NavError::NoNodeNear(to))?;
        let route = self.route(start, end)?;
        let path = self.route_to_path(&route);
        let mut points = path.points().to_vec();
        points.push(PathPoint::at(to));
        Ok(Path::new(points))
    }

    pub fn mark_rejected(&mut self, id: NodeId) {
        if let Some(node) = self.node_mut(id) {
            node.flags |= NodeFlags::REJECTED;
        }
    }

    pub fn unmark_rejected(&mut self, id: NodeId) {
        if let Some(node) = self.node_mut(id) {
            node.flags.remove(NodeFlags::REJECTED);
        }
    }

    pub fn reserve(&mut self, id: NodeId, who: EntityId, until: f32) {
        if let Some(node) = self.node_mut(id) {
            node.occupancy.reserve(who, until);
        }
    }

    /// Release every claim held by `who`
    pub fn release_all(&mut self, who: EntityId) {
        for node in &mut self.nodes {
            node.occupancy.release(who);
        }
    }

    pub fn is_available(&self, id: NodeId, who: EntityId, now: f32) -> bool {
        self.node(id).is_some_and(|n| n.is_available(who, now))
    }
}

#[cfg(test)]
mod tests {
    use vigil_physics::BoxWorld;

    use super::*;

    /// a - b - c in a line, plus a long detour a - d - c
    fn line_graph() -> (NavGraph, [NodeId; 4]) {
        let mut graph = NavGraph::new();
        let a = graph.add_node(Vec3::new(0.0, 0.0, 0.0), NodeFlags::empty());
        let b = graph.add_node(Vec3::new(100.0, 0.0, 0.0), NodeFlags::empty());
        let c = graph.add_node(Vec3::new(200.0, 0.0, 0.0), NodeFlags::COVER);
        let d = graph.add_node(Vec3::new(100.0, 400.0, 0.0), NodeFlags::empty());
        graph.connect(a, b);
        graph.connect(b, c);
        graph.connect(a, d);
        graph.connect(d, c);
        (graph, [a, b, c, d])
    }

    #[test]
    fn test_route_prefers_short_way() {
        let (graph, [a, b, c, _]) = line_graph();
        assert_eq!(graph.route(a, c).unwrap(), vec![a, b, c]);
    }

    #[test]
    fn test_find_path_ends_at_point() {
        let (graph, [a, _, c, _]) = line_graph();
        let target = Vec3::new(210.0, 5.0, 0.0);
        let path = graph.find_path(Vec3::new(-5.0, 0.0, 0.0), target, None, None).unwrap();
        assert_eq!(path.points()[0].node, Some(a));
        assert_eq!(path.points()[path.len() - 2].node, Some(c));
        assert_eq!(path.goal().map(|p| p.origin), Some(target));
    }

    #[test]
    fn test_unreachable_node_reports_no_route() {
        let (mut graph, [a, ..]) = line_graph();
        let island = graph.add_node(Vec3::new(5000.0, 0.0, 0.0), NodeFlags::empty());
        assert!(matches!(graph.route(a, island), Err(NavError::NoRoute { .. })));
        assert!(matches!(graph.route(a, NodeId(99)), Err(NavError::UnknownNode(_))));
    }

    #[test]
    fn test_nearest_node_respects_walls() {
        let (graph, [a, b, ..]) = line_graph();
        let pos = Vec3::new(40.0, 0.0, 0.0);
        assert_eq!(graph.nearest_node(pos, None, None), Some(a));

        let mut world = BoxWorld::new();
        world.add_solid(Vec3::new(10.0, -50.0, -50.0), Vec3::new(20.0, 50.0, 100.0));
        assert_eq!(graph.nearest_node(pos, None, Some(&world)), Some(b));
    }

    #[test]
    fn test_jump_links_mark_path_points() {
        let mut graph = NavGraph::new();
        let top = graph.add_node(Vec3::ZERO, NodeFlags::empty());
        let bottom = graph.add_node(Vec3::new(100.0, 0.0, -128.0), NodeFlags::empty());
        graph.link_jump(top, bottom);

        let path = graph.route_to_path(&graph.route(top, bottom).unwrap());
        assert!(!path.points()[0].jump);
        assert!(path.points()[1].jump);
        assert!(graph.node(top).unwrap().flags.contains(NodeFlags::JUMP));
        assert!(graph.route(bottom, top).is_err());
    }

    #[test]
    fn test_marks_and_reservations() {
        let (mut graph, [a, b, ..]) = line_graph();
        graph.mark_rejected(a);
        graph.mark_rejected(b);
        assert!(graph.node(a).unwrap().flags.contains(NodeFlags::REJECTED));
        graph.unmark_rejected(a);
        assert!(!graph.node(a).unwrap().flags.contains(NodeFlags::REJECTED));
        assert!(graph.node(b).unwrap().flags.contains(NodeFlags::REJECTED));
        graph.unmark_rejected(b);

        graph.reserve(b, EntityId(1), 10.0);
        assert!(!graph.is_available(b, EntityId(2), 5.0));
        graph.release_all(EntityId(1));
        assert!(graph.is_available(b, EntityId(2), 5.0));
    }

    #[test]
    fn test_find_by_name() {
        let (mut graph, [_, b, ..]) = line_graph();
        graph.set_target_name(b, "ledge").unwrap();
        assert_eq!(graph.find_by_name("ledge"), Some(b));
        assert_eq!(graph.find_by_name("roof"), None);
    }
}
