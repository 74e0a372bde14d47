//! Best-first search over the node graph
//!
//! One engine serves both plain A* routing ([`ReachNode`]) and the open
//! ended searches behaviors run for cover, flee and ambush spots, where the
//! goal is a predicate rather than a fixed node.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::graph::NavGraph;
use crate::node::{NodeId, NodeLink, PathNode};

/// Upper bound on node expansions per search
const MAX_EXPANSIONS: usize = 4096;

/// What a search is looking for
pub trait SearchGoal {
    /// Whether the search may cross `link` from `from` into `to`
    fn edge_ok(&mut self, _from: &PathNode, _to: &PathNode, _link: &NodeLink) -> bool {
        true
    }

    /// Whether `node`, reached at accumulated `cost`, ends the search
    fn is_goal(&mut self, node: &PathNode, cost: f32) -> bool;

    /// Admissible estimate of the remaining cost from `node`
    fn heuristic(&self, _node: &PathNode) -> f32 {
        0.0
    }
}

/// Route to one specific node
pub struct ReachNode {
    pub target: NodeId,
    pub target_origin: glam::Vec3,
}

impl SearchGoal for ReachNode {
    fn is_goal(&mut self, node: &PathNode, _cost: f32) -> bool {
        node.id == self.target
    }

    fn heuristic(&self, node: &PathNode) -> f32 {
        node.origin.distance(self.target_origin)
    }
}

/// Open list entry
#[derive(Debug)]
struct SearchNode {
    node: NodeId,
    /// Actual cost so far (g)
    cost: f32,
    /// Estimated total cost (f = g + h)
    estimated_total: f32,
}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.estimated_total == other.estimated_total && self.node == other.node
    }
}
impl Eq for SearchNode {}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap; lower node id wins ties so results
        // don't depend on heap internals
        other
            .estimated_total
            .partial_cmp(&self.estimated_total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl NavGraph {
    /// Search outward from `start` until `goal` accepts a node, returning the
    /// node route (start first) to it.
    pub fn search(&self, start: NodeId, goal: &mut dyn SearchGoal) -> Option<Vec<NodeId>> {
        let start_node = self.node(start)?;
        let count = self.len();
        let mut best_cost = vec![f32::INFINITY; count];
        let mut came_from: Vec<Option<NodeId>> = vec![None; count];
        let mut closed = vec![false; count];

        let mut open = BinaryHeap::new();
        best_cost[start.0 as usize] = 0.0;
        open.push(SearchNode {
            node: start,
            cost: 0.0,
            estimated_total: goal.heuristic(start_node),
        });

        let mut expansions = 0;
        while let Some(entry) = open.pop() {
            let index = entry.node.0 as usize;
            if closed[index] {
                continue;
            }
            closed[index] = true;

            expansions += 1;
            if expansions > MAX_EXPANSIONS {
                tracing::warn!("Path search from {} gave up after {} expansions", start, MAX_EXPANSIONS);
                break;
            }

            let Some(node) = self.node(entry.node) else {
                continue;
            };
            if goal.is_goal(node, entry.cost) {
                return Some(Self::unwind(&came_from, entry.node));
            }

            for link in &node.links {
                let Some(next) = self.node(link.to) else {
                    continue;
                };
                let next_index = link.to.0 as usize;
                if closed[next_index] || !goal.edge_ok(node, next, link) {
                    continue;
                }
                let cost = entry.cost + link.cost;
                if cost < best_cost[next_index] {
                    best_cost[next_index] = cost;
                    came_from[next_index] = Some(entry.node);
                    open.push(SearchNode {
                        node: link.to,
                        cost,
                        estimated_total: cost + goal.heuristic(next),
                    });
                }
            }
        }

        None
    }

    fn unwind(came_from: &[Option<NodeId>], end: NodeId) -> Vec<NodeId> {
        let mut route = vec![end];
        let mut current = end;
        while let Some(previous) = came_from[current.0 as usize] {
            route.push(previous);
            current = previous;
        }
        route.reverse();
        route
    }
}
