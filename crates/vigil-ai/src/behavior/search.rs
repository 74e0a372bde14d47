//! Node searches and goal-directed movement
//!
//! Cover, flee and ambush searches share [`NodeSearch`]: search the node
//! graph for a candidate, reserve it, chase it, and once the chase is
//! exhausted either finish or search again when the re-search timer allows.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vigil_core::angles::{angle_mod, vec_to_yaw, yaw_to_dir};
use vigil_core::EntityId;
use vigil_nav::{NodeFlags, NodeId, PathNode, SearchGoal};
use vigil_physics::ContentMask;

use super::BehaviorState;
use crate::actor::Actor;
use crate::context::SimContext;
use crate::steering::{Chase, ChaseGoal, Steering, Turn, TurnGoal};
use crate::world::{ActorEvent, EntityInfo};

/// Seconds spent looking around after reaching a noise
const INVESTIGATE_LOOK_TIME: f32 = 3.0;
/// Fleeing ends beyond this multiple of the mid range
const FLEE_SAFE_FACTOR: f32 = 1.0;

/// Headings tried when running away, relative to straight away
const FLEE_SWEEP: [f32; 5] = [0.0, 45.0, -45.0, 90.0, -90.0];

/// What makes a node a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Cover node the enemy cannot see
    Cover,
    /// Flee node farther from the enemy than we are
    Flee,
    /// Node with a line of sight to the enemy
    Ambush,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMode {
    Search = 0,
    Chase = 1,
    Arrived = 2,
}

/// Outcome of one search tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStep {
    Moving,
    Arrived,
    Failed,
}

/// Search goal that keeps the first less-ideal candidate as a fallback
struct CandidateSearch<F: FnMut(&PathNode) -> bool> {
    who: EntityId,
    now: f32,
    threat: Option<Vec3>,
    desperate_sq: f32,
    accept: F,
    desperate: Option<NodeId>,
}

impl<F: FnMut(&PathNode) -> bool> SearchGoal for CandidateSearch<F> {
    fn is_goal(&mut self, node: &PathNode, _cost: f32) -> bool {
        if node.flags.contains(NodeFlags::REJECTED) || !(self.accept)(node) {
            return false;
        }
        let held = !node.is_available(self.who, self.now);
        let crowded = self
            .threat
            .is_some_and(|t| node.origin.distance_squared(t) < self.desperate_sq);
        if held || crowded {
            self.desperate.get_or_insert(node.id);
            return false;
        }
        true
    }
}

/// Shared search → reserve → chase machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSearch {
    pub kind: NodeKind,
    mode: SearchMode,
    node: Option<NodeId>,
    chase: Option<Chase>,
    next_search: f32,
    /// Nodes this search rejected
    marked: Vec<NodeId>,
}

impl NodeSearch {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            mode: SearchMode::Search,
            node: None,
            chase: None,
            next_search: 0.0,
            marked: Vec::new(),
        }
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Node currently claimed
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Best candidate node: an ideal one if any exists, otherwise the first
    /// desperate one
    pub fn find(&self, actor: &Actor, ctx: &SimContext<'_>) -> Option<NodeId> {
        let start = ctx.nav.nearest_node(actor.origin, Some(actor.id), Some(ctx.tracer))?;
        let tracer = ctx.tracer;
        let threat = actor.live_enemy(ctx).map(|e| (e.id, e.origin, e.center()));
        let eye = actor.perception.eye_offset;
        let my_dist_sq = threat.map(|(_, origin, _)| actor.origin.distance_squared(origin));
        let me = actor.id;

        let accept = |node: &PathNode| match self.kind {
            NodeKind::Cover => {
                node.flags.contains(NodeFlags::COVER)
                    && threat.map_or(true, |(id, origin, _)| {
                        !tracer.sight(origin + eye, node.origin + eye, id, None)
                    })
            }
            NodeKind::Flee => {
                node.flags.contains(NodeFlags::FLEE)
                    && threat.zip(my_dist_sq).map_or(true, |((_, origin, _), mine)| {
                        node.origin.distance_squared(origin) > mine
                    })
            }
            NodeKind::Ambush => threat.is_some_and(|(id, _, center)| {
                tracer.sight(node.origin + eye, center, me, Some(id))
            }),
        };

        let mut goal = CandidateSearch {
            who: me,
            now: ctx.time,
            threat: threat.map(|(_, origin, _)| origin),
            desperate_sq: ctx.config.desperate_distance_sq,
            accept,
            desperate: None,
        };
        let ideal = ctx
            .nav
            .search(start, &mut goal)
            .and_then(|route| route.last().copied());
        if ideal.is_none() && goal.desperate.is_some() {
            debug!("Actor '{}' settles for a desperate {:?} node", actor.name, self.kind);
        }
        ideal.or(goal.desperate)
    }

    fn claim(&mut self, actor: &Actor, node: NodeId, ctx: &mut SimContext<'_>) {
        self.release_node(actor, ctx);
        ctx.nav
            .reserve(node, actor.id, ctx.time + ctx.config.node_reservation_time);
        self.node = Some(node);
        self.chase = Some(Chase::new(ChaseGoal::Node(node)));
        self.mode = SearchMode::Chase;
        self.next_search = ctx.time + ctx.config.research_interval;
    }

    fn release_node(&mut self, actor: &Actor, ctx: &mut SimContext<'_>) {
        if let Some(node) = self.node.take().and_then(|id| ctx.nav.node_mut(id)) {
            node.occupancy.release(actor.id);
        }
    }

    /// Advance the machine by one tick
    pub fn step(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> SearchStep {
        if self.mode == SearchMode::Search {
            let Some(node) = self.find(actor, ctx) else {
                debug!("Actor '{}' found no {:?} node", actor.name, self.kind);
                return SearchStep::Failed;
            };
            debug!("Actor '{}' heads for {:?} {}", actor.name, self.kind, node);
            self.claim(actor, node, ctx);
        }

        if self.mode == SearchMode::Chase {
            let Some(chase) = self.chase.as_mut() else {
                self.mode = SearchMode::Search;
                return SearchStep::Moving;
            };
            if chase.evaluate(actor, ctx) {
                actor.accelerate(chase.force, ctx);
                return SearchStep::Moving;
            }
            self.mode = SearchMode::Arrived;
        }

        // keep the landing step of the final approach
        actor.movement.frame_delta.get_or_insert(Vec3::ZERO);
        SearchStep::Arrived
    }

    /// Search again, rejecting the current node, if the re-search timer has
    /// elapsed
    pub fn retry(&mut self, actor: &Actor, ctx: &mut SimContext<'_>) -> bool {
        if ctx.time < self.next_search {
            return false;
        }
        if let Some(node) = self.node {
            ctx.nav.mark_rejected(node);
            self.marked.push(node);
        }
        self.release_node(actor, ctx);
        self.chase = None;
        self.mode = SearchMode::Search;
        true
    }

    /// Drop the reservation and the rejection marks this search made
    pub fn release(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        self.release_node(actor, ctx);
        for node in self.marked.drain(..) {
            ctx.nav.unmark_rejected(node);
        }
        actor.path = None;
    }

    fn show_info(&self) -> String {
        format!("{:?} search, {:?}, node {:?}", self.kind, self.mode, self.node)
    }
}

/// Whether the current enemy has no line of sight to the actor
fn hidden_from_enemy(actor: &Actor, ctx: &SimContext<'_>) -> bool {
    let Some(enemy) = actor.live_enemy(ctx) else {
        return true;
    };
    let enemy_eye = enemy.origin + actor.perception.eye_offset;
    !ctx.tracer.sight(enemy_eye, actor.info().center(), enemy.id, Some(actor.id))
}

macro_rules! node_search_behavior {
    ($(#[$doc:meta])* $name:ident, $kind:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            search: NodeSearch,
        }

        impl $name {
            pub fn new() -> Self {
                Self {
                    search: NodeSearch::new($kind),
                }
            }

            pub fn search(&self) -> &NodeSearch {
                &self.search
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

node_search_behavior!(
    /// Run to a cover node the enemy cannot see
    FindCover,
    NodeKind::Cover
);
node_search_behavior!(
    /// Run to a flee node farther from the enemy
    FindFlee,
    NodeKind::Flee
);
node_search_behavior!(
    /// Move to a node with a line of sight to the enemy
    FindEnemy,
    NodeKind::Ambush
);
node_search_behavior!(
    /// Reach cover and stay there while unseen
    Hide,
    NodeKind::Cover
);
node_search_behavior!(
    /// Run to a flee node and leave the level
    FleeAndRemove,
    NodeKind::Flee
);

impl BehaviorState for FindCover {
    fn begin(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        actor.set_anim("run", ctx);
    }

    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        match self.search.step(actor, ctx) {
            SearchStep::Failed => false,
            SearchStep::Moving => true,
            SearchStep::Arrived => {
                if hidden_from_enemy(actor, ctx) {
                    return false;
                }
                self.search.retry(actor, ctx);
                true
            }
        }
    }

    fn end(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        self.search.release(actor, ctx);
    }

    fn show_info(&self) -> String {
        self.search.show_info()
    }
}

impl BehaviorState for FindFlee {
    fn begin(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        actor.set_anim("run", ctx);
    }

    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        self.search.step(actor, ctx) == SearchStep::Moving
    }

    fn end(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        self.search.release(actor, ctx);
    }

    fn show_info(&self) -> String {
        self.search.show_info()
    }
}

impl BehaviorState for FindEnemy {
    fn begin(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        actor.set_anim("run", ctx);
    }

    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        let Some(enemy) = actor.live_enemy(ctx) else {
            return false;
        };
        if actor.can_see(enemy, ctx) {
            return false;
        }
        match self.search.step(actor, ctx) {
            SearchStep::Failed => false,
            SearchStep::Moving => true,
            SearchStep::Arrived => {
                self.search.retry(actor, ctx);
                true
            }
        }
    }

    fn end(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        self.search.release(actor, ctx);
    }

    fn show_info(&self) -> String {
        self.search.show_info()
    }
}

impl BehaviorState for Hide {
    fn begin(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        actor.set_anim("run", ctx);
    }

    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        match self.search.step(actor, ctx) {
            SearchStep::Failed => false,
            SearchStep::Moving => true,
            SearchStep::Arrived => {
                if actor.live_enemy(ctx).is_none() {
                    return false;
                }
                if actor.anim.name != "idle" && actor.has_anim("idle", ctx) {
                    actor.set_anim("idle", ctx);
                }
                if !hidden_from_enemy(actor, ctx) && self.search.retry(actor, ctx) {
                    actor.set_anim("run", ctx);
                }
                true
            }
        }
    }

    fn end(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        self.search.release(actor, ctx);
    }

    fn show_info(&self) -> String {
        format!("hide: {}", self.search.show_info())
    }
}

impl BehaviorState for FleeAndRemove {
    fn begin(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        actor.set_anim("run", ctx);
    }

    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        match self.search.step(actor, ctx) {
            SearchStep::Moving => true,
            SearchStep::Failed => false,
            SearchStep::Arrived => {
                debug!("Actor '{}' escaped and is removed", actor.name);
                ctx.events.push(ActorEvent::Remove(actor.id));
                false
            }
        }
    }

    fn end(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        self.search.release(actor, ctx);
    }

    fn show_info(&self) -> String {
        format!("escape: {}", self.search.show_info())
    }
}

/// Chase an entity until within a distance of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CloseIn {
    /// Required distance; the melee range when unset
    distance: Option<f32>,
    chase: Option<Chase>,
    next_search: f32,
}

impl CloseIn {
    fn new(distance: Option<f32>) -> Self {
        Self {
            distance,
            chase: None,
            next_search: 0.0,
        }
    }

    /// Whether a route to `target` exists: a node path, or a straight walk
    /// that only the target itself blocks
    fn reachable(actor: &Actor, target: &EntityInfo, ctx: &SimContext<'_>) -> bool {
        if ctx
            .nav
            .find_path(actor.origin, target.origin, Some(actor.id), Some(ctx.tracer))
            .is_ok()
        {
            return true;
        }
        let up = Vec3::Z * ctx.config.step_height;
        let tr = ctx.tracer.trace(
            actor.origin + up,
            actor.bounds,
            Vec3::new(target.origin.x, target.origin.y, actor.origin.z) + up,
            Some(actor.id),
            ContentMask::MASK_MONSTER_SOLID,
        );
        !tr.start_solid && (!tr.hit() || tr.entity == Some(target.id))
    }

    fn step(&mut self, actor: &mut Actor, target: EntityId, ctx: &mut SimContext<'_>) -> bool {
        let world = ctx.world;
        let Some(info) = world.get(target) else {
            return false;
        };
        let reach = self.distance.unwrap_or(actor.combat.melee_range);
        if actor.origin.distance_squared(info.origin) <= reach * reach {
            return false;
        }

        if self.chase.is_none() || ctx.time >= self.next_search {
            if !Self::reachable(actor, info, ctx) {
                debug!("Actor '{}' has no route to {}", actor.name, target);
                return false;
            }
            self.next_search = ctx.time + ctx.config.research_interval;
        }
        let chase = self
            .chase
            .get_or_insert_with(|| Chase::new(ChaseGoal::Entity(target)));
        if chase.evaluate(actor, ctx) {
            actor.accelerate(chase.force, ctx);
            return true;
        }

        // exhausted short of the target: search again next tick
        actor.movement.frame_delta.get_or_insert(Vec3::ZERO);
        self.chase = None;
        true
    }
}

/// Close in on the current enemy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetCloseToEnemy {
    close: CloseIn,
}

impl GetCloseToEnemy {
    pub fn new(distance: Option<f32>) -> Self {
        Self {
            close: CloseIn::new(distance),
        }
    }
}

impl BehaviorState for GetCloseToEnemy {
    fn begin(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        actor.set_anim("run", ctx);
    }

    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        let Some(enemy) = actor.live_enemy(ctx).map(|e| e.id) else {
            return false;
        };
        self.close.step(actor, enemy, ctx)
    }

    fn end(&mut self, actor: &mut Actor, _ctx: &mut SimContext<'_>) {
        actor.path = None;
    }

    fn show_info(&self) -> String {
        format!("close in on enemy (within {:?})", self.close.distance)
    }
}

/// Walk up to an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetCloseToObject {
    pub object: EntityId,
    close: CloseIn,
}

impl GetCloseToObject {
    pub fn new(object: EntityId, distance: Option<f32>) -> Self {
        Self {
            object,
            close: CloseIn::new(distance),
        }
    }
}

impl BehaviorState for GetCloseToObject {
    fn begin(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        actor.set_anim("walk", ctx);
    }

    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        self.close.step(actor, self.object, ctx)
    }

    fn end(&mut self, actor: &mut Actor, _ctx: &mut SimContext<'_>) {
        actor.path = None;
    }

    fn show_info(&self) -> String {
        format!("close in on {}", self.object)
    }
}

/// Walk or run to a named node, a point or an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GotoPathNode {
    pub node_name: Option<String>,
    pub goal: Option<ChaseGoal>,
    pub anim: String,
    chase: Option<Chase>,
}

impl GotoPathNode {
    pub fn to_node(name: impl Into<String>, anim: impl Into<String>) -> Self {
        Self {
            node_name: Some(name.into()),
            goal: None,
            anim: anim.into(),
            chase: None,
        }
    }

    pub fn to_goal(goal: ChaseGoal, anim: impl Into<String>) -> Self {
        Self {
            node_name: None,
            goal: Some(goal),
            anim: anim.into(),
            chase: None,
        }
    }
}

impl BehaviorState for GotoPathNode {
    fn begin(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        if self.goal.is_none() {
            if let Some(name) = &self.node_name {
                self.goal = ctx.nav.find_by_name(name).map(ChaseGoal::Node);
                if self.goal.is_none() {
                    warn!("Actor '{}' has no path node named '{}'", actor.name, name);
                }
            }
        }
        actor.set_anim(&self.anim, ctx);
    }

    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        let Some(goal) = self.goal else {
            return false;
        };
        let chase = self.chase.get_or_insert_with(|| Chase::new(goal));
        if !chase.evaluate(actor, ctx) {
            return false;
        }
        actor.accelerate(chase.force, ctx);
        true
    }

    fn end(&mut self, actor: &mut Actor, _ctx: &mut SimContext<'_>) {
        actor.path = None;
    }

    fn show_info(&self) -> String {
        match &self.chase {
            Some(chase) => chase.show_info(),
            None => format!("go to {:?} ({})", self.node_name, self.anim),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvestigateMode {
    Approach,
    Look,
}

/// Walk to the last heard noise and look around
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investigate {
    mode: InvestigateMode,
    target: Option<Vec3>,
    chase: Option<Chase>,
    look_until: f32,
    look_yaw: f32,
}

impl Investigate {
    pub fn new() -> Self {
        Self {
            mode: InvestigateMode::Approach,
            target: None,
            chase: None,
            look_until: 0.0,
            look_yaw: 0.0,
        }
    }

    pub fn mode(&self) -> InvestigateMode {
        self.mode
    }
}

impl Default for Investigate {
    fn default() -> Self {
        Self::new()
    }
}

impl BehaviorState for Investigate {
    fn begin(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        self.target = actor.noise_position;
        actor.set_anim("walk", ctx);
    }

    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        if actor.confirmed_enemy().is_some() {
            return false;
        }
        let Some(target) = self.target else {
            return false;
        };

        match self.mode {
            InvestigateMode::Approach => {
                let chase = self
                    .chase
                    .get_or_insert_with(|| Chase::new(ChaseGoal::Point(target)));
                if chase.evaluate(actor, ctx) {
                    actor.accelerate(chase.force, ctx);
                    return true;
                }
                actor.set_anim("idle", ctx);
                self.mode = InvestigateMode::Look;
                self.look_until = ctx.time + INVESTIGATE_LOOK_TIME;
                self.look_yaw = angle_mod(actor.yaw() + 180.0);
                true
            }
            InvestigateMode::Look => {
                actor.movement.frame_delta = Some(Vec3::ZERO);
                if ctx.time >= self.look_until {
                    return false;
                }
                let mut turn = Turn::new(TurnGoal::Yaw(self.look_yaw));
                if turn.evaluate(actor, ctx) {
                    actor.accelerate(turn.force, ctx);
                }
                true
            }
        }
    }

    fn end(&mut self, actor: &mut Actor, _ctx: &mut SimContext<'_>) {
        actor.noise_position = None;
        actor.path = None;
    }

    fn show_info(&self) -> String {
        format!("investigate {:?} ({:?})", self.target, self.mode)
    }
}

/// Run directly away from the enemy until out of range
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Flee {
    chase: Option<Chase>,
}

impl Flee {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most open heading roughly away from `threat`
    fn escape_point(actor: &Actor, threat: Vec3, ctx: &SimContext<'_>) -> Vec3 {
        let away = vec_to_yaw(actor.origin - threat);
        let distance = ctx.config.wander_distance * 4.0;
        let lift = Vec3::Z * ctx.config.step_height;
        let start = actor.origin + lift;

        let mut best = (f32::NEG_INFINITY, actor.origin);
        for offset in FLEE_SWEEP {
            let dir = yaw_to_dir(angle_mod(away + offset));
            let tr = ctx.tracer.trace(
                start,
                actor.bounds,
                start + dir * distance,
                Some(actor.id),
                ContentMask::MASK_MONSTER_SOLID,
            );
            if !tr.start_solid && tr.fraction > best.0 {
                best = (tr.fraction, tr.end_pos - lift);
            }
        }
        best.1
    }
}

impl BehaviorState for Flee {
    fn begin(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) {
        actor.set_anim("run", ctx);
    }

    fn evaluate(&mut self, actor: &mut Actor, ctx: &mut SimContext<'_>) -> bool {
        let Some(threat) = actor.live_enemy(ctx).map(|e| e.origin) else {
            return false;
        };
        let safe = ctx.config.mid_range * FLEE_SAFE_FACTOR;
        if actor.origin.distance_squared(threat) > safe * safe {
            return false;
        }

        if self.chase.is_none() || actor.movement.last_result.failed() {
            let point = Self::escape_point(actor, threat, ctx);
            self.chase = Some(Chase::new(ChaseGoal::Point(point)));
        }
        let keep_going = match self.chase.as_mut() {
            Some(chase) => {
                let running = chase.evaluate(actor, ctx);
                if running {
                    actor.accelerate(chase.force, ctx);
                }
                running
            }
            None => false,
        };
        if !keep_going {
            self.chase = None;
        }
        true
    }

    fn end(&mut self, actor: &mut Actor, _ctx: &mut SimContext<'_>) {
        actor.path = None;
    }

    fn show_info(&self) -> String {
        match &self.chase {
            Some(chase) => format!("flee: {}", chase.show_info()),
            None => "flee".to_string(),
        }
    }
}
