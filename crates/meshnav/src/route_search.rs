//! Time-sliced A* route search over the face graph
//!
//! A [`RouteSearch`] is a reusable working set. After
//! [`RouteSearch::set_up_for_search`] the caller advances it with
//! [`RouteSearch::step`] for as long as [`RouteSearch::can_do_step`] allows,
//! possibly across many frames, until a terminal state is reached.
//!
//! Each step pops the cheapest open node and expands its plain neighbours and
//! its off-mesh exits. The edge cost is the travelled distance scaled by the
//! destination area cost, plus the cost of every active hazard at the
//! destination; the heuristic is the straight-line distance to the goal.

use std::time::Duration;

use crate::cost_weighting::DangerAreaList;
use crate::frame_quota::{Clock, FrameQuota};
use crate::mesh_interface::{FaceAdjacency, FaceNeighbour, TransitionAccess, TransitionResolver};
use crate::node_pool::{NodePool, NodeState, OpenList, SearchNodeKey};
use crate::off_mesh_links::OffMeshLinkTable;
use crate::query_filter::{QueryFilter, MIN_AREA_COST};
use meshnav_common::{
    distance, AreaAnnotation, Error, FaceId, RequesterId, Result, TransitionId, Vec3,
};

/// Default node budget of one search
pub const DEFAULT_MAX_SEARCH_NODES: usize = 4096;

/// Configuration of a route search working set
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct RouteSearchConfig {
    /// Maximum number of search nodes; further nodes are dropped
    pub max_nodes: usize,
}

impl Default for RouteSearchConfig {
    fn default() -> Self {
        Self {
            max_nodes: DEFAULT_MAX_SEARCH_NODES,
        }
    }
}

/// State of a route search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSearchState {
    /// No search set up
    Idle,
    /// Search in progress
    Searching,
    /// The goal face was reached
    GoalReached,
    /// Every reachable node was expanded without reaching the goal
    OpenListEmpty,
    /// The frame quota ran out; resumable after the next frame
    QuotaExceeded,
}

impl RouteSearchState {
    /// Checks if the search has finished
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RouteSearchState::GoalReached | RouteSearchState::OpenListEmpty
        )
    }

    /// Checks if the search can still make progress
    pub fn is_active(self) -> bool {
        matches!(
            self,
            RouteSearchState::Searching | RouteSearchState::QuotaExceeded
        )
    }
}

/// Parameters of one route search
#[derive(Debug, Clone)]
pub struct RouteRequest {
    /// Identity checked against off-mesh transition owners
    pub requester: RequesterId,
    pub start_face: FaceId,
    pub start_location: Vec3,
    pub goal_face: FaceId,
    pub goal_location: Vec3,
    pub filter: QueryFilter,
    pub dangers: DangerAreaList,
}

impl RouteRequest {
    pub fn new(
        requester: RequesterId,
        start_face: FaceId,
        start_location: Vec3,
        goal_face: FaceId,
        goal_location: Vec3,
    ) -> Self {
        Self {
            requester,
            start_face,
            start_location,
            goal_face,
            goal_location,
            filter: QueryFilter::default(),
            dangers: DangerAreaList::default(),
        }
    }

    pub fn with_filter(mut self, filter: QueryFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_dangers(mut self, dangers: DangerAreaList) -> Self {
        self.dangers = dangers;
        self
    }
}

/// One face of a finished route.
///
/// `transition` is the off-mesh transition taken when leaving this face,
/// invalid when the route continues by plain adjacency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct WayFace {
    pub face: FaceId,
    pub transition: TransitionId,
}

/// Collaborators a search step reads from
#[derive(Clone, Copy)]
pub struct SearchContext<'a> {
    pub mesh: &'a dyn FaceAdjacency,
    pub off_mesh: &'a OffMeshLinkTable,
    pub transitions: &'a dyn TransitionResolver,
}

impl<'a> SearchContext<'a> {
    pub fn new(
        mesh: &'a dyn FaceAdjacency,
        off_mesh: &'a OffMeshLinkTable,
        transitions: &'a dyn TransitionResolver,
    ) -> Self {
        Self {
            mesh,
            off_mesh,
            transitions,
        }
    }
}

/// Resumable A* working set
#[derive(Debug)]
pub struct RouteSearch {
    config: RouteSearchConfig,
    pool: NodePool,
    open: OpenList,
    state: RouteSearchState,
    request: Option<RouteRequest>,
    goal_node: Option<usize>,
    steps: u64,
    elapsed: Duration,
    pool_exhausted: bool,
    neighbours: Vec<FaceNeighbour>,
}

impl Default for RouteSearch {
    fn default() -> Self {
        Self::new(RouteSearchConfig::default())
    }
}

impl RouteSearch {
    /// Creates an idle working set
    pub fn new(config: RouteSearchConfig) -> Self {
        Self {
            pool: NodePool::new(config.max_nodes),
            config,
            open: OpenList::new(),
            state: RouteSearchState::Idle,
            request: None,
            goal_node: None,
            steps: 0,
            elapsed: Duration::ZERO,
            pool_exhausted: false,
            neighbours: Vec::new(),
        }
    }

    pub fn config(&self) -> &RouteSearchConfig {
        &self.config
    }

    /// Starts a new search, discarding any previous one
    pub fn set_up_for_search(
        &mut self,
        context: &SearchContext<'_>,
        request: RouteRequest,
    ) -> Result<()> {
        if !context.mesh.is_valid_face(request.start_face) {
            return Err(Error::InvalidParam(format!(
                "start face {} does not exist",
                request.start_face
            )));
        }
        if !context.mesh.is_valid_face(request.goal_face) {
            return Err(Error::InvalidParam(format!(
                "goal face {} does not exist",
                request.goal_face
            )));
        }
        if let Some((area_type, cost)) = request.filter.first_cheap_area() {
            return Err(Error::InvalidParam(format!(
                "area type {} costs {}, below the minimum of {}",
                area_type, cost, MIN_AREA_COST
            )));
        }

        self.reset();

        let start_location = if request.start_face == request.goal_face {
            request.goal_location
        } else {
            request.start_location
        };
        let start = self
            .pool
            .allocate(SearchNodeKey::plain(request.start_face), start_location)
            .ok_or_else(|| Error::InvalidParam("route search has no node budget".into()))?;
        let total = distance(&start_location, &request.goal_location);
        if let Some(node) = self.pool.get_mut(start) {
            node.total = total;
        }
        self.open.push(start, total);

        log::debug!(
            "route search set up: {} -> {} for requester {}",
            request.start_face,
            request.goal_face,
            request.requester
        );

        self.request = Some(request);
        self.state = RouteSearchState::Searching;
        Ok(())
    }

    /// Checks if another step may run now
    pub fn can_do_step<C: Clock>(&mut self, quota: &FrameQuota<C>) -> bool {
        self.state.is_active() && !self.open.is_empty(&self.pool) && quota.has_budget()
    }

    /// Pops and expands one node, charging the time to `quota`
    pub fn step<C: Clock>(
        &mut self,
        context: &SearchContext<'_>,
        quota: &mut FrameQuota<C>,
    ) -> RouteSearchState {
        if !self.state.is_active() {
            return self.state;
        }

        quota.start_step();
        let state = self.expand_best(context);
        self.elapsed += quota.end_step();
        self.steps += 1;
        self.state = state;

        if state.is_terminal() {
            quota.record_search(self.steps, self.elapsed);
            log::debug!(
                "route search finished with {:?} after {} steps in {:?} ({} nodes)",
                state,
                self.steps,
                self.elapsed,
                self.pool.node_count()
            );
        }
        state
    }

    /// Steps until the search ends or the frame quota runs out
    pub fn run<C: Clock>(
        &mut self,
        context: &SearchContext<'_>,
        quota: &mut FrameQuota<C>,
    ) -> RouteSearchState {
        while self.can_do_step(quota) {
            if self.step(context, quota).is_terminal() {
                return self.state;
            }
        }
        if self.state.is_active() && !quota.has_budget() {
            self.state = RouteSearchState::QuotaExceeded;
        }
        self.state
    }

    fn expand_best(&mut self, context: &SearchContext<'_>) -> RouteSearchState {
        let Self {
            pool,
            open,
            request,
            goal_node,
            pool_exhausted,
            neighbours,
            ..
        } = self;
        let Some(request) = request.as_ref() else {
            return RouteSearchState::Idle;
        };

        let Some(best) = open.pop(pool) else {
            return RouteSearchState::OpenListEmpty;
        };
        let Some(node) = pool.get_mut(best) else {
            return RouteSearchState::OpenListEmpty;
        };
        node.state = NodeState::Closed;
        let (key, parent) = (node.key, node.parent);
        let parent_key = parent.and_then(|p| pool.get(p)).map(|p| p.key);

        if key.face == request.goal_face {
            *goal_node = Some(best);
            return RouteSearchState::GoalReached;
        }

        let mut expander = Expander {
            pool,
            open,
            request,
            from: best,
            pool_exhausted,
        };

        neighbours.clear();
        context.mesh.collect_neighbours(key.face, neighbours);
        for neighbour in neighbours.iter() {
            if !request.filter.pass_filter(neighbour.annotation) {
                continue;
            }
            let next = SearchNodeKey::plain(neighbour.face);
            if Some(next) == parent_key {
                continue;
            }
            expander.relax(next, neighbour.entry, neighbour.annotation);
        }

        if let Some(first_exit) = context.mesh.off_mesh_exit_index(key.face) {
            for exit in context.off_mesh.query_exits(key.face, first_exit) {
                match context.transitions.resolve(exit.transition, request.requester) {
                    TransitionAccess::Usable => {}
                    TransitionAccess::Rejected => continue,
                    TransitionAccess::Unresolved => {
                        log::warn!(
                            "off-mesh transition {} from face {} no longer resolves, pruned",
                            exit.transition,
                            key.face
                        );
                        continue;
                    }
                }
                let Some(annotation) = context.mesh.face_annotation(exit.destination) else {
                    continue;
                };
                if !request.filter.pass_filter(annotation) {
                    continue;
                }
                let Some(location) = context.mesh.face_location(exit.destination) else {
                    continue;
                };
                let next = SearchNodeKey::new(exit.destination, exit.transition);
                if Some(next) == parent_key {
                    continue;
                }
                expander.relax(next, location, annotation);
            }
        }

        if open.is_empty(pool) {
            RouteSearchState::OpenListEmpty
        } else {
            RouteSearchState::Searching
        }
    }

    /// Gets the state of the search
    pub fn state(&self) -> RouteSearchState {
        self.state
    }

    pub fn request(&self) -> Option<&RouteRequest> {
        self.request.as_ref()
    }

    /// Builds the route once the goal was reached, from start to goal face
    pub fn route(&self) -> Result<Vec<WayFace>> {
        let goal = match (self.state, self.goal_node) {
            (RouteSearchState::GoalReached, Some(goal)) => goal,
            _ => return Err(Error::SearchNotActive),
        };

        let mut keys = Vec::new();
        let mut current = Some(goal);
        while let Some(index) = current {
            let Some(node) = self.pool.get(index) else {
                break;
            };
            keys.push(node.key);
            current = node.parent;
        }
        keys.reverse();

        // A transition is reported on the face it leaves from.
        let route = keys
            .iter()
            .enumerate()
            .map(|(i, key)| WayFace {
                face: key.face,
                transition: keys
                    .get(i + 1)
                    .map_or(TransitionId::INVALID, |next| next.transition),
            })
            .collect();
        Ok(route)
    }

    /// Accumulated cost of the route once the goal was reached
    pub fn route_cost(&self) -> Option<f32> {
        if self.state != RouteSearchState::GoalReached {
            return None;
        }
        self.goal_node
            .and_then(|goal| self.pool.get(goal))
            .map(|node| node.cost)
    }

    /// Steps taken by the current search
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Time charged by the current search
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn node_count(&self) -> usize {
        self.pool.node_count()
    }

    /// Gets memory used by the working set
    pub fn mem_used(&self) -> usize {
        self.pool.mem_used() + std::mem::size_of::<FaceNeighbour>() * self.neighbours.capacity()
    }

    /// Returns to [`RouteSearchState::Idle`], keeping allocations for reuse
    pub fn reset(&mut self) {
        self.pool.clear();
        self.open.clear();
        self.state = RouteSearchState::Idle;
        self.request = None;
        self.goal_node = None;
        self.steps = 0;
        self.elapsed = Duration::ZERO;
        self.pool_exhausted = false;
    }
}

struct Expander<'a> {
    pool: &'a mut NodePool,
    open: &'a mut OpenList,
    request: &'a RouteRequest,
    from: usize,
    pool_exhausted: &'a mut bool,
}

impl Expander<'_> {
    fn relax(&mut self, key: SearchNodeKey, entry: Vec3, annotation: AreaAnnotation) {
        let Some(from) = self.pool.get(self.from) else {
            return;
        };
        let (from_location, from_cost) = (from.location, from.cost);

        let existing = self.pool.find(&key);
        let location = match existing.and_then(|i| self.pool.get(i)) {
            Some(node) => node.location,
            None if key.face == self.request.goal_face => self.request.goal_location,
            None => entry,
        };

        let request = self.request;
        let step = distance(&from_location, &location) * request.filter.cost_multiplier(annotation)
            + request.dangers.cost(location, request.start_location);
        let cost = from_cost + step;
        let total = cost + distance(&location, &request.goal_location);

        let index = match existing {
            Some(index) => {
                if self.pool.get(index).is_some_and(|n| cost >= n.cost) {
                    return;
                }
                index
            }
            None => match self.pool.allocate(key, location) {
                Some(index) => index,
                None => {
                    if !*self.pool_exhausted {
                        log::warn!(
                            "route search node pool exhausted at {} nodes",
                            self.pool.max_nodes()
                        );
                        *self.pool_exhausted = true;
                    }
                    return;
                }
            },
        };

        if let Some(node) = self.pool.get_mut(index) {
            node.parent = Some(self.from);
            node.cost = cost;
            node.total = total;
            node.state = NodeState::Open;
        }
        self.open.push(index, total);
    }
}
