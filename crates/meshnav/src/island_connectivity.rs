//! Coarse connectivity between islands
//!
//! An island is a maximal connected region of one navigation mesh. This module
//! keeps a sparse directed multigraph over islands so that "can an agent get
//! from A to B at all" is answered without running a route search.
//!
//! Every edge is stored twice: once on its source node with an out-degree and
//! once, mirrored, on its destination node with an in-degree. The degrees count
//! the face adjacencies or off-mesh transitions that justify the edge; an edge
//! record disappears once both counters reach zero, and a node disappears once
//! it has no edge records left.
//!
//! Reachability is answered by [`IslandConnectivityGraph::are_connected`], a
//! bidirectional flood that refuses to expand nodes whose degree is above a
//! running threshold until every sparser alternative has been tried.

use std::collections::{HashMap, VecDeque};

use crate::mesh_interface::{TransitionAccess, TransitionOwners, TransitionResolver};
use crate::query_filter::QueryFilter;
use meshnav_common::{
    consistency_violation, AreaAnnotation, Error, FaceId, GlobalIslandId, IslandId, MeshId,
    ObjectId, RequesterId, Result, TransitionId,
};

/// Default degree above which a node counts as a hub
pub const DEFAULT_HUB_DEGREE_THRESHOLD: usize = 64;

/// Configuration for the island connectivity graph
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct IslandGraphConfig {
    /// Starting value of the running hub threshold used by each flood
    pub initial_hub_degree_threshold: usize,
}

impl Default for IslandGraphConfig {
    fn default() -> Self {
        Self {
            initial_hub_degree_threshold: DEFAULT_HUB_DEGREE_THRESHOLD,
        }
    }
}

/// Off-mesh transition that justifies a coarse edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionRef {
    pub id: TransitionId,
    /// Face the transition lands on
    pub destination_face: FaceId,
    /// External object that registered the transition
    pub owner: ObjectId,
    /// Annotation of the transition itself
    pub annotation: AreaAnnotation,
}

/// Directed edge record stored on an island node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IslandLink {
    /// The island at the other end
    pub to: IslandId,
    /// Cached annotation of `to`
    pub to_annotation: AreaAnnotation,
    /// Off-mesh transition id, invalid for plain adjacency
    pub transition: TransitionId,
    /// Connections leading from this node to `to`
    pub out_degree: u32,
    /// Connections leading from `to` into this node
    pub in_degree: u32,
}

impl IslandLink {
    pub fn is_outward(&self) -> bool {
        self.out_degree > 0
    }

    pub fn is_inward(&self) -> bool {
        self.in_degree > 0
    }

    pub fn is_off_mesh(&self) -> bool {
        self.transition.is_valid()
    }
}

/// Vertex of the island graph
#[derive(Debug, Clone)]
pub struct IslandNode {
    links: Vec<IslandLink>,
    annotation: AreaAnnotation,
    outward_count: usize,
    inward_count: usize,
}

impl IslandNode {
    fn new(annotation: AreaAnnotation) -> Self {
        Self {
            links: Vec::new(),
            annotation,
            outward_count: 0,
            inward_count: 0,
        }
    }

    pub fn links(&self) -> &[IslandLink] {
        &self.links
    }

    pub fn annotation(&self) -> AreaAnnotation {
        self.annotation
    }

    /// Number of links usable to leave this island
    pub fn outward_count(&self) -> usize {
        self.outward_count
    }

    /// Number of links usable to enter this island
    pub fn inward_count(&self) -> usize {
        self.inward_count
    }

    fn find_link(&self, to: IslandId, transition: TransitionId) -> Option<usize> {
        self.links
            .iter()
            .position(|l| l.to == to && l.transition == transition)
    }

    /// Applies degree deltas to the `(to, transition)` record, creating it on
    /// demand and dropping it once both degrees are zero. Underflow must have
    /// been ruled out by the caller.
    fn adjust_link(
        &mut self,
        to: IslandId,
        to_annotation: AreaAnnotation,
        transition: TransitionId,
        out_delta: i32,
        in_delta: i32,
    ) {
        let index = match self.find_link(to, transition) {
            Some(index) => index,
            None => {
                self.links.push(IslandLink {
                    to,
                    to_annotation,
                    transition,
                    out_degree: 0,
                    in_degree: 0,
                });
                self.links.len() - 1
            }
        };

        let link = &mut self.links[index];
        let was_outward = link.is_outward();
        let was_inward = link.is_inward();
        link.out_degree = (i64::from(link.out_degree) + i64::from(out_delta)).max(0) as u32;
        link.in_degree = (i64::from(link.in_degree) + i64::from(in_delta)).max(0) as u32;
        link.to_annotation = to_annotation;
        let (is_outward, is_inward) = (link.is_outward(), link.is_inward());

        self.update_counts(was_outward, is_outward, was_inward, is_inward);

        if !is_outward && !is_inward {
            self.links.remove(index);
        }
    }

    /// Removes the record for `(to, transition)` regardless of its degrees
    fn take_link(&mut self, matches: impl Fn(&IslandLink) -> bool) -> Option<IslandLink> {
        let index = self.links.iter().position(matches)?;
        let link = self.links.remove(index);
        self.update_counts(link.is_outward(), false, link.is_inward(), false);
        Some(link)
    }

    fn update_counts(&mut self, was_out: bool, is_out: bool, was_in: bool, is_in: bool) {
        match (was_out, is_out) {
            (false, true) => self.outward_count += 1,
            (true, false) => self.outward_count -= 1,
            _ => {}
        }
        match (was_in, is_in) {
            (false, true) => self.inward_count += 1,
            (true, false) => self.inward_count -= 1,
            _ => {}
        }
    }
}

/// Bookkeeping for one off-mesh edge, so it can be removed by id alone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffMeshLinkRecord {
    /// Island the transition leaves from
    pub origin: IslandId,
    pub destination_face: FaceId,
    pub owner: ObjectId,
    pub annotation: AreaAnnotation,
}

/// Identity and capabilities of whoever asks a connectivity question
#[derive(Clone, Copy)]
pub struct RequesterContext<'a> {
    pub requester: RequesterId,
    pub owners: &'a dyn TransitionOwners,
}

impl<'a> RequesterContext<'a> {
    pub fn new(requester: RequesterId, owners: &'a dyn TransitionOwners) -> Self {
        Self { requester, owners }
    }
}

/// Size report for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IslandGraphStats {
    pub mesh_count: usize,
    pub node_count: usize,
    pub link_count: usize,
    pub transition_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    None,
    ForwardOpen,
    ReverseOpen,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FloodDirection {
    Forward,
    Reverse,
}

impl FloodDirection {
    fn opposite(self) -> Self {
        match self {
            FloodDirection::Forward => FloodDirection::Reverse,
            FloodDirection::Reverse => FloodDirection::Forward,
        }
    }

    fn open_state(self) -> VisitState {
        match self {
            FloodDirection::Forward => VisitState::ForwardOpen,
            FloodDirection::Reverse => VisitState::ReverseOpen,
        }
    }

    fn degree(self, node: &IslandNode) -> usize {
        match self {
            FloodDirection::Forward => node.outward_count,
            FloodDirection::Reverse => node.inward_count,
        }
    }

    fn follows(self, link: &IslandLink) -> bool {
        match self {
            FloodDirection::Forward => link.is_outward(),
            FloodDirection::Reverse => link.is_inward(),
        }
    }
}

/// Reusable visitation state; only the touched slots are reset after a query
#[derive(Debug, Default)]
struct FloodScratch {
    states: Vec<VisitState>,
    touched: Vec<usize>,
    forward: VecDeque<IslandId>,
    reverse: VecDeque<IslandId>,
}

impl FloodScratch {
    fn prepare(&mut self, island_bound: usize) {
        if self.states.len() < island_bound {
            self.states.resize(island_bound, VisitState::None);
        }
    }

    fn state(&self, island: IslandId) -> VisitState {
        self.states
            .get(island.id() as usize)
            .copied()
            .unwrap_or(VisitState::None)
    }

    fn mark(&mut self, island: IslandId, state: VisitState) {
        let index = island.id() as usize;
        if index >= self.states.len() {
            self.states.resize(index + 1, VisitState::None);
        }
        if self.states[index] == VisitState::None {
            self.touched.push(index);
        }
        self.states[index] = state;
    }

    fn push(&mut self, direction: FloodDirection, island: IslandId) {
        match direction {
            FloodDirection::Forward => self.forward.push_back(island),
            FloodDirection::Reverse => self.reverse.push_back(island),
        }
    }

    fn pop(&mut self, direction: FloodDirection) -> Option<IslandId> {
        match direction {
            FloodDirection::Forward => self.forward.pop_front(),
            FloodDirection::Reverse => self.reverse.pop_front(),
        }
    }

    fn either_exhausted(&self) -> bool {
        self.forward.is_empty() || self.reverse.is_empty()
    }

    fn clear(&mut self) {
        for &index in &self.touched {
            self.states[index] = VisitState::None;
        }
        self.touched.clear();
        self.forward.clear();
        self.reverse.clear();
    }
}

#[derive(Debug, Default)]
struct MeshIslandGraph {
    nodes: HashMap<IslandId, IslandNode>,
    transitions: HashMap<TransitionId, OffMeshLinkRecord>,
    scratch: FloodScratch,
    /// One past the largest island id seen, used to size the scratch state
    island_bound: usize,
}

impl MeshIslandGraph {
    fn note_island(&mut self, island: IslandId) {
        self.island_bound = self.island_bound.max(island.id() as usize + 1);
    }

    fn drop_if_linkless(&mut self, mesh: MeshId, island: IslandId) {
        if self
            .nodes
            .get(&island)
            .is_some_and(|node| node.links.is_empty())
        {
            self.nodes.remove(&island);
            log::debug!("island {} dropped, no links left", GlobalIslandId::new(mesh, island));
        }
    }

    fn remove_transition(&mut self, mesh: MeshId, id: TransitionId) -> bool {
        let Some(record) = self.transitions.remove(&id) else {
            return false;
        };

        let origin = record.origin;
        let taken = self.nodes.get_mut(&origin).and_then(|node| {
            node.take_link(|l| l.transition == id && l.is_outward())
        });
        let Some(link) = taken else {
            consistency_violation!(
                "transition {} has a record but no edge on island {}",
                id,
                GlobalIslandId::new(mesh, origin)
            );
            return true;
        };
        self.drop_if_linkless(mesh, origin);

        let destination = link.to;
        if destination == origin {
            // Both ends on one island share a single record, already taken.
            log::debug!(
                "off-mesh transition {} removed from island {}",
                id,
                GlobalIslandId::new(mesh, origin)
            );
            return true;
        }
        let mirrored = self.nodes.get_mut(&destination).and_then(|node| {
            node.take_link(|l| l.transition == id && l.to == origin)
        });
        if mirrored.is_none() {
            consistency_violation!(
                "transition {} has no mirrored edge on island {}",
                id,
                GlobalIslandId::new(mesh, destination)
            );
        }
        self.drop_if_linkless(mesh, destination);

        log::debug!(
            "off-mesh transition {} removed: {} -> {}",
            id,
            GlobalIslandId::new(mesh, origin),
            GlobalIslandId::new(mesh, destination)
        );
        true
    }
}

fn transition_access(
    transitions: &HashMap<TransitionId, OffMeshLinkRecord>,
    id: TransitionId,
    requester: RequesterId,
    owners: &dyn TransitionOwners,
) -> TransitionAccess {
    let Some(record) = transitions.get(&id) else {
        return TransitionAccess::Unresolved;
    };
    match owners.can_requester_use(record.owner, requester) {
        Some(true) => TransitionAccess::Usable,
        Some(false) => TransitionAccess::Rejected,
        None => TransitionAccess::Unresolved,
    }
}

fn transition_passes(
    transitions: &HashMap<TransitionId, OffMeshLinkRecord>,
    id: TransitionId,
    context: &RequesterContext<'_>,
    filter: Option<&QueryFilter>,
) -> bool {
    if let Some(filter) = filter {
        match transitions.get(&id) {
            Some(record) if filter.pass_filter(record.annotation) => {}
            _ => return false,
        }
    }
    match transition_access(transitions, id, context.requester, context.owners) {
        TransitionAccess::Usable => true,
        TransitionAccess::Rejected => false,
        TransitionAccess::Unresolved => {
            log::warn!("off-mesh transition {} no longer resolves, pruned", id);
            false
        }
    }
}

/// Runs the adaptive bidirectional flood. The scratch must be prepared and is
/// left dirty for the caller to clear.
#[allow(clippy::too_many_arguments)]
fn flood_bidirectional(
    nodes: &HashMap<IslandId, IslandNode>,
    transitions: &HashMap<TransitionId, OffMeshLinkRecord>,
    scratch: &mut FloodScratch,
    mesh: MeshId,
    from: IslandId,
    to: IslandId,
    mut hub_threshold: usize,
    context: &RequesterContext<'_>,
    filter: Option<&QueryFilter>,
) -> bool {
    let (Some(from_node), Some(to_node)) = (nodes.get(&from), nodes.get(&to)) else {
        return false;
    };

    scratch.mark(from, VisitState::ForwardOpen);
    scratch.push(FloodDirection::Forward, from);
    scratch.mark(to, VisitState::ReverseOpen);
    scratch.push(FloodDirection::Reverse, to);

    let mut direction = if from_node.outward_count <= to_node.inward_count {
        FloodDirection::Forward
    } else {
        FloodDirection::Reverse
    };

    while !scratch.either_exhausted() {
        let Some(current) = scratch.pop(direction) else {
            break;
        };
        let Some(node) = nodes.get(&current) else {
            consistency_violation!(
                "island flood reached unknown island {}",
                GlobalIslandId::new(mesh, current)
            );
            continue;
        };

        let degree = direction.degree(node);
        if degree > hub_threshold {
            // Leave the hub for later and let the other side work.
            scratch.push(direction, current);
            hub_threshold = degree;
            direction = direction.opposite();
            continue;
        }

        for link in node.links.iter().filter(|l| direction.follows(l)) {
            let neighbour = link.to;
            if !nodes.contains_key(&neighbour) {
                consistency_violation!(
                    "island {} links to unknown island {}",
                    GlobalIslandId::new(mesh, current),
                    GlobalIslandId::new(mesh, neighbour)
                );
                continue;
            }

            if link.is_off_mesh()
                && !transition_passes(transitions, link.transition, context, filter)
            {
                continue;
            }

            match scratch.state(neighbour) {
                VisitState::None => {
                    if filter.is_some_and(|f| !f.pass_filter(link.to_annotation)) {
                        scratch.mark(neighbour, VisitState::Closed);
                        continue;
                    }
                    scratch.mark(neighbour, direction.open_state());
                    scratch.push(direction, neighbour);
                }
                state if state == direction.opposite().open_state() => return true,
                _ => {}
            }
        }
    }

    false
}

/// Directed multigraph over the islands of every navigation mesh
#[derive(Debug, Default)]
pub struct IslandConnectivityGraph {
    meshes: HashMap<MeshId, MeshIslandGraph>,
    config: IslandGraphConfig,
}

impl IslandConnectivityGraph {
    /// Creates an empty graph
    pub fn new(config: IslandGraphConfig) -> Self {
        Self {
            meshes: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &IslandGraphConfig {
        &self.config
    }

    /// Registers or strengthens the edge `from -> to` by `degree_delta`.
    ///
    /// A plain two-way adjacency is registered with two calls using symmetric
    /// positive deltas. Negative deltas weaken the edge; a decrement that would
    /// drive a counter below zero is rejected without touching the graph.
    pub fn add_directed_transition(
        &mut self,
        from: GlobalIslandId,
        from_annotation: AreaAnnotation,
        to: GlobalIslandId,
        to_annotation: AreaAnnotation,
        transition: Option<TransitionRef>,
        degree_delta: i32,
    ) -> Result<()> {
        if !from.is_valid() || !to.is_valid() {
            return Err(Error::InvalidParam(format!(
                "island edge {} -> {} uses an invalid island",
                from, to
            )));
        }
        if from.mesh != to.mesh {
            return Err(Error::InvalidParam(format!(
                "island edge {} -> {} crosses navigation meshes",
                from, to
            )));
        }
        if degree_delta == 0 {
            return Ok(());
        }

        let mesh_id = from.mesh;
        let transition_id = transition.map_or(TransitionId::INVALID, |t| t.id);

        if degree_delta < 0 {
            let decrement = degree_delta.unsigned_abs();
            let Some(mesh) = self.meshes.get(&mesh_id) else {
                consistency_violation!(
                    "degree counter underflow on link {} -> {} (delta {})",
                    from,
                    to,
                    degree_delta
                );
                return Err(Error::CounterUnderflow { from, to });
            };
            let out_ok = mesh
                .nodes
                .get(&from.island)
                .and_then(|n| n.find_link(to.island, transition_id).map(|i| n.links[i]))
                .is_some_and(|l| l.out_degree >= decrement);
            let in_ok = mesh
                .nodes
                .get(&to.island)
                .and_then(|n| n.find_link(from.island, transition_id).map(|i| n.links[i]))
                .is_some_and(|l| l.in_degree >= decrement);
            if !out_ok || !in_ok {
                consistency_violation!(
                    "degree counter underflow on link {} -> {} (delta {})",
                    from,
                    to,
                    degree_delta
                );
                return Err(Error::CounterUnderflow { from, to });
            }
        } else if let Some(transition) = transition {
            if self
                .meshes
                .get(&mesh_id)
                .is_some_and(|m| m.transitions.contains_key(&transition.id))
            {
                consistency_violation!("transition {} is already registered", transition.id);
                return Err(Error::DuplicateTransition(transition.id));
            }
        }

        let mesh = self.meshes.entry(mesh_id).or_default();
        if let Some(transition) = transition.filter(|_| degree_delta > 0) {
            mesh.transitions.insert(
                transition.id,
                OffMeshLinkRecord {
                    origin: from.island,
                    destination_face: transition.destination_face,
                    owner: transition.owner,
                    annotation: transition.annotation,
                },
            );
        }

        mesh.note_island(from.island);
        mesh.note_island(to.island);

        let created = !mesh.nodes.contains_key(&from.island) || !mesh.nodes.contains_key(&to.island);

        mesh.nodes
            .entry(from.island)
            .or_insert_with(|| IslandNode::new(from_annotation))
            .adjust_link(to.island, to_annotation, transition_id, degree_delta, 0);
        mesh.nodes
            .entry(to.island)
            .or_insert_with(|| IslandNode::new(to_annotation))
            .adjust_link(from.island, from_annotation, transition_id, 0, degree_delta);

        if let Some(node) = mesh.nodes.get_mut(&from.island) {
            node.annotation = from_annotation;
        }
        if let Some(node) = mesh.nodes.get_mut(&to.island) {
            node.annotation = to_annotation;
        }

        if degree_delta < 0 {
            if transition_id.is_valid()
                && mesh
                    .nodes
                    .get(&from.island)
                    .map_or(true, |n| n.find_link(to.island, transition_id).is_none())
            {
                mesh.transitions.remove(&transition_id);
            }
            mesh.drop_if_linkless(mesh_id, from.island);
            mesh.drop_if_linkless(mesh_id, to.island);
        }

        if created {
            log::debug!("island edge {} -> {} created", from, to);
        }
        Ok(())
    }

    /// Removes the off-mesh edge of `transition` from both touched islands.
    ///
    /// Unknown or already removed ids are ignored and return false.
    pub fn remove_transition(&mut self, mesh: MeshId, transition: TransitionId) -> bool {
        let Some(graph) = self.meshes.get_mut(&mesh) else {
            return false;
        };
        graph.remove_transition(mesh, transition)
    }

    /// Removes every off-mesh edge registered by one external object
    pub fn remove_all_for_object(&mut self, mesh: MeshId, owner: ObjectId) -> usize {
        let Some(graph) = self.meshes.get_mut(&mesh) else {
            return 0;
        };

        let owned: Vec<TransitionId> = graph
            .transitions
            .iter()
            .filter(|(_, record)| record.owner == owner)
            .map(|(&id, _)| id)
            .collect();

        owned
            .into_iter()
            .filter(|&id| graph.remove_transition(mesh, id))
            .count()
    }

    /// Pre-sizes the visitation state of a mesh from its known island count
    pub fn reserve_islands(&mut self, mesh: MeshId, island_count: usize) {
        let graph = self.meshes.entry(mesh).or_default();
        graph.island_bound = graph.island_bound.max(island_count + 1);
        graph.scratch.prepare(graph.island_bound);
    }

    /// Answers whether `to` can be reached from `from`.
    ///
    /// Identical islands are always connected; islands of different meshes,
    /// invalid ids and islands without any edge never are.
    pub fn are_connected(
        &mut self,
        context: &RequesterContext<'_>,
        from: GlobalIslandId,
        to: GlobalIslandId,
        filter: Option<&QueryFilter>,
    ) -> bool {
        if !from.is_valid() || !to.is_valid() {
            return false;
        }
        if from == to {
            return true;
        }
        if from.mesh != to.mesh {
            return false;
        }

        let hub_threshold = self.config.initial_hub_degree_threshold;
        let Some(graph) = self.meshes.get_mut(&from.mesh) else {
            return false;
        };

        let MeshIslandGraph {
            nodes,
            transitions,
            scratch,
            island_bound,
        } = graph;

        scratch.prepare(*island_bound);
        let connected = flood_bidirectional(
            nodes,
            transitions,
            scratch,
            from.mesh,
            from.island,
            to.island,
            hub_threshold,
            context,
            filter,
        );
        scratch.clear();
        connected
    }

    /// Collects every island reachable from `seed` along outgoing edges,
    /// the seed included, stopping once `max_count` islands were written.
    pub fn enumerate_reachable_set(
        &mut self,
        seed: GlobalIslandId,
        out: &mut Vec<GlobalIslandId>,
        max_count: usize,
    ) -> usize {
        out.clear();
        if !seed.is_valid() || max_count == 0 {
            return 0;
        }
        out.push(seed);

        let Some(graph) = self.meshes.get_mut(&seed.mesh) else {
            return out.len();
        };
        let MeshIslandGraph {
            nodes,
            scratch,
            island_bound,
            ..
        } = graph;
        if !nodes.contains_key(&seed.island) {
            return out.len();
        }

        scratch.prepare(*island_bound);
        scratch.mark(seed.island, VisitState::ForwardOpen);
        scratch.push(FloodDirection::Forward, seed.island);

        'flood: while let Some(current) = scratch.pop(FloodDirection::Forward) {
            let Some(node) = nodes.get(&current) else {
                consistency_violation!(
                    "reachable-set flood reached unknown island {}",
                    GlobalIslandId::new(seed.mesh, current)
                );
                continue;
            };
            for link in node.links.iter().filter(|l| l.is_outward()) {
                if scratch.state(link.to) != VisitState::None {
                    continue;
                }
                if out.len() >= max_count {
                    break 'flood;
                }
                scratch.mark(link.to, VisitState::ForwardOpen);
                scratch.push(FloodDirection::Forward, link.to);
                out.push(GlobalIslandId::new(seed.mesh, link.to));
            }
        }

        scratch.clear();
        out.len()
    }

    /// Drops every mesh
    pub fn reset_all(&mut self) {
        self.meshes.clear();
    }

    /// Drops all islands, edges and records of one mesh
    pub fn reset_for_mesh(&mut self, mesh: MeshId) {
        if self.meshes.remove(&mesh).is_some() {
            log::debug!("island graph of mesh {} reset", mesh);
        }
    }

    /// Gets the node of an island, if it has any edges
    pub fn node(&self, island: GlobalIslandId) -> Option<&IslandNode> {
        self.meshes.get(&island.mesh)?.nodes.get(&island.island)
    }

    /// Gets the bookkeeping record of an off-mesh edge
    pub fn transition_record(
        &self,
        mesh: MeshId,
        transition: TransitionId,
    ) -> Option<&OffMeshLinkRecord> {
        self.meshes.get(&mesh)?.transitions.get(&transition)
    }

    /// Iterates the islands of a mesh that currently have a node
    pub fn islands(&self, mesh: MeshId) -> impl Iterator<Item = (IslandId, &IslandNode)> + '_ {
        self.meshes
            .get(&mesh)
            .into_iter()
            .flat_map(|graph| graph.nodes.iter().map(|(&id, node)| (id, node)))
    }

    /// Gets the size of the graph
    pub fn stats(&self) -> IslandGraphStats {
        let mut stats = IslandGraphStats {
            mesh_count: self.meshes.len(),
            ..Default::default()
        };
        for graph in self.meshes.values() {
            stats.node_count += graph.nodes.len();
            stats.link_count += graph.nodes.values().map(|n| n.links.len()).sum::<usize>();
            stats.transition_count += graph.transitions.len();
        }
        stats
    }

    /// Builds a resolver that lets a route search check off-mesh transitions
    /// of one mesh against this graph's records
    pub fn transition_resolver<'a>(
        &'a self,
        mesh: MeshId,
        owners: &'a dyn TransitionOwners,
    ) -> MeshTransitionResolver<'a> {
        MeshTransitionResolver {
            graph: self,
            mesh,
            owners,
        }
    }
}

/// [`TransitionResolver`] backed by the off-mesh records of one mesh
#[derive(Clone, Copy)]
pub struct MeshTransitionResolver<'a> {
    graph: &'a IslandConnectivityGraph,
    mesh: MeshId,
    owners: &'a dyn TransitionOwners,
}

impl TransitionResolver for MeshTransitionResolver<'_> {
    fn resolve(&self, transition: TransitionId, requester: RequesterId) -> TransitionAccess {
        match self.graph.meshes.get(&self.mesh) {
            Some(graph) => transition_access(&graph.transitions, transition, requester, self.owners),
            None => TransitionAccess::Unresolved,
        }
    }
}
