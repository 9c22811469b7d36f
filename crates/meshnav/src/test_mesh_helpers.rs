//! Shared fixtures for the meshnav test modules
//!
//! Grid builders, a deterministic random source, a scriptable owner registry,
//! a clock that ticks on every read, and a Dijkstra reference that uses the
//! same cost model as the route search.

use std::cell::Cell;
use std::collections::HashMap;
use std::time::Duration;

use crate::{
    Clock, DangerAreaList, FaceAdjacency, GridNavMesh, IslandConnectivityGraph, OffMeshLinkTable,
    QueryFilter, SearchNodeKey, TransitionOwners,
};
use meshnav_common::{
    distance, FaceId, GlobalIslandId, IslandId, MeshId, ObjectId, RequesterId, TransitionId, Vec3,
};

/// Linear congruential generator, good enough for reproducible test data
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed ^ 0x5DEE_CE66_D)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 33) as u32
    }

    /// Uniform value in `0..bound`
    pub fn below(&mut self, bound: u32) -> u32 {
        self.next_u32() % bound.max(1)
    }

    /// True with probability `percent / 100`
    pub fn chance(&mut self, percent: u32) -> bool {
        self.below(100) < percent
    }
}

/// Owner registry whose answers the test controls.
///
/// An owner maps to `None` when any requester may use its transitions, or to
/// the single requester it accepts. Unregistered owners do not resolve.
#[derive(Default)]
pub struct OwnerRegistry {
    owners: HashMap<ObjectId, Option<RequesterId>>,
}

impl OwnerRegistry {
    pub fn allow_all(&mut self, owner: ObjectId) {
        self.owners.insert(owner, None);
    }

    pub fn allow_only(&mut self, owner: ObjectId, requester: RequesterId) {
        self.owners.insert(owner, Some(requester));
    }

    pub fn forget(&mut self, owner: ObjectId) {
        self.owners.remove(&owner);
    }
}

impl TransitionOwners for OwnerRegistry {
    fn can_requester_use(&self, owner: ObjectId, requester: RequesterId) -> Option<bool> {
        self.owners
            .get(&owner)
            .map(|only| only.map_or(true, |r| r == requester))
    }
}

/// Clock that moves forward by a fixed tick every time it is read
pub struct TickingClock {
    now: Cell<Duration>,
    tick: Duration,
}

impl TickingClock {
    pub fn new(tick: Duration) -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            tick,
        }
    }
}

impl Clock for TickingClock {
    fn now(&self) -> Duration {
        let now = self.now.get() + self.tick;
        self.now.set(now);
        now
    }
}

pub fn island(mesh: u32, id: u32) -> GlobalIslandId {
    GlobalIslandId::new(MeshId::new(mesh), IslandId::new(id))
}

/// Registers a plain two-way adjacency between two islands
pub fn connect_two_way(graph: &mut IslandConnectivityGraph, a: GlobalIslandId, b: GlobalIslandId) {
    let walkable = meshnav_common::AreaAnnotation::walkable();
    graph
        .add_directed_transition(a, walkable, b, walkable, None, 1)
        .unwrap();
    graph
        .add_directed_transition(b, walkable, a, walkable, None, 1)
        .unwrap();
}

/// Open grid with 4x4 tiles and unit cells
pub fn open_grid(width: u32, height: u32) -> GridNavMesh {
    GridNavMesh::new(width, height, 4, 1.0).unwrap()
}

pub fn face(grid: &GridNavMesh, x: u32, z: u32) -> FaceId {
    grid.face_at(x, z).unwrap()
}

/// Reference shortest route cost, or `None` when the goal is unreachable.
///
/// Mirrors the route search cost model: nodes are `(face, arrival
/// transition)`, the start node sits at the start location, goal face nodes
/// at the goal location and every other node at its face location. All off-mesh
/// transitions are treated as usable.
#[allow(clippy::too_many_arguments)]
pub fn reference_route_cost(
    mesh: &GridNavMesh,
    links: &OffMeshLinkTable,
    start_face: FaceId,
    start_location: Vec3,
    goal_face: FaceId,
    goal_location: Vec3,
    filter: &QueryFilter,
    dangers: &DangerAreaList,
) -> Option<f32> {
    let start_key = SearchNodeKey::plain(start_face);
    let location_of = |key: &SearchNodeKey| -> Vec3 {
        if *key == start_key {
            if start_face == goal_face {
                goal_location
            } else {
                start_location
            }
        } else if key.face == goal_face {
            goal_location
        } else {
            mesh.face_location(key.face).unwrap()
        }
    };

    let mut best: HashMap<SearchNodeKey, f32> = HashMap::new();
    let mut settled: HashMap<SearchNodeKey, f32> = HashMap::new();
    best.insert(start_key, 0.0);
    let mut neighbours = Vec::new();

    loop {
        let (key, cost) = best
            .iter()
            .filter(|(k, _)| !settled.contains_key(k))
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, c)| (*k, *c))?;
        settled.insert(key, cost);
        if key.face == goal_face {
            return Some(cost);
        }

        let from = location_of(&key);
        let mut successors: Vec<(SearchNodeKey, meshnav_common::AreaAnnotation)> = Vec::new();

        neighbours.clear();
        mesh.collect_neighbours(key.face, &mut neighbours);
        for n in &neighbours {
            if filter.pass_filter(n.annotation) {
                successors.push((SearchNodeKey::plain(n.face), n.annotation));
            }
        }
        if let Some(first) = mesh.off_mesh_exit_index(key.face) {
            for exit in links.query_exits(key.face, first) {
                let annotation = mesh.face_annotation(exit.destination).unwrap();
                if filter.pass_filter(annotation) {
                    successors.push((SearchNodeKey::new(exit.destination, exit.transition), annotation));
                }
            }
        }

        for (next, annotation) in successors {
            if settled.contains_key(&next) {
                continue;
            }
            let to = location_of(&next);
            let step = distance(&from, &to) * filter.cost_multiplier(annotation)
                + dangers.cost(to, start_location);
            let candidate = cost + step;
            let entry = best.entry(next).or_insert(f32::INFINITY);
            if candidate < *entry {
                *entry = candidate;
            }
        }
    }
}

/// Adds an off-mesh link and registers nothing else
pub fn add_link(
    grid: &mut GridNavMesh,
    links: &mut OffMeshLinkTable,
    from: (u32, u32),
    to: (u32, u32),
) -> TransitionId {
    let start = face(grid, from.0, from.1);
    let end = face(grid, to.0, to.1);
    links.add_link(grid, start, end, None).unwrap()
}
