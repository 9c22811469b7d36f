//! Node pool and open list for the route search

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use meshnav_common::{FaceId, TransitionId, Vec3};

/// Identifies a search node.
///
/// Arriving at the same face through different off-mesh transitions yields
/// distinct nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchNodeKey {
    pub face: FaceId,
    /// Transition used to arrive, invalid for plain adjacency
    pub transition: TransitionId,
}

impl SearchNodeKey {
    pub fn new(face: FaceId, transition: TransitionId) -> Self {
        Self { face, transition }
    }

    pub fn plain(face: FaceId) -> Self {
        Self::new(face, TransitionId::INVALID)
    }
}

/// Node state in the search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Node is in the open list
    Open,
    /// Node has been expanded
    Closed,
}

/// Search node
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub key: SearchNodeKey,
    /// Index of the predecessor in the pool
    pub parent: Option<usize>,
    /// Accumulated cost from the start
    pub cost: f32,
    /// Cost plus heuristic
    pub total: f32,
    /// Sample location where the route enters the face
    pub location: Vec3,
    pub state: NodeState,
}

/// Bounded arena of search nodes with key lookup
#[derive(Debug)]
pub struct NodePool {
    nodes: Vec<SearchNode>,
    lookup: HashMap<SearchNodeKey, usize>,
    max_nodes: usize,
}

impl NodePool {
    /// Creates a pool holding at most `max_nodes` nodes
    pub fn new(max_nodes: usize) -> Self {
        Self {
            nodes: Vec::new(),
            lookup: HashMap::new(),
            max_nodes,
        }
    }

    /// Clears the pool, keeping its allocations
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.lookup.clear();
    }

    /// Finds the node for a key
    pub fn find(&self, key: &SearchNodeKey) -> Option<usize> {
        self.lookup.get(key).copied()
    }

    /// Allocates a node, returning `None` when the pool is full
    pub fn allocate(&mut self, key: SearchNodeKey, location: Vec3) -> Option<usize> {
        if self.nodes.len() >= self.max_nodes {
            return None;
        }
        let index = self.nodes.len();
        self.nodes.push(SearchNode {
            key,
            parent: None,
            cost: 0.0,
            total: 0.0,
            location,
            state: NodeState::Open,
        });
        self.lookup.insert(key, index);
        Some(index)
    }

    pub fn get(&self, index: usize) -> Option<&SearchNode> {
        self.nodes.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut SearchNode> {
        self.nodes.get_mut(index)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Gets memory used by the pool
    pub fn mem_used(&self) -> usize {
        std::mem::size_of::<Self>()
            + std::mem::size_of::<SearchNode>() * self.nodes.capacity()
            + (std::mem::size_of::<SearchNodeKey>() + std::mem::size_of::<usize>())
                * self.lookup.capacity()
    }
}

/// Open list entry
#[derive(Debug, Clone, Copy)]
struct HeapNode {
    index: usize,
    total: f32,
}

impl PartialEq for HeapNode {
    fn eq(&self, other: &Self) -> bool {
        self.total == other.total
    }
}

impl Eq for HeapNode {}

impl PartialOrd for HeapNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the heap pops the lowest total first
        other.total.total_cmp(&self.total)
    }
}

/// Min-priority frontier.
///
/// A node whose cost improves is pushed again; the older entries are skipped
/// on pop because their total no longer matches the node.
#[derive(Debug, Default)]
pub struct OpenList {
    heap: BinaryHeap<HeapNode>,
}

impl OpenList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn push(&mut self, index: usize, total: f32) {
        self.heap.push(HeapNode { index, total });
    }

    /// Pops the open node with the lowest total, skipping stale entries
    pub fn pop(&mut self, pool: &NodePool) -> Option<usize> {
        while let Some(entry) = self.heap.pop() {
            if pool
                .get(entry.index)
                .is_some_and(|n| n.state == NodeState::Open && n.total == entry.total)
            {
                return Some(entry.index);
            }
        }
        None
    }

    /// Drops stale entries at the top and checks if anything is left
    pub fn is_empty(&mut self, pool: &NodePool) -> bool {
        while let Some(entry) = self.heap.peek() {
            let live = pool
                .get(entry.index)
                .is_some_and(|n| n.state == NodeState::Open && n.total == entry.total);
            if live {
                return false;
            }
            self.heap.pop();
        }
        true
    }

    /// Number of entries, stale ones included
    pub fn len(&self) -> usize {
        self.heap.len()
    }
}
