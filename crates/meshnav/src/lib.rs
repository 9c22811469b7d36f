//! Connectivity and routing core for tiled navigation meshes
//!
//! This crate answers two questions about a navigation mesh: whether one
//! region can reach another at all, and which sequence of faces gets there at
//! minimal cost. Both work on top of a per-tile index of off-mesh transitions
//! such as jumps and ladders.
//!
//! # Features
//!
//! - **Off-Mesh Link Table**: per-tile buckets mapping a face to its special exits
//! - **Island Connectivity Graph**: coarse directed graph over connected regions
//!   with a hub-avoiding bidirectional reachability flood
//! - **Time-Sliced A\***: resumable route search under a per-frame time quota
//! - **Cost Weighting**: hazard weighting that biases routes away from danger
//! - **Route Queue**: round-robin scheduling of several searches per frame
//!
//! # Example
//!
//! ```rust,ignore
//! use meshnav::{
//!     AcceptAllTransitions, FrameQuota, GridNavMesh, OffMeshLinkTable, RouteRequest,
//!     RouteSearch, RouteSearchState, SearchContext,
//! };
//! use meshnav_common::RequesterId;
//!
//! let mut grid = GridNavMesh::new(32, 32, 8, 1.0)?;
//! let mut links = OffMeshLinkTable::default();
//! links.add_link(&mut grid, start_face, ledge_face, None)?;
//!
//! let context = SearchContext::new(&grid, &links, &AcceptAllTransitions);
//! let mut search = RouteSearch::default();
//! search.set_up_for_search(&context, RouteRequest::new(
//!     RequesterId::new(1), start_face, start, goal_face, goal,
//! ))?;
//!
//! let mut quota = FrameQuota::default();
//! while search.run(&context, &mut quota) == RouteSearchState::QuotaExceeded {
//!     quota.new_frame();
//! }
//! let route = search.route()?;
//! ```
//!
//! # Architecture
//!
//! - [`OffMeshLinkTable`]: ordered transition index, consumed by both searches
//! - [`IslandConnectivityGraph`]: cheap pre-check before a route search
//! - [`RouteSearch`]: A* working set stepped under a [`FrameQuota`]
//! - [`RouteQueue`]: fixed set of working sets sharing one quota
//! - [`GridNavMesh`]: uniform grid implementing the mesh collaborator traits

pub mod accessibility;
pub mod cost_weighting;
pub mod frame_quota;
pub mod grid_mesh;
pub mod island_connectivity;
pub mod mesh_interface;
pub mod node_pool;
pub mod off_mesh_links;
pub mod query_filter;
pub mod route_queue;
pub mod route_search;

#[cfg(test)]
mod route_search_tests;
#[cfg(test)]
mod test_mesh_helpers;

pub use accessibility::*;
pub use cost_weighting::*;
pub use frame_quota::*;
pub use grid_mesh::*;
pub use island_connectivity::*;
pub use mesh_interface::*;
pub use node_pool::*;
pub use off_mesh_links::*;
pub use query_filter::*;
pub use route_queue::*;
pub use route_search::*;
