//! Face accessibility flood
//!
//! Marks every face reachable from a set of seed faces, following plain
//! adjacency and usable off-mesh exits. Faces outside the result can be pruned
//! from the mesh before any route search runs.

use std::collections::HashSet;

use crate::mesh_interface::FaceNeighbour;
use crate::query_filter::QueryFilter;
use crate::route_search::SearchContext;
use meshnav_common::{FaceId, RequesterId};

/// Collects every face reachable from `seeds`.
///
/// Invalid seeds are ignored. Faces rejected by `filter` are neither entered
/// nor expanded.
pub fn compute_accessibility(
    context: &SearchContext<'_>,
    seeds: &[FaceId],
    requester: RequesterId,
    filter: Option<&QueryFilter>,
) -> HashSet<FaceId> {
    let mut accessible = HashSet::new();
    let mut stack: Vec<FaceId> = Vec::new();
    let mut neighbours: Vec<FaceNeighbour> = Vec::new();

    let passes = |face: FaceId| {
        context
            .mesh
            .face_annotation(face)
            .is_some_and(|annotation| filter.map_or(true, |f| f.pass_filter(annotation)))
    };

    for &seed in seeds {
        if passes(seed) && accessible.insert(seed) {
            stack.push(seed);
        }
    }

    while let Some(face) = stack.pop() {
        neighbours.clear();
        context.mesh.collect_neighbours(face, &mut neighbours);
        for neighbour in &neighbours {
            if passes(neighbour.face) && accessible.insert(neighbour.face) {
                stack.push(neighbour.face);
            }
        }

        let Some(first_exit) = context.mesh.off_mesh_exit_index(face) else {
            continue;
        };
        for exit in context.off_mesh.query_exits(face, first_exit) {
            if !context.transitions.resolve(exit.transition, requester).is_usable() {
                continue;
            }
            if passes(exit.destination) && accessible.insert(exit.destination) {
                stack.push(exit.destination);
            }
        }
    }

    log::debug!(
        "accessibility flood from {} seeds reached {} faces",
        seeds.len(),
        accessible.len()
    );
    accessible
}
