//! Tests for the time-sliced route search
//!
//! Route costs are compared against a Dijkstra reference on random grids;
//! tie-breaking between equal-cost routes is never asserted.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::test_mesh_helpers::{
        add_link, face, open_grid, reference_route_cost, Lcg, OwnerRegistry, TickingClock,
    };
    use crate::{
        AcceptAllTransitions, DangerAccumulation, DangerArea, DangerAreaList, FaceAdjacency,
        FrameQuota, GridNavMesh, IslandConnectivityGraph, ManualClock, OffMeshLinkTable,
        QueryFilter, RouteRequest, RouteSearch, RouteSearchConfig, RouteSearchState,
        SearchContext, TransitionRef, WayFace, WeightingKind,
    };
    use meshnav_common::{
        AreaAnnotation, AreaFlags, Error, FaceId, GlobalIslandId, IslandId, MeshId, ObjectId,
        RequesterId, TransitionId, Vec3,
    };

    const REQUESTER: RequesterId = RequesterId::new(1);

    fn request(grid: &GridNavMesh, from: (u32, u32), to: (u32, u32)) -> RouteRequest {
        RouteRequest::new(
            REQUESTER,
            face(grid, from.0, from.1),
            grid.cell_center(from.0, from.1),
            face(grid, to.0, to.1),
            grid.cell_center(to.0, to.1),
        )
    }

    fn unbounded_quota() -> FrameQuota<ManualClock> {
        FrameQuota::new(ManualClock::new(), Duration::ZERO)
    }

    /// Runs a search to completion with no time limit
    fn solve(context: &SearchContext<'_>, request: RouteRequest) -> RouteSearch {
        let mut search = RouteSearch::new(RouteSearchConfig { max_nodes: 1 << 16 });
        search.set_up_for_search(context, request).unwrap();
        let mut quota = unbounded_quota();
        let state = search.run(context, &mut quota);
        assert!(state.is_terminal(), "unbounded search ended in {:?}", state);
        search
    }

    fn faces_of(route: &[WayFace]) -> Vec<FaceId> {
        route.iter().map(|w| w.face).collect()
    }

    #[test]
    fn test_straight_route() {
        let grid = open_grid(6, 3);
        let links = OffMeshLinkTable::default();
        let context = SearchContext::new(&grid, &links, &AcceptAllTransitions);

        let search = solve(&context, request(&grid, (0, 1), (4, 1)));
        assert_eq!(search.state(), RouteSearchState::GoalReached);

        let route = search.route().unwrap();
        assert_eq!(
            faces_of(&route),
            (0..=4).map(|x| face(&grid, x, 1)).collect::<Vec<_>>()
        );
        assert!(route.iter().all(|w| !w.transition.is_valid()));
        assert!((search.route_cost().unwrap() - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_start_equals_goal_runs_one_step() {
        let grid = open_grid(3, 3);
        let links = OffMeshLinkTable::default();
        let context = SearchContext::new(&grid, &links, &AcceptAllTransitions);

        let mut search = RouteSearch::default();
        search
            .set_up_for_search(&context, request(&grid, (1, 1), (1, 1)))
            .unwrap();
        let mut quota = unbounded_quota();
        assert!(search.can_do_step(&quota));
        assert_eq!(search.step(&context, &mut quota), RouteSearchState::GoalReached);
        assert_eq!(search.steps(), 1);
        assert_eq!(
            search.route().unwrap(),
            vec![WayFace {
                face: face(&grid, 1, 1),
                transition: TransitionId::INVALID
            }]
        );
        assert_eq!(search.route_cost(), Some(0.0));
        assert!(!search.can_do_step(&quota));
    }

    #[test]
    fn test_unreachable_goal_empties_open_list() {
        let mut grid = open_grid(5, 3);
        for z in 0..3 {
            grid.set_cell(2, z, None).unwrap();
        }
        let links = OffMeshLinkTable::default();
        let context = SearchContext::new(&grid, &links, &AcceptAllTransitions);

        let search = solve(&context, request(&grid, (0, 0), (4, 2)));
        assert_eq!(search.state(), RouteSearchState::OpenListEmpty);
        assert!(search.route().is_err());
        assert_eq!(search.route_cost(), None);
        // Only the left half was explored
        assert_eq!(search.node_count(), 6);
    }

    #[test]
    fn test_off_mesh_link_bridges_gap() {
        let mut grid = open_grid(5, 3);
        for z in 0..3 {
            grid.set_cell(2, z, None).unwrap();
        }
        let mut links = OffMeshLinkTable::default();
        let jump = add_link(&mut grid, &mut links, (1, 1), (3, 1));

        let context = SearchContext::new(&grid, &links, &AcceptAllTransitions);
        let search = solve(&context, request(&grid, (0, 1), (4, 1)));
        assert_eq!(search.state(), RouteSearchState::GoalReached);

        let route = search.route().unwrap();
        assert_eq!(
            route,
            vec![
                WayFace { face: face(&grid, 0, 1), transition: TransitionId::INVALID },
                WayFace { face: face(&grid, 1, 1), transition: jump },
                WayFace { face: face(&grid, 3, 1), transition: TransitionId::INVALID },
                WayFace { face: face(&grid, 4, 1), transition: TransitionId::INVALID },
            ]
        );
    }

    #[test]
    fn test_stale_or_refused_transitions_are_pruned() {
        let mut grid = open_grid(5, 3);
        for z in 0..3 {
            grid.set_cell(2, z, None).unwrap();
        }
        let mut links = OffMeshLinkTable::default();
        let jump = add_link(&mut grid, &mut links, (1, 1), (3, 1));

        let mesh = MeshId::new(1);
        let walkable = AreaAnnotation::walkable();
        let mut graph = IslandConnectivityGraph::default();
        graph
            .add_directed_transition(
                GlobalIslandId::new(mesh, IslandId::new(1)),
                walkable,
                GlobalIslandId::new(mesh, IslandId::new(2)),
                walkable,
                Some(TransitionRef {
                    id: jump,
                    destination_face: face(&grid, 3, 1),
                    owner: ObjectId::new(8),
                    annotation: walkable,
                }),
                1,
            )
            .unwrap();

        let mut owners = OwnerRegistry::default();
        owners.allow_only(ObjectId::new(8), REQUESTER);
        {
            let resolver = graph.transition_resolver(mesh, &owners);
            let context = SearchContext::new(&grid, &links, &resolver);
            let search = solve(&context, request(&grid, (0, 1), (4, 1)));
            assert_eq!(search.state(), RouteSearchState::GoalReached);

            let stranger = RouteRequest {
                requester: RequesterId::new(2),
                ..request(&grid, (0, 1), (4, 1))
            };
            let search = solve(&context, stranger);
            assert_eq!(search.state(), RouteSearchState::OpenListEmpty);
        }

        owners.forget(ObjectId::new(8));
        let resolver = graph.transition_resolver(mesh, &owners);
        let context = SearchContext::new(&grid, &links, &resolver);
        let search = solve(&context, request(&grid, (0, 1), (4, 1)));
        assert_eq!(search.state(), RouteSearchState::OpenListEmpty);
    }

    #[test]
    fn test_filter_excludes_areas() {
        let mut grid = open_grid(5, 3);
        let water = AreaAnnotation::new(1, AreaFlags::SWIM);
        for z in 0..2 {
            grid.set_cell(2, z, Some(water)).unwrap();
        }
        let links = OffMeshLinkTable::default();
        let context = SearchContext::new(&grid, &links, &AcceptAllTransitions);

        let mut dry = QueryFilter::default();
        dry.exclude_flags = AreaFlags::SWIM;
        let search = solve(&context, request(&grid, (0, 0), (4, 0)).with_filter(dry));
        assert_eq!(search.state(), RouteSearchState::GoalReached);
        let route = search.route().unwrap();
        assert!(route
            .iter()
            .all(|w| grid.face_annotation(w.face) != Some(water)));
        assert!(route.contains(&WayFace {
            face: face(&grid, 2, 2),
            transition: TransitionId::INVALID
        }));
    }

    #[test]
    fn test_area_cost_steers_route() {
        let mut grid = open_grid(5, 3);
        let mud = AreaAnnotation::new(3, AreaFlags::WALK);
        for x in 1..4 {
            grid.set_cell(x, 0, Some(mud)).unwrap();
        }
        let links = OffMeshLinkTable::default();
        let context = SearchContext::new(&grid, &links, &AcceptAllTransitions);

        let mut filter = QueryFilter::default();
        filter.set_area_cost(3, 10.0);
        let search = solve(&context, request(&grid, (0, 0), (4, 0)).with_filter(filter));
        let route = search.route().unwrap();
        assert!(!route.iter().any(|w| grid.face_annotation(w.face) == Some(mud)));
        assert!((search.route_cost().unwrap() - 6.0).abs() < 1e-4);
    }

    #[test]
    fn test_cheap_area_cannot_undercut_straight_line() {
        let mut grid = open_grid(12, 5);
        let road = AreaAnnotation::new(2, AreaFlags::WALK);
        for x in 0..12 {
            grid.set_cell(x, 4, Some(road)).unwrap();
        }
        let links = OffMeshLinkTable::default();
        let context = SearchContext::new(&grid, &links, &AcceptAllTransitions);

        let mut filter = QueryFilter::default();
        filter.set_area_cost(2, 0.1);
        let route_request = request(&grid, (0, 0), (11, 0)).with_filter(filter.clone());
        let expected = reference_route_cost(
            &grid,
            &links,
            route_request.start_face,
            route_request.start_location,
            route_request.goal_face,
            route_request.goal_location,
            &filter,
            &DangerAreaList::default(),
        )
        .unwrap();
        let search = solve(&context, route_request);
        assert!((search.route_cost().unwrap() - expected).abs() < 1e-4);
        assert!((search.route_cost().unwrap() - 11.0).abs() < 1e-4);

        let mut cheap = QueryFilter::default();
        cheap.area_cost[2] = 0.1;
        let mut search = RouteSearch::default();
        let rejected = request(&grid, (0, 0), (11, 0)).with_filter(cheap);
        assert!(search.set_up_for_search(&context, rejected).is_err());
        assert_eq!(search.state(), RouteSearchState::Idle);
    }

    #[test]
    fn test_danger_area_steers_route() {
        let grid = open_grid(7, 5);
        let links = OffMeshLinkTable::default();
        let context = SearchContext::new(&grid, &links, &AcceptAllTransitions);

        let mut dangers = DangerAreaList::new(DangerAccumulation::Sum);
        dangers.push(DangerArea::new(
            WeightingKind::Range,
            grid.cell_center(3, 2),
            1.2,
            100,
        ));

        let search = solve(&context, request(&grid, (0, 2), (6, 2)).with_dangers(dangers.clone()));
        let route = search.route().unwrap();
        let hazard_faces = [face(&grid, 3, 2), face(&grid, 2, 2), face(&grid, 4, 2)];
        assert!(route.iter().all(|w| !hazard_faces.contains(&w.face)));

        let reference = reference_route_cost(
            &grid,
            &links,
            face(&grid, 0, 2),
            grid.cell_center(0, 2),
            face(&grid, 6, 2),
            grid.cell_center(6, 2),
            &QueryFilter::default(),
            &dangers,
        )
        .unwrap();
        assert!((search.route_cost().unwrap() - reference).abs() < 1e-3);
    }

    #[test]
    fn test_cost_matches_reference_on_random_grids() {
        for seed in 0..25u64 {
            let mut rng = Lcg::new(seed);
            let (width, height) = (8 + rng.below(5), 6 + rng.below(5));
            let mut grid = GridNavMesh::new(width, height, 4, 1.0).unwrap();

            for z in 0..height {
                for x in 0..width {
                    match rng.below(10) {
                        0 | 1 => grid.set_cell(x, z, None).unwrap(),
                        2 => grid
                            .set_cell(x, z, Some(AreaAnnotation::new(2, AreaFlags::WALK)))
                            .unwrap(),
                        3 => grid
                            .set_cell(x, z, Some(AreaAnnotation::new(5, AreaFlags::SWIM)))
                            .unwrap(),
                        _ => {}
                    }
                }
            }

            let faces: Vec<(FaceId, u32, u32)> = grid.faces().collect();
            if faces.len() < 2 {
                continue;
            }
            let mut links = OffMeshLinkTable::default();
            for _ in 0..rng.below(6) {
                let (_, ax, az) = faces[rng.below(faces.len() as u32) as usize];
                let (_, bx, bz) = faces[rng.below(faces.len() as u32) as usize];
                add_link(&mut grid, &mut links, (ax, az), (bx, bz));
            }

            let mut filter = QueryFilter::default();
            filter.set_area_cost(2, 1.0 + rng.below(4) as f32);
            filter.set_area_cost(5, 1.0 + rng.below(8) as f32);

            let mut dangers = DangerAreaList::default();
            if rng.chance(50) {
                let (_, hx, hz) = faces[rng.below(faces.len() as u32) as usize];
                dangers.push(DangerArea::new(
                    WeightingKind::InverseDistance,
                    grid.cell_center(hx, hz),
                    2.0,
                    1 + rng.below(5),
                ));
            }

            let context = SearchContext::new(&grid, &links, &AcceptAllTransitions);
            for _ in 0..6 {
                let (start, sx, sz) = faces[rng.below(faces.len() as u32) as usize];
                let (goal, gx, gz) = faces[rng.below(faces.len() as u32) as usize];
                let start_location = grid.cell_center(sx, sz) + Vec3::new(0.2, 0.0, -0.1);
                let goal_location = grid.cell_center(gx, gz) + Vec3::new(-0.3, 0.0, 0.25);

                let search = solve(
                    &context,
                    RouteRequest::new(REQUESTER, start, start_location, goal, goal_location)
                        .with_filter(filter.clone())
                        .with_dangers(dangers.clone()),
                );
                let expected = reference_route_cost(
                    &grid,
                    &links,
                    start,
                    start_location,
                    goal,
                    goal_location,
                    &filter,
                    &dangers,
                );

                match expected {
                    Some(cost) => {
                        assert_eq!(search.state(), RouteSearchState::GoalReached, "seed {}", seed);
                        let found = search.route_cost().unwrap();
                        assert!(
                            (found - cost).abs() < 1e-3,
                            "seed {}: found {} expected {}",
                            seed,
                            found,
                            cost
                        );
                        let route = search.route().unwrap();
                        assert_eq!(route.first().map(|w| w.face), Some(start));
                        assert_eq!(route.last().map(|w| w.face), Some(goal));
                    }
                    None => {
                        assert_eq!(search.state(), RouteSearchState::OpenListEmpty, "seed {}", seed)
                    }
                }
            }
        }
    }

    #[test]
    fn test_quota_suspends_and_resumes() {
        let mut grid = open_grid(12, 8);
        for z in 1..8 {
            grid.set_cell(6, z, None).unwrap();
        }
        let links = OffMeshLinkTable::default();
        let context = SearchContext::new(&grid, &links, &AcceptAllTransitions);
        let route_request = request(&grid, (0, 7), (11, 7));

        let reference = solve(&context, route_request.clone());
        assert_eq!(reference.state(), RouteSearchState::GoalReached);

        let tick = Duration::from_micros(10);
        let mut quota = FrameQuota::new(TickingClock::new(tick), tick * 3);
        let mut search = RouteSearch::new(RouteSearchConfig { max_nodes: 1 << 16 });
        search.set_up_for_search(&context, route_request).unwrap();

        let mut frames = 0;
        loop {
            let mut steps_this_frame = 0;
            while search.can_do_step(&quota) {
                assert!(quota.consumed() < quota.quota());
                search.step(&context, &mut quota);
                steps_this_frame += 1;
            }
            assert!(steps_this_frame <= 3);

            let state = search.run(&context, &mut quota);
            if state.is_terminal() {
                break;
            }
            assert_eq!(state, RouteSearchState::QuotaExceeded);
            assert!(!search.can_do_step(&quota));

            quota.new_frame();
            frames += 1;
            assert!(frames < 10_000, "search never finished");
        }

        assert!(frames > 1);
        assert_eq!(search.state(), RouteSearchState::GoalReached);
        assert_eq!(search.route().unwrap(), reference.route().unwrap());
        assert_eq!(search.route_cost(), reference.route_cost());
        assert_eq!(search.steps(), reference.steps());

        let stats = quota.stats();
        assert_eq!(stats.completed_searches, 1);
        assert_eq!(stats.peak_steps, search.steps());
        assert_eq!(stats.total_time, tick * search.steps() as u32);
    }

    #[test]
    fn test_node_budget_is_respected() {
        let grid = open_grid(20, 20);
        let links = OffMeshLinkTable::default();
        let context = SearchContext::new(&grid, &links, &AcceptAllTransitions);

        let mut search = RouteSearch::new(RouteSearchConfig { max_nodes: 16 });
        search
            .set_up_for_search(&context, request(&grid, (0, 0), (19, 19)))
            .unwrap();
        let state = search.run(&context, &mut unbounded_quota());
        assert!(state.is_terminal());
        assert!(search.node_count() <= 16);
    }

    #[test]
    fn test_set_up_rejects_missing_faces() {
        let mut grid = open_grid(3, 3);
        let links = OffMeshLinkTable::default();
        let blocked = face(&grid, 1, 1);
        grid.set_cell(1, 1, None).unwrap();
        let context = SearchContext::new(&grid, &links, &AcceptAllTransitions);

        let mut search = RouteSearch::default();
        let bad = RouteRequest::new(
            REQUESTER,
            blocked,
            Vec3::ZERO,
            face(&grid, 0, 0),
            Vec3::ZERO,
        );
        assert!(search.set_up_for_search(&context, bad).is_err());
        assert_eq!(search.state(), RouteSearchState::Idle);

        let mut quota = unbounded_quota();
        assert!(!search.can_do_step(&quota));
        assert_eq!(search.step(&context, &mut quota), RouteSearchState::Idle);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let grid = open_grid(4, 4);
        let links = OffMeshLinkTable::default();
        let context = SearchContext::new(&grid, &links, &AcceptAllTransitions);

        let mut search = solve(&context, request(&grid, (0, 0), (3, 3)));
        assert_eq!(search.state(), RouteSearchState::GoalReached);
        search.reset();
        assert_eq!(search.state(), RouteSearchState::Idle);
        assert_eq!(search.node_count(), 0);
        assert_eq!(search.route(), Err(Error::SearchNotActive));
        assert!(search.request().is_none());
    }
}
