//! CLI utility for meshnav route and connectivity queries

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use meshnav::{
    compute_accessibility, AcceptAllOwners, AcceptAllTransitions, DangerAccumulation,
    DangerArea, DangerAreaList, FaceAdjacency, FrameQuota, GridNavMesh,
    IslandConnectivityGraph, OffMeshLinkTable, QueryFilter, RequesterContext, RouteRequest,
    RouteSearch, RouteSearchConfig, RouteSearchState, SearchContext, SystemClock,
    TransitionRef,
};
use meshnav_common::{
    AreaAnnotation, AreaFlags, FaceId, GlobalIslandId, MeshId, ObjectId, RequesterId,
    TransitionId,
};

/// Requester used for every query issued from the command line
const CLI_REQUESTER: RequesterId = RequesterId::new(1);
/// Owner recorded for scenario links
const CLI_OWNER: ObjectId = ObjectId::new(1);
/// Mesh id given to the scenario grid
const CLI_MESH: MeshId = MeshId::new(1);

/// A CLI utility for island connectivity and time-sliced route queries on grid meshes
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search a route between two cells
    Route {
        /// Scenario file (JSON)
        #[clap(long, value_parser)]
        scenario: PathBuf,

        /// Start cell (x,z)
        #[clap(long, value_parser = parse_cell)]
        start: (u32, u32),

        /// Goal cell (x,z)
        #[clap(long, value_parser = parse_cell)]
        goal: (u32, u32),

        /// Time budget per frame in microseconds, 0 for unlimited
        #[clap(long, default_value = "0")]
        quota_us: u64,

        /// Maximum number of search nodes
        #[clap(long, default_value = "4096")]
        max_nodes: usize,

        /// Flags a face must not carry (e.g. 0x2 for swim areas)
        #[clap(long, value_parser = parse_flags, default_value = "0")]
        exclude_flags: AreaFlags,

        /// Output route file (JSON)
        #[clap(long, value_parser)]
        output: Option<PathBuf>,
    },

    /// Check island connectivity between two cells
    Islands {
        /// Scenario file (JSON)
        #[clap(long, value_parser)]
        scenario: PathBuf,

        /// Cell on the source island (x,z)
        #[clap(long, value_parser = parse_cell)]
        from: (u32, u32),

        /// Cell on the target island (x,z), omit to list the reachable set
        #[clap(long, value_parser = parse_cell)]
        to: Option<(u32, u32)>,

        /// Maximum number of islands to list
        #[clap(long, default_value = "256")]
        max_islands: usize,
    },

    /// Count the faces reachable from seed cells
    Accessible {
        /// Scenario file (JSON)
        #[clap(long, value_parser)]
        scenario: PathBuf,

        /// Seed cell (x,z), may be repeated
        #[clap(long, value_parser = parse_cell, required = true)]
        seed: Vec<(u32, u32)>,
    },
}

/// Cell with a non-default annotation
#[derive(Debug, Deserialize)]
struct AreaCell {
    cell: [u32; 2],
    area_type: u8,
    flags: u32,
}

/// Off-mesh link between two cells
#[derive(Debug, Deserialize)]
struct LinkSpec {
    from: [u32; 2],
    to: [u32; 2],
    #[serde(default)]
    bidirectional: bool,
}

/// Grid scenario loaded from JSON
#[derive(Debug, Deserialize)]
struct Scenario {
    width: u32,
    height: u32,
    #[serde(default = "default_tile_size")]
    tile_size: u32,
    #[serde(default = "default_cell_size")]
    cell_size: f32,
    #[serde(default)]
    blocked: Vec<[u32; 2]>,
    #[serde(default)]
    areas: Vec<AreaCell>,
    #[serde(default)]
    area_costs: Vec<(u8, f32)>,
    #[serde(default)]
    links: Vec<LinkSpec>,
    #[serde(default)]
    dangers: Vec<DangerArea>,
    #[serde(default)]
    danger_accumulation: DangerAccumulation,
}

fn default_tile_size() -> u32 {
    16
}

fn default_cell_size() -> f32 {
    1.0
}

/// Mesh and links built from a scenario
struct World {
    grid: GridNavMesh,
    links: OffMeshLinkTable,
    /// Start face, end face and id of every link, in creation order
    link_faces: Vec<(FaceId, FaceId, TransitionId)>,
}

#[derive(Debug, Serialize)]
struct RouteStep {
    cell: [u32; 2],
    face: String,
    transition: Option<u32>,
}

#[derive(Debug, Serialize)]
struct RouteReport {
    state: String,
    cost: Option<f32>,
    frames: u64,
    steps: u64,
    nodes: usize,
    route: Vec<RouteStep>,
}

/// Parse a comma-separated cell coordinate
fn parse_cell(s: &str) -> Result<(u32, u32), String> {
    let parts: Vec<&str> = s.split(',').collect();

    if parts.len() != 2 {
        return Err(format!("Cell must have 2 components, got {}", parts.len()));
    }

    let x = parts[0].trim().parse::<u32>().map_err(|e| e.to_string())?;
    let z = parts[1].trim().parse::<u32>().map_err(|e| e.to_string())?;

    Ok((x, z))
}

/// Parse area flags written in decimal or 0x-prefixed hex
fn parse_flags(s: &str) -> Result<AreaFlags, String> {
    let value = match s.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    }
    .map_err(|e| e.to_string())?;
    Ok(AreaFlags(value))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match args.command {
        Commands::Route {
            scenario,
            start,
            goal,
            quota_us,
            max_nodes,
            exclude_flags,
            output,
        } => find_route(
            &scenario,
            start,
            goal,
            Duration::from_micros(quota_us),
            max_nodes,
            exclude_flags,
            output.as_deref(),
        ),
        Commands::Islands {
            scenario,
            from,
            to,
            max_islands,
        } => query_islands(&scenario, from, to, max_islands),
        Commands::Accessible { scenario, seed } => count_accessible(&scenario, &seed),
    }
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open scenario: {}", path.display()))?;
    let scenario: Scenario = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse scenario: {}", path.display()))?;
    Ok(scenario)
}

fn build_world(scenario: &Scenario) -> Result<World> {
    let mut grid = GridNavMesh::new(
        scenario.width,
        scenario.height,
        scenario.tile_size,
        scenario.cell_size,
    )
    .map_err(|e| anyhow!("Failed to create grid: {}", e))?;

    for area in &scenario.areas {
        let annotation = AreaAnnotation::new(area.area_type, AreaFlags(area.flags));
        grid.set_cell(area.cell[0], area.cell[1], Some(annotation))
            .map_err(|e| anyhow!("Invalid area cell: {}", e))?;
    }
    for cell in &scenario.blocked {
        grid.set_cell(cell[0], cell[1], None)
            .map_err(|e| anyhow!("Invalid blocked cell: {}", e))?;
    }

    let mut links = OffMeshLinkTable::default();
    let mut link_faces = Vec::new();
    for link in &scenario.links {
        let start = cell_face(&grid, (link.from[0], link.from[1]))?;
        let end = cell_face(&grid, (link.to[0], link.to[1]))?;
        let mut endpoints = vec![(start, end)];
        if link.bidirectional {
            endpoints.push((end, start));
        }
        for (from, to) in endpoints {
            let id = links
                .add_link(&mut grid, from, to, None)
                .map_err(|e| anyhow!("Failed to add link: {}", e))?;
            link_faces.push((from, to, id));
        }
    }

    log::info!(
        "Scenario: {}x{} cells, {} faces, {} off-mesh links",
        scenario.width,
        scenario.height,
        grid.face_count(),
        links.link_count()
    );

    Ok(World {
        grid,
        links,
        link_faces,
    })
}

fn cell_face(grid: &GridNavMesh, cell: (u32, u32)) -> Result<FaceId> {
    grid.face_at(cell.0, cell.1)
        .ok_or_else(|| anyhow!("Cell ({}, {}) is blocked or outside the grid", cell.0, cell.1))
}

fn state_name(state: RouteSearchState) -> String {
    format!("{:?}", state)
}

/// Filter and hazards a scenario applies to route searches
fn search_costs(scenario: &Scenario, exclude_flags: AreaFlags) -> (QueryFilter, DangerAreaList) {
    let mut filter = QueryFilter::default();
    filter.exclude_flags = exclude_flags;
    for &(area_type, cost) in &scenario.area_costs {
        filter.set_area_cost(area_type, cost);
    }

    let mut dangers = DangerAreaList::new(scenario.danger_accumulation);
    for danger in &scenario.dangers {
        if !dangers.push(*danger) {
            log::warn!("Ignoring danger area at {:?}, list is full", danger.location);
        }
    }
    (filter, dangers)
}

/// Search a route, one frame quota at a time
fn find_route(
    scenario_path: &Path,
    start: (u32, u32),
    goal: (u32, u32),
    quota: Duration,
    max_nodes: usize,
    exclude_flags: AreaFlags,
    output: Option<&Path>,
) -> Result<()> {
    let scenario = load_scenario(scenario_path)?;
    let world = build_world(&scenario)?;

    let (filter, dangers) = search_costs(&scenario, exclude_flags);

    let request = RouteRequest::new(
        CLI_REQUESTER,
        cell_face(&world.grid, start)?,
        world.grid.cell_center(start.0, start.1),
        cell_face(&world.grid, goal)?,
        world.grid.cell_center(goal.0, goal.1),
    )
    .with_filter(filter)
    .with_dangers(dangers);

    let context = SearchContext::new(&world.grid, &world.links, &AcceptAllTransitions);
    let mut search = RouteSearch::new(RouteSearchConfig { max_nodes });
    search
        .set_up_for_search(&context, request)
        .map_err(|e| anyhow!("Failed to set up search: {}", e))?;

    let mut frame_quota = FrameQuota::new(SystemClock::default(), quota);
    let mut frames = 0;
    loop {
        frames += 1;
        let state = search.run(&context, &mut frame_quota);
        if state.is_terminal() {
            break;
        }
        frame_quota.new_frame();
    }

    let state = search.state();
    log::info!(
        "Search finished as {:?} after {} frames, {} steps, {:?}",
        state,
        frames,
        search.steps(),
        search.elapsed()
    );

    let route = match state {
        RouteSearchState::GoalReached => search
            .route()
            .map_err(|e| anyhow!("Failed to read route: {}", e))?,
        _ => Vec::new(),
    };

    let report = RouteReport {
        state: state_name(state),
        cost: search.route_cost(),
        frames,
        steps: search.steps(),
        nodes: search.node_count(),
        route: route
            .iter()
            .map(|way| {
                let (x, z) = world.grid.cell_of(way.face).unwrap_or((u32::MAX, u32::MAX));
                RouteStep {
                    cell: [x, z],
                    face: way.face.to_string(),
                    transition: way.transition.is_valid().then(|| way.transition.id()),
                }
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&report)?;
    if let Some(output_path) = output {
        let mut file = File::create(output_path)
            .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;
        writeln!(file, "{}", json)?;
        println!("Saved route to {}", output_path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

/// Build the island graph of a scenario and answer a connectivity query
fn query_islands(
    scenario_path: &Path,
    from: (u32, u32),
    to: Option<(u32, u32)>,
    max_islands: usize,
) -> Result<()> {
    let scenario = load_scenario(scenario_path)?;
    let world = build_world(&scenario)?;
    let labels = world.grid.label_islands();

    let mut graph = IslandConnectivityGraph::default();
    graph.reserve_islands(CLI_MESH, labels.island_count());

    let island_of = |face: FaceId| -> Result<GlobalIslandId> {
        labels
            .island_of(face)
            .map(|island| GlobalIslandId::new(CLI_MESH, island))
            .ok_or_else(|| anyhow!("Face {} has no island", face))
    };

    for &(start, end, id) in &world.link_faces {
        let (origin, target) = (island_of(start)?, island_of(end)?);
        if origin == target {
            log::debug!("Link {} stays on island {}", id, origin);
            continue;
        }
        let annotation = |face: FaceId| {
            world
                .grid
                .face_annotation(face)
                .unwrap_or_else(AreaAnnotation::walkable)
        };
        graph
            .add_directed_transition(
                origin,
                annotation(start),
                target,
                annotation(end),
                Some(TransitionRef {
                    id,
                    destination_face: end,
                    owner: CLI_OWNER,
                    annotation: AreaAnnotation::new(0, AreaFlags::JUMP),
                }),
                1,
            )
            .map_err(|e| anyhow!("Failed to add island edge: {}", e))?;
    }

    let stats = graph.stats();
    println!(
        "{} islands, {} island nodes with edges, {} transitions",
        labels.island_count(),
        stats.node_count,
        stats.transition_count
    );

    let source = island_of(cell_face(&world.grid, from)?)?;
    match to {
        Some(to) => {
            let target = island_of(cell_face(&world.grid, to)?)?;
            let owners = AcceptAllOwners;
            let context = RequesterContext::new(CLI_REQUESTER, &owners);
            let connected = graph.are_connected(&context, source, target, None);
            println!(
                "Island {} {} island {}",
                source,
                if connected { "reaches" } else { "does not reach" },
                target
            );
        }
        None => {
            if max_islands == 0 {
                bail!("--max-islands must be at least 1");
            }
            let mut reachable = Vec::new();
            let count = graph.enumerate_reachable_set(source, &mut reachable, max_islands);
            println!("{} islands reachable from {}:", count, source);
            for island in &reachable {
                println!("  {}", island);
            }
        }
    }

    Ok(())
}

/// Flood faces reachable from the seeds
fn count_accessible(scenario_path: &Path, seeds: &[(u32, u32)]) -> Result<()> {
    let scenario = load_scenario(scenario_path)?;
    let world = build_world(&scenario)?;

    let seed_faces = seeds
        .iter()
        .map(|&cell| cell_face(&world.grid, cell))
        .collect::<Result<Vec<_>>>()?;

    let context = SearchContext::new(&world.grid, &world.links, &AcceptAllTransitions);
    let accessible = compute_accessibility(&context, &seed_faces, CLI_REQUESTER, None);

    println!(
        "{} of {} faces are accessible",
        accessible.len(),
        world.grid.face_count()
    );
    let unreachable = world.grid.face_count() - accessible.len();
    if unreachable > 0 {
        println!("{} faces can be pruned", unreachable);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshnav_common::Vec3;

    fn scenario(json: &str) -> Scenario {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("3, 4"), Ok((3, 4)));
        assert!(parse_cell("3").is_err());
        assert!(parse_cell("a,1").is_err());
    }

    #[test]
    fn test_parse_flags() {
        assert_eq!(parse_flags("0x2"), Ok(AreaFlags(2)));
        assert_eq!(parse_flags("5"), Ok(AreaFlags(5)));
        assert!(parse_flags("0xzz").is_err());
    }

    #[test]
    fn test_search_costs_follow_scenario() {
        let scenario = scenario(
            r#"{
                "width": 4,
                "height": 4,
                "area_costs": [[2, 8.0], [3, 0.5]],
                "dangers": [
                    {"kind": "Range", "location": [0.0, 0.0, 0.0], "range_squared": 0.0, "severity": 3},
                    {"kind": "Range", "location": [0.0, 0.0, 0.0], "range_squared": 0.0, "severity": 5}
                ],
                "danger_accumulation": "Max"
            }"#,
        );
        let (filter, dangers) = search_costs(&scenario, AreaFlags(2));

        assert_eq!(filter.exclude_flags, AreaFlags(2));
        assert_eq!(filter.area_cost[2], 8.0);
        assert_eq!(filter.area_cost[3], 1.0);
        assert_eq!(dangers.accumulation(), DangerAccumulation::Max);
        assert_eq!(dangers.len(), 2);
        assert_eq!(dangers.cost(Vec3::new(1.0, 0.0, 1.0), Vec3::ZERO), 5.0);
    }

    #[test]
    fn test_search_costs_default_to_summed_dangers() {
        let scenario = scenario(r#"{"width": 2, "height": 2}"#);
        let (filter, dangers) = search_costs(&scenario, AreaFlags::NONE);
        assert_eq!(filter, QueryFilter::default());
        assert_eq!(dangers.accumulation(), DangerAccumulation::Sum);
        assert!(dangers.is_empty());
    }
}
