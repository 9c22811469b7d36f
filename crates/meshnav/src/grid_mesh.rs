//! Reference navigation mesh made of square cells
//!
//! Every walkable cell of a `width x height` grid is one face. Cells are
//! grouped into square tiles, so face ids carry a real tile id and the
//! off-mesh link table sees several buckets. Faces connect to their four
//! orthogonal neighbours and every route enters a face at its center.

use std::collections::HashMap;

use crate::mesh_interface::{FaceAdjacency, FaceExitIndex, FaceNeighbour};
use meshnav_common::{AreaAnnotation, Error, FaceId, IslandId, Result, TileId, Vec3};

/// Island labelling of a grid, from a flood over plain adjacency
#[derive(Debug, Clone, Default)]
pub struct IslandLabels {
    by_face: HashMap<FaceId, IslandId>,
    island_count: usize,
}

impl IslandLabels {
    /// Gets the island of a face
    pub fn island_of(&self, face: FaceId) -> Option<IslandId> {
        self.by_face.get(&face).copied()
    }

    /// Number of islands, ids run from 1 to this value
    pub fn island_count(&self) -> usize {
        self.island_count
    }
}

/// Uniform grid navigation mesh
#[derive(Debug, Clone)]
pub struct GridNavMesh {
    width: u32,
    height: u32,
    tile_size: u32,
    cell_size: f32,
    tiles_x: u32,
    cells: Vec<Option<AreaAnnotation>>,
    off_mesh_exits: HashMap<FaceId, u16>,
}

impl GridNavMesh {
    /// Creates a fully walkable grid.
    ///
    /// `tile_size` is the edge length of a tile in cells.
    pub fn new(width: u32, height: u32, tile_size: u32, cell_size: f32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidParam("grid must have at least one cell".into()));
        }
        if tile_size == 0 || tile_size > 256 {
            return Err(Error::InvalidParam(format!(
                "tile size {} must be between 1 and 256 cells",
                tile_size
            )));
        }
        if cell_size <= 0.0 {
            return Err(Error::InvalidParam("cell size must be positive".into()));
        }

        let tiles_x = width.div_ceil(tile_size);
        let tiles_z = height.div_ceil(tile_size);
        if tiles_x as u64 * tiles_z as u64 >= u16::MAX as u64 {
            return Err(Error::InvalidParam(format!(
                "{}x{} tiles do not fit the face encoding",
                tiles_x, tiles_z
            )));
        }

        Ok(Self {
            width,
            height,
            tile_size,
            cell_size,
            tiles_x,
            cells: vec![Some(AreaAnnotation::walkable()); (width * height) as usize],
            off_mesh_exits: HashMap::new(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    fn cell_index(&self, x: u32, z: u32) -> Option<usize> {
        (x < self.width && z < self.height).then(|| (z * self.width + x) as usize)
    }

    /// Face covering cell `(x, z)`, if the cell is walkable
    pub fn face_at(&self, x: u32, z: u32) -> Option<FaceId> {
        let index = self.cell_index(x, z)?;
        self.cells[index]?;
        let tile = TileId::new((z / self.tile_size) * self.tiles_x + x / self.tile_size + 1);
        let local = (z % self.tile_size) * self.tile_size + x % self.tile_size;
        Some(FaceId::new(tile, local as u16))
    }

    /// Cell covered by a face
    pub fn cell_of(&self, face: FaceId) -> Option<(u32, u32)> {
        if !face.is_valid() {
            return None;
        }
        let tile = face.tile().id() - 1;
        let (tile_x, tile_z) = (tile % self.tiles_x, tile / self.tiles_x);
        let local = face.index() as u32;
        if local >= self.tile_size * self.tile_size {
            return None;
        }
        let x = tile_x * self.tile_size + local % self.tile_size;
        let z = tile_z * self.tile_size + local / self.tile_size;
        let index = self.cell_index(x, z)?;
        self.cells[index].map(|_| (x, z))
    }

    /// Center of cell `(x, z)`
    pub fn cell_center(&self, x: u32, z: u32) -> Vec3 {
        Vec3::new(
            (x as f32 + 0.5) * self.cell_size,
            0.0,
            (z as f32 + 0.5) * self.cell_size,
        )
    }

    /// Changes the annotation of a cell, `None` removes its face.
    ///
    /// Removing a face only clears its off-mesh exit index. Entries of an
    /// [`OffMeshLinkTable`](crate::OffMeshLinkTable) that start on the face
    /// stay until the caller drops them with `remove_link` or
    /// `invalidate_tile`, along with the island edges of those transitions.
    pub fn set_cell(&mut self, x: u32, z: u32, annotation: Option<AreaAnnotation>) -> Result<()> {
        let index = self.cell_index(x, z).ok_or_else(|| {
            Error::InvalidParam(format!("cell ({}, {}) is outside the grid", x, z))
        })?;
        if annotation.is_none() {
            if let Some(face) = self.face_at(x, z) {
                self.off_mesh_exits.remove(&face);
            }
        }
        self.cells[index] = annotation;
        Ok(())
    }

    /// Iterates every face with its cell
    pub fn faces(&self) -> impl Iterator<Item = (FaceId, u32, u32)> + '_ {
        (0..self.height).flat_map(move |z| {
            (0..self.width).filter_map(move |x| self.face_at(x, z).map(|face| (face, x, z)))
        })
    }

    pub fn face_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Floods plain adjacency to label every face with its island
    pub fn label_islands(&self) -> IslandLabels {
        let mut labels = IslandLabels::default();
        let mut stack = Vec::new();
        let mut neighbours = Vec::new();

        for (seed, _, _) in self.faces() {
            if labels.by_face.contains_key(&seed) {
                continue;
            }
            labels.island_count += 1;
            let island = IslandId::new(labels.island_count as u32);
            labels.by_face.insert(seed, island);
            stack.push(seed);

            while let Some(face) = stack.pop() {
                neighbours.clear();
                self.collect_neighbours(face, &mut neighbours);
                for neighbour in &neighbours {
                    if labels.by_face.insert(neighbour.face, island).is_none() {
                        stack.push(neighbour.face);
                    }
                }
            }
        }

        log::debug!(
            "grid {}x{} has {} islands",
            self.width,
            self.height,
            labels.island_count
        );
        labels
    }
}

impl FaceAdjacency for GridNavMesh {
    fn collect_neighbours(&self, face: FaceId, out: &mut Vec<FaceNeighbour>) {
        let Some((x, z)) = self.cell_of(face) else {
            return;
        };
        let candidates = [
            (x.checked_sub(1), Some(z)),
            (x.checked_add(1), Some(z)),
            (Some(x), z.checked_sub(1)),
            (Some(x), z.checked_add(1)),
        ];
        for (nx, nz) in candidates {
            let (Some(nx), Some(nz)) = (nx, nz) else {
                continue;
            };
            let Some(neighbour) = self.face_at(nx, nz) else {
                continue;
            };
            let Some(annotation) = self.cell_index(nx, nz).and_then(|i| self.cells[i]) else {
                continue;
            };
            out.push(FaceNeighbour {
                face: neighbour,
                annotation,
                entry: self.cell_center(nx, nz),
            });
        }
    }

    fn face_annotation(&self, face: FaceId) -> Option<AreaAnnotation> {
        let (x, z) = self.cell_of(face)?;
        self.cells[self.cell_index(x, z)?]
    }

    fn face_location(&self, face: FaceId) -> Option<Vec3> {
        let (x, z) = self.cell_of(face)?;
        Some(self.cell_center(x, z))
    }

    fn off_mesh_exit_index(&self, face: FaceId) -> Option<u16> {
        self.off_mesh_exits.get(&face).copied()
    }
}

impl FaceExitIndex for GridNavMesh {
    fn set_off_mesh_exit(&mut self, face: FaceId, first_index: u16) {
        self.off_mesh_exits.insert(face, first_index);
    }

    fn clear_off_mesh_exit(&mut self, face: FaceId) {
        self.off_mesh_exits.remove(&face);
    }
}
