//! Per-tile index of off-mesh transitions
//!
//! Each tile owns a bucket of `(start face, end face, transition id)` entries.
//! Entries that start on the same face are always contiguous, so the exits of a
//! face are found from its first index with a single forward walk. The owning
//! mesh is told where each face's run begins through [`FaceExitIndex`].

use std::collections::HashMap;

use crate::mesh_interface::FaceExitIndex;
use meshnav_common::{consistency_violation, Error, FaceId, Result, TileId, TransitionId};

/// Default ceiling on the number of entries in one tile bucket
pub const DEFAULT_MAX_LINKS_PER_TILE: usize = 1024;

/// Configuration for an off-mesh link table
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct OffMeshLinkTableConfig {
    /// Maximum entries in one tile bucket
    pub max_links_per_tile: usize,
}

impl Default for OffMeshLinkTableConfig {
    fn default() -> Self {
        Self {
            max_links_per_tile: DEFAULT_MAX_LINKS_PER_TILE,
        }
    }
}

/// One entry of a tile bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileLinkEntry {
    pub start_face: FaceId,
    pub end_face: FaceId,
    pub transition: TransitionId,
}

/// An exit yielded by [`OffMeshExits`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffMeshExit {
    pub destination: FaceId,
    pub transition: TransitionId,
}

/// Memory report for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OffMeshMemoryStats {
    pub bucket_count: usize,
    pub link_count: usize,
    pub bytes_used: usize,
}

#[derive(Debug, Clone, Default)]
struct TileLinks {
    entries: Vec<TileLinkEntry>,
}

impl TileLinks {
    fn run_start(&self, face: FaceId) -> Option<usize> {
        self.entries.iter().position(|e| e.start_face == face)
    }

    /// Tells the owner where every run from `from` onwards starts.
    /// `from` must be the first index of a run.
    fn publish_runs<O: FaceExitIndex + ?Sized>(&self, owner: &mut O, from: usize) {
        for i in from..self.entries.len() {
            let face = self.entries[i].start_face;
            if i == from || self.entries[i - 1].start_face != face {
                owner.set_off_mesh_exit(face, i as u16);
            }
        }
    }
}

/// Off-mesh link table of one navigation mesh
#[derive(Debug)]
pub struct OffMeshLinkTable {
    buckets: HashMap<TileId, TileLinks>,
    next_transition_id: u32,
    config: OffMeshLinkTableConfig,
}

impl Default for OffMeshLinkTable {
    fn default() -> Self {
        Self::new(OffMeshLinkTableConfig::default())
    }
}

impl OffMeshLinkTable {
    /// Creates an empty table
    pub fn new(config: OffMeshLinkTableConfig) -> Self {
        Self {
            buckets: HashMap::new(),
            next_transition_id: 1,
            config,
        }
    }

    /// Drops every bucket and restarts the id counter
    pub fn reset(&mut self) {
        self.buckets.clear();
        self.next_transition_id = 1;
    }

    pub fn config(&self) -> &OffMeshLinkTableConfig {
        &self.config
    }

    fn generate_transition_id(&mut self) -> TransitionId {
        loop {
            let id = self.next_transition_id;
            self.next_transition_id = self.next_transition_id.wrapping_add(1);
            if id != TransitionId::INVALID.id() {
                return TransitionId::new(id);
            }
        }
    }

    /// Adds an exit from `start_face` to `end_face`.
    ///
    /// Without an explicit id a fresh one is generated. The entry goes to the
    /// end of `start_face`'s run, and the owner is told the new start index of
    /// every run that moved.
    pub fn add_link<O: FaceExitIndex + ?Sized>(
        &mut self,
        owner: &mut O,
        start_face: FaceId,
        end_face: FaceId,
        transition: Option<TransitionId>,
    ) -> Result<TransitionId> {
        if !start_face.is_valid() || !end_face.is_valid() {
            return Err(Error::InvalidParam(format!(
                "off-mesh link {} -> {} uses an invalid face",
                start_face, end_face
            )));
        }

        let tile = start_face.tile();
        let capacity = self.config.max_links_per_tile;
        let len = self.buckets.get(&tile).map_or(0, |b| b.entries.len());
        if len >= capacity {
            consistency_violation!(
                "tile {} exceeded its off-mesh link capacity of {}",
                tile,
                capacity
            );
            return Err(Error::TileCapacityExceeded { tile, capacity });
        }

        let transition = match transition {
            Some(id) if id.is_valid() => {
                if id.id() >= self.next_transition_id {
                    self.next_transition_id = id.id().wrapping_add(1);
                }
                id
            }
            _ => self.generate_transition_id(),
        };

        let bucket = self.buckets.entry(tile).or_default();
        let (run_start, insert_at) = match bucket.run_start(start_face) {
            Some(start) => {
                let run_len = bucket.entries[start..]
                    .iter()
                    .take_while(|e| e.start_face == start_face)
                    .count();
                (start, start + run_len)
            }
            None => (bucket.entries.len(), bucket.entries.len()),
        };

        bucket.entries.insert(
            insert_at,
            TileLinkEntry {
                start_face,
                end_face,
                transition,
            },
        );
        bucket.publish_runs(owner, run_start);

        log::debug!(
            "off-mesh link {} added: {} -> {} (tile {}, slot {})",
            transition,
            start_face,
            end_face,
            tile,
            insert_at
        );

        Ok(transition)
    }

    /// Removes every entry of `transition` from the tile of `bound_face`.
    ///
    /// Returns false if nothing was removed.
    pub fn remove_link<O: FaceExitIndex + ?Sized>(
        &mut self,
        owner: &mut O,
        bound_face: FaceId,
        transition: TransitionId,
    ) -> bool {
        let tile = bound_face.tile();
        let Some(bucket) = self.buckets.get_mut(&tile) else {
            return false;
        };

        let mut emptied_candidates: Vec<FaceId> = Vec::new();
        bucket.entries.retain(|e| {
            if e.transition == transition {
                if !emptied_candidates.contains(&e.start_face) {
                    emptied_candidates.push(e.start_face);
                }
                false
            } else {
                true
            }
        });

        if emptied_candidates.is_empty() {
            return false;
        }

        bucket.publish_runs(owner, 0);
        for face in emptied_candidates {
            if bucket.run_start(face).is_none() {
                owner.clear_off_mesh_exit(face);
            }
        }

        if bucket.entries.is_empty() {
            self.buckets.remove(&tile);
        }

        log::debug!("off-mesh link {} removed from tile {}", transition, tile);
        true
    }

    /// Drops the whole bucket of a tile.
    ///
    /// The coarse island edges implied by the dropped transitions are left
    /// alone; the returned ids tell the caller which ones to remove.
    pub fn invalidate_tile(&mut self, tile: TileId) -> Vec<TransitionId> {
        let Some(bucket) = self.buckets.remove(&tile) else {
            return Vec::new();
        };

        let mut dropped: Vec<TransitionId> = Vec::with_capacity(bucket.entries.len());
        for entry in &bucket.entries {
            if !dropped.contains(&entry.transition) {
                dropped.push(entry.transition);
            }
        }

        log::debug!(
            "tile {} invalidated, {} off-mesh transitions dropped",
            tile,
            dropped.len()
        );
        dropped
    }

    /// Lazily walks the exits of `face` starting at `start_index`
    pub fn query_exits(&self, face: FaceId, start_index: u16) -> OffMeshExits<'_> {
        let entries = self
            .buckets
            .get(&face.tile())
            .map_or(&[][..], |b| b.entries.as_slice());
        OffMeshExits {
            entries,
            face,
            start: start_index as usize,
            cursor: start_index as usize,
        }
    }

    /// Finds the start of a face's run by scanning its tile bucket
    pub fn first_exit_index(&self, face: FaceId) -> Option<u16> {
        self.buckets
            .get(&face.tile())
            .and_then(|b| b.run_start(face))
            .map(|i| i as u16)
    }

    /// Gets the raw entries of a tile bucket
    pub fn tile_links(&self, tile: TileId) -> &[TileLinkEntry] {
        self.buckets
            .get(&tile)
            .map_or(&[][..], |b| b.entries.as_slice())
    }

    /// Total number of entries over all tiles
    pub fn link_count(&self) -> usize {
        self.buckets.values().map(|b| b.entries.len()).sum()
    }

    /// Gets memory used by the table
    pub fn memory_stats(&self) -> OffMeshMemoryStats {
        let bucket_bytes: usize = self
            .buckets
            .values()
            .map(|b| {
                std::mem::size_of::<TileId>()
                    + std::mem::size_of::<TileLinks>()
                    + b.entries.capacity() * std::mem::size_of::<TileLinkEntry>()
            })
            .sum();

        OffMeshMemoryStats {
            bucket_count: self.buckets.len(),
            link_count: self.link_count(),
            bytes_used: std::mem::size_of::<Self>() + bucket_bytes,
        }
    }
}

/// Restartable iterator over the contiguous run of one face
#[derive(Debug, Clone)]
pub struct OffMeshExits<'a> {
    entries: &'a [TileLinkEntry],
    face: FaceId,
    start: usize,
    cursor: usize,
}

impl OffMeshExits<'_> {
    /// Rewinds to the index the query started from
    pub fn restart(&mut self) {
        self.cursor = self.start;
    }
}

impl Iterator for OffMeshExits<'_> {
    type Item = OffMeshExit;

    fn next(&mut self) -> Option<OffMeshExit> {
        let entry = self.entries.get(self.cursor)?;
        if entry.start_face != self.face {
            // Past the end of the run; stay exhausted.
            self.cursor = self.entries.len();
            return None;
        }
        self.cursor += 1;
        Some(OffMeshExit {
            destination: entry.end_face,
            transition: entry.transition,
        })
    }
}
