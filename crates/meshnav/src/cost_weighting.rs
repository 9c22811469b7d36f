//! Hazard weighting used by the route search edge cost
//!
//! A hazard ("danger area") biases routes away from a location. Each hazard
//! carries a weighting kind that turns a candidate location into a weight in
//! `[0, 1]`, which is then scaled by the hazard's severity.

use meshnav_common::{distance_squared, direction, Vec3};

/// Maximum number of hazards active for one search
pub const MAX_DANGER_AREAS: usize = 5;

/// How a hazard weighs a candidate location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum WeightingKind {
    /// Never contributes
    #[default]
    None,
    /// Full weight inside the range, nothing outside
    Range,
    /// Weight falls off with the inverse of the distance outside the range
    InverseDistance,
    /// Weight grows as the candidate lies in the hazard's direction as seen from the start
    Direction,
}

impl WeightingKind {
    /// Scores `candidate` against a hazard at `hazard`.
    ///
    /// A zero `range_squared` means the hazard affects the whole level.
    pub fn weight(self, candidate: Vec3, start: Vec3, hazard: Vec3, range_squared: f32) -> f32 {
        match self {
            WeightingKind::None => 0.0,
            WeightingKind::Range => {
                if range_squared == 0.0 || distance_squared(&candidate, &hazard) <= range_squared {
                    1.0
                } else {
                    0.0
                }
            }
            WeightingKind::InverseDistance => {
                let dist_sq = distance_squared(&candidate, &hazard);
                if range_squared != 0.0 && dist_sq <= range_squared {
                    return 0.0;
                }
                if dist_sq <= f32::EPSILON {
                    return 1.0;
                }
                (1.0 / dist_sq.sqrt()).min(1.0)
            }
            WeightingKind::Direction => {
                let (Some(to_candidate), Some(to_hazard)) =
                    (direction(&start, &candidate), direction(&start, &hazard))
                else {
                    return 0.0;
                };
                to_candidate.dot(to_hazard).clamp(0.0, 1.0)
            }
        }
    }
}

/// One active hazard
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct DangerArea {
    pub kind: WeightingKind,
    pub location: Vec3,
    /// Squared radius, zero for a level-wide hazard
    pub range_squared: f32,
    /// Cost added at full weight
    pub severity: u32,
}

impl DangerArea {
    pub fn new(kind: WeightingKind, location: Vec3, range: f32, severity: u32) -> Self {
        Self {
            kind,
            location,
            range_squared: range * range,
            severity,
        }
    }

    /// Extra cost this hazard adds at `candidate`
    pub fn cost(&self, candidate: Vec3, start: Vec3) -> f32 {
        self.kind
            .weight(candidate, start, self.location, self.range_squared)
            * self.severity as f32
    }
}

/// How contributions of overlapping hazards combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum DangerAccumulation {
    #[default]
    Sum,
    Max,
}

/// Fixed-capacity list of hazards evaluated per candidate location
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct DangerAreaList {
    areas: Vec<DangerArea>,
    accumulation: DangerAccumulation,
}

impl DangerAreaList {
    pub fn new(accumulation: DangerAccumulation) -> Self {
        Self {
            areas: Vec::with_capacity(MAX_DANGER_AREAS),
            accumulation,
        }
    }

    /// Adds a hazard, returning false once the list is full
    pub fn push(&mut self, area: DangerArea) -> bool {
        if self.areas.len() >= MAX_DANGER_AREAS {
            log::warn!("danger list full, hazard at {} ignored", area.location);
            return false;
        }
        self.areas.push(area);
        true
    }

    pub fn clear(&mut self) {
        self.areas.clear();
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    pub fn areas(&self) -> &[DangerArea] {
        &self.areas
    }

    pub fn accumulation(&self) -> DangerAccumulation {
        self.accumulation
    }

    pub fn set_accumulation(&mut self, accumulation: DangerAccumulation) {
        self.accumulation = accumulation;
    }

    /// Combined extra cost of every hazard at `candidate`
    pub fn cost(&self, candidate: Vec3, start: Vec3) -> f32 {
        let costs = self.areas.iter().map(|a| a.cost(candidate, start));
        match self.accumulation {
            DangerAccumulation::Sum => costs.sum(),
            DangerAccumulation::Max => costs.fold(0.0, f32::max),
        }
    }
}
