//! Annotation filter shared by the island flood and the route search

use meshnav_common::{AreaAnnotation, AreaFlags, MAX_AREA_TYPES};

/// Lowest cost multiplier an area type may carry
pub const MIN_AREA_COST: f32 = 1.0;

/// Accepts or rejects areas by flag and assigns each area type a cost multiplier.
///
/// Area costs never go below [`MIN_AREA_COST`], which keeps the straight-line
/// heuristic of the route search admissible.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct QueryFilter {
    /// An area passes only if it has at least one of these flags
    pub include_flags: AreaFlags,
    /// An area fails if it has any of these flags
    pub exclude_flags: AreaFlags,
    /// Cost multiplier per area type
    pub area_cost: Vec<f32>,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            include_flags: AreaFlags::ALL,
            exclude_flags: AreaFlags::NONE,
            area_cost: vec![1.0; MAX_AREA_TYPES],
        }
    }
}

impl QueryFilter {
    /// Filter that accepts every area at unit cost
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Checks if an annotation passes the filter
    pub fn pass_filter(&self, annotation: AreaAnnotation) -> bool {
        let flags = annotation.flags();
        flags.intersects(self.include_flags) && !flags.intersects(self.exclude_flags)
    }

    /// Gets the cost multiplier for an annotation's area type
    pub fn cost_multiplier(&self, annotation: AreaAnnotation) -> f32 {
        self.area_cost
            .get(annotation.area_type() as usize)
            .copied()
            .unwrap_or(1.0)
    }

    /// Sets the cost multiplier for an area type.
    ///
    /// Costs below [`MIN_AREA_COST`], and NaN, are raised to it.
    pub fn set_area_cost(&mut self, area_type: u8, cost: f32) {
        let index = area_type as usize;
        if index >= self.area_cost.len() {
            self.area_cost.resize(index + 1, MIN_AREA_COST);
        }
        let cost = if cost >= MIN_AREA_COST {
            cost
        } else {
            log::warn!(
                "area cost {} for area type {} raised to {}",
                cost,
                area_type,
                MIN_AREA_COST
            );
            MIN_AREA_COST
        };
        self.area_cost[index] = cost;
    }

    /// First area type whose cost is below [`MIN_AREA_COST`] or NaN
    pub fn first_cheap_area(&self) -> Option<(usize, f32)> {
        let index = self
            .area_cost
            .iter()
            .position(|&cost| cost.is_nan() || cost < MIN_AREA_COST)?;
        Some((index, self.area_cost[index]))
    }
}
