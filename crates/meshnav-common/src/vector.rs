//! Vector utilities

use glam::Vec3;

/// Calculates the distance between two points
#[inline]
pub fn distance(a: &Vec3, b: &Vec3) -> f32 {
    (*b - *a).length()
}

/// Calculates the squared distance between two points
#[inline]
pub fn distance_squared(a: &Vec3, b: &Vec3) -> f32 {
    (*b - *a).length_squared()
}

/// Normalized direction from `from` towards `to`, or `None` when the points coincide
#[inline]
pub fn direction(from: &Vec3, to: &Vec3) -> Option<Vec3> {
    let delta = *to - *from;
    if delta.length_squared() < f32::EPSILON {
        None
    } else {
        Some(delta.normalize())
    }
}
