//! Common identifiers, annotations and error types used by the meshnav crates

mod annotation;
mod ids;
mod vector;

pub use annotation::*;
pub use ids::*;
pub use vector::*;

/// Represents a 3D position
pub type Vec3 = glam::Vec3;

#[doc(hidden)]
pub use log as __log;

/// Error types for the library
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("tile {tile} exceeded its off-mesh link capacity of {capacity}")]
    TileCapacityExceeded { tile: TileId, capacity: usize },

    #[error("transition {0} is already registered")]
    DuplicateTransition(TransitionId),

    #[error("degree counter underflow on link {from} -> {to}")]
    CounterUnderflow {
        from: GlobalIslandId,
        to: GlobalIslandId,
    },

    #[error("no route search is active")]
    SearchNotActive,
}

/// Result type for meshnav operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reports a broken internal invariant.
///
/// Logs at error level and fires a debug assertion. Release builds keep
/// running, so callers must follow the macro with their documented no-op.
#[macro_export]
macro_rules! consistency_violation {
    ($($arg:tt)+) => {{
        $crate::__log::error!($($arg)+);
        debug_assert!(false, $($arg)+);
    }};
}
