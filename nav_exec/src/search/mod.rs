//! # Path search
//!
//! The planner does not search for paths itself, it delegates to an implementation of
//! [`PathSearch`]. [`AStarSearch`] is the grid search used by the executable.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod astar;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Point2;

use crate::map::{CellIndex, GridMap, RobotFootprint};

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use astar::{AStarParams, AStarSearch};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A path search service.
pub trait PathSearch {
    /// Search for a path from `start` to `goal` through `map`.
    ///
    /// Returns the world positions of the path in order from start to goal, or `None` (or an
    /// empty list) if no path exists. Implementations are called synchronously and must not
    /// modify the map.
    fn replan(
        &self,
        map: &GridMap,
        start: CellIndex,
        goal: CellIndex,
        footprint: &RobotFootprint,
    ) -> Option<Vec<Point2<f64>>>;
}
