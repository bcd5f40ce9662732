//! Occupancy map representation

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod footprint;
mod grid_map;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use footprint::RobotFootprint;
pub use grid_map::{CellIndex, GridMap, GridMapError};
