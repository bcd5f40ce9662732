//! Robot footprint used to size collision checks.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Approximate size of the robot.
///
/// The footprint is not a precise polygon, the larger of the two dimensions is used as the side
/// length of a square window of cells which must all be free for the robot to occupy a cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotFootprint {
    /// Width of the robot in meters
    pub width_m: f64,

    /// Length of the robot in meters
    pub length_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RobotFootprint {
    pub fn new(width_m: f64, length_m: f64) -> Self {
        Self { width_m, length_m }
    }

    /// A square footprint with the given side length.
    pub fn square(side_m: f64) -> Self {
        Self::new(side_m, side_m)
    }

    /// Side length of the square collision window, in meters.
    pub fn side_m(&self) -> f64 {
        self.width_m.max(self.length_m)
    }
}

impl Default for RobotFootprint {
    fn default() -> Self {
        Self::square(0.7)
    }
}
