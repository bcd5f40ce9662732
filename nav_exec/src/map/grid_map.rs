//! # Grid Map
//!
//! [`GridMap`] is a single layer occupancy grid, as received in a [`MapUpdate`]. Cells are
//! addressed by [`CellIndex`], where `i` is the row (world Y axis) and `j` is the column (world X
//! axis).

// ------------------------------------------------------------------------------------------------
// INCLUDES
// ------------------------------------------------------------------------------------------------

use std::fmt;

use comms_if::nav::{MapUpdate, CELL_OCCUPIED, CELL_UNKNOWN};
use nalgebra::Point2;
use ndarray::Array2;

use super::RobotFootprint;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Index of a cell in a [`GridMap`].
///
/// Indexes are signed so that positions outside the map can still be converted and then rejected
/// by [`GridMap::in_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellIndex {
    /// Row index, derived from the world Y coordinate
    pub i: i64,

    /// Column index, derived from the world X coordinate
    pub j: i64,
}

/// An occupancy grid map.
#[derive(Clone, Debug)]
pub struct GridMap {
    /// The size of each grid cell in meters per cell
    resolution: f64,

    /// World position of cell (0, 0)
    origin: Point2<f64>,

    /// Coordinate frame of the map
    frame_id: String,

    /// Occupancy data, dimension order row (i), column (j)
    cells: Array2<i8>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GridMapError {
    #[error("Requested cell {0} is outside the map bounds")]
    OutOfRange(CellIndex),

    #[error("Provided cell data has {found} elements but the map shape requires {expected}")]
    IncompatibleShape { expected: usize, found: usize },

    #[error("Map resolution must be finite and positive, found {0}")]
    InvalidResolution(f64),

    #[error("Grid map is empty")]
    Empty,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CellIndex {
    pub fn new(i: i64, j: i64) -> Self {
        Self { i, j }
    }
}

impl fmt::Display for CellIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.i, self.j)
    }
}

impl GridMap {
    /// Create a new map from row-major cell data.
    pub fn new(
        width: usize,
        height: usize,
        resolution: f64,
        origin: Point2<f64>,
        frame_id: &str,
        cells: Vec<i8>,
    ) -> Result<Self, GridMapError> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(GridMapError::InvalidResolution(resolution));
        }

        if width == 0 || height == 0 {
            return Err(GridMapError::Empty);
        }

        let expected = width * height;
        let found = cells.len();
        let cells = Array2::from_shape_vec((height, width), cells)
            .map_err(|_| GridMapError::IncompatibleShape { expected, found })?;

        Ok(Self {
            resolution,
            origin,
            frame_id: frame_id.to_string(),
            cells,
        })
    }

    /// Build a map from a received map update, validating its shape.
    pub fn from_update(update: MapUpdate) -> Result<Self, GridMapError> {
        Self::new(
            update.width,
            update.height,
            update.resolution,
            Point2::new(update.origin.x, update.origin.y),
            &update.frame_id,
            update.cells,
        )
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.cells.ncols()
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.cells.nrows()
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn origin(&self) -> Point2<f64> {
        self.origin
    }

    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    /// Returns true if the cell lies within the map.
    pub fn in_range(&self, cell: CellIndex) -> bool {
        cell.i >= 0
            && cell.j >= 0
            && (cell.i as usize) < self.height()
            && (cell.j as usize) < self.width()
    }

    /// Get the occupancy value of a cell.
    pub fn occupancy_at(&self, cell: CellIndex) -> Result<i8, GridMapError> {
        if !self.in_range(cell) {
            return Err(GridMapError::OutOfRange(cell));
        }

        Ok(self.cells[[cell.i as usize, cell.j as usize]])
    }

    /// Get the occupancy value of the cell containing a world position.
    pub fn occupancy_at_world(&self, position: &Point2<f64>) -> Result<i8, GridMapError> {
        self.occupancy_at(self.world_to_cell(position))
    }

    /// Convert a world position into the index of the cell containing it.
    ///
    /// Each axis is truncated toward zero, so positions up to one cell below the origin map onto
    /// row or column 0. The result is not checked against the map bounds.
    pub fn world_to_cell(&self, position: &Point2<f64>) -> CellIndex {
        CellIndex {
            i: ((position.y - self.origin.y) / self.resolution).trunc() as i64,
            j: ((position.x - self.origin.x) / self.resolution).trunc() as i64,
        }
    }

    /// Convert a cell index into a world position.
    ///
    /// Note this gives the cell's corner nearest the origin, not its centre.
    pub fn cell_to_world(&self, cell: CellIndex) -> Point2<f64> {
        Point2::new(
            cell.j as f64 * self.resolution + self.origin.x,
            cell.i as f64 * self.resolution + self.origin.y,
        )
    }

    /// Half width, in cells, of the square window checked by [`GridMap::is_footprint_clear`].
    pub fn footprint_half_width(&self, footprint: &RobotFootprint) -> i64 {
        let side_cells = (footprint.side_m() / self.resolution).floor() as i64;

        side_cells.max(0) / 2
    }

    /// Returns true if the robot can occupy the given cell.
    ///
    /// With a half width `s` the rows `[i - s, i + s)` and columns `[j - s, j + s)` are checked.
    /// When `s` is zero the centre cell alone is checked. Any checked cell which is out of range,
    /// occupied or unknown makes the footprint blocked, as does a centre outside the map.
    pub fn is_footprint_clear(&self, cell: CellIndex, footprint: &RobotFootprint) -> bool {
        if !self.in_range(cell) {
            return false;
        }

        let side = self.footprint_half_width(footprint);
        let upper = side.max(1);

        // The centre is in range so only a huge footprint can push the bounds past i64
        for i in cell.i.saturating_sub(side)..cell.i.saturating_add(upper) {
            for j in cell.j.saturating_sub(side)..cell.j.saturating_add(upper) {
                match self.occupancy_at(CellIndex::new(i, j)) {
                    Ok(CELL_OCCUPIED) | Ok(CELL_UNKNOWN) | Err(_) => return false,
                    Ok(_) => (),
                }
            }
        }

        true
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
