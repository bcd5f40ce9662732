//! # Navigation messages
//!
//! Inbound events consumed by the navigation planner and the path it publishes in response. All
//! messages are sent over the network as JSON.
//!
//! Inbound events are externally tagged, for example:
//!
//! ```text
//! {"GoalUpdate": {"x": 1.5, "y": -0.25}}
//! {"CrashEvent": {"flag": true}}
//! {"MapUpdate": {"width": 3, "height": 3, "resolution": 1.0, "origin": {"x": 0.0, "y": 0.0},
//!                "frame_id": "map", "cells": [0, 0, 0, 0, 100, 0, 0, 0, 0]}}
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Cell value marking an occupied cell.
pub const CELL_OCCUPIED: i8 = 100;

/// Cell value marking a cell whose occupancy is unknown.
pub const CELL_UNKNOWN: i8 = -1;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A position in the world (map) frame, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A new occupancy grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapUpdate {
    /// Number of columns in the grid
    pub width: usize,

    /// Number of rows in the grid
    pub height: usize,

    /// Size of each cell in meters per cell
    pub resolution: f64,

    /// World position of cell (0, 0)
    pub origin: Position,

    /// Coordinate frame of the map, carried through to the published path
    pub frame_id: String,

    /// Row-major occupancy data. Values are 0-100, with 100 occupied and -1 unknown.
    pub cells: Vec<i8>,
}

/// An orientation quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

/// A single point on a published path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Position,

    /// Heading towards the next waypoint, only present when the planner is configured to output
    /// oriented paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
}

/// A path published by the planner.
///
/// An empty `waypoints` list means no path to the goal could be found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathPublished {
    pub frame_id: String,

    /// Time the path was built
    pub stamp: DateTime<Utc>,

    pub waypoints: Vec<Waypoint>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An event which can be handled by the navigation planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NavEvent {
    /// A new occupancy grid, replacing any previous one
    MapUpdate(MapUpdate),

    /// A new goal position in the map frame
    GoalUpdate { x: f64, y: f64 },

    /// A new start position in the map frame
    StartUpdate { x: f64, y: f64 },

    /// Crash detector state
    CrashEvent { flag: bool },
}

/// Errors that can occur while parsing a [`NavEvent`].
#[derive(Debug, thiserror::Error)]
pub enum NavEventParseError {
    #[error("Event contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Waypoint {
    /// A waypoint with no orientation.
    pub fn plain(position: Position) -> Self {
        Self {
            position,
            orientation: None,
        }
    }

    pub fn oriented(position: Position, orientation: Orientation) -> Self {
        Self {
            position,
            orientation: Some(orientation),
        }
    }
}

impl PathPublished {
    /// Build a new path stamped with the current time.
    pub fn new(frame_id: &str, waypoints: Vec<Waypoint>) -> Self {
        Self {
            frame_id: frame_id.to_string(),
            stamp: Utc::now(),
            waypoints,
        }
    }

    /// Returns true if this path indicates that no route to the goal was found.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

impl NavEvent {
    /// Parse a new event from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, NavEventParseError> {
        serde_json::from_str(json_str).map_err(NavEventParseError::InvalidJson)
    }

    /// Short name of the event, used when logging.
    pub fn name(&self) -> &'static str {
        match self {
            NavEvent::MapUpdate(_) => "MapUpdate",
            NavEvent::GoalUpdate { .. } => "GoalUpdate",
            NavEvent::StartUpdate { .. } => "StartUpdate",
            NavEvent::CrashEvent { .. } => "CrashEvent",
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
