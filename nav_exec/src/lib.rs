//! # Navigation library.
//!
//! This library allows other crates in the workspace, and the benches, to access items defined
//! inside the navigation crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Event client - receives navigation events from the event publisher
pub mod event_client;

/// Event loop - stamps, filters and dispatches events to the planner
pub mod event_loop;

/// Occupancy grid map and robot footprint
pub mod map;

/// Executable parameters
pub mod params;

/// Path server - publishes planned paths
pub mod path_server;

/// Planning orchestrator
pub mod planner;

/// Script source - replays scripted events
pub mod script_source;

/// Path search services
pub mod search;
