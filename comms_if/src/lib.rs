//! # Communications interface crate.
//!
//! Provides the messages exchanged with the navigation planner and the network layer they travel
//! over.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Inbound navigation events and the outbound path
pub mod nav;

/// Network module
pub mod net;
