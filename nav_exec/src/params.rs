//! Navigation executable parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{planner::PlannerParams, search::AStarParams};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Contents of `nav_exec.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavExecParams {
    #[serde(default)]
    pub planner: PlannerParams,

    #[serde(default)]
    pub search: AStarParams,
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
