//! Planner parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::map::RobotFootprint;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Behaviour switches for the [`super::Planner`].
///
/// Every field has a default, so an empty `[planner]` table gives the default behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerParams {
    /// Robot footprint used to validate poses and passed on to the search.
    pub footprint: RobotFootprint,

    /// If true the published path carries a heading at each waypoint.
    pub output_orientation: bool,

    /// If true a new valid start pose triggers a replan, as a new goal always does.
    pub trigger_replan_on_start: bool,

    /// If true the rising edge of the crash flag triggers a replan. When false crash events are
    /// ignored entirely.
    pub enable_crash_trigger: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for PlannerParams {
    fn default() -> Self {
        Self {
            footprint: RobotFootprint::default(),
            output_orientation: false,
            trigger_replan_on_start: true,
            enable_crash_trigger: false,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_partial_params() {
        let params: PlannerParams = util::params::from_str(
            r#"
            output_orientation = true

            [footprint]
            width_m = 0.4
            length_m = 0.9
            "#,
        )
        .unwrap();

        assert!(params.output_orientation);
        assert!(params.trigger_replan_on_start);
        assert!(!params.enable_crash_trigger);
        assert_eq!(params.footprint.side_m(), 0.9);

        let params: PlannerParams = util::params::from_str("").unwrap();
        assert_eq!(params, PlannerParams::default());
    }
}
