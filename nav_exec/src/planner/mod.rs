//! # Planning orchestrator
//!
//! The [`Planner`] reacts to [`NavEvent`]s. It holds the most recent map, start pose, goal pose
//! and crash flag, asks its [`PathSearch`] for a new path whenever an event makes one necessary,
//! and hands the result to its [`PathSink`].
//!
//! Only one handler runs at a time. An event which arrives while a handler is running is dropped,
//! not queued, so a burst of updates during a slow search never builds up a backlog of stale work.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod busy;
mod output;
mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;
use std::sync::{Mutex, PoisonError, TryLockError};

use comms_if::nav::{MapUpdate, NavEvent, PathPublished};
use log::{debug, info, warn};
use nalgebra::Point2;

use crate::map::{CellIndex, GridMap};
use crate::search::PathSearch;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use busy::{BusyGuard, ModeFlag, PlannerMode};
pub use output::{build_path, heading, yaw_to_orientation};
pub use params::PlannerParams;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Destination of paths produced by the planner.
pub trait PathSink {
    type Error: fmt::Display;

    fn publish(&mut self, path: &PathPublished) -> Result<(), Self::Error>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The navigation planning orchestrator.
pub struct Planner<S, K> {
    params: PlannerParams,

    mode: ModeFlag,

    /// Locked by the holder of a [`BusyGuard`], or briefly when taking a state snapshot.
    inner: Mutex<Inner<S, K>>,
}

/// State carried between events.
#[derive(Debug, Clone, Default)]
pub struct PlannerState {
    pub current_map: Option<GridMap>,

    /// Last valid start cell, `None` if unset or the last start update was rejected.
    pub start_pose: Option<CellIndex>,

    /// Last valid goal cell, `None` if unset or the last goal update was rejected.
    pub goal_pose: Option<CellIndex>,

    pub previous_crash_flag: bool,
}

struct Inner<S, K> {
    state: PlannerState,
    search: S,
    sink: K,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Result of offering an event to the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Another handler was running so the event was discarded without any effect.
    Dropped,

    /// The event was accepted but the planner is configured to ignore it.
    Ignored,

    /// The event was processed, `replanned` is true if a path was published as a result.
    Handled { replanned: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoseKind {
    Start,
    Goal,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<S, K> Planner<S, K>
where
    S: PathSearch,
    K: PathSink,
{
    pub fn new(params: PlannerParams, search: S, sink: K) -> Self {
        info!(
            "Planner started (footprint {:.2} m, orientation output: {}, replan on start: {}, \
             crash trigger: {})",
            params.footprint.side_m(),
            params.output_orientation,
            params.trigger_replan_on_start,
            params.enable_crash_trigger
        );

        Self {
            params,
            mode: ModeFlag::new(),
            inner: Mutex::new(Inner {
                state: PlannerState::default(),
                search,
                sink,
            }),
        }
    }

    pub fn params(&self) -> &PlannerParams {
        &self.params
    }

    pub fn mode(&self) -> PlannerMode {
        self.mode.mode()
    }

    /// Offer an event to the planner.
    ///
    /// If another handler is running, including when called from inside the search of a running
    /// handler, the event is dropped and the state is left unchanged.
    pub fn handle(&self, event: NavEvent) -> HandleOutcome {
        let _guard = match self.mode.try_enter_busy() {
            Some(g) => g,
            None => {
                debug!("Planner is busy, dropping {} event", event.name());
                return HandleOutcome::Dropped;
            }
        };

        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        match event {
            NavEvent::MapUpdate(update) => inner.on_map_update(&self.params, update),
            NavEvent::GoalUpdate { x, y } => {
                inner.on_pose_update(&self.params, PoseKind::Goal, Point2::new(x, y))
            }
            NavEvent::StartUpdate { x, y } => {
                inner.on_pose_update(&self.params, PoseKind::Start, Point2::new(x, y))
            }
            NavEvent::CrashEvent { flag } => inner.on_crash(&self.params, flag),
        }
    }

    /// Snapshot of the planner state.
    ///
    /// Returns `None` if a handler is currently running.
    pub fn state(&self) -> Option<PlannerState> {
        match self.inner.try_lock() {
            Ok(inner) => Some(inner.state.clone()),
            Err(TryLockError::Poisoned(e)) => Some(e.into_inner().state.clone()),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}

impl<S, K> Inner<S, K>
where
    S: PathSearch,
    K: PathSink,
{
    fn on_map_update(&mut self, params: &PlannerParams, update: MapUpdate) -> HandleOutcome {
        match GridMap::from_update(update) {
            Ok(map) => {
                info!(
                    "New map was set ({}x{} cells at {} m, frame \"{}\")",
                    map.width(),
                    map.height(),
                    map.resolution(),
                    map.frame_id()
                );
                self.state.current_map = Some(map);
            }
            Err(e) => {
                warn!("Rejected map update: {}", e);
                return HandleOutcome::Handled { replanned: false };
            }
        }

        HandleOutcome::Handled {
            replanned: self.replan_if_ready(params),
        }
    }

    fn on_pose_update(
        &mut self,
        params: &PlannerParams,
        kind: PoseKind,
        position: Point2<f64>,
    ) -> HandleOutcome {
        let cell = match self.state.current_map {
            // Non-finite coordinates would saturate onto a real cell
            Some(_) if !(position.x.is_finite() && position.y.is_finite()) => None,
            Some(ref map) => {
                let cell = map.world_to_cell(&position);
                if map.is_footprint_clear(cell, &params.footprint) {
                    Some(cell)
                } else {
                    None
                }
            }
            None => None,
        };

        match kind {
            PoseKind::Start => self.state.start_pose = cell,
            PoseKind::Goal => self.state.goal_pose = cell,
        }

        let cell = match cell {
            Some(c) => c,
            None => {
                warn!(
                    "New {} ({:.3}, {:.3}) is bad or no map is available",
                    kind, position.x, position.y
                );
                return HandleOutcome::Handled { replanned: false };
            }
        };

        info!(
            "New {} pose was set: ({:.3}, {:.3}) in cell {}",
            kind, position.x, position.y, cell
        );

        let triggers = match kind {
            PoseKind::Start => params.trigger_replan_on_start,
            PoseKind::Goal => true,
        };

        HandleOutcome::Handled {
            replanned: triggers && self.replan_if_ready(params),
        }
    }

    fn on_crash(&mut self, params: &PlannerParams, flag: bool) -> HandleOutcome {
        if !params.enable_crash_trigger {
            return HandleOutcome::Ignored;
        }

        let rising = flag && !self.state.previous_crash_flag;
        self.state.previous_crash_flag = flag;

        if rising {
            info!("Crash detected");
        }

        HandleOutcome::Handled {
            replanned: rising && self.replan_if_ready(params),
        }
    }

    /// Run the search and publish the result if a map, start and goal are all set.
    ///
    /// Returns true if a search was run.
    fn replan_if_ready(&mut self, params: &PlannerParams) -> bool {
        let (map, start, goal) = match (
            &self.state.current_map,
            self.state.start_pose,
            self.state.goal_pose,
        ) {
            (Some(map), Some(start), Some(goal)) => (map, start, goal),
            _ => {
                debug!("Not ready to plan, waiting for a map, start and goal");
                return false;
            }
        };

        info!("Path planning was started from {} to {}", start, goal);

        let points = self
            .search
            .replan(map, start, goal, &params.footprint)
            .unwrap_or_default();

        let path = build_path(map.frame_id(), &points, params.output_orientation);

        if path.is_empty() {
            warn!("No path found from {} to {}", start, goal);
        }

        match self.sink.publish(&path) {
            Ok(()) => info!("Path published with {} waypoints", path.waypoints.len()),
            Err(e) => warn!("Could not publish path: {}", e),
        }

        true
    }
}

impl fmt::Display for PoseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoseKind::Start => write!(f, "start"),
            PoseKind::Goal => write!(f, "goal"),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::map::RobotFootprint;
    use comms_if::nav::{Position, CELL_OCCUPIED};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Weak};

    /// Sink which keeps every published path.
    #[derive(Clone, Default)]
    struct RecordingSink {
        paths: Arc<Mutex<Vec<PathPublished>>>,
    }

    impl RecordingSink {
        fn published(&self) -> Vec<PathPublished> {
            self.paths.lock().unwrap().clone()
        }
    }

    impl PathSink for RecordingSink {
        type Error = String;

        fn publish(&mut self, path: &PathPublished) -> Result<(), Self::Error> {
            self.paths.lock().unwrap().push(path.clone());
            Ok(())
        }
    }

    /// Search which always returns the same result.
    #[derive(Clone)]
    struct FixedSearch {
        result: Option<Vec<Point2<f64>>>,
        calls: Arc<AtomicUsize>,
    }

    impl FixedSearch {
        fn new(result: Option<Vec<Point2<f64>>>) -> Self {
            Self {
                result,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn num_calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PathSearch for FixedSearch {
        fn replan(
            &self,
            _map: &GridMap,
            _start: CellIndex,
            _goal: CellIndex,
            _footprint: &RobotFootprint,
        ) -> Option<Vec<Point2<f64>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    /// Search which feeds an event back into the planner running it.
    struct ReentrantSearch {
        planner: Mutex<Weak<Planner<ReentrantSearch, RecordingSink>>>,
        event: NavEvent,
        outcomes: Arc<Mutex<Vec<HandleOutcome>>>,
    }

    impl PathSearch for ReentrantSearch {
        fn replan(
            &self,
            map: &GridMap,
            start: CellIndex,
            goal: CellIndex,
            _footprint: &RobotFootprint,
        ) -> Option<Vec<Point2<f64>>> {
            if let Some(planner) = self.planner.lock().unwrap().upgrade() {
                let outcome = planner.handle(self.event.clone());
                self.outcomes.lock().unwrap().push(outcome);
            }

            Some(vec![map.cell_to_world(start), map.cell_to_world(goal)])
        }
    }

    fn params() -> PlannerParams {
        PlannerParams {
            footprint: RobotFootprint::square(1.0),
            ..PlannerParams::default()
        }
    }

    fn map_event(frame_id: &str, occupied: &[usize]) -> NavEvent {
        let mut cells = vec![0; 100];
        for &idx in occupied {
            cells[idx] = CELL_OCCUPIED;
        }

        NavEvent::MapUpdate(MapUpdate {
            width: 10,
            height: 10,
            resolution: 1.0,
            origin: Position::new(0.0, 0.0),
            frame_id: frame_id.into(),
            cells,
        })
    }

    fn straight_path() -> Option<Vec<Point2<f64>>> {
        Some(vec![Point2::new(1.0, 1.0), Point2::new(2.0, 1.0)])
    }

    #[test]
    fn test_pose_without_map_rejected() {
        let search = FixedSearch::new(straight_path());
        let sink = RecordingSink::default();
        let planner = Planner::new(params(), search.clone(), sink.clone());

        assert_eq!(
            planner.handle(NavEvent::GoalUpdate { x: 1.5, y: 1.5 }),
            HandleOutcome::Handled { replanned: false }
        );
        assert_eq!(
            planner.handle(NavEvent::StartUpdate { x: 2.5, y: 2.5 }),
            HandleOutcome::Handled { replanned: false }
        );

        let state = planner.state().unwrap();
        assert_eq!(state.goal_pose, None);
        assert_eq!(state.start_pose, None);
        assert_eq!(search.num_calls(), 0);
        assert!(sink.published().is_empty());
    }

    #[test]
    fn test_replan_sequence() {
        let search = FixedSearch::new(straight_path());
        let sink = RecordingSink::default();
        let planner = Planner::new(params(), search.clone(), sink.clone());

        // Map alone does nothing
        assert_eq!(
            planner.handle(map_event("map", &[])),
            HandleOutcome::Handled { replanned: false }
        );

        // Start without goal does nothing
        assert_eq!(
            planner.handle(NavEvent::StartUpdate { x: 1.2, y: 1.7 }),
            HandleOutcome::Handled { replanned: false }
        );
        assert_eq!(planner.state().unwrap().start_pose, Some(CellIndex::new(1, 1)));

        // Goal completes the set
        assert_eq!(
            planner.handle(NavEvent::GoalUpdate { x: 8.5, y: 3.5 }),
            HandleOutcome::Handled { replanned: true }
        );
        assert_eq!(planner.state().unwrap().goal_pose, Some(CellIndex::new(3, 8)));

        // A new start and a new map each replan
        assert_eq!(
            planner.handle(NavEvent::StartUpdate { x: 2.5, y: 2.5 }),
            HandleOutcome::Handled { replanned: true }
        );
        assert_eq!(
            planner.handle(map_event("odom", &[])),
            HandleOutcome::Handled { replanned: true }
        );

        assert_eq!(search.num_calls(), 3);

        let published = sink.published();
        assert_eq!(published.len(), 3);
        assert_eq!(published[0].waypoints.len(), 2);
        assert_eq!(published[0].frame_id, "map");
        assert_eq!(published[2].frame_id, "odom");
        assert!(published[0].waypoints[0].orientation.is_none());
    }

    #[test]
    fn test_start_trigger_disabled() {
        let search = FixedSearch::new(straight_path());
        let sink = RecordingSink::default();
        let planner = Planner::new(
            PlannerParams {
                trigger_replan_on_start: false,
                ..params()
            },
            search.clone(),
            sink.clone(),
        );

        planner.handle(map_event("map", &[]));
        planner.handle(NavEvent::StartUpdate { x: 1.5, y: 1.5 });
        planner.handle(NavEvent::GoalUpdate { x: 5.5, y: 5.5 });
        assert_eq!(search.num_calls(), 1);

        // Start is stored but doesn't trigger
        assert_eq!(
            planner.handle(NavEvent::StartUpdate { x: 2.5, y: 1.5 }),
            HandleOutcome::Handled { replanned: false }
        );
        assert_eq!(planner.state().unwrap().start_pose, Some(CellIndex::new(1, 2)));
        assert_eq!(search.num_calls(), 1);
    }

    #[test]
    fn test_blocked_goal_rejected() {
        let search = FixedSearch::new(straight_path());
        let sink = RecordingSink::default();
        let planner = Planner::new(params(), search.clone(), sink.clone());

        // Cell (5, 5) is occupied
        planner.handle(map_event("map", &[55]));
        planner.handle(NavEvent::StartUpdate { x: 1.5, y: 1.5 });
        planner.handle(NavEvent::GoalUpdate { x: 3.5, y: 3.5 });
        assert_eq!(search.num_calls(), 1);

        // Bad goal clears the previous one and doesn't replan
        assert_eq!(
            planner.handle(NavEvent::GoalUpdate { x: 5.5, y: 5.5 }),
            HandleOutcome::Handled { replanned: false }
        );
        assert_eq!(planner.state().unwrap().goal_pose, None);

        // Outside the map
        planner.handle(NavEvent::GoalUpdate { x: 3.5, y: 3.5 });
        assert_eq!(
            planner.handle(NavEvent::GoalUpdate { x: 12.0, y: 3.5 }),
            HandleOutcome::Handled { replanned: false }
        );
        assert_eq!(planner.state().unwrap().goal_pose, None);

        // Nothing triggers a replan without a goal
        assert_eq!(
            planner.handle(NavEvent::StartUpdate { x: 2.5, y: 2.5 }),
            HandleOutcome::Handled { replanned: false }
        );
        assert_eq!(search.num_calls(), 2);
    }

    #[test]
    fn test_unrepresentable_poses_rejected() {
        let search = FixedSearch::new(straight_path());
        let sink = RecordingSink::default();
        let planner = Planner::new(params(), search.clone(), sink.clone());

        planner.handle(map_event("map", &[]));
        planner.handle(NavEvent::StartUpdate { x: 1.5, y: 1.5 });
        planner.handle(NavEvent::GoalUpdate { x: 3.5, y: 3.5 });
        assert_eq!(search.num_calls(), 1);

        let bad_poses = [
            (1e300, 0.5),
            (-1e300, -1e300),
            (f64::NAN, f64::NAN),
            (0.5, f64::NAN),
            (f64::INFINITY, 0.5),
        ];

        for &(x, y) in bad_poses.iter() {
            planner.handle(NavEvent::StartUpdate { x: 1.5, y: 1.5 });
            planner.handle(NavEvent::GoalUpdate { x: 3.5, y: 3.5 });
            let calls = search.num_calls();

            assert_eq!(
                planner.handle(NavEvent::GoalUpdate { x, y }),
                HandleOutcome::Handled { replanned: false }
            );
            assert_eq!(planner.state().unwrap().goal_pose, None);

            planner.handle(NavEvent::GoalUpdate { x: 3.5, y: 3.5 });
            assert_eq!(
                planner.handle(NavEvent::StartUpdate { x, y }),
                HandleOutcome::Handled { replanned: false }
            );
            assert_eq!(planner.state().unwrap().start_pose, None);

            // Only the valid goal in between replanned
            assert_eq!(search.num_calls(), calls + 1);
        }
    }

    #[test]
    fn test_invalid_map_keeps_previous() {
        let search = FixedSearch::new(straight_path());
        let sink = RecordingSink::default();
        let planner = Planner::new(params(), search.clone(), sink.clone());

        planner.handle(map_event("map", &[]));

        let bad = NavEvent::MapUpdate(MapUpdate {
            width: 10,
            height: 10,
            resolution: 1.0,
            origin: Position::new(0.0, 0.0),
            frame_id: "bad".into(),
            cells: vec![0; 12],
        });
        assert_eq!(planner.handle(bad), HandleOutcome::Handled { replanned: false });

        let state = planner.state().unwrap();
        assert_eq!(state.current_map.map(|m| m.frame_id().to_string()), Some("map".into()));
    }

    #[test]
    fn test_crash_rising_edge() {
        let search = FixedSearch::new(straight_path());
        let sink = RecordingSink::default();
        let planner = Planner::new(
            PlannerParams {
                enable_crash_trigger: true,
                ..params()
            },
            search.clone(),
            sink.clone(),
        );

        // Rising edge with nothing to plan updates the flag only
        assert_eq!(
            planner.handle(NavEvent::CrashEvent { flag: true }),
            HandleOutcome::Handled { replanned: false }
        );
        assert!(planner.state().unwrap().previous_crash_flag);
        planner.handle(NavEvent::CrashEvent { flag: false });

        planner.handle(map_event("map", &[]));
        planner.handle(NavEvent::StartUpdate { x: 1.5, y: 1.5 });
        planner.handle(NavEvent::GoalUpdate { x: 5.5, y: 5.5 });
        assert_eq!(search.num_calls(), 1);

        let sequence = [
            (false, false),
            (true, true),
            (true, false),
            (false, false),
            (true, true),
        ];
        for &(flag, replans) in sequence.iter() {
            assert_eq!(
                planner.handle(NavEvent::CrashEvent { flag }),
                HandleOutcome::Handled { replanned: replans },
                "crash flag {}",
                flag
            );
            assert_eq!(planner.state().unwrap().previous_crash_flag, flag);
        }

        assert_eq!(search.num_calls(), 3);
    }

    #[test]
    fn test_crash_trigger_disabled() {
        let search = FixedSearch::new(straight_path());
        let sink = RecordingSink::default();
        let planner = Planner::new(params(), search.clone(), sink.clone());

        planner.handle(map_event("map", &[]));
        planner.handle(NavEvent::StartUpdate { x: 1.5, y: 1.5 });
        planner.handle(NavEvent::GoalUpdate { x: 5.5, y: 5.5 });

        assert_eq!(
            planner.handle(NavEvent::CrashEvent { flag: true }),
            HandleOutcome::Ignored
        );
        assert!(!planner.state().unwrap().previous_crash_flag);
        assert_eq!(search.num_calls(), 1);
    }

    #[test]
    fn test_no_path_publishes_empty() {
        for result in [None, Some(vec![])].iter() {
            let search = FixedSearch::new(result.clone());
            let sink = RecordingSink::default();
            let planner = Planner::new(params(), search.clone(), sink.clone());

            planner.handle(map_event("odom", &[]));
            planner.handle(NavEvent::StartUpdate { x: 1.5, y: 1.5 });
            assert_eq!(
                planner.handle(NavEvent::GoalUpdate { x: 5.5, y: 5.5 }),
                HandleOutcome::Handled { replanned: true }
            );

            let published = sink.published();
            assert_eq!(published.len(), 1);
            assert!(published[0].is_empty());
            assert_eq!(published[0].frame_id, "odom");
        }
    }

    #[test]
    fn test_oriented_output() {
        let search = FixedSearch::new(Some(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
        ]));
        let sink = RecordingSink::default();
        let planner = Planner::new(
            PlannerParams {
                output_orientation: true,
                ..params()
            },
            search,
            sink.clone(),
        );

        planner.handle(map_event("map", &[]));
        planner.handle(NavEvent::StartUpdate { x: 0.5, y: 0.5 });
        planner.handle(NavEvent::GoalUpdate { x: 1.5, y: 1.5 });

        let published = sink.published();
        assert_eq!(published.len(), 1);

        let waypoints = &published[0].waypoints;
        assert_eq!(waypoints.len(), 2);

        let expected = [
            yaw_to_orientation(1f64.atan2(0.0)),
            yaw_to_orientation(0f64.atan2(1.0)),
        ];
        for (w, e) in waypoints.iter().zip(expected.iter()) {
            let q = w.orientation.unwrap();
            assert!((q.z - e.z).abs() < 1e-12);
            assert!((q.w - e.w).abs() < 1e-12);
        }
    }

    #[test]
    fn test_reentrant_event_dropped() {
        let sink = RecordingSink::default();
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let search = ReentrantSearch {
            planner: Mutex::new(Weak::new()),
            event: NavEvent::GoalUpdate { x: 7.5, y: 7.5 },
            outcomes: outcomes.clone(),
        };

        let planner = Arc::new(Planner::new(params(), search, sink.clone()));
        {
            let inner = planner.inner.lock().unwrap();
            *inner.search.planner.lock().unwrap() = Arc::downgrade(&planner);
        }

        planner.handle(map_event("map", &[]));
        planner.handle(NavEvent::StartUpdate { x: 1.5, y: 1.5 });
        assert_eq!(
            planner.handle(NavEvent::GoalUpdate { x: 4.5, y: 4.5 }),
            HandleOutcome::Handled { replanned: true }
        );

        // The goal offered from inside the search had no effect
        assert_eq!(*outcomes.lock().unwrap(), vec![HandleOutcome::Dropped]);
        assert_eq!(planner.state().unwrap().goal_pose, Some(CellIndex::new(4, 4)));
        assert_eq!(planner.mode(), PlannerMode::Idle);
        assert_eq!(sink.published().len(), 1);
    }
}
