//! # Event loop
//!
//! Events from every source are stamped on arrival and sent down a single channel to the
//! [`EventLoop`], which offers them to the [`Planner`] one at a time.
//!
//! Handlers run on the loop's thread, so an event that arrives while a handler is running simply
//! waits in the channel. To keep drop-on-busy semantics any event stamped inside the busy window of
//! the previous handler is discarded instead of being handled late.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::mpsc::Receiver;
use std::time::Instant;

use comms_if::nav::NavEvent;
use log::{debug, info};
use serde::Serialize;

use crate::planner::{HandleOutcome, PathSink, Planner};
use crate::search::PathSearch;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An event along with the time it arrived.
#[derive(Debug, Clone)]
pub struct StampedEvent {
    pub received_at: Instant,
    pub event: NavEvent,
}

/// Counts of what happened to the events offered to the planner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventLoopStats {
    pub handled: usize,
    pub replans: usize,
    pub ignored: usize,
    pub dropped: usize,
}

pub struct EventLoop<S, K> {
    planner: Planner<S, K>,

    receiver: Receiver<StampedEvent>,

    /// Start and end of the most recent handler
    last_busy_window: Option<(Instant, Instant)>,

    stats: EventLoopStats,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StampedEvent {
    /// Stamp an event with the current time.
    pub fn now(event: NavEvent) -> Self {
        Self {
            received_at: Instant::now(),
            event,
        }
    }
}

impl<S, K> EventLoop<S, K>
where
    S: PathSearch,
    K: PathSink,
{
    pub fn new(planner: Planner<S, K>, receiver: Receiver<StampedEvent>) -> Self {
        Self {
            planner,
            receiver,
            last_busy_window: None,
            stats: EventLoopStats::default(),
        }
    }

    pub fn planner(&self) -> &Planner<S, K> {
        &self.planner
    }

    pub fn stats(&self) -> EventLoopStats {
        self.stats
    }

    pub fn last_busy_window(&self) -> Option<(Instant, Instant)> {
        self.last_busy_window
    }

    /// Handle events until every sender has hung up.
    pub fn run(&mut self) -> EventLoopStats {
        info!("Event loop started");

        while let Ok(stamped) = self.receiver.recv() {
            self.step(stamped);
        }

        info!("All event sources have closed, event loop stopping");

        self.stats
    }

    /// Offer a single event to the planner.
    pub fn step(&mut self, stamped: StampedEvent) -> HandleOutcome {
        let outcome = if self.arrived_while_busy(stamped.received_at) {
            debug!(
                "{} event arrived while the planner was busy, dropping",
                stamped.event.name()
            );
            HandleOutcome::Dropped
        } else {
            let start = Instant::now();
            let outcome = self.planner.handle(stamped.event);
            self.last_busy_window = Some((start, Instant::now()));
            outcome
        };

        match outcome {
            HandleOutcome::Dropped => self.stats.dropped += 1,
            HandleOutcome::Ignored => self.stats.ignored += 1,
            HandleOutcome::Handled { replanned } => {
                self.stats.handled += 1;
                if replanned {
                    self.stats.replans += 1;
                }
            }
        }

        outcome
    }

    fn arrived_while_busy(&self, received_at: Instant) -> bool {
        match self.last_busy_window {
            Some((start, end)) => received_at >= start && received_at < end,
            None => false,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
