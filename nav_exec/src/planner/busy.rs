//! Busy flag guarding the planner's event handlers.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::atomic::{AtomicU8, Ordering};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Whether the planner is currently running a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PlannerMode {
    Idle = 0,
    Busy = 1,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Atomic holder of the [`PlannerMode`].
///
/// The only way into [`PlannerMode::Busy`] is [`ModeFlag::try_enter_busy`], which hands out a
/// guard that returns the flag to idle when dropped, including when a handler panics.
#[derive(Debug)]
pub struct ModeFlag {
    mode: AtomicU8,
}

/// Held for the duration of a handler.
#[derive(Debug)]
pub struct BusyGuard<'a> {
    flag: &'a ModeFlag,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ModeFlag {
    pub fn new() -> Self {
        Self {
            mode: AtomicU8::new(PlannerMode::Idle as u8),
        }
    }

    pub fn mode(&self) -> PlannerMode {
        match self.mode.load(Ordering::Acquire) {
            0 => PlannerMode::Idle,
            _ => PlannerMode::Busy,
        }
    }

    /// Move from idle to busy, returning `None` if already busy.
    pub fn try_enter_busy(&self) -> Option<BusyGuard<'_>> {
        self.mode
            .compare_exchange(
                PlannerMode::Idle as u8,
                PlannerMode::Busy as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| BusyGuard { flag: self })
    }
}

impl Default for ModeFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag
            .mode
            .store(PlannerMode::Idle as u8, Ordering::Release);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
