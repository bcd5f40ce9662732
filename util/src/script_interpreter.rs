//! # Navigation event script interpreter
//!
//! This module provides an interpreter for navigation event scripts, allowing a recorded or
//! hand-written sequence of events to be replayed into the planner.
//!
//! A script is a sequence of `<time>: <event>;` entries, where `<time>` is the number of seconds
//! since the start of the session at which the event should be delivered, and `<event>` is the
//! JSON form of a [`NavEvent`]. For example:
//!
//! ```text
//! 0.5: {"MapUpdate": {"width": 2, "height": 2, "resolution": 0.5,
//!                     "origin": {"x": 0.0, "y": 0.0}, "frame_id": "map",
//!                     "cells": [0, 0, 0, 0]}};
//! 1.0: {"StartUpdate": {"x": 0.1, "y": 0.1}};
//! 1.5: {"GoalUpdate": {"x": 0.9, "y": 0.9}};
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use regex::RegexBuilder;
use thiserror::Error;

// Internal
use comms_if::nav::{NavEvent, NavEventParseError};
use crate::session::get_elapsed_seconds;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An event which is scripted to occur at a specific time.
struct ScriptedEvent {
    /// The time the event is supposed to be delivered at
    exec_time_s: f64,

    event: NavEvent
}

/// A script interpreter.
///
/// After initialising with the path to the script use `.get_pending_events` to
/// acquire a list of events that are due.
pub struct ScriptInterpreter {
    _script_path: Option<PathBuf>,
    events: VecDeque<ScriptedEvent>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid event at {0} s: {1}")]
    InvalidEvent(f64, NavEventParseError),

    #[error("Script entry at {0} s has no event")]
    MissingEvent(f64),

    #[error("Script entry at {0} s is not terminated with `;`")]
    MissingTerminator(f64),

    #[error("Script contains text which is not an entry: {0:?}")]
    UnexpectedText(String),

    #[error("Script events are out of order, {1} s follows {0} s")]
    OutOfOrder(f64, f64)
}

pub enum PendingEvents {
    None,
    Some(Vec<NavEvent>),
    EndOfScript
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path)
            .map_err(ScriptError::ScriptLoadError)?;

        let mut interpreter = Self::from_script_str(&script)?;
        interpreter._script_path = Some(path);

        Ok(interpreter)
    }

    /// Create a new interpreter from the contents of a script.
    ///
    /// Every non-whitespace character must belong to an entry, anything else is an error.
    pub fn from_script_str(script: &str) -> Result<Self, ScriptError> {
        let mut events: VecDeque<ScriptedEvent> = VecDeque::new();

        let header_re = RegexBuilder::new(r"^\s*(\d+(\.\d+)?)\s*:")
            .build()
            .expect("Script regex is invalid");

        let mut rest = script;

        while !rest.trim().is_empty() {
            let header = match header_re.captures(rest) {
                Some(c) => c,
                None => return Err(ScriptError::UnexpectedText(first_line(rest)))
            };

            let time_str = &header[1];
            let exec_time_s: f64 = time_str
                .parse()
                .map_err(|_| ScriptError::InvalidTimestamp(time_str.to_string()))?;

            let header_end = header.get(0).map_or(0, |m| m.end());
            let body = &rest[header_end..];

            // Events may span multiple lines and their strings may hold semicolons, so exactly
            // one JSON value is read rather than everything up to the next semicolon.
            let mut stream = serde_json::Deserializer::from_str(body).into_iter::<NavEvent>();
            let event = match stream.next() {
                Some(Ok(e)) => e,
                Some(Err(e)) => return Err(ScriptError::InvalidEvent(
                    exec_time_s,
                    NavEventParseError::InvalidJson(e)
                )),
                None => return Err(ScriptError::MissingEvent(exec_time_s))
            };

            let after = body[stream.byte_offset()..].trim_start();
            rest = match after.strip_prefix(';') {
                Some(r) => r,
                None => return Err(ScriptError::MissingTerminator(exec_time_s))
            };

            if let Some(last) = events.back() {
                if exec_time_s < last.exec_time_s {
                    return Err(ScriptError::OutOfOrder(last.exec_time_s, exec_time_s));
                }
            }

            events.push_back(ScriptedEvent {
                exec_time_s,
                event
            });
        }

        if events.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(ScriptInterpreter {
            _script_path: None,
            events
        })
    }

    /// Return the events which are due at the current session time.
    pub fn get_pending_events(&mut self) -> PendingEvents {
        self.get_pending_events_at(get_elapsed_seconds())
    }

    /// Return the events which are due at `current_time_s`, or `None` if none are due.
    pub fn get_pending_events_at(&mut self, current_time_s: f64) -> PendingEvents {
        if self.events.is_empty() {
            return PendingEvents::EndOfScript
        }

        let mut due = vec![];

        while let Some(front) = self.events.front() {
            if front.exec_time_s >= current_time_s {
                break;
            }

            if let Some(e) = self.events.pop_front() {
                due.push(e.event);
            }
        }

        if due.is_empty() {
            PendingEvents::None
        }
        else {
            PendingEvents::Some(due)
        }
    }

    /// Get the number of events remaining in the script
    pub fn get_num_events(&self) -> usize {
        self.events.len()
    }

    /// Get the length of the script in seconds
    pub fn get_duration(&self) -> f64 {
        match self.events.back() {
            Some(e) => e.exec_time_s,
            None => 0f64
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// First non-blank line of some text, for error messages.
fn first_line(text: &str) -> String {
    text.trim_start().lines().next().unwrap_or("").to_string()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
