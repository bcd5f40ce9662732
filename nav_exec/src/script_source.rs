//! Replays a navigation event script into the event loop.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{info, warn};
use util::script_interpreter::{PendingEvents, ScriptInterpreter};

use crate::event_loop::StampedEvent;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Time between checks for due events.
const SCRIPT_POLL_PERIOD: Duration = Duration::from_millis(10);

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Start a thread which sends each scripted event to `sender` once it is due.
///
/// The thread exits, closing its side of the channel, at the end of the script.
pub fn spawn(
    mut interpreter: ScriptInterpreter,
    sender: Sender<StampedEvent>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("script_source".into())
        .spawn(move || loop {
            match interpreter.get_pending_events() {
                PendingEvents::None => thread::sleep(SCRIPT_POLL_PERIOD),
                PendingEvents::Some(events) => {
                    for event in events {
                        if sender.send(StampedEvent::now(event)).is_err() {
                            warn!("Event loop has stopped before the end of the script");
                            return;
                        }
                    }
                }
                PendingEvents::EndOfScript => {
                    info!("End of event script reached");
                    return;
                }
            }
        })
}
