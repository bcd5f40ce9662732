//! # Event Client
//!
//! Subscribes to the navigation event publisher and forwards every event it receives, stamped
//! with its arrival time, into the event loop's channel.
//!
//! Events are sent as JSON strings in the format described in [`comms_if::nav`]. Malformed
//! messages are logged and skipped.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use comms_if::{
    nav::NavEvent,
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};
use log::{error, info, warn};

use crate::event_loop::StampedEvent;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct EventClient {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EventClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not start the event client thread: {0}")]
    ThreadError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl EventClient {
    /// Connect to the event publisher and start forwarding events to `sender`.
    ///
    /// This function will not block until the publisher connects.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        sender: Sender<StampedEvent>,
    ) -> Result<Self, EventClientError> {
        let socket_options = SocketOptions {
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, &params.event_endpoint)
            .map_err(EventClientError::SocketError)?;

        let bg_run = Arc::new(AtomicBool::new(true));
        let bg_run_clone = bg_run.clone();

        let bg_jh = thread::Builder::new()
            .name("event_client".into())
            .spawn(move || bg_thread(socket, bg_run_clone, sender))
            .map_err(EventClientError::ThreadError)?;

        info!("Listening for events on {}", params.event_endpoint);

        Ok(Self {
            bg_jh: Some(bg_jh),
            bg_run,
        })
    }

    /// Stop the background thread, closing this client's side of the event channel.
    pub fn stop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                warn!("Event client thread panicked");
            }
        }
    }
}

impl Drop for EventClient {
    fn drop(&mut self) {
        self.stop();
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Background thread, receives events until told to stop or the event loop hangs up.
fn bg_thread(socket: MonitoredSocket, run: Arc<AtomicBool>, sender: Sender<StampedEvent>) {
    let mut was_connected = false;

    while run.load(Ordering::Relaxed) {
        if socket.connected() != was_connected {
            was_connected = socket.connected();
            match was_connected {
                true => info!("Connected to event publisher"),
                false => warn!("Lost connection to event publisher"),
            }
        }

        let msg = match socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("Non UTF-8 message from event publisher");
                continue;
            }
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                error!("Error receiving message from event publisher: {}", e);
                break;
            }
        };

        let event = match NavEvent::from_json(&msg) {
            Ok(e) => e,
            Err(e) => {
                warn!("Could not parse event: {}", e);
                continue;
            }
        };

        if sender.send(StampedEvent::now(event)).is_err() {
            info!("Event loop has stopped, event client exiting");
            break;
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
