//! # Path Server
//!
//! Publishes the planner's paths to any subscribers and archives each one in the session
//! directory.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    nav::PathPublished,
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};
use log::{info, trace};
use util::session;

use crate::planner::PathSink;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Session-relative path paths are archived under, a timestamp is added to each.
const ARCHIVE_PATH: &str = "paths/path.json";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct PathServer {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PathServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send the path: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the path: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PathServer {
    /// Create a new instance of the path server.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, PathServerError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            bind: true,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::PUB, socket_options, &params.path_endpoint)
            .map_err(PathServerError::SocketError)?;

        info!("Publishing paths on {}", params.path_endpoint);

        Ok(Self { socket })
    }
}

impl PathSink for PathServer {
    type Error = PathServerError;

    fn publish(&mut self, path: &PathPublished) -> Result<(), Self::Error> {
        let path_string =
            serde_json::to_string(path).map_err(PathServerError::SerializationError)?;

        session::save_with_timestamp(ARCHIVE_PATH, path.clone());

        if !self.socket.connected() {
            trace!("No path subscribers connected");
        }

        self.socket
            .send(path_string.as_str(), 0)
            .map_err(PathServerError::SendError)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::nav::{Position, Waypoint};

    #[test]
    fn test_path_published() {
        let ctx = zmq::Context::new();
        let params = NetParams {
            event_endpoint: "inproc://nav_test_paths_events".into(),
            path_endpoint: "inproc://nav_test_paths".into(),
        };

        let mut server = PathServer::new(&ctx, &params).unwrap();

        let subscriber = ctx.socket(zmq::SUB).unwrap();
        subscriber.set_subscribe(b"").unwrap();
        subscriber.set_rcvtimeo(10).unwrap();
        subscriber.connect(&params.path_endpoint).unwrap();

        let path = PathPublished::new(
            "map",
            vec![
                Waypoint::plain(Position::new(0.0, 0.0)),
                Waypoint::plain(Position::new(0.5, 0.0)),
            ],
        );

        // Keep publishing until the subscription has propagated
        let mut received = None;
        for _ in 0..200 {
            server.publish(&path).unwrap();

            if let Ok(Ok(msg)) = subscriber.recv_string(0) {
                received = Some(msg);
                break;
            }
        }

        let msg = received.expect("No path received");
        let decoded: PathPublished = serde_json::from_str(&msg).unwrap();
        assert_eq!(decoded, path);
    }
}
