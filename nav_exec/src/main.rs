//! Main navigation planner executable entry point.
//!
//! # Architecture
//!
//! The executable is event driven rather than cyclic:
//!
//!     - Initialise the session, logging and parameters
//!     - Start the path server
//!     - Start an event source, either:
//!         - a script replaying timed events, or
//!         - the event client subscribed to the event publisher
//!     - Run the event loop until every event source has closed
//!
//! Every path the planner produces is published by the path server and archived in the session
//! directory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::thread::JoinHandle;
use structopt::StructOpt;

// Internal
use comms_if::net::{zmq, NetParams};
use nav_lib::{
    event_client::EventClient,
    event_loop::EventLoop,
    params::NavExecParams,
    path_server::PathServer,
    planner::Planner,
    script_source,
    search::AStarSearch,
};
use util::{
    logger::{logger_init, LevelFilter},
    script_interpreter::ScriptInterpreter,
    session::{self, Session},
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "nav_exec", about = "Navigation path planning executable")]
struct Cli {
    /// Replay events from this script instead of listening for them on the network
    #[structopt(short, long, parse(from_os_str))]
    script: Option<PathBuf>,

    /// Minimum log level, at least `info`
    #[structopt(short, long, default_value = "trace")]
    log_level: LevelFilter,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Where events are coming from.
enum EventSource {
    Script(JoinHandle<()>),
    Remote(EventClient),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let cli = Cli::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("nav_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(cli.log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Navigation Planner Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", cli);

    // ---- LOAD PARAMETERS ----

    let exec_params: NavExecParams =
        util::params::load("nav_exec.toml").wrap_err("Could not load nav_exec params")?;

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    session::save("params/nav_exec.json", exec_params.clone());

    info!("Exec parameters loaded");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = zmq::Context::new();

    let path_server =
        PathServer::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise the PathServer")?;
    info!("PathServer initialised");

    // ---- INITIALISE PLANNER ----

    let planner = Planner::new(
        exec_params.planner,
        AStarSearch::new(exec_params.search),
        path_server,
    );

    // ---- INITIALISE EVENT SOURCE ----

    let (event_tx, event_rx) = channel();

    let event_source = match cli.script {
        Some(ref path) => {
            info!("Loading script from {:?}", path);

            let si = ScriptInterpreter::new(path).wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} events\n",
                si.get_duration(),
                si.get_num_events()
            );

            EventSource::Script(
                script_source::spawn(si, event_tx).wrap_err("Failed to start the script source")?,
            )
        }
        None => {
            info!("No script provided, events will be received via the EventClient\n");

            EventSource::Remote(
                EventClient::new(&zmq_ctx, &net_params, event_tx)
                    .wrap_err("Failed to initialise the EventClient")?,
            )
        }
    };

    // ---- MAIN LOOP ----

    info!("Initialisation complete, entering event loop\n");

    let mut event_loop = EventLoop::new(planner, event_rx);
    let stats = event_loop.run();

    info!(
        "Event loop finished: {} handled, {} replans, {} ignored, {} dropped",
        stats.handled, stats.replans, stats.ignored, stats.dropped
    );
    session::save("stats.json", stats);

    // ---- SHUTDOWN ----

    match event_source {
        EventSource::Script(jh) => {
            if jh.join().is_err() {
                warn!("Script source thread panicked");
            }
        }
        EventSource::Remote(mut client) => client.stop(),
    }

    session.exit();

    info!("End of execution");

    Ok(())
}
