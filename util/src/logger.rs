//! Logger initialisation
//!
//! Log lines are written to stdout with coloured level tags, and to the session's log file as
//! plain text. Every line carries the session elapsed time and the name of the thread which logged
//! it, since events are received on background threads while the planner runs on the main one.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{self, info, Record};
use std::fmt::Arguments;
use std::thread;
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// # Notes
///
/// - `min_level` must include `log::Level::Info`, planner status messages are logged at info.
/// - `zmq` is always limited to info, its debug output is only socket chatter.
///
/// # Safety
///
/// - This function must only be called once to prevent corrupting logs.
pub fn logger_init(
    min_level: self::LevelFilter,
    session: &session::Session
) -> Result<(), LoggerInitError> {

    if min_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level))
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    let stdout = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{}", line(level_tag(record.level()), record, message)))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{}", line(record.level().as_str(), record, message)))
        })
        .chain(log_file);

    fern::Dispatch::new()
        .level(min_level)
        .level_for("zmq", LevelFilter::Info)
        .chain(stdout)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Format one log line.
///
/// Debug and trace lines also name the module they came from.
fn line<L: std::fmt::Display>(level: L, record: &Record, message: &Arguments) -> String {
    let current = thread::current();
    let thread_name = current.name().unwrap_or("unnamed");

    if record.level() > log::Level::Info {
        format!(
            "[{:10.6} {} {}] {}: {}",
            session::get_elapsed_seconds(),
            level,
            thread_name,
            record.target(),
            message
        )
    }
    else {
        format!(
            "[{:10.6} {} {}] {}",
            session::get_elapsed_seconds(),
            level,
            thread_name,
            message
        )
    }
}

/// Coloured tag for a log level
fn level_tag(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info  => "INF".normal(),
        log::Level::Warn  => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold()
    }
}
