//! Logging for the identcheck binary.
//!
//! Colored output on stderr (stdout carries command results), plus an optional
//! plain-text log file, behind a thread-safe one-time initialization.

use crate::error::IdentcheckError;

use std::fs::{File, create_dir_all};
use std::io::stderr;
use std::path::Path;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::Dispatch;
use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use humantime::format_rfc3339;
use log::{LevelFilter, info, warn};

/// Thread-safe initialization guard.
static INIT_LOGGER_ONCE: Once = Once::new();

/// Tracks if logger initialization was already attempted.
static LOGGER_ALREADY_CALLED: AtomicBool = AtomicBool::new(false);

/// Log file name.
pub const LOG_FILE_NAME: &str = "identcheck.log";

/// Message logged when logger is successfully initialized.
const LOGGER_INITIALIZED_MESSAGE_PREFIX: &str = "Logger initialized with level: ";

/// Warning message when logger is called multiple times.
const LOGGER_ALREADY_INITIALIZED_MESSAGE: &str = "Logger already initialized";

/// Default log level for debug builds.
#[cfg(debug_assertions)]
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Debug;

/// Default log level for release builds.
#[cfg(not(debug_assertions))]
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// `--verbose` forces Debug, otherwise the build default.
pub fn level_for(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        DEFAULT_LOG_LEVEL
    }
}

/// Initialize the logger: stderr always, `{log_dir}/identcheck.log` when a directory is given.
///
/// Safe to call multiple times; subsequent calls log a warning and return Ok.
///
/// # Errors
///
/// Returns an error if:
/// - The log directory or file cannot be created
/// - Logger dispatch configuration fails
pub fn initialize(log_dir: Option<&Path>, level: LevelFilter) -> Result<(), IdentcheckError> {
    if LOGGER_ALREADY_CALLED.swap(true, Ordering::SeqCst) {
        warn!("{LOGGER_ALREADY_INITIALIZED_MESSAGE}");
        return Ok(());
    }

    let mut result = Ok(());

    INIT_LOGGER_ONCE.call_once(|| {
        result = initialize_internal(log_dir, level);
        if result.is_ok() {
            info!("{LOGGER_INITIALIZED_MESSAGE_PREFIX}{level:?}");
        }
    });

    result
}

/// Create `log_dir` if needed and open the log file in append mode.
#[track_caller]
pub fn open_log_file(log_dir: &Path) -> Result<File, IdentcheckError> {
    create_dir_all(log_dir).map_err(|e| {
        IdentcheckError::identcheck(format!(
            "Failed to create log directory {}: {e}",
            log_dir.display()
        ))
    })?;

    fern::log_file(log_dir.join(LOG_FILE_NAME))
        .map_err(|e| IdentcheckError::identcheck(format!("Failed to create log file: {e}")))
}

#[track_caller]
fn initialize_internal(log_dir: Option<&Path>, level: LevelFilter) -> Result<(), IdentcheckError> {
    let color_configuration = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let stderr_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{file}:{line}]",
                date = format_rfc3339(SystemTime::now()),
                level = color_configuration.color(record.level()),
                message = message,
                file = record.file().unwrap_or("unknown"),
                line = record.line().unwrap_or(0),
            ))
        })
        .chain(stderr());

    let mut base_dispatch = Dispatch::new().level(level).chain(stderr_dispatch);

    if let Some(log_dir) = log_dir {
        let file_dispatch = Dispatch::new()
            .format(move |out, message, record| {
                out.finish(format_args!(
                    "[{date} - {level}] {message} [{file}:{line}]",
                    date = format_rfc3339(SystemTime::now()),
                    level = record.level(),
                    message = message,
                    file = record.file().unwrap_or("unknown"),
                    line = record.line().unwrap_or(0)
                ))
            })
            .chain(open_log_file(log_dir)?);

        base_dispatch = base_dispatch.chain(file_dispatch);
    }

    base_dispatch
        .apply()
        .map_err(|e| IdentcheckError::identcheck(format!("Failed to initialize logger: {e}")))?;

    Ok(())
}
