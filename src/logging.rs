use std::path::Path;

use miette::{miette, Context, IntoDiagnostic, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};


/// Installs the global subscriber: compact console output on stderr and a
/// plain-text log file in `log_file_directory`, each with its own filter.
///
/// The returned guard flushes the log file when dropped, so keep it alive
/// until the program exits.
pub fn initialize_tracing<P: AsRef<Path>>(
    console_level_filter: EnvFilter,
    log_file_level_filter: EnvFilter,
    log_file_directory: P,
    log_file_name: &str,
) -> Result<WorkerGuard> {
    let log_file_directory = log_file_directory.as_ref();

    std::fs::create_dir_all(log_file_directory)
        .into_diagnostic()
        .wrap_err_with(|| {
            miette!(
                "Failed to create missing log directory at {}.",
                log_file_directory.display()
            )
        })?;

    let file_appender = tracing_appender::rolling::never(log_file_directory, log_file_name);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);


    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .with_filter(console_level_filter);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_filter(log_file_level_filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .into_diagnostic()
        .wrap_err("Failed to install the tracing subscriber.")?;

    Ok(guard)
}
