use std::path::PathBuf;

use chrono::Local;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter, Registry};

/// Where a run logs and how much.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    /// Directory for the run's log file. `None` logs to the console only.
    pub dir: Option<PathBuf>,
    pub console: Level,
    /// Level for this crate's events in the log file.
    pub file: Level,
}

/// Timestamped name of a run's log file.
pub fn log_file_name() -> String {
    format!("{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S"))
}

fn file_directive(level: Level) -> String {
    format!("{}={}", env!("CARGO_CRATE_NAME"), level)
}

/// Installs the global subscriber: everything at `settings.console` on
/// stdout, plus this crate at `settings.file` in `<dir>/<timestamp>.log`.
///
/// The returned guard flushes the file writer on drop and must be held
/// for the whole run.
pub fn setup_tracing(
    settings: &LogSettings,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_level(true)
        .with_target(false)
        .with_filter(
            EnvFilter::from_default_env()
                .add_directive(LevelFilter::from_level(settings.console).into()),
        );

    let (file_layer, guard) = match &settings.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, log_file_name());
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_level(true)
                .with_target(true)
                .with_filter(
                    EnvFilter::from_default_env()
                        .add_directive(file_directive(settings.file).parse()?),
                );
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = Registry::default().with(console_layer).with(file_layer);
    tracing::subscriber::set_global_default(subscriber)?;

    info!(
        console = %settings.console,
        file = %settings.file,
        dir = ?settings.dir,
        "Tracing initialized"
    );

    Ok(guard)
}
