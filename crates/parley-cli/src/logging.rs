//! Subscriber setup: console output plus a daily-rotated log file.

use parley_infrastructure::ParleyPaths;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const LOG_FILE_PREFIX: &str = "parley.log";

/// Installs the global subscriber.
///
/// `RUST_LOG` controls what is recorded (default `info`); `console_level`
/// additionally caps what reaches stderr. The returned guard flushes the
/// file writer on drop and must live until exit.
pub fn init(console_level: LevelFilter) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_level);

    let (file_layer, guard) = match file_writer() {
        Some((writer, guard)) => (
            Some(fmt::layer().with_ansi(false).with_writer(writer)),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file_layer)
        .init();

    guard
}

fn file_writer() -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let log_dir = match ParleyPaths::log_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("File logging disabled: {e}");
            return None;
        }
    };

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(&log_dir);

    match appender {
        Ok(appender) => Some(tracing_appender::non_blocking(appender)),
        Err(e) => {
            eprintln!("File logging disabled ({}): {e}", log_dir.display());
            None
        }
    }
}
