// crates/clipcut-ui/src/helpers/log.rs
//
// Logging setup for the binary.
//
// In release builds with `windows_subsystem = "windows"` (double-click launch)
// there is no console attached, so stderr output is silently discarded. Every
// event therefore also goes to a file in the OS temp directory, which is
// readable regardless of launch mode.
//
// File: %TEMP%/clipcut.log (appended to, never rotated).
// Filter: $RUST_LOG, default `info`. Engine chatter is logged at debug under
// target `engine`, so `RUST_LOG=info,engine=debug` shows it.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_FILE: &str = "clipcut.log";

/// Install the global subscriber. Keep the returned guard alive for the life
/// of the process; dropping it flushes and stops the file writer.
pub fn init() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let appender         = tracing_appender::rolling::never(std::env::temp_dir(), LOG_FILE);
    let (writer, guard)  = tracing_appender::non_blocking(appender);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init();

    match installed {
        Ok(()) => Some(guard),
        Err(_) => None,
    }
}
