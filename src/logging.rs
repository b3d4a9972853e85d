//! File-based logging so diagnostics never interleave with the UI.

use std::fs;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with a non-blocking writer into the state
/// directory. Returns the guard that flushes buffered lines on drop.
/// Logging is silently disabled when no state directory is available.
pub fn init() -> Option<WorkerGuard> {
    let dir = state_dir()?;
    fs::create_dir_all(&dir).ok()?;
    let appender = tracing_appender::rolling::never(&dir, "stagehand.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_env("STAGEHAND_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

/// `$XDG_STATE_HOME/stagehand`, falling back to `~/.local/state/stagehand`.
fn state_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_STATE_HOME")
        .map(PathBuf::from)
        .filter(|path| path.is_absolute())
        .or_else(|| home::home_dir().map(|h| h.join(".local").join("state")))
        .map(|base| base.join("stagehand"))
}
