use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::model::LogConfig;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "THREADPAD_LOG";

const DEFAULT_LEVEL: &str = "warn";

/// Filter from `THREADPAD_LOG`, else the configured level, else `warn`
pub fn env_filter(config: &LogConfig) -> EnvFilter {
    let fallback = config.level.as_deref().unwrap_or(DEFAULT_LEVEL);
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Log to the configured file. The terminal belongs to the TUI, so nothing
/// is logged when no file is set. Keep the guard alive until exit.
pub fn init_tui_logging(config: &LogConfig) -> Option<WorkerGuard> {
    let path = config.file.as_deref()?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = path.file_name()?;
    let appender = tracing_appender::rolling::never(dir, name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;
    Some(guard)
}

/// CLI subcommands log to stderr
pub fn init_cli_logging(config: &LogConfig) {
    // A subscriber may already be installed (tests); that's fine
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}
