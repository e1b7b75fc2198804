use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const SERVER_LOG_FILE: &str = "server.log";

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Server logging goes to stderr and to `server.log` under `logs_dir`.
/// stdout is reserved for protocol frames. Keep the guard alive for the
/// process lifetime or buffered file output is lost.
pub fn init_server_logging(logs_dir: &Path, debug: bool) -> Option<WorkerGuard> {
    let level = if debug { "debug" } else { "info" };
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = match fs::create_dir_all(logs_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::never(logs_dir, SERVER_LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!(
                "Warning: cannot create log directory {}: {}",
                logs_dir.display(),
                e
            );
            (None, None)
        }
    };

    let result = tracing_subscriber::registry()
        .with(filter(level))
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    if let Err(e) = result {
        eprintln!("Warning: logging already initialized: {}", e);
    }
    guard
}

/// Chat client logging stays quiet unless verbose so it does not interfere
/// with the prompt.
pub fn init_cli_logging(verbose: bool) {
    let level = if verbose { "info,hkube_mcp=debug" } else { "warn" };
    let _ = fmt()
        .with_env_filter(filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
