use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable naming a log file. Unset means log to stderr.
pub const LOG_FILE_ENV: &str = "EFFECTSTORE_LOG";

/// Initialize tracing for a process that hosts a store.
///
/// Filtering follows `RUST_LOG` and defaults to `info`. Events carry RFC 3339
/// UTC timestamps. When `EFFECTSTORE_LOG` is set, output goes to
/// `{path}.{timestamp}.{pid}` instead of stderr, so two demo processes never
/// write the same file.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(UtcTime::rfc_3339());

    match log_file() {
        Some(file) => tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_writer(file).with_ansi(false))
            .init(),
        None => tracing_subscriber::registry()
            .with(filter)
            .with(layer.with_writer(std::io::stderr))
            .init(),
    }
}

/// Open the per-process log file, falling back to stderr if it cannot be created.
fn log_file() -> Option<std::fs::File> {
    let base = std::env::var(LOG_FILE_ENV).ok()?;
    let started = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    let path = format!("{}.{}.{}", base, started, std::process::id());

    match std::fs::File::create(&path) {
        Ok(file) => Some(file),
        Err(err) => {
            eprintln!("Warning: failed to create log file {}: {}", path, err);
            None
        }
    }
}
