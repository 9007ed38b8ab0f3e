use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber: stdout plus a daily rolling file in
/// `log_dir`. Keep the returned guard alive or buffered file lines are lost.
pub fn init(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    let file_appender = rolling::daily(log_dir, "pipeline.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false) // removes module path
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .try_init()?;

    Ok(guard)
}
