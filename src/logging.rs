//! Log setup. The terminal belongs to the UI, so logs go to a daily file.

use color_eyre::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_ENV: &str = "TALLY_LOG";

/// Directory for log files: `$XDG_DATA_HOME/tally/logs`
pub fn log_dir() -> Option<PathBuf> {
  dirs::data_dir().map(|d| d.join("tally").join("logs"))
}

fn env_filter() -> EnvFilter {
  EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Keep the guard alive until exit so
/// buffered lines get flushed.
pub fn init() -> Result<Option<WorkerGuard>> {
  let Some(dir) = log_dir() else {
    // No data dir to write into; run without logs
    return Ok(None);
  };
  std::fs::create_dir_all(&dir)?;

  let appender = tracing_appender::rolling::daily(&dir, "tally.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::registry()
    .with(env_filter())
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false),
    )
    .try_init()?;

  tracing::info!(dir = %dir.display(), "logging initialised");
  Ok(Some(guard))
}
