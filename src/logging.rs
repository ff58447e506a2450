use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::{Error, Result};

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV: &str = "GUIDESYNC_LOG";

/// Route tracing output to a daily rolling file.
///
/// The returned guard flushes buffered lines on drop; keep it alive for the
/// lifetime of the process.
pub fn init(config: &Config) -> Result<WorkerGuard> {
  let directory = config.log_directory()?;
  std::fs::create_dir_all(&directory).map_err(|e| {
    Error::Logging(format!(
      "cannot create log directory {}: {}",
      directory.display(),
      e
    ))
  })?;

  let appender = tracing_appender::rolling::daily(&directory, "guidesync.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(&config.log.level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| Error::Logging(format!("cannot install subscriber: {}", e)))?;

  tracing::info!(directory = %directory.display(), "logging initialized");
  Ok(guard)
}
