//! Application logging and the API-trace sink.
//!
//! The application log goes to stdout and a daily-rolling JSON file under the
//! configured log directory. API request/response traces go to a separate
//! append-only file, opened per call.
use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the process-wide subscriber. The returned guard must be held
/// for the lifetime of the process so buffered file output is flushed.
pub fn init(log_path: &str) -> Result<WorkerGuard, std::io::Error> {
    std::fs::create_dir_all(log_path)?;

    let file_appender = tracing_appender::rolling::daily(log_path, "app.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .json(),
        )
        .init();

    Ok(guard)
}

/// Append-only trace of every external service request and response, kept
/// separate from the application log. The file is opened per call; call rate
/// is bounded by the batch cadence.
#[derive(Debug, Clone)]
pub struct ApiTrace {
    path: PathBuf,
}

impl ApiTrace {
    pub fn new(log_dir: &Path, prefix: &str) -> Self {
        Self {
            path: log_dir.join(format!("{prefix}.log")),
        }
    }

    /// Write one timestamped trace line. Trace failures never fail the call
    /// being traced; they are reported on the application log instead.
    pub async fn log(&self, message: &str) {
        if let Err(err) = self.append(message).await {
            warn!(path = %self.path.display(), error = %err, "failed to write api trace");
        }
    }

    async fn append(&self, message: &str) -> Result<(), std::io::Error> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        let line = format!("{} {}\n", Local::now().format("%Y-%m-%dT%H:%M:%S%z"), message);
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}
