//! The per-batch-kind pipeline: list the remote send directory, then for each
//! file download, decode, qualify, dispatch, materialize a result file,
//! upload it, and clean up local staging.
//!
//! No error escapes a run: record-level failures are logged and suppressed in
//! the per-record loop, file-level failures in the per-file loop, run-level
//! failures return early. At-least-once delivery relies on the next scheduled
//! run finding unfinished files still present on the remote.
use chrono::Local;
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use crate::api::NotificationService;
use crate::batch::{BatchJob, Qualification};
use crate::config::BatchConfig;
use crate::transport::{join_remote, Transport, TransportSession};

/// Result-line suffix for records whose qualification decided against
/// dispatch.
const NOT_TRIGGERED: &str = "Not Triggered";
/// Result-line suffix for records whose dispatch failed.
const FAILED: &str = "Failed";

/// Run one send batch end to end. Never returns an error; everything is
/// logged and contained.
pub async fn run_send_batch<J: BatchJob>(
    cfg: &BatchConfig,
    transport: &dyn Transport,
    job: &J,
    notifier: &dyn NotificationService,
) {
    let batch = job.name();
    info!(batch, "starting send batch");

    let run_started = Local::now();
    let staging = Path::new(&cfg.ftp.local_path);
    if let Err(err) = fs::create_dir_all(staging).await {
        error!(batch, path = %staging.display(), error = %err, "failed to create staging directory");
        return;
    }

    let mut session = match transport.connect(&cfg.ftp).await {
        Ok(session) => session,
        Err(err) => {
            error!(batch, error = %err, "failed to open transport session");
            return;
        }
    };

    let files = match session.list(&cfg.ftp.remote_path_send).await {
        Ok(files) => files,
        Err(err) => {
            error!(batch, dir = %cfg.ftp.remote_path_send, error = %err, "failed to list remote send directory");
            session.close().await;
            return;
        }
    };

    for file in files {
        let remote_path = join_remote(&cfg.ftp.remote_path_send, &file);
        let local_path = match session.download(&remote_path, staging).await {
            Ok(path) => path,
            Err(err) => {
                error!(batch, file, error = %err, "failed to download file");
                continue;
            }
        };

        let results = match process_file(job, notifier, &local_path, run_started.naive_local())
            .await
        {
            Ok(results) => results,
            Err(err) => {
                error!(batch, file, error = %err, "failed to process file");
                continue;
            }
        };

        if results.is_empty() {
            info!(batch, file, "no result lines produced");
            remove_file(&local_path, batch).await;
            continue;
        }

        let result_name = format!(
            "{}_{}.txt",
            cfg.result_file_prefix,
            run_started.format("%Y%m%d")
        );
        let result_path = staging.join(&result_name);
        if let Err(err) = write_result_file(&result_path, &results).await {
            error!(batch, path = %result_path.display(), error = %err, "failed to write result file");
            continue;
        }
        info!(batch, path = %result_path.display(), lines = results.len(), "wrote result file");

        let remote_result = join_remote(&cfg.ftp.remote_path_result, &result_name);
        match session.upload(&result_path, &remote_result).await {
            Ok(()) => {
                info!(batch, file, remote = %remote_result, "uploaded result file");
                remove_file(&local_path, batch).await;
                remove_file(&result_path, batch).await;
            }
            Err(err) => {
                // Source and result stay in staging; the next run re-downloads
                // the source and re-emits.
                error!(batch, file, error = %err, "failed to upload result file");
            }
        }
    }

    session.close().await;
    info!(batch, "send batch finished");
}

/// Result batches are scheduled hooks with no work yet; downstream
/// acknowledgement reconciliation lands here.
pub async fn run_result_batch(batch: &'static str) {
    info!(batch, "starting result batch");
    info!(batch, "result batch finished");
}

/// Decode a staged file line by line and produce its result lines. A
/// malformed line or a failed record is logged and skipped without touching
/// the rest of the file.
async fn process_file<J: BatchJob>(
    job: &J,
    notifier: &dyn NotificationService,
    path: &Path,
    run_started: chrono::NaiveDateTime,
) -> Result<Vec<String>, std::io::Error> {
    let batch = job.name();
    let file = fs::File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut results = Vec::new();
    while let Some(line) = lines.next_line().await? {
        let values = match job.schema().decode(&line) {
            Ok(values) => values,
            Err(err) => {
                warn!(batch, error = %err, "skipping malformed line");
                continue;
            }
        };
        let record = job.record(values);

        let outcome = match job.qualify(&record, run_started).await {
            Err(err) => {
                error!(batch, error = %err, "qualification failed, record skipped");
                continue;
            }
            Ok(Qualification::Skip) => {
                info!(batch, "record not triggered");
                NOT_TRIGGERED.to_string()
            }
            Ok(Qualification::Send) => {
                match notifier.send_notification(&job.payload(&record)).await {
                    Ok(response) => {
                        info!(batch, code = %response.response_code, "notification sent");
                        response.as_result_fields()
                    }
                    Err(err) => {
                        error!(batch, error = %err, "failed to send notification");
                        FAILED.to_string()
                    }
                }
            }
        };

        let mut fields = job.fields(&record);
        fields.push(outcome);
        results.push(fields.join(","));
    }

    Ok(results)
}

async fn write_result_file(path: &Path, results: &[String]) -> Result<(), std::io::Error> {
    let mut content = results.join("\n");
    content.push('\n');
    fs::write(path, content).await
}

async fn remove_file(path: &Path, batch: &str) {
    if let Err(err) = fs::remove_file(path).await {
        warn!(batch, path = %path.display(), error = %err, "failed to remove staged file");
    }
}
