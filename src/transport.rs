//! File-transfer transport: list, download, and upload against a remote FTP
//! drop. One session per run; sessions are never shared.
use async_ftp::FtpStream;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

use crate::config::FtpConfig;

const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport unreachable: {0}")]
    Unreachable(String),
    #[error("{op} failed for '{path}': {source}")]
    Op {
        op: &'static str,
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("local I/O failed for '{path}': {source}")]
    LocalIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("session already closed")]
    Closed,
}

/// Opens transport sessions. The seam lets the job runner and its tests stay
/// transport-agnostic.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(&self, ftp: &FtpConfig) -> Result<Box<dyn TransportSession>, TransportError>;
}

/// One live session against the remote drop.
#[async_trait]
pub trait TransportSession: Send {
    /// Names of regular files in `dir`, in server order.
    async fn list(&mut self, dir: &str) -> Result<Vec<String>, TransportError>;

    /// Download `remote_path` to `local_dir/basename(remote_path)` and return
    /// the local path. A partially written file is removed on failure.
    async fn download(
        &mut self,
        remote_path: &str,
        local_dir: &Path,
    ) -> Result<PathBuf, TransportError>;

    /// Upload the file at `local_path` to `remote_path`.
    async fn upload(&mut self, local_path: &Path, remote_path: &str)
        -> Result<(), TransportError>;

    /// Close the session. Idempotent; EOF during close is not an error.
    async fn close(&mut self);
}

/// Joins a remote directory and a file name with a single `/`.
pub fn join_remote(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

pub struct FtpTransport;

#[async_trait]
impl Transport for FtpTransport {
    async fn connect(&self, ftp: &FtpConfig) -> Result<Box<dyn TransportSession>, TransportError> {
        let mut stream = tokio::time::timeout(DIAL_TIMEOUT, FtpStream::connect(ftp.host.as_str()))
            .await
            .map_err(|_| {
                TransportError::Unreachable(format!(
                    "dial timeout after {}s connecting to '{}'",
                    DIAL_TIMEOUT.as_secs(),
                    ftp.host
                ))
            })?
            .map_err(|err| {
                TransportError::Unreachable(format!("failed to connect to '{}': {}", ftp.host, err))
            })?;

        if let Err(err) = stream.login(&ftp.user, &ftp.password).await {
            let _ = stream.quit().await;
            return Err(TransportError::Unreachable(format!(
                "failed to login to '{}' as user '{}': {}",
                ftp.host, ftp.user, err
            )));
        }

        info!(host = %ftp.host, user = %ftp.user, "connected to ftp server");
        Ok(Box::new(FtpSession {
            stream: Some(stream),
            host: ftp.host.clone(),
        }))
    }
}

pub struct FtpSession {
    stream: Option<FtpStream>,
    host: String,
}

impl FtpSession {
    fn stream(&mut self) -> Result<&mut FtpStream, TransportError> {
        self.stream.as_mut().ok_or(TransportError::Closed)
    }
}

#[async_trait]
impl TransportSession for FtpSession {
    async fn list(&mut self, dir: &str) -> Result<Vec<String>, TransportError> {
        let entries = self
            .stream()?
            .list(Some(dir))
            .await
            .map_err(|source| TransportError::Op {
                op: "list",
                path: dir.to_string(),
                source: Box::new(source),
            })?;

        let files: Vec<String> = entries
            .iter()
            .filter_map(|line| parse_list_entry(line))
            .collect();
        info!(count = files.len(), dir, "listed remote directory");
        Ok(files)
    }

    async fn download(
        &mut self,
        remote_path: &str,
        local_dir: &Path,
    ) -> Result<PathBuf, TransportError> {
        let name = remote_path.rsplit('/').next().unwrap_or(remote_path);
        let local_path = local_dir.join(name);

        let payload = self
            .stream()?
            .simple_retr(remote_path)
            .await
            .map_err(|source| TransportError::Op {
                op: "download",
                path: remote_path.to_string(),
                source: Box::new(source),
            })?;

        if let Err(source) = fs::write(&local_path, payload.into_inner()).await {
            let _ = fs::remove_file(&local_path).await;
            return Err(TransportError::LocalIo {
                path: local_path.display().to_string(),
                source,
            });
        }

        info!(remote = remote_path, local = %local_path.display(), "downloaded file");
        Ok(local_path)
    }

    async fn upload(
        &mut self,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<(), TransportError> {
        let mut file = fs::File::open(local_path)
            .await
            .map_err(|source| TransportError::LocalIo {
                path: local_path.display().to_string(),
                source,
            })?;

        self.stream()?
            .put(remote_path, &mut file)
            .await
            .map_err(|source| TransportError::Op {
                op: "upload",
                path: remote_path.to_string(),
                source: Box::new(source),
            })?;

        info!(local = %local_path.display(), remote = remote_path, "uploaded file");
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            match stream.quit().await {
                Ok(()) => info!(host = %self.host, "closed ftp session"),
                Err(err) => {
                    // The server may drop the control connection before the
                    // QUIT reply; that counts as a clean close.
                    let text = err.to_string();
                    if text.contains("EOF") || text.to_lowercase().contains("connection closed") {
                        info!(host = %self.host, "closed ftp session");
                    } else {
                        warn!(host = %self.host, error = %text, "error closing ftp session");
                    }
                }
            }
        }
    }
}

/// Parse one Unix-style `LIST` line, returning the name for regular files
/// only. Directories, symlinks, and unrecognized lines yield `None`.
fn parse_list_entry(line: &str) -> Option<String> {
    let line = line.trim_end();
    if line.is_empty() || line.starts_with("total") {
        return None;
    }
    if !line.starts_with('-') {
        return None;
    }

    // perms links owner group size month day time-or-year name; the name is
    // everything after the eighth field and may contain spaces.
    let mut rest = line;
    for _ in 0..8 {
        rest = rest.trim_start();
        let end = rest.find(char::is_whitespace)?;
        rest = &rest[end..];
    }
    let name = rest.trim_start();
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_regular_file_entries() {
        let line = "-rw-r--r--    1 batch    batch        1024 Jun 01 09:15 SA01.txt";
        assert_eq!(parse_list_entry(line).as_deref(), Some("SA01.txt"));
    }

    #[test]
    fn keeps_spaces_inside_file_names() {
        let line = "-rw-r--r-- 1 batch batch 2048 Jun 01 09:15 daily report.txt";
        assert_eq!(parse_list_entry(line).as_deref(), Some("daily report.txt"));
    }

    #[test]
    fn skips_directories_and_symlinks() {
        assert_eq!(
            parse_list_entry("drwxr-xr-x 2 batch batch 4096 Jun 01 09:15 archive"),
            None
        );
        assert_eq!(
            parse_list_entry("lrwxrwxrwx 1 batch batch 12 Jun 01 09:15 latest -> SA01.txt"),
            None
        );
    }

    #[test]
    fn skips_noise_lines() {
        assert_eq!(parse_list_entry(""), None);
        assert_eq!(parse_list_entry("total 16"), None);
        assert_eq!(parse_list_entry("-rw-r--r-- 1"), None);
    }

    #[test]
    fn join_remote_normalizes_trailing_slash() {
        assert_eq!(join_remote("/outbound/", "a.txt"), "/outbound/a.txt");
        assert_eq!(join_remote("/outbound", "a.txt"), "/outbound/a.txt");
    }
}
