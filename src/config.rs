//! Configuration loader and validator for the batch notification dispatcher.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::scheduler::TimeOfDay;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub environment: String,
    pub api_endpoints: ApiEndpoints,
    pub spending_alert: BatchConfig,
    pub e_ncb: BatchConfig,
    pub log_path: String,
    pub api_log_prefix: String,
}

/// Endpoints and the whole-request timeout for the two external services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiEndpoints {
    pub get_alert_setting: String,
    pub send_notification: String,
    /// Seconds, applied to each HTTP call (connect + write + read).
    pub timeout: u64,
}

/// Per-batch-kind configuration bundle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchConfig {
    pub ftp: FtpConfig,
    pub schedule: ScheduleConfig,
    pub result_file_prefix: String,
}

/// Remote drop credentials and directories, plus the local staging dir.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FtpConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub remote_path_send: String,
    pub remote_path_result: String,
    pub local_path: String,
}

/// Daily trigger times, `HH:MM` in local time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub send_time: String,
    pub result_time: String,
}

impl Config {
    /// Ensure the log directory exists (staging dirs are created per run).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.log_path.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.log_path)
    }
}

/// Returns the active profile name from `APP_ENV`, defaulting to `dev`.
pub fn active_profile() -> String {
    std::env::var("APP_ENV")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "dev".to_string())
}

/// Load the configuration for the active profile from `dir/<profile>.yaml`.
pub fn load(dir: &Path) -> Result<Config, ConfigError> {
    load_from(&dir.join(format!("{}.yaml", active_profile())))
}

/// Load configuration from a YAML file and validate it.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.api_endpoints.get_alert_setting.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "api_endpoints.get_alert_setting must be non-empty",
        ));
    }
    if cfg.api_endpoints.send_notification.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "api_endpoints.send_notification must be non-empty",
        ));
    }
    if cfg.api_endpoints.timeout == 0 {
        return Err(ConfigError::Invalid("api_endpoints.timeout must be > 0"));
    }

    validate_batch(&cfg.spending_alert, BatchField::SpendingAlert)?;
    validate_batch(&cfg.e_ncb, BatchField::ENcb)?;

    if cfg.log_path.trim().is_empty() {
        return Err(ConfigError::Invalid("log_path must be non-empty"));
    }
    if cfg.api_log_prefix.trim().is_empty() {
        return Err(ConfigError::Invalid("api_log_prefix must be non-empty"));
    }

    Ok(())
}

#[derive(Clone, Copy)]
enum BatchField {
    SpendingAlert,
    ENcb,
}

fn validate_batch(batch: &BatchConfig, which: BatchField) -> Result<(), ConfigError> {
    // Error messages stay `&'static str`, so each key carries its own literal.
    macro_rules! invalid {
        ($sa:literal, $encb:literal) => {
            match which {
                BatchField::SpendingAlert => ConfigError::Invalid($sa),
                BatchField::ENcb => ConfigError::Invalid($encb),
            }
        };
    }

    if batch.ftp.host.trim().is_empty() {
        return Err(invalid!(
            "spending_alert.ftp.host must be non-empty",
            "e_ncb.ftp.host must be non-empty"
        ));
    }
    if batch.ftp.user.trim().is_empty() {
        return Err(invalid!(
            "spending_alert.ftp.user must be non-empty",
            "e_ncb.ftp.user must be non-empty"
        ));
    }
    if batch.ftp.remote_path_send.trim().is_empty() {
        return Err(invalid!(
            "spending_alert.ftp.remote_path_send must be non-empty",
            "e_ncb.ftp.remote_path_send must be non-empty"
        ));
    }
    if batch.ftp.remote_path_result.trim().is_empty() {
        return Err(invalid!(
            "spending_alert.ftp.remote_path_result must be non-empty",
            "e_ncb.ftp.remote_path_result must be non-empty"
        ));
    }
    if batch.ftp.local_path.trim().is_empty() {
        return Err(invalid!(
            "spending_alert.ftp.local_path must be non-empty",
            "e_ncb.ftp.local_path must be non-empty"
        ));
    }
    if batch.result_file_prefix.trim().is_empty() {
        return Err(invalid!(
            "spending_alert.result_file_prefix must be non-empty",
            "e_ncb.result_file_prefix must be non-empty"
        ));
    }
    if batch.schedule.send_time.parse::<TimeOfDay>().is_err() {
        return Err(invalid!(
            "spending_alert.schedule.send_time must be HH:MM",
            "e_ncb.schedule.send_time must be HH:MM"
        ));
    }
    if batch.schedule.result_time.parse::<TimeOfDay>().is_err() {
        return Err(invalid!(
            "spending_alert.schedule.result_time must be HH:MM",
            "e_ncb.schedule.result_time must be HH:MM"
        ));
    }

    Ok(())
}

/// Example configuration, kept in sync with `config/dev.yaml`.
pub fn example() -> &'static str {
    r#"environment: "dev"

api_endpoints:
  get_alert_setting: "http://localhost:9000/api/v1/alert-setting"
  send_notification: "http://localhost:9000/api/v1/notification"
  timeout: 30

spending_alert:
  ftp:
    host: "localhost:21"
    user: "batch"
    password: "batch-password"
    remote_path_send: "/outbound/spending_alert"
    remote_path_result: "/inbound/spending_alert"
    local_path: "./data/spending_alert"
  schedule:
    send_time: "09:00"
    result_time: "18:00"
  result_file_prefix: "SPENDING_ALERT_RESULT"

e_ncb:
  ftp:
    host: "localhost:21"
    user: "batch"
    password: "batch-password"
    remote_path_send: "/outbound/e_ncb"
    remote_path_result: "/inbound/e_ncb"
    local_path: "./data/e_ncb"
  schedule:
    send_time: "10:30"
    result_time: "19:00"
  result_file_prefix: "ENCB_RESULT"

log_path: "./logs"
api_log_prefix: "api_trace"
"#
}
