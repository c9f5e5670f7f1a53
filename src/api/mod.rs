//! Typed JSON-over-HTTP clients for the two external services.
use chrono::Local;
use rand::Rng;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::logging::ApiTrace;

pub mod alert_setting;
pub mod model;
pub mod notification;

pub use alert_setting::{AlertSettingClient, AlertSettingService};
pub use notification::{NotificationClient, NotificationService};

/// Bodies quoted in errors and traces are cut to this many bytes.
const MAX_TRACED_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("service returned status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Fresh per-call request token: `RQ` + `YYYYMMDDHHMMSS` local time + four
/// decimal digits from a non-cryptographic source.
pub fn generate_request_id() -> String {
    let timestamp = Local::now().format("%Y%m%d%H%M%S");
    let digits: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("RQ{timestamp}{digits:04}")
}

/// POST a JSON body and decode a JSON response. `200` is the only success
/// status. Every request and response, success or failure, lands on the
/// API-trace sink.
pub(crate) async fn post_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    api_name: &str,
    trace: &ApiTrace,
    body: &impl Serialize,
) -> Result<T, ServiceError> {
    let request_json =
        serde_json::to_string(body).unwrap_or_else(|_| "<unserializable request>".to_string());
    trace
        .log(&format!(
            "Calling {api_name} - Request: {request_json}, URL: {url}"
        ))
        .await;

    let response = match http.post(url).json(body).send().await {
        Ok(response) => response,
        Err(err) => {
            trace
                .log(&format!(
                    "{api_name} - Failed Response (Error: {err}), URL: {url}"
                ))
                .await;
            return Err(ServiceError::Http(err));
        }
    };

    let status = response.status();
    if status != StatusCode::OK {
        let body = truncate(&response.text().await.unwrap_or_default(), MAX_TRACED_BODY);
        trace
            .log(&format!(
                "{api_name} - Non-OK Status: {status}, URL: {url}, Body: {body}"
            ))
            .await;
        return Err(ServiceError::Status { status, body });
    }

    let text = response.text().await?;
    match serde_json::from_str::<T>(&text) {
        Ok(value) => {
            trace
                .log(&format!(
                    "{api_name} - Successful Response: {}, URL: {url}",
                    truncate(&text, MAX_TRACED_BODY)
                ))
                .await;
            Ok(value)
        }
        Err(err) => {
            trace
                .log(&format!(
                    "{api_name} - Failed to decode response: {err}, URL: {url}"
                ))
                .await;
            Err(ServiceError::Decode(err))
        }
    }
}

/// Truncate to at most `max` bytes without splitting a UTF-8 character.
fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
