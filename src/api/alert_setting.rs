//! Client for the recipient alert-preference service.
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::api::model::{AlertSettingRequest, AlertSettingResponse};
use crate::api::{generate_request_id, post_json, ServiceError};
use crate::logging::ApiTrace;

#[async_trait]
pub trait AlertSettingService: Send + Sync {
    async fn get_alert_setting(
        &self,
        user_token: &str,
    ) -> Result<AlertSettingResponse, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct AlertSettingClient {
    http: Client,
    url: String,
    trace: ApiTrace,
}

impl AlertSettingClient {
    pub fn new(url: String, timeout_secs: u64, trace: ApiTrace) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("reqwest client");
        Self { http, url, trace }
    }
}

#[async_trait]
impl AlertSettingService for AlertSettingClient {
    async fn get_alert_setting(
        &self,
        user_token: &str,
    ) -> Result<AlertSettingResponse, ServiceError> {
        let request = AlertSettingRequest {
            request_id: generate_request_id(),
            user_token: user_token.to_string(),
        };
        post_json(
            &self.http,
            &self.url,
            "Get Alert Setting API",
            &self.trace,
            &request,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Json, Router};
    use tempfile::tempdir;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/alert-setting")
    }

    #[tokio::test]
    async fn decodes_successful_response() {
        let router = Router::new().route(
            "/alert-setting",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert!(body["RequestID"].as_str().unwrap().starts_with("RQ"));
                assert_eq!(body["UserToken"], "token-1");
                Json(serde_json::json!({
                    "ResponseID": "r-1",
                    "ResponseCode": "0000",
                    "ResponseMessage": "Success",
                    "UserToken": "token-1",
                    "spending_alert_flag": true,
                    "last_login": "2024-06-01 09:00:00",
                }))
            }),
        );
        let url = serve(router).await;

        let td = tempdir().unwrap();
        let client = AlertSettingClient::new(url, 5, ApiTrace::new(td.path(), "api_trace"));
        let resp = client.get_alert_setting("token-1").await.unwrap();

        assert!(resp.spending_alert_flag);
        assert_eq!(resp.last_login, "2024-06-01 09:00:00");
        assert_eq!(resp.response_code, "0000");

        let trace = std::fs::read_to_string(td.path().join("api_trace.log")).unwrap();
        assert!(trace.contains("Calling Get Alert Setting API"));
        assert!(trace.contains("Successful Response"));
    }

    #[tokio::test]
    async fn non_ok_status_is_service_error() {
        let router = Router::new().route(
            "/alert-setting",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let url = serve(router).await;

        let td = tempdir().unwrap();
        let client = AlertSettingClient::new(url, 5, ApiTrace::new(td.path(), "api_trace"));
        let err = client.get_alert_setting("token-1").await.unwrap_err();

        match err {
            ServiceError::Status { status, body } => {
                assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }

        let trace = std::fs::read_to_string(td.path().join("api_trace.log")).unwrap();
        assert!(trace.contains("Non-OK Status: 500"));
    }

    #[tokio::test]
    async fn invalid_json_is_decode_error() {
        let router = Router::new().route("/alert-setting", post(|| async { "not json" }));
        let url = serve(router).await;

        let td = tempdir().unwrap();
        let client = AlertSettingClient::new(url, 5, ApiTrace::new(td.path(), "api_trace"));
        let err = client.get_alert_setting("token-1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Decode(_)));
    }
}
