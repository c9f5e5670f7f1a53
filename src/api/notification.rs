//! Client for the downstream notification dispatch service.
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::api::model::{NotificationRequest, NotificationResponse};
use crate::api::{post_json, ServiceError};
use crate::logging::ApiTrace;

#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send_notification(
        &self,
        request: &NotificationRequest,
    ) -> Result<NotificationResponse, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct NotificationClient {
    http: Client,
    url: String,
    trace: ApiTrace,
}

impl NotificationClient {
    pub fn new(url: String, timeout_secs: u64, trace: ApiTrace) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("reqwest client");
        Self { http, url, trace }
    }
}

#[async_trait]
impl NotificationService for NotificationClient {
    async fn send_notification(
        &self,
        request: &NotificationRequest,
    ) -> Result<NotificationResponse, ServiceError> {
        post_json(
            &self.http,
            &self.url,
            "Send Notification API",
            &self.trace,
            request,
        )
        .await
    }
}
