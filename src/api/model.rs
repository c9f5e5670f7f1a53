//! Wire structures for the two external services. Field casing mirrors the
//! service contracts exactly, mixed casing included.
use serde::{Deserialize, Serialize};

/// Request body for the Get Alert Setting service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertSettingRequest {
    #[serde(rename = "RequestID")]
    pub request_id: String,
    #[serde(rename = "UserToken")]
    pub user_token: String,
}

/// Response from the Get Alert Setting service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertSettingResponse {
    #[serde(rename = "ResponseID", default)]
    pub response_id: String,
    #[serde(rename = "ResponseCode", default)]
    pub response_code: String,
    #[serde(rename = "ResponseMessage", default)]
    pub response_message: String,
    #[serde(rename = "UserToken", default)]
    pub user_token: String,
    #[serde(default)]
    pub spending_alert_flag: bool,
    /// `YYYY-MM-DD HH:MM:SS` local time, or empty when the user never
    /// logged in.
    #[serde(default)]
    pub last_login: String,
}

/// Request body for the Send Notification service. Language-pair fields may
/// be empty and are then omitted from the wire; at least one pair must be
/// populated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationRequest {
    pub usertoken: String,
    pub topiccode: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title_th: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message_th: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title_en: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message_en: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub titleinbox_th: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub messageinbox_th: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub titleinbox_en: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub messageinbox_en: String,
}

impl NotificationRequest {
    /// True when at least one language pair (title and message) is populated.
    pub fn has_language_pair(&self) -> bool {
        (!self.title_th.is_empty() && !self.message_th.is_empty())
            || (!self.title_en.is_empty() && !self.message_en.is_empty())
    }
}

/// Response from the Send Notification service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationResponse {
    #[serde(rename = "ResponseID", default)]
    pub response_id: String,
    #[serde(rename = "ResponseCode", default)]
    pub response_code: String,
    #[serde(rename = "ResponseMessage", default)]
    pub response_message: String,
}

impl NotificationResponse {
    /// Comma-separated projection used for run-result lines.
    pub fn as_result_fields(&self) -> String {
        format!(
            "{},{},{}",
            self.response_code, self.response_message, self.response_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_setting_request_uses_contract_casing() {
        let req = AlertSettingRequest {
            request_id: "RQ202406150930120042".into(),
            user_token: "token-1".into(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["RequestID"], "RQ202406150930120042");
        assert_eq!(json["UserToken"], "token-1");
    }

    #[test]
    fn alert_setting_response_tolerates_missing_fields() {
        let resp: AlertSettingResponse =
            serde_json::from_str(r#"{"spending_alert_flag": true}"#).unwrap();
        assert!(resp.spending_alert_flag);
        assert_eq!(resp.last_login, "");
        assert_eq!(resp.response_code, "");
    }

    #[test]
    fn notification_request_omits_empty_pairs() {
        let req = NotificationRequest {
            usertoken: "token-1".into(),
            topiccode: "test".into(),
            title_th: "หัวข้อ".into(),
            message_th: "ข้อความ".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["usertoken"], "token-1");
        assert_eq!(json["title_th"], "หัวข้อ");
        assert!(json.get("title_en").is_none());
        assert!(json.get("messageinbox_en").is_none());
    }

    #[test]
    fn has_language_pair_requires_title_and_message() {
        let mut req = NotificationRequest {
            usertoken: "t".into(),
            topiccode: "test".into(),
            ..Default::default()
        };
        assert!(!req.has_language_pair());

        req.title_en = "Spending Alert".into();
        assert!(!req.has_language_pair());

        req.message_en = "You have a spending transaction".into();
        assert!(req.has_language_pair());
    }

    #[test]
    fn notification_response_result_fields() {
        let resp = NotificationResponse {
            response_id: "abc-123".into(),
            response_code: "0000".into(),
            response_message: "Success".into(),
        };
        assert_eq!(resp.as_result_fields(), "0000,Success,abc-123");
    }
}
