//! Spending-alert batch kind: card transaction lines qualified against the
//! recipient's alert preference before dispatch.
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::{info, warn};

use crate::api::model::NotificationRequest;
use crate::api::{AlertSettingService, ServiceError};
use crate::batch::{BatchJob, Qualification};
use crate::codec::{FieldSpec, RecordSchema};

const TOPIC_CODE: &str = "test";
const TITLE_TH: &str = "แจ้งเตือนการใช้จ่าย";
const TITLE_EN: &str = "Spending Alert";

/// Days since last login beyond which alerts are not sent.
const LAST_LOGIN_WINDOW_DAYS: i64 = 90;
const LAST_LOGIN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static SCHEMA: Lazy<RecordSchema> = Lazy::new(|| {
    RecordSchema::new(
        "spending-alert",
        vec![
            FieldSpec::required("card-no", 0, 16),
            FieldSpec::required("user-token", 20, 36),
            FieldSpec::optional("original-date", 60, 10),
            FieldSpec::optional("original-time", 71, 8),
        ],
    )
});

pub fn schema() -> &'static RecordSchema {
    &SCHEMA
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendingAlertRecord {
    pub card_no: String,
    pub user_token: String,
    pub original_date: String,
    pub original_time: String,
}

pub struct SpendingAlertJob {
    prefs: Arc<dyn AlertSettingService>,
}

impl SpendingAlertJob {
    pub fn new(prefs: Arc<dyn AlertSettingService>) -> Self {
        Self { prefs }
    }
}

#[async_trait]
impl BatchJob for SpendingAlertJob {
    type Record = SpendingAlertRecord;

    fn name(&self) -> &'static str {
        "spending-alert"
    }

    fn schema(&self) -> &RecordSchema {
        &SCHEMA
    }

    fn record(&self, values: Vec<String>) -> Self::Record {
        let mut values = values.into_iter();
        SpendingAlertRecord {
            card_no: values.next().unwrap_or_default(),
            user_token: values.next().unwrap_or_default(),
            original_date: values.next().unwrap_or_default(),
            original_time: values.next().unwrap_or_default(),
        }
    }

    fn fields(&self, record: &Self::Record) -> Vec<String> {
        vec![
            record.card_no.clone(),
            record.user_token.clone(),
            record.original_date.clone(),
            record.original_time.clone(),
            record.user_token.clone(),
        ]
    }

    async fn qualify(
        &self,
        record: &Self::Record,
        run_started: NaiveDateTime,
    ) -> Result<Qualification, ServiceError> {
        let preference = self.prefs.get_alert_setting(&record.user_token).await?;

        let within_window = last_login_within_window(&preference.last_login, run_started);
        if preference.spending_alert_flag && within_window {
            Ok(Qualification::Send)
        } else {
            info!(
                user_token = %record.user_token,
                flag = preference.spending_alert_flag,
                within_window,
                "spending alert not triggered"
            );
            Ok(Qualification::Skip)
        }
    }

    fn payload(&self, record: &Self::Record) -> NotificationRequest {
        let message_th = format!(
            "คุณมีการใช้จ่ายผ่านบัตร {} เมื่อวันที่ {} เวลา {}",
            record.card_no, record.original_date, record.original_time
        );
        let message_en = format!(
            "You have a spending transaction with card {} on {} at {}",
            record.card_no, record.original_date, record.original_time
        );
        NotificationRequest {
            usertoken: record.user_token.clone(),
            topiccode: TOPIC_CODE.into(),
            title_th: TITLE_TH.into(),
            message_th: message_th.clone(),
            title_en: TITLE_EN.into(),
            message_en: message_en.clone(),
            titleinbox_th: TITLE_TH.into(),
            messageinbox_th: message_th,
            titleinbox_en: TITLE_EN.into(),
            messageinbox_en: message_en,
        }
    }
}

/// True when `last_login` is present, parseable, and at most 90 days before
/// `now`. An unparseable value counts as absent.
fn last_login_within_window(last_login: &str, now: NaiveDateTime) -> bool {
    if last_login.is_empty() {
        return false;
    }
    match NaiveDateTime::parse_from_str(last_login, LAST_LOGIN_FORMAT) {
        Ok(parsed) => now - parsed <= Duration::days(LAST_LOGIN_WINDOW_DAYS),
        Err(err) => {
            warn!(last_login, error = %err, "failed to parse last login time");
            false
        }
    }
}
