//! e-NCB batch kind: pre-rendered bilingual inbox messages dispatched without
//! any preference lookup.
use async_trait::async_trait;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;

use crate::api::model::NotificationRequest;
use crate::api::ServiceError;
use crate::batch::{BatchJob, Qualification};
use crate::codec::{FieldSpec, RecordSchema};

const TOPIC_CODE: &str = "test";
/// Channel marker carried into the result-line projection.
const CHANNEL: &str = "TH";

static SCHEMA: Lazy<RecordSchema> = Lazy::new(|| {
    RecordSchema::new(
        "e-ncb",
        vec![
            FieldSpec::required("user-token", 0, 36),
            FieldSpec::optional("title-th", 37, 100),
            FieldSpec::optional("message-th", 138, 200),
            FieldSpec::optional("title-en", 339, 100),
            FieldSpec::optional("message-en", 440, 200),
        ],
    )
});

pub fn schema() -> &'static RecordSchema {
    &SCHEMA
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncbRecord {
    pub user_token: String,
    pub title_th: String,
    pub message_th: String,
    pub title_en: String,
    pub message_en: String,
}

#[derive(Debug, Default)]
pub struct EncbJob;

impl EncbJob {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BatchJob for EncbJob {
    type Record = EncbRecord;

    fn name(&self) -> &'static str {
        "e-ncb"
    }

    fn schema(&self) -> &RecordSchema {
        &SCHEMA
    }

    fn record(&self, values: Vec<String>) -> Self::Record {
        let mut values = values.into_iter();
        EncbRecord {
            user_token: values.next().unwrap_or_default(),
            title_th: values.next().unwrap_or_default(),
            message_th: values.next().unwrap_or_default(),
            title_en: values.next().unwrap_or_default(),
            message_en: values.next().unwrap_or_default(),
        }
    }

    fn fields(&self, record: &Self::Record) -> Vec<String> {
        vec![
            record.user_token.clone(),
            record.title_th.clone(),
            record.message_th.clone(),
            CHANNEL.to_string(),
        ]
    }

    async fn qualify(
        &self,
        _record: &Self::Record,
        _run_started: NaiveDateTime,
    ) -> Result<Qualification, ServiceError> {
        Ok(Qualification::Send)
    }

    fn payload(&self, record: &Self::Record) -> NotificationRequest {
        NotificationRequest {
            usertoken: record.user_token.clone(),
            topiccode: TOPIC_CODE.into(),
            title_th: record.title_th.clone(),
            message_th: record.message_th.clone(),
            title_en: record.title_en.clone(),
            message_en: record.message_en.clone(),
            titleinbox_th: record.title_th.clone(),
            messageinbox_th: record.message_th.clone(),
            titleinbox_en: record.title_en.clone(),
            messageinbox_en: record.message_en.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> EncbRecord {
        EncbRecord {
            user_token: "AAAA-BBBB-CCCC-DDDD-EEEE0000FFFF".into(),
            title_th: "แจ้งเตือนเครดิตบูโร".into(),
            message_th: "รายงานเครดิตบูโรของคุณพร้อมแล้ว".into(),
            title_en: "Credit Bureau Notice".into(),
            message_en: "Your credit bureau report is ready".into(),
        }
    }

    #[test]
    fn schema_min_length_matches_token_end() {
        assert_eq!(schema().min_line_len(), 36);
    }

    #[test]
    fn decodes_line_with_thai_content() {
        let record = sample_record();
        let line = schema().encode(&[
            &record.user_token,
            &record.title_th,
            &record.message_th,
            &record.title_en,
            &record.message_en,
        ]);
        let job = EncbJob::new();
        assert_eq!(job.record(schema().decode(&line).unwrap()), record);
    }

    #[tokio::test]
    async fn always_qualifies() {
        let job = EncbJob::new();
        let now = chrono::Local::now().naive_local();
        assert_eq!(
            job.qualify(&sample_record(), now).await.unwrap(),
            Qualification::Send
        );
    }

    #[test]
    fn payload_mirrors_pairs_into_inbox_fields() {
        let job = EncbJob::new();
        let payload = job.payload(&sample_record());
        assert_eq!(payload.topiccode, "test");
        assert_eq!(payload.title_th, payload.titleinbox_th);
        assert_eq!(payload.message_th, payload.messageinbox_th);
        assert_eq!(payload.title_en, payload.titleinbox_en);
        assert_eq!(payload.message_en, payload.messageinbox_en);
        assert!(payload.has_language_pair());
    }

    #[test]
    fn result_projection_carries_channel_marker() {
        let job = EncbJob::new();
        let fields = job.fields(&sample_record());
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[3], "TH");
    }
}
