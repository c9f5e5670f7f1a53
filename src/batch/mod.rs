//! Batch kinds and the pipeline engine that runs them.
use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::api::model::NotificationRequest;
use crate::api::ServiceError;
use crate::codec::RecordSchema;

pub mod encb;
pub mod runner;
pub mod spending_alert;

/// Outcome of a qualification rule for one decoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Qualification {
    Send,
    Skip,
}

/// One batch kind's record shape and per-record behavior. The runner owns
/// listing, staging, decoding, dispatch, result materialization, and cleanup;
/// a new batch kind implements this trait and touches nothing else.
#[async_trait]
pub trait BatchJob: Send + Sync {
    type Record: Send + Sync;

    /// Batch kind name, used in logs and as the pipeline label.
    fn name(&self) -> &'static str;

    /// Fixed-width layout of one source line.
    fn schema(&self) -> &RecordSchema;

    /// Build the typed record from decoded field values, in schema order.
    fn record(&self, values: Vec<String>) -> Self::Record;

    /// Projection of the record for its run-result line.
    fn fields(&self, record: &Self::Record) -> Vec<String>;

    /// Decide whether the record produces a dispatch. `run_started` is the
    /// run's start instant in local time.
    async fn qualify(
        &self,
        record: &Self::Record,
        run_started: NaiveDateTime,
    ) -> Result<Qualification, ServiceError>;

    /// Notification payload for a qualifying record.
    fn payload(&self, record: &Self::Record) -> NotificationRequest;
}
