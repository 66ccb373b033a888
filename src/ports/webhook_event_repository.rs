//! WebhookEventRepository port - journal of processed provider events.
//!
//! Providers deliver the same event more than once (timeouts, 5xx
//! responses, lost acknowledgements). Processing is already idempotent; the
//! journal lets a known re-delivery skip the work and records what happened.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

/// How a journaled event was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingResult {
    /// Ledger state was reconciled.
    Applied,
    /// Acknowledged without a ledger change.
    Ignored,
}

impl ProcessingResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingResult::Applied => "applied",
            ProcessingResult::Ignored => "ignored",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "applied" => ProcessingResult::Applied,
            _ => ProcessingResult::Ignored,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEventRecord {
    /// Provider event id (`evt_...`).
    pub event_id: String,
    pub event_type: String,
    pub processed_at: Timestamp,
    pub result: ProcessingResult,
    /// Why the event was ignored, if it was.
    pub note: Option<String>,
    pub payload: serde_json::Value,
}

impl WebhookEventRecord {
    pub fn applied(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Timestamp::now(),
            result: ProcessingResult::Applied,
            note: None,
            payload,
        }
    }

    pub fn ignored(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        reason: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            processed_at: Timestamp::now(),
            result: ProcessingResult::Ignored,
            note: Some(reason.into()),
            payload,
        }
    }
}

/// Result of attempting to journal an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResult {
    Inserted,
    AlreadyExists,
}

/// Port for the processed-event journal.
///
/// Implementations should key on `event_id` with insert-or-ignore semantics.
/// Failed processing is never journaled, so provider retries still run.
#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError>;

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError>;

    /// Deletes records processed before `cutoff`.
    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}
