//! In-memory processed-webhook journal.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{SaveResult, WebhookEventRecord, WebhookEventRepository};

#[derive(Default)]
pub struct InMemoryWebhookEventRepository {
    records: RwLock<HashMap<String, WebhookEventRecord>>,
}

impl InMemoryWebhookEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl WebhookEventRepository for InMemoryWebhookEventRepository {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventRecord>, DomainError> {
        Ok(self.records.read().await.get(event_id).cloned())
    }

    async fn save(&self, record: WebhookEventRecord) -> Result<SaveResult, DomainError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.event_id) {
            Ok(SaveResult::AlreadyExists)
        } else {
            records.insert(record.event_id.clone(), record);
            Ok(SaveResult::Inserted)
        }
    }

    async fn delete_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| !r.processed_at.is_before(&cutoff));
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> WebhookEventRecord {
        WebhookEventRecord::applied(id, "charge.refunded", serde_json::json!({}))
    }

    #[tokio::test]
    async fn save_is_insert_or_ignore() {
        let repo = InMemoryWebhookEventRepository::new();

        assert_eq!(repo.save(record("evt_1")).await.unwrap(), SaveResult::Inserted);
        assert_eq!(repo.save(record("evt_1")).await.unwrap(), SaveResult::AlreadyExists);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn delete_before_purges_old_records() {
        let repo = InMemoryWebhookEventRepository::new();
        let mut old = record("evt_old");
        old.processed_at = Timestamp::now().minus_days(40);
        repo.save(old).await.unwrap();
        repo.save(record("evt_new")).await.unwrap();

        let deleted = repo
            .delete_before(Timestamp::now().minus_days(30))
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        assert!(repo.find_by_event_id("evt_new").await.unwrap().is_some());
    }
}
