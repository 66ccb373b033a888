//! Background sweeper for expired grants and aged-out records.
//!
//! Each pass:
//!
//! 1. deletes access grants whose expiry has passed
//! 2. purges failed and refunded transactions beyond the retention window
//! 3. purges processed webhook journal entries beyond their window
//!
//! A failing step is logged and the remaining steps still run. Passes never
//! overlap within one process; concurrent passes from separate processes are
//! safe because every step is a plain conditional delete.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::config::SweepConfig;
use crate::domain::foundation::Timestamp;
use crate::ports::WebhookEventRepository;

use super::handlers::access::AccessGrantManager;
use super::handlers::ledger::TransactionManager;

/// Row counts removed by one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired_grants: u64,
    pub purged_transactions: u64,
    pub purged_webhook_events: u64,
}

pub struct GrantExpirySweeper {
    access: Arc<AccessGrantManager>,
    transactions: Arc<TransactionManager>,
    journal: Arc<dyn WebhookEventRepository>,
    interval: Duration,
    transaction_retention_days: i64,
    webhook_event_retention_days: i64,
}

impl GrantExpirySweeper {
    pub fn new(
        access: Arc<AccessGrantManager>,
        transactions: Arc<TransactionManager>,
        journal: Arc<dyn WebhookEventRepository>,
        config: &SweepConfig,
    ) -> Self {
        Self {
            access,
            transactions,
            journal,
            interval: config.interval(),
            transaction_retention_days: config.transaction_retention_days,
            webhook_event_retention_days: config.webhook_event_retention_days,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs a single pass.
    pub async fn run_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        match self.access.sweep_expired().await {
            Ok(removed) => report.expired_grants = removed,
            Err(e) => tracing::error!(error = %e, "expired grant sweep failed"),
        }

        match self
            .transactions
            .purge_settled(self.transaction_retention_days)
            .await
        {
            Ok(purged) => report.purged_transactions = purged,
            Err(e) => tracing::error!(error = %e, "transaction retention sweep failed"),
        }

        let cutoff = Timestamp::now().minus_days(self.webhook_event_retention_days);
        match self.journal.delete_before(cutoff).await {
            Ok(purged) => report.purged_webhook_events = purged,
            Err(e) => tracing::error!(error = %e, "webhook journal sweep failed"),
        }

        tracing::debug!(
            expired_grants = report.expired_grants,
            purged_transactions = report.purged_transactions,
            purged_webhook_events = report.purged_webhook_events,
            "sweep finished"
        );

        report
    }

    /// Sweeps on every tick until `shutdown` flips to true.
    ///
    /// The first pass runs immediately.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval_secs = self.interval.as_secs(), "grant expiry sweeper started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("grant expiry sweeper stopping");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.run_once().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventPublisher;
    use crate::adapters::memory::{
        InMemoryAccessGrantRepository, InMemoryListingDirectory, InMemoryTransactionRepository,
        InMemoryUserDirectory, InMemoryWebhookEventRepository,
    };
    use crate::domain::access::GrantOptions;
    use crate::domain::foundation::{ListingId, UserId};
    use crate::domain::ledger::{Currency, NewTransaction, TransactionStatus, TransactionType};
    use crate::ports::WebhookEventRecord;
    use rust_decimal_macros::dec;

    const OWNER: UserId = UserId::new(1);
    const BUYER: UserId = UserId::new(42);
    const LISTING: ListingId = ListingId::new(7);

    struct Fixture {
        sweeper: GrantExpirySweeper,
        access: Arc<AccessGrantManager>,
        transactions: Arc<TransactionManager>,
        transaction_repo: Arc<InMemoryTransactionRepository>,
        grant_repo: Arc<InMemoryAccessGrantRepository>,
        journal: Arc<InMemoryWebhookEventRepository>,
    }

    async fn fixture() -> Fixture {
        let listings = Arc::new(InMemoryListingDirectory::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let publisher = Arc::new(InMemoryEventPublisher::new());
        listings.add_listing(LISTING, OWNER).await;
        listings.add_listing(ListingId::new(8), OWNER).await;
        users.add_user(BUYER).await;

        let grant_repo = Arc::new(InMemoryAccessGrantRepository::new());
        let transaction_repo = Arc::new(InMemoryTransactionRepository::new());
        let journal = Arc::new(InMemoryWebhookEventRepository::new());
        let access = Arc::new(AccessGrantManager::new(
            grant_repo.clone(),
            listings,
            users,
            publisher.clone(),
        ));
        let transactions = Arc::new(TransactionManager::new(transaction_repo.clone(), publisher));

        Fixture {
            sweeper: GrantExpirySweeper::new(
                access.clone(),
                transactions.clone(),
                journal.clone(),
                &SweepConfig::default(),
            ),
            access,
            transactions,
            transaction_repo,
            grant_repo,
            journal,
        }
    }

    fn reveal(status: TransactionStatus) -> NewTransaction {
        NewTransaction::new(
            BUYER,
            dec!(5),
            Currency::new("USD").unwrap(),
            TransactionType::ContactReveal,
        )
        .unwrap()
        .with_status(status)
    }

    fn aged_record(event_id: &str, days: i64) -> WebhookEventRecord {
        let mut record =
            WebhookEventRecord::applied(event_id, "charge.refunded", serde_json::Value::Null);
        record.processed_at = Timestamp::now().minus_days(days);
        record
    }

    #[tokio::test]
    async fn run_once_removes_only_aged_out_rows() {
        let f = fixture().await;

        // A grant that expires a moment from now, plus a permanent one.
        f.access
            .grant_access(
                BUYER,
                LISTING,
                GrantOptions::default().expiring_at(Timestamp::now().plus_secs(1)),
            )
            .await
            .unwrap();
        f.access
            .grant_access(BUYER, ListingId::new(8), GrantOptions::default())
            .await
            .unwrap();

        let old_failed = f.transactions.record(reveal(TransactionStatus::Failed)).await.unwrap();
        f.transaction_repo
            .backdate(old_failed, Timestamp::now().minus_days(400))
            .await;
        f.transactions
            .record(reveal(TransactionStatus::Completed))
            .await
            .unwrap();

        f.journal.save(aged_record("evt_old", 45)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let report = f.sweeper.run_once().await;

        assert_eq!(
            report,
            SweepReport {
                expired_grants: 1,
                purged_transactions: 1,
                purged_webhook_events: 1,
            }
        );
        assert_eq!(f.grant_repo.len().await, 1);
        assert_eq!(f.transaction_repo.len().await, 1);
        assert!(f.journal.is_empty().await);
    }

    #[tokio::test]
    async fn failing_step_does_not_stop_the_others() {
        let f = fixture().await;
        f.grant_repo.set_failing(true);
        f.journal.save(aged_record("evt_old", 45)).await.unwrap();

        let report = f.sweeper.run_once().await;

        assert_eq!(report.expired_grants, 0);
        assert_eq!(report.purged_webhook_events, 1);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let f = fixture().await;
        let sweeper = f.sweeper.with_interval(Duration::from_millis(10));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { sweeper.run(shutdown_rx).await });
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper did not stop")
            .unwrap();
    }
}
