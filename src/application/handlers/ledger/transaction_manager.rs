//! TransactionManager - records payment attempts and moves them through their lifecycle.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::application::EventNotifier;
use crate::domain::foundation::{ListingId, Timestamp, TransactionId, UserId};
use crate::domain::ledger::{
    Currency, LedgerEvent, Metadata, NewTransaction, RevenuePeriod, RevenueStats, StatusExtras,
    Transaction, TransactionError, TransactionPage, TransactionQuery, TransactionStatus,
    TransactionType,
};
use crate::ports::{LedgerEventPublisher, TransactionRepository};

/// Untyped payment record, as received from callers outside the ledger.
#[derive(Debug, Clone)]
pub struct LogPaymentCommand {
    pub buyer_id: UserId,
    pub listing_id: Option<ListingId>,
    pub amount: Decimal,
    pub currency: String,
    pub transaction_type: String,
    pub provider_ref: Option<String>,
    pub status: TransactionStatus,
    pub metadata: Metadata,
}

impl LogPaymentCommand {
    /// A pending payment with no listing, reference or metadata.
    pub fn new(
        buyer_id: UserId,
        amount: Decimal,
        currency: impl Into<String>,
        transaction_type: impl Into<String>,
    ) -> Self {
        Self {
            buyer_id,
            listing_id: None,
            amount,
            currency: currency.into(),
            transaction_type: transaction_type.into(),
            provider_ref: None,
            status: TransactionStatus::Pending,
            metadata: Metadata::new(),
        }
    }
}

pub struct TransactionManager {
    transactions: Arc<dyn TransactionRepository>,
    notifier: EventNotifier,
}

impl TransactionManager {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        publisher: Arc<dyn LedgerEventPublisher>,
    ) -> Self {
        Self {
            transactions,
            notifier: EventNotifier::new(publisher),
        }
    }

    /// Validates and records a payment attempt.
    ///
    /// The type must be one of the known products; the amount is rounded to
    /// two decimal places and the currency upper-cased.
    pub async fn log_payment(
        &self,
        cmd: LogPaymentCommand,
    ) -> Result<TransactionId, TransactionError> {
        let transaction_type: TransactionType = cmd.transaction_type.parse()?;
        let currency = Currency::new(&cmd.currency)?;

        let mut transaction =
            NewTransaction::new(cmd.buyer_id, cmd.amount, currency, transaction_type)?
                .with_status(cmd.status)
                .with_metadata(cmd.metadata);
        if let Some(listing_id) = cmd.listing_id {
            transaction = transaction.with_listing(listing_id);
        }
        if let Some(provider_ref) = cmd.provider_ref {
            transaction = transaction.with_provider_ref(provider_ref);
        }

        self.record(transaction).await
    }

    /// Records an already-validated transaction.
    ///
    /// A known provider reference yields the existing row's id.
    pub async fn record(
        &self,
        transaction: NewTransaction,
    ) -> Result<TransactionId, TransactionError> {
        let status = transaction.status;
        let id = self.transactions.insert(transaction).await?;

        tracing::info!(
            transaction_id = %id,
            status = status.as_str(),
            "transaction recorded"
        );

        if status == TransactionStatus::Completed {
            self.notify_status(id, status).await;
        }

        Ok(id)
    }

    /// Applies a forward transition.
    ///
    /// Only `pending -> completed`, `pending -> failed` and
    /// `completed -> refunded` exist. Anything else, including a row that has
    /// already moved on, is a no-op returning `false`.
    pub async fn update_status(
        &self,
        id: TransactionId,
        status: TransactionStatus,
        extras: StatusExtras,
    ) -> Result<bool, TransactionError> {
        let Some(from) = TransactionStatus::predecessor_of(status) else {
            tracing::debug!(
                transaction_id = %id,
                status = status.as_str(),
                "no transition leads here"
            );
            return Ok(false);
        };

        let applied = self.transactions.transition(id, from, status, &extras).await?;

        if applied {
            tracing::info!(
                transaction_id = %id,
                from = from.as_str(),
                to = status.as_str(),
                provider_ref = ?extras.provider_ref,
                "transaction status updated"
            );
            self.notify_status(id, status).await;
        } else {
            tracing::debug!(
                transaction_id = %id,
                to = status.as_str(),
                "transition skipped, row not in expected status"
            );
        }

        Ok(applied)
    }

    /// Stores the provider reference while the row is still pending.
    pub async fn attach_provider_ref(
        &self,
        id: TransactionId,
        provider_ref: &str,
    ) -> Result<bool, TransactionError> {
        Ok(self.transactions.attach_provider_ref(id, provider_ref).await?)
    }

    pub async fn find_by_id(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, TransactionError> {
        Ok(self.transactions.find_by_id(id).await?)
    }

    pub async fn get(&self, id: TransactionId) -> Result<Transaction, TransactionError> {
        self.find_by_id(id)
            .await?
            .ok_or(TransactionError::NotFound(id))
    }

    pub async fn find_by_provider_ref(
        &self,
        provider_ref: &str,
    ) -> Result<Option<Transaction>, TransactionError> {
        Ok(self.transactions.find_by_provider_ref(provider_ref).await?)
    }

    pub async fn list_for_user(
        &self,
        user_id: UserId,
        query: &TransactionQuery,
    ) -> Result<TransactionPage, TransactionError> {
        Ok(self.transactions.list_by_user(user_id, query).await?)
    }

    pub async fn revenue_stats(
        &self,
        period: RevenuePeriod,
        transaction_type: Option<TransactionType>,
    ) -> Result<RevenueStats, TransactionError> {
        Ok(self
            .transactions
            .revenue_stats(period, transaction_type, Timestamp::now())
            .await?)
    }

    /// Deletes failed and refunded rows last touched more than `retention_days` ago.
    pub async fn purge_settled(&self, retention_days: i64) -> Result<u64, TransactionError> {
        let cutoff = Timestamp::now().minus_days(retention_days);
        let purged = self.transactions.purge_settled_before(cutoff).await?;
        if purged > 0 {
            tracing::info!(purged, retention_days, "settled transactions purged");
        }
        Ok(purged)
    }

    async fn notify_status(&self, id: TransactionId, status: TransactionStatus) {
        let transaction = match self.transactions.find_by_id(id).await {
            Ok(Some(transaction)) => transaction,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(
                    transaction_id = %id,
                    error = %e,
                    "could not load transaction for notification"
                );
                return;
            }
        };

        let event = match status {
            TransactionStatus::Completed => LedgerEvent::TransactionCompleted {
                transaction_id: id,
                buyer_id: transaction.buyer_id,
                listing_id: transaction.listing_id,
                amount: transaction.amount,
                currency: transaction.currency,
            },
            TransactionStatus::Refunded => LedgerEvent::TransactionRefunded {
                transaction_id: id,
                buyer_id: transaction.buyer_id,
                listing_id: transaction.listing_id,
            },
            TransactionStatus::Pending | TransactionStatus::Failed => return,
        };

        self.notifier.notify(event).await;
    }
}
