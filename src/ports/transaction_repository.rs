//! TransactionRepository port - persistence for the payment ledger.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp, TransactionId, UserId};
use crate::domain::ledger::{
    NewTransaction, RevenuePeriod, RevenueStats, StatusExtras, Transaction, TransactionPage,
    TransactionQuery, TransactionStatus, TransactionType,
};

/// Port for storing transactions.
///
/// Implementations must ensure:
/// - `provider_ref` is unique when present
/// - `transition` is a single conditional write, safe under concurrent callers
/// - completed rows are never deleted
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Inserts a transaction.
    ///
    /// If a row with the same `provider_ref` already exists its id is returned
    /// and nothing is written.
    async fn insert(&self, transaction: NewTransaction) -> Result<TransactionId, DomainError>;

    /// Moves a row from `from` to `to` and applies `extras` in the same write.
    ///
    /// Returns `false` when the row does not exist or is not in `from`.
    async fn transition(
        &self,
        id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
        extras: &StatusExtras,
    ) -> Result<bool, DomainError>;

    /// Records the provider reference on a row that is still pending.
    ///
    /// Returns `false` when the row is missing or has already moved on.
    async fn attach_provider_ref(
        &self,
        id: TransactionId,
        provider_ref: &str,
    ) -> Result<bool, DomainError>;

    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, DomainError>;

    async fn find_by_provider_ref(
        &self,
        provider_ref: &str,
    ) -> Result<Option<Transaction>, DomainError>;

    async fn list_by_user(
        &self,
        user_id: UserId,
        query: &TransactionQuery,
    ) -> Result<TransactionPage, DomainError>;

    /// Aggregates completed transactions created inside the period ending at `now`.
    async fn revenue_stats(
        &self,
        period: RevenuePeriod,
        transaction_type: Option<TransactionType>,
        now: Timestamp,
    ) -> Result<RevenueStats, DomainError>;

    /// Deletes failed and refunded rows last updated before `cutoff`.
    async fn purge_settled_before(&self, cutoff: Timestamp) -> Result<u64, DomainError>;
}
