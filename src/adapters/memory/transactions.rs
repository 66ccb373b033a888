//! In-memory transaction repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, TransactionId, UserId};
use crate::domain::ledger::{
    NewTransaction, RevenuePeriod, RevenueStats, SortOrder, StatusExtras, Transaction,
    TransactionPage, TransactionQuery, TransactionStatus, TransactionType,
};
use crate::ports::TransactionRepository;

/// Transaction store backed by a `HashMap`, for tests and local runs.
///
/// `set_failing(true)` makes every call return a database error, to exercise
/// retry paths.
pub struct InMemoryTransactionRepository {
    rows: RwLock<HashMap<TransactionId, Transaction>>,
    next_id: AtomicI64,
    failing: AtomicBool,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Ids are assigned sequentially from `first_id`.
    pub fn starting_at(first_id: i64) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(first_id),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Overwrites timestamps on a row, for retention and reporting tests.
    pub async fn backdate(&self, id: TransactionId, at: Timestamp) {
        if let Some(row) = self.rows.write().await.get_mut(&id) {
            row.created_at = at;
            row.updated_at = at;
        }
    }

    fn check(&self) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(DomainError::database("simulated storage outage"))
        } else {
            Ok(())
        }
    }
}

fn reference_taken(
    rows: &HashMap<TransactionId, Transaction>,
    id: TransactionId,
    provider_ref: &str,
) -> bool {
    rows.values()
        .any(|row| row.id != id && row.provider_ref.as_deref() == Some(provider_ref))
}

fn duplicate_reference(provider_ref: &str) -> DomainError {
    DomainError::new(
        ErrorCode::DuplicateProviderReference,
        format!("Provider reference {} already recorded", provider_ref),
    )
}

impl Default for InMemoryTransactionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn insert(&self, transaction: NewTransaction) -> Result<TransactionId, DomainError> {
        self.check()?;
        let mut rows = self.rows.write().await;

        if let Some(provider_ref) = transaction.provider_ref.as_deref() {
            if let Some(existing) = rows
                .values()
                .find(|row| row.provider_ref.as_deref() == Some(provider_ref))
            {
                return Ok(existing.id);
            }
        }

        let id = TransactionId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        rows.insert(id, transaction.into_transaction(id, Timestamp::now()));
        Ok(id)
    }

    async fn transition(
        &self,
        id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
        extras: &StatusExtras,
    ) -> Result<bool, DomainError> {
        self.check()?;
        let mut rows = self.rows.write().await;

        // Same order as the conditional UPDATE: a row not in `from` is a no-op.
        if rows.get(&id).map(|row| row.status) != Some(from) {
            return Ok(false);
        }
        if let Some(new_ref) = extras.provider_ref.as_deref() {
            if reference_taken(&rows, id, new_ref) {
                return Err(duplicate_reference(new_ref));
            }
        }

        let Some(row) = rows.get_mut(&id) else {
            return Ok(false);
        };
        row.status = to;
        extras.apply_to(row);
        row.updated_at = Timestamp::now();
        Ok(true)
    }

    async fn attach_provider_ref(
        &self,
        id: TransactionId,
        provider_ref: &str,
    ) -> Result<bool, DomainError> {
        self.check()?;
        let mut rows = self.rows.write().await;

        let Some(row) = rows.get(&id) else {
            return Ok(false);
        };
        if row.status != TransactionStatus::Pending {
            return Ok(false);
        }
        if reference_taken(&rows, id, provider_ref) {
            return Err(duplicate_reference(provider_ref));
        }

        if let Some(row) = rows.get_mut(&id) {
            row.provider_ref = Some(provider_ref.to_string());
            row.updated_at = Timestamp::now();
        }
        Ok(true)
    }

    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, DomainError> {
        self.check()?;
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_by_provider_ref(
        &self,
        provider_ref: &str,
    ) -> Result<Option<Transaction>, DomainError> {
        self.check()?;
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|row| row.provider_ref.as_deref() == Some(provider_ref))
            .cloned())
    }

    async fn list_by_user(
        &self,
        user_id: UserId,
        query: &TransactionQuery,
    ) -> Result<TransactionPage, DomainError> {
        self.check()?;
        let rows = self.rows.read().await;

        let mut matching: Vec<Transaction> = rows
            .values()
            .filter(|row| row.buyer_id == user_id && query.matches(row))
            .cloned()
            .collect();
        matching.sort_by_key(|row| (row.created_at, row.id));
        if query.order == SortOrder::NewestFirst {
            matching.reverse();
        }

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();

        Ok(TransactionPage {
            items,
            total,
            limit: query.limit,
            offset: query.offset,
        })
    }

    async fn revenue_stats(
        &self,
        period: RevenuePeriod,
        transaction_type: Option<TransactionType>,
        now: Timestamp,
    ) -> Result<RevenueStats, DomainError> {
        self.check()?;
        let rows = self.rows.read().await;

        let in_window = rows.values().filter(|row| {
            period.contains(&row.created_at, now)
                && transaction_type.map_or(true, |t| t == row.transaction_type)
        });

        Ok(RevenueStats::aggregate(period, in_window))
    }

    async fn purge_settled_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        self.check()?;
        let mut rows = self.rows.write().await;
        let before = rows.len();

        rows.retain(|_, row| {
            let settled = matches!(
                row.status,
                TransactionStatus::Failed | TransactionStatus::Refunded
            );
            !(settled && row.updated_at.is_before(&cutoff))
        });

        Ok((before - rows.len()) as u64)
    }
}
