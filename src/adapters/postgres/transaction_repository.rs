//! PostgreSQL implementation of TransactionRepository.
//!
//! Status changes are single conditional UPDATEs (`WHERE status = $from`), so
//! concurrent webhook deliveries race on the row, not in the process.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::foundation::{
    DomainError, ErrorCode, ListingId, Timestamp, TransactionId, UserId,
};
use crate::domain::ledger::{
    Currency, DailyRevenue, Metadata, NewTransaction, RevenuePeriod, RevenueStats, SortOrder,
    StatusExtras, Transaction, TransactionError, TransactionPage, TransactionQuery,
    TransactionStatus, TransactionType, TypeRevenue,
};
use crate::ports::TransactionRepository;

use super::db_error;

const PROVIDER_REF_CONSTRAINT: &str = "transactions_provider_ref_key";

const SELECT_COLUMNS: &str = r#"
    SELECT id, user_id, listing_id, amount, currency, transaction_type,
           provider_ref, status, metadata, created_at, updated_at
    FROM transactions
"#;

pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    user_id: i64,
    listing_id: Option<i64>,
    amount: Decimal,
    currency: String,
    transaction_type: String,
    provider_ref: Option<String>,
    status: String,
    metadata: Json<Metadata>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = |field: &str, e: TransactionError| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid {} on transaction {}: {}", field, id, e),
            )
        };

        Ok(Transaction {
            id: TransactionId::new(id),
            buyer_id: UserId::new(row.user_id),
            listing_id: row.listing_id.map(ListingId::new),
            amount: row.amount,
            currency: Currency::new(&row.currency).map_err(|e| corrupt("currency", e))?,
            transaction_type: row
                .transaction_type
                .parse()
                .map_err(|e| corrupt("transaction_type", e))?,
            provider_ref: row.provider_ref,
            status: row.status.parse().map_err(|e| corrupt("status", e))?,
            metadata: row.metadata.0,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TypeBucketRow {
    transaction_type: String,
    total: Decimal,
    count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct DayBucketRow {
    day: NaiveDate,
    total: Decimal,
    count: i64,
}

fn duplicate_ref(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.constraint() == Some(PROVIDER_REF_CONSTRAINT))
}

fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn insert(&self, transaction: NewTransaction) -> Result<TransactionId, DomainError> {
        let now = Timestamp::now();

        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (
                user_id, listing_id, amount, currency, transaction_type,
                provider_ref, status, metadata, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            ON CONFLICT (provider_ref) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(transaction.buyer_id.value())
        .bind(transaction.listing_id.map(|id| id.value()))
        .bind(transaction.amount)
        .bind(transaction.currency.as_str())
        .bind(transaction.transaction_type.as_str())
        .bind(&transaction.provider_ref)
        .bind(transaction.status.as_str())
        .bind(Json(&transaction.metadata))
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("insert transaction", e))?;

        if let Some(id) = inserted {
            return Ok(TransactionId::new(id));
        }

        // Conflict: the provider reference is already recorded.
        let provider_ref = transaction.provider_ref.as_deref().unwrap_or_default();
        let existing: i64 =
            sqlx::query_scalar("SELECT id FROM transactions WHERE provider_ref = $1")
                .bind(provider_ref)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("load existing transaction", e))?;

        Ok(TransactionId::new(existing))
    }

    async fn transition(
        &self,
        id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
        extras: &StatusExtras,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE transactions SET
                status = $3,
                provider_ref = COALESCE($4, provider_ref),
                metadata = metadata || $5,
                updated_at = $6
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id.value())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(&extras.provider_ref)
        .bind(Json(&extras.metadata))
        .bind(Timestamp::now().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if duplicate_ref(&e) {
                return DomainError::new(
                    ErrorCode::DuplicateProviderReference,
                    "Provider reference already recorded on another transaction",
                );
            }
            db_error("update transaction status", e)
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn attach_provider_ref(
        &self,
        id: TransactionId,
        provider_ref: &str,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE transactions SET provider_ref = $2, updated_at = $3
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id.value())
        .bind(provider_ref)
        .bind(Timestamp::now().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if duplicate_ref(&e) {
                return DomainError::new(
                    ErrorCode::DuplicateProviderReference,
                    format!("Provider reference {} already recorded", provider_ref),
                );
            }
            db_error("attach provider reference", e)
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, DomainError> {
        let row: Option<TransactionRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
                .bind(id.value())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find transaction", e))?;

        row.map(Transaction::try_from).transpose()
    }

    async fn find_by_provider_ref(
        &self,
        provider_ref: &str,
    ) -> Result<Option<Transaction>, DomainError> {
        let row: Option<TransactionRow> =
            sqlx::query_as(&format!("{} WHERE provider_ref = $1", SELECT_COLUMNS))
                .bind(provider_ref)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find transaction by provider reference", e))?;

        row.map(Transaction::try_from).transpose()
    }

    async fn list_by_user(
        &self,
        user_id: UserId,
        query: &TransactionQuery,
    ) -> Result<TransactionPage, DomainError> {
        const FILTER: &str = r#"
            WHERE user_id = $1
              AND ($2::text IS NULL OR transaction_type = $2)
              AND ($3::text IS NULL OR status = $3)
        "#;
        let order = match query.order {
            SortOrder::NewestFirst => "ORDER BY created_at DESC, id DESC",
            SortOrder::OldestFirst => "ORDER BY created_at ASC, id ASC",
        };
        let transaction_type = query.transaction_type.map(|t| t.as_str());
        let status = query.status.map(|s| s.as_str());

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM transactions {}", FILTER))
                .bind(user_id.value())
                .bind(transaction_type)
                .bind(status)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("count transactions", e))?;

        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "{} {} {} LIMIT $4 OFFSET $5",
            SELECT_COLUMNS, FILTER, order
        ))
        .bind(user_id.value())
        .bind(transaction_type)
        .bind(status)
        .bind(i64::from(query.limit))
        .bind(i64::from(query.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list transactions", e))?;

        Ok(TransactionPage {
            items: rows
                .into_iter()
                .map(Transaction::try_from)
                .collect::<Result<_, _>>()?,
            total: count(total),
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
        const WINDOW: &str = r#"
            WHERE status = 'completed'
              AND ($1::timestamptz IS NULL OR created_at >= $1)
              AND ($2::text IS NULL OR transaction_type = $2)
        "#;
        let start = period.window_start(now).map(|t| *t.as_datetime());
        let type_filter = transaction_type.map(|t| t.as_str());

        let type_rows: Vec<TypeBucketRow> = sqlx::query_as(&format!(
            r#"
            SELECT transaction_type, SUM(amount) AS total, COUNT(*) AS count
            FROM transactions {}
            GROUP BY transaction_type
            ORDER BY transaction_type
            "#,
            WINDOW
        ))
        .bind(start)
        .bind(type_filter)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("aggregate revenue by type", e))?;

        let day_rows: Vec<DayBucketRow> = sqlx::query_as(&format!(
            r#"
            SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
                   SUM(amount) AS total, COUNT(*) AS count
            FROM transactions {}
            GROUP BY day
            ORDER BY day
            "#,
            WINDOW
        ))
        .bind(start)
        .bind(type_filter)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("aggregate revenue by day", e))?;

        let by_type = type_rows
            .into_iter()
            .map(|row| {
                let transaction_type: TransactionType =
                    row.transaction_type.parse().map_err(|e: TransactionError| {
                        DomainError::new(ErrorCode::DatabaseError, e.to_string())
                    })?;
                Ok(TypeRevenue {
                    transaction_type,
                    total: row.total,
                    count: count(row.count),
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        let by_day = day_rows
            .into_iter()
            .map(|row| DailyRevenue {
                date: row.day,
                total: row.total,
                count: count(row.count),
            })
            .collect();

        Ok(RevenueStats::from_buckets(period, by_type, by_day))
    }

    async fn purge_settled_before(&self, cutoff: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            DELETE FROM transactions
            WHERE status IN ('failed', 'refunded') AND updated_at < $1
            "#,
        )
        .bind(cutoff.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("purge settled transactions", e))?;

        Ok(result.rows_affected())
    }
}
