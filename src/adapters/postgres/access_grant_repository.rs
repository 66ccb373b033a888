//! PostgreSQL implementation of AccessGrantRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::access::{AccessGrant, AccessType, GrantOutcome, NewAccessGrant};
use crate::domain::foundation::{
    DomainError, ErrorCode, GrantId, ListingId, Timestamp, TransactionId, UserId,
};
use crate::ports::AccessGrantRepository;

use super::db_error;

const SELECT_COLUMNS: &str = r#"
    SELECT id, buyer_id, listing_id, transaction_id, access_type, granted_at, expires_at
    FROM access_grants
"#;

pub struct PostgresAccessGrantRepository {
    pool: PgPool,
}

impl PostgresAccessGrantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GrantRow {
    id: i64,
    buyer_id: i64,
    listing_id: i64,
    transaction_id: Option<i64>,
    access_type: String,
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<GrantRow> for AccessGrant {
    type Error = DomainError;

    fn try_from(row: GrantRow) -> Result<Self, Self::Error> {
        let access_type: AccessType = row.access_type.parse().map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid access_type on grant {}: {}", row.id, e),
            )
        })?;

        Ok(AccessGrant {
            id: GrantId::new(row.id),
            buyer_id: UserId::new(row.buyer_id),
            listing_id: ListingId::new(row.listing_id),
            transaction_id: row.transaction_id.map(TransactionId::new),
            access_type,
            granted_at: Timestamp::from_datetime(row.granted_at),
            expires_at: row.expires_at.map(Timestamp::from_datetime),
        })
    }
}

fn into_grants(rows: Vec<GrantRow>) -> Result<Vec<AccessGrant>, DomainError> {
    rows.into_iter().map(AccessGrant::try_from).collect()
}

#[async_trait]
impl AccessGrantRepository for PostgresAccessGrantRepository {
    async fn insert_if_absent(&self, grant: NewAccessGrant) -> Result<GrantOutcome, DomainError> {
        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO access_grants (
                buyer_id, listing_id, transaction_id, access_type, granted_at, expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (buyer_id, listing_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(grant.buyer_id.value())
        .bind(grant.listing_id.value())
        .bind(grant.transaction_id.map(|id| id.value()))
        .bind(grant.access_type.as_str())
        .bind(grant.granted_at.as_datetime())
        .bind(grant.expires_at.map(|t| *t.as_datetime()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("insert access grant", e))?;

        if let Some(id) = inserted {
            return Ok(GrantOutcome::Created(GrantId::new(id)));
        }

        let existing: i64 = sqlx::query_scalar(
            "SELECT id FROM access_grants WHERE buyer_id = $1 AND listing_id = $2",
        )
        .bind(grant.buyer_id.value())
        .bind(grant.listing_id.value())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("load existing access grant", e))?;

        Ok(GrantOutcome::Existing(GrantId::new(existing)))
    }

    async fn find(
        &self,
        buyer_id: UserId,
        listing_id: ListingId,
    ) -> Result<Option<AccessGrant>, DomainError> {
        let row: Option<GrantRow> = sqlx::query_as(&format!(
            "{} WHERE buyer_id = $1 AND listing_id = $2",
            SELECT_COLUMNS
        ))
        .bind(buyer_id.value())
        .bind(listing_id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find access grant", e))?;

        row.map(AccessGrant::try_from).transpose()
    }

    async fn find_by_id(&self, id: GrantId) -> Result<Option<AccessGrant>, DomainError> {
        let row: Option<GrantRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find access grant", e))?;

        row.map(AccessGrant::try_from).transpose()
    }

    async fn delete(&self, buyer_id: UserId, listing_id: ListingId) -> Result<bool, DomainError> {
        let result =
            sqlx::query("DELETE FROM access_grants WHERE buyer_id = $1 AND listing_id = $2")
                .bind(buyer_id.value())
                .bind(listing_id.value())
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("delete access grant", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_id(&self, id: GrantId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM access_grants WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete access grant", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_listing(&self, listing_id: ListingId) -> Result<Vec<AccessGrant>, DomainError> {
        let rows: Vec<GrantRow> = sqlx::query_as(&format!(
            "{} WHERE listing_id = $1 ORDER BY granted_at DESC, id DESC",
            SELECT_COLUMNS
        ))
        .bind(listing_id.value())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list access grants", e))?;

        into_grants(rows)
    }

    async fn list_active_by_buyer(
        &self,
        buyer_id: UserId,
        now: Timestamp,
    ) -> Result<Vec<AccessGrant>, DomainError> {
        let rows: Vec<GrantRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE buyer_id = $1 AND (expires_at IS NULL OR expires_at > $2)
            ORDER BY granted_at DESC, id DESC"#,
            SELECT_COLUMNS
        ))
        .bind(buyer_id.value())
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list access grants", e))?;

        into_grants(rows)
    }

    async fn count_by_listing(&self, listing_id: ListingId) -> Result<u64, DomainError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM access_grants WHERE listing_id = $1")
                .bind(listing_id.value())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("count access grants", e))?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn delete_expired(&self, now: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "DELETE FROM access_grants WHERE expires_at IS NOT NULL AND expires_at <= $1",
        )
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("delete expired access grants", e))?;

        Ok(result.rows_affected())
    }
}
