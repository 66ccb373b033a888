//! PostgreSQL listing and user directories.
//!
//! Both read tables owned by the marketplace; the only write is the
//! featured-until column on listings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ListingId, Timestamp, UserId};
use crate::domain::listing::{ContactDetails, ListingRef, UserRef};
use crate::ports::{ListingDirectory, UserDirectory};

use super::db_error;

pub struct PostgresListingDirectory {
    pool: PgPool,
    auto_approve: bool,
}

impl PostgresListingDirectory {
    /// With `auto_approve`, listings still awaiting moderation are visible too.
    pub fn new(pool: PgPool, auto_approve: bool) -> Self {
        Self { pool, auto_approve }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    id: i64,
    user_id: i64,
    contact_email: Option<String>,
    contact_phone: Option<String>,
    featured_until: Option<DateTime<Utc>>,
}

impl From<ListingRow> for ListingRef {
    fn from(row: ListingRow) -> Self {
        ListingRef {
            id: ListingId::new(row.id),
            owner_id: UserId::new(row.user_id),
            contact: ContactDetails {
                email: row.contact_email,
                phone: row.contact_phone,
            },
            featured_until: row.featured_until.map(Timestamp::from_datetime),
        }
    }
}

#[async_trait]
impl ListingDirectory for PostgresListingDirectory {
    async fn find_listing(&self, id: ListingId) -> Result<Option<ListingRef>, DomainError> {
        let row: Option<ListingRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, contact_email, contact_phone, featured_until
            FROM listings
            WHERE id = $1
              AND (status = 'active' OR ($2 AND status = 'pending'))
            "#,
        )
        .bind(id.value())
        .bind(self.auto_approve)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find listing", e))?;

        Ok(row.map(ListingRef::from))
    }

    async fn extend_featured_until(
        &self,
        id: ListingId,
        until: Timestamp,
    ) -> Result<bool, DomainError> {
        // GREATEST ignores NULL, so an unfeatured listing takes `until`.
        let result = sqlx::query(
            "UPDATE listings SET featured_until = GREATEST(featured_until, $2) WHERE id = $1",
        )
        .bind(id.value())
        .bind(until.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("extend featured listing", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_featured(&self, id: ListingId) -> Result<bool, DomainError> {
        let result = sqlx::query("UPDATE listings SET featured_until = NULL WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("clear featured listing", e))?;

        Ok(result.rows_affected() > 0)
    }
}

pub struct PostgresUserDirectory {
    pool: PgPool,
    admin_ids: Vec<UserId>,
}

impl PostgresUserDirectory {
    /// `admin_ids` are treated as admins in addition to the `is_admin` column.
    pub fn new(pool: PgPool, admin_ids: Vec<UserId>) -> Self {
        Self { pool, admin_ids }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_user(&self, id: UserId) -> Result<Option<UserRef>, DomainError> {
        let is_admin: Option<bool> = sqlx::query_scalar("SELECT is_admin FROM users WHERE id = $1")
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find user", e))?;

        Ok(is_admin.map(|flag| UserRef {
            id,
            is_admin: flag || self.admin_ids.contains(&id),
        }))
    }
}
