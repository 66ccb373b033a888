//! Transaction records and the inputs used to create, update and list them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::money::{normalize_amount, Currency};
use super::{TransactionError, TransactionStatus, TransactionType};
use crate::domain::foundation::{ListingId, Timestamp, TransactionId, UserId};

/// Free-form key/value data attached to a transaction.
pub type Metadata = BTreeMap<String, String>;

/// One payment attempt. Completed rows are the permanent financial record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub buyer_id: UserId,
    pub listing_id: Option<ListingId>,
    pub amount: Decimal,
    pub currency: Currency,
    pub transaction_type: TransactionType,
    /// Provider-side reference (checkout session, later the payment intent).
    pub provider_ref: Option<String>,
    pub status: TransactionStatus,
    pub metadata: Metadata,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Transaction {
    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }
}

/// Validated input for inserting a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub buyer_id: UserId,
    pub listing_id: Option<ListingId>,
    pub amount: Decimal,
    pub currency: Currency,
    pub transaction_type: TransactionType,
    pub provider_ref: Option<String>,
    pub status: TransactionStatus,
    pub metadata: Metadata,
}

impl NewTransaction {
    /// Creates a pending transaction with a normalized amount.
    pub fn new(
        buyer_id: UserId,
        amount: Decimal,
        currency: Currency,
        transaction_type: TransactionType,
    ) -> Result<Self, TransactionError> {
        Ok(Self {
            buyer_id,
            listing_id: None,
            amount: normalize_amount(amount)?,
            currency,
            transaction_type,
            provider_ref: None,
            status: TransactionStatus::Pending,
            metadata: Metadata::new(),
        })
    }

    pub fn with_listing(mut self, listing_id: ListingId) -> Self {
        self.listing_id = Some(listing_id);
        self
    }

    pub fn with_provider_ref(mut self, provider_ref: impl Into<String>) -> Self {
        self.provider_ref = Some(provider_ref.into());
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Materializes the stored row.
    pub fn into_transaction(self, id: TransactionId, now: Timestamp) -> Transaction {
        Transaction {
            id,
            buyer_id: self.buyer_id,
            listing_id: self.listing_id,
            amount: self.amount,
            currency: self.currency,
            transaction_type: self.transaction_type,
            provider_ref: self.provider_ref,
            status: self.status,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Extra fields written alongside a status transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusExtras {
    /// Replaces the provider reference when set.
    pub provider_ref: Option<String>,
    /// Merged into existing metadata; new keys win.
    pub metadata: Metadata,
}

impl StatusExtras {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_provider_ref(mut self, provider_ref: impl Into<String>) -> Self {
        self.provider_ref = Some(provider_ref.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Applies these extras to an in-memory row.
    pub fn apply_to(&self, transaction: &mut Transaction) {
        if let Some(provider_ref) = &self.provider_ref {
            transaction.provider_ref = Some(provider_ref.clone());
        }
        for (key, value) in &self.metadata {
            transaction.metadata.insert(key.clone(), value.clone());
        }
    }
}

/// Sort order for transaction listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Filter and page for a user's transaction history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub order: SortOrder,
    pub limit: u32,
    pub offset: u32,
}

impl TransactionQuery {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    pub fn with_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    /// Sets the page, clamping the limit to `1..=MAX_LIMIT`.
    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = limit.clamp(1, Self::MAX_LIMIT);
        self.offset = offset;
        self
    }

    /// True if the row passes the type and status filters.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.transaction_type
            .map_or(true, |t| t == transaction.transaction_type)
            && self.status.map_or(true, |s| s == transaction.status)
    }
}

impl Default for TransactionQuery {
    fn default() -> Self {
        Self {
            transaction_type: None,
            status: None,
            order: SortOrder::NewestFirst,
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// One page of a transaction listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionPage {
    pub items: Vec<Transaction>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}
