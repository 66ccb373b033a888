//! Request and response bodies for admin endpoints.

use serde::{Deserialize, Serialize};

use crate::domain::access::AccessType;
use crate::domain::foundation::{GrantId, ListingId, Timestamp, UserId};
use crate::domain::ledger::{RevenuePeriod, TransactionType};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGrantRequest {
    pub buyer_id: UserId,
    pub listing_id: ListingId,
    #[serde(default)]
    pub access_type: Option<AccessType>,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGrantResponse {
    pub grant_id: GrantId,
    /// False when the buyer already held a grant for the listing.
    pub created: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokeGrantResponse {
    pub revoked: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RevenueParams {
    #[serde(default)]
    pub period: Option<RevenuePeriod>,
    #[serde(rename = "type", default)]
    pub transaction_type: Option<TransactionType>,
}
