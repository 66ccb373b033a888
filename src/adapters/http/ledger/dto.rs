//! Request and response bodies for the marketplace-facing endpoints.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ListingId, TransactionId, UserId};
use crate::domain::ledger::{Currency, SortOrder, TransactionStatus, TransactionType};
use crate::domain::listing::GrantedVia;

// ════════════════════════════════════════════════════════════════════════════════
// Checkout
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub listing_id: ListingId,
    /// Defaults to a contact reveal.
    #[serde(default)]
    pub payment_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub session_id: String,
    pub transaction_id: TransactionId,
}

// ════════════════════════════════════════════════════════════════════════════════
// Contact and access
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactResponse {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub granted_via: GrantedVia,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequiredDetails {
    pub price: Decimal,
    pub currency: Currency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessResponse {
    pub has_access: bool,
}

// ════════════════════════════════════════════════════════════════════════════════
// Messages
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    /// Required when the listing owner replies.
    #[serde(default)]
    pub recipient_id: Option<UserId>,
    pub body: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Transactions
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionListParams {
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub order: Option<SortOrder>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}
