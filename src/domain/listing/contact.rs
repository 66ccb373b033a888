//! Contact reveal outcomes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ContactDetails;
use crate::domain::ledger::Currency;

/// Why the viewer is allowed to see the contact details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantedVia {
    Owner,
    Payment,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevealedContact {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub granted_via: GrantedVia,
}

impl RevealedContact {
    pub fn new(contact: ContactDetails, granted_via: GrantedVia) -> Self {
        Self {
            email: contact.email,
            phone: contact.phone,
            granted_via,
        }
    }
}

/// Result of asking for a listing's contact details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactReveal {
    Revealed(RevealedContact),
    /// Viewer must buy a contact reveal first.
    PaymentRequired { price: Decimal, currency: Currency },
}

impl ContactReveal {
    pub fn is_revealed(&self) -> bool {
        matches!(self, ContactReveal::Revealed(_))
    }
}
