//! CheckoutSessionInitiator - prices a purchase, records it as pending and opens a hosted session.

use std::sync::Arc;

use crate::application::handlers::access::AccessGrantManager;
use crate::application::handlers::ledger::TransactionManager;
use crate::config::{PaymentConfig, Pricing, ValidationError};
use crate::domain::foundation::{ListingId, TransactionId, UserId};
use crate::domain::ledger::{
    to_minor_units, NewTransaction, StatusExtras, TransactionStatus, TransactionType,
};
use crate::ports::{CheckoutRequest, ListingDirectory, PaymentProvider};

use super::CheckoutError;

/// Prices and redirect targets used for every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    pub pricing: Pricing,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutSettings {
    pub fn from_config(config: &PaymentConfig) -> Result<Self, ValidationError> {
        Ok(Self {
            pricing: config.pricing()?,
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartCheckoutCommand {
    pub buyer_id: UserId,
    pub listing_id: ListingId,
    pub payment_type: TransactionType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutStarted {
    pub checkout_url: String,
    pub session_id: String,
    pub transaction_id: TransactionId,
}

pub struct CheckoutSessionInitiator {
    listings: Arc<dyn ListingDirectory>,
    access: Arc<AccessGrantManager>,
    transactions: Arc<TransactionManager>,
    provider: Arc<dyn PaymentProvider>,
    settings: CheckoutSettings,
}

impl CheckoutSessionInitiator {
    pub fn new(
        listings: Arc<dyn ListingDirectory>,
        access: Arc<AccessGrantManager>,
        transactions: Arc<TransactionManager>,
        provider: Arc<dyn PaymentProvider>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            listings,
            access,
            transactions,
            provider,
            settings,
        }
    }

    /// Starts a hosted checkout.
    ///
    /// The pending transaction is written before the provider is called, so
    /// every session the provider knows about has a ledger row to settle.
    pub async fn handle(
        &self,
        cmd: StartCheckoutCommand,
    ) -> Result<CheckoutStarted, CheckoutError> {
        let listing = self
            .listings
            .find_listing(cmd.listing_id)
            .await?
            .ok_or(CheckoutError::InvalidListing(cmd.listing_id))?;

        if listing.is_owned_by(cmd.buyer_id) {
            return Err(CheckoutError::SelfPurchaseDenied);
        }

        if cmd.payment_type == TransactionType::ContactReveal
            && self
                .access
                .has_active_grant(cmd.buyer_id, cmd.listing_id)
                .await?
        {
            return Err(CheckoutError::AlreadyHasAccess);
        }

        let price = self.settings.pricing.price_for(cmd.payment_type);
        let currency = self.settings.pricing.currency.clone();
        let amount_minor = to_minor_units(price, &currency)?;

        let pending =
            NewTransaction::new(cmd.buyer_id, price, currency.clone(), cmd.payment_type)?
                .with_listing(cmd.listing_id);
        let transaction_id = self.transactions.record(pending).await?;

        let request = CheckoutRequest {
            transaction_id,
            buyer_id: cmd.buyer_id,
            listing_id: cmd.listing_id,
            payment_type: cmd.payment_type,
            amount_minor,
            currency,
            description: describe(cmd.payment_type, cmd.listing_id),
            success_url: self.settings.success_url.clone(),
            cancel_url: self.settings.cancel_url.clone(),
        };

        let session = match self.provider.create_checkout_session(request).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(
                    %transaction_id,
                    buyer_id = %cmd.buyer_id,
                    listing_id = %cmd.listing_id,
                    error = %e,
                    "checkout session creation failed"
                );
                let extras =
                    StatusExtras::none().with_metadata("failure_reason", e.message.clone());
                if let Err(mark_err) = self
                    .transactions
                    .update_status(transaction_id, TransactionStatus::Failed, extras)
                    .await
                {
                    tracing::warn!(
                        %transaction_id,
                        error = %mark_err,
                        "could not mark checkout failed"
                    );
                }
                return Err(CheckoutError::Payment(e));
            }
        };

        self.transactions
            .attach_provider_ref(transaction_id, &session.id)
            .await?;

        tracing::info!(
            %transaction_id,
            session_id = %session.id,
            buyer_id = %cmd.buyer_id,
            listing_id = %cmd.listing_id,
            payment_type = cmd.payment_type.as_str(),
            %price,
            "checkout session created"
        );

        Ok(CheckoutStarted {
            checkout_url: session.url,
            session_id: session.id,
            transaction_id,
        })
    }
}

fn describe(payment_type: TransactionType, listing_id: ListingId) -> String {
    match payment_type {
        TransactionType::ContactReveal => {
            format!("Seller contact details for listing #{}", listing_id)
        }
        TransactionType::ListingBoost => format!("Featured placement for listing #{}", listing_id),
        TransactionType::Subscription => "Contact access subscription".to_string(),
    }
}
