//! WebhookReconciler - turns provider notifications into ledger state, exactly once per event.
//!
//! Provider events arrive late, twice, or out of order. Convergence rests on
//! two storage guarantees rather than on locks:
//!
//! - status transitions are conditional writes that only move forward
//! - access grants are insert-or-ignore on the (buyer, listing) pair
//!
//! The transaction is always updated before access is granted, so a replay
//! after a partial failure finds a completed row and finishes the grant.
//! `failed` is terminal: money that settles after a failure is recorded on a
//! new completed row that supersedes the failed one.

use std::sync::Arc;

use crate::application::handlers::access::AccessGrantManager;
use crate::application::handlers::ledger::TransactionManager;
use crate::application::EventNotifier;
use crate::config::{MarketplaceConfig, PaymentConfig, ValidationError};
use crate::domain::access::{AccessError, GrantOptions};
use crate::domain::foundation::{Timestamp, TransactionId};
use crate::domain::ledger::{
    from_minor_units, Currency, LedgerEvent, Metadata, NewTransaction, StatusExtras, Transaction,
    TransactionStatus, TransactionType,
};
use crate::domain::webhook::{
    PaymentEvent, PaymentOutcome, ProviderEvent, WebhookError, WebhookVerifier,
};
use crate::ports::{
    LedgerEventPublisher, ListingDirectory, WebhookEventRecord, WebhookEventRepository,
};

/// Behaviour switches and durations used while reconciling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerSettings {
    /// Refuse events from the provider's test mode.
    pub require_livemode: bool,
    pub boost_duration_days: i64,
    pub subscription_access_days: i64,
    /// Currency recorded on orphan transactions whose event omits one.
    pub fallback_currency: Currency,
}

impl ReconcilerSettings {
    pub fn from_config(
        payment: &PaymentConfig,
        marketplace: &MarketplaceConfig,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            require_livemode: payment.require_livemode,
            boost_duration_days: marketplace.boost_duration_days,
            subscription_access_days: marketplace.subscription_access_days,
            fallback_currency: payment.pricing()?.currency,
        })
    }
}

/// What happened to a delivered event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Ledger state now reflects the event.
    Applied { transaction_id: TransactionId },
    /// Acknowledged without a ledger change.
    Ignored { reason: String },
    /// This event id was already handled.
    AlreadyProcessed,
}

pub struct WebhookReconciler {
    verifier: WebhookVerifier,
    journal: Arc<dyn WebhookEventRepository>,
    transactions: Arc<TransactionManager>,
    access: Arc<AccessGrantManager>,
    listings: Arc<dyn ListingDirectory>,
    notifier: EventNotifier,
    settings: ReconcilerSettings,
}

impl WebhookReconciler {
    pub fn new(
        verifier: WebhookVerifier,
        journal: Arc<dyn WebhookEventRepository>,
        transactions: Arc<TransactionManager>,
        access: Arc<AccessGrantManager>,
        listings: Arc<dyn ListingDirectory>,
        publisher: Arc<dyn LedgerEventPublisher>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            verifier,
            journal,
            transactions,
            access,
            listings,
            notifier: EventNotifier::new(publisher),
            settings,
        }
    }

    /// Authenticates a raw delivery and reconciles it.
    ///
    /// Nothing is looked up or written until the signature checks out.
    pub async fn handle(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let event = self
            .verifier
            .verify_and_parse(payload, signature)
            .map_err(|e| {
                tracing::warn!(error = %e, code = e.code(), "webhook rejected");
                e
            })?;

        self.process(event).await
    }

    /// Reconciles an already-authenticated event.
    pub async fn process(&self, event: ProviderEvent) -> Result<ReconcileOutcome, WebhookError> {
        if self.journal.find_by_event_id(&event.id).await?.is_some() {
            tracing::debug!(
                event_id = %event.id,
                event_type = %event.event_type,
                "webhook event already processed"
            );
            return Ok(ReconcileOutcome::AlreadyProcessed);
        }

        if self.settings.require_livemode && !event.livemode {
            tracing::warn!(
                event_id = %event.id,
                event_type = %event.event_type,
                "test-mode event delivered to live deployment"
            );
            return Err(WebhookError::LivemodeMismatch);
        }

        let applied = match PaymentEvent::from_provider(&event) {
            Ok(payment) => self.apply(&payment).await.map_err(|e| {
                if e.is_retryable() {
                    tracing::error!(
                        event_id = %payment.event_id,
                        event_type = payment.kind.as_str(),
                        transaction_id = ?payment.metadata.transaction_id,
                        provider_ref = ?payment.settled_reference(),
                        error = %e,
                        "webhook processing failed"
                    );
                }
                e
            }),
            Err(e) => Err(e),
        };

        let outcome = match applied {
            Ok(outcome) => outcome,
            Err(WebhookError::MalformedEvent(reason) | WebhookError::Unprocessable(reason)) => {
                tracing::warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    %reason,
                    "acknowledging webhook event that cannot be applied"
                );
                ReconcileOutcome::Ignored { reason }
            }
            Err(e) => return Err(e),
        };

        self.journal(&event, &outcome).await?;
        Ok(outcome)
    }

    async fn apply(&self, event: &PaymentEvent) -> Result<ReconcileOutcome, WebhookError> {
        match event.outcome {
            PaymentOutcome::Succeeded => self.on_payment_succeeded(event).await,
            PaymentOutcome::Failed => self.on_payment_failed(event).await,
            PaymentOutcome::Refunded => self.on_refund(event).await,
            PaymentOutcome::Ignored => {
                tracing::debug!(
                    event_id = %event.event_id,
                    event_type = event.kind.as_str(),
                    "webhook event needs no ledger change"
                );
                Ok(ignored(format!("{} requires no action", event.kind.as_str())))
            }
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success: checkout.session.completed, payment_intent.succeeded
    // ════════════════════════════════════════════════════════════════════════════

    async fn on_payment_succeeded(
        &self,
        event: &PaymentEvent,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let mut transaction = match self.locate(event, Lookup::MetadataFirst).await? {
            Some(found) => found,
            None => match self.synthesize_orphan(event).await? {
                Some(orphan) => orphan,
                None => {
                    return Ok(ignored("no matching transaction and no buyer in metadata"));
                }
            },
        };

        if transaction.status == TransactionStatus::Pending {
            // A racing failure may win; the re-read row then reports `failed`.
            transaction = self.complete(transaction, event).await?;
        }
        if transaction.status == TransactionStatus::Failed {
            transaction = self.supersede_failed(transaction, event).await?;
            if transaction.status == TransactionStatus::Pending {
                transaction = self.complete(transaction, event).await?;
            }
        }

        match transaction.status {
            TransactionStatus::Completed => {}
            TransactionStatus::Refunded => {
                return Ok(ignored("transaction already refunded"));
            }
            TransactionStatus::Pending | TransactionStatus::Failed => {
                tracing::error!(
                    event_id = %event.event_id,
                    transaction_id = %transaction.id,
                    status = transaction.status.as_str(),
                    "settled payment could not be recorded as completed"
                );
                return Ok(ignored(format!(
                    "transaction is {}",
                    transaction.status.as_str()
                )));
            }
        }

        self.deliver_purchase(&transaction).await?;

        Ok(ReconcileOutcome::Applied {
            transaction_id: transaction.id,
        })
    }

    /// Moves a pending row to completed, recording the settled reference.
    async fn complete(
        &self,
        transaction: Transaction,
        event: &PaymentEvent,
    ) -> Result<Transaction, WebhookError> {
        let mut extras = StatusExtras::none().with_metadata("completed_by_event", &event.event_id);
        if let Some(reference) = event.settled_reference() {
            if transaction.provider_ref.as_deref() != Some(reference) {
                extras = extras.with_provider_ref(reference);
            }
        }

        self.transactions
            .update_status(transaction.id, TransactionStatus::Completed, extras)
            .await?;

        // Re-read: a concurrent delivery may have completed it first.
        Ok(self.transactions.get(transaction.id).await?)
    }

    /// Creates a completed row for a payment the ledger never saw start.
    async fn synthesize_orphan(
        &self,
        event: &PaymentEvent,
    ) -> Result<Option<Transaction>, WebhookError> {
        let Some(buyer_id) = event.metadata.user_id else {
            tracing::error!(
                event_id = %event.event_id,
                event_type = event.kind.as_str(),
                provider_ref = ?event.settled_reference(),
                "payment matches no transaction and carries no buyer"
            );
            return Ok(None);
        };

        let currency = event
            .currency
            .as_deref()
            .and_then(|code| Currency::new(code).ok())
            .unwrap_or_else(|| self.settings.fallback_currency.clone());
        let amount = event
            .amount_minor
            .map(|minor| from_minor_units(minor, &currency))
            .unwrap_or_default();
        let transaction_type = event
            .metadata
            .payment_type
            .unwrap_or(TransactionType::ContactReveal);

        let mut metadata = settlement_metadata(event);
        metadata.insert("orphan".into(), "true".into());

        let mut orphan = NewTransaction::new(buyer_id, amount, currency, transaction_type)?
            .with_status(TransactionStatus::Completed)
            .with_metadata(metadata);
        if let Some(listing_id) = event.metadata.listing_id {
            orphan = orphan.with_listing(listing_id);
        }
        if let Some(reference) = event.settled_reference() {
            orphan = orphan.with_provider_ref(reference);
        }

        let id = self.transactions.record(orphan).await?;
        tracing::warn!(
            event_id = %event.event_id,
            transaction_id = %id,
            %buyer_id,
            provider_ref = ?event.settled_reference(),
            "recorded orphan payment"
        );

        Ok(Some(self.transactions.get(id).await?))
    }

    /// Records money that settled after its checkout was marked failed.
    ///
    /// `failed` is terminal, so the payment lands on a new completed row that
    /// points back at the failed one. The row is keyed by the settled
    /// reference: later deliveries for the same payment find it again.
    async fn supersede_failed(
        &self,
        failed: Transaction,
        event: &PaymentEvent,
    ) -> Result<Transaction, WebhookError> {
        let reference = event
            .reference_candidates()
            .into_iter()
            .find(|candidate| failed.provider_ref.as_deref() != Some(*candidate));

        if let Some(reference) = reference {
            if let Some(existing) = self.transactions.find_by_provider_ref(reference).await? {
                return Ok(existing);
            }
        }

        let amount = event
            .amount_minor
            .map(|minor| from_minor_units(minor, &failed.currency))
            .unwrap_or(failed.amount);
        let mut metadata = settlement_metadata(event);
        metadata.insert("supersedes".into(), failed.id.to_string());

        let mut replacement = NewTransaction::new(
            failed.buyer_id,
            amount,
            failed.currency.clone(),
            failed.transaction_type,
        )?
        .with_status(TransactionStatus::Completed)
        .with_metadata(metadata);
        if let Some(listing_id) = failed.listing_id {
            replacement = replacement.with_listing(listing_id);
        }
        match reference {
            Some(reference) => replacement = replacement.with_provider_ref(reference),
            None => tracing::warn!(
                event_id = %event.event_id,
                transaction_id = %failed.id,
                "settled payment has no reference of its own, replacement is unkeyed"
            ),
        }

        let id = self.transactions.record(replacement).await?;
        tracing::warn!(
            event_id = %event.event_id,
            failed_transaction_id = %failed.id,
            transaction_id = %id,
            provider_ref = ?reference,
            "payment succeeded after failure, recorded replacement transaction"
        );

        Ok(self.transactions.get(id).await?)
    }

    /// Gives the buyer what a completed transaction paid for. Safe to repeat.
    async fn deliver_purchase(&self, transaction: &Transaction) -> Result<(), WebhookError> {
        let Some(listing_id) = transaction.listing_id else {
            if transaction.transaction_type != TransactionType::Subscription {
                tracing::warn!(
                    transaction_id = %transaction.id,
                    "completed transaction has no listing to deliver"
                );
            }
            return Ok(());
        };

        if transaction.transaction_type == TransactionType::ListingBoost {
            // Measured from completion so replays compute the same expiry.
            let until = transaction
                .updated_at
                .add_days(self.settings.boost_duration_days);
            if self.listings.extend_featured_until(listing_id, until).await? {
                tracing::info!(
                    transaction_id = %transaction.id,
                    %listing_id,
                    featured_until = %until,
                    "listing featured"
                );
                self.notifier
                    .notify(LedgerEvent::ListingFeatured {
                        listing_id,
                        featured_until: until,
                    })
                    .await;
            } else {
                tracing::warn!(transaction_id = %transaction.id, %listing_id, "boosted listing not found");
            }
            return Ok(());
        }

        let Some(access_type) = transaction.transaction_type.access_type() else {
            return Ok(());
        };

        let mut options = GrantOptions::default()
            .paid_by(transaction.id)
            .with_access_type(access_type);
        if transaction.transaction_type == TransactionType::Subscription {
            let expires_at = transaction
                .updated_at
                .add_days(self.settings.subscription_access_days);
            if !expires_at.is_after(&Timestamp::now()) {
                tracing::info!(
                    transaction_id = %transaction.id,
                    "subscription window already over, no grant issued"
                );
                return Ok(());
            }
            options = options.expiring_at(expires_at);
        }

        match self
            .access
            .grant_access(transaction.buyer_id, listing_id, options)
            .await
        {
            Ok(_) => Ok(()),
            Err(AccessError::Storage(message)) => Err(WebhookError::Storage(message)),
            Err(e) => {
                // Retrying cannot fix a missing party or a self-purchase.
                tracing::error!(
                    transaction_id = %transaction.id,
                    buyer_id = %transaction.buyer_id,
                    %listing_id,
                    error = %e,
                    "paid transaction could not be turned into access"
                );
                Ok(())
            }
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Failure: payment_intent.payment_failed
    // ════════════════════════════════════════════════════════════════════════════

    async fn on_payment_failed(
        &self,
        event: &PaymentEvent,
    ) -> Result<ReconcileOutcome, WebhookError> {
        let Some(transaction) = self.locate(event, Lookup::ReferenceFirst).await? else {
            tracing::warn!(
                event_id = %event.event_id,
                provider_ref = ?event.settled_reference(),
                "payment failure for unknown transaction"
            );
            return Ok(ignored("no matching transaction"));
        };

        let mut extras = StatusExtras::none().with_metadata("failed_by_event", &event.event_id);
        if let Some(reason) = &event.failure_reason {
            extras = extras.with_metadata("failure_reason", reason);
        }

        let applied = self
            .transactions
            .update_status(transaction.id, TransactionStatus::Failed, extras)
            .await?;

        if !applied {
            tracing::info!(
                event_id = %event.event_id,
                transaction_id = %transaction.id,
                status = transaction.status.as_str(),
                "stale payment failure ignored"
            );
            return Ok(ignored(format!(
                "transaction is {}",
                transaction.status.as_str()
            )));
        }

        Ok(ReconcileOutcome::Applied {
            transaction_id: transaction.id,
        })
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Refund: charge.refunded
    // ════════════════════════════════════════════════════════════════════════════

    async fn on_refund(&self, event: &PaymentEvent) -> Result<ReconcileOutcome, WebhookError> {
        let Some(transaction) = self.locate(event, Lookup::ReferenceFirst).await? else {
            tracing::warn!(
                event_id = %event.event_id,
                provider_ref = ?event.settled_reference(),
                "refund for unknown transaction"
            );
            return Ok(ignored("no matching transaction"));
        };

        match transaction.status {
            TransactionStatus::Completed => {
                let extras =
                    StatusExtras::none().with_metadata("refunded_by_event", &event.event_id);
                self.transactions
                    .update_status(transaction.id, TransactionStatus::Refunded, extras)
                    .await?;
            }
            // Already refunded: finish any revocation an earlier attempt left undone.
            TransactionStatus::Refunded => {}
            TransactionStatus::Pending | TransactionStatus::Failed => {
                tracing::warn!(
                    event_id = %event.event_id,
                    transaction_id = %transaction.id,
                    status = transaction.status.as_str(),
                    "refund for a transaction that never completed"
                );
                return Ok(ignored("transaction never completed"));
            }
        }

        self.withdraw_purchase(&transaction).await?;

        Ok(ReconcileOutcome::Applied {
            transaction_id: transaction.id,
        })
    }

    /// Takes back what a refunded transaction paid for. Safe to repeat.
    async fn withdraw_purchase(&self, transaction: &Transaction) -> Result<(), WebhookError> {
        let Some(listing_id) = transaction.listing_id else {
            return Ok(());
        };

        match transaction.transaction_type {
            TransactionType::ListingBoost => {
                if self.listings.clear_featured(listing_id).await? {
                    tracing::info!(transaction_id = %transaction.id, %listing_id, "listing un-featured");
                }
            }
            TransactionType::ContactReveal | TransactionType::Subscription => {
                // Only the grant this payment created; manual or later grants stay.
                let paid_by_this = self
                    .access
                    .find_grant(transaction.buyer_id, listing_id)
                    .await?
                    .is_some_and(|grant| grant.transaction_id == Some(transaction.id));

                if paid_by_this {
                    self.access
                        .revoke_access(transaction.buyer_id, listing_id)
                        .await?;
                }
            }
        }

        Ok(())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Helpers
    // ════════════════════════════════════════════════════════════════════════════

    async fn locate(
        &self,
        event: &PaymentEvent,
        lookup: Lookup,
    ) -> Result<Option<Transaction>, WebhookError> {
        if lookup == Lookup::MetadataFirst {
            if let Some(found) = self.by_metadata(event).await? {
                return Ok(Some(found));
            }
        }

        for reference in event.reference_candidates() {
            if let Some(found) = self.transactions.find_by_provider_ref(reference).await? {
                return Ok(Some(found));
            }
        }

        if lookup == Lookup::ReferenceFirst {
            return self.by_metadata(event).await;
        }

        Ok(None)
    }

    async fn by_metadata(&self, event: &PaymentEvent) -> Result<Option<Transaction>, WebhookError> {
        match event.metadata.transaction_id {
            Some(id) => Ok(self.transactions.find_by_id(id).await?),
            None => Ok(None),
        }
    }

    async fn journal(
        &self,
        event: &ProviderEvent,
        outcome: &ReconcileOutcome,
    ) -> Result<(), WebhookError> {
        let payload = serde_json::to_value(event).unwrap_or_default();
        let record = match outcome {
            ReconcileOutcome::Ignored { reason } => {
                WebhookEventRecord::ignored(&event.id, &event.event_type, reason, payload)
            }
            _ => WebhookEventRecord::applied(&event.id, &event.event_type, payload),
        };

        self.journal.save(record).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    MetadataFirst,
    ReferenceFirst,
}

/// Metadata for rows created straight from a settled payment.
///
/// The ledger keeps two decimal places, so the provider's minor amount is
/// kept verbatim for three-decimal currencies.
fn settlement_metadata(event: &PaymentEvent) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("completed_by_event".into(), event.event_id.clone());
    if let Some(minor) = event.amount_minor {
        metadata.insert("provider_amount_minor".into(), minor.to_string());
    }
    metadata
}

fn ignored(reason: impl Into<String>) -> ReconcileOutcome {
    ReconcileOutcome::Ignored {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventPublisher;
    use crate::adapters::memory::{
        InMemoryAccessGrantRepository, InMemoryListingDirectory, InMemoryTransactionRepository,
        InMemoryUserDirectory, InMemoryWebhookEventRepository,
    };
    use crate::domain::foundation::{ListingId, UserId};
    use crate::domain::ledger::TransactionQuery;
    use crate::domain::webhook::{sign_payload, ProviderEventBuilder};
    use rust_decimal_macros::dec;
    use serde_json::json;

    const SECRET: &str = "whsec_test_secret";
    const OWNER: UserId = UserId::new(1);
    const BUYER: UserId = UserId::new(42);
    const LISTING: ListingId = ListingId::new(7);

    struct Fixture {
        reconciler: WebhookReconciler,
        journal: Arc<InMemoryWebhookEventRepository>,
        transactions: Arc<TransactionManager>,
        transaction_repo: Arc<InMemoryTransactionRepository>,
        access: Arc<AccessGrantManager>,
        listings: Arc<InMemoryListingDirectory>,
        publisher: Arc<InMemoryEventPublisher>,
    }

    async fn fixture() -> Fixture {
        fixture_with(false).await
    }

    async fn fixture_with(require_livemode: bool) -> Fixture {
        let listings = Arc::new(InMemoryListingDirectory::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let publisher = Arc::new(InMemoryEventPublisher::new());
        let journal = Arc::new(InMemoryWebhookEventRepository::new());
        let transaction_repo = Arc::new(InMemoryTransactionRepository::starting_at(101));
        listings.add_listing(LISTING, OWNER).await;
        users.add_user(OWNER).await;
        users.add_user(BUYER).await;

        let access = Arc::new(AccessGrantManager::new(
            Arc::new(InMemoryAccessGrantRepository::new()),
            listings.clone(),
            users,
            publisher.clone(),
        ));
        let transactions = Arc::new(TransactionManager::new(
            transaction_repo.clone(),
            publisher.clone(),
        ));
        let settings = ReconcilerSettings {
            require_livemode,
            boost_duration_days: 7,
            subscription_access_days: 30,
            fallback_currency: Currency::new("USD").unwrap(),
        };

        Fixture {
            reconciler: WebhookReconciler::new(
                WebhookVerifier::new(SECRET),
                journal.clone(),
                transactions.clone(),
                access.clone(),
                listings.clone(),
                publisher.clone(),
                settings,
            ),
            journal,
            transactions,
            transaction_repo,
            access,
            listings,
            publisher,
        }
    }

    async fn pending(f: &Fixture, transaction_type: TransactionType) -> TransactionId {
        let pending = NewTransaction::new(
            BUYER,
            dec!(5.00),
            Currency::new("USD").unwrap(),
            transaction_type,
        )
        .unwrap()
        .with_listing(LISTING)
        .with_provider_ref("cs_test_101");
        f.transactions.record(pending).await.unwrap()
    }

    fn metadata(transaction_id: Option<i64>, payment_type: &str) -> serde_json::Value {
        let mut metadata = json!({
            "user_id": "42",
            "listing_id": "7",
            "payment_type": payment_type,
        });
        if let Some(id) = transaction_id {
            metadata["transaction_id"] = json!(id.to_string());
        }
        metadata
    }

    fn session_completed(event_id: &str, payment_type: &str) -> ProviderEvent {
        ProviderEventBuilder::new()
            .id(event_id)
            .event_type("checkout.session.completed")
            .object(json!({
                "id": "cs_test_101",
                "payment_intent": "pi_101",
                "payment_status": "paid",
                "amount_total": 500,
                "currency": "usd",
                "metadata": metadata(Some(101), payment_type),
            }))
            .build()
    }

    fn payment_failed(event_id: &str) -> ProviderEvent {
        ProviderEventBuilder::new()
            .id(event_id)
            .event_type("payment_intent.payment_failed")
            .object(json!({
                "id": "pi_101",
                "amount": 500,
                "last_payment_error": { "message": "card declined" },
                "metadata": metadata(Some(101), "contact_reveal"),
            }))
            .build()
    }

    fn charge_refunded(event_id: &str) -> ProviderEvent {
        ProviderEventBuilder::new()
            .id(event_id)
            .event_type("charge.refunded")
            .object(json!({
                "id": "ch_101",
                "payment_intent": "pi_101",
                "refunded": true,
                "amount_refunded": 500,
            }))
            .build()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn completed_session_settles_transaction_and_grants_access() {
        let f = fixture().await;
        let id = pending(&f, TransactionType::ContactReveal).await;

        let outcome = f
            .reconciler
            .process(session_completed("evt_1", "contact_reveal"))
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::Applied { transaction_id: id });
        let transaction = f.transactions.get(id).await.unwrap();
        assert_eq!(transaction.status, TransactionStatus::Completed);
        assert_eq!(transaction.provider_ref.as_deref(), Some("pi_101"));

        let grant = f.access.find_grant(BUYER, LISTING).await.unwrap().unwrap();
        assert_eq!(grant.transaction_id, Some(id));
        assert!(f.access.check_access(BUYER, LISTING).await.unwrap());
        assert!(f.publisher.has_event("access.granted").await);
        assert_eq!(f.journal.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_delivery_is_already_processed() {
        let f = fixture().await;
        pending(&f, TransactionType::ContactReveal).await;
        let event = session_completed("evt_1", "contact_reveal");

        f.reconciler.process(event.clone()).await.unwrap();
        let second = f.reconciler.process(event).await.unwrap();

        assert_eq!(second, ReconcileOutcome::AlreadyProcessed);
        assert_eq!(f.access.count_by_listing(LISTING).await.unwrap(), 1);
        assert_eq!(f.publisher.events_of_type("access.granted").await.len(), 1);
    }

    #[tokio::test]
    async fn second_success_event_for_same_payment_is_harmless() {
        let f = fixture().await;
        let id = pending(&f, TransactionType::ContactReveal).await;
        f.reconciler
            .process(session_completed("evt_1", "contact_reveal"))
            .await
            .unwrap();

        let intent = ProviderEventBuilder::new()
            .id("evt_2")
            .event_type("payment_intent.succeeded")
            .object(json!({ "id": "pi_101", "amount_received": 500 }))
            .build();
        let outcome = f.reconciler.process(intent).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Applied { transaction_id: id });
        assert_eq!(f.access.count_by_listing(LISTING).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_payment_with_buyer_becomes_orphan_transaction() {
        let f = fixture().await;
        let event = ProviderEventBuilder::new()
            .id("evt_orphan")
            .event_type("checkout.session.completed")
            .object(json!({
                "id": "cs_unknown",
                "payment_intent": "pi_unknown",
                "amount_total": 1000,
                "currency": "usd",
                "metadata": metadata(None, "contact_reveal"),
            }))
            .build();

        let outcome = f.reconciler.process(event).await.unwrap();

        let ReconcileOutcome::Applied { transaction_id } = outcome else {
            panic!("expected applied, got {:?}", outcome);
        };
        let orphan = f.transactions.get(transaction_id).await.unwrap();
        assert_eq!(orphan.status, TransactionStatus::Completed);
        assert_eq!(orphan.amount, dec!(10.00));
        assert_eq!(orphan.provider_ref.as_deref(), Some("pi_unknown"));
        assert_eq!(orphan.metadata.get("orphan").map(String::as_str), Some("true"));
        assert!(f.access.has_active_grant(BUYER, LISTING).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_payment_without_buyer_is_ignored() {
        let f = fixture().await;
        let event = ProviderEventBuilder::new()
            .id("evt_stray")
            .event_type("payment_intent.succeeded")
            .object(json!({ "id": "pi_stray", "amount_received": 500 }))
            .build();

        let outcome = f.reconciler.process(event).await.unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Ignored { .. }));
        assert!(f.transaction_repo.is_empty().await);
        assert_eq!(f.journal.len().await, 1);
    }

    #[tokio::test]
    async fn failure_and_success_converge_in_either_order() {
        for failure_first in [true, false] {
            let f = fixture().await;
            let id = pending(&f, TransactionType::ContactReveal).await;
            let mut events = vec![
                payment_failed("evt_fail"),
                session_completed("evt_ok", "contact_reveal"),
            ];
            if !failure_first {
                events.reverse();
            }

            for event in events {
                f.reconciler.process(event).await.unwrap();
            }

            let paid = f
                .transactions
                .find_by_provider_ref("pi_101")
                .await
                .unwrap()
                .unwrap();
            assert_eq!(paid.status, TransactionStatus::Completed, "failure_first={}", failure_first);
            assert_eq!(f.access.count_by_listing(LISTING).await.unwrap(), 1);
            let grant = f.access.find_grant(BUYER, LISTING).await.unwrap().unwrap();
            assert_eq!(grant.transaction_id, Some(paid.id));

            let completed = f
                .transactions
                .list_for_user(
                    BUYER,
                    &TransactionQuery::default().with_status(TransactionStatus::Completed),
                )
                .await
                .unwrap();
            assert_eq!(completed.total, 1);

            if failure_first {
                assert_eq!(
                    f.transactions.get(id).await.unwrap().status,
                    TransactionStatus::Failed
                );
                assert_eq!(
                    paid.metadata.get("supersedes").map(String::as_str),
                    Some("101")
                );
            } else {
                assert_eq!(paid.id, id);
            }
        }
    }

    #[tokio::test]
    async fn repeated_success_after_failure_reuses_replacement() {
        let f = fixture().await;
        pending(&f, TransactionType::ContactReveal).await;
        f.reconciler.process(payment_failed("evt_fail")).await.unwrap();
        f.reconciler
            .process(session_completed("evt_ok", "contact_reveal"))
            .await
            .unwrap();

        let intent = ProviderEventBuilder::new()
            .id("evt_intent")
            .event_type("payment_intent.succeeded")
            .object(json!({
                "id": "pi_101",
                "amount_received": 500,
                "metadata": metadata(Some(101), "contact_reveal"),
            }))
            .build();
        let outcome = f.reconciler.process(intent).await.unwrap();

        let replacement = f.transactions.find_by_provider_ref("pi_101").await.unwrap().unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Applied {
                transaction_id: replacement.id
            }
        );
        assert_eq!(f.transaction_repo.len().await, 2);
        assert_eq!(f.publisher.events_of_type("access.granted").await.len(), 1);
    }

    #[tokio::test]
    async fn negative_amount_is_acknowledged_not_retried() {
        let f = fixture().await;
        let event = ProviderEventBuilder::new()
            .id("evt_negative")
            .event_type("payment_intent.succeeded")
            .object(json!({
                "id": "pi_negative",
                "amount_received": -500,
                "metadata": metadata(None, "contact_reveal"),
            }))
            .build();

        let outcome = f.reconciler.process(event).await.unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Ignored { .. }));
        assert!(f.transaction_repo.is_empty().await);
        assert_eq!(f.journal.len().await, 1);
    }

    #[tokio::test]
    async fn orphan_keeps_provider_minor_amount() {
        let f = fixture().await;
        let event = ProviderEventBuilder::new()
            .id("evt_kwd")
            .event_type("payment_intent.succeeded")
            .object(json!({
                "id": "pi_kwd",
                "amount_received": 1234,
                "currency": "kwd",
                "metadata": metadata(None, "contact_reveal"),
            }))
            .build();

        let outcome = f.reconciler.process(event).await.unwrap();

        let ReconcileOutcome::Applied { transaction_id } = outcome else {
            panic!("expected applied, got {:?}", outcome);
        };
        let orphan = f.transactions.get(transaction_id).await.unwrap();
        assert_eq!(orphan.currency.as_str(), "KWD");
        assert_eq!(orphan.amount, dec!(1.23));
        assert_eq!(
            orphan.metadata.get("provider_amount_minor").map(String::as_str),
            Some("1234")
        );
    }

    #[tokio::test]
    async fn boost_features_listing_from_completion_time() {
        let f = fixture().await;
        pending(&f, TransactionType::ListingBoost).await;

        f.reconciler
            .process(session_completed("evt_boost", "listing_boost"))
            .await
            .unwrap();

        let until = f.listings.featured_until(LISTING).await.unwrap();
        assert!(until.is_after(&Timestamp::now().add_days(6)));
        assert!(until.is_before(&Timestamp::now().add_days(8)));
        assert!(f.publisher.has_event("listing.featured").await);
        assert!(!f.access.has_active_grant(BUYER, LISTING).await.unwrap());
    }

    #[tokio::test]
    async fn subscription_grant_expires() {
        let f = fixture().await;
        pending(&f, TransactionType::Subscription).await;

        f.reconciler
            .process(session_completed("evt_sub", "subscription"))
            .await
            .unwrap();

        let grant = f.access.find_grant(BUYER, LISTING).await.unwrap().unwrap();
        let expires_at = grant.expires_at.unwrap();
        assert!(expires_at.is_after(&Timestamp::now().add_days(29)));
        assert!(expires_at.is_before(&Timestamp::now().add_days(31)));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Failure
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn failed_payment_marks_transaction_failed() {
        let f = fixture().await;
        let id = pending(&f, TransactionType::ContactReveal).await;

        let outcome = f.reconciler.process(payment_failed("evt_fail")).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Applied { transaction_id: id });
        let transaction = f.transactions.get(id).await.unwrap();
        assert_eq!(transaction.status, TransactionStatus::Failed);
        assert_eq!(
            transaction.metadata.get("failure_reason").map(String::as_str),
            Some("card declined")
        );
    }

    #[tokio::test]
    async fn stale_failure_does_not_downgrade_completed() {
        let f = fixture().await;
        let id = pending(&f, TransactionType::ContactReveal).await;
        f.reconciler
            .process(session_completed("evt_ok", "contact_reveal"))
            .await
            .unwrap();

        let outcome = f.reconciler.process(payment_failed("evt_stale")).await.unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Ignored { .. }));
        assert_eq!(
            f.transactions.get(id).await.unwrap().status,
            TransactionStatus::Completed
        );
        assert!(f.access.has_active_grant(BUYER, LISTING).await.unwrap());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Refund
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn refund_revokes_paid_grant() {
        let f = fixture().await;
        let id = pending(&f, TransactionType::ContactReveal).await;
        f.reconciler
            .process(session_completed("evt_ok", "contact_reveal"))
            .await
            .unwrap();

        let outcome = f.reconciler.process(charge_refunded("evt_refund")).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Applied { transaction_id: id });
        assert_eq!(
            f.transactions.get(id).await.unwrap().status,
            TransactionStatus::Refunded
        );
        assert!(!f.access.check_access(BUYER, LISTING).await.unwrap());
        assert!(f.publisher.has_event("access.revoked").await);
    }

    #[tokio::test]
    async fn refund_keeps_manual_grant() {
        let f = fixture().await;
        pending(&f, TransactionType::ContactReveal).await;
        f.reconciler
            .process(session_completed("evt_ok", "contact_reveal"))
            .await
            .unwrap();
        f.access.revoke_access(BUYER, LISTING).await.unwrap();
        f.access
            .grant_access(BUYER, LISTING, GrantOptions::default())
            .await
            .unwrap();

        f.reconciler.process(charge_refunded("evt_refund")).await.unwrap();

        assert!(f.access.has_active_grant(BUYER, LISTING).await.unwrap());
    }

    #[tokio::test]
    async fn refund_of_boost_clears_featured() {
        let f = fixture().await;
        pending(&f, TransactionType::ListingBoost).await;
        f.reconciler
            .process(session_completed("evt_boost", "listing_boost"))
            .await
            .unwrap();

        f.reconciler.process(charge_refunded("evt_refund")).await.unwrap();

        assert_eq!(f.listings.featured_until(LISTING).await, None);
    }

    #[tokio::test]
    async fn partial_refund_is_ignored() {
        let f = fixture().await;
        pending(&f, TransactionType::ContactReveal).await;
        f.reconciler
            .process(session_completed("evt_ok", "contact_reveal"))
            .await
            .unwrap();
        let partial = ProviderEventBuilder::new()
            .id("evt_partial")
            .event_type("charge.refunded")
            .object(json!({ "id": "ch_101", "payment_intent": "pi_101", "refunded": false }))
            .build();

        let outcome = f.reconciler.process(partial).await.unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Ignored { .. }));
        assert!(f.access.has_active_grant(BUYER, LISTING).await.unwrap());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Envelope handling
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn signed_delivery_is_processed() {
        let f = fixture().await;
        pending(&f, TransactionType::ContactReveal).await;
        let payload = serde_json::to_string(&session_completed("evt_1", "contact_reveal")).unwrap();
        let header = sign_payload(SECRET, chrono::Utc::now().timestamp(), &payload);

        let outcome = f
            .reconciler
            .handle(payload.as_bytes(), Some(&header))
            .await
            .unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Applied { .. }));
    }

    #[tokio::test]
    async fn bad_signature_touches_nothing() {
        let f = fixture().await;
        pending(&f, TransactionType::ContactReveal).await;
        let payload = serde_json::to_string(&session_completed("evt_1", "contact_reveal")).unwrap();
        let header = sign_payload("whsec_wrong", chrono::Utc::now().timestamp(), &payload);

        let result = f.reconciler.handle(payload.as_bytes(), Some(&header)).await;

        assert_eq!(result, Err(WebhookError::InvalidSignature));
        assert!(f.journal.is_empty().await);
        assert!(!f.access.has_active_grant(BUYER, LISTING).await.unwrap());
    }

    #[tokio::test]
    async fn test_mode_event_rejected_when_livemode_required() {
        let f = fixture_with(true).await;

        let result = f
            .reconciler
            .process(session_completed("evt_test", "contact_reveal"))
            .await;

        assert_eq!(result, Err(WebhookError::LivemodeMismatch));
        assert!(f.journal.is_empty().await);
    }

    #[tokio::test]
    async fn unknown_event_type_is_acknowledged() {
        let f = fixture().await;
        let event = ProviderEventBuilder::new()
            .id("evt_other")
            .event_type("customer.created")
            .build();

        let outcome = f.reconciler.process(event).await.unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Ignored { .. }));
        assert_eq!(f.journal.len().await, 1);
    }

    #[tokio::test]
    async fn storage_failure_is_retryable_and_not_journaled() {
        let f = fixture().await;
        pending(&f, TransactionType::ContactReveal).await;
        f.transaction_repo.set_failing(true);

        let err = f
            .reconciler
            .process(session_completed("evt_1", "contact_reveal"))
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(f.journal.is_empty().await);

        f.transaction_repo.set_failing(false);
        let retried = f
            .reconciler
            .process(session_completed("evt_1", "contact_reveal"))
            .await
            .unwrap();
        assert!(matches!(retried, ReconcileOutcome::Applied { .. }));
    }
}
