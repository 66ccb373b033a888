//! Shared HTTP application state and its wiring.

use std::sync::Arc;

use crate::application::{
    AccessGrantManager, CheckoutSessionInitiator, CheckoutSettings, ContactRevealHandler,
    ListMessagesHandler, MessagingGate, ReconcilerSettings, SendMessageHandler,
    TransactionManager, WebhookReconciler,
};
use crate::config::{AppConfig, ValidationError};
use crate::domain::webhook::WebhookVerifier;
use crate::ports::{
    AccessGrantRepository, LedgerEventPublisher, ListingDirectory, MessageRepository,
    PaymentProvider, TransactionRepository, UserDirectory, WebhookEventRepository,
};

/// Port implementations chosen at startup.
#[derive(Clone)]
pub struct Services {
    pub transactions: Arc<dyn TransactionRepository>,
    pub grants: Arc<dyn AccessGrantRepository>,
    pub listings: Arc<dyn ListingDirectory>,
    pub users: Arc<dyn UserDirectory>,
    pub messages: Arc<dyn MessageRepository>,
    pub webhook_events: Arc<dyn WebhookEventRepository>,
    pub publisher: Arc<dyn LedgerEventPublisher>,
    pub payment_provider: Arc<dyn PaymentProvider>,
}

/// Handlers shared by every request.
///
/// Cheap to clone; each field is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub access: Arc<AccessGrantManager>,
    pub contact: Arc<ContactRevealHandler>,
    pub transactions: Arc<TransactionManager>,
    pub checkout: Arc<CheckoutSessionInitiator>,
    pub reconciler: Arc<WebhookReconciler>,
    pub send_message: Arc<SendMessageHandler>,
    pub list_messages: Arc<ListMessagesHandler>,
}

impl AppState {
    /// Builds every handler from the chosen ports and configuration.
    pub fn build(services: &Services, config: &AppConfig) -> Result<Self, ValidationError> {
        let pricing = config.payment.pricing()?;

        let access = Arc::new(AccessGrantManager::new(
            services.grants.clone(),
            services.listings.clone(),
            services.users.clone(),
            services.publisher.clone(),
        ));
        let transactions = Arc::new(TransactionManager::new(
            services.transactions.clone(),
            services.publisher.clone(),
        ));

        let contact = Arc::new(ContactRevealHandler::new(
            services.listings.clone(),
            access.clone(),
            pricing,
        ));

        let checkout = Arc::new(CheckoutSessionInitiator::new(
            services.listings.clone(),
            access.clone(),
            transactions.clone(),
            services.payment_provider.clone(),
            CheckoutSettings::from_config(&config.payment)?,
        ));

        let verifier = WebhookVerifier::from_config(
            config.payment.webhook_secret(),
            config.payment.allow_unsigned_webhooks,
        );
        if verifier.is_insecure() {
            tracing::warn!("webhook signature verification is DISABLED");
        }
        let reconciler = Arc::new(WebhookReconciler::new(
            verifier,
            services.webhook_events.clone(),
            transactions.clone(),
            access.clone(),
            services.listings.clone(),
            services.publisher.clone(),
            ReconcilerSettings::from_config(&config.payment, &config.marketplace)?,
        ));

        let gate = Arc::new(MessagingGate::new(services.listings.clone(), access.clone()));
        let send_message = Arc::new(SendMessageHandler::new(gate, services.messages.clone()));
        let list_messages = Arc::new(ListMessagesHandler::new(services.messages.clone()));

        Ok(Self {
            access,
            contact,
            transactions,
            checkout,
            reconciler,
            send_message,
            list_messages,
        })
    }
}
