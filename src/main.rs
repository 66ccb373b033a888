//! Contact Ledger server binary.

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use contact_ledger::adapters::events::TracingEventPublisher;
use contact_ledger::adapters::http::{api_router, AppState, Services};
use contact_ledger::adapters::memory::{
    InMemoryAccessGrantRepository, InMemoryListingDirectory, InMemoryMessageRepository,
    InMemoryTransactionRepository, InMemoryUserDirectory, InMemoryWebhookEventRepository,
};
use contact_ledger::adapters::postgres::{
    PostgresAccessGrantRepository, PostgresListingDirectory, PostgresMessageRepository,
    PostgresTransactionRepository, PostgresUserDirectory, PostgresWebhookEventRepository,
};
use contact_ledger::adapters::stripe::{MockPaymentProvider, StripeCheckoutAdapter, StripeConfig};
use contact_ledger::application::GrantExpirySweeper;
use contact_ledger::config::{AppConfig, LogFormat};
use contact_ledger::ports::{LedgerEventPublisher, PaymentProvider};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let publisher: Arc<dyn LedgerEventPublisher> = Arc::new(TracingEventPublisher::new());
    let payment_provider = payment_provider(&config)?;
    let services = if config.database.is_configured() {
        postgres_services(&config, publisher, payment_provider).await?
    } else {
        tracing::warn!("no database configured, using in-memory stores");
        memory_services(&config, publisher, payment_provider).await?
    };

    let state = AppState::build(&services, &config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper_handle = if config.sweep.enabled {
        let sweeper = GrantExpirySweeper::new(
            state.access.clone(),
            state.transactions.clone(),
            services.webhook_events.clone(),
            &config.sweep,
        );
        Some(tokio::spawn(async move { sweeper.run(shutdown_rx).await }))
    } else {
        None
    };

    let app = api_router(state, &config.server);
    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "contact ledger listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = sweeper_handle {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "sweeper task ended abnormally");
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    match config.server.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

fn payment_provider(config: &AppConfig) -> Result<Arc<dyn PaymentProvider>, BoxError> {
    let Some(api_key) = config.payment.api_key() else {
        tracing::warn!("no Stripe API key configured, using the mock payment provider");
        return Ok(Arc::new(MockPaymentProvider::new()));
    };

    let mut stripe = StripeConfig::new(api_key);
    if let Some(base_url) = &config.payment.stripe_api_base_url {
        stripe = stripe.with_base_url(base_url.as_str());
    }
    Ok(Arc::new(StripeCheckoutAdapter::new(stripe)?))
}

async fn postgres_services(
    config: &AppConfig,
    publisher: Arc<dyn LedgerEventPublisher>,
    payment_provider: Arc<dyn PaymentProvider>,
) -> Result<Services, BoxError> {
    let db = &config.database;
    let pool = db.pool_options().connect(&db.url).await?;

    if db.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("database migrations applied");
    }

    Ok(Services {
        transactions: Arc::new(PostgresTransactionRepository::new(pool.clone())),
        grants: Arc::new(PostgresAccessGrantRepository::new(pool.clone())),
        listings: Arc::new(PostgresListingDirectory::new(
            pool.clone(),
            config.marketplace.auto_approve_listings,
        )),
        users: Arc::new(PostgresUserDirectory::new(
            pool.clone(),
            config.marketplace.admin_ids()?,
        )),
        messages: Arc::new(PostgresMessageRepository::new(pool.clone())),
        webhook_events: Arc::new(PostgresWebhookEventRepository::new(pool)),
        publisher,
        payment_provider,
    })
}

async fn memory_services(
    config: &AppConfig,
    publisher: Arc<dyn LedgerEventPublisher>,
    payment_provider: Arc<dyn PaymentProvider>,
) -> Result<Services, BoxError> {
    let users = Arc::new(InMemoryUserDirectory::new());
    for admin_id in config.marketplace.admin_ids()? {
        users.add_admin(admin_id).await;
    }

    Ok(Services {
        transactions: Arc::new(InMemoryTransactionRepository::new()),
        grants: Arc::new(InMemoryAccessGrantRepository::new()),
        listings: Arc::new(InMemoryListingDirectory::new()),
        users,
        messages: Arc::new(InMemoryMessageRepository::new()),
        webhook_events: Arc::new(InMemoryWebhookEventRepository::new()),
        publisher,
        payment_provider,
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
