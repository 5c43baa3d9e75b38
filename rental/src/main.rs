//! Car rental HTTP server.

use car_rental::{
    config::Config,
    environment::{Clock, SystemClock},
    identity::AuthService,
    orders::{CheckoutSettings, OrderWorkflow},
    payments::{StripeGateway, WebhookVerifier},
    reviews::ReviewService,
    server::{build_router, AppState},
    stores::{
        postgres, PostgresCarRepository, PostgresOrderRepository, PostgresProbe,
        PostgresReviewRepository, PostgresUserRepository, RedisSessionStore,
    },
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "car_rental=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting car rental server");

    let config = Config::from_env();
    info!(
        bind = %config.bind_address(),
        public_base_url = %config.server.public_base_url,
        metrics = config.server.metrics_enabled,
        "Configuration loaded"
    );

    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .min_connections(config.postgres.min_connections)
        .acquire_timeout(Duration::from_secs(config.postgres.connect_timeout))
        .connect(&config.postgres.url)
        .await?;
    postgres::migrate(&pool).await?;
    info!("Database ready");

    info!("Connecting to session store...");
    let sessions = Arc::new(RedisSessionStore::new(&config.redis.url).await?);
    info!("Session store ready");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cars = Arc::new(PostgresCarRepository::new(pool.clone()));
    let users = Arc::new(PostgresUserRepository::new(pool.clone()));
    let orders = Arc::new(PostgresOrderRepository::new(pool.clone()));
    let reviews = Arc::new(PostgresReviewRepository::new(pool.clone()));
    let gateway = Arc::new(StripeGateway::new(&config.stripe)?);

    if config.stripe.secret_key.is_empty() {
        warn!("STRIPE_SECRET_KEY is not set; checkout calls will be rejected by the processor");
    }

    let auth = AuthService::new(users, sessions, clock.clone(), config.auth.session_ttl());
    let review_service = ReviewService::new(reviews, cars.clone(), clock.clone());

    let mut workflow = OrderWorkflow::new(
        orders,
        cars.clone(),
        gateway,
        clock.clone(),
        CheckoutSettings {
            service_fee: config.checkout.service_fee(),
            session_ttl: config.checkout.session_ttl(),
            public_base_url: config.server.public_base_url.clone(),
        },
    );
    match &config.stripe.webhook_secret {
        Some(secret) => {
            workflow = workflow.with_webhook_verifier(WebhookVerifier::new(
                secret.clone(),
                config.stripe.webhook_tolerance,
                clock.clone(),
            ));
        }
        None => warn!("STRIPE_WEBHOOK_SECRET is not set; webhooks will be refused"),
    }

    let mut state = AppState::new(
        cars,
        auth,
        workflow,
        review_service,
        Arc::new(PostgresProbe::new(pool.clone())),
    );
    if config.server.metrics_enabled {
        state = state.with_metrics(car_rental::metrics::install_recorder()?);
        info!("Prometheus metrics enabled at /metrics");
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!(address = %config.bind_address(), "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(
        timeout_secs = config.server.shutdown_timeout,
        "Server stopped, closing database pool"
    );
    if tokio::time::timeout(
        Duration::from_secs(config.server.shutdown_timeout),
        pool.close(),
    )
    .await
    .is_err()
    {
        warn!("Database pool did not close within the shutdown timeout");
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
