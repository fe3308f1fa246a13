#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Magshelf API Server
//!
//! Serves the magazine catalogue behind the session-cookie auth chain.

use std::net::SocketAddr;
use std::sync::Arc;

use magshelf_api::{
    auth::hash_password,
    config::Config,
    models::CredentialRecord,
    routes::create_router,
    state::AppState,
    store::{
        CredentialStore, InMemoryCredentialStore, InMemoryMagazineStore, MagazineStore,
        PgCredentialStore, PgMagazineStore,
    },
};
use magshelf_shared::{create_pool, run_migrations, RateLimiter};
use tokio::time::{interval, Duration};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,magshelf_api=debug,magshelf_shared=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Magshelf API Server v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    tracing::info!(config = ?config, "Configuration loaded");

    let (credentials, magazines) = build_stores(&config).await?;
    let rate_limiter = build_rate_limiter(&config).await?;

    let state = AppState::new(config.clone(), credentials, magazines, rate_limiter)?;

    let app = create_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

type Stores = (Arc<dyn CredentialStore>, Arc<dyn MagazineStore>);

/// Postgres when DATABASE_URL is set, otherwise process memory
async fn build_stores(config: &Config) -> anyhow::Result<Stores> {
    if let Some(database_url) = &config.database_url {
        tracing::info!("Connecting to database...");
        let pool = create_pool(database_url).await?;
        tracing::info!("Database connection established");

        tracing::info!("Running database migrations...");
        run_migrations(&pool).await?;

        let credentials: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(pool.clone()));
        let magazines: Arc<dyn MagazineStore> = Arc::new(PgMagazineStore::new(pool));
        seed_user(config, credentials.as_ref()).await?;
        return Ok((credentials, magazines));
    }

    tracing::warn!("DATABASE_URL not set, using in-memory stores (data is lost on restart)");
    let credentials: Arc<dyn CredentialStore> = Arc::new(InMemoryCredentialStore::new());
    seed_user(config, credentials.as_ref()).await?;
    Ok((credentials, Arc::new(InMemoryMagazineStore::new())))
}

/// Insert the configured seed account unless it already exists
async fn seed_user(config: &Config, credentials: &dyn CredentialStore) -> anyhow::Result<()> {
    let Some(seed) = &config.seed_user else {
        return Ok(());
    };

    if credentials.find_by_email(&seed.email).await?.is_some() {
        tracing::info!("Seed user already present");
        return Ok(());
    }

    let password_hash = hash_password(&seed.password, &config.password_pepper)?;
    credentials
        .insert(CredentialRecord {
            id: Uuid::new_v4(),
            email: seed.email.clone(),
            name: seed.name.clone(),
            password_hash,
        })
        .await?;

    tracing::info!("Seed user created");
    Ok(())
}

/// Redis when REDIS_URL is set, otherwise in-memory with a periodic purge
async fn build_rate_limiter(config: &Config) -> anyhow::Result<RateLimiter> {
    if let Some(redis_url) = &config.redis_url {
        let limiter = RateLimiter::new_redis(redis_url, config.rate_limit()).await?;
        tracing::info!("Rate limiter backed by Redis");
        return Ok(limiter);
    }

    let limiter = RateLimiter::new_in_memory(config.rate_limit());
    let purger = limiter.clone();
    let every = Duration::from_secs(config.rate_limit_window_secs);
    tokio::spawn(async move {
        let mut interval = interval(every);
        interval.tick().await;
        loop {
            interval.tick().await;
            let purged = purger.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, "Expired rate limit windows purged");
            }
        }
    });
    tracing::info!("Rate limiter held in memory");
    Ok(limiter)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
