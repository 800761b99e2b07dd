//! Widgetgate API server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use widgetgate_api::{
    config::DataStoreKind,
    create_router,
    error::set_redact_internal_errors,
    store::{
        EventStore, LeadStore, MemoryEventStore, MemoryLeadStore, MemoryTenantStore,
        PgEventStore, PgLeadStore, PgTenantStore, TenantStore,
    },
    AppState, Config,
};
use widgetgate_shared::{db, MemoryRateLimitStore, RateLimitStore, RedisRateLimitStore};

/// How often closed rate-limit windows are swept
const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

type Stores = (Arc<dyn TenantStore>, Arc<dyn EventStore>, Arc<dyn LeadStore>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_json);

    set_redact_internal_errors(config.production);

    let (tenants, events, leads) = build_stores(&config).await?;
    let rate_limit_store = build_rate_limit_store(&config).await;

    let bind_address = config.bind_address.clone();
    let state = AppState::new(config, tenants, events, leads, rate_limit_store);

    let limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            limiter.cleanup().await;
        }
    });

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("widgetgate_api=info,widgetgate_shared=info,tower_http=info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn build_stores(config: &Config) -> anyhow::Result<Stores> {
    match (config.data_store, config.database_url.as_deref()) {
        (DataStoreKind::Postgres, Some(url)) => {
            let pool = db::create_pool(url, config.database_max_connections)
                .await
                .context("Failed to connect to database")?;
            db::run_migrations(&pool)
                .await
                .context("Failed to run migrations")?;
            tracing::info!("Using PostgreSQL datastore");
            Ok((
                Arc::new(PgTenantStore::new(pool.clone())),
                Arc::new(PgEventStore::new(pool.clone())),
                Arc::new(PgLeadStore::new(pool)),
            ))
        }
        (DataStoreKind::Postgres, None) => anyhow::bail!("DATABASE_URL is required for postgres"),
        (DataStoreKind::Memory, _) => {
            tracing::info!("Using in-memory datastore");
            Ok((
                Arc::new(MemoryTenantStore::new()),
                Arc::new(MemoryEventStore::new()),
                Arc::new(MemoryLeadStore::new()),
            ))
        }
    }
}

/// Redis when configured and reachable, process-local counters otherwise
async fn build_rate_limit_store(config: &Config) -> Arc<dyn RateLimitStore> {
    if let Some(url) = &config.redis_url {
        match RedisRateLimitStore::connect(url).await {
            Ok(store) => {
                tracing::info!("Rate limit counters shared through Redis");
                return Arc::new(store);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable, using in-process rate limit counters");
            }
        }
    }
    Arc::new(MemoryRateLimitStore::new())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
