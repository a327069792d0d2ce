//! # Task Assignment API Server
//!
//! Serves registration, login and task management over HTTP, backed by
//! PostgreSQL.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/tasks JWT_SECRET=$(openssl rand -hex 32) \
//!     cargo run -p taskassign-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON log lines.

use std::sync::Arc;

use anyhow::Context;
use taskassign_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskassign_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    notify::{InviteNotifier, LogNotifier, SendGridNotifier, Sender},
    store::PgStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "taskassign_api=debug,taskassign_shared=debug,tower_http=debug";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn notifier(config: &Config) -> Arc<dyn InviteNotifier> {
    match (&config.mail.sendgrid_api_key, &config.mail.sender_email) {
        (Some(api_key), Some(sender_email)) => {
            tracing::info!("Invites will be delivered through SendGrid");
            Arc::new(SendGridNotifier::new(
                api_key,
                Sender {
                    email: sender_email.clone(),
                    name: config.mail.sender_name.clone(),
                },
            ))
        }
        _ => {
            tracing::warn!("SENDGRID_API_KEY not set, invites will only be logged");
            Arc::new(LogNotifier)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    tracing::info!(
        "Task Assignment API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(&DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("failed to run migrations")?;

    let bind_address = config.bind_address();
    let state = AppState::new(
        Arc::new(PgStore::new(pool.clone())),
        notifier(&config),
        Arc::new(mockable::DefaultClock),
        config,
    )?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    Ok(())
}
