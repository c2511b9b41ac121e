mod app;
mod auth;
mod config;
mod db_migrations;
mod db_sqlx;
mod routes;
mod state;
mod store;

extern crate self as sqlx;
pub use crate::db_sqlx::{PgPool, postgres, query, query_scalar};

use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;
use crate::store::KvStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let store = match config::database_url() {
        Some(database_url) => {
            let db_max_connections = config::db_max_connections();
            tracing::info!(db_max_connections, "Connecting to PostgreSQL...");
            let db = match PgPoolOptions::new()
                .max_connections(db_max_connections)
                .connect(&database_url)
                .await
            {
                Ok(pool) => pool,
                Err(e) => {
                    tracing::error!(error = %e, "failed to connect to PostgreSQL");
                    return;
                }
            };
            if let Err(e) = db_migrations::run(&db).await {
                tracing::error!(error = %e, "failed to run migrations");
                return;
            }
            tracing::info!("Database connected and migrations applied");
            KvStore::Postgres(db)
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; map colors are kept in memory only");
            KvStore::memory()
        }
    };

    let admin_token = config::admin_token();
    if admin_token.is_none() {
        tracing::warn!("ADMIN_TOKEN is not set; map color edits are disabled");
    }
    let state = AppState::new(store, admin_token);

    let app = app::build_app(state);

    let addr = format!("0.0.0.0:{}", config::server_port());
    tracing::info!(static_dir = %config::static_dir(), "Map explorer server listening on {addr}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, %addr, "failed to bind TCP listener");
            return;
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server failed");
    }

    tracing::info!("Server shut down gracefully");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                return;
            }
        };
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
