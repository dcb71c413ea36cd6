mod api_client;
mod app;
mod config;
mod coordinator;
mod db_migrations;
mod db_sqlx;
mod error;
mod manifest_store;
mod routes;
mod services;
mod state;
#[cfg(test)]
mod testing;

extern crate self as sqlx;
pub use crate::db_sqlx::{PgPool, Postgres, QueryBuilder, postgres, query, query_as, query_scalar};

use std::sync::Arc;

use cad_shared::SyncMode;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use crate::api_client::HttpDispatchApi;
use crate::coordinator::SyncCoordinator;
use crate::manifest_store::{ManifestStore, MemoryManifestStore, PgManifestStore};
use crate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let db = match config::database_url() {
        Some(database_url) => match connect_database(&database_url).await {
            Some(pool) => Some(pool),
            None => return,
        },
        None => {
            tracing::warn!("DATABASE_URL not set; manifest data is kept in memory only");
            None
        }
    };
    let manifest: Arc<dyn ManifestStore> = match &db {
        Some(pool) => Arc::new(PgManifestStore::new(pool.clone())),
        None => Arc::new(MemoryManifestStore::new()),
    };

    let base_url = config::api_base_url();
    let api = match HttpDispatchApi::new(&base_url, config::api_token()) {
        Ok(api) => api,
        Err(e) => {
            tracing::error!(error = %e, %base_url, "failed to configure dispatch API client");
            return;
        }
    };
    tracing::info!(%base_url, "dispatch API client configured");

    let coordinator = SyncCoordinator::new(
        Arc::new(api),
        manifest,
        config::event_broadcast_buffer(),
    );
    let state = AppState::new(coordinator, db);

    if let Some(patrol_group) = config::initial_patrol_group() {
        tracing::info!(%patrol_group, "syncing patrol group on startup");
        state
            .coordinator
            .restore_sync_mode(SyncMode::patrol_group(patrol_group))
            .await;
    }
    match state.coordinator.sync_initial().await {
        Ok(()) => tracing::info!("initial sync complete"),
        Err(e) => tracing::warn!(error = %e, "initial sync failed; pollers will retry"),
    }

    // Spawn background services
    tokio::spawn(services::sync_poller::run(state.clone()));
    tokio::spawn(services::manifest_loader::run(state.clone()));

    let app = app::build_app(state);

    let addr = format!("0.0.0.0:{}", config::server_port());
    tracing::info!("CAD sync server listening on {addr}");

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

async fn connect_database(database_url: &str) -> Option<PgPool> {
    let db_max_connections = config::db_max_connections();
    tracing::info!(db_max_connections, "Connecting to PostgreSQL...");
    let pool = match PgPoolOptions::new()
        .max_connections(db_max_connections)
        .connect(database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "failed to connect to PostgreSQL");
            return None;
        }
    };
    if let Err(e) = db_migrations::run(&pool).await {
        tracing::error!(error = %e, "failed to run migrations");
        return None;
    }
    tracing::info!("Database connected and migrations applied");
    Some(pool)
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
