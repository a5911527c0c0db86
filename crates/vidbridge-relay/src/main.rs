//! Signaling and room broker process entry point.
//!
//! Loads configuration, connects to the document database, assembles
//! [`AppState`](state::AppState), and serves the merged HTTP/WebSocket
//! router until a shutdown signal arrives.

mod auth;
mod broadcast_registry;
mod chat_relay;
mod config;
mod connection;
mod error;
mod persistence_queue;
mod rate_limit;
mod rest;
mod room_runtime;
mod server;
mod signaling;
mod state;
mod websocket;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use vidbridge_store::{MongoCredentialStore, MongoRoomStore, RoomStore, TokenService};

use config::RelayConfig;
use state::AppState;

#[tokio::main]
async fn main() {
    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("fatal: {err}");
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    let client = match mongodb::Client::with_uri_str(&config.database_uri).await {
        Ok(client) => client,
        Err(err) => {
            tracing::error!(error = %err, "failed to construct database client");
            std::process::exit(1);
        }
    };
    let database = match client.default_database() {
        Some(db) => db,
        None => {
            tracing::error!("DATABASE_URI must name a default database");
            std::process::exit(1);
        }
    };
    if let Err(err) = database.run_command(bson::doc! { "ping": 1 }).await {
        tracing::error!(error = %err, "database unreachable on boot");
        std::process::exit(1);
    }

    let tokens = match TokenService::new(&config.auth_secret) {
        Ok(tokens) => tokens,
        Err(err) => {
            tracing::error!(error = %err, "invalid AUTH_SECRET");
            std::process::exit(1);
        }
    };

    let credentials = Arc::new(MongoCredentialStore::new(database.collection("users"), tokens.clone()));
    let rooms: Arc<dyn RoomStore> = Arc::new(MongoRoomStore::new(database.collection("rooms")));

    let port = config.port;
    let state = AppState::new(config, tokens, credentials, Arc::clone(&rooms));
    tokio::spawn(state.persistence.clone().run(rooms));

    let app = server::build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, port, "failed to bind listener");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "relay listening");

    let result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await;
    if let Err(err) = result {
        tracing::error!(error = %err, "server error");
    }
}

/// Resolves on `SIGINT` or (on Unix) `SIGTERM`, letting `axum::serve` drain
/// in-flight connections before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
