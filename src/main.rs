mod config;
mod error;
mod handler;
mod model;
mod route;
mod schema;
mod store;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{http::HeaderValue, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    config::{Config, Mode},
    route::{cors_layer, create_router, with_layers, with_static_bundle},
    store::TodoStore,
};

// Struct representing the application state
pub struct AppState {
    store: TodoStore,
}

// Entry point of the application
#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "axum_todo_store=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = start().await {
        tracing::error!("🔥 {:#}", err);
        std::process::exit(1);
    }
}

async fn start() -> anyhow::Result<()> {
    let config = Config::load().context("invalid configuration")?;
    tracing::info!(mode = ?config.mode, "loaded configuration");

    // Connect to the database
    let store = TodoStore::connect(&config.store)
        .await
        .context("failed to connect to the database")?;
    tracing::info!("✅ Connection to the database is successful!");

    // The store is released on every path out of `serve`, including errors
    let result = serve(&config, store.clone()).await;
    store.close().await;
    tracing::info!("database connection closed");
    result
}

async fn serve(config: &Config, store: TodoStore) -> anyhow::Result<()> {
    let app_state = Arc::new(AppState { store });

    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("invalid CORS origin {:?}", config.cors_origin))?;

    let mut app = create_router(app_state);
    if config.mode == Mode::Production {
        tracing::info!(dir = %config.static_dir.display(), "serving front-end bundle");
        app = with_static_bundle(app, &config.static_dir);
    }
    let app = with_layers(app, cors_layer(origin));

    // Specify the address and port to run the server on
    let addr = SocketAddr::new(config.host, config.port);
    let server = Server::try_bind(&addr).with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("🚀 Server started successfully on {}", addr);

    server
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
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

    tracing::warn!("shutdown signal received, draining connections");
}
