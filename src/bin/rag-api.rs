//! RAG API server binary.
//!
//! Loads configuration from the environment, wires the identity provider and
//! inference clients into the router and serves HTTP with graceful shutdown.

use anyhow::Result;
use rag_api::{
    config::Config,
    http::{AppState, build_router},
};
use std::env;

use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "rag_api=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();

    let version = rag_api::config::version()?;

    env::args().for_each(|arg| {
        if arg == "--version" {
            println!("{version}");
            std::process::exit(0);
        }
    });

    tracing::info!(?version, "Starting RAG API");

    let config = Config::new()?;
    tracing::debug!(issuer = ?config.issuer, inference = ?config.inference, "configuration loaded");

    // No client-wide timeout: each client bounds its own calls and streamed
    // bodies must stay open.
    let http_client = reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .build()?;

    let http_port = *config.http_port.as_ref();
    let app = build_router(AppState::new(config, http_client));

    // Setup graceful shutdown
    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    {
        let tracker = tracker.clone();
        let inner_token = token.clone();

        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::spawn(async move {
            tokio::select! {
                () = inner_token.cancelled() => { },
                _ = terminate => {},
                _ = ctrl_c => {},
            }

            tracker.close();
            inner_token.cancel();
        });
    }

    let bind_address = format!("0.0.0.0:{http_port}");
    let listener = TcpListener::bind(&bind_address).await?;

    // Start HTTP server
    {
        let inner_token = token.clone();
        tracker.spawn(async move {
            tracing::info!("Starting server on {bind_address}");

            let shutdown_token = inner_token.clone();
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    tokio::select! {
                        () = shutdown_token.cancelled() => { }
                    }
                    tracing::info!("axum graceful shutdown complete");
                })
                .await;
            if let Err(err) = result {
                tracing::error!("axum task failed: {}", err);
            }

            inner_token.cancel();
        });
    }

    tracker.wait().await;

    Ok(())
}
