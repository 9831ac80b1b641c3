//! Binary entry point: wires the reference in-memory repositories and
//! default collaborators into an [`Engine`] and serves it over HTTP.

use restmock_dispatch::config::Config;
use restmock_dispatch::http_server;
use restmock_dispatch::pipeline::Engine;
use restmock_dispatch::proxy::HttpProxyClient;
use restmock_dispatch::repository::{
    InMemoryResponseRepository, InMemoryServiceRepository, InMemoryServiceStateRepository,
};
use restmock_dispatch::telemetry::LoggingTelemetrySink;
use restmock_dispatch::template::MinijinjaTemplateEngine;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let engine = Arc::new(Engine {
        services: Arc::new(InMemoryServiceRepository::default()),
        responses: Arc::new(InMemoryResponseRepository::default()),
        state_store: Arc::new(InMemoryServiceStateRepository::default()),
        template_engine: Arc::new(MinijinjaTemplateEngine),
        proxy_client: Arc::new(HttpProxyClient::default()),
        telemetry: Arc::new(LoggingTelemetrySink),
        config: Arc::new(Config::from_env()),
    });

    let router = http_server::router(engine);

    let addr = std::env::var("RESTMOCK_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));

    tracing::info!(%addr, "restmock dispatch engine listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| tracing::error!(error = %e, "server error"));
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
