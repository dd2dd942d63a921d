//! Taskboard server binary.
//!
//! Wires configuration, the Postgres pool, the Redis event bus, the room
//! registry and the WebSocket gateway, then serves until SIGINT/SIGTERM.
//! Shutdown drains in order: stop accepting connections, stop the bus
//! reader, close the pool.

use std::sync::Arc;

use axum::http::HeaderValue;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use taskboard::adapters::auth::JwtTokenVerifier;
use taskboard::adapters::events::RedisEventBus;
use taskboard::adapters::postgres::PgBoardStore;
use taskboard::adapters::websocket::{gateway_router, GatewayState, RoomEventBridge, RoomRegistry};
use taskboard::application::Broadcaster;
use taskboard::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    // Transactional store. Mutation handlers construct the ordering
    // engine over it; the gateway binary only needs the pool for
    // migrations and lifecycle.
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;
    PgBoardStore::new(pool.clone()).run_migrations().await?;

    // Event bus + local fan-out.
    let bus = Arc::new(RedisEventBus::connect(&config.redis).await?);
    let rooms = Arc::new(RoomRegistry::new(config.websocket.channel_capacity));
    let bridge = RoomEventBridge::new_shared(rooms.clone());
    bridge.register(bus.as_ref()).await?;

    let broadcaster = Broadcaster::new(bus.clone());
    let verifier = Arc::new(JwtTokenVerifier::new(&config.auth.token_secret));

    let state = GatewayState::new(verifier, rooms, broadcaster, config.websocket.clone());
    let mut app = gateway_router(state).layer(TraceLayer::new_for_http());

    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    if !origins.is_empty() {
        app = app.layer(CorsLayer::new().allow_origin(AllowOrigin::list(origins)));
    }

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Draining: closing event bus");
    bus.shutdown().await;
    pool.close().await;
    tracing::info!("Shutdown complete");

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone()));

    if config.is_production() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
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

    tracing::info!("Shutdown signal received");
}
