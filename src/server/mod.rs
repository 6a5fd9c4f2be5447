//! HTTP surface: one GET endpoint per resource kind.

mod params;
mod routes;

use axum::routing::get;
use axum::Router;
use color_eyre::{eyre::eyre, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::cache::SqliteStore;
use crate::config::ServerConfig;
use crate::upstream::CachedClient;

/// State shared by every handler.
pub type AppState = Arc<CachedClient<SqliteStore>>;

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/location", get(routes::location))
    .route("/weather", get(routes::weather))
    .route("/events", get(routes::events))
    .route("/event", get(routes::events))
    .route("/yelp", get(routes::yelp))
    .route("/movies", get(routes::movies))
    .route("/movie", get(routes::movies))
    .route("/trails", get(routes::trails))
    .fallback(routes::not_found)
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<()> {
  let addr: SocketAddr = format!("{}:{}", config.host, config.port)
    .parse()
    .map_err(|e| eyre!("Invalid bind address {}:{}: {}", config.host, config.port, e))?;

  let listener = TcpListener::bind(&addr)
    .await
    .map_err(|e| eyre!("Failed to bind to {}: {}", addr, e))?;
  info!("Server is listening on {}", addr);

  axum::serve(listener, router(state))
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      info!("Received shutdown signal, stopping server");
    })
    .await
    .map_err(|e| eyre!("Server error: {}", e))?;

  Ok(())
}
