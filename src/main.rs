//! EduPractica · Progressive Unlock & Mastery Analytics Backend
//!
//! - Axum HTTP API for stage progress, attempts, hints, and analytics
//! - In-memory stores with lock-scoped transactional semantics
//! - Content catalog from TOML with built-in seed fallback
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   CONTENT_CONFIG_PATH : path to TOML content catalog (stages + hints)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod seeds;
mod content;
mod state;
mod protocol;
mod progress;
mod ledger;
mod analytics;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (content catalog + in-memory stores).
  let state = Arc::new(AppState::new());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "edupractica_backend", %addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
