//! Stocktrace API library
//!
//! Multi-tenant inventory and bill-of-materials tracking: components, lots,
//! SKUs, BOM versions, an append-only quantity ledger and the transaction
//! engine that writes to it.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod notifications;
pub mod services;

use axum::{extract::State, routing::get, Json, Router};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: services::AppServices,
    pub auth: Arc<auth::AuthService>,
}

/// Assemble the full router: health, auth and the versioned API. The binary
/// and the test harness both go through here so they serve identical routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "stocktrace-api up" }))
        .route("/health", get(health))
        .nest("/auth", handlers::auth::auth_routes())
        .nest("/api/v1", handlers::api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let db_ok = state
        .db
        .execute_unprepared("SELECT 1")
        .await
        .is_ok();

    Json(serde_json::json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "database": db_ok,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
