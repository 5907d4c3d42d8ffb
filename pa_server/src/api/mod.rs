//! HTTP API for the tournament server.
//!
//! This module provides the REST surface over the bracket engine. It is
//! deliberately thin glue: request validation and status-code mapping live
//! here, while every bracket rule lives in `pong_arena`.
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                               - Health check (public)
//! POST /api/v1/tournaments                   - Create tournament + bracket
//! GET  /api/v1/tournaments                   - List tournaments (?status=)
//! GET  /api/v1/tournaments/{id}/bracket      - Bracket with resolved slots
//! GET  /api/v1/tournaments/{id}/standings    - Final standings
//! POST /api/v1/matches/{id}/result           - Submit a match result
//! ```
//!
//! Authentication, sessions, and the realtime game loop that produces
//! results are separate subsystems; this server trusts its callers the
//! way the engine trusts the game subsystem's reported scores.

pub mod request_id;
pub mod tournaments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use pong_arena::TournamentManager;
use pong_arena::store::BracketStore;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; cheap due to the Arc wrappers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<TournamentManager>,
    pub store: Arc<dyn BracketStore>,
    /// Participant cap enforced at the API edge
    pub max_participants: usize,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route(
            "/tournaments",
            post(tournaments::create_tournament).get(tournaments::list_tournaments),
        )
        .route(
            "/tournaments/{tournament_id}/bracket",
            get(tournaments::get_bracket),
        )
        .route(
            "/tournaments/{tournament_id}/standings",
            get(tournaments::get_standings),
        )
        .route("/matches/{match_id}/result", post(tournaments::submit_result));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(
            request_id::request_id_middleware,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Probes the entity store; returns `200 OK` when healthy, otherwise
/// `503 Service Unavailable`.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_healthy = state.store.health_check().await.is_ok();

    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if store_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
