//! Health / heartbeat endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

/// Register health-check routes.
pub fn router<D: sqlgen_core::Database>() -> Router<Arc<AppState<D>>> {
    Router::new().route("/health", get(get_health::<D>))
}

/// Returns `{"status": "ok", "version": "...", "model": "..."}` with HTTP 200.
///
/// Does not touch the database or the generation endpoint.
pub async fn get_health<D: sqlgen_core::Database>(
    State(state): State<Arc<AppState<D>>>,
) -> Json<Value> {
    Json(health_body(&state.config.generator.model))
}

fn health_body(model: &str) -> Value {
    json!({
        "status":  "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model":   model,
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────────
