//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - the prompt form at `/` (GET renders it, POST answers it)
//! - the health / heartbeat route
//! - a request body limit and per-request trace-ID injection

mod health;
mod query;

use std::sync::Arc;

use axum::{middleware, Router};
use sqlgen_core::Database;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

use crate::middleware::trace;
use crate::state::AppState;

/// Largest accepted request body. Prompts are short text fields.
pub const MAX_BODY_BYTES: usize = 128 * 1024;

/// Build the complete Axum [`Router`] for the application.
pub fn build<D: Database>(state: Arc<AppState<D>>) -> Router {
    Router::new()
        .merge(query::router())
        .merge(health::router())
        // Outermost layers execute first on the way in.
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(trace::trace_middleware))
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES)),
        )
        .with_state(state)
}
