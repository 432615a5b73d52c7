//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use sqlgen_core::{Database, Pipeline};

use crate::config::Config;
use crate::views::Views;

/// State shared across all HTTP handlers.
///
/// Generic over the database so route tests can swap in a stub.
#[derive(Debug)]
pub struct AppState<D> {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Stateless prompt → rows pipeline.
    pub pipeline: Arc<Pipeline<D>>,
    /// Compiled HTML templates.
    pub views: Arc<Views>,
}

impl<D: Database> AppState<D> {
    pub fn new(config: Config, pipeline: Pipeline<D>, views: Views) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            views: Arc::new(views),
        }
    }
}
