//! The prompt form: `GET /` renders it, `POST /` answers it.
//!
//! A submission runs the whole pipeline. Any pipeline failure renders the
//! error view with the failure text; nothing partial is shown.

use std::sync::Arc;

use axum::extract::{Form, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use sqlgen_core::Database;
use tracing::{debug, warn};

use crate::error::ServerError;
use crate::state::AppState;

/// Register the form routes.
pub fn router<D: Database>() -> Router<Arc<AppState<D>>> {
    Router::new().route("/", get(show_form::<D>).post(submit_prompt::<D>))
}

#[derive(Debug, Deserialize)]
pub struct PromptForm {
    pub prompt: Option<String>,
}

/// `GET /`
pub async fn show_form<D: Database>(
    State(state): State<Arc<AppState<D>>>,
) -> Result<Html<String>, ServerError> {
    Ok(Html(state.views.index()?))
}

/// `POST /`
pub async fn submit_prompt<D: Database>(
    State(state): State<Arc<AppState<D>>>,
    Form(form): Form<PromptForm>,
) -> Result<Html<String>, ServerError> {
    let prompt = form
        .prompt
        .ok_or_else(|| ServerError::BadRequest("missing form field `prompt`".into()))?;

    debug!(prompt_len = prompt.len(), "prompt submitted");

    let page = match state.pipeline.run(&prompt).await {
        Ok(outcome) => state.views.results(&outcome)?,
        Err(e) => {
            warn!(stage = e.stage().as_str(), error = %e, "pipeline failed");
            state.views.error(&e.to_string())?
        }
    };
    Ok(Html(page))
}
