//! Unified server error type.
//!
//! Pipeline failures are not `ServerError`s: they render the error view.
//! `ServerError` covers requests that never reach the pipeline and faults in
//! the server itself. It implements [`axum::response::IntoResponse`] with a
//! minimal HTML body that does not depend on the template engine.
//!
//! Internal errors are logged with full detail; callers only see a generic
//! message.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use minijinja::HtmlEscape;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or incomplete form.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A view failed to render.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::Template(e) => {
                error!(error = %e, "template rendering failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        let body = format!(
            "<!doctype html><title>{}</title><p>{}</p>",
            status.as_u16(),
            HtmlEscape(&client_message)
        );
        (status, Html(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_text(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn bad_request_is_400_with_escaped_message() {
        let resp = ServerError::BadRequest(r#"missing <prompt> & "x""#.into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let html = body_text(resp).await;
        assert!(html.contains("<title>400</title>"));
        assert!(html.contains("missing &lt;prompt&gt; &amp; &quot;x&quot;"));
        assert!(!html.contains("<prompt>"));
    }
}
