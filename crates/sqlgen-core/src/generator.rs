//! Client for the Ollama-style `/api/generate` endpoint.
//!
//! The endpoint streams newline-delimited JSON objects, each carrying one
//! `response` text fragment. The fragments are concatenated in order and the
//! result is passed through [`clean`].

use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::cleaner::clean;
use crate::error::PipelineError;
use crate::schema::SchemaMap;

/// Instruction appended to every prompt.
pub const SQL_ONLY_INSTRUCTION: &str =
    "Give me only the SQL Server 2016 query, without any extra words or explanation.";

/// Longest slice of an error body echoed back in a message.
const ERROR_BODY_PREVIEW: usize = 512;

/// Where and how to reach the text-generation server.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Base URL, e.g. `"http://127.0.0.1:11434"`. `/api/generate` is appended.
    pub base_url: String,
    /// Model identifier passed through verbatim.
    pub model: String,
    /// Upper bound on the streamed body; larger responses are rejected.
    pub max_response_bytes: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_owned(),
            model: "qwen2.5-coder:latest".to_owned(),
            max_response_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

/// Turns a prompt plus schema into a cleaned SQL statement.
#[derive(Debug, Clone)]
pub struct QueryGenerator {
    config: GeneratorConfig,
    client: Client,
}

impl QueryGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let client = Client::builder()
            .user_agent(concat!("sqlgen/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }

    /// Ask the model for a query answering `prompt` over `schema`.
    ///
    /// Issues exactly one POST. Fails with [`PipelineError::Generation`] on
    /// transport errors, non-success statuses, oversized or malformed bodies.
    pub async fn generate_sql(
        &self,
        prompt: &str,
        schema: &SchemaMap,
    ) -> Result<String, PipelineError> {
        let full_prompt = build_prompt(prompt, schema);
        let url = self.endpoint();
        debug!(%url, model = %self.config.model, prompt_len = full_prompt.len(), "requesting generation");

        let resp = self
            .client
            .post(&url)
            .json(&GenerateRequest {
                model: &self.config.model,
                prompt: &full_prompt,
            })
            .send()
            .await
            .map_err(|e| PipelineError::Generation(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        let body = self.read_body(resp).await?;

        if !status.is_success() {
            return Err(PipelineError::Generation(format!(
                "endpoint returned {status}: {}",
                preview(&body)
            )));
        }

        let raw = parse_stream(&body)?;
        debug!(raw_len = raw.len(), "generation finished");
        Ok(clean(&raw))
    }

    async fn read_body(&self, resp: reqwest::Response) -> Result<String, PipelineError> {
        let limit = self.config.max_response_bytes;
        let mut buf: Vec<u8> = Vec::new();
        let mut stream = resp.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                PipelineError::Generation(format!("reading response stream failed: {e}"))
            })?;
            if buf.len() + chunk.len() > limit {
                return Err(PipelineError::Generation(format!(
                    "response exceeded {limit} bytes"
                )));
            }
            buf.extend_from_slice(&chunk);
        }

        String::from_utf8(buf)
            .map_err(|e| PipelineError::Generation(format!("response is not valid UTF-8: {e}")))
    }
}

/// Compose the text sent to the model.
pub fn build_prompt(prompt: &str, schema: &SchemaMap) -> String {
    format!(
        "Database schema:\n{}\n\nPrompt:\n{prompt}\n\n{SQL_ONLY_INSTRUCTION}",
        schema.render()
    )
}

/// Concatenate the `response` fragments of a newline-delimited JSON body.
///
/// Every line must be a JSON object with a string `response` field; the
/// first line that is not fails the whole parse.
pub fn parse_stream(body: &str) -> Result<String, PipelineError> {
    let mut out = String::new();
    for line in body.lines() {
        let value: Value = serde_json::from_str(line).map_err(|e| {
            PipelineError::Generation(format!("malformed stream line {line:?}: {e}"))
        })?;
        let fragment = value
            .as_object()
            .and_then(|obj| obj.get("response"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PipelineError::Generation(format!(
                    "stream line {line:?} is not an object with a string `response`"
                ))
            })?;
        out.push_str(fragment);
    }
    Ok(out)
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(ERROR_BODY_PREVIEW) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    use super::*;

    fn orders_schema() -> SchemaMap {
        [("Orders", "OrderID"), ("Orders", "Amount")]
            .into_iter()
            .collect()
    }

    /// Serve `body` from `POST /api/generate`, recording every request payload.
    async fn spawn_stub(status: StatusCode, body: &'static str) -> (String, Arc<Mutex<Vec<Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let app = Router::new().route(
            "/api/generate",
            post(move |Json(req): Json<Value>| {
                let recorder = Arc::clone(&recorder);
                async move {
                    recorder.lock().unwrap().push(req);
                    (status, body)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), seen)
    }

    fn generator(base_url: String) -> QueryGenerator {
        QueryGenerator::new(GeneratorConfig {
            base_url,
            ..GeneratorConfig::default()
        })
    }

    #[test]
    fn prompt_layout() {
        let text = build_prompt("total sales", &orders_schema());
        assert_eq!(
            text,
            format!(
                "Database schema:\nOrders: OrderID, Amount\n\nPrompt:\ntotal sales\n\n{SQL_ONLY_INSTRUCTION}"
            )
        );
    }

    #[test]
    fn stream_fragments_concatenate_in_order() {
        let body = "{\"response\":\"SELECT \",\"done\":false}\n{\"response\":\"1\",\"done\":true}\n";
        assert_eq!(parse_stream(body).unwrap(), "SELECT 1");
    }

    #[test]
    fn blank_line_inside_stream_fails() {
        let body = "{\"response\":\"SELECT \"}\n\n{\"response\":\"1\"}";
        let err = parse_stream(body).unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
    }

    #[test]
    fn trailing_newline_is_not_a_blank_line() {
        assert_eq!(parse_stream("{\"response\":\"SELECT 1\"}\n").unwrap(), "SELECT 1");
    }

    #[test]
    fn array_line_is_rejected() {
        let err = parse_stream("[\"SELECT 1\"]").unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
    }

    #[test]
    fn non_string_response_is_rejected() {
        let err = parse_stream("{\"response\":5}").unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
    }

    #[test]
    fn invalid_line_fails_without_partial_output() {
        let body = "{\"response\":\"SELECT \"}\nnot json\n{\"response\":\"1\"}";
        let err = parse_stream(body).unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
        assert!(err.to_string().contains("not json"));
    }

    #[test]
    fn missing_response_field_fails() {
        let err = parse_stream("{\"error\":\"model not found\"}").unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
        assert!(err.to_string().contains("model not found"));
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(ERROR_BODY_PREVIEW + 10);
        assert_eq!(preview(&long).chars().count(), ERROR_BODY_PREVIEW);
        assert_eq!(preview("short"), "short");
    }

    #[tokio::test]
    async fn generate_posts_model_and_prompt_then_cleans() {
        let (url, seen) = spawn_stub(
            StatusCode::OK,
            "{\"response\":\"```sql\\nSELECT \"}\n{\"response\":\"* FROM [Orders]\\n```\"}\n",
        )
        .await;

        let sql = generator(url)
            .generate_sql("show all orders", &orders_schema())
            .await
            .unwrap();
        assert_eq!(sql, "SELECT * FROM Orders");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["model"], "qwen2.5-coder:latest");
        let prompt = seen[0]["prompt"].as_str().unwrap();
        assert!(prompt.contains("Orders: OrderID, Amount"));
        assert!(prompt.contains("Prompt:\nshow all orders"));
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url_is_tolerated() {
        let (url, seen) = spawn_stub(StatusCode::OK, "{\"response\":\"SELECT 1\"}").await;
        let sql = generator(format!("{url}/"))
            .generate_sql("one", &SchemaMap::new())
            .await
            .unwrap();
        assert_eq!(sql, "SELECT 1");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_stream_is_a_generation_error() {
        let (url, _) = spawn_stub(StatusCode::OK, "{\"response\":\"SELECT \"}\n{oops}\n").await;
        let err = generator(url)
            .generate_sql("x", &orders_schema())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
        assert!(err.to_string().contains("{oops}"));
    }

    #[tokio::test]
    async fn error_status_is_reported_with_body() {
        let (url, _) = spawn_stub(StatusCode::NOT_FOUND, "{\"error\":\"model 'x' not found\"}").await;
        let err = generator(url)
            .generate_sql("x", &orders_schema())
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("404"), "{msg}");
        assert!(msg.contains("not found"), "{msg}");
    }

    #[tokio::test]
    async fn oversized_response_is_rejected() {
        let (url, _) = spawn_stub(StatusCode::OK, "{\"response\":\"SELECT 1234567890\"}").await;
        let err = QueryGenerator::new(GeneratorConfig {
            base_url: url,
            max_response_bytes: 8,
            ..GeneratorConfig::default()
        })
        .generate_sql("x", &orders_schema())
        .await
        .unwrap_err();
        assert!(err.to_string().contains("exceeded 8 bytes"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_generation_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = generator(format!("http://{addr}"))
            .generate_sql("x", &orders_schema())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
    }
}
