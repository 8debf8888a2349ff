//! Embedding and chat-completion client for an OpenAI-compatible API.
//!
//! Both services are black boxes behind a request/response contract:
//! texts in → fixed-dimension float vectors out (order preserved), and
//! role-tagged messages in → a single text reply out. Transport and auth
//! failures surface as typed errors; the orchestrator decides how each one
//! degrades.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use courseadvisor_shared::{AdvisorError, ChatMessage, OpenAiConfig, Result};

/// Request timeout for model calls. Generous because completions are slow.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Completion options
// ---------------------------------------------------------------------------

/// Sampling and budget parameters for one completion call.
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    /// Request strict-JSON output. Unused by the advisory prompts, which
    /// expect free text with fixed fallback sentences, but part of the
    /// provider contract.
    pub json_output: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 1.0,
            max_tokens: 500,
            json_output: false,
        }
    }
}

impl CompletionOptions {
    /// Deterministic settings for targeted field extraction.
    pub fn extraction() -> Self {
        Self {
            temperature: 0.0,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the embedding and completion endpoints.
pub struct ModelClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
}

impl ModelClient {
    /// Build a client from the `[openai]` config section, reading the API
    /// key from the configured environment variable.
    pub fn from_config(config: &OpenAiConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            AdvisorError::config(format!(
                "model API key not found. Set the {} environment variable.",
                config.api_key_env
            ))
        })?;
        Self::new(&config.base_url, api_key, &config.chat_model, &config.embedding_model)
    }

    /// Build a client against an explicit base URL (tests point this at a
    /// mock server).
    pub fn new(
        base_url: &str,
        api_key: String,
        chat_model: &str,
        embedding_model: &str,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AdvisorError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            chat_model: chat_model.to_string(),
            embedding_model: embedding_model.to_string(),
        })
    }

    /// Embed `inputs`, returning one vector per input in input order.
    #[instrument(skip_all, fields(inputs = inputs.len()))]
    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: inputs,
        };

        let response: EmbeddingResponse = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AdvisorError::Embedding(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AdvisorError::Embedding(format!("service returned an error: {e}")))?
            .json()
            .await
            .map_err(|e| AdvisorError::Embedding(format!("malformed response: {e}")))?;

        if response.data.len() != inputs.len() {
            return Err(AdvisorError::Embedding(format!(
                "expected {} vectors, got {}",
                inputs.len(),
                response.data.len()
            )));
        }

        // The provider tags each row with its input index; re-sort so the
        // order-preservation contract holds regardless of response order.
        let mut rows = response.data;
        rows.sort_by_key(|r| r.index);
        debug!(vectors = rows.len(), "embeddings received");
        Ok(rows.into_iter().map(|r| r.embedding).collect())
    }

    /// Embed a single query text.
    pub async fn embed_one(&self, input: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[input.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| AdvisorError::Embedding("service returned no vector".into()))
    }

    /// Send a chat completion and return the first choice's text.
    #[instrument(skip_all, fields(messages = messages.len()))]
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages,
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.max_tokens,
            response_format: options.json_output.then_some(ResponseFormat { kind: "json_object" }),
        };

        let response: ChatResponse = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AdvisorError::Completion(format!("request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AdvisorError::Completion(format!("service returned an error: {e}")))?
            .json()
            .await
            .map_err(|e| AdvisorError::Completion(format!("malformed response: {e}")))?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AdvisorError::Completion("response contained no choices".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn chat_request_serializes_without_response_format_by_default() {
        let messages = vec![ChatMessage::user("hello")];
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.7,
            top_p: 1.0,
            max_tokens: 500,
            response_format: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""role":"user"#));
        assert!(!json.contains("response_format"));
    }

    #[test]
    fn chat_request_serializes_json_mode() {
        let messages = vec![ChatMessage::user("hello")];
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: 500,
            response_format: Some(ResponseFormat { kind: "json_object" }),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""response_format":{"type":"json_object"}"#));
    }

    #[tokio::test]
    async fn embed_preserves_input_order() {
        let server = MockServer::start().await;
        // Rows returned out of order; the client must re-sort by index.
        let body = serde_json::json!({
            "data": [
                {"index": 1, "embedding": [1.0, 1.0]},
                {"index": 0, "embedding": [0.0, 0.0]}
            ]
        });
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client =
            ModelClient::new(&server.uri(), "test-key".into(), "chat", "embed").unwrap();
        let vectors = client
            .embed(&["first".into(), "second".into()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![0.0, 0.0], vec![1.0, 1.0]]);
    }

    #[tokio::test]
    async fn embed_count_mismatch_is_an_error() {
        let server = MockServer::start().await;
        let body = serde_json::json!({"data": [{"index": 0, "embedding": [0.5]}]});
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client =
            ModelClient::new(&server.uri(), "test-key".into(), "chat", "embed").unwrap();
        let err = client
            .embed(&["a".into(), "b".into()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected 2 vectors"));
    }

    #[tokio::test]
    async fn complete_returns_first_choice() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "choices": [
                {"message": {"role": "assistant", "content": "Here are three courses."}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ]
        });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client =
            ModelClient::new(&server.uri(), "test-key".into(), "chat", "embed").unwrap();
        let reply = client
            .complete(&[ChatMessage::user("recommend courses")], &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(reply, "Here are three courses.");
    }

    #[tokio::test]
    async fn auth_failure_is_a_completion_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client =
            ModelClient::new(&server.uri(), "bad-key".into(), "chat", "embed").unwrap();
        let err = client
            .complete(&[ChatMessage::user("hi")], &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AdvisorError::Completion(_)));
    }
}
