//! Chat-completions model adapter over HTTP.
//!
//! Speaks the OpenAI-compatible request shape and understands three response
//! envelopes: `choices[0].message.content`, the edge AI REST form
//! `{"result": {"response": ..}}` and the bare binding form `{"response": ..}`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

use super::{LanguageModel, Message, ModelError, ModelResponse};
use crate::sanitize;

/// Default connect timeout for model requests.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error body kept in [`ModelError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

pub struct HttpChatModel {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<SecretString>,
}

impl HttpChatModel {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<SecretString>,
        request_timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| {
                ModelError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
        })
    }
}

#[async_trait]
impl LanguageModel for HttpChatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn invoke(
        &self,
        messages: &[Message],
        max_output_tokens: u32,
    ) -> Result<ModelResponse, ModelError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: max_output_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let started = Instant::now();
        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: sanitize::preview(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        let body: serde_json::Value = response.json().await?;
        debug!(
            model = %self.model,
            messages = messages.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model responded"
        );

        let payload = unwrap_envelope(body)?;
        Ok(ModelResponse::normalize(payload))
    }
}

/// Extracts the model payload from a provider response body.
fn unwrap_envelope(body: serde_json::Value) -> Result<serde_json::Value, ModelError> {
    if let Some(choices) = body.get("choices") {
        return choices
            .get(0)
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .cloned()
            .ok_or_else(|| {
                ModelError::MalformedEnvelope("choices[0].message.content missing".to_string())
            });
    }

    if let Some(response) = body.get("result").and_then(|r| r.get("response")) {
        return Ok(response.clone());
    }

    if let Some(response) = body.get("response") {
        return Ok(response.clone());
    }

    Err(ModelError::MalformedEnvelope(
        "expected a choices, result or response field".to_string(),
    ))
}
