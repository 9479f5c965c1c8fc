//! Language-model boundary.
//!
//! The pipeline only needs "send these messages, get text or a JSON value back".
//! Provider envelopes are unwrapped by the adapter; whatever payload remains is
//! normalised once into [`ModelResponse`].

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpChatModel;

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A model answer after envelope unwrapping.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    /// The channel already returned a JSON object or array.
    Structured(serde_json::Value),
    /// Free text, possibly fenced or surrounded by commentary.
    Text(String),
}

impl ModelResponse {
    /// Normalises a raw payload: strings become `Text`, objects and arrays
    /// become `Structured`, scalars are rendered as text.
    pub fn normalize(payload: serde_json::Value) -> Self {
        match payload {
            serde_json::Value::String(text) => ModelResponse::Text(text),
            value @ (serde_json::Value::Object(_) | serde_json::Value::Array(_)) => {
                ModelResponse::Structured(value)
            }
            serde_json::Value::Null => ModelResponse::Text(String::new()),
            other => ModelResponse::Text(other.to_string()),
        }
    }

    /// The response as it would appear in a conversation transcript.
    pub fn raw_text(&self) -> String {
        match self {
            ModelResponse::Structured(value) => value.to_string(),
            ModelResponse::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Model response envelope was malformed: {0}")]
    MalformedEnvelope(String),

    #[error("Failed to configure model client: {0}")]
    Configuration(String),
}

/// A chat-style language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Sends one request and returns one response. No streaming.
    async fn invoke(
        &self,
        messages: &[Message],
        max_output_tokens: u32,
    ) -> Result<ModelResponse, ModelError>;
}
