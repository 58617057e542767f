//! Structured language-model calls.
//!
//! Every call carries a strict JSON schema. The raw reply is parsed into the
//! caller's type and the result is reported as an [`LlmOutcome`], so callers
//! handle transport failures and malformed replies as separate cases.

mod openai;

use std::convert::Infallible;
use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use crate::error::LlmError;
pub use openai::{LlmConfig, OpenAiClient};

/// A single system + user prompt pair constrained by a JSON schema.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRequest {
    pub schema_name: &'static str,
    pub system_prompt: String,
    pub user_prompt: String,
    pub schema: Value,
}

/// Model-facing seam. Implementations only move text; parsing happens in
/// [`generate_structured`].
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send the request and return the raw message content.
    ///
    /// # Errors
    ///
    /// Returns `LlmError` when the model is disabled, unreachable, responds
    /// with a non-success status, or returns no content.
    async fn generate(&self, request: &StructuredRequest) -> Result<String, LlmError>;
}

/// Outcome of a structured call.
#[derive(Debug)]
pub enum LlmOutcome<T> {
    Parsed(T),
    Malformed { raw: String, reason: String },
    Transport(LlmError),
}

/// Strip a Markdown code fence some models wrap around JSON.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Run a structured request and parse the reply into `T`.
pub async fn generate_structured<T>(
    model: &dyn LanguageModel,
    request: &StructuredRequest,
) -> LlmOutcome<T>
where
    T: DeserializeOwned,
{
    generate_checked(model, request, Ok::<T, Infallible>).await
}

/// Run a structured request, parse the reply into `T` and apply a shape check.
///
/// A reply that parses but fails `check` is reported as `Malformed` with the
/// raw text kept.
pub async fn generate_checked<T, U, E, F>(
    model: &dyn LanguageModel,
    request: &StructuredRequest,
    check: F,
) -> LlmOutcome<U>
where
    T: DeserializeOwned,
    E: fmt::Display,
    F: FnOnce(T) -> Result<U, E>,
{
    tracing::debug!(schema = request.schema_name, "sending structured model request");
    let raw = match model.generate(request).await {
        Ok(raw) => raw,
        Err(err) => return LlmOutcome::Transport(err),
    };

    let parsed = serde_json::from_str::<T>(strip_code_fence(&raw)).map_err(|e| e.to_string());
    match parsed.and_then(|value| check(value).map_err(|e| e.to_string())) {
        Ok(value) => LlmOutcome::Parsed(value),
        Err(reason) => LlmOutcome::Malformed { raw, reason },
    }
}
