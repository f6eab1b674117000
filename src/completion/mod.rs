//! Completion service integration
//!
//! The outbound dependency is modeled as a small capability trait so the
//! retry policy and response handling are testable against a substitute
//! backend with no network involved.

pub mod http;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use http::HttpCompletion;
pub use retry::{send_with_retry, RetryPolicy};

/// Completion errors, tagged by whether a retry could help.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The service signalled overload, unavailability, or rate limiting
    #[error("completion service unavailable: {0}")]
    Transient(String),

    /// Anything else; retrying will not help
    #[error("completion request failed: {0}")]
    Permanent(String),
}

impl CompletionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, CompletionError::Transient(_))
    }
}

/// The external text-completion capability: one prompt in, raw text out.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn send(&self, prompt: &str) -> Result<String, CompletionError>;
}

// ============================================================================
// Answer Payload
// ============================================================================

/// The structured answer relayed to clients. Every query response carries
/// this shape, whether the completion service cooperated or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnswerPayload {
    pub answer: String,
    pub insights: Vec<Value>,
    pub recommendations: Vec<Value>,
    pub calculations: Map<String, Value>,
    pub visualizations: Vec<Value>,
    pub confidence: String,
    pub follow_up_questions: Vec<Value>,
    /// Anything else the model volunteered (risks, benchmarks, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for AnswerPayload {
    fn default() -> Self {
        Self {
            answer: String::new(),
            insights: Vec::new(),
            recommendations: Vec::new(),
            calculations: Map::new(),
            visualizations: Vec::new(),
            confidence: "medium".to_string(),
            follow_up_questions: Vec::new(),
            extra: Map::new(),
        }
    }
}

/// Parse raw completion text into an answer payload.
///
/// Strips one optional enclosing fenced code block, then parses as JSON.
/// Text that does not parse becomes the fallback payload: the cleaned text
/// as the answer, empty collections, medium confidence. A malformed
/// response is never an error.
pub fn parse_payload(raw: &str) -> AnswerPayload {
    let cleaned = strip_code_fence(raw);
    serde_json::from_str::<AnswerPayload>(cleaned).unwrap_or_else(|_| AnswerPayload {
        answer: cleaned.to_string(),
        ..AnswerPayload::default()
    })
}

/// Extract the body of the first fenced code block, tolerating a `json`
/// info string with or without a following newline. Text without a closed
/// fence is returned trimmed and otherwise untouched.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(start) = trimmed.find("```") {
        let mut body = &trimmed[start + 3..];
        if let Some(rest) = body.strip_prefix("json") {
            body = rest;
        }
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }
    trimmed
}
