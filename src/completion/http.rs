//! OpenAI-compatible HTTP completion backend

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;

use crate::completion::{CompletionBackend, CompletionError};
use crate::settings::CompletionSettings;

pub struct HttpCompletion {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
}

impl HttpCompletion {
    pub fn new(settings: &CompletionSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }
}

#[async_trait]
impl CompletionBackend for HttpCompletion {
    async fn send(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.endpoint);

        let request_body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": false
        });

        let mut request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(&request_body);

        if let Some(api_key) = &self.api_key {
            if !api_key.is_empty() {
                request = request.header(AUTHORIZATION, format!("Bearer {}", api_key));
            }
        }

        let response = request.send().await.map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!("completion API error ({}): {}", status, error_text);
            return Err(classify_status(status.as_u16(), error_text));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            CompletionError::Permanent(format!("failed to decode completion response: {}", e))
        })?;

        extract_content(&body)
            .ok_or_else(|| CompletionError::Permanent("no content in completion response".into()))
    }
}

/// Network-level failures: timeouts and refused connections are worth a
/// retry, everything else is not.
fn classify_request_error(error: reqwest::Error) -> CompletionError {
    if error.is_timeout() || error.is_connect() {
        CompletionError::Transient(error.to_string())
    } else {
        CompletionError::Permanent(error.to_string())
    }
}

/// Status-level failures: rate limiting and unavailability are transient.
fn classify_status(status: u16, body: String) -> CompletionError {
    let message = format!("API error ({}): {}", status, body);
    match status {
        429 | 502 | 503 | 504 => CompletionError::Transient(message),
        _ => CompletionError::Permanent(message),
    }
}

/// Pull the completion text out of an OpenAI-style response body.
fn extract_content(body: &serde_json::Value) -> Option<String> {
    let content = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())?;

    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_content() {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": "hello" } }]
        });
        assert_eq!(extract_content(&body), Some("hello".to_string()));
    }

    #[test]
    fn test_extract_content_missing_or_empty() {
        assert_eq!(extract_content(&json!({})), None);
        let empty = json!({ "choices": [{ "message": { "content": "" } }] });
        assert_eq!(extract_content(&empty), None);
    }

    #[test]
    fn test_classify_status() {
        assert!(classify_status(429, String::new()).is_transient());
        assert!(classify_status(503, String::new()).is_transient());
        assert!(!classify_status(401, String::new()).is_transient());
        assert!(!classify_status(400, String::new()).is_transient());
    }
}
