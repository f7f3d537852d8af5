//! A generic HTTP chat-completion backend.
//!
//! `HttpBackend` targets whatever shape of chat-completion API an operator
//! points it at by taking a request-builder and a response-parser closure
//! rather than hard-coding a vendor payload. [`HttpBackend::openai_compatible`]
//! and [`HttpBackend::anthropic`] cover the two shapes MIESC ships with;
//! anything else (a local Ollama server, a custom gateway) can be wired up
//! with [`HttpBackend::new`] directly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{GenerateOptions, LlmBackend};
use crate::error::LlmError;

/// Builds the JSON request body for a single `generate` call.
pub type HttpRequestBuilder = Arc<dyn Fn(&str, &GenerateOptions) -> Value + Send + Sync>;

/// Extracts the completion text from a successful JSON response, or an
/// [`LlmError::InvalidResponse`] if the response doesn't have the expected
/// shape.
pub type HttpResponseParser = Arc<dyn Fn(&Value) -> Result<String, LlmError> + Send + Sync>;

/// A chat-completion backend reachable over HTTP.
pub struct HttpBackend {
    name: String,
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
    build_request: HttpRequestBuilder,
    parse_response: HttpResponseParser,
}

impl HttpBackend {
    /// Builds a backend against an arbitrary chat-completion endpoint.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        build_request: HttpRequestBuilder,
        parse_response: HttpResponseParser,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            api_key,
            client: reqwest::Client::new(),
            build_request,
            parse_response,
        }
    }

    /// An OpenAI-shaped `/chat/completions` endpoint (also served by most
    /// local model runners in "OpenAI compatibility mode", e.g. Ollama,
    /// vLLM, LM Studio).
    #[must_use]
    pub fn openai_compatible(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        let build_request: HttpRequestBuilder = Arc::new(move |prompt, options| {
            serde_json::json!({
                "model": model,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": options.temperature,
                "max_tokens": options.max_tokens,
                "stop": options.stop,
                "seed": options.seed,
            })
        });
        let parse_response: HttpResponseParser = Arc::new(|body| {
            body["choices"][0]["message"]["content"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| {
                    LlmError::InvalidResponse(
                        "missing choices[0].message.content in response".to_string(),
                    )
                })
        });
        Self::new(name, endpoint, api_key, build_request, parse_response)
    }

    /// An Anthropic-shaped `/v1/messages` endpoint.
    #[must_use]
    pub fn anthropic(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        let build_request: HttpRequestBuilder = Arc::new(move |prompt, options| {
            serde_json::json!({
                "model": model,
                "max_tokens": options.max_tokens,
                "temperature": options.temperature,
                "stop_sequences": options.stop,
                "messages": [{"role": "user", "content": prompt}],
            })
        });
        let parse_response: HttpResponseParser = Arc::new(|body| {
            body["content"][0]["text"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| {
                    LlmError::InvalidResponse(
                        "missing content[0].text in response".to_string(),
                    )
                })
        });
        Self::new(name, endpoint, api_key, build_request, parse_response)
    }
}

#[async_trait]
impl LlmBackend for HttpBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
        timeout: Duration,
    ) -> Result<String, LlmError> {
        let body = (self.build_request)(prompt, options);

        let mut request = self.client.post(&self.endpoint).json(&body).timeout(timeout);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(map_request_error)?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(LlmError::RateLimited { retry_after_secs });
        }

        if !response.status().is_success() {
            return Err(LlmError::ConnectionError(format!(
                "backend returned HTTP {}",
                response.status()
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            LlmError::InvalidResponse(format!("response body was not valid JSON: {e}"))
        })?;

        (self.parse_response)(&body)
    }
}

fn map_request_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout(Duration::default())
    } else if err.is_connect() {
        LlmError::ConnectionError(err.to_string())
    } else {
        LlmError::ConnectionError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_request_body_carries_options() {
        let backend = HttpBackend::openai_compatible(
            "gpt",
            "http://localhost:1234/v1/chat/completions",
            None,
            "gpt-4o-mini",
        );
        let options = GenerateOptions {
            temperature: 0.2,
            max_tokens: 256,
            stop: vec!["\n\n".to_string()],
            seed: Some(7),
        };
        let body = (backend.build_request)("audit this contract", &options);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["temperature"], 0.2);
        assert_eq!(body["max_tokens"], 256);
        assert_eq!(body["seed"], 7);
    }

    #[test]
    fn openai_response_parser_extracts_message_content() {
        let backend = HttpBackend::openai_compatible(
            "gpt",
            "http://localhost:1234/v1/chat/completions",
            None,
            "gpt-4o-mini",
        );
        let body = serde_json::json!({
            "choices": [{"message": {"content": "hello"}}]
        });
        assert_eq!((backend.parse_response)(&body).unwrap(), "hello");
    }

    #[test]
    fn anthropic_response_parser_extracts_content_text() {
        let backend = HttpBackend::anthropic(
            "claude",
            "http://localhost:1234/v1/messages",
            None,
            "claude-sonnet",
        );
        let body = serde_json::json!({
            "content": [{"type": "text", "text": "hello"}]
        });
        assert_eq!((backend.parse_response)(&body).unwrap(), "hello");
    }

    #[test]
    fn malformed_response_surfaces_invalid_response_error() {
        let backend = HttpBackend::openai_compatible(
            "gpt",
            "http://localhost:1234/v1/chat/completions",
            None,
            "gpt-4o-mini",
        );
        let body = serde_json::json!({});
        assert!(matches!(
            (backend.parse_response)(&body),
            Err(LlmError::InvalidResponse(_))
        ));
    }
}
