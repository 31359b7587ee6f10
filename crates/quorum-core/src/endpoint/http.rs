//! HTTP model endpoints over reqwest.
//!
//! Three dialects: OpenAI chat-completions (also Groq, Together,
//! OpenRouter, Ollama, LM Studio and custom gateways), Anthropic Messages
//! and Google `generateContent`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{EndpointFactory, ModelEndpoint, ModelReply, ModelSpec, Provider};
use crate::error::{EndpointError, EndpointResult};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 4096;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A model reachable over HTTP.
pub struct HttpModelEndpoint {
    client: reqwest::Client,
    provider: Provider,
    model: String,
    api_key: String,
    base_url: String,
}

impl HttpModelEndpoint {
    pub fn new(client: reqwest::Client, spec: &ModelSpec) -> EndpointResult<Self> {
        let provider: Provider = spec.provider.parse()?;
        let base_url = spec
            .base_url
            .as_deref()
            .or(provider.default_base_url())
            .ok_or_else(|| {
                EndpointError::InvalidConfig(format!(
                    "provider {} requires a base_url",
                    spec.provider
                ))
            })?
            .trim_end_matches('/')
            .to_string();

        if spec.model.trim().is_empty() {
            return Err(EndpointError::InvalidConfig("model must not be empty".into()));
        }

        Ok(Self {
            client,
            provider,
            model: spec.model.clone(),
            api_key: spec.api_key.clone(),
            base_url,
        })
    }

    fn request(&self, system_prompt: &str, user_content: &str, temperature: f32) -> reqwest::RequestBuilder {
        match self.provider {
            Provider::Anthropic => self
                .client
                .post(format!("{}/messages", self.base_url))
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&json!({
                    "model": self.model,
                    "max_tokens": ANTHROPIC_MAX_TOKENS,
                    "temperature": temperature,
                    "system": system_prompt,
                    "messages": [{"role": "user", "content": user_content}],
                })),
            Provider::Google => self
                .client
                .post(format!(
                    "{}/models/{}:generateContent",
                    self.base_url, self.model
                ))
                .header("x-goog-api-key", &self.api_key)
                .json(&json!({
                    "systemInstruction": {"parts": [{"text": system_prompt}]},
                    "contents": [{"role": "user", "parts": [{"text": user_content}]}],
                    "generationConfig": {"temperature": temperature},
                })),
            _ => {
                let builder = self
                    .client
                    .post(format!("{}/chat/completions", self.base_url))
                    .json(&json!({
                        "model": self.model,
                        "temperature": temperature,
                        "messages": [
                            {"role": "system", "content": system_prompt},
                            {"role": "user", "content": user_content},
                        ],
                    }));
                if self.api_key.is_empty() {
                    builder
                } else {
                    builder.bearer_auth(&self.api_key)
                }
            }
        }
    }

    fn extract_text(&self, body: &Value) -> Option<String> {
        let text = match self.provider {
            Provider::Anthropic => body["content"]
                .as_array()?
                .iter()
                .filter_map(|block| block["text"].as_str())
                .collect::<Vec<_>>()
                .join(""),
            Provider::Google => body["candidates"][0]["content"]["parts"]
                .as_array()?
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect::<Vec<_>>()
                .join(""),
            _ => body["choices"][0]["message"]["content"].as_str()?.to_string(),
        };
        (!text.trim().is_empty()).then_some(text)
    }
}

#[async_trait]
impl ModelEndpoint for HttpModelEndpoint {
    async fn call(
        &self,
        system_prompt: &str,
        user_content: &str,
        temperature: f32,
    ) -> EndpointResult<ModelReply> {
        let start = Instant::now();

        let response = self
            .request(system_prompt, user_content, temperature)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EndpointError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await?;
        let text = self
            .extract_text(&body)
            .ok_or(EndpointError::EmptyResponse)?;
        let latency_secs = start.elapsed().as_secs_f64();

        debug!(
            provider = ?self.provider,
            model = %self.model,
            latency_secs,
            "model call completed"
        );

        Ok(ModelReply { text, latency_secs })
    }
}

/// Builds [`HttpModelEndpoint`]s that share one connection pool.
#[derive(Clone)]
pub struct HttpEndpointFactory {
    client: reqwest::Client,
}

impl HttpEndpointFactory {
    pub fn new(request_timeout: Duration) -> EndpointResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| EndpointError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

impl EndpointFactory for HttpEndpointFactory {
    fn endpoint(&self, spec: &ModelSpec) -> EndpointResult<Arc<dyn ModelEndpoint>> {
        Ok(Arc::new(HttpModelEndpoint::new(self.client.clone(), spec)?))
    }
}
