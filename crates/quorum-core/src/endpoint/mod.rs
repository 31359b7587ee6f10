//! Model endpoint abstraction.
//!
//! A [`ModelEndpoint`] sends one system prompt plus user content to a model
//! and returns the text with its latency. Endpoints are built per
//! [`ModelSpec`] by an [`EndpointFactory`], which is the seam tests use to
//! script model behaviour.

pub mod http;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EndpointError, EndpointResult};

pub use http::{HttpEndpointFactory, HttpModelEndpoint};

/// Configuration of one worker or judge model.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSpec {
    pub provider: String,
    pub model: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl ModelSpec {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            api_key: String::new(),
            base_url: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// `provider/model`, used in logs and run metadata.
    pub fn label(&self) -> String {
        format!("{}/{}", self.provider, self.model)
    }
}

impl fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSpec")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Wire dialect spoken by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Groq,
    Together,
    OpenRouter,
    Ollama,
    LmStudio,
    Custom,
    Anthropic,
    Google,
}

impl Provider {
    /// Base URL used when the model entry does not override it.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("https://api.openai.com/v1"),
            Provider::Groq => Some("https://api.groq.com/openai/v1"),
            Provider::Together => Some("https://api.together.xyz/v1"),
            Provider::OpenRouter => Some("https://openrouter.ai/api/v1"),
            Provider::Ollama => Some("http://localhost:11434/v1"),
            Provider::LmStudio => Some("http://localhost:1234/v1"),
            Provider::Custom => None,
            Provider::Anthropic => Some("https://api.anthropic.com/v1"),
            Provider::Google => Some("https://generativelanguage.googleapis.com/v1beta"),
        }
    }
}

impl FromStr for Provider {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "groq" => Ok(Provider::Groq),
            "together" => Ok(Provider::Together),
            "openrouter" => Ok(Provider::OpenRouter),
            "ollama" => Ok(Provider::Ollama),
            "lmstudio" => Ok(Provider::LmStudio),
            "custom" => Ok(Provider::Custom),
            "anthropic" => Ok(Provider::Anthropic),
            "google" | "gemini" => Ok(Provider::Google),
            other => Err(EndpointError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Text returned by one model call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub latency_secs: f64,
}

/// One callable model.
#[async_trait]
pub trait ModelEndpoint: Send + Sync {
    async fn call(
        &self,
        system_prompt: &str,
        user_content: &str,
        temperature: f32,
    ) -> EndpointResult<ModelReply>;
}

/// Builds an endpoint for a [`ModelSpec`].
pub trait EndpointFactory: Send + Sync {
    fn endpoint(&self, spec: &ModelSpec) -> EndpointResult<Arc<dyn ModelEndpoint>>;
}
