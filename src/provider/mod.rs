//! Generation backends and the registry that orders them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::analysis::AiProvider;
use crate::config::Config;
use crate::prompt::GenerationRequest;
use crate::signals::truncate_chars;

pub mod anthropic;
pub mod google;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use google::GoogleProvider;
pub use openai::ChatCompletionsProvider;

pub(crate) const MAX_OUTPUT_TOKENS: u32 = 4_000;
pub(crate) const TEMPERATURE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    Groq,
    Openai,
    Anthropic,
    Google,
}

impl ProviderName {
    pub fn as_str(&self) -> &'static str {
        AiProvider::from(*self).as_str()
    }
}

impl std::fmt::Display for ProviderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ProviderName> for AiProvider {
    fn from(name: ProviderName) -> Self {
        match name {
            ProviderName::Groq => AiProvider::Groq,
            ProviderName::Openai => AiProvider::Openai,
            ProviderName::Anthropic => AiProvider::Anthropic,
            ProviderName::Google => AiProvider::Google,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    pub name: ProviderName,
    pub supports_vision: bool,
    /// Lower is tried first.
    pub priority: u32,
}

impl ProviderDescriptor {
    pub fn new(name: ProviderName, supports_vision: bool, priority: u32) -> Self {
        Self {
            name,
            supports_vision,
            priority,
        }
    }
}

/// Failure of a single provider call.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    Network(String),
    Timeout,
    Server { status: u16, message: String },
    RateLimited,
    EmptyResponse,
    Auth(String),
    BadRequest { status: u16, message: String },
    InvalidResponse(String),
}

impl ProviderError {
    /// Transient failures are retried; the rest move on to the next provider.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Network(_)
                | ProviderError::Timeout
                | ProviderError::Server { .. }
                | ProviderError::RateLimited
                | ProviderError::EmptyResponse
        )
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::Network(msg) => write!(f, "network error: {msg}"),
            ProviderError::Timeout => write!(f, "request timed out"),
            ProviderError::Server { status, message } => {
                write!(f, "server error {status}: {message}")
            }
            ProviderError::RateLimited => write!(f, "rate limited"),
            ProviderError::EmptyResponse => write!(f, "empty response"),
            ProviderError::Auth(msg) => write!(f, "authentication failed: {msg}"),
            ProviderError::BadRequest { status, message } => {
                write!(f, "request rejected {status}: {message}")
            }
            ProviderError::InvalidResponse(msg) => write!(f, "unexpected response shape: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_decode() {
            ProviderError::InvalidResponse(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// Map a non-success HTTP status to an error kind.
pub fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let message = truncate_chars(body.trim(), 200).to_string();
    match status.as_u16() {
        401 | 403 => ProviderError::Auth(message),
        408 => ProviderError::Timeout,
        429 => ProviderError::RateLimited,
        code if status.is_server_error() => ProviderError::Server {
            status: code,
            message,
        },
        code => ProviderError::BadRequest {
            status: code,
            message,
        },
    }
}

/// A text (and possibly vision) generation backend.
#[async_trait]
pub trait Provider: Send + Sync {
    fn descriptor(&self) -> &ProviderDescriptor;

    /// One attempt. Returns the raw model text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}

/// Ordered, immutable set of active providers.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Sort by priority and keep one provider per name (the earliest wins).
    pub fn new(mut providers: Vec<Arc<dyn Provider>>) -> Self {
        providers.sort_by_key(|p| p.descriptor().priority);
        let mut active: Vec<Arc<dyn Provider>> = Vec::with_capacity(providers.len());
        for p in providers {
            let name = p.descriptor().name;
            if active.iter().any(|a| a.descriptor().name == name) {
                log::warn!("Ignoring duplicate provider registration for {name}");
                continue;
            }
            active.push(p);
        }
        Self { providers: active }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build HTTP adapters for every provider with a configured key.
    pub fn from_config(config: &Config) -> Self {
        let http = http_client(config.provider_timeout());
        let mut providers: Vec<Arc<dyn Provider>> = Vec::new();

        if let Some(settings) = config.groq.active() {
            providers.push(Arc::new(ChatCompletionsProvider::groq(http.clone(), settings)));
        }
        if let Some(settings) = config.openai.active() {
            providers.push(Arc::new(ChatCompletionsProvider::openai(http.clone(), settings)));
        }
        if let Some(settings) = config.anthropic.active() {
            providers.push(Arc::new(AnthropicProvider::new(http.clone(), settings)));
        }
        if let Some(settings) = config.google.active() {
            providers.push(Arc::new(GoogleProvider::new(http, settings)));
        }

        let registry = Self::new(providers);
        if registry.is_empty() {
            log::warn!("No AI provider credentials configured; every request will use fallback data");
        } else {
            log::info!("Active AI providers: {:?}", registry.names());
        }
        registry
    }

    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.providers.iter().map(|p| p.descriptor().clone()).collect()
    }

    pub fn names(&self) -> Vec<ProviderName> {
        self.providers.iter().map(|p| p.descriptor().name).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }
}

/// Shared reqwest client; the timeout applies to every provider call.
pub fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Split an image payload into (media type, base64 data). Raw base64 is
/// assumed to be PNG.
pub(crate) fn split_data_url(image: &str) -> (&str, &str) {
    match image.strip_prefix("data:").and_then(|rest| rest.split_once(',')) {
        Some((meta, data)) => {
            let media = meta.split(';').next().filter(|m| !m.is_empty()).unwrap_or("image/png");
            (media, data)
        }
        None => ("image/png", image),
    }
}

/// Image as a data URL, for APIs that take URLs.
pub(crate) fn as_data_url(image: &str) -> String {
    if image.starts_with("data:") {
        image.to_string()
    } else {
        format!("data:image/png;base64,{image}")
    }
}

/// Treat blank output as a transient failure.
pub(crate) fn non_empty(text: String) -> Result<String, ProviderError> {
    if text.trim().is_empty() {
        Err(ProviderError::EmptyResponse)
    } else {
        Ok(text)
    }
}
