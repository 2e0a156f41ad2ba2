//! Preview image and marketing message generation.
//!
//! Providers are tried in priority order with a uniform per-provider
//! timeout; the local fallbacks at the end of each chain are
//! deterministic and never fail, so order placement is never blocked on
//! a content vendor.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use domain::catalog::{Color, SneakerConfig};
use serde::Deserialize;
use serde_json::json;

use crate::error::FulfillmentError;

/// Default per-provider timeout for generation calls.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Trait for preview image providers.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Produces an image URL (or data URL) for a configuration.
    async fn generate(&self, config: &SneakerConfig) -> Result<String, FulfillmentError>;
}

/// Trait for marketing message providers.
#[async_trait]
pub trait MessageGenerator: Send + Sync {
    /// Produces a short marketing message for a configuration.
    async fn generate(&self, config: &SneakerConfig) -> Result<String, FulfillmentError>;
}

/// Deterministic local placeholder image: an inline SVG swatch keyed on
/// the configured color, labeled with the style.
pub fn fallback_image(config: &SneakerConfig) -> String {
    let fill = match config.color {
        Color::Branco => "#f5f5f5",
        Color::Preto => "#1a1a1a",
        Color::Vermelho => "#c0392b",
        Color::Azul => "#2e5fa3",
    };
    let svg = format!(
        "<svg xmlns='http://www.w3.org/2000/svg' width='320' height='200'>\
         <rect width='320' height='200' fill='{fill}'/>\
         <text x='160' y='108' text-anchor='middle' font-family='sans-serif' \
         font-size='22' fill='#888'>{}</text></svg>",
        config.style.as_str()
    );
    format!("data:image/svg+xml;utf8,{svg}")
}

/// Deterministic local marketing message, keyed on the style.
pub fn fallback_message(config: &SneakerConfig) -> String {
    format!(
        "Seu tênis {} em {} com sola de {} está a caminho!",
        config.style.as_str(),
        config.material.as_str(),
        config.sole.as_str()
    )
}

/// Prioritized image provider chain with a guaranteed local fallback.
#[derive(Clone, Default)]
pub struct ImageChain {
    providers: Vec<Arc<dyn ImageGenerator>>,
    timeout: Option<Duration>,
}

impl ImageChain {
    /// Creates an empty chain that always answers with the local fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider at the current lowest priority.
    pub fn with_provider(mut self, provider: Arc<dyn ImageGenerator>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Overrides the per-provider timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Generates an image, falling through failed or slow providers.
    pub async fn generate(&self, config: &SneakerConfig) -> String {
        let timeout = self.timeout.unwrap_or(DEFAULT_PROVIDER_TIMEOUT);
        for (priority, provider) in self.providers.iter().enumerate() {
            match tokio::time::timeout(timeout, provider.generate(config)).await {
                Ok(Ok(url)) => return url,
                Ok(Err(e)) => {
                    tracing::warn!(priority, error = %e, "image provider failed");
                }
                Err(_) => {
                    tracing::warn!(priority, "image provider timed out");
                }
            }
        }
        fallback_image(config)
    }
}

/// Prioritized message provider chain with a guaranteed local fallback.
#[derive(Clone, Default)]
pub struct MessageChain {
    providers: Vec<Arc<dyn MessageGenerator>>,
    timeout: Option<Duration>,
}

impl MessageChain {
    /// Creates an empty chain that always answers with the local fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider at the current lowest priority.
    pub fn with_provider(mut self, provider: Arc<dyn MessageGenerator>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Overrides the per-provider timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Generates a message, falling through failed or slow providers.
    pub async fn generate(&self, config: &SneakerConfig) -> String {
        let timeout = self.timeout.unwrap_or(DEFAULT_PROVIDER_TIMEOUT);
        for (priority, provider) in self.providers.iter().enumerate() {
            match tokio::time::timeout(timeout, provider.generate(config)).await {
                Ok(Ok(message)) => return message,
                Ok(Err(e)) => {
                    tracing::warn!(priority, error = %e, "message provider failed");
                }
                Err(_) => {
                    tracing::warn!(priority, "message provider timed out");
                }
            }
        }
        fallback_message(config)
    }
}

#[derive(Debug, Default)]
struct InMemoryGeneratorState {
    calls: u32,
    fail: bool,
}

/// In-memory image provider for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryImageGenerator {
    state: Arc<RwLock<InMemoryGeneratorState>>,
}

impl InMemoryImageGenerator {
    /// Creates a new in-memory image provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the provider to fail generation calls.
    pub fn set_fail(&self, fail: bool) {
        self.state.write().unwrap().fail = fail;
    }

    /// Returns the number of generation calls received.
    pub fn call_count(&self) -> u32 {
        self.state.read().unwrap().calls
    }
}

#[async_trait]
impl ImageGenerator for InMemoryImageGenerator {
    async fn generate(&self, config: &SneakerConfig) -> Result<String, FulfillmentError> {
        let mut state = self.state.write().unwrap();
        state.calls += 1;
        if state.fail {
            return Err(FulfillmentError::Provider("image vendor down".to_string()));
        }
        Ok(format!(
            "https://images.test/{}-{}.png",
            config.style.code(),
            config.color.code()
        ))
    }
}

/// In-memory message provider for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessageGenerator {
    state: Arc<RwLock<InMemoryGeneratorState>>,
}

impl InMemoryMessageGenerator {
    /// Creates a new in-memory message provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the provider to fail generation calls.
    pub fn set_fail(&self, fail: bool) {
        self.state.write().unwrap().fail = fail;
    }

    /// Returns the number of generation calls received.
    pub fn call_count(&self) -> u32 {
        self.state.read().unwrap().calls
    }
}

#[async_trait]
impl MessageGenerator for InMemoryMessageGenerator {
    async fn generate(&self, config: &SneakerConfig) -> Result<String, FulfillmentError> {
        let mut state = self.state.write().unwrap();
        state.calls += 1;
        if state.fail {
            return Err(FulfillmentError::Provider(
                "message vendor down".to_string(),
            ));
        }
        Ok(format!("Edição especial {}!", config.style.as_str()))
    }
}

#[derive(Deserialize)]
struct GeneratedContent {
    content: String,
}

/// HTTP-backed image provider client.
#[derive(Clone)]
pub struct HttpImageGenerator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpImageGenerator {
    /// Creates a client against the given vendor base URL.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    async fn generate(&self, config: &SneakerConfig) -> Result<String, FulfillmentError> {
        request_content(&self.client, format!("{}/images", self.base_url), config).await
    }
}

/// HTTP-backed message provider client.
#[derive(Clone)]
pub struct HttpMessageGenerator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMessageGenerator {
    /// Creates a client against the given vendor base URL.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl MessageGenerator for HttpMessageGenerator {
    async fn generate(&self, config: &SneakerConfig) -> Result<String, FulfillmentError> {
        request_content(&self.client, format!("{}/messages", self.base_url), config).await
    }
}

async fn request_content(
    client: &reqwest::Client,
    url: String,
    config: &SneakerConfig,
) -> Result<String, FulfillmentError> {
    let body = json!({
        "style": config.style.as_str(),
        "material": config.material.as_str(),
        "sole": config.sole.as_str(),
        "color": config.color.as_str(),
        "laceDetail": config.lace_detail.as_str(),
    });

    let response = client
        .post(url)
        .json(&body)
        .send()
        .await
        .map_err(|e| FulfillmentError::Provider(e.to_string()))?
        .error_for_status()
        .map_err(|e| FulfillmentError::Provider(e.to_string()))?;

    let content: GeneratedContent = response
        .json()
        .await
        .map_err(|e| FulfillmentError::Provider(e.to_string()))?;

    Ok(content.content)
}
