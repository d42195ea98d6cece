//! Pluggable model provider abstraction
//!
//! This module provides a provider-agnostic interface for model calls.
//!
//! # Architecture
//!
//! - `Provider` trait: defines the interface all providers implement
//! - `ProviderClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Provider implementations: `GeminiBackend`, `GroqBackend`, `MockProvider`
//!
//! Providers differ in capability: Gemini accepts inline images (vision),
//! Groq is text-only and rejects image payloads before any network call.
//!
//! # Configuration
//!
//! Environment variables:
//! - `GEMINI_API_KEY`: enables the Gemini provider
//! - `GEMINI_MODEL`: Gemini model name (default: gemini-1.5-flash)
//! - `GROQ_API_KEY`: enables the Groq provider
//! - `GROQ_MODEL`: Groq model name (default: llama-3.1-8b-instant)

pub mod config;
mod gemini;
mod groq;
mod mock;
pub mod ocr;

pub use config::{Capability, ChainLink, HealthReport, ProviderConfig};
pub use gemini::GeminiBackend;
pub use groq::GroqBackend;
pub use mock::MockProvider;
pub use ocr::{MockOcr, OcrEngine, TesseractOcr};

use async_trait::async_trait;

use crate::error::Result;

/// Trait defining the interface for all model providers
///
/// A provider turns a rendered prompt (plus an optional image) into a
/// raw reply string. Structured-output scraping happens downstream in
/// the pipeline stages, never inside a provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send a prompt (and optional image) and return the raw reply text
    async fn generate(&self, prompt: &str, image: Option<&[u8]>) -> Result<String>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> bool;

    /// Whether the provider accepts image input
    fn supports_vision(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete provider client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum ProviderClient {
    /// Google Gemini (generateContent API, vision-capable)
    Gemini(GeminiBackend),
    /// Groq (OpenAI-compatible chat completions, text-only)
    Groq(GroqBackend),
    /// Scripted provider for testing
    Mock(MockProvider),
}

impl ProviderClient {
    /// Create a Gemini-backed client directly
    pub fn gemini(base_url: &str, api_key: &str, model: &str) -> Self {
        ProviderClient::Gemini(GeminiBackend::new(base_url, api_key, model))
    }

    /// Create a Groq-backed client directly
    pub fn groq(base_url: &str, api_key: &str, model: &str) -> Self {
        ProviderClient::Groq(GroqBackend::new(base_url, api_key, model))
    }

    /// Create a scripted provider for testing
    pub fn mock() -> Self {
        ProviderClient::Mock(MockProvider::new())
    }
}

// Implement Provider for ProviderClient by delegating to the inner provider
#[async_trait]
impl Provider for ProviderClient {
    async fn generate(&self, prompt: &str, image: Option<&[u8]>) -> Result<String> {
        match self {
            ProviderClient::Gemini(p) => p.generate(prompt, image).await,
            ProviderClient::Groq(p) => p.generate(prompt, image).await,
            ProviderClient::Mock(p) => p.generate(prompt, image).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            ProviderClient::Gemini(p) => p.health_check().await,
            ProviderClient::Groq(p) => p.health_check().await,
            ProviderClient::Mock(p) => p.health_check().await,
        }
    }

    fn supports_vision(&self) -> bool {
        match self {
            ProviderClient::Gemini(p) => p.supports_vision(),
            ProviderClient::Groq(p) => p.supports_vision(),
            ProviderClient::Mock(p) => p.supports_vision(),
        }
    }

    fn model(&self) -> &str {
        match self {
            ProviderClient::Gemini(p) => p.model(),
            ProviderClient::Groq(p) => p.model(),
            ProviderClient::Mock(p) => p.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            ProviderClient::Gemini(p) => p.host(),
            ProviderClient::Groq(p) => p.host(),
            ProviderClient::Mock(p) => p.host(),
        }
    }
}
