//! Provider Factory
//!
//! Picks the LLM backend for the search agent from configuration.

use super::{AnthropicProvider, OpenAIProvider, Provider};
use crate::config::{Config, ProviderConfig};
use anyhow::Result;
use std::sync::Arc;

/// Create the agent's provider.
///
/// A provider marked `enabled` wins. Otherwise the first one with credentials
/// is used, Anthropic before OpenAI.
pub fn create_provider(config: &Config) -> Result<Arc<dyn Provider>> {
    let providers = &config.providers;

    if providers.anthropic.as_ref().is_some_and(|p| p.enabled) {
        tracing::info!("Using enabled provider: Anthropic");
        return try_create_anthropic(providers.anthropic.as_ref())
            .ok_or_else(|| anyhow::anyhow!("Anthropic enabled but no API key configured"));
    }

    if providers.openai.as_ref().is_some_and(|p| p.enabled) {
        tracing::info!("Using enabled provider: OpenAI-compatible");
        return try_create_openai(providers.openai.as_ref())
            .ok_or_else(|| anyhow::anyhow!("OpenAI enabled but neither api_key nor base_url set"));
    }

    if let Some(provider) = try_create_anthropic(providers.anthropic.as_ref()) {
        tracing::info!("Using Anthropic provider");
        return Ok(provider);
    }

    if let Some(provider) = try_create_openai(providers.openai.as_ref()) {
        tracing::info!("Using OpenAI-compatible provider");
        return Ok(provider);
    }

    Err(anyhow::anyhow!(
        "No provider configured. Set ANTHROPIC_API_KEY or OPENAI_API_KEY."
    ))
}

/// Build the chat-completion client used by the question-answering service.
pub fn create_openai_provider(config: &Config) -> Result<OpenAIProvider> {
    try_build_openai(config.providers.openai.as_ref())
        .ok_or_else(|| anyhow::anyhow!("OpenAI API key not configured. Set OPENAI_API_KEY."))
}

fn try_create_anthropic(config: Option<&ProviderConfig>) -> Option<Arc<dyn Provider>> {
    let config = config.filter(|c| c.has_key())?;
    let api_key = config.api_key.as_ref()?.expose_secret().to_string();

    let mut provider = AnthropicProvider::new(api_key);
    if let Some(base_url) = &config.base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    if let Some(model) = &config.default_model {
        tracing::info!("Using custom default model: {}", model);
        provider = provider.with_default_model(model.clone());
    }
    Some(Arc::new(provider))
}

fn try_create_openai(config: Option<&ProviderConfig>) -> Option<Arc<dyn Provider>> {
    try_build_openai(config).map(|p| Arc::new(p) as Arc<dyn Provider>)
}

fn try_build_openai(config: Option<&ProviderConfig>) -> Option<OpenAIProvider> {
    let config = config?;
    let api_key = config
        .api_key
        .as_ref()
        .map(|k| k.expose_secret().to_string());

    let provider = match (&config.base_url, api_key) {
        // Local LLM servers need no key
        (Some(base_url), key) => {
            tracing::info!("Using OpenAI-compatible endpoint at: {}", base_url);
            OpenAIProvider::with_base_url(key.unwrap_or_default(), base_url.clone())
        }
        (None, Some(key)) if !key.trim().is_empty() => OpenAIProvider::new(key),
        _ => return None,
    };

    Some(match &config.default_model {
        Some(model) => provider.with_default_model(model.clone()),
        None => provider,
    })
}
