//! Machine translation providers.
//!
//! Every backend implements `TranslationProvider`: plain text in, plain
//! text out. The primary provider is picked by `ProviderKind`; the legacy
//! key-only Google Translate backend is used only when no primary provider
//! is configured.

mod gemini;
mod google;
mod openai;

pub use gemini::GeminiProvider;
pub use google::LegacyGoogleProvider;
pub use openai::OpenAiProvider;

use crate::config::Config;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Primary provider backends, selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Chat-completion style API
    OpenAi,
    /// Generate-content style API
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
        }
    }

    /// Model used when none is configured explicitly.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::Gemini => "gemini-1.5-flash",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown translation provider '{0}'")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderKind {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(UnknownProvider(other.to_string())),
        }
    }
}

/// A machine translation backend.
///
/// Implementations make exactly one HTTP request per call and return an
/// error for transport failures, non-success statuses and responses that
/// carry no text.
pub trait TranslationProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    fn translate<'a>(
        &'a self,
        text: &'a str,
        target_language: &'a str,
    ) -> BoxFuture<'a, Result<String>>;
}

/// HTTP client shared by all providers.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build translation HTTP client")
}

/// Pick the provider the configuration asks for, if any.
pub fn from_config(
    config: &Config,
    client: reqwest::Client,
) -> Option<Arc<dyn TranslationProvider>> {
    if let (Some(kind), Some(api_key)) = (config.ai_provider, config.ai_api_key.as_ref()) {
        info!(
            "Using {} translation provider (model: {})",
            kind.as_str(),
            config.ai_model
        );
        let provider: Arc<dyn TranslationProvider> = match kind {
            ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(
                client,
                &config.openai_api_url,
                api_key,
                &config.ai_model,
            )),
            ProviderKind::Gemini => Arc::new(GeminiProvider::new(
                client,
                &config.gemini_api_url,
                api_key,
                &config.ai_model,
            )),
        };
        return Some(provider);
    }

    if let Some(kind) = config.ai_provider.filter(|_| !config.has_primary_provider()) {
        warn!("AI_PROVIDER is {} but AI_API_KEY is not set", kind.as_str());
    }

    if let Some(api_key) = config.legacy_api_key.as_ref() {
        info!("Using legacy Google Translate provider");
        return Some(Arc::new(LegacyGoogleProvider::new(
            client,
            &config.legacy_api_url,
            api_key,
        )));
    }

    None
}

/// System instructions shared by the LLM-backed providers
pub(crate) fn build_system_prompt(target_language: &str) -> String {
    format!(
        r#"You are a professional website translator. Translate the user's text into the language with ISO code "{}".

Rules:
- Reply with the translation only, no explanations or quotes
- Keep URLs, email addresses, numbers and placeholders such as %s unchanged
- Keep brand and product names unchanged
- Preserve line breaks and punctuation style
- If the text is already in the target language, return it unchanged"#,
        target_language
    )
}
