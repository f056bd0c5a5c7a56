use crate::providers::ProviderKind;
use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    pub site_url: String,

    // Storage
    pub database_url: String,
    pub languages_file: String,
    pub content_file: String,

    // Admin API
    pub admin_api_key: Option<String>,

    // Machine translation
    pub auto_translate: bool,
    pub ai_provider: Option<ProviderKind>,
    pub ai_model: String,
    pub ai_api_key: Option<String>,
    pub openai_api_url: String,
    pub gemini_api_url: String,
    pub legacy_api_key: Option<String>,
    pub legacy_api_url: String,
    pub provider_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            site_url: "http://localhost:8080".to_string(),
            database_url: "sqlite://data/translations.db?mode=rwc".to_string(),
            languages_file: "data/languages.json".to_string(),
            content_file: "data/pages.json".to_string(),
            admin_api_key: None,
            auto_translate: false,
            ai_provider: None,
            ai_model: String::new(),
            ai_api_key: None,
            openai_api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            gemini_api_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            legacy_api_key: None,
            legacy_api_url: "https://translation.googleapis.com/language/translate/v2"
                .to_string(),
            provider_timeout_secs: 20,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let ai_provider = match env_opt("AI_PROVIDER") {
            Some(value) => Some(
                value
                    .parse::<ProviderKind>()
                    .context("AI_PROVIDER must be 'openai' or 'gemini'")?,
            ),
            None => None,
        };

        let ai_model = env_opt("AI_MODEL").unwrap_or_else(|| {
            ai_provider
                .map(|kind| kind.default_model().to_string())
                .unwrap_or_default()
        });

        Ok(Self {
            // Server
            port: env_parse("PORT")?.unwrap_or(defaults.port),
            site_url: env_opt("SITE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.site_url),

            // Storage
            database_url: env_opt("DATABASE_URL").unwrap_or(defaults.database_url),
            languages_file: env_opt("LANGUAGES_FILE").unwrap_or(defaults.languages_file),
            content_file: env_opt("CONTENT_FILE").unwrap_or(defaults.content_file),

            // Admin API
            admin_api_key: env_opt("ADMIN_API_KEY"),

            // Machine translation
            auto_translate: env_opt("AUTO_TRANSLATE")
                .map(|v| parse_bool(&v))
                .unwrap_or(defaults.auto_translate),
            ai_provider,
            ai_model,
            ai_api_key: env_opt("AI_API_KEY"),
            openai_api_url: env_opt("OPENAI_API_URL").unwrap_or(defaults.openai_api_url),
            gemini_api_url: env_opt("GEMINI_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.gemini_api_url),
            legacy_api_key: env_opt("LEGACY_TRANSLATE_API_KEY"),
            legacy_api_url: env_opt("LEGACY_TRANSLATE_API_URL").unwrap_or(defaults.legacy_api_url),
            provider_timeout_secs: env_parse("PROVIDER_TIMEOUT_SECS")?
                .unwrap_or(defaults.provider_timeout_secs),
        })
    }

    /// Whether a primary provider has both a backend and a credential.
    pub fn has_primary_provider(&self) -> bool {
        self.ai_provider.is_some() && self.ai_api_key.is_some()
    }
}

/// Read a variable, treating empty values as unset
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_opt(name)
        .map(|v| v.parse::<T>().context(format!("{} has an invalid value: {}", name, v)))
        .transpose()
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
