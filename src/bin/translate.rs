//! Translate binary - resolves one text through the translation store and
//! the configured provider, without running the server
//!
//! Usage:
//!   cargo run --bin translate -- es "Hello world"
//!   cargo run --bin translate -- es "About us" --context title
//!   cargo run --bin translate -- es "Hello" --no-cache   # provider only
//!
//! Uses the same environment variables as the server (DATABASE_URL,
//! AI_PROVIDER, AI_API_KEY, AI_MODEL, LEGACY_TRANSLATE_API_KEY, ...).
//! Provider fallback is always enabled here, regardless of AUTO_TRANSLATE.

use anyhow::{Context, Result};
use gst_language_router::{
    config::Config,
    db::{Database, DEFAULT_CONTEXT},
    i18n::{validate_code, TranslationMetrics, TranslationValidator},
    providers,
    translation::{strip_markup, TranslationResolver},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

struct Args {
    language: String,
    text: String,
    context: String,
    no_cache: bool,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut positional = Vec::new();
        let mut context = DEFAULT_CONTEXT.to_string();
        let mut no_cache = false;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--context" => {
                    context = args.next().context("--context requires a value")?;
                }
                "--no-cache" => no_cache = true,
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let language = positional
            .next()
            .context("Usage: translate <language> <text> [--context <ctx>] [--no-cache]")?;
        let text = positional.collect::<Vec<_>>().join(" ");
        if text.trim().is_empty() {
            anyhow::bail!("Nothing to translate");
        }

        Ok(Self {
            language,
            text,
            context,
            no_cache,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gst_language_router=info".parse()?),
        )
        .init();

    // Load environment from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse()?;
    validate_code(&args.language)?;

    let config = Config::from_env()?;
    let client = providers::build_client(Duration::from_secs(config.provider_timeout_secs))?;
    let provider = providers::from_config(&config, client);

    if args.no_cache {
        let provider = provider.context("No translation provider configured")?;
        let plain = strip_markup(&args.text);
        info!("Translating with {} (no cache)", provider.name());

        let translated = provider.translate(&plain, &args.language).await?;
        let report = TranslationValidator::validate(&plain, &translated);
        for warning in &report.warnings {
            println!("warning: {}", warning);
        }
        for error in &report.errors {
            println!("error: {}", error);
        }
        println!("{}", translated);
        return Ok(());
    }

    let db = Database::new(&config.database_url).await?;
    let metrics = Arc::new(TranslationMetrics::new());
    let resolver = TranslationResolver::new(db, provider, true, Arc::clone(&metrics));

    let translated = resolver
        .resolve(&args.text, &args.language, &args.context)
        .await;
    println!("{}", translated);

    let report = metrics.report();
    info!(
        "cache hits: {}, misses: {}, provider calls: {}, failures: {}",
        report.cache_hits, report.cache_misses, report.api_calls, report.api_failures
    );
    Ok(())
}
