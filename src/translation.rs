//! Translation resolver.
//!
//! Resolves a fragment for a target language: store lookup first, then
//! (when enabled) a single provider call whose result is cached as a
//! pending entry. Resolution never fails; the worst case is the original
//! text.
//!
//! Plain text comes back as plain text and the caller escapes it. Markup
//! is resolved one text node at a time, each node being its own store
//! key, and translated nodes are HTML-escaped before they go back in.

use crate::db::{Database, TranslationEntry, TranslationStatus};
use crate::i18n::{TranslationMetrics, TranslationValidator};
use crate::providers::TranslationProvider;
use crate::templates::{escape_html, unescape_html};
use futures::future::join_all;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, warn};

static MARKUP_REGEX: OnceLock<Regex> = OnceLock::new();

/// Tags, plus `<script>`/`<style>` blocks with their content.
fn markup_regex() -> &'static Regex {
    MARKUP_REGEX.get_or_init(|| {
        Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>|<[^>]*>")
            .expect("Invalid markup regex")
    })
}

/// A piece of an HTML fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Markup(&'a str),
    Text(&'a str),
}

fn split_markup(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;
    for m in markup_regex().find_iter(text) {
        if m.start() > last {
            segments.push(Segment::Text(&text[last..m.start()]));
        }
        segments.push(Segment::Markup(m.as_str()));
        last = m.end();
    }
    if last < text.len() {
        segments.push(Segment::Text(&text[last..]));
    }
    segments
}

/// Remove markup from a fragment, returning plain text.
///
/// `<script>` and `<style>` blocks are removed together with their content.
/// Tags become word breaks and whitespace is collapsed, so
/// `<p>Hello</p><p>World</p>` reads "Hello World".
pub fn strip_markup(text: &str) -> String {
    markup_regex()
        .replace_all(text, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Put `translated` in place of the plain text inside `text`.
///
/// Only the first occurrence is replaced. When the plain text does not
/// appear contiguously the original is returned unchanged.
pub fn substitute(text: &str, plain: &str, translated: &str) -> String {
    if plain.is_empty() {
        return text.to_string();
    }
    if text == plain {
        return translated.to_string();
    }
    if text.contains(plain) {
        return text.replacen(plain, translated, 1);
    }
    debug!("Plain text not contiguous in fragment, leaving it untranslated");
    text.to_string()
}

/// Store-backed translation resolver with optional provider fallback.
#[derive(Clone)]
pub struct TranslationResolver {
    store: Database,
    provider: Option<Arc<dyn TranslationProvider>>,
    auto_translate: bool,
    metrics: Arc<TranslationMetrics>,
}

impl TranslationResolver {
    pub fn new(
        store: Database,
        provider: Option<Arc<dyn TranslationProvider>>,
        auto_translate: bool,
        metrics: Arc<TranslationMetrics>,
    ) -> Self {
        Self {
            store,
            provider,
            auto_translate,
            metrics,
        }
    }

    pub fn store(&self) -> &Database {
        &self.store
    }

    pub fn metrics(&self) -> &Arc<TranslationMetrics> {
        &self.metrics
    }

    /// Whether a cache miss may fall through to a provider.
    pub fn can_auto_translate(&self) -> bool {
        self.auto_translate && self.provider.is_some()
    }

    /// Translate `text` into `target_language` for the given context.
    pub async fn resolve(&self, text: &str, target_language: &str, context: &str) -> String {
        if target_language.is_empty() {
            return text.to_string();
        }

        if !markup_regex().is_match(text) {
            let plain = text.trim();
            if plain.is_empty() {
                return text.to_string();
            }
            return match self.resolve_plain(plain, target_language, context).await {
                Some(translated) => substitute(text, plain, &translated),
                None => text.to_string(),
            };
        }

        self.resolve_markup(text, target_language, context).await
    }

    async fn resolve_markup(&self, text: &str, target_language: &str, context: &str) -> String {
        let segments = split_markup(text);

        let mut sources: Vec<String> = Vec::new();
        for segment in &segments {
            if let Segment::Text(raw) = segment {
                let source = unescape_html(raw.trim());
                // Separators, numbers and bare entities stay as they are
                if source.chars().any(char::is_alphabetic) && !sources.contains(&source) {
                    sources.push(source);
                }
            }
        }
        if sources.is_empty() {
            return text.to_string();
        }

        // Distinct nodes are resolved concurrently, so a cold page costs
        // one provider round trip rather than one per paragraph
        let results = join_all(
            sources
                .iter()
                .map(|source| self.resolve_plain(source, target_language, context)),
        )
        .await;
        let translations: HashMap<&str, String> = sources
            .iter()
            .zip(results)
            .filter_map(|(source, result)| result.map(|translated| (source.as_str(), translated)))
            .collect();
        if translations.is_empty() {
            return text.to_string();
        }

        let mut resolved = String::with_capacity(text.len());
        for segment in segments {
            match segment {
                Segment::Markup(markup) => resolved.push_str(markup),
                Segment::Text(raw) => {
                    let node = raw.trim();
                    match translations.get(unescape_html(node).as_str()) {
                        Some(translated) => {
                            resolved.push_str(&substitute(raw, node, &escape_html(translated)))
                        }
                        None => resolved.push_str(raw),
                    }
                }
            }
        }
        resolved
    }

    /// Store lookup, then the provider when enabled.
    async fn resolve_plain(
        &self,
        plain: &str,
        target_language: &str,
        context: &str,
    ) -> Option<String> {
        match self
            .store
            .get_translation(plain, target_language, context)
            .await
        {
            Ok(Some(translated)) => {
                self.metrics.record_cache_hit(target_language);
                return Some(translated);
            }
            Ok(None) => self.metrics.record_cache_miss(target_language),
            Err(e) => {
                error!("Translation store lookup failed: {:#}", e);
                self.metrics.record_cache_miss(target_language);
            }
        }

        if !self.auto_translate {
            return None;
        }
        self.machine_translate(plain, target_language, context).await
    }

    /// One provider attempt; a usable result is back-filled into the store.
    async fn machine_translate(
        &self,
        plain: &str,
        target_language: &str,
        context: &str,
    ) -> Option<String> {
        let provider = self.provider.as_ref()?;

        self.metrics.record_api_call();
        let translated = match provider.translate(plain, target_language).await {
            Ok(translated) => translated,
            Err(e) => {
                warn!(
                    "{} translation to '{}' failed: {:#}",
                    provider.name(),
                    target_language,
                    e
                );
                self.metrics.record_api_failure();
                return None;
            }
        };

        let report = TranslationValidator::validate(plain, &translated);
        if report.has_errors() {
            warn!(
                "Rejected {} translation to '{}': {}",
                provider.name(),
                target_language,
                report.errors.join(", ")
            );
            self.metrics.record_rejection();
            return None;
        }
        for warning in &report.warnings {
            warn!("Translation to '{}': {}", target_language, warning);
        }

        let entry = TranslationEntry::new(plain, &translated, target_language, context)
            .with_status(TranslationStatus::Pending);
        if let Err(e) = self.store.put_translation(&entry).await {
            error!("Failed to cache translation: {:#}", e);
        }

        Some(translated)
    }
}
