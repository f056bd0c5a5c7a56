//! Resolver counters.
//!
//! One `TranslationMetrics` is created at startup and shared by the
//! resolver and the admin API. Store lookups are counted per target
//! language so the admin UI can see which languages still depend on the
//! provider.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct TranslationMetrics {
    lookups: Mutex<BTreeMap<String, LookupCounts>>,
    provider_calls: AtomicUsize,
    provider_failures: AtomicUsize,
    /// Provider answers discarded by validation
    rejected: AtomicUsize,
}

/// Store lookups for one language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LookupCounts {
    pub hits: usize,
    pub misses: usize,
}

impl LookupCounts {
    fn hit_rate(&self) -> f64 {
        percentage(self.hits, self.hits + self.misses)
    }
}

impl TranslationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self, language: &str) {
        self.with_language(language, |counts| counts.hits += 1);
    }

    pub fn record_cache_miss(&self, language: &str) {
        self.with_language(language, |counts| counts.misses += 1);
    }

    pub fn record_api_call(&self) {
        self.provider_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_api_failure(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn with_language(&self, language: &str, update: impl FnOnce(&mut LookupCounts)) {
        let mut lookups = self.lookups.lock().unwrap_or_else(PoisonError::into_inner);
        update(lookups.entry(language.to_string()).or_default());
    }

    fn totals(&self) -> LookupCounts {
        let lookups = self.lookups.lock().unwrap_or_else(PoisonError::into_inner);
        lookups
            .values()
            .fold(LookupCounts::default(), |total, counts| LookupCounts {
                hits: total.hits + counts.hits,
                misses: total.misses + counts.misses,
            })
    }

    pub fn cache_hits(&self) -> usize {
        self.totals().hits
    }

    pub fn cache_misses(&self) -> usize {
        self.totals().misses
    }

    pub fn api_calls(&self) -> usize {
        self.provider_calls.load(Ordering::Relaxed)
    }

    pub fn api_failures(&self) -> usize {
        self.provider_failures.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn report(&self) -> MetricsReport {
        let by_language = self
            .lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(language, counts)| {
                (
                    language.clone(),
                    LanguageReport {
                        hits: counts.hits,
                        misses: counts.misses,
                        hit_rate: counts.hit_rate(),
                    },
                )
            })
            .collect();

        let totals = self.totals();
        let calls = self.api_calls();
        let failures = self.api_failures();
        let usable = calls.saturating_sub(failures + self.rejected());

        MetricsReport {
            cache_hits: totals.hits,
            cache_misses: totals.misses,
            cache_hit_rate: totals.hit_rate(),
            api_calls: calls,
            api_failures: failures,
            rejected_translations: self.rejected(),
            api_success_rate: percentage(usable, calls),
            by_language,
        }
    }
}

/// Share of `part` in `whole`, 0-100; zero when nothing was counted.
fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageReport {
    pub hits: usize,
    pub misses: usize,
    pub hit_rate: f64,
}

/// Snapshot served by `GET /api/translations/metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub cache_hit_rate: f64,
    pub api_calls: usize,
    pub api_failures: usize,
    pub rejected_translations: usize,

    /// Provider calls that produced a cached translation, 0-100
    pub api_success_rate: f64,

    pub by_language: BTreeMap<String, LanguageReport>,
}
