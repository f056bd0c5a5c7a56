//! Internationalization (i18n) module: the language routing core.
//!
//! All language configuration, request language detection and URL
//! rewriting lives here. Nothing in this module performs I/O except the
//! registry's settings file.
//!
//! # Architecture
//!
//! - `language`: a single configured language and code validation
//! - `registry`: the language set, its invariants and the shared registry
//! - `detector`: per-request language detection
//! - `rewriter`: `localize` / `delocalize` / prefixed route matching
//! - `validator`: sanity checks on machine translations
//! - `metrics`: resolver counters
//!
//! # Example
//!
//! ```rust,ignore
//! use gst_language_router::i18n::{localize, Language, LanguageSet};
//!
//! let languages = LanguageSet::try_from_languages(vec![
//!     Language::new("en", "English").as_default(),
//!     Language::new("es", "Español"),
//! ])?;
//!
//! assert_eq!(localize(&languages, "/about/", "es"), "/es/about/");
//! ```

pub mod detector;
mod language;
mod metrics;
mod registry;
pub mod rewriter;
mod validator;

pub use detector::{detect, Detection, DetectionInput, DetectionSource};
pub use language::{validate_code, Language};
pub use metrics::{LanguageReport, LookupCounts, MetricsReport, TranslationMetrics};
pub use registry::{LanguageRegistry, LanguageSet, LanguageSettings, RegistryError};
pub use rewriter::{delocalize, localize, route_for_prefixed_path, PrefixedRoute};
pub use validator::{TranslationValidator, ValidationReport};
