//! Language type: a single configured site language.
//!
//! A `Language` is plain configuration data. Whether it may be served, and
//! whether it is the default, is decided by the `LanguageSet` that owns it.

use crate::i18n::RegistryError;
use serde::{Deserialize, Serialize};

/// Shortest accepted language code (e.g. "en").
pub const MIN_CODE_LEN: usize = 2;

/// Longest accepted language code (e.g. "pt-br").
pub const MAX_CODE_LEN: usize = 5;

/// A configured site language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// Short identifier, also used as the URL path segment (e.g. "es")
    pub code: String,

    /// Display name (e.g. "Español")
    pub name: String,

    /// Flag markup: an emoji, inline SVG or HTML snippet
    #[serde(default)]
    pub flag: String,

    /// Country label shown next to the flag
    #[serde(default)]
    pub country: String,

    /// Whether this language is served without a URL prefix
    #[serde(default)]
    pub is_default: bool,

    /// Whether this language can be served at all
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Language {
    /// Create an active, non-default language with no flag or country.
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            flag: String::new(),
            country: String::new(),
            is_default: false,
            active: true,
        }
    }

    /// Builder-style flag setter.
    pub fn with_flag(mut self, flag: &str) -> Self {
        self.flag = flag.to_string();
        self
    }

    /// Builder-style country setter.
    pub fn with_country(mut self, country: &str) -> Self {
        self.country = country.to_string();
        self
    }

    /// Mark this language as the default.
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Mark this language as inactive.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Validate a language code.
///
/// Codes are used verbatim as URL path segments, so they must be short,
/// lowercase ASCII letters/digits with an optional hyphen, and must not
/// start or end with a hyphen.
pub fn validate_code(code: &str) -> Result<(), RegistryError> {
    let len = code.chars().count();
    let well_formed = (MIN_CODE_LEN..=MAX_CODE_LEN).contains(&len)
        && code
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !code.starts_with('-')
        && !code.ends_with('-');

    if well_formed {
        Ok(())
    } else {
        Err(RegistryError::InvalidCode(code.to_string()))
    }
}
