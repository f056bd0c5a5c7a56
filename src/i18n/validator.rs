//! Translation quality validation module.
//!
//! Machine translations are checked before they are cached. An empty
//! result, or one that introduces HTML tags, is an error and is never
//! stored; elements that should survive
//! translation untouched (URLs, printf-style placeholders, numbers) only
//! produce warnings.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Problems that make the translation unusable
    pub errors: Vec<String>,

    /// Non-critical warnings about potential issues
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

/// Validator for translation quality.
pub struct TranslationValidator;

/// Tokens that must come through translation unchanged, with a label
/// for warnings.
const PRESERVED: &[(&str, &str)] = &[
    ("URL", r#"https?://[^\s)\]"'<>]+"#),
    ("Placeholder", r"%(?:\d+\$)?[sdf]"),
    ("Number", r"\d+"),
];

/// Translations longer than this many times the source are suspicious
/// (usually the model explaining instead of translating).
const MAX_LENGTH_RATIO: usize = 4;

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

static PRESERVED_REGEXES: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();

fn preserved_regexes() -> &'static [(&'static str, Regex)] {
    PRESERVED_REGEXES.get_or_init(|| {
        PRESERVED
            .iter()
            .map(|(label, pattern)| (*label, Regex::new(pattern).unwrap()))
            .collect()
    })
}

impl TranslationValidator {
    /// Validate a machine translation against its source text.
    pub fn validate(original: &str, translated: &str) -> ValidationReport {
        let mut report = ValidationReport::new();

        if translated.trim().is_empty() {
            report.errors.push("Translation is empty".to_string());
            return report;
        }

        let tags = TAG_REGEX.get_or_init(|| Regex::new(r"<[a-zA-Z/!?][^>]*>").unwrap());
        if tags.is_match(translated) && !tags.is_match(original) {
            report
                .errors
                .push("Translation contains markup the original does not".to_string());
            return report;
        }

        for (label, regex) in preserved_regexes() {
            let expected = Self::tokens(regex, original);
            let found = Self::tokens(regex, translated);
            if expected != found {
                report.warnings.push(format!(
                    "{} mismatch: original has {:?}, translation has {:?}",
                    label, expected, found
                ));
            }
        }

        let source_len = original.trim().chars().count();
        let translated_len = translated.trim().chars().count();
        if source_len > 0 && translated_len > source_len.max(10) * MAX_LENGTH_RATIO {
            report.warnings.push(format!(
                "Translation is {} characters for a {} character source",
                translated_len, source_len
            ));
        }

        report
    }

    fn tokens(regex: &Regex, text: &str) -> BTreeSet<String> {
        regex
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    #[cfg(test)]
    fn extract(label: &str, text: &str) -> BTreeSet<String> {
        preserved_regexes()
            .iter()
            .find(|(name, _)| *name == label)
            .map(|(_, regex)| Self::tokens(regex, text))
            .unwrap_or_default()
    }
}
