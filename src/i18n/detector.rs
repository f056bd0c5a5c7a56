//! Language detection for a single request.
//!
//! Precedence, first match wins:
//! 1. language already resolved by route matching
//! 2. first path segment naming an active language
//! 3. `lang` query parameter naming any registered language
//! 4. language cookie
//! 5. default language (possibly none)

use crate::i18n::LanguageSet;

/// Name of the cookie that remembers the last detected language.
pub const LANGUAGE_COOKIE: &str = "gst_current_language";

/// Lifetime of the language cookie.
pub const LANGUAGE_COOKIE_MAX_AGE_DAYS: i64 = 30;

/// Query parameter that selects a language explicitly.
pub const LANGUAGE_QUERY_PARAM: &str = "lang";

/// The parts of a request the detector looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectionInput<'a> {
    /// Language extracted by the URL rewriter during route matching
    pub routed_language: Option<&'a str>,

    /// Request path, e.g. "/es/about/"
    pub path: &'a str,

    /// Raw query string without the leading '?'
    pub query: Option<&'a str>,

    /// Value of the language cookie, if sent
    pub cookie_language: Option<&'a str>,
}

/// Where a detected language came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    Route,
    PathPrefix,
    QueryParam,
    Cookie,
    Default,
    /// No languages are configured at all
    Unconfigured,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Detected language code; empty when nothing applies
    pub language: String,
    pub source: DetectionSource,
}

impl Detection {
    /// Whether the language cookie should be (re)issued for this request.
    ///
    /// Only an explicit choice in the URL refreshes the cookie. A route
    /// match is a path-prefix match resolved earlier in the pipeline.
    pub fn refreshes_cookie(&self) -> bool {
        !self.language.is_empty()
            && matches!(
                self.source,
                DetectionSource::Route | DetectionSource::PathPrefix | DetectionSource::QueryParam
            )
    }
}

/// Determine the language of a request.
pub fn detect(languages: &LanguageSet, input: &DetectionInput<'_>) -> Detection {
    if languages.is_empty() {
        return Detection {
            language: String::new(),
            source: DetectionSource::Unconfigured,
        };
    }

    if let Some(code) = input.routed_language.filter(|code| !code.is_empty()) {
        return found(code, DetectionSource::Route);
    }

    if let Some(segment) = first_path_segment(input.path) {
        if languages.is_active_code(segment) {
            return found(segment, DetectionSource::PathPrefix);
        }
    }

    if let Some(code) = input.query.and_then(query_language) {
        if languages.contains(&code) {
            return found(&code, DetectionSource::QueryParam);
        }
    }

    if let Some(code) = input.cookie_language.map(str::trim) {
        if languages.contains(code) {
            return found(code, DetectionSource::Cookie);
        }
    }

    found(languages.default_code(), DetectionSource::Default)
}

fn found(code: &str, source: DetectionSource) -> Detection {
    Detection {
        language: code.to_string(),
        source,
    }
}

/// First non-empty segment of a path, ignoring any query or fragment.
pub fn first_path_segment(path: &str) -> Option<&str> {
    let path = path.split(['?', '#']).next().unwrap_or("");
    path.split('/').find(|segment| !segment.is_empty())
}

/// Value of the `lang` parameter in a raw query string.
fn query_language(query: &str) -> Option<String> {
    query_param(query, LANGUAGE_QUERY_PARAM)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// First value of `name` in a raw query string, percent-decoded.
///
/// `+` decodes to a space. Pairs that are not valid UTF-8 once decoded
/// are skipped.
pub fn query_param(query: &str, name: &str) -> Option<String> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter_map(|(key, value)| Some((decode_component(key)?, decode_component(value)?)))
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}

fn decode_component(component: &str) -> Option<String> {
    urlencoding::decode(&component.replace('+', " "))
        .ok()
        .map(|decoded| decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Language;

    fn languages() -> LanguageSet {
        LanguageSet::try_from_languages(vec![
            Language::new("en", "English").as_default(),
            Language::new("es", "Español"),
            Language::new("fr", "Français").inactive(),
        ])
        .expect("valid set")
    }

    fn input<'a>(path: &'a str, query: Option<&'a str>, cookie: Option<&'a str>) -> DetectionInput<'a> {
        DetectionInput {
            routed_language: None,
            path,
            query,
            cookie_language: cookie,
        }
    }

    // ==================== Precedence Tests ====================

    #[test]
    fn test_routed_language_wins() {
        let detection = detect(
            &languages(),
            &DetectionInput {
                routed_language: Some("es"),
                path: "/about/",
                query: Some("lang=en"),
                cookie_language: Some("en"),
            },
        );
        assert_eq!(detection.language, "es");
        assert_eq!(detection.source, DetectionSource::Route);
    }

    #[test]
    fn test_path_prefix_detected() {
        let detection = detect(&languages(), &input("/es/about/", None, None));
        assert_eq!(detection.language, "es");
        assert_eq!(detection.source, DetectionSource::PathPrefix);
    }

    #[test]
    fn test_path_prefix_beats_query_and_cookie() {
        let detection = detect(&languages(), &input("/es/about/", Some("lang=en"), Some("en")));
        assert_eq!(detection.language, "es");
    }

    #[test]
    fn test_inactive_path_prefix_ignored() {
        let detection = detect(&languages(), &input("/fr/about/", None, None));
        assert_eq!(detection.language, "en");
        assert_eq!(detection.source, DetectionSource::Default);
    }

    #[test]
    fn test_query_param_detected() {
        let detection = detect(&languages(), &input("/about/", Some("page=2&lang=es"), None));
        assert_eq!(detection.language, "es");
        assert_eq!(detection.source, DetectionSource::QueryParam);
    }

    #[test]
    fn test_query_param_accepts_inactive_language() {
        let detection = detect(&languages(), &input("/about/", Some("lang=fr"), None));
        assert_eq!(detection.language, "fr");
    }

    #[test]
    fn test_query_param_unknown_language_ignored() {
        let detection = detect(&languages(), &input("/about/", Some("lang=de"), Some("es")));
        assert_eq!(detection.language, "es");
        assert_eq!(detection.source, DetectionSource::Cookie);
    }

    #[test]
    fn test_query_param_beats_cookie() {
        let detection = detect(&languages(), &input("/", Some("lang=en"), Some("es")));
        assert_eq!(detection.language, "en");
        assert_eq!(detection.source, DetectionSource::QueryParam);
    }

    #[test]
    fn test_cookie_beats_default() {
        let detection = detect(&languages(), &input("/about/", None, Some("es")));
        assert_eq!(detection.language, "es");
        assert_eq!(detection.source, DetectionSource::Cookie);
    }

    #[test]
    fn test_stale_cookie_falls_back_to_default() {
        let detection = detect(&languages(), &input("/about/", None, Some("ja")));
        assert_eq!(detection.language, "en");
    }

    #[test]
    fn test_default_language_fallback() {
        let detection = detect(&languages(), &input("/about/", None, None));
        assert_eq!(detection.language, "en");
        assert_eq!(detection.source, DetectionSource::Default);
    }

    // ==================== Edge Case Tests ====================

    #[test]
    fn test_no_languages_short_circuits() {
        let detection = detect(
            &LanguageSet::new(),
            &DetectionInput {
                routed_language: Some("es"),
                path: "/es/about/",
                query: Some("lang=es"),
                cookie_language: Some("es"),
            },
        );
        assert_eq!(detection.language, "");
        assert_eq!(detection.source, DetectionSource::Unconfigured);
    }

    #[test]
    fn test_no_active_languages_yields_empty_default() {
        let set = LanguageSet::normalized(vec![Language::new("en", "English").inactive()]);
        let detection = detect(&set, &input("/about/", None, None));
        assert_eq!(detection.language, "");
        assert_eq!(detection.source, DetectionSource::Default);
    }

    #[test]
    fn test_empty_routed_language_is_ignored() {
        let detection = detect(
            &languages(),
            &DetectionInput {
                routed_language: Some(""),
                path: "/es/",
                ..Default::default()
            },
        );
        assert_eq!(detection.source, DetectionSource::PathPrefix);
    }

    #[test]
    fn test_segment_must_match_exactly() {
        let detection = detect(&languages(), &input("/espanol/", None, None));
        assert_eq!(detection.language, "en");
    }

    // ==================== Cookie Refresh Tests ====================

    #[test]
    fn test_refreshes_cookie_only_for_explicit_choices() {
        let set = languages();
        assert!(detect(&set, &input("/es/", None, None)).refreshes_cookie());
        assert!(detect(&set, &input("/", Some("lang=es"), None)).refreshes_cookie());
        assert!(!detect(&set, &input("/", None, Some("es"))).refreshes_cookie());
        assert!(!detect(&set, &input("/", None, None)).refreshes_cookie());
        assert!(!detect(&LanguageSet::new(), &input("/es/", None, None)).refreshes_cookie());
    }

    // ==================== Helper Tests ====================

    #[test]
    fn test_first_path_segment() {
        assert_eq!(first_path_segment("/es/about/"), Some("es"));
        assert_eq!(first_path_segment("es"), Some("es"));
        assert_eq!(first_path_segment("//es//"), Some("es"));
        assert_eq!(first_path_segment("/"), None);
        assert_eq!(first_path_segment(""), None);
        assert_eq!(first_path_segment("/es?x=1"), Some("es"));
    }

    #[test]
    fn test_query_language() {
        assert_eq!(query_language("lang=es").as_deref(), Some("es"));
        assert_eq!(query_language("?a=1&lang=fr&b=2").as_deref(), Some("fr"));
        assert_eq!(query_language("language=es"), None);
        assert_eq!(query_language("lang="), None);
        assert_eq!(query_language(""), None);
    }

    #[test]
    fn test_query_param_is_percent_decoded() {
        assert_eq!(query_param("lang=pt%2Dbr", "lang").as_deref(), Some("pt-br"));
        assert_eq!(query_param("%6Cang=es", "lang").as_deref(), Some("es"));
        assert_eq!(query_param("q=a+b%20c", "q").as_deref(), Some("a b c"));
        // Invalid UTF-8 is skipped, not an error
        assert_eq!(query_param("lang=%FF&lang=es", "lang").as_deref(), Some("es"));
    }

    #[test]
    fn test_encoded_query_language_detected() {
        let languages = LanguageSet::try_from_languages(vec![
            Language::new("en", "English").as_default(),
            Language::new("pt-br", "Português"),
        ])
        .expect("valid set");

        let detection = detect(&languages, &input("/about/", Some("lang=pt%2Dbr"), None));
        assert_eq!(detection.language, "pt-br");
        assert_eq!(detection.source, DetectionSource::QueryParam);
    }
}
