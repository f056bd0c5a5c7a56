//! URL rewriting between bare content paths and language-prefixed paths.
//!
//! `localize` is used on outgoing links, `delocalize` and
//! `route_for_prefixed_path` on incoming requests. A first path segment
//! that names an active language is always read as a language prefix, even
//! if a top-level page with the same slug exists.

use crate::i18n::detector::first_path_segment;
use crate::i18n::LanguageSet;

/// Path prefixes that belong to the administrative surface.
const ADMIN_PREFIXES: &[&str] = &["/api/", "/admin/", "/wp-admin/", "/wp-json/", "/wp-login.php"];

/// An incoming path that carried a language prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixedRoute {
    /// Language taken from the first path segment
    pub language: String,

    /// Internal content lookup key, e.g. "about" or "blog/post" ("" for home)
    pub content_key: String,

    /// Path with the prefix removed, e.g. "/about/"
    pub bare_path: String,
}

/// A URL split into origin, path and the untouched query/fragment tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct UrlParts<'a> {
    /// "https://example.com" or "" for root-relative URLs
    origin: &'a str,
    path: &'a str,
    /// "?a=1#top", kept verbatim
    tail: &'a str,
}

impl<'a> UrlParts<'a> {
    fn split(url: &'a str) -> Option<Self> {
        let scheme_end = url
            .find("://")
            .filter(|&index| !url[..index].contains(['/', '?', '#']));

        let authority_start = if let Some(index) = scheme_end {
            index + 3
        } else if url.starts_with("//") {
            2
        } else if url.starts_with('/') {
            0
        } else {
            // Relative or non-hierarchical (mailto:, #anchor, page/)
            return None;
        };

        let path_start = if authority_start == 0 {
            0
        } else {
            url[authority_start..]
                .find(['/', '?', '#'])
                .map(|offset| authority_start + offset)
                .unwrap_or(url.len())
        };

        let path_end = url[path_start..]
            .find(['?', '#'])
            .map(|offset| path_start + offset)
            .unwrap_or(url.len());

        Some(Self {
            origin: &url[..path_start],
            path: &url[path_start..path_end],
            tail: &url[path_end..],
        })
    }

    fn with_path(&self, path: &str) -> String {
        format!("{}{}{}", self.origin, path, self.tail)
    }
}

/// Whether a path must never carry a language prefix.
fn is_excluded_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    ADMIN_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix) || lower == prefix.trim_end_matches('/'))
        || lower.contains("sitemap")
        || lower.ends_with(".xml")
        || lower.ends_with(".xsl")
}

/// Whether `path` already starts with the `/{code}` segment.
fn has_prefix(path: &str, code: &str) -> bool {
    path.strip_prefix('/')
        .and_then(|rest| rest.strip_prefix(code))
        .map(|rest| rest.is_empty() || rest.starts_with('/'))
        .unwrap_or(false)
}

/// Insert `/{code}` right after the host of `url`.
///
/// The URL is returned unchanged when `code` is empty, is the default
/// language, is not an active language, when the URL already carries the
/// prefix, points at the admin surface or a sitemap/XML resource, or is not
/// an absolute or root-relative URL. Query and fragment are kept verbatim.
pub fn localize(languages: &LanguageSet, url: &str, code: &str) -> String {
    if code.is_empty() || languages.is_default_code(code) || !languages.is_active_code(code) {
        return url.to_string();
    }

    let Some(parts) = UrlParts::split(url) else {
        return url.to_string();
    };

    if is_excluded_path(parts.path) || has_prefix(parts.path, code) {
        return url.to_string();
    }

    let path = if parts.path.is_empty() { "/" } else { parts.path };
    parts.with_path(&format!("/{}{}", code, path))
}

/// Strip a registered language prefix from `url`.
///
/// Returns the language code (empty if there was none) and the URL with
/// the prefix removed.
pub fn delocalize(languages: &LanguageSet, url: &str) -> (String, String) {
    let Some(parts) = UrlParts::split(url) else {
        return (String::new(), url.to_string());
    };

    match first_path_segment(parts.path) {
        Some(code) if languages.contains(code) && has_prefix(parts.path, code) => {
            let rest = &parts.path[code.len() + 1..];
            let bare = if rest.is_empty() { "/" } else { rest };
            (code.to_string(), parts.with_path(bare))
        }
        _ => (String::new(), url.to_string()),
    }
}

/// Map a language-prefixed request path to its internal content key.
///
/// Only active, non-default languages route; `None` means the path is
/// served as it is.
pub fn route_for_prefixed_path(languages: &LanguageSet, path: &str) -> Option<PrefixedRoute> {
    let code = first_path_segment(path)?;
    if !languages.is_active_code(code) || languages.is_default_code(code) {
        return None;
    }
    if !has_prefix(path, code) {
        return None;
    }

    let (language, bare_path) = delocalize(languages, path);
    let content_key = content_key_for(&bare_path);

    Some(PrefixedRoute {
        language,
        content_key,
        bare_path,
    })
}

/// Content lookup key for a bare path: "/blog/post/" becomes "blog/post".
pub fn content_key_for(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or("");
    path.trim_matches('/').to_string()
}
