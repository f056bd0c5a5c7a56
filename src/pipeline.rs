//! Request pipeline integration.
//!
//! Two middlewares, registered in this order (outermost first):
//!
//! 1. `language_middleware` matches a language prefix, runs detection and
//!    attaches a `RequestContext` to the request. It also refreshes the
//!    language cookie.
//! 2. `canonical_redirect_middleware` adds a trailing slash with a 301,
//!    except for requests under a language prefix.
//!
//! Detection has to happen before the redirect decision, so the router
//! must register them as `.layer(canonical).layer(language)`.

use crate::i18n::detector::{
    first_path_segment, LANGUAGE_COOKIE, LANGUAGE_COOKIE_MAX_AGE_DAYS,
};
use crate::i18n::rewriter::content_key_for;
use crate::i18n::{
    detect, localize, route_for_prefixed_path, Detection, DetectionInput, LanguageSet,
    LanguageSettings,
};
use crate::editor::editor_requested;
use crate::server::AppState;
use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("language already detected for this request")]
    AlreadyDetected,
    #[error("request routed before its language was detected")]
    NotDetected,
    #[error("request already routed")]
    AlreadyRouted,
}

/// Per-request language state: `Unresolved -> Detected -> Routed`.
///
/// Each transition happens at most once. `Routed` is terminal, so the
/// language cannot change after route matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestLanguageState {
    #[default]
    Unresolved,
    Detected(Detection),
    Routed {
        detection: Detection,
        content_key: String,
    },
}

impl RequestLanguageState {
    pub fn detect(self, detection: Detection) -> Result<Self, StateError> {
        match self {
            RequestLanguageState::Unresolved => Ok(RequestLanguageState::Detected(detection)),
            RequestLanguageState::Detected(_) => Err(StateError::AlreadyDetected),
            RequestLanguageState::Routed { .. } => Err(StateError::AlreadyRouted),
        }
    }

    pub fn route(self, content_key: String) -> Result<Self, StateError> {
        match self {
            RequestLanguageState::Detected(detection) => Ok(RequestLanguageState::Routed {
                detection,
                content_key,
            }),
            RequestLanguageState::Unresolved => Err(StateError::NotDetected),
            RequestLanguageState::Routed { .. } => Err(StateError::AlreadyRouted),
        }
    }

    pub fn detection(&self) -> Option<&Detection> {
        match self {
            RequestLanguageState::Unresolved => None,
            RequestLanguageState::Detected(detection)
            | RequestLanguageState::Routed { detection, .. } => Some(detection),
        }
    }

    /// Detected language, or "" before detection
    pub fn language(&self) -> &str {
        self.detection()
            .map(|detection| detection.language.as_str())
            .unwrap_or("")
    }

    pub fn content_key(&self) -> Option<&str> {
        match self {
            RequestLanguageState::Routed { content_key, .. } => Some(content_key),
            _ => None,
        }
    }

    pub fn is_routed(&self) -> bool {
        matches!(self, RequestLanguageState::Routed { .. })
    }
}

/// Everything downstream code needs to know about the request's language.
///
/// Built once per request by `language_middleware` and passed explicitly;
/// there is no global language state.
#[derive(Debug, Clone)]
pub struct RequestContext {
    settings: Arc<LanguageSettings>,
    state: RequestLanguageState,
    editor_mode: bool,
    site_url: String,
    request_path: String,
}

impl RequestContext {
    /// Run route matching and detection for one request.
    pub fn resolve(
        settings: Arc<LanguageSettings>,
        site_url: &str,
        path: &str,
        query: Option<&str>,
        cookie_language: Option<&str>,
    ) -> Result<Self, StateError> {
        let route = route_for_prefixed_path(&settings.languages, path);

        let detection = detect(
            &settings.languages,
            &DetectionInput {
                routed_language: route.as_ref().map(|route| route.language.as_str()),
                path,
                query,
                cookie_language,
            },
        );

        let mut state = RequestLanguageState::Unresolved.detect(detection)?;
        if let Some(route) = route {
            state = state.route(route.content_key)?;
        }

        Ok(Self {
            settings,
            state,
            editor_mode: editor_requested(query),
            site_url: site_url.trim_end_matches('/').to_string(),
            request_path: path.to_string(),
        })
    }

    pub fn languages(&self) -> &LanguageSet {
        &self.settings.languages
    }

    pub fn switcher_enabled(&self) -> bool {
        self.settings.switcher_enabled
    }

    pub fn state(&self) -> &RequestLanguageState {
        &self.state
    }

    pub fn detection(&self) -> Option<&Detection> {
        self.state.detection()
    }

    pub fn current_language(&self) -> &str {
        self.state.language()
    }

    pub fn editor_mode(&self) -> bool {
        self.editor_mode
    }

    /// Path as requested, including any language prefix
    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    /// Whether the request arrived under a language prefix
    pub fn is_prefixed(&self) -> bool {
        self.state.is_routed()
    }

    /// Content lookup key for this request
    pub fn content_key(&self) -> String {
        match self.state.content_key() {
            Some(key) => key.to_string(),
            None => content_key_for(&self.request_path),
        }
    }

    /// Language to translate a page's text into.
    ///
    /// Empty when the page is already written in the current language;
    /// untagged pages are in the default language.
    pub fn translation_language(&self, page_language: Option<&str>) -> &str {
        let current = self.current_language();
        let source = page_language.unwrap_or_else(|| self.languages().default_code());
        if current == source {
            ""
        } else {
            current
        }
    }

    /// Localize an outgoing link into the current language
    pub fn localize(&self, url: &str) -> String {
        localize(self.languages(), url, self.current_language())
    }

    /// Localize an outgoing link into a specific language
    pub fn localize_to(&self, url: &str, code: &str) -> String {
        localize(self.languages(), url, code)
    }

    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.site_url, path)
    }
}

/// The language cookie: 30 days, whole site.
pub fn language_cookie(language: String) -> Cookie<'static> {
    Cookie::build((LANGUAGE_COOKIE, language))
        .path("/")
        .max_age(time::Duration::days(LANGUAGE_COOKIE_MAX_AGE_DAYS))
        .same_site(SameSite::Lax)
        .build()
}

/// Detect the request language and attach a `RequestContext`.
pub async fn language_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let settings = state.registry.snapshot();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(String::from);
    let cookie_language = jar.get(LANGUAGE_COOKIE).map(|cookie| cookie.value().to_string());

    let context = match RequestContext::resolve(
        settings,
        &state.config.site_url,
        &path,
        query.as_deref(),
        cookie_language.as_deref(),
    ) {
        Ok(context) => context,
        Err(e) => {
            error!("Language pipeline failed for {}: {}", path, e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let refresh = context
        .detection()
        .filter(|detection| detection.refreshes_cookie())
        .map(|detection| detection.language.clone());

    if let Some(detection) = context.detection() {
        debug!(
            "{} -> language '{}' via {:?} (content key '{}')",
            path,
            detection.language,
            detection.source,
            context.content_key()
        );
    }

    request.extensions_mut().insert(context);
    let response = next.run(request).await;

    match refresh {
        Some(language) => (jar.add(language_cookie(language)), response).into_response(),
        None => response,
    }
}

/// Add a trailing slash to content URLs, except under a language prefix.
pub async fn canonical_redirect_middleware(request: Request, next: Next) -> Response {
    if !matches!(*request.method(), Method::GET | Method::HEAD) {
        return next.run(request).await;
    }

    let location = request
        .extensions()
        .get::<RequestContext>()
        .and_then(|context| canonical_location(context, request.uri().query()));

    match location {
        Some(location) => {
            debug!("Canonical redirect to {}", location);
            (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
        }
        None => next.run(request).await,
    }
}

/// Redirect target for a non-canonical path, if one applies.
pub fn canonical_location(context: &RequestContext, query: Option<&str>) -> Option<String> {
    if suppresses_canonical_redirect(context) {
        return None;
    }

    let path = context.request_path();
    if path.ends_with('/') {
        return None;
    }
    let last_segment = path.rsplit('/').next().unwrap_or("");
    if last_segment.contains('.') {
        return None;
    }

    // Leading slashes or backslashes would make Location protocol-relative
    let path = format!("/{}", path.trim_start_matches(['/', '\\']));

    Some(match query {
        Some(query) if !query.is_empty() => format!("{}/?{}", path, query),
        _ => format!("{}/", path),
    })
}

/// Language-prefixed requests are served as they are.
fn suppresses_canonical_redirect(context: &RequestContext) -> bool {
    context.is_prefixed()
        || first_path_segment(context.request_path())
            .map(|segment| context.languages().contains(segment))
            .unwrap_or(false)
}
