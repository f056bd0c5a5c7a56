//! Administrative JSON API.
//!
//! Every route requires `Authorization: Bearer <ADMIN_API_KEY>`. Errors are
//! returned as `{"error": "..."}` with a matching status code; internal
//! failures are logged and reported without details.

use crate::db::{TranslationEntry, TranslationStatus, DEFAULT_CONTEXT};
use crate::i18n::{Language, MetricsReport, RegistryError};
use crate::security::is_authorized;
use crate::server::AppState;
use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Validation(#[from] RegistryError),

    #[error("{0}")]
    Unprocessable(String),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(RegistryError::Io(_) | RegistryError::Serialization(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Validation(_) | ApiError::Unprocessable(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status.is_server_error() {
            match &self {
                ApiError::Internal(e) => error!("Admin API failure: {:#}", e),
                other => error!("Admin API failure: {}", other),
            }
            "internal error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Body of `GET`/`PUT /api/languages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguagesPayload {
    pub languages: Vec<Language>,
    #[serde(default)]
    pub switcher_enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct TranslationFilter {
    pub language: Option<String>,
}

/// Composite key of a stored translation
#[derive(Debug, Deserialize)]
pub struct TranslationKey {
    pub original_text: String,
    pub language: String,
    #[serde(default = "default_context")]
    pub context: String,
}

fn default_context() -> String {
    DEFAULT_CONTEXT.to_string()
}

#[derive(Debug, Deserialize)]
pub struct PageLanguagePayload {
    pub language: Option<String>,
}

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/languages", get(get_languages).put(put_languages))
        .route(
            "/translations",
            get(list_translations)
                .put(put_translation)
                .delete(delete_translation),
        )
        .route("/translations/metrics", get(translation_metrics))
        .route("/pages/:slug/language", put(put_page_language))
        .route_layer(middleware::from_fn_with_state(state, require_admin_key))
}

/// Reject requests without the admin key.
pub async fn require_admin_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !is_authorized(request.headers(), state.config.admin_api_key.as_deref()) {
        warn!("Rejected admin API request to {}", request.uri().path());
        return ApiError::Unauthorized.into_response();
    }
    next.run(request).await
}

async fn get_languages(State(state): State<AppState>) -> Json<LanguagesPayload> {
    let settings = state.registry.snapshot();
    Json(LanguagesPayload {
        languages: settings.languages.iter().cloned().collect(),
        switcher_enabled: settings.switcher_enabled,
    })
}

async fn put_languages(
    State(state): State<AppState>,
    Json(payload): Json<LanguagesPayload>,
) -> ApiResult<Json<LanguagesPayload>> {
    let saved = state
        .registry
        .save(payload.languages, payload.switcher_enabled)?;

    Ok(Json(LanguagesPayload {
        languages: saved.languages.iter().cloned().collect(),
        switcher_enabled: saved.switcher_enabled,
    }))
}

async fn list_translations(
    State(state): State<AppState>,
    Query(filter): Query<TranslationFilter>,
) -> ApiResult<Json<Vec<TranslationEntry>>> {
    let language = filter.language.as_deref().filter(|code| !code.is_empty());
    let entries = state.resolver.store().list_translations(language).await?;
    Ok(Json(entries))
}

async fn put_translation(
    State(state): State<AppState>,
    Json(entry): Json<TranslationEntry>,
) -> ApiResult<Json<TranslationEntry>> {
    if entry.original_text.trim().is_empty() {
        return Err(ApiError::BadRequest("original_text must not be empty".into()));
    }
    if entry.translation.trim().is_empty() {
        return Err(ApiError::BadRequest("translation must not be empty".into()));
    }
    ensure_registered(&state, &entry.language)?;

    // Anything saved by a person is approved
    let entry = entry.with_status(TranslationStatus::Approved);
    state.resolver.store().put_translation(&entry).await?;

    info!(
        "Saved translation for '{}' ({}/{})",
        entry.original_text.chars().take(40).collect::<String>(),
        entry.language,
        entry.context
    );
    Ok(Json(entry))
}

async fn delete_translation(
    State(state): State<AppState>,
    Json(key): Json<TranslationKey>,
) -> ApiResult<StatusCode> {
    let deleted = state
        .resolver
        .store()
        .delete_translation(&key.original_text, &key.language, &key.context)
        .await?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("translation not found".into()))
    }
}

async fn translation_metrics(State(state): State<AppState>) -> Json<MetricsReport> {
    Json(state.resolver.metrics().report())
}

async fn put_page_language(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(payload): Json<PageLanguagePayload>,
) -> ApiResult<StatusCode> {
    let language = payload.language.as_deref().filter(|code| !code.is_empty());
    if let Some(code) = language {
        ensure_registered(&state, code)?;
    }

    if state.content.set_page_language(&slug, language)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("page '{}' not found", slug)))
    }
}

fn ensure_registered(state: &AppState, code: &str) -> ApiResult<()> {
    if state.registry.snapshot().languages.contains(code) {
        Ok(())
    } else {
        Err(ApiError::Unprocessable(format!("unknown language '{}'", code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Validation(RegistryError::DisabledDefault("fr".into())).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_error_message_is_hidden() {
        let response = ApiError::Internal(anyhow::anyhow!("db password wrong")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_languages_payload_switcher_defaults_to_false() {
        let payload: LanguagesPayload =
            serde_json::from_str(r#"{"languages": [{"code": "en", "name": "English"}]}"#)
                .expect("parse");
        assert!(!payload.switcher_enabled);
        assert_eq!(payload.languages.len(), 1);
    }

    #[test]
    fn test_translation_key_context_default() {
        let key: TranslationKey =
            serde_json::from_str(r#"{"original_text": "Hello", "language": "es"}"#).expect("parse");
        assert_eq!(key.context, "content");
    }
}
