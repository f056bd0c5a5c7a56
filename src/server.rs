//! Router assembly and the page handler.

use crate::api;
use crate::config::Config;
use crate::content::{ContentStore, Page};
use crate::db::{Database, DEFAULT_CONTEXT};
use crate::editor;
use crate::i18n::{LanguageRegistry, TranslationMetrics};
use crate::pipeline::{self, RequestContext};
use crate::providers;
use crate::templates::{self, escape_html, NavLink, PageView};
use crate::translation::{strip_markup, TranslationResolver};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
    Extension, Router,
};
use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Context tag for page titles and navigation labels
pub const TITLE_CONTEXT: &str = "title";

/// Shared application state. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: LanguageRegistry,
    pub resolver: TranslationResolver,
    pub content: ContentStore,
}

impl AppState {
    /// Open the store, load languages and pages, and pick a provider.
    pub async fn from_config(config: Config) -> Result<Self> {
        ensure_sqlite_parent_dir(&config.database_url)?;
        let db = Database::new(&config.database_url).await?;

        let registry = LanguageRegistry::load(&config.languages_file);
        let content = ContentStore::load(&config.content_file)?;

        let client = providers::build_client(Duration::from_secs(config.provider_timeout_secs))?;
        let provider = providers::from_config(&config, client);
        let resolver = TranslationResolver::new(
            db,
            provider,
            config.auto_translate,
            Arc::new(TranslationMetrics::new()),
        );
        if config.auto_translate && !resolver.can_auto_translate() {
            info!("AUTO_TRANSLATE is on but no provider is configured");
        }

        Ok(Self {
            config: Arc::new(config),
            registry,
            resolver,
            content,
        })
    }
}

/// SQLite will not create missing directories for `mode=rwc`.
fn ensure_sqlite_parent_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let file = rest.split('?').next().unwrap_or("");
    if file.is_empty() || file == ":memory:" {
        return Ok(());
    }
    if let Some(parent) = Path::new(file).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(page_handler))
        .route("/*path", get(page_handler))
        // Inner: needs the RequestContext
        .layer(middleware::from_fn(pipeline::canonical_redirect_middleware))
        // Outer: detection runs before any redirect decision
        .layer(middleware::from_fn_with_state(
            state.clone(),
            pipeline::language_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api::router(state.clone()))
        .merge(pages)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn page_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
) -> Response {
    let Some(page) = state.content.find_by_slug(&context.content_key()) else {
        return (
            StatusCode::NOT_FOUND,
            Html(templates::render_not_found(&context)),
        )
            .into_response();
    };

    let view = page_view(&state, &context, &page).await;
    Html(templates::render_page(&context, &view)).into_response()
}

async fn page_view(state: &AppState, context: &RequestContext, page: &Page) -> PageView {
    let resolver = &state.resolver;
    let editor_mode = context.editor_mode();
    let language = context.translation_language(page.language.as_deref());

    // The title first: the current page's nav label is then a store hit
    let title = resolver.resolve(&page.title, language, TITLE_CONTEXT).await;

    let pages = state.content.pages();
    let labels = join_all(pages.iter().map(|item| {
        let item_language = context.translation_language(item.language.as_deref());
        resolver.resolve(&item.title, item_language, TITLE_CONTEXT)
    }));
    let (body, labels) = tokio::join!(
        resolver.resolve(&page.body, language, DEFAULT_CONTEXT),
        labels
    );

    let nav = pages
        .iter()
        .zip(labels)
        .map(|(item, label)| NavLink {
            label: editor::mark(editor_mode, &escape_html(&label), &item.title, TITLE_CONTEXT),
            href: context.localize(&item.path()),
            current: item.slug == page.slug,
        })
        .collect();

    PageView {
        path: page.path(),
        title: editor::mark(editor_mode, &escape_html(&title), &page.title, TITLE_CONTEXT),
        body: editor::mark(editor_mode, &body, &strip_markup(&page.body), DEFAULT_CONTEXT),
        plain_title: title,
        nav,
    }
}
