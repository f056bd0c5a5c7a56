//! Content collaborator: pages looked up by slug plus per-page language
//! metadata.
//!
//! Pages live in a JSON file (an array of `Page`). The home page has the
//! empty slug; nested pages use `/`-separated slugs such as `blog/launch`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Lookup key without surrounding slashes ("" for home)
    pub slug: String,
    pub title: String,

    /// Trusted HTML body
    #[serde(default)]
    pub body: String,

    /// Language the page is written in; `None` means the default language
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Page {
    pub fn new(slug: &str, title: &str, body: &str) -> Self {
        Self {
            slug: slug.trim_matches('/').to_string(),
            title: title.to_string(),
            body: body.to_string(),
            language: None,
        }
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    /// Site-relative path of the page, always with a trailing slash
    pub fn path(&self) -> String {
        if self.slug.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", self.slug)
        }
    }
}

/// Shared page store. Clones observe the same pages.
#[derive(Debug, Clone)]
pub struct ContentStore {
    path: Option<PathBuf>,
    pages: Arc<RwLock<Vec<Page>>>,
}

impl ContentStore {
    pub fn in_memory(pages: Vec<Page>) -> Self {
        Self {
            path: None,
            pages: Arc::new(RwLock::new(pages)),
        }
    }

    /// Load pages from `path`. A missing file yields an empty site.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let pages: Vec<Page> = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse pages from {}", path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("No content file at {}, serving an empty site", path.display());
                Vec::new()
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        info!("Loaded {} pages from {}", pages.len(), path.display());

        Ok(Self {
            path: Some(path),
            pages: Arc::new(RwLock::new(pages)),
        })
    }

    /// All pages in file order
    pub fn pages(&self) -> Vec<Page> {
        self.pages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn find_by_slug(&self, slug: &str) -> Option<Page> {
        let slug = slug.trim_matches('/');
        self.pages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|page| page.slug == slug)
            .cloned()
    }

    /// Tag a page with a language (or clear the tag).
    ///
    /// Returns `false` when no page has this slug.
    pub fn set_page_language(&self, slug: &str, language: Option<&str>) -> Result<bool> {
        let slug = slug.trim_matches('/');
        let mut pages = self.pages.write().unwrap_or_else(PoisonError::into_inner);

        let Some(page) = pages.iter_mut().find(|page| page.slug == slug) else {
            return Ok(false);
        };
        let previous = page.language.clone();
        page.language = language.map(String::from);

        if let Some(path) = &self.path {
            if let Err(e) = write_pages(path, &pages) {
                // Keep memory and disk in agreement
                if let Some(page) = pages.iter_mut().find(|page| page.slug == slug) {
                    page.language = previous;
                }
                return Err(e);
            }
        }

        info!(
            "Page '{}' language set to {}",
            slug,
            language.unwrap_or("<default>")
        );
        Ok(true)
    }
}

fn write_pages(path: &Path, pages: &[Page]) -> Result<()> {
    let json = serde_json::to_string_pretty(pages).context("Failed to serialize pages")?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}
