use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Number of characters of the original text that take part in the
/// composite key. Longer texts sharing this prefix share one entry.
pub const ORIGINAL_KEY_MAX_CHARS: usize = 191;

/// Default context tag for body text.
pub const DEFAULT_CONTEXT: &str = "content";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationStatus {
    /// Written or reviewed by a person
    Approved,
    /// Produced by a machine translation provider
    Pending,
}

impl TranslationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationStatus::Approved => "approved",
            TranslationStatus::Pending => "pending",
        }
    }

    fn from_db(value: &str) -> Self {
        match value {
            "pending" => TranslationStatus::Pending,
            _ => TranslationStatus::Approved,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationEntry {
    pub original_text: String,
    pub translation: String,
    pub language: String,
    #[serde(default = "default_context")]
    pub context: String,
    #[serde(default = "default_status")]
    pub status: TranslationStatus,
}

fn default_context() -> String {
    DEFAULT_CONTEXT.to_string()
}

fn default_status() -> TranslationStatus {
    TranslationStatus::Approved
}

impl TranslationEntry {
    pub fn new(original_text: &str, translation: &str, language: &str, context: &str) -> Self {
        Self {
            original_text: original_text.to_string(),
            translation: translation.to_string(),
            language: language.to_string(),
            context: context.to_string(),
            status: TranslationStatus::Approved,
        }
    }

    pub fn with_status(mut self, status: TranslationStatus) -> Self {
        self.status = status;
        self
    }
}

/// Key column value for an original text: its first 191 characters.
pub fn original_key(text: &str) -> String {
    text.chars().take(ORIGINAL_KEY_MAX_CHARS).collect()
}

/// Translation store backed by a SQLite table.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database and create the translations table
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context(format!("Failed to open database at {}", database_url))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS translations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                original_key TEXT NOT NULL,
                original_text TEXT NOT NULL,
                translation TEXT NOT NULL,
                language TEXT NOT NULL,
                context TEXT NOT NULL DEFAULT 'content',
                status TEXT NOT NULL DEFAULT 'approved',
                updated_at TEXT NOT NULL,
                UNIQUE (original_key, language, context)
            )",
        )
        .execute(&pool)
        .await
        .context("Failed to create translations table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_translations_language ON translations (language)",
        )
        .execute(&pool)
        .await
        .context("Failed to create translations language index")?;

        Ok(Self { pool })
    }

    /// Look up a translation by (original text, language, context)
    pub async fn get_translation(
        &self,
        original_text: &str,
        language: &str,
        context: &str,
    ) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT translation FROM translations
             WHERE original_key = ?1 AND language = ?2 AND context = ?3",
        )
        .bind(original_key(original_text))
        .bind(language)
        .bind(context)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up translation")?;

        Ok(row.map(|(translation,)| translation))
    }

    /// Insert or fully replace the entry for the entry's composite key.
    ///
    /// A single statement, so concurrent writers on the same key resolve
    /// as last-write-wins.
    pub async fn put_translation(&self, entry: &TranslationEntry) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO translations
                (original_key, original_text, translation, language, context, status, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (original_key, language, context) DO UPDATE SET
                original_text = excluded.original_text,
                translation = excluded.translation,
                status = excluded.status,
                updated_at = excluded.updated_at",
        )
        .bind(original_key(&entry.original_text))
        .bind(&entry.original_text)
        .bind(&entry.translation)
        .bind(&entry.language)
        .bind(&entry.context)
        .bind(entry.status.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to save translation")?;

        Ok(())
    }

    /// Fetch the full entry for a composite key
    pub async fn get_entry(
        &self,
        original_text: &str,
        language: &str,
        context: &str,
    ) -> Result<Option<TranslationEntry>> {
        let row: Option<(String, String, String, String, String)> = sqlx::query_as(
            "SELECT original_text, translation, language, context, status FROM translations
             WHERE original_key = ?1 AND language = ?2 AND context = ?3",
        )
        .bind(original_key(original_text))
        .bind(language)
        .bind(context)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up translation entry")?;

        Ok(row.map(entry_from_row))
    }

    /// Remove the entry for a composite key. Returns whether a row existed.
    pub async fn delete_translation(
        &self,
        original_text: &str,
        language: &str,
        context: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM translations
             WHERE original_key = ?1 AND language = ?2 AND context = ?3",
        )
        .bind(original_key(original_text))
        .bind(language)
        .bind(context)
        .execute(&self.pool)
        .await
        .context("Failed to delete translation")?;

        Ok(result.rows_affected() > 0)
    }

    /// List entries, optionally for a single language, most recent first
    pub async fn list_translations(&self, language: Option<&str>) -> Result<Vec<TranslationEntry>> {
        let rows: Vec<(String, String, String, String, String)> = match language {
            Some(language) => {
                sqlx::query_as(
                    "SELECT original_text, translation, language, context, status FROM translations
                     WHERE language = ?1
                     ORDER BY updated_at DESC, id DESC",
                )
                .bind(language)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(
                    "SELECT original_text, translation, language, context, status FROM translations
                     ORDER BY updated_at DESC, id DESC",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("Failed to list translations")?;

        Ok(rows.into_iter().map(entry_from_row).collect())
    }

    /// Total number of stored entries
    pub async fn translation_count(&self) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM translations")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count translations")?;

        Ok(count as usize)
    }
}

fn entry_from_row(row: (String, String, String, String, String)) -> TranslationEntry {
    let (original_text, translation, language, context, status) = row;
    TranslationEntry {
        original_text,
        translation,
        language,
        context,
        status: TranslationStatus::from_db(&status),
    }
}
