//! Language registry: the configured set of site languages.
//!
//! `LanguageSet` is the ordered, invariant-keeping collection: at most one
//! default, the default is always active, and whenever at least one
//! language is active exactly one of them is the default.
//!
//! `LanguageRegistry` is the shared handle used by the server. It is loaded
//! once from a JSON settings file, handed out to requests as immutable
//! snapshots, and only ever replaced as a whole by an administrative save.

use crate::i18n::language::validate_code;
use crate::i18n::Language;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use thiserror::Error;
use tracing::{info, warn};

/// Errors raised when a language configuration is rejected.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid language code '{0}': expected 2-5 lowercase letters, digits or '-'")]
    InvalidCode(String),

    #[error("duplicate language code '{0}'")]
    DuplicateCode(String),

    #[error("unknown language code '{0}'")]
    UnknownLanguage(String),

    #[error("language '{0}' is disabled and cannot be the default")]
    DisabledDefault(String),

    #[error("more than one language is marked as default")]
    MultipleDefaults,

    #[error("cannot disable '{0}' while it is the default language")]
    DefaultDeactivation(String),

    #[error("failed to access language settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed language settings: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Ordered collection of configured languages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Language>", into = "Vec<Language>")]
pub struct LanguageSet {
    languages: Vec<Language>,
}

impl LanguageSet {
    /// Create an empty set (no language system active).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from an administrative payload, rejecting anything that
    /// would break the registry invariants.
    ///
    /// A payload with active languages but no default is accepted: the
    /// first active language is promoted.
    pub fn try_from_languages(languages: Vec<Language>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for lang in &languages {
            validate_code(&lang.code)?;
            if !seen.insert(lang.code.as_str()) {
                return Err(RegistryError::DuplicateCode(lang.code.clone()));
            }
            if lang.is_default && !lang.active {
                return Err(RegistryError::DisabledDefault(lang.code.clone()));
            }
        }

        if languages.iter().filter(|lang| lang.is_default).count() > 1 {
            return Err(RegistryError::MultipleDefaults);
        }

        let mut set = Self { languages };
        set.ensure_default();
        Ok(set)
    }

    /// Build a set from stored configuration, repairing instead of failing.
    ///
    /// Invalid or duplicate codes are dropped, a default on an inactive
    /// language is cleared, and only the first default is kept.
    pub fn normalized(languages: Vec<Language>) -> Self {
        let mut set = Self::new();

        for mut lang in languages {
            if validate_code(&lang.code).is_err() {
                warn!("Dropping language with invalid code '{}'", lang.code);
                continue;
            }
            if set.contains(&lang.code) {
                warn!("Dropping duplicate language '{}'", lang.code);
                continue;
            }
            if lang.is_default && (!lang.active || set.default_language().is_some()) {
                lang.is_default = false;
            }
            set.languages.push(lang);
        }

        set.ensure_default();
        set
    }

    /// Number of configured languages (active or not).
    pub fn len(&self) -> usize {
        self.languages.len()
    }

    /// `true` when no languages are configured.
    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    /// All languages in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &Language> {
        self.languages.iter()
    }

    /// Active languages in configuration order.
    pub fn active(&self) -> impl Iterator<Item = &Language> {
        self.languages.iter().filter(|lang| lang.active)
    }

    pub fn get(&self, code: &str) -> Option<&Language> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// Whether `code` is registered, active or not.
    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// Whether `code` is registered and active.
    pub fn is_active_code(&self, code: &str) -> bool {
        self.get(code).map(|lang| lang.active).unwrap_or(false)
    }

    pub fn default_language(&self) -> Option<&Language> {
        self.languages.iter().find(|lang| lang.is_default)
    }

    /// Code of the default language, or `""` when none is configured.
    pub fn default_code(&self) -> &str {
        self.default_language()
            .map(|lang| lang.code.as_str())
            .unwrap_or("")
    }

    /// Whether `code` is the default language.
    pub fn is_default_code(&self, code: &str) -> bool {
        !code.is_empty() && self.default_code() == code
    }

    /// Append a language.
    ///
    /// An incoming default replaces the current one; the first active
    /// language added to a set without a default becomes the default.
    pub fn add(&mut self, language: Language) -> Result<(), RegistryError> {
        validate_code(&language.code)?;
        if self.contains(&language.code) {
            return Err(RegistryError::DuplicateCode(language.code));
        }
        if language.is_default {
            if !language.active {
                return Err(RegistryError::DisabledDefault(language.code));
            }
            for lang in &mut self.languages {
                lang.is_default = false;
            }
        }

        self.languages.push(language);
        self.ensure_default();
        Ok(())
    }

    /// Remove a language, promoting another active language if the default
    /// was removed.
    pub fn remove(&mut self, code: &str) -> Result<Language, RegistryError> {
        let position = self
            .languages
            .iter()
            .position(|lang| lang.code == code)
            .ok_or_else(|| RegistryError::UnknownLanguage(code.to_string()))?;

        let removed = self.languages.remove(position);
        if removed.is_default {
            self.ensure_default();
        }
        Ok(removed)
    }

    /// Make `code` the default language.
    pub fn set_default(&mut self, code: &str) -> Result<(), RegistryError> {
        let target = self
            .get(code)
            .ok_or_else(|| RegistryError::UnknownLanguage(code.to_string()))?;
        if !target.active {
            return Err(RegistryError::DisabledDefault(code.to_string()));
        }

        for lang in &mut self.languages {
            lang.is_default = lang.code == code;
        }
        Ok(())
    }

    /// Enable or disable a language. The default cannot be disabled.
    pub fn set_active(&mut self, code: &str, active: bool) -> Result<(), RegistryError> {
        let lang = self
            .languages
            .iter_mut()
            .find(|lang| lang.code == code)
            .ok_or_else(|| RegistryError::UnknownLanguage(code.to_string()))?;

        if !active && lang.is_default {
            return Err(RegistryError::DefaultDeactivation(code.to_string()));
        }

        lang.active = active;
        self.ensure_default();
        Ok(())
    }

    fn ensure_default(&mut self) {
        if self.default_language().is_some() {
            return;
        }
        if let Some(first_active) = self.languages.iter_mut().find(|lang| lang.active) {
            first_active.is_default = true;
        }
    }
}

impl From<Vec<Language>> for LanguageSet {
    fn from(languages: Vec<Language>) -> Self {
        Self::normalized(languages)
    }
}

impl From<LanguageSet> for Vec<Language> {
    fn from(set: LanguageSet) -> Self {
        set.languages
    }
}

/// Everything the administrative UI persists about languages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSettings {
    #[serde(default)]
    pub languages: LanguageSet,

    /// Whether the front-end language switcher is rendered
    #[serde(default)]
    pub switcher_enabled: bool,
}

/// Shared, file-backed language registry.
///
/// Cloning is cheap; all clones observe the same settings. Readers get an
/// `Arc` snapshot, so a concurrent save never tears a request's view.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    path: Option<PathBuf>,
    current: Arc<RwLock<Arc<LanguageSettings>>>,
    /// Held across the file write and the swap, so disk and memory agree
    save_lock: Arc<Mutex<()>>,
}

impl LanguageRegistry {
    /// Registry that is never written to disk.
    pub fn in_memory(settings: LanguageSettings) -> Self {
        Self {
            path: None,
            current: Arc::new(RwLock::new(Arc::new(settings))),
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Load settings from `path`.
    ///
    /// A missing or unreadable file yields an empty registry so the site
    /// keeps serving content without a language system.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let settings = match read_settings(&path) {
            Ok(Some(settings)) => {
                info!(
                    "Loaded {} languages from {} (default: '{}')",
                    settings.languages.len(),
                    path.display(),
                    settings.languages.default_code()
                );
                settings
            }
            Ok(None) => {
                info!(
                    "No language settings at {}, language routing disabled",
                    path.display()
                );
                LanguageSettings::default()
            }
            Err(e) => {
                warn!(
                    "Ignoring language settings at {}: {}",
                    path.display(),
                    e
                );
                LanguageSettings::default()
            }
        };

        Self {
            path: Some(path),
            current: Arc::new(RwLock::new(Arc::new(settings))),
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Current settings. The snapshot is never mutated.
    pub fn snapshot(&self) -> Arc<LanguageSettings> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Validate and replace the whole language configuration.
    ///
    /// On any error the stored settings are left untouched.
    pub fn save(
        &self,
        languages: Vec<Language>,
        switcher_enabled: bool,
    ) -> Result<Arc<LanguageSettings>, RegistryError> {
        let languages = LanguageSet::try_from_languages(languages)?;
        let settings = Arc::new(LanguageSettings {
            languages,
            switcher_enabled,
        });

        let _save = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(path) = &self.path {
            write_settings(path, &settings)?;
        }
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&settings);

        info!(
            "Saved {} languages (default: '{}', switcher: {})",
            settings.languages.len(),
            settings.languages.default_code(),
            settings.switcher_enabled
        );
        Ok(settings)
    }
}

fn read_settings(path: &Path) -> Result<Option<LanguageSettings>, RegistryError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_settings(path: &Path, settings: &LanguageSettings) -> Result<(), RegistryError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    // Write-then-rename so a crash never leaves a half-written file behind
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, serde_json::to_vec_pretty(settings)?)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn en_es() -> LanguageSet {
        LanguageSet::try_from_languages(vec![
            Language::new("en", "English").as_default(),
            Language::new("es", "Español"),
        ])
        .expect("valid set")
    }

    // ==================== Query Tests ====================

    #[test]
    fn test_empty_set_has_no_default() {
        let set = LanguageSet::new();
        assert!(set.is_empty());
        assert_eq!(set.default_code(), "");
        assert!(set.default_language().is_none());
    }

    #[test]
    fn test_get_and_contains() {
        let set = en_es();
        assert_eq!(set.get("es").map(|l| l.name.as_str()), Some("Español"));
        assert!(set.contains("en"));
        assert!(!set.contains("fr"));
    }

    #[test]
    fn test_is_active_code() {
        let mut set = en_es();
        set.add(Language::new("fr", "Français").inactive())
            .expect("add");

        assert!(set.is_active_code("es"));
        assert!(!set.is_active_code("fr"));
        assert!(!set.is_active_code("de"));
        assert_eq!(set.active().count(), 2);
    }

    #[test]
    fn test_is_default_code() {
        let set = en_es();
        assert!(set.is_default_code("en"));
        assert!(!set.is_default_code("es"));
        assert!(!set.is_default_code(""));
    }

    // ==================== Strict Construction Tests ====================

    #[test]
    fn test_try_from_rejects_disabled_default() {
        let result = LanguageSet::try_from_languages(vec![
            Language::new("en", "English").as_default().inactive(),
            Language::new("es", "Español"),
        ]);
        assert!(matches!(result, Err(RegistryError::DisabledDefault(code)) if code == "en"));
    }

    #[test]
    fn test_try_from_rejects_duplicates() {
        let result = LanguageSet::try_from_languages(vec![
            Language::new("en", "English"),
            Language::new("en", "English again"),
        ]);
        assert!(matches!(result, Err(RegistryError::DuplicateCode(_))));
    }

    #[test]
    fn test_try_from_rejects_multiple_defaults() {
        let result = LanguageSet::try_from_languages(vec![
            Language::new("en", "English").as_default(),
            Language::new("es", "Español").as_default(),
        ]);
        assert!(matches!(result, Err(RegistryError::MultipleDefaults)));
    }

    #[test]
    fn test_try_from_rejects_invalid_code() {
        let result = LanguageSet::try_from_languages(vec![Language::new("E S", "Bad")]);
        assert!(matches!(result, Err(RegistryError::InvalidCode(_))));
    }

    #[test]
    fn test_try_from_promotes_first_active_when_no_default() {
        let set = LanguageSet::try_from_languages(vec![
            Language::new("de", "Deutsch").inactive(),
            Language::new("es", "Español"),
            Language::new("en", "English"),
        ])
        .expect("valid");
        assert_eq!(set.default_code(), "es");
    }

    #[test]
    fn test_try_from_all_inactive_has_no_default() {
        let set = LanguageSet::try_from_languages(vec![
            Language::new("de", "Deutsch").inactive(),
        ])
        .expect("valid");
        assert_eq!(set.default_code(), "");
    }

    // ==================== Lenient Normalization Tests ====================

    #[test]
    fn test_normalized_repairs_instead_of_failing() {
        let set = LanguageSet::normalized(vec![
            Language::new("en", "English").as_default().inactive(),
            Language::new("es", "Español"),
            Language::new("es", "Duplicate"),
            Language::new("not a code", "Broken"),
        ]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.default_code(), "es");
        assert_eq!(set.get("es").map(|l| l.name.as_str()), Some("Español"));
    }

    #[test]
    fn test_normalized_keeps_only_first_default() {
        let set = LanguageSet::normalized(vec![
            Language::new("en", "English").as_default(),
            Language::new("es", "Español").as_default(),
        ]);
        assert_eq!(set.default_code(), "en");
        assert_eq!(set.iter().filter(|l| l.is_default).count(), 1);
    }

    #[test]
    fn test_deserialize_normalizes() {
        let set: LanguageSet = serde_json::from_str(
            r#"[{"code": "en", "name": "English", "active": false, "is_default": true},
                {"code": "es", "name": "Español"}]"#,
        )
        .expect("Should deserialize");
        assert_eq!(set.default_code(), "es");
    }

    // ==================== Mutation Tests ====================

    #[test]
    fn test_add_first_active_becomes_default() {
        let mut set = LanguageSet::new();
        set.add(Language::new("es", "Español")).expect("add");
        assert_eq!(set.default_code(), "es");
    }

    #[test]
    fn test_add_new_default_replaces_old() {
        let mut set = en_es();
        set.add(Language::new("fr", "Français").as_default())
            .expect("add");
        assert_eq!(set.default_code(), "fr");
        assert_eq!(set.iter().filter(|l| l.is_default).count(), 1);
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let mut set = en_es();
        let result = set.add(Language::new("es", "Spanish"));
        assert!(matches!(result, Err(RegistryError::DuplicateCode(_))));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_remove_default_promotes_next_active() {
        let mut set = en_es();
        let removed = set.remove("en").expect("remove");

        assert!(removed.is_default);
        assert_eq!(set.default_code(), "es");
    }

    #[test]
    fn test_remove_default_skips_inactive_languages() {
        let mut set = en_es();
        set.add(Language::new("de", "Deutsch").inactive())
            .expect("add");
        set.set_active("es", false).expect("disable es");

        set.remove("en").expect("remove");
        assert_eq!(set.default_code(), "", "no active language left to promote");
    }

    #[test]
    fn test_remove_last_language_leaves_no_default() {
        let mut set = LanguageSet::new();
        set.add(Language::new("en", "English")).expect("add");
        set.remove("en").expect("remove");
        assert!(set.is_empty());
        assert_eq!(set.default_code(), "");
    }

    #[test]
    fn test_remove_unknown() {
        let mut set = en_es();
        assert!(matches!(
            set.remove("fr"),
            Err(RegistryError::UnknownLanguage(_))
        ));
    }

    #[test]
    fn test_set_default_on_disabled_language_rejected() {
        let mut set = en_es();
        set.add(Language::new("fr", "Français").inactive())
            .expect("add");

        let result = set.set_default("fr");
        assert!(matches!(result, Err(RegistryError::DisabledDefault(_))));
        assert_eq!(set.default_code(), "en", "default must remain unchanged");
    }

    #[test]
    fn test_set_default_moves_flag() {
        let mut set = en_es();
        set.set_default("es").expect("set default");
        assert_eq!(set.default_code(), "es");
        assert!(!set.get("en").expect("en").is_default);
    }

    #[test]
    fn test_disable_default_rejected() {
        let mut set = en_es();
        let result = set.set_active("en", false);
        assert!(matches!(
            result,
            Err(RegistryError::DefaultDeactivation(_))
        ));
        assert!(set.is_active_code("en"));
    }

    #[test]
    fn test_reactivating_into_empty_default_promotes() {
        let mut set = LanguageSet::normalized(vec![Language::new("en", "English").inactive()]);
        assert_eq!(set.default_code(), "");

        set.set_active("en", true).expect("activate");
        assert_eq!(set.default_code(), "en");
    }

    // ==================== Registry Persistence Tests ====================

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp_dir = TempDir::new().expect("temp dir");
        let registry = LanguageRegistry::load(temp_dir.path().join("languages.json"));

        let snapshot = registry.snapshot();
        assert!(snapshot.languages.is_empty());
        assert!(!snapshot.switcher_enabled);
    }

    #[test]
    fn test_load_malformed_file_is_empty() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("languages.json");
        fs::write(&path, "{ not json").expect("write");

        let registry = LanguageRegistry::load(&path);
        assert!(registry.snapshot().languages.is_empty());
    }

    #[test]
    fn test_save_persists_and_reloads() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("nested").join("languages.json");

        {
            let registry = LanguageRegistry::load(&path);
            registry
                .save(
                    vec![
                        Language::new("en", "English").as_default(),
                        Language::new("es", "Español").with_flag("🇪🇸"),
                    ],
                    true,
                )
                .expect("save");
        }

        let reloaded = LanguageRegistry::load(&path).snapshot();
        assert_eq!(reloaded.languages.len(), 2);
        assert_eq!(reloaded.languages.default_code(), "en");
        assert!(reloaded.switcher_enabled);
        assert_eq!(
            reloaded.languages.get("es").map(|l| l.flag.as_str()),
            Some("🇪🇸")
        );
    }

    #[test]
    fn test_concurrent_saves_leave_disk_and_memory_in_agreement() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("languages.json");
        let registry = LanguageRegistry::load(&path);

        let handles: Vec<_> = ["es", "fr", "de", "it", "pt", "nl"]
            .into_iter()
            .map(|code| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        registry
                            .save(
                                vec![
                                    Language::new("en", "English").as_default(),
                                    Language::new(code, code),
                                ],
                                false,
                            )
                            .expect("save");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("save thread");
        }

        let in_memory = registry.snapshot();
        let on_disk = LanguageRegistry::load(&path).snapshot();
        assert_eq!(on_disk.languages, in_memory.languages);
        assert!(!temp_dir.path().join("languages.json.tmp").exists());
    }

    #[test]
    fn test_rejected_save_leaves_registry_unchanged() {
        let registry = LanguageRegistry::in_memory(LanguageSettings {
            languages: en_es(),
            switcher_enabled: false,
        });

        let result = registry.save(
            vec![
                Language::new("en", "English"),
                Language::new("es", "Español").as_default().inactive(),
            ],
            true,
        );

        assert!(matches!(result, Err(RegistryError::DisabledDefault(_))));
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.languages.default_code(), "en");
        assert!(!snapshot.switcher_enabled);
    }

    #[test]
    fn test_snapshot_is_stable_across_save() {
        let registry = LanguageRegistry::in_memory(LanguageSettings {
            languages: en_es(),
            switcher_enabled: false,
        });

        let before = registry.snapshot();
        registry
            .save(vec![Language::new("fr", "Français")], false)
            .expect("save");

        assert!(before.languages.contains("es"), "old snapshot untouched");
        assert!(!registry.snapshot().languages.contains("es"));
        assert_eq!(registry.snapshot().languages.default_code(), "fr");
    }

    #[test]
    fn test_clones_share_state() {
        let registry = LanguageRegistry::in_memory(LanguageSettings::default());
        let clone = registry.clone();

        registry
            .save(vec![Language::new("en", "English")], false)
            .expect("save");
        assert_eq!(clone.snapshot().languages.default_code(), "en");
    }
}
