//! Persisted scope preferences.
//!
//! The app remembers which religions and subcategory the user last
//! selected and restores them on launch. Stored as JSON under the
//! platform config directory (`~/.config/reelcache/prefs.json`).

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ReligionFilter, Scope, ALL_RELIGIONS};

/// Application name used for the config directory path.
const APP_NAME: &str = "reelcache";

/// Preferences file name.
const PREFS_FILE: &str = "prefs.json";

/// The concrete religion set "all" expands to when persisted.
const KNOWN_RELIGIONS: [&str; 3] = ["hindu", "muslim", "christian"];

const DEFAULT_RELIGION: &str = "hindu";
const DEFAULT_SUBCATEGORY: &str = "congratulations";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScopePreferences {
    /// Legacy single-religion key, kept for files written by older
    /// versions. Reads prefer `religions`.
    #[serde(default)]
    pub religion: Option<String>,
    #[serde(default)]
    pub religions: Vec<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
}

impl ScopePreferences {
    /// The selected religions: plural key first, then the legacy single
    /// key, then the default.
    pub fn selected_religions(&self) -> Vec<String> {
        if !self.religions.is_empty() {
            return self.religions.clone();
        }
        if let Some(ref single) = self.religion {
            if !single.trim().is_empty() {
                return vec![single.trim().to_lowercase()];
            }
        }
        vec![DEFAULT_RELIGION.to_string()]
    }

    pub fn subcategory(&self) -> String {
        self.subcategory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| DEFAULT_SUBCATEGORY.to_string())
    }

    /// Replace the religion selection. Values are normalized; selecting
    /// "all" expands to the full known set, matching what the selection
    /// UI persists.
    pub fn set_religions<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleaned: Vec<String> = values
            .into_iter()
            .map(|v| v.as_ref().trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .collect();

        if cleaned.iter().any(|v| v == ALL_RELIGIONS) {
            cleaned = KNOWN_RELIGIONS.iter().map(|r| r.to_string()).collect();
        }

        self.religion = cleaned.first().cloned();
        self.religions = cleaned;
        self.saved_at = Some(Utc::now());
    }

    pub fn set_subcategory(&mut self, value: impl AsRef<str>) {
        let cleaned = value.as_ref().trim().to_lowercase();
        self.subcategory = if cleaned.is_empty() {
            Some(DEFAULT_SUBCATEGORY.to_string())
        } else {
            Some(cleaned)
        };
        self.saved_at = Some(Utc::now());
    }

    /// The fetch scope these preferences describe.
    pub fn to_scope(&self) -> Scope {
        Scope::new(
            self.subcategory(),
            ReligionFilter::from_selections(self.selected_religions()),
        )
    }
}

/// Loads and saves `ScopePreferences` at a fixed location.
pub struct PrefsStore {
    path: PathBuf,
}

impl PrefsStore {
    /// Store rooted at an explicit directory (tests use a temp dir).
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(PREFS_FILE),
        }
    }

    /// Store at the platform config directory.
    pub fn default_location() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("could not find config directory"))?;
        Ok(Self::new(config_dir.join(APP_NAME)))
    }

    pub fn load(&self) -> Result<ScopePreferences> {
        if !self.path.exists() {
            return Ok(ScopePreferences::default());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, prefs: &ScopePreferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(prefs)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReligionFilter;

    #[test]
    fn defaults_apply_when_empty() {
        let prefs = ScopePreferences::default();
        assert_eq!(prefs.selected_religions(), vec!["hindu".to_string()]);
        assert_eq!(prefs.subcategory(), "congratulations");
    }

    #[test]
    fn all_expands_to_known_religions() {
        let mut prefs = ScopePreferences::default();
        prefs.set_religions(["All"]);
        assert_eq!(
            prefs.religions,
            vec!["hindu".to_string(), "muslim".to_string(), "christian".to_string()]
        );
        assert_eq!(prefs.religion.as_deref(), Some("hindu"));
    }

    #[test]
    fn plural_key_wins_over_legacy_single() {
        let prefs = ScopePreferences {
            religion: Some("christian".to_string()),
            religions: vec!["muslim".to_string()],
            ..Default::default()
        };
        assert_eq!(prefs.selected_religions(), vec!["muslim".to_string()]);
    }

    #[test]
    fn legacy_single_key_still_read() {
        let prefs = ScopePreferences {
            religion: Some("Christian".to_string()),
            ..Default::default()
        };
        assert_eq!(prefs.selected_religions(), vec!["christian".to_string()]);
    }

    #[test]
    fn to_scope_builds_normalized_scope() {
        let mut prefs = ScopePreferences::default();
        prefs.set_religions(["Hindu", "Muslim"]);
        prefs.set_subcategory(" Congratulations ");

        let scope = prefs.to_scope();
        assert_eq!(scope.category, "congratulations");
        assert_eq!(
            scope.religions,
            ReligionFilter::Only(vec!["hindu".to_string(), "muslim".to_string()])
        );
    }

    #[test]
    fn round_trip_through_store() {
        let dir = std::env::temp_dir().join(format!("reelcache-prefs-{}", std::process::id()));
        let store = PrefsStore::new(&dir);

        let mut prefs = ScopePreferences::default();
        prefs.set_religions(["muslim"]);
        prefs.set_subcategory("birthday");
        store.save(&prefs).expect("save should succeed");

        let loaded = store.load().expect("load should succeed");
        assert_eq!(loaded.selected_religions(), vec!["muslim".to_string()]);
        assert_eq!(loaded.subcategory(), "birthday");
        assert!(loaded.saved_at.is_some());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
