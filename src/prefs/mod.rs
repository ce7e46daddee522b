//! The only durable user state: theme and locale, stored as a flat JSON
//! key/value file.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::global;
use crate::i18n;

pub const DARK_KEY: &str = "aro_dark";
pub const LANG_KEY: &str = "aro_lang";

#[derive(Debug, Clone)]
pub struct Preferences {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl Preferences {
    pub fn load() -> Result<Self> {
        Self::load_from(&global::prefs_file()?)
    }

    /// A missing or unreadable file yields empty preferences.
    pub fn load_from(path: &Path) -> Result<Self> {
        let values = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring malformed preferences at {:?}: {}", path, e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read preferences {path:?}"))
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        self.values.insert(key.to_string(), value.into());
        self.save()
    }

    pub fn dark_mode(&self) -> bool {
        self.get(DARK_KEY) == Some("1")
    }

    pub fn set_dark_mode(&mut self, dark: bool) -> Result<()> {
        self.set(DARK_KEY, if dark { "1" } else { "0" })
    }

    pub fn toggle_dark_mode(&mut self) -> Result<bool> {
        let dark = !self.dark_mode();
        self.set_dark_mode(dark)?;
        Ok(dark)
    }

    /// Saved locale, if it is one we have strings for.
    pub fn locale(&self) -> Option<&str> {
        self.get(LANG_KEY).filter(|l| i18n::is_supported(l))
    }

    pub fn set_locale(&mut self, locale: &str) -> Result<()> {
        if !i18n::is_supported(locale) {
            anyhow::bail!(
                "Unsupported locale '{}' (expected one of {})",
                locale,
                i18n::SUPPORTED_LOCALES.join(", ")
            );
        }
        self.set(LANG_KEY, locale)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
        }
        let content =
            serde_json::to_string_pretty(&self.values).context("Failed to serialize preferences")?;
        std::fs::write(&self.path, content).context("Failed to write preferences")?;
        debug!("Saved preferences to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Preferences::load_from(&dir.path().join("prefs.json")).unwrap();
        assert!(!prefs.dark_mode());
        assert_eq!(prefs.locale(), None);
    }

    #[test]
    fn test_values_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let mut prefs = Preferences::load_from(&path).unwrap();
        prefs.set_dark_mode(true).unwrap();
        prefs.set_locale("en").unwrap();

        let reloaded = Preferences::load_from(&path).unwrap();
        assert!(reloaded.dark_mode());
        assert_eq!(reloaded.get(DARK_KEY), Some("1"));
        assert_eq!(reloaded.locale(), Some("en"));
    }

    #[test]
    fn test_toggle_dark_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = Preferences::load_from(&dir.path().join("prefs.json")).unwrap();
        assert!(prefs.toggle_dark_mode().unwrap());
        assert!(!prefs.toggle_dark_mode().unwrap());
        assert_eq!(prefs.get(DARK_KEY), Some("0"));
    }

    #[test]
    fn test_rejects_unknown_locale() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = Preferences::load_from(&dir.path().join("prefs.json")).unwrap();
        assert!(prefs.set_locale("fr").is_err());
        assert_eq!(prefs.get(LANG_KEY), None);
    }

    #[test]
    fn test_malformed_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "not json").unwrap();
        let prefs = Preferences::load_from(&path).unwrap();
        assert!(!prefs.dark_mode());
    }
}
