//! Persisted client preferences: the auth token and the theme.
//!
//! Stored as YAML, by default at `~/.crm-console/preferences.yaml`. The
//! session store only sees the [`TokenStore`] trait so tests can swap in
//! [`MemoryTokenStore`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::result_ext::ResultExt;

/// Where the session keeps its token between runs.
pub trait TokenStore: Send + Sync {
    fn load_token(&self) -> Option<String>;
    fn save_token(&self, token: &str) -> Result<()>;
    fn clear_token(&self) -> Result<()>;
}

/// Process-local token store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load_token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|guard| guard.clone())
    }

    fn save_token(&self, token: &str) -> Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))?;
        *guard = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&self) -> Result<()> {
        let mut guard = self
            .token
            .lock()
            .map_err(|_| anyhow::anyhow!("token store lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl std::str::FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(anyhow::anyhow!("Unknown theme '{}' (expected light or dark)", other)),
        }
    }
}

/// Contents of the preferences file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub theme: Theme,
}

/// File-backed preferences.
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    path: PathBuf,
}

impl PreferencesStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store at the configured path, or the default under the home directory.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Ok(Self::new(p)),
            None => Ok(Self::new(Self::default_path()?)),
        }
    }

    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".crm-console").join("preferences.yaml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Preferences> {
        if !self.path.exists() {
            return Ok(Preferences::default());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("read preferences {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Preferences::default());
        }
        let prefs: Preferences = serde_yaml::from_str(&content)
            .with_context(|| format!("parse preferences {}", self.path.display()))?;
        Ok(prefs)
    }

    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(prefs)?;
        fs::write(&self.path, content)
            .with_context(|| format!("write preferences {}", self.path.display()))?;
        Ok(())
    }

    pub fn theme(&self) -> Result<Theme> {
        Ok(self.load()?.theme)
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        let mut prefs = self.load()?;
        prefs.theme = theme;
        self.save(&prefs)
    }
}

impl TokenStore for PreferencesStore {
    fn load_token(&self) -> Option<String> {
        match self.load() {
            Ok(prefs) => prefs.token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!("Preferences unreadable, starting signed out: {:#}", e);
                None
            }
        }
    }

    fn save_token(&self, token: &str) -> Result<()> {
        let mut prefs = self
            .load()
            .best_effort("read preferences before saving token")
            .unwrap_or_default();
        prefs.token = Some(token.to_string());
        self.save(&prefs)
    }

    fn clear_token(&self) -> Result<()> {
        let mut prefs = self
            .load()
            .best_effort("read preferences before clearing token")
            .unwrap_or_default();
        if prefs.token.take().is_none() && !self.path.exists() {
            return Ok(());
        }
        self.save(&prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = PreferencesStore::new(dir.path().join("prefs.yaml"));
        assert_eq!(store.load().unwrap(), Preferences::default());
        assert_eq!(store.load_token(), None);
    }

    #[test]
    fn test_token_and_theme_persist_independently() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.yaml");
        let store = PreferencesStore::new(&path);

        store.save_token("tok-123").unwrap();
        store.set_theme(Theme::Dark).unwrap();

        let reopened = PreferencesStore::new(&path);
        assert_eq!(reopened.load_token().as_deref(), Some("tok-123"));
        assert_eq!(reopened.theme().unwrap(), Theme::Dark);

        reopened.clear_token().unwrap();
        assert_eq!(store.load_token(), None);
        assert_eq!(store.theme().unwrap(), Theme::Dark);
    }

    #[test]
    fn test_corrupt_file_reads_as_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.yaml");
        fs::write(&path, "token: [unterminated").unwrap();
        let store = PreferencesStore::new(&path);
        assert!(store.load().is_err());
        assert_eq!(store.load_token(), None);
    }

    #[test]
    fn test_saving_token_over_corrupt_file_rewrites_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.yaml");
        fs::write(&path, "theme: [unterminated").unwrap();
        let store = PreferencesStore::new(&path);

        store.save_token("tok").unwrap();
        let prefs = store.load().unwrap();
        assert_eq!(prefs.token.as_deref(), Some("tok"));
        assert_eq!(prefs.theme, Theme::Light);

        fs::write(&path, "token: [unterminated").unwrap();
        store.clear_token().unwrap();
        assert_eq!(store.load().unwrap().token, None);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryTokenStore::default();
        assert_eq!(store.load_token(), None);
        store.save_token("abc").unwrap();
        assert_eq!(store.load_token().as_deref(), Some("abc"));
        store.clear_token().unwrap();
        assert_eq!(store.load_token(), None);
    }

    #[test]
    fn test_theme_parsing() {
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!(" light ".parse::<Theme>().unwrap(), Theme::Light);
        assert!("blue".parse::<Theme>().is_err());
    }
}
