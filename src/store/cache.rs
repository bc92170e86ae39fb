//! Local result cache for API listings to enable fast startup and offline viewing.
//!
//! The cache is a key → JSON blob map with one file per key and a fetch
//! timestamp. On screen load, cached data is shown and marked "stale" until
//! a background refresh replaces it. Invalidation is manual.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CACHE_VERSION: u32 = 1;

/// Cache key for the sources listing.
pub fn sources_key() -> String {
    "sources".to_string()
}

/// Cache key for the sessions listing of one source.
pub fn sessions_key(source_id: &str) -> String {
    format!("sessions_{}", sanitize(source_id))
}

/// On-disk envelope for one cached value.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    fetched_at: DateTime<Utc>,
    value: serde_json::Value,
}

/// A cached value together with its fetch time.
#[derive(Debug, Clone)]
pub struct CachedEntry<T> {
    pub value: T,
    pub fetched_at: DateTime<Utc>,
}

impl<T> CachedEntry<T> {
    /// Whether the entry is older than the given max age.
    pub fn is_stale(&self, max_age_hours: u64) -> bool {
        let age = Utc::now().signed_duration_since(self.fetched_at);
        let hours = age.num_hours().max(0) as u64;
        hours >= max_age_hours
    }
}

/// Key → blob cache backed by one JSON file per key.
#[derive(Debug, Clone)]
pub struct ResultCache {
    dir: PathBuf,
    enabled: bool,
}

impl ResultCache {
    pub fn open(config: &crate::config::Config) -> Result<Self> {
        Ok(Self {
            dir: crate::config::cache_dir()?,
            enabled: config.cache.enabled,
        })
    }

    /// Create a cache rooted at a specific directory (used for testing).
    pub fn with_dir(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            dir: dir.into(),
            enabled,
        }
    }

    /// Read a cached value. Returns None when disabled, missing, or unreadable.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<CachedEntry<T>> {
        if !self.enabled {
            return None;
        }

        let path = self.path_for(key);
        if !path.exists() {
            return None;
        }

        match read_envelope(&path) {
            Ok(Some(envelope)) => match serde_json::from_value(envelope.value) {
                Ok(value) => Some(CachedEntry {
                    value,
                    fetched_at: envelope.fetched_at,
                }),
                Err(e) => {
                    tracing::warn!("Cached value for '{}' has wrong shape: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read cache entry '{}': {}", key, e);
                None
            }
        }
    }

    /// Store a value under a key, stamped with the current time.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let envelope = Envelope {
            version: CACHE_VERSION,
            fetched_at: Utc::now(),
            value: serde_json::to_value(value).context("Failed to serialize cache value")?,
        };

        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&envelope)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write cache to {}", path.display()))?;

        Ok(())
    }

    /// Drop a single key.
    pub fn invalidate(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to delete cache at {}", path.display()))?;
        }
        Ok(())
    }

    /// Drop every cached entry.
    pub fn clear(&self) -> Result<()> {
        if !self.dir.exists() {
            return Ok(());
        }
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize(key)))
    }
}

fn read_envelope(path: &Path) -> Result<Option<Envelope>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cache from {}", path.display()))?;

    let envelope: Envelope = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse cache from {}", path.display()))?;

    if envelope.version != CACHE_VERSION {
        tracing::warn!(
            "Cache version mismatch (expected {}, got {}), ignoring cache",
            CACHE_VERSION,
            envelope.version
        );
        return Ok(None);
    }

    Ok(Some(envelope))
}

/// Sanitize a key for use as a filename.
fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Source;
    use tempfile::TempDir;

    fn make_source(id: &str) -> Source {
        Source {
            name: format!("sources/github/acme/{}", id),
            id: id.to_string(),
            github_repo: None,
        }
    }

    #[test]
    fn test_cache_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ResultCache::with_dir(temp_dir.path(), true);

        let sources = vec![make_source("boba-app"), make_source("dotfiles")];
        cache.put(&sources_key(), &sources).unwrap();

        let loaded: CachedEntry<Vec<Source>> = cache.get(&sources_key()).unwrap();
        assert_eq!(loaded.value.len(), 2);
        assert_eq!(loaded.value[0].id, "boba-app");
        assert!(!loaded.is_stale(1));
    }

    #[test]
    fn test_get_missing_key() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ResultCache::with_dir(temp_dir.path(), true);

        let loaded: Option<CachedEntry<Vec<Source>>> = cache.get("nonexistent");
        assert!(loaded.is_none());
    }

    #[test]
    fn test_disabled_cache_is_inert() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ResultCache::with_dir(temp_dir.path(), false);

        cache.put(&sources_key(), &vec![make_source("x")]).unwrap();
        let loaded: Option<CachedEntry<Vec<Source>>> = cache.get(&sources_key());
        assert!(loaded.is_none());
    }

    #[test]
    fn test_invalidate_removes_only_that_key() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ResultCache::with_dir(temp_dir.path(), true);

        cache.put(&sources_key(), &vec![make_source("a")]).unwrap();
        cache
            .put(&sessions_key("boba-app"), &vec!["s1".to_string()])
            .unwrap();

        cache.invalidate(&sources_key()).unwrap();

        let sources: Option<CachedEntry<Vec<Source>>> = cache.get(&sources_key());
        assert!(sources.is_none());
        let sessions: Option<CachedEntry<Vec<String>>> = cache.get(&sessions_key("boba-app"));
        assert!(sessions.is_some());
    }

    #[test]
    fn test_clear_removes_everything() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ResultCache::with_dir(temp_dir.path(), true);

        cache.put(&sources_key(), &vec![make_source("a")]).unwrap();
        cache
            .put(&sessions_key("b"), &vec!["s".to_string()])
            .unwrap();
        cache.clear().unwrap();

        let sources: Option<CachedEntry<Vec<Source>>> = cache.get(&sources_key());
        assert!(sources.is_none());
    }

    #[test]
    fn test_sessions_key_sanitizes() {
        assert_eq!(
            sessions_key("sources/github/Acme/App"),
            "sessions_sources_github_acme_app"
        );
    }

    #[test]
    fn test_stale_entry() {
        let entry = CachedEntry {
            value: (),
            fetched_at: Utc::now() - chrono::Duration::hours(25),
        };
        assert!(entry.is_stale(24));
        assert!(!entry.is_stale(48));
    }
}
