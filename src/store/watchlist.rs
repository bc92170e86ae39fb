//! Durable registry of watched sessions.
//!
//! Backed by a single JSON file; the in-memory map is guarded by an
//! `RwLock` and every mutation persists before the lock is released, so a
//! watermark read-modify-write is atomic with respect to concurrent sweeps.

use crate::data::WatchedSession;
use crate::monitor::WatchRegistry;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

const WATCHLIST_VERSION: u32 = 1;
const WATCHLIST_FILE: &str = "watchlist.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct WatchlistFile {
    version: u32,
    sessions: HashMap<String, WatchedSession>,
}

/// Registry of sessions the background monitor is watching.
#[derive(Debug)]
pub struct Watchlist {
    path: PathBuf,
    inner: RwLock<HashMap<String, WatchedSession>>,
}

impl Watchlist {
    pub fn default_path() -> Result<PathBuf> {
        Ok(crate::config::config_dir()?.join(WATCHLIST_FILE))
    }

    /// Open the registry at a path, loading any existing records.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let sessions = load_from_path(&path)?;
        Ok(Self {
            path,
            inner: RwLock::new(sessions),
        })
    }

    /// All watched sessions, ordered by title for stable display.
    pub async fn watched_sessions(&self) -> Vec<WatchedSession> {
        let guard = self.inner.read().await;
        let mut sessions: Vec<_> = guard.values().cloned().collect();
        sessions.sort_by(|a, b| a.title.cmp(&b.title));
        sessions
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.inner.read().await.contains_key(session_id)
    }

    /// Start watching a session. Re-adding updates the title but keeps the
    /// watermark, so an already-notified activity is not re-announced.
    pub async fn add(&self, session_id: &str, title: &str) -> Result<()> {
        let mut guard = self.inner.write().await;
        guard
            .entry(session_id.to_string())
            .and_modify(|w| w.title = title.to_string())
            .or_insert_with(|| WatchedSession {
                session_id: session_id.to_string(),
                title: title.to_string(),
                last_seen_activity_id: None,
            });
        self.persist(&guard)
    }

    /// Stop watching a session and forget its watermark.
    pub async fn remove(&self, session_id: &str) -> Result<()> {
        let mut guard = self.inner.write().await;
        guard.remove(session_id);
        self.persist(&guard)
    }

    /// Persist under the write lock so no concurrent mutation interleaves.
    fn persist(&self, sessions: &HashMap<String, WatchedSession>) -> Result<()> {
        let file = WatchlistFile {
            version: WATCHLIST_VERSION,
            sessions: sessions.clone(),
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            serde_json::to_string_pretty(&file).context("Failed to serialize watchlist")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write watchlist to {}", self.path.display()))?;

        Ok(())
    }
}

#[async_trait]
impl WatchRegistry for Watchlist {
    async fn watched(&self) -> Result<Vec<WatchedSession>> {
        Ok(self.watched_sessions().await)
    }

    async fn last_seen(&self, session_id: &str) -> Result<Option<String>> {
        let guard = self.inner.read().await;
        Ok(guard
            .get(session_id)
            .and_then(|w| w.last_seen_activity_id.clone()))
    }

    async fn set_last_seen(&self, session_id: &str, activity_id: &str) -> Result<()> {
        let mut guard = self.inner.write().await;
        // A sweep may race with unwatching; advancing a removed record
        // would resurrect it, so skip instead.
        let Some(record) = guard.get_mut(session_id) else {
            return Ok(());
        };
        record.last_seen_activity_id = Some(activity_id.to_string());
        self.persist(&guard)
    }
}

fn load_from_path(path: &Path) -> Result<HashMap<String, WatchedSession>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read watchlist from {}", path.display()))?;

    let file: WatchlistFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse watchlist from {}", path.display()))?;

    if file.version != WATCHLIST_VERSION {
        tracing::warn!(
            "Watchlist version mismatch (expected {}, got {}), starting empty",
            WATCHLIST_VERSION,
            file.version
        );
        return Ok(HashMap::new());
    }

    Ok(file.sessions)
}
