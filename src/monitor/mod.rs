//! Background monitoring of watched sessions.
//!
//! The monitor polls each watched session's activity timeline, detects a
//! newly arrived agent activity by comparing against the per-session
//! watermark, and emits one deduplicated notification for it. Collaborators
//! are injected through traits so the logic is testable with fakes.

pub mod summary;

use crate::api::{ApiError, JulesClient};
use crate::data::{Activity, WatchedSession};
use crate::notify::{Notification, NotificationSink};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Source of a session's activity timeline.
#[async_trait]
pub trait ActivityFetcher: Send + Sync {
    /// Fetch the current activity list for a session.
    ///
    /// Ordering contract: index 0 is the most recent activity. The monitor
    /// cannot function without this guarantee.
    async fn fetch_activities(&self, session_id: &str) -> Result<Vec<Activity>, ApiError>;
}

#[async_trait]
impl ActivityFetcher for JulesClient {
    async fn fetch_activities(&self, session_id: &str) -> Result<Vec<Activity>, ApiError> {
        self.list_activities(session_id).await
    }
}

/// Persistent record of which sessions are watched and their watermarks.
#[async_trait]
pub trait WatchRegistry: Send + Sync {
    async fn watched(&self) -> Result<Vec<WatchedSession>>;
    async fn last_seen(&self, session_id: &str) -> Result<Option<String>>;
    async fn set_last_seen(&self, session_id: &str, activity_id: &str) -> Result<()>;
}

/// Counters for one sweep over the watched set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    pub checked: usize,
    pub notified: usize,
    pub failed: usize,
}

/// Detects new agent activity on watched sessions and notifies once per
/// activity id.
pub struct ActivityMonitor {
    fetcher: Arc<dyn ActivityFetcher>,
    registry: Arc<dyn WatchRegistry>,
    sink: Arc<dyn NotificationSink>,
    /// Suppresses re-entrant sweeps; a duplicate sweep would be idempotent
    /// but wasteful.
    in_flight: Mutex<()>,
}

impl ActivityMonitor {
    pub fn new(
        fetcher: Arc<dyn ActivityFetcher>,
        registry: Arc<dyn WatchRegistry>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            fetcher,
            registry,
            sink,
            in_flight: Mutex::new(()),
        }
    }

    /// Check one session for newly arrived agent activity.
    ///
    /// Fires a notification iff the latest activity differs from the stored
    /// watermark AND was not authored by the user. A user-authored latest
    /// activity never advances the watermark: the agent's eventual reply is
    /// then compared against the last *notified* activity, which keeps the
    /// user's own messages from being announced without masking the reply.
    ///
    /// Returns whether a notification fired.
    pub async fn check_session(&self, session_id: &str, title: &str) -> Result<bool, ApiError> {
        let activities = self.fetcher.fetch_activities(session_id).await?;

        let Some(latest) = activities.first() else {
            return Ok(false);
        };

        // A registry read failure degrades to an unset watermark: the worst
        // case is a duplicate notification, never a missed one.
        let last_seen = match self.registry.last_seen(session_id).await {
            Ok(watermark) => watermark,
            Err(e) => {
                tracing::warn!("Failed to read watermark for {}: {}", session_id, e);
                None
            }
        };

        if last_seen.as_deref() == Some(latest.key()) {
            return Ok(false);
        }

        if latest.is_user() {
            return Ok(false);
        }

        let notification = Notification {
            session_id: session_id.to_string(),
            session_title: title.to_string(),
            body: summary::summarize(latest),
            dedup_key: latest.key().to_string(),
        };

        // Delivery is at-least-once; the sink dedups by key. The watermark
        // must not advance unless delivery was at least attempted, so the
        // deliver call comes first and its failure is not fatal here.
        if let Err(e) = self.sink.deliver(&notification).await {
            tracing::warn!("Notification delivery failed for {}: {}", session_id, e);
        }

        if let Err(e) = self.registry.set_last_seen(session_id, latest.key()).await {
            // Stale watermark: the next sweep may duplicate, the sink's
            // dedup key absorbs it.
            tracing::warn!("Failed to advance watermark for {}: {}", session_id, e);
        }

        Ok(true)
    }

    /// Sweep every watched session once.
    ///
    /// A failure for one session never aborts checks for the others; there
    /// is no retry within a sweep, the next scheduled sweep retries
    /// naturally.
    pub async fn sweep(&self) -> SweepOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            tracing::debug!("Sweep already in flight, skipping");
            return SweepOutcome::default();
        };

        let watched = match self.registry.watched().await {
            Ok(watched) => watched,
            Err(e) => {
                tracing::warn!("Failed to list watched sessions: {}", e);
                return SweepOutcome::default();
            }
        };

        let mut outcome = SweepOutcome::default();
        for session in watched {
            outcome.checked += 1;
            match self
                .check_session(&session.session_id, &session.title)
                .await
            {
                Ok(true) => outcome.notified += 1,
                Ok(false) => {}
                Err(e) => {
                    outcome.failed += 1;
                    tracing::warn!("Check failed for session {}: {}", session.session_id, e);
                }
            }
        }

        if outcome.notified > 0 || outcome.failed > 0 {
            tracing::info!(
                "Sweep checked {} sessions, {} notified, {} failed",
                outcome.checked,
                outcome.notified,
                outcome.failed
            );
        }

        outcome
    }
}

/// Drive sweeps on a fixed wall-clock interval.
///
/// The first sweep runs immediately; the caller aborts the returned handle
/// to stop polling.
pub fn spawn_polling(
    monitor: Arc<ActivityMonitor>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            monitor.sweep().await;
        }
    })
}
