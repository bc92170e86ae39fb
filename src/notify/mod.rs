//! Notification delivery.
//!
//! The monitor hands every notice to a [`NotificationSink`]; delivery is
//! at-least-once from the monitor's perspective, so sinks are wrapped in
//! [`Deduplicated`] which drops redundant deliveries of the same dedup key.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// A one-shot user-visible notice about a watched session.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub session_id: String,
    pub session_title: String,
    pub body: String,
    /// Sinks must treat redundant deliveries of the same key as a no-op.
    pub dedup_key: String,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Sink wrapper that deduplicates by `dedup_key`.
///
/// A key is only marked delivered after the inner sink succeeds, so a
/// failed delivery can be retried by a later sweep.
pub struct Deduplicated<S> {
    inner: S,
    seen: Mutex<HashSet<String>>,
}

impl<S> Deduplicated<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            seen: Mutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl<S: NotificationSink> NotificationSink for Deduplicated<S> {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        // On a poisoned lock fail open: a duplicate beats a miss.
        let already_delivered = match self.seen.lock() {
            Ok(seen) => seen.contains(&notification.dedup_key),
            Err(e) => {
                tracing::warn!("Dedup set lock poisoned: {e}");
                false
            }
        };
        if already_delivered {
            tracing::debug!(
                "Dropping duplicate notification for key {}",
                notification.dedup_key
            );
            return Ok(());
        }

        self.inner.deliver(notification).await?;

        if let Ok(mut seen) = self.seen.lock() {
            seen.insert(notification.dedup_key.clone());
        }
        Ok(())
    }
}

/// Forwards notifications into the TUI event loop as messages.
pub struct ChannelSink {
    tx: mpsc::Sender<Notification>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Notification>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        self.tx
            .send(notification.clone())
            .await
            .map_err(|e| anyhow::anyhow!("notification channel closed: {}", e))
    }
}

/// Prints notifications to stdout; used by the headless `watch` subcommand.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        println!(
            "{}: {}",
            notification.session_title, notification.body
        );
        tracing::debug!(
            session_id = %notification.session_id,
            dedup_key = %notification.dedup_key,
            "Delivered notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink {
        deliveries: AtomicUsize,
        fail: std::sync::atomic::AtomicBool,
    }

    impl CountingSink {
        fn new() -> Self {
            Self {
                deliveries: AtomicUsize::new(0),
                fail: std::sync::atomic::AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl NotificationSink for CountingSink {
        async fn deliver(&self, _notification: &Notification) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("sink unavailable");
            }
            self.deliveries.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn make_notification(key: &str) -> Notification {
        Notification {
            session_id: "31337".to_string(),
            session_title: "Boba App".to_string(),
            body: "Building".to_string(),
            dedup_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_key_is_dropped() {
        let sink = Deduplicated::new(CountingSink::new());

        sink.deliver(&make_notification("a1")).await.unwrap();
        sink.deliver(&make_notification("a1")).await.unwrap();
        sink.deliver(&make_notification("a2")).await.unwrap();

        assert_eq!(sink.inner.deliveries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_delivery_can_retry() {
        let sink = Deduplicated::new(CountingSink::new());

        sink.inner.fail.store(true, Ordering::SeqCst);
        assert!(sink.deliver(&make_notification("a1")).await.is_err());

        // The key was not marked delivered, so the retry goes through.
        sink.inner.fail.store(false, Ordering::SeqCst);
        sink.deliver(&make_notification("a1")).await.unwrap();
        assert_eq!(sink.inner.deliveries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_channel_sink_forwards() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = ChannelSink::new(tx);

        sink.deliver(&make_notification("a1")).await.unwrap();
        let received = rx.recv().await.unwrap();
        assert_eq!(received.dedup_key, "a1");
        assert_eq!(received.body, "Building");
    }
}
