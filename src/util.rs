//! Utility functions and helpers.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// Send a value through a channel, logging a warning if it fails.
///
/// This eliminates the repetitive pattern:
/// ```ignore
/// if let Err(e) = tx.send(value).await {
///     tracing::warn!("Failed to send: {}", e);
/// }
/// ```
pub async fn send_or_log<T>(tx: &mpsc::Sender<T>, value: T, context: &str) {
    if let Err(e) = tx.send(value).await {
        tracing::warn!("Failed to send {}: {}", context, e);
    }
}

/// Format an ISO-8601 timestamp as a coarse relative time ("2h ago").
///
/// The service marks "unknown time" by omitting the field; missing or
/// unparseable timestamps render as "-".
pub fn relative_time(timestamp: Option<&str>) -> String {
    let Some(raw) = timestamp else {
        return "-".to_string();
    };
    let Ok(parsed) = DateTime::parse_from_rfc3339(raw) else {
        return "-".to_string();
    };

    let age = Utc::now().signed_duration_since(parsed.with_timezone(&Utc));
    let secs = age.num_seconds();

    if secs < 0 {
        return "now".to_string();
    }
    if secs < 60 {
        return format!("{}s ago", secs);
    }
    if secs < 3600 {
        return format!("{}m ago", secs / 60);
    }
    if secs < 86_400 {
        return format!("{}h ago", secs / 3600);
    }
    format!("{}d ago", secs / 86_400)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_or_log_success() {
        let (tx, mut rx) = mpsc::channel(1);
        send_or_log(&tx, 42, "test value").await;
        assert_eq!(rx.recv().await, Some(42));
    }

    #[tokio::test]
    async fn test_send_or_log_closed_channel() {
        let (tx, rx) = mpsc::channel::<i32>(1);
        drop(rx); // Close the receiver
        // Should not panic, just log
        send_or_log(&tx, 42, "test value").await;
    }

    #[test]
    fn test_relative_time_missing_or_bad() {
        assert_eq!(relative_time(None), "-");
        assert_eq!(relative_time(Some("not a timestamp")), "-");
    }

    #[test]
    fn test_relative_time_past() {
        let two_hours_ago = (Utc::now() - chrono::Duration::hours(2)).to_rfc3339();
        assert_eq!(relative_time(Some(&two_hours_ago)), "2h ago");

        let recent = (Utc::now() - chrono::Duration::seconds(30)).to_rfc3339();
        assert_eq!(relative_time(Some(&recent)), "30s ago");
    }
}
