//! Persistence and watermark behavior of the watchlist registry.

use julet::monitor::WatchRegistry;
use julet::store::watchlist::Watchlist;
use tempfile::TempDir;

fn watchlist_in(dir: &TempDir) -> Watchlist {
    Watchlist::open(dir.path().join("watchlist.json")).unwrap()
}

#[tokio::test]
async fn add_list_remove_roundtrip() {
    let dir = TempDir::new().unwrap();
    let watchlist = watchlist_in(&dir);

    watchlist.add("s1", "Boba App").await.unwrap();
    watchlist.add("s2", "Dotfiles").await.unwrap();

    let watched = watchlist.watched_sessions().await;
    assert_eq!(watched.len(), 2);
    assert!(watchlist.contains("s1").await);

    watchlist.remove("s1").await.unwrap();
    assert!(!watchlist.contains("s1").await);
    assert_eq!(watchlist.watched_sessions().await.len(), 1);
}

#[tokio::test]
async fn records_survive_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let watchlist = watchlist_in(&dir);
        watchlist.add("s1", "Boba App").await.unwrap();
        watchlist.set_last_seen("s1", "a7").await.unwrap();
    }

    let reopened = watchlist_in(&dir);
    let watched = reopened.watched_sessions().await;
    assert_eq!(watched.len(), 1);
    assert_eq!(watched[0].title, "Boba App");
    assert_eq!(reopened.last_seen("s1").await.unwrap().as_deref(), Some("a7"));
}

#[tokio::test]
async fn re_adding_keeps_the_watermark() {
    let dir = TempDir::new().unwrap();
    let watchlist = watchlist_in(&dir);

    watchlist.add("s1", "Boba App").await.unwrap();
    watchlist.set_last_seen("s1", "a7").await.unwrap();

    // Opening the session view again re-adds; an already-notified activity
    // must not be re-announced.
    watchlist.add("s1", "Boba App (renamed)").await.unwrap();

    assert_eq!(watchlist.last_seen("s1").await.unwrap().as_deref(), Some("a7"));
    let watched = watchlist.watched_sessions().await;
    assert_eq!(watched[0].title, "Boba App (renamed)");
}

#[tokio::test]
async fn set_last_seen_on_removed_session_does_not_resurrect() {
    let dir = TempDir::new().unwrap();
    let watchlist = watchlist_in(&dir);

    watchlist.add("s1", "Boba App").await.unwrap();
    watchlist.remove("s1").await.unwrap();

    // A sweep racing with the removal may still try to advance the watermark.
    watchlist.set_last_seen("s1", "a9").await.unwrap();

    assert!(!watchlist.contains("s1").await);
    assert!(watchlist.watched_sessions().await.is_empty());
}

#[tokio::test]
async fn unknown_session_has_no_watermark() {
    let dir = TempDir::new().unwrap();
    let watchlist = watchlist_in(&dir);
    assert_eq!(watchlist.last_seen("nope").await.unwrap(), None);
}

#[tokio::test]
async fn version_mismatch_starts_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("watchlist.json");
    std::fs::write(
        &path,
        r#"{"version": 99, "sessions": {"s1": {"session_id": "s1", "title": "Old", "last_seen_activity_id": null}}}"#,
    )
    .unwrap();

    let watchlist = Watchlist::open(&path).unwrap();
    assert!(watchlist.watched_sessions().await.is_empty());
}

#[tokio::test]
async fn watched_is_sorted_by_title() {
    let dir = TempDir::new().unwrap();
    let watchlist = watchlist_in(&dir);

    watchlist.add("s2", "Zeta").await.unwrap();
    watchlist.add("s1", "Alpha").await.unwrap();

    let watched = watchlist.watched().await.unwrap();
    assert_eq!(watched[0].title, "Alpha");
    assert_eq!(watched[1].title, "Zeta");
}
