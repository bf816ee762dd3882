//! Integration tests for the SQLite-backed stores: settings, error log
//! and stats counters, each against a fresh database in a temp dir.

use grabbot::db::error_log::ErrorLog;
use grabbot::db::settings_store::{ChatKind, ChatSettingsStore, SettingsDefaults, ToggleField};
use grabbot::db::stats_store::StatsStore;
use grabbot::db::Database;
use grabbot::stats::{Outcome, StatBucket, StatsAggregator};
use std::sync::Arc;
use tempfile::TempDir;

async fn open_db(dir: &TempDir) -> Database {
    Database::open(dir.path().join("test.db"))
        .await
        .expect("database opens")
}

fn defaults() -> SettingsDefaults {
    SettingsDefaults {
        language: "en".to_string(),
        album_limit: 10,
    }
}

#[tokio::test]
async fn first_read_materializes_default_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ChatSettingsStore::new(open_db(&dir).await, defaults());

    let settings = store.get(100, ChatKind::Private).await.expect("get");
    assert_eq!(settings.chat_id, 100);
    assert_eq!(settings.kind, ChatKind::Private);
    assert!(settings.captions);
    assert!(!settings.silent);
    assert!(!settings.nsfw);
    assert!(!settings.delete_links);
    assert_eq!(settings.language, "en");
    assert_eq!(settings.media_album_limit, 10);
    assert!(settings.disabled_extractors.is_empty());

    // A second read sees the same record, not a fresh default
    let again = store.get(100, ChatKind::Private).await.expect("get");
    assert_eq!(again, settings);
}

#[tokio::test]
async fn toggle_twice_restores_original_value() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ChatSettingsStore::new(open_db(&dir).await, defaults());

    let before = store.get(1, ChatKind::Private).await.expect("get");
    let flipped = store
        .toggle_flag(1, ToggleField::Captions)
        .await
        .expect("toggle");
    assert_eq!(flipped.captions, !before.captions);

    let restored = store
        .toggle_flag(1, ToggleField::Captions)
        .await
        .expect("toggle");
    assert_eq!(restored.captions, before.captions);
}

#[tokio::test]
async fn concurrent_toggles_of_different_fields_both_land() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ChatSettingsStore::new(open_db(&dir).await, defaults());
    store.get(7, ChatKind::Group).await.expect("get");

    let a = {
        let store = store.clone();
        tokio::spawn(async move { store.toggle_flag(7, ToggleField::Silent).await })
    };
    let b = {
        let store = store.clone();
        tokio::spawn(async move { store.toggle_flag(7, ToggleField::Nsfw).await })
    };
    a.await.expect("join").expect("toggle silent");
    b.await.expect("join").expect("toggle nsfw");

    let settings = store.get(7, ChatKind::Group).await.expect("get");
    assert!(settings.silent);
    assert!(settings.nsfw);
}

#[tokio::test]
async fn toggle_extractor_flips_membership() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ChatSettingsStore::new(open_db(&dir).await, defaults());

    let s = store.toggle_extractor(5, "youtube").await.expect("toggle");
    assert!(s.is_extractor_disabled("youtube"));
    assert!(!s.is_extractor_disabled("tiktok"));

    let s = store.toggle_extractor(5, "tiktok").await.expect("toggle");
    assert!(s.is_extractor_disabled("youtube"));
    assert!(s.is_extractor_disabled("tiktok"));

    let s = store.toggle_extractor(5, "youtube").await.expect("toggle");
    assert!(!s.is_extractor_disabled("youtube"));
    assert!(s.is_extractor_disabled("tiktok"));
}

#[tokio::test]
async fn language_and_album_limit_persist() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = ChatSettingsStore::new(open_db(&dir).await, defaults());

    let s = store.set_language(9, "ru").await.expect("set language");
    assert_eq!(s.language, "ru");

    let s = store.set_album_limit(9, 5).await.expect("set limit");
    assert_eq!(s.media_album_limit, 5);

    let s = store.get(9, ChatKind::Private).await.expect("get");
    assert_eq!(s.language, "ru");
    assert_eq!(s.media_album_limit, 5);
}

#[tokio::test]
async fn error_ids_are_assigned_in_increasing_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let log = ErrorLog::new(open_db(&dir).await);

    let ctx = serde_json::json!({"url": "https://example.com/a"});
    let first = log
        .record(1, Some("youtube"), "boom", &ctx)
        .await
        .expect("record");
    let second = log.record(2, None, "bang", &ctx).await.expect("record");
    assert!(second > first);

    let record = log.get(first).await.expect("get").expect("present");
    assert_eq!(record.id, first);
    assert_eq!(record.chat_id, 1);
    assert_eq!(record.extractor_id.as_deref(), Some("youtube"));
    assert_eq!(record.message, "boom");
    assert_eq!(record.context, ctx);

    assert!(log.get(9999).await.expect("get").is_none());
}

#[tokio::test]
async fn stat_counters_accumulate_across_flushes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = StatsStore::new(open_db(&dir).await);

    let delta = |n: u64| {
        vec![StatBucket {
            extractor_id: "tiktok".to_string(),
            outcome: Outcome::Success,
            count: n,
        }]
    };
    store.add_counts(delta(3)).await.expect("add");
    store.add_counts(delta(2)).await.expect("add");

    let buckets = store.load_counts().await.expect("load");
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].count, 5);
}

#[tokio::test]
async fn aggregator_snapshot_includes_unflushed_deltas() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = open_db(&dir).await;
    let aggregator = Arc::new(StatsAggregator::new(StatsStore::new(db)));

    aggregator.increment("youtube", Outcome::Success);
    aggregator.increment("youtube", Outcome::Success);
    aggregator.increment("youtube", Outcome::Failure);
    aggregator.increment("tiktok", Outcome::SkippedDisabled);

    // Visible before any flush
    let snapshot = aggregator.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.totals.total_requests, 4);

    aggregator.flush().await.expect("flush");

    // Unchanged after the flush: durable now, no longer pending
    let snapshot = aggregator.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.totals.total_requests, 4);
    let youtube_success = snapshot
        .buckets
        .iter()
        .find(|b| b.extractor_id == "youtube" && b.outcome == Outcome::Success)
        .expect("bucket present");
    assert_eq!(youtube_success.count, 2);
    assert_eq!(aggregator.process_increments(), 4);
}

#[tokio::test]
async fn chat_counts_split_by_kind() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = open_db(&dir).await;
    let store = ChatSettingsStore::new(db.clone(), defaults());
    let stats = StatsStore::new(db);

    store.get(1, ChatKind::Private).await.expect("get");
    store.get(2, ChatKind::Private).await.expect("get");
    store.get(-100, ChatKind::Group).await.expect("get");

    let counts = stats.chat_counts().await.expect("counts");
    assert_eq!(counts.private, 2);
    assert_eq!(counts.group, 1);
}

#[tokio::test]
async fn unopenable_database_path_reports_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    // Parent directory does not exist; SQLite cannot create the file
    let result = Database::open(dir.path().join("missing").join("test.db")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn reopening_the_database_is_idempotent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("test.db");

    {
        let db = Database::open(&path).await.expect("first open");
        let store = ChatSettingsStore::new(db, defaults());
        store.set_language(3, "ru").await.expect("set");
    }

    // Second open re-runs the migration runner against applied history
    let db = Database::open(&path).await.expect("second open");
    let store = ChatSettingsStore::new(db, defaults());
    let s = store.get(3, ChatKind::Private).await.expect("get");
    assert_eq!(s.language, "ru");
}
