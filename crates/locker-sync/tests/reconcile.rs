// Reconciler behaviour against every embedded backend
// Run with: cargo test -p locker-sync --test reconcile

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use locker_sync::{
    MemoryStore, PackageCandidate, PackageStore, Reconciler, SqliteStore, UpsertOutcome,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

async fn open_store(backend: &str) -> Arc<dyn PackageStore> {
    let store: Arc<dyn PackageStore> = match backend {
        "memory" => Arc::new(MemoryStore::new()),
        "sqlite" => Arc::new(SqliteStore::connect("sqlite::memory:", 1).await.unwrap()),
        other => panic!("unknown backend {other}"),
    };
    store.ensure_schema().await.unwrap();
    store
}

fn ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

fn candidate(tracking_id: &str, attempt: i64) -> PackageCandidate {
    let dropped = ts("2024-01-01T10:00:00Z");
    PackageCandidate {
        tracking_id: tracking_id.to_string(),
        locker_id: "L7".to_string(),
        status: "dropped_off".to_string(),
        drop_off_timestamp: dropped,
        sync_attempt_timestamp: dropped + Duration::seconds(5 * attempt),
        last_sync_attempt: attempt,
    }
}

#[rstest]
#[case("memory")]
#[case("sqlite")]
#[tokio::test]
async fn test_same_payload_many_times_yields_one_record(#[case] backend: &str) {
    let reconciler = Reconciler::new(open_store(backend).await);

    let first = reconciler.reconcile(candidate("T1", 0)).await.unwrap();
    assert_eq!(first.outcome, UpsertOutcome::Inserted);

    for _ in 0..5 {
        let again = reconciler.reconcile(candidate("T1", 0)).await.unwrap();
        assert_eq!(again.outcome, UpsertOutcome::Updated);
        assert_eq!(again.record, first.record);
    }

    let stored = reconciler.lookup("T1").await.unwrap().unwrap();
    assert_eq!(stored.drop_off_timestamp, first.record.drop_off_timestamp);
    assert_eq!(stored.server_received_at, first.record.server_received_at);
}

#[rstest]
#[case("memory")]
#[case("sqlite")]
#[tokio::test]
async fn test_retry_cannot_rewrite_origin_fields(#[case] backend: &str) {
    let reconciler = Reconciler::new(open_store(backend).await);
    let first = reconciler.reconcile(candidate("T1", 0)).await.unwrap();

    let tampered = PackageCandidate {
        locker_id: "L9".to_string(),
        status: "picked_up".to_string(),
        drop_off_timestamp: ts("2023-12-31T23:59:59Z"),
        ..candidate("T1", 1)
    };
    let retry = reconciler.reconcile(tampered).await.unwrap();

    assert_eq!(retry.outcome, UpsertOutcome::Updated);
    assert_eq!(retry.record.drop_off_timestamp, ts("2024-01-01T10:00:00Z"));
    assert_eq!(retry.record.locker_id, "L7");
    assert_eq!(retry.record.status, "dropped_off");
    assert_eq!(retry.record.server_received_at, first.record.server_received_at);
}

#[rstest]
#[case("memory")]
#[case("sqlite")]
#[tokio::test]
async fn test_retry_advances_sync_metadata(#[case] backend: &str) {
    let reconciler = Reconciler::new(open_store(backend).await);
    reconciler.reconcile(candidate("T1", 0)).await.unwrap();

    let retry = reconciler.reconcile(candidate("T1", 3)).await.unwrap();

    assert_eq!(retry.record.last_sync_attempt, 3);
    assert_eq!(retry.record.sync_attempt_timestamp, ts("2024-01-01T10:00:15Z"));
}

#[rstest]
#[case("memory")]
#[case("sqlite")]
#[tokio::test]
async fn test_stale_retry_still_overwrites_mutable_fields(#[case] backend: &str) {
    // Last writer wins: an older attempt arriving late is not rejected.
    let reconciler = Reconciler::new(open_store(backend).await);
    reconciler.reconcile(candidate("T1", 0)).await.unwrap();
    reconciler.reconcile(candidate("T1", 2)).await.unwrap();

    let late = reconciler.reconcile(candidate("T1", 1)).await.unwrap();

    assert_eq!(late.outcome, UpsertOutcome::Updated);
    assert_eq!(late.record.last_sync_attempt, 1);
}

#[rstest]
#[case("memory")]
#[case("sqlite")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_arrivals_converge(#[case] backend: &str) {
    let reconciler = Reconciler::new(open_store(backend).await);

    let a = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.reconcile(candidate("T-race", 0)).await })
    };
    let b = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.reconcile(candidate("T-race", 1)).await })
    };

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();

    let mut outcomes = vec![a.outcome, b.outcome];
    outcomes.sort_by_key(|outcome| *outcome == UpsertOutcome::Updated);
    assert_eq!(outcomes, vec![UpsertOutcome::Inserted, UpsertOutcome::Updated]);

    let winner = if a.outcome == UpsertOutcome::Inserted { &a } else { &b };
    let stored = reconciler.lookup("T-race").await.unwrap().unwrap();
    assert_eq!(stored.server_received_at, winner.record.server_received_at);
    assert_eq!(stored.drop_off_timestamp, ts("2024-01-01T10:00:00Z"));
    assert!(stored.last_sync_attempt == 0 || stored.last_sync_attempt == 1);
}

#[rstest]
#[case("memory")]
#[case("sqlite")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_retries_single_insert(#[case] backend: &str) {
    let reconciler = Reconciler::new(open_store(backend).await);

    let handles: Vec<_> = (0..10)
        .map(|attempt| {
            let reconciler = reconciler.clone();
            tokio::spawn(async move { reconciler.reconcile(candidate("T-many", attempt)).await })
        })
        .collect();

    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().outcome == UpsertOutcome::Inserted {
            inserted += 1;
        }
    }

    assert_eq!(inserted, 1);
}

#[tokio::test]
async fn test_worked_example() {
    let server_now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 2).unwrap();
    let reconciler = Reconciler::new(open_store("sqlite").await)
        .with_clock(Arc::new(move || server_now));

    let first = reconciler
        .reconcile(PackageCandidate {
            tracking_id: "T1".into(),
            locker_id: "L7".into(),
            status: "dropped_off".into(),
            drop_off_timestamp: ts("2024-01-01T10:00:00Z"),
            sync_attempt_timestamp: ts("2024-01-01T10:00:00Z"),
            last_sync_attempt: 0,
        })
        .await
        .unwrap();
    assert_eq!(first.record.server_received_at, server_now);
    assert_eq!(first.record.last_sync_attempt, 0);

    let retry = reconciler
        .reconcile(PackageCandidate {
            tracking_id: "T1".into(),
            locker_id: "L7".into(),
            status: "dropped_off".into(),
            drop_off_timestamp: ts("2024-01-01T10:00:00Z"),
            sync_attempt_timestamp: ts("2024-01-01T10:00:05Z"),
            last_sync_attempt: 1,
        })
        .await
        .unwrap();

    assert_eq!(retry.record.drop_off_timestamp, ts("2024-01-01T10:00:00Z"));
    assert_eq!(retry.record.sync_attempt_timestamp, ts("2024-01-01T10:00:05Z"));
    assert_eq!(retry.record.last_sync_attempt, 1);
    assert_eq!(retry.record.server_received_at, server_now);
}
