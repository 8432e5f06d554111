//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, TimeZone, Utc};
use serde_json::{Value, json};
use tally_core::{
  notify::{Notification, NotificationKind, NotificationSurface},
  snapshot::Track,
  state,
  store::{SnapshotStore, StoreKey},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

// ─── Key/value ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_key_reads_none() {
  let s = store().await;
  assert!(s.get(StoreKey::SalesBaseline).await.unwrap().is_none());
}

#[tokio::test]
async fn set_then_get() {
  let s = store().await;
  s.set(vec![
    (StoreKey::UnreadSales, json!(3)),
    (StoreKey::CachedReviews, json!([{"review_id": "r1"}])),
  ])
  .await
  .unwrap();

  assert_eq!(s.get(StoreKey::UnreadSales).await.unwrap(), Some(json!(3)));
  assert_eq!(
    s.get(StoreKey::CachedReviews).await.unwrap(),
    Some(json!([{"review_id": "r1"}]))
  );
  assert_eq!(s.keys().await.unwrap(), vec![
    StoreKey::CachedReviews,
    StoreKey::UnreadSales
  ]);
}

#[tokio::test]
async fn set_overwrites() {
  let s = store().await;
  s.set(vec![(StoreKey::SalesSeeded, json!(false))]).await.unwrap();
  s.set(vec![(StoreKey::SalesSeeded, json!(true))]).await.unwrap();
  assert_eq!(s.get(StoreKey::SalesSeeded).await.unwrap(), Some(json!(true)));
}

#[tokio::test]
async fn update_returns_previous_value() {
  let s = store().await;
  let first = s
    .update(StoreKey::UnreadReviews, |_| json!(1))
    .await
    .unwrap();
  assert_eq!(first, None);

  let second = s
    .update(StoreKey::UnreadReviews, |v| {
      json!(v.and_then(|v| v.as_u64()).unwrap_or(0) + 10)
    })
    .await
    .unwrap();
  assert_eq!(second, Some(json!(1)));
  assert_eq!(s.get(StoreKey::UnreadReviews).await.unwrap(), Some(json!(11)));
}

#[tokio::test]
async fn concurrent_counter_updates_are_not_lost() {
  let s = store().await;
  let tasks: Vec<_> = (0..20)
    .map(|_| {
      let s = s.clone();
      tokio::spawn(async move { state::add_unread(&s, Track::Sales, 1).await })
    })
    .collect();
  for t in tasks {
    t.await.unwrap().unwrap();
  }
  assert_eq!(state::unread(&s).await.unwrap().sales, 20);
}

#[tokio::test]
async fn watermark_only_moves_forward() {
  let s = store().await;
  let t0 = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();

  let prev = state::advance_watermark(&s, Track::Reviews, t0).await.unwrap();
  assert_eq!(prev, None);
  let prev = state::advance_watermark(&s, Track::Reviews, t0 - Duration::hours(1))
    .await
    .unwrap();
  assert_eq!(prev, Some(t0));
  assert_eq!(state::watermark(&s, Track::Reviews).await.unwrap(), Some(t0));
}

#[tokio::test]
async fn state_survives_reopen() {
  let path = std::env::temp_dir()
    .join(format!("tally-store-reopen-{}.db", std::process::id()));
  let _ = std::fs::remove_file(&path);

  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.set(vec![(StoreKey::InstalledAt, Value::from("2025-05-01T00:00:00Z"))])
      .await
      .unwrap();
  }

  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(
    s.get(StoreKey::InstalledAt).await.unwrap(),
    Some(Value::from("2025-05-01T00:00:00Z"))
  );
  drop(s);
  let _ = std::fs::remove_file(&path);
}

// ─── Notifications ───────────────────────────────────────────────────────────

fn note(kind: NotificationKind, title: &str) -> Notification {
  Notification::new(
    kind,
    title,
    "body",
    Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap(),
  )
}

#[tokio::test]
async fn raise_and_list_in_order() {
  let s = store().await;
  let a = note(NotificationKind::Sale, "first");
  let b = note(NotificationKind::Review, "second");
  s.raise(a.clone()).await.unwrap();
  s.raise(b.clone()).await.unwrap();

  assert_eq!(s.outstanding().await.unwrap(), vec![a, b]);
}

#[tokio::test]
async fn raising_same_id_replaces() {
  let s = store().await;
  s.raise(note(NotificationKind::SessionExpired, "one")).await.unwrap();
  s.raise(note(NotificationKind::SessionExpired, "two")).await.unwrap();

  let shown = s.outstanding().await.unwrap();
  assert_eq!(shown.len(), 1);
  assert_eq!(shown[0].title, "two");
}

#[tokio::test]
async fn clear_reports_whether_removed() {
  let s = store().await;
  let n = note(NotificationKind::Sale, "sold");
  s.raise(n.clone()).await.unwrap();

  assert!(s.clear(&n.id).await.unwrap());
  assert!(!s.clear(&n.id).await.unwrap());
  assert!(s.outstanding().await.unwrap().is_empty());
}
